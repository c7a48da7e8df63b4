use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Owner id stored in a free spectrum slot.
pub const FREE_SLOT: i32 = -1;

pub(crate) const DEFAULT_SLOTS: usize = 320;
pub(crate) const DEFAULT_CORES: usize = 1;
pub(crate) const DEFAULT_MODES: usize = 1;
pub(crate) const DEFAULT_BAND: Band = Band::C;

/// Optical transmission bands, ordered by wavelength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    /// Original band (1260-1360 nm)
    O,
    /// Extended band (1360-1460 nm)
    E,
    /// Short band (1460-1530 nm)
    S,
    /// Conventional band (1530-1565 nm)
    C,
    /// Long band (1565-1625 nm)
    L,
    /// Ultra-long band (1625-1675 nm)
    U,
}

impl Band {
    pub fn from_char(c: char) -> Result<Band> {
        match c {
            'O' => Ok(Band::O),
            'E' => Ok(Band::E),
            'S' => Ok(Band::S),
            'C' => Ok(Band::C),
            'L' => Ok(Band::L),
            'U' => Ok(Band::U),
            other => Err(Error::InvalidArgument(format!("unknown band '{}'", other))),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Band::O => 'O',
            Band::E => 'E',
            Band::S => 'S',
            Band::C => 'C',
            Band::L => 'L',
            Band::U => 'U',
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Fiber classes, a shorthand for (core count, max modes per core).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiberType {
    /// Standard Single-Mode Fiber
    Ssmf,
    /// Few-Mode Fiber
    Fmf,
    /// Multi-Core Fiber
    Mcf,
    /// Few-Mode Multi-Core Fiber
    Fmmcf,
    /// Hollow-Core Fiber (fallback, never auto-detected)
    Hcf,
}

impl FiberType {
    pub fn from_name(name: &str) -> Result<FiberType> {
        match name {
            "SSMF" => Ok(FiberType::Ssmf),
            "FMF" => Ok(FiberType::Fmf),
            "MCF" => Ok(FiberType::Mcf),
            "FMMCF" => Ok(FiberType::Fmmcf),
            "HCF" => Ok(FiberType::Hcf),
            other => Err(Error::InvalidArgument(format!("unknown fiber type '{}'", other))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FiberType::Ssmf => "SSMF",
            FiberType::Fmf => "FMF",
            FiberType::Mcf => "MCF",
            FiberType::Fmmcf => "FMMCF",
            FiberType::Hcf => "HCF",
        }
    }
}

impl std::fmt::Display for FiberType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The spectrum-occupancy matrix of one fiber: `band -> core -> mode -> slots`.
///
/// Every slot holds an owner id, `FREE_SLOT` when unoccupied. All bands of a
/// fiber share the same core count; modes may vary per (band, core), and each
/// (band, core, mode) has its own slot count.
#[derive(Debug, Clone)]
pub struct Fiber {
    fiber_type: FiberType,
    dedicated_to_p2p: bool,
    resources: BTreeMap<Band, Vec<Vec<Vec<i32>>>>,
}

impl Default for Fiber {
    fn default() -> Self {
        Fiber::new()
    }
}

impl Fiber {
    /// Default SSMF fiber: 1 core, 1 mode, C band, 320 slots.
    pub fn new() -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(
            DEFAULT_BAND,
            vec![vec![vec![FREE_SLOT; DEFAULT_SLOTS]; DEFAULT_MODES]; DEFAULT_CORES],
        );
        Fiber { fiber_type: FiberType::Ssmf, dedicated_to_p2p: false, resources }
    }

    /// SSMF fiber with the given C-band slot count.
    pub fn with_slots(slots: usize) -> Result<Self> {
        if slots < 1 {
            return Err(Error::InvalidArgument("slot count must be at least 1".to_string()));
        }
        let mut resources = BTreeMap::new();
        resources.insert(Band::C, vec![vec![vec![FREE_SLOT; slots]; DEFAULT_MODES]; DEFAULT_CORES]);
        Ok(Fiber { fiber_type: FiberType::Ssmf, dedicated_to_p2p: false, resources })
    }

    /// Fiber from a full `band -> [core][mode] -> slot count` matrix.
    ///
    /// All bands must carry the same number of cores; modes may differ per
    /// (band, core); every slot count must be at least 1. The fiber class is
    /// detected from the resulting shape.
    pub fn from_band_matrix(matrix: &BTreeMap<Band, Vec<Vec<usize>>>) -> Result<Self> {
        let first = matrix
            .values()
            .next()
            .ok_or_else(|| Error::InvalidArgument("band slot matrix cannot be empty".to_string()))?;
        if first.is_empty() || first[0].is_empty() {
            return Err(Error::InvalidArgument(
                "slots per core/mode matrix cannot be empty for any band".to_string(),
            ));
        }
        let cores = first.len();

        for (band, per_core) in matrix {
            if per_core.is_empty() || per_core[0].is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "matrix cannot be empty for band {}",
                    band
                )));
            }
            if per_core.len() != cores {
                return Err(Error::InvalidArgument(
                    "all bands must have the same number of cores".to_string(),
                ));
            }
            for per_mode in per_core {
                if per_mode.iter().any(|&slots| slots < 1) {
                    return Err(Error::InvalidArgument("all slot counts must be positive".to_string()));
                }
            }
        }

        let mut resources = BTreeMap::new();
        for (band, per_core) in matrix {
            let band_matrix: Vec<Vec<Vec<i32>>> = per_core
                .iter()
                .map(|modes| modes.iter().map(|&slots| vec![FREE_SLOT; slots]).collect())
                .collect();
            resources.insert(*band, band_matrix);
        }

        let mut fiber = Fiber { fiber_type: FiberType::Hcf, dedicated_to_p2p: false, resources };
        fiber.detect_type();
        Ok(fiber)
    }

    pub fn set_type(&mut self, fiber_type: FiberType) {
        self.fiber_type = fiber_type;
    }

    pub fn fiber_type(&self) -> FiberType {
        self.fiber_type
    }

    /// Reclassifies the fiber from its current shape:
    /// (1 core, single-mode) SSMF, (1 core, multi-mode) FMF,
    /// (multi-core, single-mode) MCF, (multi-core, multi-mode) FMMCF.
    /// The number of bands does not affect detection.
    pub fn detect_type(&mut self) {
        let cores = self.number_of_cores();
        let multi_mode = self
            .resources
            .values()
            .any(|per_core| per_core.iter().any(|modes| modes.len() > 1));

        self.fiber_type = match (cores, multi_mode) {
            (1, false) => FiberType::Ssmf,
            (1, true) => FiberType::Fmf,
            (_, false) if cores > 1 => FiberType::Mcf,
            (_, true) if cores > 1 => FiberType::Fmmcf,
            _ => FiberType::Hcf,
        };
    }

    /// Adds a band with `modes` modes of `slots` slots on every existing core.
    pub fn add_band(&mut self, band: Band, modes: usize, slots: usize) -> Result<()> {
        if self.resources.contains_key(&band) {
            return Err(Error::InvalidArgument(format!("band {} already exists", band)));
        }
        if modes < 1 {
            return Err(Error::InvalidArgument("mode count must be at least 1".to_string()));
        }
        if slots < 1 {
            return Err(Error::InvalidArgument("slot count must be at least 1".to_string()));
        }
        let cores = match self.number_of_cores() {
            0 => DEFAULT_CORES,
            n => n,
        };
        self.resources.insert(band, vec![vec![vec![FREE_SLOT; slots]; modes]; cores]);
        Ok(())
    }

    pub fn bands(&self) -> Vec<Band> {
        self.resources.keys().copied().collect()
    }

    pub fn number_of_bands(&self) -> usize {
        self.resources.len()
    }

    /// Replaces the core/mode/slot layout of every band.
    ///
    /// `core_config[core]` lists the slot count of each mode on that core.
    /// Fails with `Conflict` while any slot is occupied.
    pub fn set_cores(&mut self, core_config: &[Vec<usize>]) -> Result<()> {
        if core_config.is_empty() {
            return Err(Error::InvalidArgument("core configuration cannot be empty".to_string()));
        }
        for (core, modes) in core_config.iter().enumerate() {
            if modes.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "core {} must have at least one mode",
                    core
                )));
            }
            if modes.iter().any(|&slots| slots < 1) {
                return Err(Error::InvalidArgument("all slot counts must be positive".to_string()));
            }
        }
        if self.is_active() {
            return Err(Error::Conflict(
                "cannot change core configuration while slots are allocated".to_string(),
            ));
        }

        for per_core in self.resources.values_mut() {
            *per_core = core_config
                .iter()
                .map(|modes| modes.iter().map(|&slots| vec![FREE_SLOT; slots]).collect())
                .collect();
        }
        Ok(())
    }

    pub fn number_of_cores(&self) -> usize {
        self.resources.values().next().map_or(0, |per_core| per_core.len())
    }

    /// Replaces the mode layout of one (core, band). The vector length is the
    /// new mode count; each entry is that mode's slot count. Fails with
    /// `Conflict` while any in-scope slot is occupied.
    pub fn set_modes(&mut self, core: usize, band: Band, slots_per_mode: &[usize]) -> Result<()> {
        if core >= self.number_of_cores() {
            return Err(Error::OutOfRange(format!("core index {} out of range", core)));
        }
        if slots_per_mode.is_empty() {
            return Err(Error::InvalidArgument("slots per mode cannot be empty".to_string()));
        }
        if slots_per_mode.iter().any(|&slots| slots < 1) {
            return Err(Error::InvalidArgument("all slot counts must be positive".to_string()));
        }
        let per_core = self
            .resources
            .get_mut(&band)
            .ok_or_else(|| Error::InvalidArgument(format!("band {} not found in fiber", band)))?;

        let occupied = per_core[core]
            .iter()
            .any(|mode_slots| mode_slots.iter().any(|&slot| slot != FREE_SLOT));
        if occupied {
            return Err(Error::Conflict(
                "cannot change number of modes while slots are allocated".to_string(),
            ));
        }

        per_core[core] = slots_per_mode.iter().map(|&slots| vec![FREE_SLOT; slots]).collect();
        Ok(())
    }

    pub fn number_of_modes(&self, core: usize, band: Band) -> Result<usize> {
        let per_core = self
            .resources
            .get(&band)
            .ok_or_else(|| Error::InvalidArgument(format!("band {} not found in fiber", band)))?;
        per_core
            .get(core)
            .map(|modes| modes.len())
            .ok_or_else(|| Error::OutOfRange(format!("core index {} out of range", core)))
    }

    /// Resizes one (core, band, mode) slot array; grown cells start free.
    pub fn set_slots(&mut self, core: usize, band: Band, mode: usize, slots: usize) -> Result<()> {
        if slots < 1 {
            return Err(Error::InvalidArgument("slot count must be at least 1".to_string()));
        }
        let per_core = self
            .resources
            .get_mut(&band)
            .ok_or_else(|| Error::InvalidArgument(format!("band {} not found in fiber", band)))?;
        let modes = per_core
            .get_mut(core)
            .ok_or_else(|| Error::OutOfRange(format!("core index {} out of range", core)))?;
        let mode_slots = modes
            .get_mut(mode)
            .ok_or_else(|| Error::OutOfRange(format!("mode index {} out of range", mode)))?;
        mode_slots.resize(slots, FREE_SLOT);
        Ok(())
    }

    pub fn number_of_slots(&self, core: usize, band: Band, mode: usize) -> Result<usize> {
        self.mode_slots(core, band, mode).map(|slots| slots.len())
    }

    /// The owner id stored at one slot, `FREE_SLOT` when unoccupied.
    pub fn slot(&self, core: usize, band: Band, mode: usize, pos: usize) -> Result<i32> {
        let slots = self.mode_slots(core, band, mode)?;
        slots
            .get(pos)
            .copied()
            .ok_or_else(|| Error::OutOfRange(format!("slot index {} out of range", pos)))
    }

    pub fn slots(&self, core: usize, band: Band, mode: usize) -> Result<&[i32]> {
        self.mode_slots(core, band, mode).map(|slots| slots.as_slice())
    }

    pub fn set_slot(&mut self, core: usize, band: Band, mode: usize, pos: usize, owner: i32) -> Result<()> {
        let per_core = self
            .resources
            .get_mut(&band)
            .ok_or_else(|| Error::InvalidArgument(format!("band {} not found in fiber", band)))?;
        let modes = per_core
            .get_mut(core)
            .ok_or_else(|| Error::OutOfRange(format!("core index {} out of range", core)))?;
        let mode_slots = modes
            .get_mut(mode)
            .ok_or_else(|| Error::OutOfRange(format!("mode index {} out of range", mode)))?;
        let cell = mode_slots
            .get_mut(pos)
            .ok_or_else(|| Error::OutOfRange(format!("slot index {} out of range", pos)))?;
        *cell = owner;
        Ok(())
    }

    /// Whether any slot in any band is occupied.
    pub fn is_active(&self) -> bool {
        self.resources.values().any(|per_core| {
            per_core
                .iter()
                .any(|modes| modes.iter().any(|slots| slots.iter().any(|&slot| slot != FREE_SLOT)))
        })
    }

    pub fn is_dedicated_to_p2p(&self) -> bool {
        self.dedicated_to_p2p
    }

    /// Marking a fiber as dedicated to point-to-point traffic requires all
    /// slots to be free.
    pub fn set_dedicated_to_p2p(&mut self, dedicated: bool) -> Result<()> {
        if dedicated && self.is_active() {
            return Err(Error::Conflict(
                "cannot dedicate fiber to p2p while it has active slot allocations".to_string(),
            ));
        }
        self.dedicated_to_p2p = dedicated;
        Ok(())
    }

    /// Frees every slot while keeping the band/core/mode structure.
    pub fn reset(&mut self) {
        for per_core in self.resources.values_mut() {
            for modes in per_core.iter_mut() {
                for slots in modes.iter_mut() {
                    slots.fill(FREE_SLOT);
                }
            }
        }
    }

    /// Removes all bands, cores, modes and slots. The fiber must be
    /// reconfigured before reuse; active allocations are lost with a warning.
    pub fn clear(&mut self) {
        if self.is_active() {
            log::warn!(
                "clear() called on a fiber with active slot allocations; all of them are lost"
            );
        }
        self.resources.clear();
    }

    fn mode_slots(&self, core: usize, band: Band, mode: usize) -> Result<&Vec<i32>> {
        let per_core = self
            .resources
            .get(&band)
            .ok_or_else(|| Error::InvalidArgument(format!("band {} not found in fiber", band)))?;
        let modes = per_core
            .get(core)
            .ok_or_else(|| Error::OutOfRange(format!("core index {} out of range", core)))?;
        modes
            .get(mode)
            .ok_or_else(|| Error::OutOfRange(format!("mode index {} out of range", mode)))
    }
}
