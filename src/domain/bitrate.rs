use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::api::bitrates::{BitratesFileDto, ModulationSpecDto};
use crate::domain::fiber::Band;
use crate::domain::route::Route;
use crate::error::{Error, Result};
use crate::loader::parse_json_file;

/// One modulation format of a bitrate: per-band slot footprint and reach.
///
/// The GSNR and baud-rate fields are carried through for physical-layer
/// tooling but never read by the core.
#[derive(Debug, Clone)]
pub struct ModulationFormat {
    name: String,
    slots: BTreeMap<Band, u32>,
    reach: BTreeMap<Band, f64>,
    required_gsnr: Option<f64>,
    baud_rate: Option<f64>,
}

impl ModulationFormat {
    pub fn new(name: impl Into<String>, slots: BTreeMap<Band, u32>, reach: BTreeMap<Band, f64>) -> Self {
        ModulationFormat { name: name.into(), slots, reach, required_gsnr: None, baud_rate: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_slots(&self, band: Band) -> Result<u32> {
        self.slots
            .get(&band)
            .copied()
            .ok_or_else(|| Error::InvalidArgument(format!("band {} not defined for modulation '{}'", band, self.name)))
    }

    pub fn reach(&self, band: Band) -> Result<f64> {
        self.reach
            .get(&band)
            .copied()
            .ok_or_else(|| Error::InvalidArgument(format!("band {} not defined for modulation '{}'", band, self.name)))
    }

    pub fn supports_band(&self, band: Band) -> bool {
        self.slots.contains_key(&band) && self.reach.contains_key(&band)
    }

    pub fn set_required_gsnr(&mut self, gsnr: f64) {
        self.required_gsnr = Some(gsnr);
    }

    pub fn required_gsnr(&self) -> Option<f64> {
        self.required_gsnr
    }

    pub fn set_baud_rate(&mut self, baud_rate: f64) {
        self.baud_rate = Some(baud_rate);
    }

    pub fn baud_rate(&self) -> Option<f64> {
        self.baud_rate
    }
}

/// A bitrate of the traffic catalog and its distance-adaptive modulation
/// formats, ordered as declared.
#[derive(Debug, Clone)]
pub struct Bitrate {
    gbps: f64,
    modulations: Vec<ModulationFormat>,
}

impl Bitrate {
    pub fn new(gbps: f64) -> Result<Self> {
        if gbps <= 0.0 {
            return Err(Error::InvalidArgument("bitrate must be positive".to_string()));
        }
        Ok(Bitrate { gbps, modulations: Vec::new() })
    }

    pub fn gbps(&self) -> f64 {
        self.gbps
    }

    pub fn add_modulation_format(&mut self, format: ModulationFormat) {
        self.modulations.push(format);
    }

    pub fn add_modulation(
        &mut self,
        name: impl Into<String>,
        slots: BTreeMap<Band, u32>,
        reach: BTreeMap<Band, f64>,
    ) {
        self.modulations.push(ModulationFormat::new(name, slots, reach));
    }

    pub fn number_of_modulations(&self) -> usize {
        self.modulations.len()
    }

    pub fn modulation(&self, index: usize) -> Result<&ModulationFormat> {
        self.modulations
            .get(index)
            .ok_or_else(|| Error::OutOfRange(format!("modulation index {} out of range", index)))
    }

    /// Duplicate names are permitted; this returns the first match.
    pub fn modulation_by_name(&self, name: &str) -> Option<&ModulationFormat> {
        self.modulations.iter().find(|format| format.name() == name)
    }

    pub fn required_slots(&self, index: usize, band: Band) -> Result<u32> {
        self.modulation(index)?.required_slots(band)
    }

    pub fn reach(&self, index: usize, band: Band) -> Result<f64> {
        self.modulation(index)?.reach(band)
    }

    /// Picks the modulation whose reach in `band` covers the route length,
    /// preferring the smallest slot footprint and, among equals, the largest
    /// reach. `None` when no modulation is feasible.
    pub fn adaptive_modulation(&self, route: &Route, band: Band) -> Option<usize> {
        let total_length = route.length();

        let mut best: Option<usize> = None;
        let mut min_slots = u32::MAX;
        let mut max_reach = 0.0f64;

        for (index, format) in self.modulations.iter().enumerate() {
            let (Ok(reach), Ok(slots)) = (format.reach(band), format.required_slots(band)) else {
                continue;
            };
            if reach < total_length {
                continue;
            }
            if slots < min_slots || (slots == min_slots && reach > max_reach) {
                min_slots = slots;
                max_reach = reach;
                best = Some(index);
            }
        }

        best
    }

    /// C-band variant of `adaptive_modulation`.
    pub fn adaptive_modulation_c(&self, route: &Route) -> Option<usize> {
        self.adaptive_modulation(route, Band::C)
    }

    /// Loads a bitrate catalog file, ordered by ascending Gbps value.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<Arc<Bitrate>>> {
        let path = path.as_ref();
        let dto: BitratesFileDto = parse_json_file(path)?;

        let mut entries: Vec<(f64, Vec<BTreeMap<String, ModulationSpecDto>>)> = Vec::new();
        for (key, specs) in dto {
            let gbps: f64 = key.parse().map_err(|_| {
                Error::InvalidFile(format!("bitrate key '{}' is not a number in '{}'", key, path.display()))
            })?;
            entries.push((gbps, specs));
        }
        entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut catalog = Vec::with_capacity(entries.len());
        for (gbps, spec_entries) in entries {
            let mut bitrate = Bitrate::new(gbps)
                .map_err(|e| Error::InvalidFile(format!("bad bitrate in '{}': {}", path.display(), e)))?;

            for entry in spec_entries {
                for (modulation_name, spec) in entry {
                    let mut slots = BTreeMap::new();
                    let mut reach = BTreeMap::new();
                    match spec {
                        ModulationSpecDto::SingleBand(band_spec) => {
                            validate_band_spec(band_spec.slots, band_spec.reach, path)?;
                            slots.insert(Band::C, band_spec.slots as u32);
                            reach.insert(Band::C, band_spec.reach);
                        }
                        ModulationSpecDto::MultiBand(band_entries) => {
                            if band_entries.len() != 1 {
                                return Err(Error::InvalidFile(format!(
                                    "multi-band modulation '{}' must contain exactly one object in '{}'",
                                    modulation_name,
                                    path.display()
                                )));
                            }
                            for (band_key, band_spec) in &band_entries[0] {
                                let band_char = band_key.chars().next().ok_or_else(|| {
                                    Error::InvalidFile(format!("empty band key in '{}'", path.display()))
                                })?;
                                let band = Band::from_char(band_char).map_err(|e| {
                                    Error::InvalidFile(format!("{} in '{}'", e, path.display()))
                                })?;
                                validate_band_spec(band_spec.slots, band_spec.reach, path)?;
                                slots.insert(band, band_spec.slots as u32);
                                reach.insert(band, band_spec.reach);
                            }
                        }
                    }
                    bitrate.add_modulation(modulation_name, slots, reach);
                }
            }
            catalog.push(Arc::new(bitrate));
        }

        log::info!("loaded {} bitrates from '{}'", catalog.len(), path.display());
        Ok(catalog)
    }

    /// The built-in catalog used when no bitrate file is supplied: BPSK at
    /// 10/40/100/400/1000 Gbps with 1/4/8/32/80 C-band slots, reach 5520 km.
    pub fn default_catalog() -> Vec<Arc<Bitrate>> {
        [(10.0, 1u32), (40.0, 4), (100.0, 8), (400.0, 32), (1000.0, 80)]
            .iter()
            .map(|&(gbps, slots)| {
                let mut bitrate = Bitrate { gbps, modulations: Vec::new() };
                bitrate.add_modulation(
                    "BPSK",
                    BTreeMap::from([(Band::C, slots)]),
                    BTreeMap::from([(Band::C, 5520.0)]),
                );
                Arc::new(bitrate)
            })
            .collect()
    }
}

fn validate_band_spec(slots: i64, reach: f64, path: &Path) -> Result<()> {
    if slots < 0 {
        return Err(Error::InvalidFile(format!(
            "value entered for slots is less than zero in '{}'",
            path.display()
        )));
    }
    if reach < 0.0 {
        return Err(Error::InvalidFile(format!(
            "value entered for reach is less than zero in '{}'",
            path.display()
        )));
    }
    Ok(())
}
