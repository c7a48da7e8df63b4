use crate::domain::fiber::{Band, Fiber, FiberType, FREE_SLOT, DEFAULT_SLOTS};
use crate::domain::node::NodeId;
use crate::error::{Error, Result};

pub type LinkId = usize;

/// A directed edge of the topology: geometric length, endpoint node ids and
/// an ordered list of fibers. Each logical bidirectional edge is represented
/// by two `Link` entries with swapped endpoints.
#[derive(Debug, Clone)]
pub struct Link {
    id: Option<LinkId>,
    length: f64,
    src: Option<NodeId>,
    dst: Option<NodeId>,
    fibers: Vec<Fiber>,
}

impl Link {
    /// A link carrying a single fiber.
    pub fn new(id: LinkId, length: f64, fiber: Fiber) -> Result<Self> {
        Link::with_fibers(id, length, vec![fiber])
    }

    /// A link carrying one or more fibers; every fiber is reclassified from
    /// its shape on the way in.
    pub fn with_fibers(id: LinkId, length: f64, mut fibers: Vec<Fiber>) -> Result<Self> {
        if length <= 0.0 {
            return Err(Error::InvalidArgument(
                "cannot create a link with non-positive length".to_string(),
            ));
        }
        if fibers.is_empty() {
            return Err(Error::InvalidArgument(
                "cannot create a link without fibers".to_string(),
            ));
        }
        for fiber in &mut fibers {
            fiber.detect_type();
        }
        Ok(Link { id: Some(id), length, src: None, dst: None, fibers })
    }

    /// A link whose id will be assigned later with `set_id`.
    pub fn unnumbered(length: f64, fiber: Fiber) -> Result<Self> {
        let mut link = Link::new(0, length, fiber)?;
        link.id = None;
        Ok(link)
    }

    /// The id may be written exactly once.
    pub fn set_id(&mut self, id: LinkId) -> Result<()> {
        if self.id.is_some() {
            return Err(Error::Conflict("link id is already set".to_string()));
        }
        self.id = Some(id);
        Ok(())
    }

    pub fn id(&self) -> Option<LinkId> {
        self.id
    }

    pub fn set_length(&mut self, length: f64) -> Result<()> {
        if length <= 0.0 {
            return Err(Error::InvalidArgument(
                "cannot set a link with non-positive length".to_string(),
            ));
        }
        self.length = length;
        Ok(())
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub(crate) fn set_endpoints(&mut self, src: NodeId, dst: NodeId) {
        self.src = Some(src);
        self.dst = Some(dst);
    }

    pub fn src(&self) -> Option<NodeId> {
        self.src
    }

    pub fn dst(&self) -> Option<NodeId> {
        self.dst
    }

    pub fn add_fiber(&mut self, fiber: Fiber) {
        self.fibers.push(fiber);
    }

    /// Appends `count` freshly constructed fibers of the given class with
    /// default capacities (SSMF 1x1, MCF multi-core, FMF 1x6, FMMCF 7x5; all
    /// 320-slot C band).
    pub fn add_cable(&mut self, fiber_type: FiberType, count: usize) -> Result<()> {
        if count == 0 {
            return Err(Error::InvalidArgument(
                "cannot add a cable with zero fibers".to_string(),
            ));
        }
        for _ in 0..count {
            let mut matrix = std::collections::BTreeMap::new();
            let shape: Vec<Vec<usize>> = match fiber_type {
                FiberType::Ssmf => vec![vec![DEFAULT_SLOTS]],
                FiberType::Mcf => vec![vec![DEFAULT_SLOTS]; 7],
                FiberType::Fmf => vec![vec![DEFAULT_SLOTS; 6]],
                FiberType::Fmmcf => vec![vec![DEFAULT_SLOTS; 5]; 7],
                FiberType::Hcf => {
                    return Err(Error::InvalidArgument(
                        "no default cable shape for HCF".to_string(),
                    ))
                }
            };
            matrix.insert(Band::C, shape);
            let mut fiber = Fiber::from_band_matrix(&matrix)?;
            fiber.set_type(fiber_type);
            self.fibers.push(fiber);
        }
        Ok(())
    }

    pub fn fiber(&self, index: usize) -> Result<&Fiber> {
        self.fibers
            .get(index)
            .ok_or_else(|| Error::OutOfRange(format!("fiber index {} out of range", index)))
    }

    pub fn fiber_mut(&mut self, index: usize) -> Result<&mut Fiber> {
        self.fibers
            .get_mut(index)
            .ok_or_else(|| Error::OutOfRange(format!("fiber index {} out of range", index)))
    }

    pub fn fibers(&self) -> &[Fiber] {
        &self.fibers
    }

    pub fn number_of_fibers(&self) -> usize {
        self.fibers.len()
    }

    /// Occupied share over all (fiber, band, core, mode, slot) cells, 0..100.
    pub fn usage_percentage(&self) -> f64 {
        let mut total = 0usize;
        let mut used = 0usize;
        for fiber in &self.fibers {
            for band in fiber.bands() {
                for core in 0..fiber.number_of_cores() {
                    let modes = fiber.number_of_modes(core, band).unwrap_or(0);
                    for mode in 0..modes {
                        if let Ok(slots) = fiber.slots(core, band, mode) {
                            total += slots.len();
                            used += slots.iter().filter(|&&slot| slot != FREE_SLOT).count();
                        }
                    }
                }
            }
        }
        if total == 0 {
            return 0.0;
        }
        used as f64 / total as f64 * 100.0
    }
}
