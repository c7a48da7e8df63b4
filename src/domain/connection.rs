use std::sync::Arc;

use crate::domain::bitrate::Bitrate;
use crate::domain::fiber::Band;
use crate::domain::link::LinkId;
use crate::domain::node::NodeId;
use crate::error::{Error, Result};

/// A contiguous, inclusive range of slot indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    pub first: usize,
    pub last: usize,
}

impl SlotRange {
    pub fn new(first: usize, last: usize) -> Result<Self> {
        if last < first {
            return Err(Error::InvalidArgument(format!(
                "slot range [{}, {}] is empty",
                first, last
            )));
        }
        Ok(SlotRange { first, last })
    }

    /// Number of slots in the range; never zero.
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.first..=self.last
    }
}

/// One hop of a committed lightpath: which spectrum range of which
/// (link, fiber, core, band, mode) it occupies.
#[derive(Debug, Clone, Copy)]
pub struct Hop {
    pub link: LinkId,
    pub fiber: usize,
    pub core: usize,
    pub band: Band,
    pub mode: usize,
    pub slots: SlotRange,
}

/// A committed lightpath between two nodes. The id is assigned by the
/// controller at commit time; the hop list carries the per-link spectrum
/// assignment. The allocator contract guarantees the same (core, band, mode)
/// and slot range on every hop.
#[derive(Debug, Clone)]
pub struct Connection {
    id: Option<u32>,
    time: f64,
    bitrate: Arc<Bitrate>,
    src: NodeId,
    dst: NodeId,
    allocated_in_p2p: bool,
    hops: Vec<Hop>,
}

impl Connection {
    pub fn new(bitrate: Arc<Bitrate>, src: NodeId, dst: NodeId) -> Self {
        Connection { id: None, time: 0.0, bitrate, src, dst, allocated_in_p2p: false, hops: Vec::new() }
    }

    /// The id may be written exactly once (by the controller).
    pub fn set_id(&mut self, id: u32) -> Result<()> {
        if self.id.is_some() {
            return Err(Error::Conflict("connection id is already set".to_string()));
        }
        self.id = Some(id);
        Ok(())
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn bitrate(&self) -> &Arc<Bitrate> {
        &self.bitrate
    }

    pub fn change_bitrate(&mut self, bitrate: Arc<Bitrate>) {
        self.bitrate = bitrate;
    }

    pub fn src(&self) -> NodeId {
        self.src
    }

    pub fn dst(&self) -> NodeId {
        self.dst
    }

    pub fn is_allocated_in_p2p(&self) -> bool {
        self.allocated_in_p2p
    }

    pub fn set_allocated_in_p2p(&mut self, value: bool) {
        self.allocated_in_p2p = value;
    }

    /// Appends one hop; `first_slot..=last_slot` is the occupied range.
    pub fn add_hop(
        &mut self,
        link: LinkId,
        fiber: usize,
        core: usize,
        band: Band,
        mode: usize,
        first_slot: usize,
        last_slot: usize,
    ) -> Result<()> {
        let slots = SlotRange::new(first_slot, last_slot)?;
        self.hops.push(Hop { link, fiber, core, band, mode, slots });
        Ok(())
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    pub(crate) fn clear_hops(&mut self) {
        self.hops.clear();
    }
}
