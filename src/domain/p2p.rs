use crate::domain::link::LinkId;
use crate::domain::node::NodeId;
use crate::error::{Error, Result};

/// A point-to-point overlay: a set of fibers, one per hop of a precomputed
/// path, dedicated exclusively to traffic between `src` and `dst`.
///
/// The container records (link id, fiber index) pairs; the fibers themselves
/// stay owned by their links and are marked dedicated when added.
#[derive(Debug, Clone)]
pub struct P2P {
    id: usize,
    src: NodeId,
    dst: NodeId,
    link_ids: Vec<LinkId>,
    fiber_idxs: Vec<usize>,
}

impl P2P {
    pub fn new(id: usize, src: NodeId, dst: NodeId) -> Result<Self> {
        if src == dst {
            return Err(Error::InvalidArgument(
                "p2p container cannot have the same source and destination".to_string(),
            ));
        }
        Ok(P2P { id, src, dst, link_ids: Vec::new(), fiber_idxs: Vec::new() })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn src(&self) -> NodeId {
        self.src
    }

    pub fn dst(&self) -> NodeId {
        self.dst
    }

    pub(crate) fn push_fiber(&mut self, link: LinkId, fiber_idx: usize) {
        self.link_ids.push(link);
        self.fiber_idxs.push(fiber_idx);
    }

    pub fn link_ids(&self) -> &[LinkId] {
        &self.link_ids
    }

    pub fn fiber_idxs(&self) -> &[usize] {
        &self.fiber_idxs
    }

    pub fn number_of_fibers(&self) -> usize {
        self.fiber_idxs.len()
    }
}
