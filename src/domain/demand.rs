use std::path::Path;

use crate::api::demands::{DemandUpdateDto, NodeRefDto};
use crate::domain::network::Network;
use crate::domain::node::NodeId;
use crate::error::{Error, Result};
use crate::loader::parse_json_value;

/// Traffic requirement between one ordered node pair: the capacity the pair
/// currently requires and the capacity already provisioned for it.
#[derive(Debug, Clone)]
pub struct Demand {
    id: usize,
    src: NodeId,
    dst: NodeId,
    required: f64,
    allocated: f64,
}

impl Demand {
    pub fn new(id: usize, src: NodeId, dst: NodeId, required: f64) -> Result<Self> {
        if src == dst {
            return Err(Error::InvalidArgument(
                "source and destination nodes must differ".to_string(),
            ));
        }
        if required < 0.0 {
            return Err(Error::InvalidArgument(
                "required capacity must be non-negative".to_string(),
            ));
        }
        Ok(Demand { id, src, dst, required, allocated: 0.0 })
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

    pub fn required_capacity(&self) -> f64 {
        self.required
    }

    pub fn set_required_capacity(&mut self, capacity: f64) -> Result<()> {
        if capacity < 0.0 {
            return Err(Error::InvalidArgument(
                "required capacity must be non-negative".to_string(),
            ));
        }
        self.required = capacity;
        Ok(())
    }

    pub fn allocated_capacity(&self) -> f64 {
        self.allocated
    }

    pub fn add_allocated_capacity(&mut self, capacity: f64) -> Result<()> {
        if capacity < 0.0 {
            return Err(Error::InvalidArgument(
                "capacity to add must be non-negative".to_string(),
            ));
        }
        self.allocated += capacity;
        Ok(())
    }

    pub fn subtract_allocated_capacity(&mut self, capacity: f64) -> Result<()> {
        if capacity < 0.0 {
            return Err(Error::InvalidArgument(
                "capacity to subtract must be non-negative".to_string(),
            ));
        }
        if self.allocated < capacity {
            return Err(Error::Conflict(
                "cannot subtract more capacity than currently allocated".to_string(),
            ));
        }
        self.allocated -= capacity;
        Ok(())
    }

    pub fn unprovisioned_capacity(&self) -> f64 {
        (self.required - self.allocated).max(0.0)
    }

    pub fn is_provisioned(&self) -> bool {
        self.allocated >= self.required
    }

    pub fn provisioning_ratio(&self) -> f64 {
        if self.required == 0.0 {
            return 0.0;
        }
        self.allocated / self.required
    }
}

/// N x N pair-indexed demand matrix. Diagonal cells and never-initialized
/// pairs hold no demand and are excluded from iteration.
#[derive(Debug, Clone, Default)]
pub struct DemandMatrix {
    nodes: usize,
    cells: Vec<Option<Demand>>,
}

impl DemandMatrix {
    pub fn new(nodes: usize) -> Self {
        DemandMatrix { nodes, cells: vec![None; nodes * nodes] }
    }

    /// A matrix with every off-diagonal pair initialized to zero required
    /// capacity, ids assigned row-major.
    pub fn dense(nodes: usize) -> Self {
        let mut matrix = DemandMatrix::new(nodes);
        let mut next_id = 0;
        for src in 0..nodes {
            for dst in 0..nodes {
                if src == dst {
                    continue;
                }
                // src != dst and required 0.0 cannot fail validation
                if let Ok(demand) = Demand::new(next_id, src, dst, 0.0) {
                    matrix.cells[src * nodes + dst] = Some(demand);
                    next_id += 1;
                }
            }
        }
        matrix
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_none())
    }

    pub fn get(&self, src: NodeId, dst: NodeId) -> Option<&Demand> {
        if src >= self.nodes || dst >= self.nodes {
            return None;
        }
        self.cells[src * self.nodes + dst].as_ref()
    }

    pub fn get_mut(&mut self, src: NodeId, dst: NodeId) -> Option<&mut Demand> {
        if src >= self.nodes || dst >= self.nodes {
            return None;
        }
        self.cells[src * self.nodes + dst].as_mut()
    }

    pub fn get_by_id(&self, id: usize) -> Option<&Demand> {
        self.iter().find(|demand| demand.id() == id)
    }

    pub fn insert(&mut self, demand: Demand) -> Result<()> {
        let (src, dst) = (demand.src(), demand.dst());
        if src >= self.nodes || dst >= self.nodes {
            return Err(Error::OutOfRange(format!(
                "demand endpoints ({}, {}) exceed matrix size {}",
                src, dst, self.nodes
            )));
        }
        self.cells[src * self.nodes + dst] = Some(demand);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Demand> {
        self.cells.iter().filter_map(|cell| cell.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Demand> {
        self.cells.iter_mut().filter_map(|cell| cell.as_mut())
    }

    /// Builds a dense matrix for `network` and applies the records of a
    /// demand-update file on top. Malformed records (unknown labels, equal
    /// endpoints, out-of-range ids, negative or missing `required`) are
    /// logged and skipped.
    pub fn from_update_file(path: impl AsRef<Path>, network: &Network) -> Result<Self> {
        let path = path.as_ref();
        let value = parse_json_value(path)?;
        let records = value.as_array().ok_or_else(|| {
            Error::InvalidFile(format!("'{}' must be an array of demand updates", path.display()))
        })?;

        let nodes = network.number_of_nodes();
        let mut matrix = DemandMatrix::dense(nodes);

        for record in records {
            let update: DemandUpdateDto = match serde_json::from_value(record.clone()) {
                Ok(update) => update,
                Err(e) => {
                    log::warn!("skipping demand update: {}", e);
                    continue;
                }
            };

            let src = match resolve_node_ref(&update.src, network) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("skipping demand update: {}", e);
                    continue;
                }
            };
            let dst = match resolve_node_ref(&update.dst, network) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("skipping demand update: {}", e);
                    continue;
                }
            };
            if src == dst {
                log::warn!("skipping demand update: src == dst ({})", src);
                continue;
            }
            if update.required < 0.0 {
                log::warn!("skipping demand update: 'required' < 0");
                continue;
            }

            if let Some(demand) = matrix.get_mut(src, dst) {
                // required >= 0 was checked above
                let _ = demand.set_required_capacity(update.required);
            }
        }

        Ok(matrix)
    }
}

fn resolve_node_ref(node_ref: &NodeRefDto, network: &Network) -> Result<NodeId> {
    match node_ref {
        NodeRefDto::Id(id) => {
            if *id < 0 || *id as usize >= network.number_of_nodes() {
                return Err(Error::OutOfRange(format!("node id {} out of range", id)));
            }
            Ok(*id as NodeId)
        }
        NodeRefDto::Label(label) => network
            .node_id_by_label(label)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown node label '{}'", label))),
    }
}
