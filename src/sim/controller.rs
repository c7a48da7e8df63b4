use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::alloc::{Allocator, NullAllocator};
use crate::domain::bitrate::Bitrate;
use crate::domain::connection::{Connection, Hop};
use crate::domain::demand::DemandMatrix;
use crate::domain::fiber::{Band, Fiber};
use crate::domain::link::{Link, LinkId};
use crate::domain::network::Network;
use crate::domain::node::{Node, NodeId};
use crate::domain::p2p::P2P;
use crate::domain::route::PathsTable;
use crate::error::{Error, Result};
use crate::sim::event::EventKind;

/// Observer invoked after each period's commit, with references to the live
/// network, the demand matrix and the connection list.
pub type PeriodCallback = Box<dyn FnMut(&mut Network, &mut DemandMatrix, &[Connection], f64)>;

/// Hook invoked on failure events; semantics are deferred, implementations
/// may be no-ops.
pub type FailureHandler =
    Box<dyn FnMut(&mut Network, &mut DemandMatrix, &mut Vec<Connection>, EventKind, f64)>;

/// Mediator between the allocation policy and the live network.
///
/// Owns the connection list and the p2p overlays, runs the snapshot-commit
/// protocol and recomputes paths lazily after topology mutations.
pub struct Controller {
    network: Option<Network>,
    allocator: Box<dyn Allocator>,
    connections: Vec<Connection>,
    p2ps: Vec<P2P>,
    connection_counter: u32,
    p2p_counter: usize,
    callback: Option<PeriodCallback>,
    failure_handler: Option<FailureHandler>,
    dirty: bool,
}

impl Default for Controller {
    fn default() -> Self {
        Controller::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Controller {
            network: None,
            allocator: Box::new(NullAllocator),
            connections: Vec::new(),
            p2ps: Vec::new(),
            connection_counter: 0,
            p2p_counter: 0,
            callback: None,
            failure_handler: None,
            dirty: false,
        }
    }

    pub fn with_network(network: Network) -> Self {
        let mut controller = Controller::new();
        controller.network = Some(network);
        controller
    }

    pub fn set_network(&mut self, network: Network) {
        self.network = Some(network);
    }

    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    pub fn network_mut(&mut self) -> Option<&mut Network> {
        self.network.as_mut()
    }

    pub fn set_allocator(&mut self, allocator: Box<dyn Allocator>) {
        self.allocator = allocator;
    }

    pub fn allocator_name(&self) -> &str {
        self.allocator.name()
    }

    pub fn set_callback(&mut self, callback: PeriodCallback) {
        self.callback = Some(callback);
    }

    pub fn set_failure_handler(&mut self, handler: FailureHandler) {
        self.failure_handler = Some(handler);
    }

    pub fn has_failure_handler(&self) -> bool {
        self.failure_handler.is_some()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, id: u32) -> Result<&Connection> {
        self.connections
            .iter()
            .find(|connection| connection.id() == Some(id))
            .ok_or_else(|| Error::OutOfRange(format!("connection with id {} not found", id)))
    }

    /// Marks the topology dirty so that paths are recomputed after the next
    /// period's commit. Mutating calls on the controller do this themselves;
    /// callbacks that reshape the network directly must call it explicitly.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Runs one provisioning round: snapshots the live network, lets the
    /// allocator plan against the snapshot, then commits its output.
    ///
    /// Commit order follows allocator emission order: each connection gets
    /// the next id and the period time stamp, its bitrate is accumulated on
    /// the live demand, and its hops are marked on the live topology. The
    /// callback runs after the full commit; a dirty topology is recomputed
    /// last, so the next period sees fresh paths.
    pub fn assign_connections(
        &mut self,
        demands: &mut DemandMatrix,
        bitrates: &[Arc<Bitrate>],
        time: f64,
    ) -> Result<()> {
        let network = self
            .network
            .as_mut()
            .ok_or_else(|| Error::Conflict("network must be attached before provisioning".to_string()))?;

        let mut snapshot = network.clone();
        let mut demands_copy = demands.clone();
        let mut new_connections = Vec::new();

        self.allocator.exec(
            &mut snapshot,
            &mut demands_copy,
            bitrates,
            &self.connections,
            &mut new_connections,
        )?;

        self.connections.reserve(new_connections.len());
        for mut connection in new_connections {
            let id = self.connection_counter;
            connection.set_id(id)?;
            connection.set_time(time);
            self.connection_counter += 1;

            let (src, dst) = (connection.src(), connection.dst());
            let demand = demands.get_mut(src, dst).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "allocator produced a connection for the missing demand ({}, {})",
                    src, dst
                ))
            })?;
            demand.add_allocated_capacity(connection.bitrate().gbps())?;

            for hop in connection.hops() {
                network.use_slots(
                    hop.link,
                    hop.fiber,
                    hop.core,
                    hop.band,
                    hop.mode,
                    hop.slots.first,
                    hop.slots.last + 1,
                    id as i32,
                )?;
            }

            self.connections.push(connection);
        }

        if let Some(callback) = self.callback.as_mut() {
            callback(network, demands, &self.connections, time);
        }

        if self.dirty {
            let k = network.path_k();
            if k > 0 {
                network.clear_paths();
                network.set_paths(k)?;
                self.dirty = false;
            }
        }

        Ok(())
    }

    // ---- path management (delegated to the network) ----

    pub fn set_paths(&mut self, k: usize) -> Result<()> {
        self.require_network_mut()?.set_paths(k)
    }

    pub fn set_paths_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.require_network_mut()?.set_paths_from_file(path)
    }

    pub fn get_paths(&self) -> Option<&PathsTable> {
        self.network.as_ref()?.get_paths()
    }

    pub fn clear_paths(&mut self) -> Result<()> {
        self.require_network_mut()?.clear_paths();
        Ok(())
    }

    pub fn path_k(&self) -> usize {
        self.network.as_ref().map_or(0, Network::path_k)
    }

    // ---- p2p management ----

    /// Creates a p2p overlay along a precomputed path, appending one fresh
    /// fiber (built from `band_matrix`) to every link of the path and
    /// dedicating it. Returns the new p2p id.
    pub fn add_p2p(
        &mut self,
        src: NodeId,
        dst: NodeId,
        path_idx: usize,
        band_matrix: &BTreeMap<Band, Vec<Vec<usize>>>,
    ) -> Result<usize> {
        let route_links = self.p2p_route_links(src, dst, path_idx)?;
        // validates the matrix before any link is touched
        Fiber::from_band_matrix(band_matrix)?;

        let network = self
            .network
            .as_mut()
            .ok_or_else(|| Error::Conflict("network must be attached before adding p2p".to_string()))?;

        let mut p2p = P2P::new(self.p2p_counter, src, dst)?;
        for link_id in route_links {
            let fiber = Fiber::from_band_matrix(band_matrix)?;
            let link = network.link_mut(link_id)?;
            link.add_fiber(fiber);
            let fiber_idx = link.number_of_fibers() - 1;
            link.fiber_mut(fiber_idx)?.set_dedicated_to_p2p(true)?;
            p2p.push_fiber(link_id, fiber_idx);
        }

        let id = self.p2p_counter;
        self.p2p_counter += 1;
        self.p2ps.push(p2p);
        Ok(id)
    }

    /// Creates a p2p overlay reusing existing fibers, one per link of the
    /// chosen path. Every fiber must be inactive and not yet dedicated.
    /// Returns the new p2p id.
    pub fn add_p2p_with_fibers(
        &mut self,
        src: NodeId,
        dst: NodeId,
        path_idx: usize,
        fiber_idxs: &[usize],
    ) -> Result<usize> {
        let route_links = self.p2p_route_links(src, dst, path_idx)?;
        if fiber_idxs.len() != route_links.len() {
            return Err(Error::InvalidArgument(format!(
                "{} fiber indices given for a path of {} links",
                fiber_idxs.len(),
                route_links.len()
            )));
        }

        let network = self
            .network
            .as_mut()
            .ok_or_else(|| Error::Conflict("network must be attached before adding p2p".to_string()))?;

        // validate every fiber before dedicating any of them
        for (&link_id, &fiber_idx) in route_links.iter().zip(fiber_idxs) {
            let fiber = network.link(link_id)?.fiber(fiber_idx)?;
            if fiber.is_active() {
                return Err(Error::Conflict(format!(
                    "fiber {} on link {} is active and cannot be dedicated",
                    fiber_idx, link_id
                )));
            }
            if fiber.is_dedicated_to_p2p() {
                return Err(Error::Conflict(format!(
                    "fiber {} on link {} is already assigned to another p2p",
                    fiber_idx, link_id
                )));
            }
        }

        let mut p2p = P2P::new(self.p2p_counter, src, dst)?;
        for (&link_id, &fiber_idx) in route_links.iter().zip(fiber_idxs) {
            network.link_mut(link_id)?.fiber_mut(fiber_idx)?.set_dedicated_to_p2p(true)?;
            p2p.push_fiber(link_id, fiber_idx);
        }

        let id = self.p2p_counter;
        self.p2p_counter += 1;
        self.p2ps.push(p2p);
        Ok(id)
    }

    pub fn p2p(&self, id: usize) -> Result<&P2P> {
        self.p2ps
            .iter()
            .find(|p2p| p2p.id() == id)
            .ok_or_else(|| Error::OutOfRange(format!("p2p with id {} not found", id)))
    }

    pub fn p2ps(&self) -> &[P2P] {
        &self.p2ps
    }

    /// Moves an established connection onto a p2p overlay: frees its current
    /// slot ranges on the live network, rewrites its hops to the p2p fibers
    /// and marks the slot range `[from, to)` on every one of them. The whole
    /// sequence is atomic at this call's boundary; migrating a connection
    /// twice fails.
    pub fn migrate_connection_to_p2p(
        &mut self,
        p2p_id: usize,
        core: usize,
        band: Band,
        mode: usize,
        from: usize,
        to: usize,
        connection_id: u32,
        bitrate: Arc<Bitrate>,
    ) -> Result<()> {
        if from >= to {
            return Err(Error::InvalidArgument(format!("invalid slot range [{}, {})", from, to)));
        }

        let p2p_fibers: Vec<(LinkId, usize)> = {
            let p2p = self.p2p(p2p_id)?;
            p2p.link_ids().iter().copied().zip(p2p.fiber_idxs().iter().copied()).collect()
        };
        if p2p_fibers.is_empty() {
            return Err(Error::Conflict(format!("p2p {} has no fibers", p2p_id)));
        }

        let connection_idx = self
            .connections
            .iter()
            .position(|connection| connection.id() == Some(connection_id))
            .ok_or_else(|| Error::OutOfRange(format!("connection with id {} not found", connection_id)))?;
        if self.connections[connection_idx].is_allocated_in_p2p() {
            return Err(Error::Conflict(format!(
                "connection {} is already allocated in a p2p",
                connection_id
            )));
        }

        let network = self
            .network
            .as_mut()
            .ok_or_else(|| Error::Conflict("network must be attached before migration".to_string()))?;

        // validate the target before releasing anything
        for &(link_id, fiber_idx) in &p2p_fibers {
            network.validate_slot_range(link_id, fiber_idx, core, band, mode, from, to)?;
            if !network.link(link_id)?.fiber(fiber_idx)?.is_dedicated_to_p2p() {
                return Err(Error::Conflict(format!(
                    "fiber {} on link {} is not dedicated to p2p traffic",
                    fiber_idx, link_id
                )));
            }
        }

        let old_hops: Vec<Hop> = self.connections[connection_idx].hops().to_vec();
        for hop in &old_hops {
            network.unuse_slots(
                hop.link,
                hop.fiber,
                hop.core,
                hop.band,
                hop.mode,
                hop.slots.first,
                hop.slots.last + 1,
            )?;
        }

        let connection = &mut self.connections[connection_idx];
        connection.clear_hops();
        connection.set_allocated_in_p2p(true);
        connection.change_bitrate(bitrate);
        for &(link_id, fiber_idx) in &p2p_fibers {
            connection.add_hop(link_id, fiber_idx, core, band, mode, from, to - 1)?;
            network.use_slots(link_id, fiber_idx, core, band, mode, from, to, connection_id as i32)?;
        }

        Ok(())
    }

    fn p2p_route_links(&self, src: NodeId, dst: NodeId, path_idx: usize) -> Result<Vec<LinkId>> {
        let network = self
            .network
            .as_ref()
            .ok_or_else(|| Error::Conflict("network must be attached before adding p2p".to_string()))?;
        network.node(src)?;
        network.node(dst)?;

        let paths = network.get_paths().filter(|paths| !paths.is_empty()).ok_or_else(|| {
            Error::Conflict("paths must be computed before adding p2p connections".to_string())
        })?;
        let routes = paths.routes(src, dst);
        let route = routes.get(path_idx).ok_or_else(|| {
            Error::OutOfRange(format!(
                "path index {} out of range for pair ({}, {})",
                path_idx, src, dst
            ))
        })?;
        Ok(route.links().to_vec())
    }

    // ---- topology mutation between periods ----

    /// Appends a bidirectional pair of links, each carrying one fresh fiber
    /// built from `band_matrix`, and marks the topology dirty. Paths are not
    /// recomputed here.
    pub fn add_link(
        &mut self,
        src: NodeId,
        dst: NodeId,
        length: f64,
        band_matrix: &BTreeMap<Band, Vec<Vec<usize>>>,
    ) -> Result<()> {
        let network = self
            .network
            .as_mut()
            .ok_or_else(|| Error::Conflict("network must be attached before adding links".to_string()))?;

        for (s, d) in [(src, dst), (dst, src)] {
            let fiber = Fiber::from_band_matrix(band_matrix)?;
            let id = network.number_of_links();
            let link = Link::new(id, length, fiber)?;
            network.add_link(link)?;
            network.connect(s, id, d)?;
        }

        self.dirty = true;
        Ok(())
    }

    /// Appends a node (its id must continue the dense sequence) and marks
    /// the topology dirty.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        let network = self
            .network
            .as_mut()
            .ok_or_else(|| Error::Conflict("network must be attached before adding nodes".to_string()))?;
        network.add_node(node)?;
        self.dirty = true;
        Ok(())
    }

    /// Writes the demand matrix with a time stamp in the demand-export
    /// format.
    pub fn export_demands(
        &self,
        demands: &DemandMatrix,
        time: f64,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let records: Vec<serde_json::Value> = demands
            .iter()
            .map(|demand| {
                json!({
                    "id": demand.id(),
                    "src": demand.src(),
                    "dst": demand.dst(),
                    "required": demand.required_capacity(),
                    "allocated": demand.allocated_capacity(),
                    "unprovisioned": demand.unprovisioned_capacity(),
                })
            })
            .collect();

        let output = json!({ "time": time, "demands": records });
        fs::write(path.as_ref(), serde_json::to_string_pretty(&output)?)?;
        Ok(())
    }

    /// Dispatches a failure event to the installed handler, if any. The
    /// affected-connections list stays empty until failure semantics exist.
    pub(crate) fn handle_failure(&mut self, demands: &mut DemandMatrix, kind: EventKind, time: f64) {
        if let (Some(network), Some(handler)) = (self.network.as_mut(), self.failure_handler.as_mut()) {
            let mut affected: Vec<Connection> = Vec::new();
            handler(network, demands, &mut affected, kind, time);
        }
    }

    fn require_network_mut(&mut self) -> Result<&mut Network> {
        self.network
            .as_mut()
            .ok_or_else(|| Error::Conflict("network must be attached first".to_string()))
    }
}
