//! Free helper functions and a hop-by-hop builder for writing allocation
//! policies against the network snapshot.

use std::sync::Arc;

use crate::domain::bitrate::Bitrate;
use crate::domain::connection::Connection;
use crate::domain::fiber::{Band, Fiber};
use crate::domain::link::Link;
use crate::domain::network::Network;
use crate::domain::node::NodeId;
use crate::domain::route::Route;
use crate::error::Result;

/// Number of precomputed routes between two nodes.
pub fn num_routes(network: &Network, src: NodeId, dst: NodeId) -> usize {
    network.get_paths().map_or(0, |paths| paths.routes(src, dst).len())
}

/// The r-th precomputed route between two nodes.
pub fn route_at(network: &Network, src: NodeId, dst: NodeId, r: usize) -> Option<&Route> {
    network.get_paths()?.routes(src, dst).get(r)
}

/// The l-th link of the r-th precomputed route between two nodes.
pub fn link_at<'a>(network: &'a Network, src: NodeId, dst: NodeId, r: usize, l: usize) -> Option<&'a Link> {
    let route = route_at(network, src, dst, r)?;
    let link_id = *route.links().get(l)?;
    network.link(link_id).ok()
}

/// The bands a fiber currently carries.
pub fn bands(fiber: &Fiber) -> Vec<Band> {
    fiber.bands()
}

/// Owner id of one slot on the snapshot.
pub fn get_slot(
    network: &Network,
    link: usize,
    fiber: usize,
    core: usize,
    band: Band,
    mode: usize,
    pos: usize,
) -> Result<i32> {
    network.is_slot_used(link, fiber, core, band, mode, pos)
}

/// Slot footprint of one modulation of a bitrate in a band.
pub fn required_slots(bitrate: &Bitrate, modulation: usize, band: Band) -> Result<u32> {
    bitrate.required_slots(modulation, band)
}

/// Distance-adaptive modulation choice for a route, `None` when no
/// modulation's reach covers it.
pub fn adaptive_modulation(bitrate: &Bitrate, route: &Route, band: Band) -> Option<usize> {
    bitrate.adaptive_modulation(route, band)
}

/// Builds a connection hop by hop. The controller assigns the id and the
/// creation time at commit; the builder only assembles the spectrum
/// assignment.
pub struct ConnectionBuilder {
    connection: Connection,
}

impl ConnectionBuilder {
    pub fn new(bitrate: Arc<Bitrate>, src: NodeId, dst: NodeId) -> Self {
        ConnectionBuilder { connection: Connection::new(bitrate, src, dst) }
    }

    /// Adds a hop occupying `first_slot..=last_slot`.
    pub fn hop(
        mut self,
        link: usize,
        fiber: usize,
        core: usize,
        band: Band,
        mode: usize,
        first_slot: usize,
        last_slot: usize,
    ) -> Result<Self> {
        self.connection.add_hop(link, fiber, core, band, mode, first_slot, last_slot)?;
        Ok(self)
    }

    /// Adds one hop per link of `route`, all with the same
    /// (fiber, core, band, mode) and slot range.
    pub fn hops_along(
        mut self,
        route: &Route,
        fiber: usize,
        core: usize,
        band: Band,
        mode: usize,
        first_slot: usize,
        last_slot: usize,
    ) -> Result<Self> {
        for &link in route.links() {
            self.connection.add_hop(link, fiber, core, band, mode, first_slot, last_slot)?;
        }
        Ok(self)
    }

    pub fn build(self) -> Connection {
        self.connection
    }
}
