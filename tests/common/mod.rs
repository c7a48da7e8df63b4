//! Shared builders and a reference first-fit policy for the integration
//! tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use opticap::alloc::helpers::ConnectionBuilder;
use opticap::alloc::Allocator;
use opticap::domain::bitrate::Bitrate;
use opticap::domain::connection::Connection;
use opticap::domain::demand::{Demand, DemandMatrix};
use opticap::domain::fiber::{Band, Fiber, FREE_SLOT};
use opticap::domain::link::Link;
use opticap::domain::network::Network;
use opticap::domain::node::Node;
use opticap::error::Result;

/// Two nodes joined by one bidirectional link pair (ids 0 and 1), each link
/// carrying a single SSMF fiber with `slots` C-band slots.
pub fn two_node_network(length: f64, slots: usize) -> Network {
    let mut network = Network::new();
    network.add_node(Node::new(0)).unwrap();
    network.add_node(Node::new(1)).unwrap();
    add_bidirectional(&mut network, 0, 1, length, slots);
    network
}

/// Three nodes in a line: 0 - 1 - 2, two bidirectional link pairs.
pub fn line_network(length: f64, slots: usize) -> Network {
    let mut network = Network::new();
    for id in 0..3 {
        network.add_node(Node::new(id)).unwrap();
    }
    add_bidirectional(&mut network, 0, 1, length, slots);
    add_bidirectional(&mut network, 1, 2, length, slots);
    network
}

/// Four-node diamond: 0-1-3 costs 5 + 5, 0-2-3 costs 6 + 6.
/// Forward link ids: 0 (0->1), 2 (1->3), 4 (0->2), 6 (2->3).
pub fn diamond_network() -> Network {
    let mut network = Network::new();
    for id in 0..4 {
        network.add_node(Node::new(id)).unwrap();
    }
    add_bidirectional(&mut network, 0, 1, 5.0, 320);
    add_bidirectional(&mut network, 1, 3, 5.0, 320);
    add_bidirectional(&mut network, 0, 2, 6.0, 320);
    add_bidirectional(&mut network, 2, 3, 6.0, 320);
    network
}

/// Appends the links src->dst and dst->src with fresh SSMF fibers.
pub fn add_bidirectional(network: &mut Network, src: usize, dst: usize, length: f64, slots: usize) {
    for (s, d) in [(src, dst), (dst, src)] {
        let id = network.number_of_links();
        let link = Link::new(id, length, Fiber::with_slots(slots).unwrap()).unwrap();
        network.add_link(link).unwrap();
        network.connect(s, id, d).unwrap();
    }
}

/// A catalog with a single 100 Gbps bitrate: BPSK, 8 C-band slots, 5520 km.
pub fn catalog_100g_bpsk() -> Vec<Arc<Bitrate>> {
    let mut bitrate = Bitrate::new(100.0).unwrap();
    bitrate.add_modulation(
        "BPSK",
        BTreeMap::from([(Band::C, 8u32)]),
        BTreeMap::from([(Band::C, 5520.0)]),
    );
    vec![Arc::new(bitrate)]
}

/// A demand matrix holding a single directed demand.
pub fn single_demand(nodes: usize, src: usize, dst: usize, required: f64) -> DemandMatrix {
    let mut matrix = DemandMatrix::new(nodes);
    matrix.insert(Demand::new(0, src, dst, required).unwrap()).unwrap();
    matrix
}

/// Reference first-fit policy over (fiber 0, core 0, C band, mode 0): for
/// each unprovisioned demand, repeatedly places the largest feasible bitrate
/// on the first route with a shared contiguous free block.
pub struct FirstFit;

impl Allocator for FirstFit {
    fn name(&self) -> &str {
        "FirstFit"
    }

    fn exec(
        &mut self,
        network: &mut Network,
        demands: &mut DemandMatrix,
        bitrates: &[Arc<Bitrate>],
        _existing_connections: &[Connection],
        new_connections: &mut Vec<Connection>,
    ) -> Result<()> {
        let pairs: Vec<(usize, usize)> =
            demands.iter().map(|demand| (demand.src(), demand.dst())).collect();

        for (src, dst) in pairs {
            loop {
                let unprovisioned = match demands.get(src, dst) {
                    Some(demand) => demand.unprovisioned_capacity(),
                    None => break,
                };
                if unprovisioned <= 0.0 {
                    break;
                }

                let bitrate = bitrates
                    .iter()
                    .filter(|bitrate| bitrate.gbps() <= unprovisioned)
                    .last()
                    .or_else(|| bitrates.first())
                    .cloned();
                let Some(bitrate) = bitrate else { break };

                let Some(connection) = place_first_fit(network, &bitrate, src, dst)? else {
                    break;
                };

                if let Some(demand) = demands.get_mut(src, dst) {
                    demand.add_allocated_capacity(bitrate.gbps())?;
                }
                new_connections.push(connection);
            }
        }
        Ok(())
    }
}

fn place_first_fit(
    network: &mut Network,
    bitrate: &Arc<Bitrate>,
    src: usize,
    dst: usize,
) -> Result<Option<Connection>> {
    let route_count =
        network.get_paths().map_or(0, |paths| paths.routes(src, dst).len());

    for r in 0..route_count {
        let Some(route) = network.get_paths().and_then(|paths| paths.routes(src, dst).get(r)).cloned()
        else {
            continue;
        };

        let Some(modulation) = bitrate.adaptive_modulation(&route, Band::C) else {
            continue;
        };
        let required = bitrate.required_slots(modulation, Band::C)? as usize;
        if required == 0 {
            continue;
        }

        let mut slot_count = usize::MAX;
        for &link in route.links() {
            let slots = network.link(link)?.fiber(0)?.number_of_slots(0, Band::C, 0)?;
            slot_count = slot_count.min(slots);
        }
        if slot_count == usize::MAX || slot_count < required {
            continue;
        }

        let mut occupied = vec![false; slot_count];
        for &link in route.links() {
            let slots = network.link(link)?.fiber(0)?.slots(0, Band::C, 0)?;
            for (pos, &slot) in slots.iter().take(slot_count).enumerate() {
                if slot != FREE_SLOT {
                    occupied[pos] = true;
                }
            }
        }

        let mut run_start = 0;
        let mut run_length = 0;
        for pos in 0..slot_count {
            if occupied[pos] {
                run_length = 0;
                run_start = pos + 1;
                continue;
            }
            run_length += 1;
            if run_length == required {
                for &link in route.links() {
                    network.use_slots(link, 0, 0, Band::C, 0, run_start, run_start + required, 0)?;
                }
                let connection = ConnectionBuilder::new(bitrate.clone(), src, dst)
                    .hops_along(&route, 0, 0, Band::C, 0, run_start, run_start + required - 1)?
                    .build();
                return Ok(Some(connection));
            }
        }
    }
    Ok(None)
}

/// A policy that provisions nothing and succeeds; used to observe pure
/// growth behavior.
pub struct Noop;

impl Allocator for Noop {
    fn name(&self) -> &str {
        "Noop"
    }

    fn exec(
        &mut self,
        _network: &mut Network,
        _demands: &mut DemandMatrix,
        _bitrates: &[Arc<Bitrate>],
        _existing_connections: &[Connection],
        _new_connections: &mut Vec<Connection>,
    ) -> Result<()> {
        Ok(())
    }
}
