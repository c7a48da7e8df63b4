use std::process::ExitCode;
use std::sync::Arc;

use opticap::alloc::helpers::{adaptive_modulation, num_routes, route_at, ConnectionBuilder};
use opticap::alloc::Allocator;
use opticap::domain::bitrate::Bitrate;
use opticap::domain::connection::Connection;
use opticap::domain::demand::DemandMatrix;
use opticap::domain::fiber::{Band, FREE_SLOT};
use opticap::domain::network::Network;
use opticap::error::Result;
use opticap::logger;
use opticap::sim::simulator::Simulator;

/// First-fit spectrum assignment over the precomputed routes: for every
/// unprovisioned demand, largest bitrate first, first route whose C-band
/// (fiber 0, core 0, mode 0) has a contiguous free block shared by all hops.
struct FirstFit;

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

                // largest bitrate not overshooting, else the smallest one
                let bitrate = bitrates
                    .iter()
                    .filter(|bitrate| bitrate.gbps() <= unprovisioned)
                    .last()
                    .or_else(|| bitrates.first())
                    .cloned();
                let Some(bitrate) = bitrate else { break };

                let Some(placed) = place(network, &bitrate, src, dst)? else {
                    // no spectrum left for this pair in this period
                    break;
                };

                if let Some(demand) = demands.get_mut(src, dst) {
                    demand.add_allocated_capacity(bitrate.gbps())?;
                }
                new_connections.push(placed);
            }
        }
        Ok(())
    }
}

/// Tries each route in rank order and returns a connection occupying the
/// first contiguous block free on every hop, marking it on the snapshot so
/// later placements in the same period see it.
fn place(
    network: &mut Network,
    bitrate: &Arc<Bitrate>,
    src: usize,
    dst: usize,
) -> Result<Option<Connection>> {
    for r in 0..num_routes(network, src, dst) {
        let Some(route) = route_at(network, src, dst, r) else { continue };
        let route = route.clone();

        let Some(modulation) = adaptive_modulation(bitrate, &route, Band::C) else {
            continue;
        };
        let required = bitrate.required_slots(modulation, Band::C)? as usize;
        if required == 0 {
            continue;
        }

        // union of occupancy across all hops, limited to the shortest fiber
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

fn run(args: &[String]) -> Result<()> {
    let topology = &args[0];

    let mut simulator = Simulator::from_topology(topology)?;
    if let Some(bitrates) = args.get(1) {
        simulator.set_bitrates_file(bitrates)?;
    }
    if let Some(demands) = args.get(2) {
        simulator.set_demands_file(demands)?;
    }

    simulator.set_allocator(Box::new(FirstFit))?;
    simulator.init()?;
    simulator.run_with_report("results")?;

    if let Some(network) = simulator.controller().network() {
        network.export_topology("network_export.json")?;
        network.export_routes("routes_export.json")?;
    }
    simulator
        .controller()
        .export_demands(simulator.demands(), simulator.current_period() as f64, "demands_export.json")?;

    Ok(())
}

fn main() -> ExitCode {
    logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: opticap <topology.json> [bitrates.json] [demands.json]");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("simulation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
