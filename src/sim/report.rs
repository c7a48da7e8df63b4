//! Console period table and the persisted plain-text period report.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::domain::connection::Connection;
use crate::domain::demand::DemandMatrix;
use crate::domain::fiber::FREE_SLOT;
use crate::domain::network::Network;
use crate::error::Result;

const EPSILON: f64 = 1e-9;

/// Aggregate figures of one provisioning period.
#[derive(Debug, Clone)]
pub struct PeriodMetrics {
    pub period: usize,
    pub total_connections: usize,
    pub total_demands: usize,
    pub under_provisioned_count: usize,
    pub total_required_gbps: f64,
    pub total_allocated_gbps: f64,
    pub total_under_gbps: f64,
    pub total_over_gbps: f64,
    pub utilization_pct: f64,
    pub under_provisioning_pct: f64,
    pub is_symmetric: bool,
    pub growth_pct: Option<f64>,
    pub elapsed_secs: f64,
}

pub fn compute_metrics(
    network: &Network,
    demands: &DemandMatrix,
    connections: &[Connection],
    period: usize,
    growth_pct: Option<f64>,
    elapsed_secs: f64,
) -> PeriodMetrics {
    let mut total_demands = 0;
    let mut under_provisioned_count = 0;
    let mut total_required = 0.0;
    let mut total_allocated = 0.0;
    let mut total_under = 0.0;
    let mut total_over = 0.0;
    let mut is_symmetric = true;

    for demand in demands.iter() {
        let required = demand.required_capacity();
        let allocated = demand.allocated_capacity();

        total_demands += 1;
        total_required += required;
        total_allocated += allocated;

        let deficit = (required - allocated).max(0.0);
        total_under += deficit;
        total_over += (allocated - required).max(0.0);

        if !demand.is_provisioned() || deficit > EPSILON {
            under_provisioned_count += 1;
        }

        if let Some(reverse) = demands.get(demand.dst(), demand.src()) {
            if (allocated - reverse.allocated_capacity()).abs() > EPSILON {
                is_symmetric = false;
            }
        } else {
            is_symmetric = false;
        }
    }

    let under_provisioning_pct =
        if total_required > 0.0 { total_under / total_required * 100.0 } else { 0.0 };

    PeriodMetrics {
        period,
        total_connections: connections.len(),
        total_demands,
        under_provisioned_count,
        total_required_gbps: total_required,
        total_allocated_gbps: total_allocated,
        total_under_gbps: total_under,
        total_over_gbps: total_over,
        utilization_pct: network_utilization_pct(network),
        under_provisioning_pct,
        is_symmetric,
        growth_pct,
        elapsed_secs,
    }
}

/// Used-slot share over every (fiber, band, core, mode, slot) cell, 0..100.
pub fn network_utilization_pct(network: &Network) -> f64 {
    let mut total = 0usize;
    let mut used = 0usize;
    for link in network.links() {
        for fiber in link.fibers() {
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
    }
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

pub fn print_header(network: &Network, periods: usize, base_rate: f64, std_dev: f64, user_growth: bool, allocator: &str) {
    println!("\n--- opticap ({}) ---\n", env!("CARGO_PKG_VERSION"));
    println!("{:<20}{}", "Network:", network.name());
    println!("{:<20}{}", "Nodes:", network.number_of_nodes());
    println!("{:<20}{}", "Links:", network.number_of_links());
    println!("{:<20}{}", "Periods:", periods);
    if user_growth {
        println!("{:<20}{}", "Growth Rate:", "USER DEFINED");
    } else {
        println!("{:<20}{}", "Growth Rate:", base_rate);
        println!("{:<20}{}", "Std deviation:", std_dev);
    }
    println!("{:<20}{}", "Algorithm:", allocator);
    println!();
    print_separator();
    println!(
        "| {:>7} | {:>9} | {:>16} | {:>18} | {:>9} | {:>14} | {:>10} | {:>8} |",
        "Period", "Total LPs", "Req. Cap. (Tbps)", "Alloc. Cap. (Tbps)", "Util. (%)", "Underprv. (%)", "Growth (%)", "time (s)"
    );
    print_separator();
}

pub fn print_row(metrics: &PeriodMetrics) {
    let growth = match metrics.growth_pct {
        Some(pct) => format!("{:.1}", pct),
        None => "-".to_string(),
    };
    println!(
        "| {:>7} | {:>9} | {:>16.2} | {:>18.2} | {:>9.1} | {:>14.1} | {:>10} | {:>8.0} |",
        metrics.period,
        metrics.total_connections,
        metrics.total_required_gbps / 1000.0,
        metrics.total_allocated_gbps / 1000.0,
        metrics.utilization_pct,
        metrics.under_provisioning_pct,
        growth,
        metrics.elapsed_secs
    );
}

pub fn print_footer(elapsed_secs: f64) {
    print_separator();
    println!("\n--- Simulation Completed in {:.1} seconds ---\n", elapsed_secs);
}

fn print_separator() {
    println!(
        "+{:-<9}+{:-<11}+{:-<18}+{:-<20}+{:-<11}+{:-<16}+{:-<12}+{:-<10}+",
        "", "", "", "", "", "", "", ""
    );
}

/// Appends one period to `<dir>/period_report.txt`: per-demand rows followed
/// by an aggregate summary. Symmetric matrices collapse to one row per
/// unordered pair.
pub fn append_period_report(
    dir: impl AsRef<Path>,
    network: &Network,
    demands: &DemandMatrix,
    metrics: &PeriodMetrics,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut file = OpenOptions::new().create(true).append(true).open(dir.join("period_report.txt"))?;

    writeln!(file, "\nPeriod {}:", metrics.period)?;
    writeln!(file, "{}", "=".repeat(140))?;
    writeln!(
        file,
        "{:<13}| {:<40}| {:<17}| {:<18}| {:<16}| {:<18}",
        "Demand ID", "Src -> Dst", "Required (Gbps)", "Allocated (Gbps)", "Deficit (Gbps)", "Status"
    )?;
    writeln!(
        file,
        "{:-<13}+{:-<41}+{:-<18}+{:-<19}+{:-<17}+{:-<19}",
        "", "", "", "", "", ""
    )?;

    for demand in demands.iter() {
        if metrics.is_symmetric && demand.src() > demand.dst() {
            continue;
        }

        let required = demand.required_capacity();
        let allocated = demand.allocated_capacity();
        let deficit = (required - allocated).max(0.0);
        let status = if demand.is_provisioned() { "OK" } else { "Underprovisioned" };

        let src_name = node_name(network, demand.src());
        let dst_name = node_name(network, demand.dst());
        let connector = if metrics.is_symmetric { " <-> " } else { " -> " };

        writeln!(
            file,
            "{:<13}| {:<40}| {:<17.1}| {:<18.1}| {:<16.1}| {:<18}",
            demand.id(),
            format!("{}{}{}", src_name, connector, dst_name),
            required,
            allocated,
            deficit,
            status
        )?;
    }

    writeln!(file, "{}", "=".repeat(140))?;
    writeln!(file, "PERIOD SUMMARY:")?;
    writeln!(file, "Total Connections: {}", metrics.total_connections)?;
    writeln!(
        file,
        "Aggregate Required Capacity: {:.2} Tbps",
        metrics.total_required_gbps / 1000.0
    )?;
    writeln!(
        file,
        "Aggregate Allocated Capacity: {:.2} Tbps",
        metrics.total_allocated_gbps / 1000.0
    )?;
    let under_share = if metrics.total_demands > 0 {
        100.0 * metrics.under_provisioned_count as f64 / metrics.total_demands as f64
    } else {
        0.0
    };
    writeln!(
        file,
        "Underprovisioned Demands: {}/{} ({:.1}%)",
        metrics.under_provisioned_count, metrics.total_demands, under_share
    )?;
    let under_ratio = if metrics.total_required_gbps > 0.0 {
        metrics.total_under_gbps / metrics.total_required_gbps
    } else {
        0.0
    };
    let over_ratio = if metrics.total_required_gbps > 0.0 {
        metrics.total_over_gbps / metrics.total_required_gbps
    } else {
        0.0
    };
    writeln!(
        file,
        "Underprovisioning Ratio: {:.3} ({:.1}% of capacity deficit)",
        under_ratio,
        under_ratio * 100.0
    )?;
    writeln!(
        file,
        "Overprovisioning Ratio: {:.3} ({:.1}% excess capacity)",
        over_ratio,
        over_ratio * 100.0
    )?;
    writeln!(file, "Resource Utilization: {:.1}%", metrics.utilization_pct)?;
    writeln!(file, "{}\n", "=".repeat(140))?;

    Ok(())
}

fn node_name(network: &Network, id: usize) -> String {
    network
        .node(id)
        .ok()
        .and_then(|node| node.label_opt().map(str::to_string))
        .unwrap_or_else(|| format!("Node {}", id))
}
