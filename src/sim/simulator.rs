use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::alloc::Allocator;
use crate::domain::bitrate::Bitrate;
use crate::domain::demand::{Demand, DemandMatrix};
use crate::domain::network::Network;
use crate::domain::node::NodeId;
use crate::domain::route::PathsTable;
use crate::error::{Error, Result};
use crate::math::{GrowthVariable, UniformVariable};
use crate::sim::controller::{Controller, FailureHandler, PeriodCallback};
use crate::sim::event::{Event, EventKind};
use crate::sim::report;

const DEFAULT_K: usize = 3;
const DEFAULT_SEED: u64 = 12345;
const DEFAULT_BASE_GROWTH_RATE: f64 = 0.35;
const DEFAULT_GROWTH_STD_DEV: f64 = 0.1;
const DEFAULT_PERIODS: usize = 3;

/// Seed of the uniform fallback used by automatic demand initialization.
const FALLBACK_DEMAND_SEED: u64 = 505;

/// The period scheduler: evolves demands under the growth process and
/// drives the controller through one provisioning round per period.
///
/// All configuration is locked once `init` runs. Given identical inputs
/// (topology, bitrates, demands, growth seed, growth vector, allocator) the
/// run produces identical connection sequences and slot matrices.
pub struct Simulator {
    controller: Controller,
    events: VecDeque<Event>,
    bitrates: Vec<Arc<Bitrate>>,
    demands: DemandMatrix,

    growth_variable: Option<GrowthVariable>,
    base_growth_rate: f64,
    growth_rate_std_dev: f64,
    seed_growth_rate: u64,
    number_of_periods: usize,
    growth_rates: Vec<f64>,

    init_ready: bool,
    current_period: usize,
    clock: f64,
    last_growth_pct: Option<f64>,
    elapsed: Duration,
}

impl Default for Simulator {
    fn default() -> Self {
        Simulator::new()
    }
}

impl Simulator {
    /// A simulator with no network attached and the built-in bitrate catalog.
    pub fn new() -> Self {
        Simulator {
            controller: Controller::new(),
            events: VecDeque::new(),
            bitrates: Bitrate::default_catalog(),
            demands: DemandMatrix::new(0),
            growth_variable: None,
            base_growth_rate: DEFAULT_BASE_GROWTH_RATE,
            growth_rate_std_dev: DEFAULT_GROWTH_STD_DEV,
            seed_growth_rate: DEFAULT_SEED,
            number_of_periods: DEFAULT_PERIODS,
            growth_rates: Vec::new(),
            init_ready: false,
            current_period: 0,
            clock: 0.0,
            last_growth_pct: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Loads a topology file and computes k-shortest paths (default k = 3).
    pub fn from_topology(path: impl AsRef<Path>) -> Result<Self> {
        Simulator::from_topology_with_k(path, DEFAULT_K)
    }

    pub fn from_topology_with_k(path: impl AsRef<Path>, k: usize) -> Result<Self> {
        let mut simulator = Simulator::new();
        simulator.controller.set_network(Network::from_file(path)?);
        simulator.controller.set_paths(k)?;
        Ok(simulator)
    }

    /// Loads a topology file plus an explicit routes file.
    pub fn from_topology_and_routes(
        topology: impl AsRef<Path>,
        routes: impl AsRef<Path>,
    ) -> Result<Self> {
        let mut simulator = Simulator::new();
        simulator.controller.set_network(Network::from_file(topology)?);
        simulator.controller.set_paths_from_file(routes)?;
        Ok(simulator)
    }

    /// Replaces the built-in bitrate catalog with one loaded from a file.
    pub fn set_bitrates_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_not_init("bitrates")?;
        self.bitrates = Bitrate::read_file(path)?;
        Ok(())
    }

    pub fn set_bitrates(&mut self, bitrates: Vec<Arc<Bitrate>>) -> Result<()> {
        self.ensure_not_init("bitrates")?;
        self.bitrates = bitrates;
        Ok(())
    }

    /// Loads initial demands from a demand-update file.
    pub fn set_demands_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_not_init("demands")?;
        let network = self
            .controller
            .network()
            .ok_or_else(|| Error::Conflict("network must be attached before loading demands".to_string()))?;
        self.demands = DemandMatrix::from_update_file(path, network)?;
        Ok(())
    }

    pub fn set_demands(&mut self, demands: DemandMatrix) -> Result<()> {
        self.ensure_not_init("demands")?;
        self.demands = demands;
        Ok(())
    }

    pub fn set_allocator(&mut self, allocator: Box<dyn Allocator>) -> Result<()> {
        self.ensure_not_init("allocator")?;
        self.controller.set_allocator(allocator);
        Ok(())
    }

    pub fn set_callback(&mut self, callback: PeriodCallback) -> Result<()> {
        self.ensure_not_init("callback")?;
        self.controller.set_callback(callback);
        Ok(())
    }

    pub fn set_failure_handler(&mut self, handler: FailureHandler) -> Result<()> {
        self.ensure_not_init("failure handler")?;
        self.controller.set_failure_handler(handler);
        Ok(())
    }

    pub fn set_number_of_periods(&mut self, periods: usize) -> Result<()> {
        self.ensure_not_init("number of periods")?;
        if periods < 1 {
            return Err(Error::InvalidArgument(
                "number of periods must be at least 1".to_string(),
            ));
        }
        self.number_of_periods = periods;
        Ok(())
    }

    pub fn set_base_growth_rate(&mut self, rate: f64) -> Result<()> {
        self.ensure_not_init("base growth rate")?;
        if rate < 0.0 {
            return Err(Error::InvalidArgument(
                "base growth rate must be non-negative".to_string(),
            ));
        }
        self.base_growth_rate = rate;
        Ok(())
    }

    pub fn set_growth_rate_std_dev(&mut self, std_dev: f64) -> Result<()> {
        self.ensure_not_init("growth rate standard deviation")?;
        if std_dev < 0.0 {
            return Err(Error::InvalidArgument(
                "growth rate standard deviation must be non-negative".to_string(),
            ));
        }
        self.growth_rate_std_dev = std_dev;
        Ok(())
    }

    pub fn set_seed_growth_rate(&mut self, seed: u64) -> Result<()> {
        self.ensure_not_init("growth seed")?;
        self.seed_growth_rate = seed;
        Ok(())
    }

    /// Supplies one growth factor per period, bypassing the growth variable.
    pub fn set_growth_rates(&mut self, growth_rates: Vec<f64>) -> Result<()> {
        self.ensure_not_init("growth rates")?;
        if growth_rates.len() != self.number_of_periods {
            return Err(Error::InvalidArgument(format!(
                "growth rate vector length {} does not match {} periods",
                growth_rates.len(),
                self.number_of_periods
            )));
        }
        self.growth_rates = growth_rates;
        Ok(())
    }

    // ---- getters ----

    pub fn number_of_periods(&self) -> usize {
        self.number_of_periods
    }

    pub fn current_period(&self) -> usize {
        self.current_period
    }

    pub fn base_growth_rate(&self) -> f64 {
        self.base_growth_rate
    }

    pub fn growth_rate_std_dev(&self) -> f64 {
        self.growth_rate_std_dev
    }

    pub fn growth_rates(&self) -> &[f64] {
        &self.growth_rates
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    pub fn demands(&self) -> &DemandMatrix {
        &self.demands
    }

    pub fn demand(&self, src: NodeId, dst: NodeId) -> Option<&Demand> {
        self.demands.get(src, dst)
    }

    pub fn demand_by_id(&self, id: usize) -> Option<&Demand> {
        self.demands.get_by_id(id)
    }

    pub fn bitrates(&self) -> &[Arc<Bitrate>] {
        &self.bitrates
    }

    pub fn get_paths(&self) -> Option<&PathsTable> {
        self.controller.get_paths()
    }

    /// Wall-clock duration of the last `run`, in whole seconds.
    pub fn time_duration(&self) -> u64 {
        self.elapsed.as_secs()
    }

    // ---- lifecycle ----

    /// Rejects configuration changes once `init` has locked the simulator.
    fn ensure_not_init(&self, field: &str) -> Result<()> {
        if self.init_ready {
            return Err(Error::Conflict(format!(
                "cannot set {} after init",
                field
            )));
        }
        Ok(())
    }

    /// Locks the configuration, synthesizes demands when none were supplied,
    /// seeds the growth variable and enqueues the first period event.
    pub fn init(&mut self) -> Result<()> {
        if self.init_ready {
            return Err(Error::Conflict("init was already called".to_string()));
        }
        if self.controller.network().is_none() {
            return Err(Error::Conflict("network must be attached before init".to_string()));
        }

        self.clock = 0.0;
        if self.demands.is_empty() {
            self.initialize_demands()?;
        }
        self.growth_variable = Some(GrowthVariable::new(
            self.seed_growth_rate,
            self.base_growth_rate,
            self.growth_rate_std_dev,
        )?);
        self.events.push_back(Event::new(EventKind::PeriodUpdate, self.clock));
        self.init_ready = true;
        Ok(())
    }

    /// Runs every period, printing the console table only.
    pub fn run(&mut self) -> Result<()> {
        self.run_impl(None)
    }

    /// Runs every period and appends the detailed per-demand report to
    /// `<results_dir>/period_report.txt`.
    pub fn run_with_report(&mut self, results_dir: impl AsRef<Path>) -> Result<()> {
        self.run_impl(Some(results_dir.as_ref()))
    }

    fn run_impl(&mut self, report_dir: Option<&Path>) -> Result<()> {
        if !self.init_ready {
            return Err(Error::Conflict("init must be called before run".to_string()));
        }

        if let Some(network) = self.controller.network() {
            report::print_header(
                network,
                self.number_of_periods,
                self.base_growth_rate,
                self.growth_rate_std_dev,
                !self.growth_rates.is_empty(),
                self.controller.allocator_name(),
            );
        }

        let started = Instant::now();
        while self.current_period < self.number_of_periods {
            let Some(event) = self.events.pop_front() else { break };
            self.clock = event.time();

            match event.kind() {
                EventKind::PeriodUpdate => {
                    self.period_update(started, report_dir)?;
                }
                other => {
                    // failure semantics are deferred; the hook may be a no-op
                    self.controller.handle_failure(&mut self.demands, other, self.clock);
                }
            }
        }

        self.elapsed = started.elapsed();
        report::print_footer(self.elapsed.as_secs_f64());
        Ok(())
    }

    fn period_update(&mut self, started: Instant, report_dir: Option<&Path>) -> Result<()> {
        // period 1 provisions the initial demands; growth starts with period 2
        if self.current_period != 0 {
            let growth = self.next_growth_factor();
            self.apply_growth(growth)?;
            self.last_growth_pct = Some(growth * 100.0);
        }

        self.current_period += 1;

        self.controller.assign_connections(
            &mut self.demands,
            &self.bitrates,
            self.current_period as f64,
        )?;

        if self.current_period < self.number_of_periods {
            self.events.push_back(Event::new(EventKind::PeriodUpdate, self.clock + 1.0));
        }

        if let Some(network) = self.controller.network() {
            let metrics = report::compute_metrics(
                network,
                &self.demands,
                self.controller.connections(),
                self.current_period,
                self.last_growth_pct,
                started.elapsed().as_secs_f64(),
            );
            report::print_row(&metrics);
            if let Some(dir) = report_dir {
                report::append_period_report(dir, network, &self.demands, &metrics)?;
            }
        }

        Ok(())
    }

    fn next_growth_factor(&mut self) -> f64 {
        if !self.growth_rates.is_empty() {
            return self.growth_rates[self.current_period];
        }
        match self.growth_variable.as_mut() {
            Some(variable) => variable.next_value(),
            None => self.base_growth_rate,
        }
    }

    fn apply_growth(&mut self, growth: f64) -> Result<()> {
        for demand in self.demands.iter_mut() {
            let grown = demand.required_capacity() * (1.0 + growth);
            demand.set_required_capacity(grown)?;
        }
        Ok(())
    }

    /// Gravity-style demand synthesis from topology attributes; falls back
    /// to a seeded uniform symmetric matrix when DC/IXP (or degrees) are
    /// missing on any node.
    fn initialize_demands(&mut self) -> Result<()> {
        let network = self
            .controller
            .network()
            .ok_or_else(|| Error::Conflict("network must be attached before init".to_string()))?;

        let total_nodes = network.number_of_nodes();
        if total_nodes == 0 {
            self.demands = DemandMatrix::new(0);
            return Ok(());
        }
        let average_degree = network.number_of_links() as f64 / total_nodes as f64;

        let mut matrix = DemandMatrix::new(total_nodes);
        let generated: Result<()> = (|| {
            let mut demand_id = 0;
            for i in 0..total_nodes {
                for j in 0..total_nodes {
                    if i == j {
                        continue;
                    }
                    let src = network.node(i)?;
                    let dst = network.node(j)?;

                    let combined_degree = (src.degree()? + dst.degree()?) as f64;
                    let delta_i = (src.dcs()? as f64 - src.ixps()? as f64).abs();
                    let delta_j = (dst.dcs()? as f64 - dst.ixps()? as f64).abs();

                    let gbps = if combined_degree > 2.0 * average_degree {
                        combined_degree * (combined_degree - 1.0) * delta_i * delta_j
                    } else {
                        combined_degree * delta_i * delta_j
                    };

                    matrix.insert(Demand::new(demand_id, i, j, gbps)?)?;
                    demand_id += 1;
                }
            }
            Ok(())
        })();

        match generated {
            Ok(()) => {
                self.demands = matrix;
            }
            Err(Error::NotSet(attribute)) => {
                log::warn!(
                    "automatic demand generation needs DCs, IXPs and degrees on every node \
                     ({} missing); initializing with a uniform random symmetric matrix instead",
                    attribute
                );
                self.demands = uniform_random_demands(total_nodes)?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

fn uniform_random_demands(total_nodes: usize) -> Result<DemandMatrix> {
    let mut uniform = UniformVariable::new(FALLBACK_DEMAND_SEED, 50.0, 500.0)?;
    let mut matrix = DemandMatrix::new(total_nodes);
    let mut demand_id = 0;
    for i in 0..total_nodes {
        for j in 0..i {
            // one draw per unordered pair keeps the matrix symmetric
            let traffic = uniform.next_value();
            matrix.insert(Demand::new(demand_id, i, j, traffic)?)?;
            demand_id += 1;
            matrix.insert(Demand::new(demand_id, j, i, traffic)?)?;
            demand_id += 1;
        }
    }
    Ok(matrix)
}
