//! Tick-driven parking lot simulator
//!
//! Each one-minute tick runs a fixed sequence: advance the clock, admit
//! arrivals, reshape capacity and match the queue head, sample departures,
//! then record a snapshot. A tick either completes or aborts the run.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::thread;
use tracing::{debug, error, info};

use crate::arrivals::ArrivalGenerator;
use crate::config::SimulationConfig;
use crate::dwell::DwellModel;
use crate::error::{Result, SimulationError};
use crate::layout::GridView;
use crate::ledger::Ledger;
use crate::metrics::{RunCounters, RunSummary};
use crate::policies::{AllocationPolicy, build_policy};
use crate::pool::SpotPool;
use crate::queue::ArrivalQueue;
use crate::types::{CategoryCounts, Vehicle, VehicleId, hour_of_day};

/// State of the lot after a completed tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub tick: u64,
    pub parked_count: usize,
    pub queue_length: usize,
    pub available_by_category: CategoryCounts<usize>,
    pub total_by_category: CategoryCounts<usize>,
    pub cumulative_earnings: f64,
    pub departed_count: usize,
    pub lost_arrivals: usize,
    /// Queued vehicle ids, head first
    pub queue_order: Vec<VehicleId>,
}

/// Result of a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub policy_name: String,
    pub summary: RunSummary,
    pub snapshots: Vec<TickSnapshot>,
    /// Every departed vehicle, in departure order
    pub graveyard: Vec<Vehicle>,
}

/// Simulation clock owning all mutable lot state
pub struct Simulator {
    config: SimulationConfig,
    tick: u64,
    pool: SpotPool,
    queue: ArrivalQueue,
    generator: ArrivalGenerator,
    dwell: DwellModel,
    policy: Box<dyn AllocationPolicy>,
    ledger: Ledger,
    graveyard: Vec<Vehicle>,
    rng: ChaCha8Rng,
    snapshots: Vec<TickSnapshot>,
    counters: RunCounters,
}

impl Simulator {
    /// Create a simulator running the policy named in `config`
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let policy = build_policy(&config);
        Self::with_policy(config, policy)
    }

    /// Create a simulator with an explicit policy implementation
    pub fn with_policy(config: SimulationConfig, policy: Box<dyn AllocationPolicy>) -> Result<Self> {
        config.validate()?;

        Ok(Simulator {
            tick: 0,
            pool: SpotPool::new(config.initial_spots(), config.grid),
            queue: ArrivalQueue::new(config.max_queue_size),
            generator: ArrivalGenerator::from_config(&config)?,
            dwell: DwellModel::new(config.dwell),
            policy,
            ledger: Ledger::new(config.fares),
            graveyard: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            snapshots: Vec::new(),
            counters: RunCounters::default(),
            config,
        })
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn is_finished(&self) -> bool {
        self.tick >= self.config.run_length
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn pool(&self) -> &SpotPool {
        &self.pool
    }

    pub fn queue(&self) -> &ArrivalQueue {
        &self.queue
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn graveyard(&self) -> &[Vehicle] {
        &self.graveyard
    }

    pub fn snapshots(&self) -> &[TickSnapshot] {
        &self.snapshots
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Display projection of the current lot
    pub fn grid_view(&self) -> GridView {
        GridView::project(&self.pool, &self.queue)
    }

    /// Advance one tick and return its snapshot
    pub fn step(&mut self) -> Result<TickSnapshot> {
        if self.is_finished() {
            return Err(SimulationError::invariant(format!(
                "tick requested past the run horizon of {}",
                self.config.run_length
            )));
        }

        self.tick += 1;
        let tick = self.tick;

        let arrivals = self.generator.generate(tick, &mut self.queue, &mut self.rng);
        self.counters.total_arrivals += arrivals.admitted;
        self.counters.lost_arrivals += arrivals.dropped;

        self.allocate(tick)?;
        self.process_departures(tick)?;
        self.verify_invariants()?;

        let snapshot = self.capture_snapshot();
        self.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    /// Run to the configured horizon
    pub fn run(&mut self) -> Result<SimulationResult> {
        info!(
            policy = self.policy.name(),
            spots = self.pool.len(),
            ticks = self.config.run_length,
            seed = self.config.seed,
            "starting simulation"
        );

        while !self.is_finished() {
            if let Err(e) = self.step() {
                error!(policy = self.policy.name(), tick = self.tick, error = %e, "simulation aborted");
                return Err(e);
            }
        }

        let result = self.result();
        info!(
            policy = %result.policy_name,
            departed = result.graveyard.len(),
            earnings = result.summary.total_earnings,
            "simulation complete"
        );
        Ok(result)
    }

    /// Package the run so far
    pub fn result(&self) -> SimulationResult {
        SimulationResult {
            policy_name: self.policy.name().to_string(),
            summary: RunSummary::from_run(
                self.policy.name(),
                &self.snapshots,
                &self.graveyard,
                &self.ledger,
                &self.counters,
            ),
            snapshots: self.snapshots.clone(),
            graveyard: self.graveyard.clone(),
        }
    }

    /// Reshape once, then serve the queue head up to `allocations_per_tick`
    /// times, stopping as soon as the queue stops shrinking.
    fn allocate(&mut self, tick: u64) -> Result<()> {
        self.queue.tick_waiting();

        let reclassified = self.policy.reshape_capacity(&mut self.pool, tick)?;
        self.counters.reclassified_spots += reclassified;
        if reclassified > 0 {
            debug!(tick, hour = hour_of_day(tick), reclassified, "capacity reshaped");
        }

        for _ in 0..self.config.allocations_per_tick {
            let before = self.queue.len();
            let Some(placement) = self.policy.match_head(&mut self.queue, &mut self.pool, tick)? else {
                break;
            };

            self.counters.placements += 1;
            if placement.via_backup {
                self.counters.backup_placements += 1;
            }
            if self.queue.len() >= before {
                break;
            }
        }
        Ok(())
    }

    /// Sample every parked vehicle once; winners leave this tick
    fn process_departures(&mut self, tick: u64) -> Result<()> {
        for spot_id in self.pool.occupied_ids() {
            let elapsed = self
                .pool
                .spot(spot_id)
                .and_then(|spot| spot.occupant())
                .map(|vehicle| vehicle.elapsed_parked(tick))
                .ok_or_else(|| SimulationError::invariant(format!("occupied spot {spot_id} lost its vehicle")))?;

            if !self.dwell.should_leave(elapsed, &mut self.rng) {
                continue;
            }

            let mut vehicle = self.pool.release(spot_id)?;
            vehicle.parked = false;
            vehicle.departed_tick = Some(tick);
            let fare = self.ledger.credit_departure(vehicle.category);

            debug!(tick, vehicle = vehicle.id, spot = spot_id, elapsed, fare, "vehicle departed");
            self.graveyard.push(vehicle);
        }
        Ok(())
    }

    /// Conservation checks that only a broken allocator could fail
    fn verify_invariants(&self) -> Result<()> {
        let totals = self.pool.total_by_category();
        if totals.total() != self.config.total_spots() {
            return Err(SimulationError::invariant(format!(
                "lot holds {} spots, expected {}",
                totals.total(),
                self.config.total_spots()
            )));
        }

        if self.queue.len() > self.queue.capacity() {
            return Err(SimulationError::invariant(format!(
                "queue length {} exceeds capacity {}",
                self.queue.len(),
                self.queue.capacity()
            )));
        }

        let mut seen = HashSet::new();
        let live = self
            .queue
            .iter()
            .chain(self.pool.spots().iter().filter_map(|spot| spot.occupant()));
        for vehicle in live {
            if !seen.insert(vehicle.id) {
                return Err(SimulationError::invariant(format!(
                    "vehicle {} is held by two containers",
                    vehicle.id
                )));
            }
        }

        let accounted = seen.len() + self.graveyard.len();
        if accounted != self.counters.total_arrivals {
            return Err(SimulationError::invariant(format!(
                "{} vehicles admitted but {} accounted for",
                self.counters.total_arrivals, accounted
            )));
        }
        Ok(())
    }

    fn capture_snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            tick: self.tick,
            parked_count: self.pool.parked_count(),
            queue_length: self.queue.len(),
            available_by_category: self.pool.available_by_category(),
            total_by_category: self.pool.total_by_category(),
            cumulative_earnings: self.ledger.total(),
            departed_count: self.graveyard.len(),
            lost_arrivals: self.counters.lost_arrivals,
            queue_order: self.queue.ids(),
        }
    }
}

/// Run independent configurations side by side, one thread each.
///
/// Results come back in input order.
pub fn run_batch(configs: &[SimulationConfig]) -> Vec<Result<SimulationResult>> {
    thread::scope(|scope| {
        let handles: Vec<_> = configs
            .iter()
            .map(|config| scope.spawn(move || Simulator::new(config.clone())?.run()))
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(SimulationError::invariant("simulation thread panicked")))
            })
            .collect()
    })
}
