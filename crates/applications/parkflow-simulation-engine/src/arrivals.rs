//! Time-of-day modulated vehicle arrivals
//!
//! Models arrivals as a deterministic per-tick batch with:
//! - A base rate, scaled by a triangular peak-hour multiplier (1.0 -> 1.5 -> 1.0)
//! - A fixed categorical distribution over vehicle categories
//! - Lost-arrival semantics: anything the queue can't hold is never created

use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};
use tracing::warn;

use crate::config::SimulationConfig;
use crate::error::{Result, SimulationError};
use crate::queue::ArrivalQueue;
use crate::types::{Category, CategoryCounts, PeakWindow, Vehicle, VehicleId, hour_of_day};

/// Outcome of one arrival batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrivalReport {
    pub admitted: usize,
    pub dropped: usize,
}

/// Vehicle generator
pub struct ArrivalGenerator {
    base_rate: u32,
    interval: u64,
    cutoff_hour: Option<u32>,
    peak: PeakWindow,
    categories: WeightedIndex<f64>,
    next_id: VehicleId,
}

impl ArrivalGenerator {
    /// Create a generator
    ///
    /// # Arguments
    /// * `base_rate` - Vehicles per batch outside the peak window
    /// * `peak` - Window in which the rate ramps up to 1.5x
    /// * `probabilities` - Category distribution (must sum to 1)
    pub fn new(base_rate: u32, peak: PeakWindow, probabilities: CategoryCounts<f64>) -> Result<Self> {
        let weights = Category::ALL.map(|c| probabilities.get(c));
        let categories = WeightedIndex::new(weights).map_err(|e| {
            SimulationError::config(format!("invalid arrival probabilities: {e}"))
        })?;

        Ok(ArrivalGenerator {
            base_rate,
            interval: 1,
            cutoff_hour: None,
            peak,
            categories,
            next_id: 1,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let generator = Self::new(
            config.cars_per_tick,
            config.peak_window(),
            config.arrival_probabilities,
        )?;
        Ok(generator.with_schedule(config.arrival_interval, config.arrival_cutoff_hour))
    }

    /// Only generate every `interval` ticks, and not after `cutoff_hour`
    pub fn with_schedule(mut self, interval: u64, cutoff_hour: Option<u32>) -> Self {
        self.interval = interval.max(1);
        self.cutoff_hour = cutoff_hour;
        self
    }

    /// Number of vehicles due at `tick`, truncated toward zero
    pub fn target_count(&self, tick: u64) -> usize {
        if tick % self.interval != 0 {
            return 0;
        }
        if self.cutoff_hour.is_some_and(|cutoff| hour_of_day(tick) > cutoff) {
            return 0;
        }
        (self.base_rate as f64 * self.peak.multiplier(tick)).trunc() as usize
    }

    /// Generate this tick's vehicles straight into `queue`.
    ///
    /// Vehicles beyond the queue's spare capacity are not created.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        tick: u64,
        queue: &mut ArrivalQueue,
        rng: &mut R,
    ) -> ArrivalReport {
        let target = self.target_count(tick);
        let admitted = target.min(queue.spare_capacity());

        for _ in 0..admitted {
            let category = Category::ALL[self.categories.sample(rng)];
            let vehicle = Vehicle::new(self.next_id, category, tick);
            self.next_id += 1;
            queue.try_push(vehicle);
        }

        let dropped = target - admitted;
        if dropped > 0 {
            warn!(tick, dropped, queue_len = queue.len(), "queue full, arrivals lost");
        }

        ArrivalReport { admitted, dropped }
    }

    /// Id the next admitted vehicle will receive
    pub fn next_id(&self) -> VehicleId {
        self.next_id
    }
}
