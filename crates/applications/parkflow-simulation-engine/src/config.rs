//! Simulation configuration
//!
//! Everything a run needs is fixed here at construction. `validate` is the
//! only place configuration errors are raised; a config that passes it
//! never fails mid-run for configuration reasons.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, SimulationError};
use crate::types::{Category, CategoryCounts, MINUTES_PER_DAY, PeakWindow};

const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Longest accepted horizon: one simulated year
pub const MAX_RUN_LENGTH: u64 = MINUTES_PER_DAY * 365;

/// Allocation policy variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PolicyKind {
    /// Fixed category split for the whole run
    #[default]
    Priority,
    /// Electric share follows observed electric availability
    OnDemand,
    /// Electric share follows the time of day
    TimeBased,
    /// Fixed split with Premium spots and a Premium fallback chain
    Membership,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Priority,
        PolicyKind::OnDemand,
        PolicyKind::TimeBased,
        PolicyKind::Membership,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Priority => "Priority",
            PolicyKind::OnDemand => "On-Demand",
            PolicyKind::TimeBased => "Time-based",
            PolicyKind::Membership => "Membership",
        }
    }
}

impl FromStr for PolicyKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priority" => Ok(PolicyKind::Priority),
            "on-demand" | "ondemand" | "on_demand" => Ok(PolicyKind::OnDemand),
            "time-based" | "timebased" | "time_based" => Ok(PolicyKind::TimeBased),
            "membership" => Ok(PolicyKind::Membership),
            _ => Err(SimulationError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Explicit grid dimensions (display labels only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDimensions {
    pub width: usize,
    pub height: usize,
}

impl GridDimensions {
    pub fn capacity(&self) -> usize {
        self.width * self.height
    }
}

/// Dwell thresholds in minutes (`min < med < max`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellThresholds {
    pub min: u64,
    pub med: u64,
    pub max: u64,
}

impl Default for DwellThresholds {
    fn default() -> Self {
        DwellThresholds { min: 25, med: 50, max: 75 }
    }
}

/// Full configuration surface of one simulation instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid dimensions; derived from the spot count when absent
    pub grid: Option<GridDimensions>,

    pub standard_spots: usize,
    pub electric_spots: usize,
    pub premium_spots: usize,

    /// Category distribution of arriving vehicles
    pub arrival_probabilities: CategoryCounts<f64>,

    pub max_queue_size: usize,

    /// Base number of vehicles generated per arrival batch
    pub cars_per_tick: u32,

    /// Ticks between arrival batches
    pub arrival_interval: u64,

    /// Last hour of day (inclusive) in which vehicles arrive
    pub arrival_cutoff_hour: Option<u32>,

    pub peak_start_hour: u32,
    pub peak_end_hour: u32,

    pub policy: PolicyKind,

    pub dwell: DwellThresholds,

    /// Flat fee credited on departure, per category
    pub fares: CategoryCounts<f64>,

    /// Upper bound on queue-head matches per tick
    pub allocations_per_tick: u32,

    /// Upper bound on spots reclassified per tick by reshaping policies
    pub max_reclassifications_per_tick: usize,

    /// Number of one-minute ticks to run
    pub run_length: u64,

    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            grid: None,
            standard_spots: 54,
            electric_spots: 6,
            premium_spots: 0,
            arrival_probabilities: CategoryCounts {
                standard: 0.9,
                electric: 0.1,
                premium: 0.0,
            },
            max_queue_size: 20,
            cars_per_tick: 1,
            arrival_interval: 1,
            arrival_cutoff_hour: None,
            peak_start_hour: 8,
            peak_end_hour: 18,
            policy: PolicyKind::Priority,
            dwell: DwellThresholds::default(),
            fares: CategoryCounts {
                standard: 5.0,
                electric: 8.0,
                premium: 12.0,
            },
            allocations_per_tick: 1,
            max_reclassifications_per_tick: 1,
            run_length: MINUTES_PER_DAY,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Default lot reshaped for a given policy.
    ///
    /// Membership carves 10% of the lot out for Premium spots and admits
    /// 10% Premium arrivals; the other policies run a 90/10 Standard/Electric lot.
    pub fn preset(policy: PolicyKind) -> Self {
        let mut config = SimulationConfig {
            policy,
            ..SimulationConfig::default()
        };
        let total = config.total_spots();

        if policy == PolicyKind::Membership {
            config.electric_spots = total / 10;
            config.premium_spots = total / 10;
            config.standard_spots = total - config.electric_spots - config.premium_spots;
            config.arrival_probabilities = CategoryCounts {
                standard: 0.8,
                electric: 0.1,
                premium: 0.1,
            };
        }

        config
    }

    /// Load a (possibly partial) config from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn total_spots(&self) -> usize {
        self.standard_spots + self.electric_spots + self.premium_spots
    }

    pub fn initial_spots(&self) -> CategoryCounts<usize> {
        CategoryCounts {
            standard: self.standard_spots,
            electric: self.electric_spots,
            premium: self.premium_spots,
        }
    }

    pub fn peak_window(&self) -> PeakWindow {
        PeakWindow::new(self.peak_start_hour, self.peak_end_hour)
    }

    /// Whether a vehicle of `category` has any spot it could ever take.
    ///
    /// Electric falls back to Standard; Premium falls back to Standard or
    /// Electric under Membership only. TimeBased can relabel spots between
    /// Standard and Electric. OnDemand only turns Electric spots into
    /// Standard ones once Electric vehicles occupy some of them.
    pub fn can_ever_serve(&self, category: Category) -> bool {
        let shared = self.standard_spots + self.electric_spots;
        let relabels_to_standard = match self.policy {
            PolicyKind::TimeBased => shared > 0,
            PolicyKind::OnDemand => {
                self.electric_spots > 0 && self.arrival_probabilities.electric > 0.0
            }
            PolicyKind::Priority | PolicyKind::Membership => false,
        };
        match category {
            Category::Standard => self.standard_spots > 0 || relabels_to_standard,
            Category::Electric => shared > 0,
            Category::Premium => {
                self.premium_spots > 0 || (self.policy == PolicyKind::Membership && shared > 0)
            }
        }
    }

    /// Reject configurations that could only fail at runtime
    pub fn validate(&self) -> Result<()> {
        let probabilities = &self.arrival_probabilities;
        if Category::ALL
            .iter()
            .any(|&c| !probabilities.get(c).is_finite() || probabilities.get(c) < 0.0)
        {
            return Err(SimulationError::config(
                "arrival probabilities must be finite and non-negative",
            ));
        }
        let sum = probabilities.standard + probabilities.electric + probabilities.premium;
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(SimulationError::InvalidProbabilities { sum });
        }

        if self.max_queue_size == 0 {
            return Err(SimulationError::config("max_queue_size must be positive"));
        }

        if self.total_spots() == 0 {
            return Err(SimulationError::config("the lot needs at least one spot"));
        }

        if let Some(grid) = self.grid {
            if grid.capacity() < self.total_spots() {
                return Err(SimulationError::config(format!(
                    "grid {}x{} holds {} cells but {} spots were requested",
                    grid.width,
                    grid.height,
                    grid.capacity(),
                    self.total_spots()
                )));
            }
        }

        let dwell = self.dwell;
        if !(dwell.min < dwell.med && dwell.med < dwell.max) {
            return Err(SimulationError::config(format!(
                "dwell thresholds must satisfy min < med < max (got {}/{}/{})",
                dwell.min, dwell.med, dwell.max
            )));
        }

        if self.peak_start_hour >= self.peak_end_hour || self.peak_end_hour > 24 {
            return Err(SimulationError::config(format!(
                "invalid peak window {}..{}",
                self.peak_start_hour, self.peak_end_hour
            )));
        }

        if let Some(hour) = self.arrival_cutoff_hour {
            if hour > 23 {
                return Err(SimulationError::config(format!(
                    "arrival_cutoff_hour must be in 0..=23 (got {hour})"
                )));
            }
        }

        if self.allocations_per_tick == 0 {
            return Err(SimulationError::config("allocations_per_tick must be positive"));
        }

        if self.arrival_interval == 0 {
            return Err(SimulationError::config("arrival_interval must be positive"));
        }

        if Category::ALL
            .iter()
            .any(|&c| !self.fares.get(c).is_finite() || self.fares.get(c) < 0.0)
        {
            return Err(SimulationError::config("fares must be finite and non-negative"));
        }

        if self.run_length == 0 || self.run_length > MAX_RUN_LENGTH {
            return Err(SimulationError::config(format!(
                "run_length must be in 1..={MAX_RUN_LENGTH} (got {})",
                self.run_length
            )));
        }

        for category in Category::ALL {
            if probabilities.get(category) > 0.0 && !self.can_ever_serve(category) {
                return Err(SimulationError::config(format!(
                    "{} policy can never park {} arrivals with {}/{}/{} Standard/Electric/Premium spots",
                    self.policy.name(),
                    category,
                    self.standard_spots,
                    self.electric_spots,
                    self.premium_spots
                )));
            }
        }

        Ok(())
    }
}
