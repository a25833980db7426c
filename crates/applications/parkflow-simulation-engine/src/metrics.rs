//! Aggregate statistics over a finished (or partial) run

use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;
use crate::simulator::TickSnapshot;
use crate::types::{Category, CategoryCounts, Vehicle};

/// Running tallies kept by the simulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub total_arrivals: usize,
    pub lost_arrivals: usize,
    pub placements: usize,
    pub backup_placements: usize,
    pub reclassified_spots: usize,
}

/// Mean queue wait (ticks) of departed vehicles
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaitStats {
    pub overall: Option<f64>,
    pub by_category: CategoryCounts<Option<f64>>,
    pub max: Option<u64>,
}

impl WaitStats {
    pub fn from_vehicles(vehicles: &[Vehicle]) -> Self {
        let mean = |waits: Vec<u64>| {
            if waits.is_empty() {
                None
            } else {
                Some(waits.iter().sum::<u64>() as f64 / waits.len() as f64)
            }
        };

        let mut by_category = CategoryCounts::default();
        for category in Category::ALL {
            let waits = vehicles
                .iter()
                .filter(|v| v.category == category)
                .map(|v| v.waiting_ticks)
                .collect();
            *by_category.get_mut(category) = mean(waits);
        }

        WaitStats {
            overall: mean(vehicles.iter().map(|v| v.waiting_ticks).collect()),
            by_category,
            max: vehicles.iter().map(|v| v.waiting_ticks).max(),
        }
    }
}

/// Headline numbers for comparing policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub policy_name: String,
    pub ticks: u64,
    /// Vehicles parked at the final tick
    pub parked_cars: usize,
    /// Vehicles that ever parked (still parked + departed)
    pub total_cars_parked: usize,
    pub departed_cars: usize,
    pub max_waiting_cars: usize,
    pub average_available: CategoryCounts<f64>,
    pub total_earnings: f64,
    pub earnings_by_category: CategoryCounts<f64>,
    pub arrivals: usize,
    pub lost_arrivals: usize,
    pub backup_placements: usize,
    pub reclassified_spots: usize,
    pub waits: WaitStats,
}

impl RunSummary {
    pub fn from_run(
        policy_name: &str,
        snapshots: &[TickSnapshot],
        graveyard: &[Vehicle],
        ledger: &Ledger,
        counters: &RunCounters,
    ) -> Self {
        let last = snapshots.last();
        let parked_cars = last.map_or(0, |s| s.parked_count);

        let mut average_available = CategoryCounts::default();
        if !snapshots.is_empty() {
            for category in Category::ALL {
                let sum: usize = snapshots
                    .iter()
                    .map(|s| s.available_by_category.get(category))
                    .sum();
                *average_available.get_mut(category) = sum as f64 / snapshots.len() as f64;
            }
        }

        RunSummary {
            policy_name: policy_name.to_string(),
            ticks: last.map_or(0, |s| s.tick),
            parked_cars,
            total_cars_parked: parked_cars + graveyard.len(),
            departed_cars: graveyard.len(),
            max_waiting_cars: snapshots.iter().map(|s| s.queue_length).max().unwrap_or(0),
            average_available,
            total_earnings: ledger.total(),
            earnings_by_category: ledger.by_category(),
            arrivals: counters.total_arrivals,
            lost_arrivals: counters.lost_arrivals,
            backup_placements: counters.backup_placements,
            reclassified_spots: counters.reclassified_spots,
            waits: WaitStats::from_vehicles(graveyard),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn departed(id: u64, category: Category, waiting_ticks: u64) -> Vehicle {
        let mut vehicle = Vehicle::new(id, category, 0);
        vehicle.waiting_ticks = waiting_ticks;
        vehicle.parked_tick = Some(waiting_ticks);
        vehicle.departed_tick = Some(waiting_ticks + 30);
        vehicle
    }

    fn snapshot(tick: u64, parked: usize, queued: usize, free_standard: usize) -> TickSnapshot {
        TickSnapshot {
            tick,
            parked_count: parked,
            queue_length: queued,
            available_by_category: CategoryCounts { standard: free_standard, electric: 1, premium: 0 },
            total_by_category: CategoryCounts { standard: 4, electric: 1, premium: 0 },
            cumulative_earnings: 0.0,
            departed_count: 0,
            lost_arrivals: 0,
            queue_order: Vec::new(),
        }
    }

    #[test]
    fn test_wait_stats() {
        let graveyard = vec![
            departed(1, Category::Standard, 3),
            departed(2, Category::Standard, 5),
            departed(3, Category::Electric, 10),
        ];
        let stats = WaitStats::from_vehicles(&graveyard);

        assert_eq!(stats.overall, Some(6.0));
        assert_eq!(stats.by_category.standard, Some(4.0));
        assert_eq!(stats.by_category.electric, Some(10.0));
        assert_eq!(stats.by_category.premium, None);
        assert_eq!(stats.max, Some(10));
    }

    #[test]
    fn test_empty_wait_stats() {
        let stats = WaitStats::from_vehicles(&[]);
        assert_eq!(stats, WaitStats::default());
    }

    #[test]
    fn test_summary_from_snapshots() {
        let snapshots = vec![snapshot(1, 0, 2, 4), snapshot(2, 1, 4, 3), snapshot(3, 2, 1, 2)];
        let graveyard = vec![departed(9, Category::Standard, 3)];
        let mut ledger = Ledger::new(CategoryCounts { standard: 5.0, electric: 8.0, premium: 12.0 });
        ledger.credit_departure(Category::Standard);
        let counters = RunCounters {
            total_arrivals: 7,
            lost_arrivals: 2,
            ..RunCounters::default()
        };

        let summary = RunSummary::from_run("Priority", &snapshots, &graveyard, &ledger, &counters);
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.parked_cars, 2);
        assert_eq!(summary.total_cars_parked, 3);
        assert_eq!(summary.max_waiting_cars, 4);
        assert_eq!(summary.average_available.standard, 3.0);
        assert_eq!(summary.average_available.electric, 1.0);
        assert_eq!(summary.total_earnings, 5.0);
        assert_eq!(summary.lost_arrivals, 2);
    }
}
