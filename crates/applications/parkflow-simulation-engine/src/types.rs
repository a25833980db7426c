//! Core types for the parking simulation engine

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SimulationError};

/// Minutes in one simulated day
pub const MINUTES_PER_DAY: u64 = 1440;

pub type VehicleId = u64;
pub type SpotId = usize;

/// Vehicle / spot category.
///
/// Declaration order is the scan order used by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Standard,
    Electric,
    Premium,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Standard, Category::Electric, Category::Premium];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Standard => "Standard",
            Category::Electric => "Electric",
            Category::Premium => "Premium",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A per-category tally (spot counts, earnings, averages)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryCounts<T> {
    pub standard: T,
    pub electric: T,
    pub premium: T,
}

impl<T: Copy> CategoryCounts<T> {
    pub fn get(&self, category: Category) -> T {
        match category {
            Category::Standard => self.standard,
            Category::Electric => self.electric,
            Category::Premium => self.premium,
        }
    }
}

impl<T> CategoryCounts<T> {
    pub fn get_mut(&mut self, category: Category) -> &mut T {
        match category {
            Category::Standard => &mut self.standard,
            Category::Electric => &mut self.electric,
            Category::Premium => &mut self.premium,
        }
    }
}

impl CategoryCounts<usize> {
    pub fn total(&self) -> usize {
        self.standard + self.electric + self.premium
    }
}

/// Display-only grid label of a spot. Not a reachability constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

/// A vehicle moving through queue -> spot -> graveyard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub category: Category,
    pub created_tick: u64,
    pub parked_tick: Option<u64>,
    pub departed_tick: Option<u64>,
    /// Ticks spent in the queue; frozen once parked
    pub waiting_ticks: u64,
    pub parked: bool,
}

impl Vehicle {
    pub fn new(id: VehicleId, category: Category, created_tick: u64) -> Self {
        Vehicle {
            id,
            category,
            created_tick,
            parked_tick: None,
            departed_tick: None,
            waiting_ticks: 0,
            parked: false,
        }
    }

    /// Ticks spent parked as of `tick` (0 if not parked)
    pub fn elapsed_parked(&self, tick: u64) -> u64 {
        self.parked_tick.map_or(0, |parked| tick.saturating_sub(parked))
    }
}

/// A single parking spot.
///
/// Availability is derived from the occupant, so `available() == occupant.is_none()`
/// holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spot {
    pub id: SpotId,
    pub position: Position,
    category: Category,
    occupant: Option<Vehicle>,
}

impl Spot {
    pub fn new(id: SpotId, category: Category, position: Position) -> Self {
        Spot {
            id,
            position,
            category,
            occupant: None,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn available(&self) -> bool {
        self.occupant.is_none()
    }

    pub fn occupant(&self) -> Option<&Vehicle> {
        self.occupant.as_ref()
    }

    /// Change the category label. Only legal on an empty spot.
    pub(crate) fn reclassify(&mut self, category: Category) -> Result<()> {
        if let Some(vehicle) = &self.occupant {
            return Err(SimulationError::invariant(format!(
                "attempted to reclassify spot {} while vehicle {} is parked",
                self.id, vehicle.id
            )));
        }
        self.category = category;
        Ok(())
    }

    pub(crate) fn park(&mut self, vehicle: Vehicle) -> Result<()> {
        if let Some(current) = &self.occupant {
            return Err(SimulationError::invariant(format!(
                "vehicle {} assigned to spot {} already holding vehicle {}",
                vehicle.id, self.id, current.id
            )));
        }
        self.occupant = Some(vehicle);
        Ok(())
    }

    pub(crate) fn vacate(&mut self) -> Result<Vehicle> {
        self.occupant.take().ok_or_else(|| {
            SimulationError::invariant(format!("released spot {} which holds no vehicle", self.id))
        })
    }

    pub(crate) fn occupant_mut(&mut self) -> Option<&mut Vehicle> {
        self.occupant.as_mut()
    }
}

/// Peak-hour window `[start_hour, end_hour)` on the 24h clock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl PeakWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        PeakWindow { start_hour, end_hour }
    }

    fn bounds(&self) -> (u64, u64) {
        (self.start_hour as u64 * 60, self.end_hour as u64 * 60)
    }

    pub fn contains(&self, tick: u64) -> bool {
        let minute = minute_of_day(tick);
        let (start, end) = self.bounds();
        minute >= start && minute < end
    }

    /// Arrival multiplier: 1.0 outside the window, a symmetric triangle
    /// peaking at 1.5 at the window midpoint.
    pub fn multiplier(&self, tick: u64) -> f64 {
        if !self.contains(tick) {
            return 1.0;
        }
        let (start, end) = self.bounds();
        let half = (end - start) as f64 / 2.0;
        let midpoint = start as f64 + half;
        let distance = (minute_of_day(tick) as f64 - midpoint).abs();
        1.0 + 0.5 * (1.0 - distance / half).max(0.0)
    }
}

impl Default for PeakWindow {
    fn default() -> Self {
        PeakWindow::new(8, 18)
    }
}

pub fn minute_of_day(tick: u64) -> u64 {
    tick % MINUTES_PER_DAY
}

pub fn hour_of_day(tick: u64) -> u32 {
    ((tick / 60) % 24) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_of_day_wraps() {
        assert_eq!(hour_of_day(0), 0);
        assert_eq!(hour_of_day(59), 0);
        assert_eq!(hour_of_day(60), 1);
        assert_eq!(hour_of_day(1439), 23);
        assert_eq!(hour_of_day(1440), 0);
    }

    #[test]
    fn test_peak_multiplier_profile() {
        let peak = PeakWindow::new(8, 18);

        assert_eq!(peak.multiplier(7 * 60 + 59), 1.0);
        assert_eq!(peak.multiplier(8 * 60), 1.0);
        assert_eq!(peak.multiplier(13 * 60), 1.5);
        assert!((peak.multiplier(10 * 60 + 30) - 1.25).abs() < 1e-9);
        assert!((peak.multiplier(15 * 60 + 30) - 1.25).abs() < 1e-9);
        assert_eq!(peak.multiplier(18 * 60), 1.0);
    }

    #[test]
    fn test_spot_availability_tracks_occupant() {
        let mut spot = Spot::new(0, Category::Standard, Position { row: 0, col: 0 });
        assert!(spot.available());

        spot.park(Vehicle::new(1, Category::Standard, 0)).unwrap();
        assert!(!spot.available());
        assert!(spot.reclassify(Category::Electric).is_err());
        assert!(spot.park(Vehicle::new(2, Category::Standard, 0)).is_err());

        let vehicle = spot.vacate().unwrap();
        assert_eq!(vehicle.id, 1);
        assert!(spot.available());
        assert!(spot.vacate().is_err());
        assert!(spot.reclassify(Category::Electric).is_ok());
        assert_eq!(spot.category(), Category::Electric);
    }
}
