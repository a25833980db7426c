//! Spot pool
//!
//! Owns every spot in the lot. The total spot count is fixed at creation;
//! only the per-category split moves, and only through [`SpotPool::reclassify`],
//! which never touches an occupied spot.

use tracing::debug;

use crate::config::GridDimensions;
use crate::error::{Result, SimulationError};
use crate::layout::{calculate_dimensions, position_for};
use crate::types::{Category, CategoryCounts, Spot, SpotId, Vehicle};

#[derive(Debug, Clone)]
pub struct SpotPool {
    spots: Vec<Spot>,
    dimensions: GridDimensions,
}

impl SpotPool {
    /// Create spots category by category (Standard, Electric, Premium),
    /// labelling them row-major on the grid.
    pub fn new(counts: CategoryCounts<usize>, grid: Option<GridDimensions>) -> Self {
        let total = counts.total();
        let dimensions = grid.unwrap_or_else(|| calculate_dimensions(total));

        let spots = Category::ALL
            .iter()
            .flat_map(|&category| std::iter::repeat_n(category, counts.get(category)))
            .enumerate()
            .map(|(id, category)| Spot::new(id, category, position_for(id, dimensions)))
            .collect();

        SpotPool { spots, dimensions }
    }

    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }

    pub fn spot(&self, id: SpotId) -> Option<&Spot> {
        self.spots.get(id)
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    /// Available spots, any category, in id order
    pub fn available_spots(&self) -> impl Iterator<Item = &Spot> {
        self.spots.iter().filter(|spot| spot.available())
    }

    /// Available spot ids in matcher scan order: category, then position
    pub fn scan_order(&self) -> Vec<SpotId> {
        let mut ids: Vec<SpotId> = self.available_spots().map(|spot| spot.id).collect();
        ids.sort_by_key(|&id| (self.spots[id].category(), self.spots[id].position));
        ids
    }

    pub fn available_by_category(&self) -> CategoryCounts<usize> {
        let mut counts = CategoryCounts::default();
        for spot in self.available_spots() {
            *counts.get_mut(spot.category()) += 1;
        }
        counts
    }

    pub fn total_by_category(&self) -> CategoryCounts<usize> {
        let mut counts = CategoryCounts::default();
        for spot in &self.spots {
            *counts.get_mut(spot.category()) += 1;
        }
        counts
    }

    pub fn parked_count(&self) -> usize {
        self.spots.iter().filter(|spot| !spot.available()).count()
    }

    /// Convert up to `count` available `from` spots to `to`, in place.
    ///
    /// Returns how many were converted; fewer than requested is a normal
    /// outcome when the source category runs short of free spots.
    pub fn reclassify(&mut self, from: Category, to: Category, count: usize) -> Result<usize> {
        if from == to || count == 0 {
            return Ok(0);
        }

        let candidates: Vec<SpotId> = self
            .scan_order()
            .into_iter()
            .filter(|&id| self.spots[id].category() == from)
            .take(count)
            .collect();

        for &id in &candidates {
            self.spots[id].reclassify(to)?;
        }

        if !candidates.is_empty() {
            debug!(from = %from, to = %to, converted = candidates.len(), requested = count, "reclassified spots");
        }
        Ok(candidates.len())
    }

    /// Park `vehicle` in spot `id`
    pub fn occupy(&mut self, id: SpotId, vehicle: Vehicle) -> Result<()> {
        self.spot_mut(id)?.park(vehicle)
    }

    /// Empty spot `id`, returning the vehicle it held
    pub fn release(&mut self, id: SpotId) -> Result<Vehicle> {
        self.spot_mut(id)?.vacate()
    }

    pub(crate) fn spot_mut(&mut self, id: SpotId) -> Result<&mut Spot> {
        self.spots
            .get_mut(id)
            .ok_or_else(|| SimulationError::invariant(format!("spot {id} does not exist")))
    }

    /// Occupied spot ids in id order
    pub fn occupied_ids(&self) -> Vec<SpotId> {
        self.spots
            .iter()
            .filter(|spot| !spot.available())
            .map(|spot| spot.id)
            .collect()
    }
}
