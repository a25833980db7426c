//! Grid projection of the lot for display consumers
//!
//! Positions are labels assigned row-major in spot creation order. The
//! [`GridView`] is rebuilt from the pool and queue whenever it is asked for
//! and never feeds back into the simulation.

use serde::{Deserialize, Serialize};

use crate::config::GridDimensions;
use crate::pool::SpotPool;
use crate::queue::ArrivalQueue;
use crate::types::{Category, Position, SpotId, VehicleId};

/// Smallest near-square grid holding `total` cells.
///
/// Starts both sides at `ceil(sqrt(total)) - 1` and grows the shorter
/// side (width on ties) until the area fits.
pub fn calculate_dimensions(total: usize) -> GridDimensions {
    let side = (total as f64).sqrt().ceil() as usize;
    let mut width = side.saturating_sub(1);
    let mut height = side.saturating_sub(1);

    while width * height < total {
        if height < width {
            height += 1;
        } else {
            width += 1;
        }
    }

    GridDimensions { width, height }
}

/// Row-major position of the `index`-th spot
pub fn position_for(index: usize, grid: GridDimensions) -> Position {
    Position {
        row: index / grid.width.max(1),
        col: index % grid.width.max(1),
    }
}

/// One occupied grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub spot_id: SpotId,
    pub position: Position,
    pub category: Category,
    pub occupant: Option<VehicleId>,
}

/// Display snapshot: lot cells plus the waiting lane in queue order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridView {
    pub dimensions: GridDimensions,
    pub cells: Vec<GridCell>,
    pub queue_lane: Vec<VehicleId>,
}

impl GridView {
    pub fn project(pool: &SpotPool, queue: &ArrivalQueue) -> Self {
        let mut cells: Vec<GridCell> = pool
            .spots()
            .iter()
            .map(|spot| GridCell {
                spot_id: spot.id,
                position: spot.position,
                category: spot.category(),
                occupant: spot.occupant().map(|v| v.id),
            })
            .collect();
        cells.sort_by_key(|cell| cell.position);

        GridView {
            dimensions: pool.dimensions(),
            cells,
            queue_lane: queue.ids(),
        }
    }

    pub fn cell_at(&self, position: Position) -> Option<&GridCell> {
        self.cells.iter().find(|cell| cell.position == position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryCounts, Vehicle};

    #[test]
    fn test_calculate_dimensions() {
        assert_eq!(calculate_dimensions(60), GridDimensions { width: 8, height: 8 });
        assert_eq!(calculate_dimensions(10), GridDimensions { width: 4, height: 3 });
        assert_eq!(calculate_dimensions(9), GridDimensions { width: 3, height: 3 });
        assert_eq!(calculate_dimensions(1), GridDimensions { width: 1, height: 1 });

        for total in 1..200 {
            let grid = calculate_dimensions(total);
            assert!(grid.capacity() >= total);
        }
    }

    #[test]
    fn test_positions_are_row_major() {
        let grid = GridDimensions { width: 4, height: 3 };
        assert_eq!(position_for(0, grid), Position { row: 0, col: 0 });
        assert_eq!(position_for(3, grid), Position { row: 0, col: 3 });
        assert_eq!(position_for(5, grid), Position { row: 1, col: 1 });
    }

    #[test]
    fn test_projection_mirrors_pool_and_queue() {
        let counts = CategoryCounts { standard: 2, electric: 1, premium: 0 };
        let mut pool = SpotPool::new(counts, None);
        let mut queue = ArrivalQueue::new(4);

        pool.occupy(1, Vehicle::new(7, Category::Standard, 0)).unwrap();
        assert!(queue.try_push(Vehicle::new(8, Category::Electric, 1)));

        let view = GridView::project(&pool, &queue);
        assert_eq!(view.cells.len(), 3);
        assert_eq!(view.queue_lane, vec![8]);

        let cell = view.cell_at(pool.spot(1).unwrap().position).unwrap();
        assert_eq!(cell.occupant, Some(7));
        assert_eq!(view.cells[2].category, Category::Electric);
    }
}
