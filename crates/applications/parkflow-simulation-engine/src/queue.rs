//! Bounded FIFO of vehicles waiting for a spot

use std::collections::VecDeque;

use crate::types::{Vehicle, VehicleId};

/// Arrival queue. The head is the oldest admitted, still-unmatched vehicle.
///
/// Admission against a full queue is refused; the caller drops the arrival.
#[derive(Debug, Clone)]
pub struct ArrivalQueue {
    vehicles: VecDeque<Vehicle>,
    capacity: usize,
}

impl ArrivalQueue {
    pub fn new(capacity: usize) -> Self {
        ArrivalQueue {
            vehicles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.vehicles.len() >= self.capacity
    }

    pub fn spare_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.vehicles.len())
    }

    /// Append to the tail. Returns false (and drops the vehicle) when full.
    pub fn try_push(&mut self, vehicle: Vehicle) -> bool {
        if self.is_full() {
            return false;
        }
        self.vehicles.push_back(vehicle);
        true
    }

    pub fn head(&self) -> Option<&Vehicle> {
        self.vehicles.front()
    }

    pub fn pop_head(&mut self) -> Option<Vehicle> {
        self.vehicles.pop_front()
    }

    /// Count one more tick of waiting for every queued vehicle
    pub fn tick_waiting(&mut self) {
        for vehicle in self.vehicles.iter_mut() {
            vehicle.waiting_ticks += 1;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }

    /// Vehicle ids head-first (display projection)
    pub fn ids(&self) -> Vec<VehicleId> {
        self.vehicles.iter().map(|v| v.id).collect()
    }
}
