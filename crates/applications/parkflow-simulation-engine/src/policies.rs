//! Allocation policies for spot assignment
//!
//! Implements the four lot-management modes to compare:
//! - Priority: fixed Standard/Electric split
//! - OnDemand: Electric share follows observed Electric availability
//! - TimeBased: Electric share follows the time of day
//! - Membership: fixed split plus Premium spots with a fallback chain
//!
//! Every policy shares one matcher ([`match_queue_head`]): only the queue
//! head is considered, and only once it has waited more than
//! [`MIN_WAIT_TICKS`] ticks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{PolicyKind, SimulationConfig};
use crate::error::{Result, SimulationError};
use crate::pool::SpotPool;
use crate::queue::ArrivalQueue;
use crate::types::{Category, PeakWindow, SpotId, VehicleId};

/// The head must have waited strictly more than this before service
pub const MIN_WAIT_TICKS: u64 = 2;

/// Electric share of the Standard+Electric pool inside / outside the peak window
const TIME_BASED_PEAK_ELECTRIC_SHARE: f64 = 0.1;
const TIME_BASED_OFF_PEAK_ELECTRIC_SHARE: f64 = 0.2;

/// What a Premium vehicle may fall back to when no Premium spot is free
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PremiumFallback {
    /// Premium spots only
    Disabled,
    /// First free Standard spot, else first free Electric spot
    StandardThenElectric,
}

/// A successful queue-head match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub vehicle_id: VehicleId,
    pub spot_id: SpotId,
    pub vehicle_category: Category,
    pub spot_category: Category,
    /// Parked in a backup spot rather than an exact-category one
    pub via_backup: bool,
}

/// Allocation policy trait
pub trait AllocationPolicy {
    /// Adjust the pool's category split before matching.
    /// Returns the number of spots reclassified.
    fn reshape_capacity(&mut self, pool: &mut SpotPool, tick: u64) -> Result<usize>;

    /// Try to park the queue head
    fn match_head(
        &mut self,
        queue: &mut ArrivalQueue,
        pool: &mut SpotPool,
        tick: u64,
    ) -> Result<Option<Placement>> {
        match_queue_head(queue, pool, tick, PremiumFallback::Disabled)
    }

    /// Get policy name
    fn name(&self) -> &str;
}

/// Shared matcher.
///
/// Scans free spots once in pool scan order. An exact-category spot wins
/// immediately; otherwise the first Standard (and first Electric) spot seen
/// is remembered as a backup. Electric vehicles fall back to Standard;
/// Premium vehicles fall back per `premium_fallback`; Standard vehicles
/// never fall back.
pub fn match_queue_head(
    queue: &mut ArrivalQueue,
    pool: &mut SpotPool,
    tick: u64,
    premium_fallback: PremiumFallback,
) -> Result<Option<Placement>> {
    let Some(head) = queue.head() else {
        return Ok(None);
    };
    if head.waiting_ticks <= MIN_WAIT_TICKS {
        return Ok(None);
    }
    let wanted = head.category;

    let mut exact = None;
    let mut standard_backup = None;
    let mut electric_backup = None;

    for id in pool.scan_order() {
        let category = pool.spots()[id].category();
        if category == wanted {
            exact = Some(id);
            break;
        }
        match category {
            Category::Standard if standard_backup.is_none() => standard_backup = Some(id),
            Category::Electric if electric_backup.is_none() => electric_backup = Some(id),
            _ => {}
        }
    }

    let choice = match (exact, wanted) {
        (Some(id), _) => Some((id, false)),
        (None, Category::Standard) => None,
        (None, Category::Electric) => standard_backup.map(|id| (id, true)),
        (None, Category::Premium) => match premium_fallback {
            PremiumFallback::Disabled => None,
            PremiumFallback::StandardThenElectric => {
                standard_backup.or(electric_backup).map(|id| (id, true))
            }
        },
    };

    let Some((spot_id, via_backup)) = choice else {
        return Ok(None);
    };

    let mut vehicle = queue
        .pop_head()
        .ok_or_else(|| SimulationError::invariant("queue head vanished during matching"))?;
    vehicle.parked = true;
    vehicle.parked_tick = Some(tick);

    let placement = Placement {
        vehicle_id: vehicle.id,
        spot_id,
        vehicle_category: vehicle.category,
        spot_category: pool.spots()[spot_id].category(),
        via_backup,
    };
    pool.occupy(spot_id, vehicle)?;

    debug!(
        tick,
        vehicle = placement.vehicle_id,
        spot = spot_id,
        category = %placement.vehicle_category,
        via_backup,
        "parked queue head"
    );
    Ok(Some(placement))
}

/// Move the Standard/Electric split toward `electric_share`, converting at
/// most `max_step` free spots. Premium spots never take part.
pub fn retarget_electric_share(pool: &mut SpotPool, electric_share: f64, max_step: usize) -> Result<usize> {
    let totals = pool.total_by_category();
    let shared = totals.standard + totals.electric;
    let target = (electric_share.clamp(0.0, 1.0) * shared as f64).round() as usize;

    if totals.electric > target {
        let wanted = (totals.electric - target).min(max_step);
        pool.reclassify(Category::Electric, Category::Standard, wanted)
    } else if totals.electric < target {
        let wanted = (target - totals.electric).min(max_step);
        pool.reclassify(Category::Standard, Category::Electric, wanted)
    } else {
        Ok(0)
    }
}

/// Priority policy: the initial split holds for the whole run
pub struct PriorityPolicy;

impl PriorityPolicy {
    pub fn new() -> Self {
        PriorityPolicy
    }
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationPolicy for PriorityPolicy {
    fn reshape_capacity(&mut self, _pool: &mut SpotPool, _tick: u64) -> Result<usize> {
        Ok(0)
    }

    fn name(&self) -> &str {
        PolicyKind::Priority.name()
    }
}

/// OnDemand policy: Electric share tracks Electric availability
pub struct OnDemandPolicy {
    max_step: usize,
    last_demand: f64,
}

impl OnDemandPolicy {
    pub fn new(max_step: usize) -> Self {
        OnDemandPolicy {
            max_step,
            last_demand: 0.0,
        }
    }

    /// Free Electric spots over the Standard+Electric total
    pub fn electric_demand(pool: &SpotPool) -> f64 {
        let totals = pool.total_by_category();
        let shared = totals.standard + totals.electric;
        if shared == 0 {
            return 0.0;
        }
        pool.available_by_category().electric as f64 / shared as f64
    }

    /// Demand ratio observed at the most recent reshape
    pub fn last_demand(&self) -> f64 {
        self.last_demand
    }
}

impl AllocationPolicy for OnDemandPolicy {
    fn reshape_capacity(&mut self, pool: &mut SpotPool, tick: u64) -> Result<usize> {
        let demand = Self::electric_demand(pool);
        self.last_demand = demand;
        debug!(tick, demand, "electric demand observed");
        retarget_electric_share(pool, demand, self.max_step)
    }

    fn name(&self) -> &str {
        PolicyKind::OnDemand.name()
    }
}

/// TimeBased policy: smaller Electric share during the peak window
pub struct TimeBasedPolicy {
    peak: PeakWindow,
    max_step: usize,
}

impl TimeBasedPolicy {
    pub fn new(peak: PeakWindow, max_step: usize) -> Self {
        TimeBasedPolicy { peak, max_step }
    }

    pub fn electric_share(&self, tick: u64) -> f64 {
        if self.peak.contains(tick) {
            TIME_BASED_PEAK_ELECTRIC_SHARE
        } else {
            TIME_BASED_OFF_PEAK_ELECTRIC_SHARE
        }
    }
}

impl AllocationPolicy for TimeBasedPolicy {
    fn reshape_capacity(&mut self, pool: &mut SpotPool, tick: u64) -> Result<usize> {
        let share = self.electric_share(tick);
        retarget_electric_share(pool, share, self.max_step)
    }

    fn name(&self) -> &str {
        PolicyKind::TimeBased.name()
    }
}

/// Membership policy: fixed split, Premium vehicles may fall back
pub struct MembershipPolicy;

impl MembershipPolicy {
    pub fn new() -> Self {
        MembershipPolicy
    }
}

impl Default for MembershipPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationPolicy for MembershipPolicy {
    fn reshape_capacity(&mut self, _pool: &mut SpotPool, _tick: u64) -> Result<usize> {
        Ok(0)
    }

    fn match_head(
        &mut self,
        queue: &mut ArrivalQueue,
        pool: &mut SpotPool,
        tick: u64,
    ) -> Result<Option<Placement>> {
        match_queue_head(queue, pool, tick, PremiumFallback::StandardThenElectric)
    }

    fn name(&self) -> &str {
        PolicyKind::Membership.name()
    }
}

/// Build the policy a config asks for
pub fn build_policy(config: &SimulationConfig) -> Box<dyn AllocationPolicy> {
    match config.policy {
        PolicyKind::Priority => Box::new(PriorityPolicy::new()),
        PolicyKind::OnDemand => Box::new(OnDemandPolicy::new(config.max_reclassifications_per_tick)),
        PolicyKind::TimeBased => Box::new(TimeBasedPolicy::new(
            config.peak_window(),
            config.max_reclassifications_per_tick,
        )),
        PolicyKind::Membership => Box::new(MembershipPolicy::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryCounts, Vehicle};

    fn pool(standard: usize, electric: usize, premium: usize) -> SpotPool {
        SpotPool::new(CategoryCounts { standard, electric, premium }, None)
    }

    fn queue_with(categories: &[Category], waited: u64) -> ArrivalQueue {
        let mut queue = ArrivalQueue::new(10);
        for (i, &category) in categories.iter().enumerate() {
            let mut vehicle = Vehicle::new(i as u64 + 1, category, 0);
            vehicle.waiting_ticks = waited;
            queue.try_push(vehicle);
        }
        queue
    }

    fn fill(pool: &mut SpotPool, category: Category) {
        let ids: Vec<SpotId> = pool
            .available_spots()
            .filter(|s| s.category() == category)
            .map(|s| s.id)
            .collect();
        for (i, id) in ids.into_iter().enumerate() {
            pool.occupy(id, Vehicle::new(1000 + i as u64, category, 0)).unwrap();
        }
    }

    #[test]
    fn test_empty_queue_is_noop() {
        let mut pool = pool(2, 1, 0);
        let mut queue = ArrivalQueue::new(3);
        let placed = PriorityPolicy::new().match_head(&mut queue, &mut pool, 5).unwrap();
        assert!(placed.is_none());
        assert_eq!(pool.parked_count(), 0);
    }

    #[test]
    fn test_head_waits_more_than_two_ticks() {
        let mut pool = pool(2, 1, 0);
        let mut queue = queue_with(&[Category::Standard], 2);
        let mut policy = PriorityPolicy::new();

        assert!(policy.match_head(&mut queue, &mut pool, 2).unwrap().is_none());
        assert_eq!(queue.len(), 1);

        queue.tick_waiting();
        let placed = policy.match_head(&mut queue, &mut pool, 3).unwrap().unwrap();
        assert_eq!(placed.spot_id, 0);
        assert!(!placed.via_backup);
        assert!(queue.is_empty());

        let parked = pool.spot(0).unwrap().occupant().unwrap();
        assert_eq!(parked.parked_tick, Some(3));
        assert!(parked.parked);
        assert_eq!(parked.waiting_ticks, 3);
    }

    #[test]
    fn test_electric_falls_back_to_first_standard() {
        let mut pool = pool(3, 1, 0);
        fill(&mut pool, Category::Electric);
        let mut queue = queue_with(&[Category::Electric], 3);

        let placed = PriorityPolicy::new().match_head(&mut queue, &mut pool, 3).unwrap().unwrap();
        assert_eq!(placed.spot_id, 0);
        assert_eq!(placed.spot_category, Category::Standard);
        assert!(placed.via_backup);
    }

    #[test]
    fn test_backup_not_reserved_across_matches() {
        let mut lot = pool(1, 1, 0);
        fill(&mut lot, Category::Electric);
        let mut queue = queue_with(&[Category::Electric, Category::Electric], 3);
        let mut policy = PriorityPolicy::new();

        let placed = policy.match_head(&mut queue, &mut lot, 3).unwrap().unwrap();
        assert_eq!(placed.spot_id, 0);
        assert!(placed.via_backup);

        // The only backup is now taken; the next head waits without error
        assert!(policy.match_head(&mut queue, &mut lot, 3).unwrap().is_none());
        assert_eq!(queue.ids(), vec![2]);
        assert_eq!(lot.parked_count(), 2);
    }

    #[test]
    fn test_electric_prefers_electric_spot() {
        let mut pool = pool(3, 1, 0);
        let mut queue = queue_with(&[Category::Electric], 3);

        let placed = PriorityPolicy::new().match_head(&mut queue, &mut pool, 3).unwrap().unwrap();
        assert_eq!(placed.spot_id, 3);
        assert!(!placed.via_backup);
    }

    #[test]
    fn test_standard_never_takes_electric_and_blocks_queue() {
        let mut pool = pool(1, 2, 0);
        fill(&mut pool, Category::Standard);
        let mut queue = queue_with(&[Category::Standard, Category::Electric], 5);

        // No look-ahead: the Electric vehicle behind the head waits too
        let placed = PriorityPolicy::new().match_head(&mut queue, &mut pool, 3).unwrap();
        assert!(placed.is_none());
        assert_eq!(queue.ids(), vec![1, 2]);
        assert_eq!(pool.available_by_category().electric, 2);
    }

    #[test]
    fn test_premium_fallback_order() {
        let mut policy = MembershipPolicy::new();

        // Premium spot free: always used first
        let mut lot = pool(2, 2, 1);
        let mut queue = queue_with(&[Category::Premium], 3);
        let placed = policy.match_head(&mut queue, &mut lot, 3).unwrap().unwrap();
        assert_eq!(placed.spot_category, Category::Premium);
        assert!(!placed.via_backup);

        // No Premium: first Standard
        let mut lot = pool(2, 2, 1);
        fill(&mut lot, Category::Premium);
        let mut queue = queue_with(&[Category::Premium], 3);
        let placed = policy.match_head(&mut queue, &mut lot, 3).unwrap().unwrap();
        assert_eq!(placed.spot_category, Category::Standard);
        assert_eq!(placed.spot_id, 0);

        // No Premium, no Standard: first Electric
        let mut lot = pool(2, 2, 1);
        fill(&mut lot, Category::Premium);
        fill(&mut lot, Category::Standard);
        let mut queue = queue_with(&[Category::Premium], 3);
        let placed = policy.match_head(&mut queue, &mut lot, 3).unwrap().unwrap();
        assert_eq!(placed.spot_category, Category::Electric);
        assert_eq!(placed.spot_id, 2);
    }

    #[test]
    fn test_premium_without_membership_has_no_fallback() {
        let mut lot = pool(2, 2, 1);
        fill(&mut lot, Category::Premium);
        let mut queue = queue_with(&[Category::Premium], 3);

        let placed = PriorityPolicy::new().match_head(&mut queue, &mut lot, 3).unwrap();
        assert!(placed.is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_priority_and_membership_never_reshape() {
        let mut lot = pool(8, 2, 1);
        assert_eq!(PriorityPolicy::new().reshape_capacity(&mut lot, 600).unwrap(), 0);
        assert_eq!(MembershipPolicy::new().reshape_capacity(&mut lot, 600).unwrap(), 0);
        assert_eq!(lot.total_by_category(), CategoryCounts { standard: 8, electric: 2, premium: 1 });
    }

    #[test]
    fn test_on_demand_conserves_shared_pool() {
        let mut lot = pool(8, 2, 0);
        lot.occupy(8, Vehicle::new(1, Category::Electric, 0)).unwrap();
        let mut policy = OnDemandPolicy::new(5);

        // One free Electric spot out of ten shared -> target one Electric spot
        assert!((OnDemandPolicy::electric_demand(&lot) - 0.1).abs() < 1e-12);
        assert_eq!(policy.last_demand(), 0.0);
        let converted = policy.reshape_capacity(&mut lot, 1).unwrap();
        assert_eq!(converted, 1);
        assert!((policy.last_demand() - 0.1).abs() < 1e-12);

        let totals = lot.total_by_category();
        assert_eq!(totals.standard + totals.electric, 10);
        assert_eq!(totals.electric, 1);
        // The occupied Electric spot kept its label
        assert_eq!(lot.spot(8).unwrap().category(), Category::Electric);
    }

    #[test]
    fn test_time_based_targets_follow_clock() {
        let mut lot = pool(8, 2, 0);
        let mut policy = TimeBasedPolicy::new(PeakWindow::new(8, 18), 1);

        // Off-peak wants 20% of 10
        assert_eq!(policy.reshape_capacity(&mut lot, 60).unwrap(), 0);

        // Peak wants 10% of 10
        assert_eq!(policy.reshape_capacity(&mut lot, 9 * 60).unwrap(), 1);
        assert_eq!(lot.total_by_category().electric, 1);
        assert_eq!(policy.reshape_capacity(&mut lot, 9 * 60 + 1).unwrap(), 0);

        // Back off-peak, one step per tick
        assert_eq!(policy.reshape_capacity(&mut lot, 19 * 60).unwrap(), 1);
        assert_eq!(lot.total_by_category().electric, 2);
        assert_eq!(lot.total_by_category().total(), 10);
    }

    #[test]
    fn test_build_policy_names() {
        for kind in PolicyKind::ALL {
            let config = SimulationConfig::preset(kind);
            let policy = build_policy(&config);
            assert_eq!(policy.name(), kind.name());
            assert_eq!(policy.name().parse::<PolicyKind>().unwrap(), kind);
        }
    }
}
