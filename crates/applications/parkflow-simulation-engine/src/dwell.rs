//! Dwell model: how likely a parked vehicle is to leave on a given tick

use rand::Rng;

use crate::config::DwellThresholds;

/// Piecewise-linear departure probability over time parked.
///
/// ```text
/// p
/// 1.0 |                 ______
/// 0.5 |          /
/// 0.0 |_____/
///          min  med  max      elapsed
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellModel {
    thresholds: DwellThresholds,
}

impl DwellModel {
    pub fn new(thresholds: DwellThresholds) -> Self {
        DwellModel { thresholds }
    }

    pub fn thresholds(&self) -> DwellThresholds {
        self.thresholds
    }

    /// Departure probability after `elapsed` ticks parked
    pub fn leave_probability(&self, elapsed: u64) -> f64 {
        let DwellThresholds { min, med, max } = self.thresholds;

        if elapsed < min {
            0.0
        } else if elapsed < med {
            0.5 * (elapsed - min) as f64 / (med - min) as f64
        } else if elapsed < max {
            0.5 + 0.5 * (elapsed - med) as f64 / (max - med) as f64
        } else {
            1.0
        }
    }

    /// Draw one departure decision
    pub fn should_leave<R: Rng + ?Sized>(&self, elapsed: u64, rng: &mut R) -> bool {
        rng.gen_bool(self.leave_probability(elapsed))
    }
}

impl Default for DwellModel {
    fn default() -> Self {
        DwellModel::new(DwellThresholds::default())
    }
}
