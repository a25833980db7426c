//! Revenue ledger, credited at departure

use serde::{Deserialize, Serialize};

use crate::types::{Category, CategoryCounts};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    fares: CategoryCounts<f64>,
    total: f64,
    by_category: CategoryCounts<f64>,
    departures: CategoryCounts<usize>,
}

impl Ledger {
    pub fn new(fares: CategoryCounts<f64>) -> Self {
        Ledger {
            fares,
            ..Ledger::default()
        }
    }

    /// Credit the flat fare for one departing vehicle; returns the amount
    pub fn credit_departure(&mut self, category: Category) -> f64 {
        let amount = self.fares.get(category);
        self.total += amount;
        *self.by_category.get_mut(category) += amount;
        *self.departures.get_mut(category) += 1;
        amount
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn by_category(&self) -> CategoryCounts<f64> {
        self.by_category
    }

    pub fn departures(&self) -> CategoryCounts<usize> {
        self.departures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credits_accumulate_per_category() {
        let mut ledger = Ledger::new(CategoryCounts { standard: 5.0, electric: 8.0, premium: 12.0 });

        assert_eq!(ledger.credit_departure(Category::Standard), 5.0);
        ledger.credit_departure(Category::Electric);
        ledger.credit_departure(Category::Standard);

        assert_eq!(ledger.total(), 18.0);
        assert_eq!(ledger.by_category().standard, 10.0);
        assert_eq!(ledger.by_category().electric, 8.0);
        assert_eq!(ledger.by_category().premium, 0.0);
        assert_eq!(ledger.departures().total(), 3);
    }
}
