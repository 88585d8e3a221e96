use rust_decimal::Decimal;

use crate::domain::task::{BudgetTier, Complexity};
use crate::pricing::rules::MarginRules;

/// Computes the target margin for a task.
///
/// The adjustments are summed first and the result is clamped to the
/// configured band afterwards, so a negative budget adjustment can pull the
/// margin down only as far as the floor. Never fails.
pub struct MarginEngine<'a> {
    rules: &'a MarginRules,
}

impl<'a> MarginEngine<'a> {
    pub fn new(rules: &'a MarginRules) -> Self {
        Self { rules }
    }

    pub fn margin(&self, complexity: Complexity, budget_tier: BudgetTier) -> Decimal {
        let raw = self.rules.base
            + self.rules.complexity_adjustment(complexity)
            + self.rules.budget_adjustment(budget_tier);
        // An inverted band resolves to the ceiling.
        raw.max(self.rules.floor).min(self.rules.ceiling)
    }
}
