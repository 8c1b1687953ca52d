// src/mc/payoffs.rs
//! Terminal payoff evaluation for rainbow options.
//!
//! The payoff keys off a single selected underlying: the maximum terminal
//! price for Best-Of, the minimum for Worst-Of. Kind and rule are tagged
//! variants dispatched by value; evaluation is pure.

/// Call or Put intrinsic against the selected underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// `max(selected - strike, 0)` for a Call, `max(strike - selected, 0)`
    /// for a Put. Never negative.
    pub fn payoff(self, selected: f64, strike: f64) -> f64 {
        match self {
            OptionKind::Call => (selected - strike).max(0.0),
            OptionKind::Put => (strike - selected).max(0.0),
        }
    }
}

/// Which underlying the payoff keys off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    BestOf,
    WorstOf,
}

impl SelectionRule {
    /// Index and terminal price of the selected underlying.
    ///
    /// Strict comparisons keep the first-encountered entry on ties, so a
    /// fixed asset ordering gives deterministic selection.
    pub fn select(self, finals: &[f64]) -> Option<(usize, f64)> {
        let mut it = finals.iter().copied().enumerate();
        let (mut idx, mut chosen) = it.next()?;
        for (i, price) in it {
            let better = match self {
                SelectionRule::BestOf => price > chosen,
                SelectionRule::WorstOf => price < chosen,
            };
            if better {
                idx = i;
                chosen = price;
            }
        }
        Some((idx, chosen))
    }
}

/// Payoff of one simulated outcome. `finals` is ordered like the option's
/// underlyings; an empty slice pays nothing.
pub fn rainbow_payoff(
    finals: &[f64],
    strike: f64,
    kind: OptionKind,
    rule: SelectionRule,
) -> f64 {
    match rule.select(finals) {
        Some((_, selected)) => kind.payoff(selected, strike),
        None => 0.0,
    }
}
