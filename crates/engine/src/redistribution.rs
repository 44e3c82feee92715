//! Policies for taking allocation away from unlocked symbols when a new
//! symbol does not fit in the free capacity.

use configuration::RedistributionKind;
use core_types::IndexedSymbol;
use core_types::math::round_percentage;
use rust_decimal::Decimal;

/// Splits `requested` percentage points across `unlocked` symbols.
///
/// Implementations return one reduction per input symbol, in input order, and
/// the reductions sum exactly to `requested`. They do not check whether a
/// symbol can absorb its reduction; the caller rejects any result that would
/// leave a symbol below zero.
pub trait RedistributionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn reductions(&self, unlocked: &[IndexedSymbol], requested: Decimal) -> Vec<Decimal>;
}

/// Every unlocked symbol gives up the same share.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualSplit;

/// Each unlocked symbol gives up in proportion to its own desired percentage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProRata;

impl RedistributionStrategy for EqualSplit {
    fn name(&self) -> &'static str {
        "equal_split"
    }

    fn reductions(&self, unlocked: &[IndexedSymbol], requested: Decimal) -> Vec<Decimal> {
        if unlocked.is_empty() {
            return Vec::new();
        }
        let share = round_percentage(requested / Decimal::from(unlocked.len()));
        let mut reductions = vec![share; unlocked.len()];
        absorb_remainder(unlocked, &mut reductions, requested);
        reductions
    }
}

impl RedistributionStrategy for ProRata {
    fn name(&self) -> &'static str {
        "pro_rata"
    }

    fn reductions(&self, unlocked: &[IndexedSymbol], requested: Decimal) -> Vec<Decimal> {
        let total: Decimal = unlocked.iter().map(|s| s.desired_percentage).sum();
        if total.is_zero() {
            return EqualSplit.reductions(unlocked, requested);
        }
        let mut reductions: Vec<Decimal> = unlocked
            .iter()
            .map(|s| round_percentage(requested * s.desired_percentage / total))
            .collect();
        absorb_remainder(unlocked, &mut reductions, requested);
        reductions
    }
}

/// Puts the rounding remainder on the largest holder (first one on ties).
fn absorb_remainder(unlocked: &[IndexedSymbol], reductions: &mut [Decimal], requested: Decimal) {
    let remainder = requested - reductions.iter().copied().sum::<Decimal>();
    if remainder.is_zero() {
        return;
    }
    let largest = unlocked
        .iter()
        .enumerate()
        .fold(None::<(usize, Decimal)>, |best, (i, s)| match best {
            Some((_, d)) if d >= s.desired_percentage => best,
            _ => Some((i, s.desired_percentage)),
        });
    if let Some((i, _)) = largest {
        reductions[i] += remainder;
    }
}

pub fn strategy_for(kind: RedistributionKind) -> Box<dyn RedistributionStrategy> {
    match kind {
        RedistributionKind::EqualSplit => Box::new(EqualSplit),
        RedistributionKind::ProRata => Box::new(ProRata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::symbol;
    use rust_decimal_macros::dec;

    #[test]
    fn equal_split_divides_evenly() {
        let unlocked = vec![symbol("A", dec!(40), false), symbol("B", dec!(60), false)];
        assert_eq!(EqualSplit.reductions(&unlocked, dec!(30)), vec![dec!(15), dec!(15)]);
    }

    #[test]
    fn equal_split_remainder_goes_to_the_largest_holder() {
        let unlocked = vec![
            symbol("A", dec!(20), false),
            symbol("B", dec!(50), false),
            symbol("C", dec!(30), false),
        ];
        let reductions = EqualSplit.reductions(&unlocked, dec!(10));
        assert_eq!(reductions, vec![dec!(3.33), dec!(3.34), dec!(3.33)]);
        assert_eq!(reductions.iter().copied().sum::<Decimal>(), dec!(10));
    }

    #[test]
    fn pro_rata_weights_by_existing_share() {
        let unlocked = vec![symbol("A", dec!(20), false), symbol("B", dec!(60), false)];
        assert_eq!(ProRata.reductions(&unlocked, dec!(40)), vec![dec!(10), dec!(30)]);
    }

    #[test]
    fn pro_rata_is_zero_sum_after_rounding() {
        let unlocked = vec![
            symbol("A", dec!(33.33), false),
            symbol("B", dec!(33.33), false),
            symbol("C", dec!(33.34), false),
        ];
        let reductions = ProRata.reductions(&unlocked, dec!(12.5));
        assert_eq!(reductions.iter().copied().sum::<Decimal>(), dec!(12.5));
    }

    #[test]
    fn strategies_are_selected_from_configuration() {
        assert_eq!(strategy_for(RedistributionKind::EqualSplit).name(), "equal_split");
        assert_eq!(strategy_for(RedistributionKind::ProRata).name(), "pro_rata");
    }
}
