//! Aggregation — resolves one instrument's signals into a single
//! ranked recommendation.
//!
//! Each signal's vote is weighted by its confidence; the action with the
//! highest weighted vote wins and `strength` is the winner's share of the
//! total weight. Ties are broken by a fixed analyst-priority order so the
//! result is deterministic under any permutation of the input.

use crate::domain::{AnalystId, Signal, SignalAction};
use serde::{Deserialize, Serialize};

/// Weighted-vote tolerance: two actions whose vote totals differ by less
/// than this are a tie.
const VOTE_EPS: f64 = 1e-9;

/// The resolved recommendation for one instrument in one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedRecommendation {
    pub symbol: String,
    pub net_action: SignalAction,
    /// Winning action's share of total confidence weight, in [0, 1].
    pub strength: f64,
    /// The signals that produced this recommendation, in tie-break
    /// priority order. Retained for the audit trail.
    pub contributing: Vec<Signal>,
}

impl AggregatedRecommendation {
    /// The neutral recommendation for an instrument with no usable signals.
    pub fn hold(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            net_action: SignalAction::Hold,
            strength: 0.0,
            contributing: Vec::new(),
        }
    }
}

/// Combine all signals for `symbol` into one recommendation.
///
/// Tolerates a partial signal set (analysts that timed out simply don't
/// vote); an empty set yields Hold with strength 0. Signals for a
/// different symbol are a programmer error: debug-asserted, filtered in
/// release.
pub fn aggregate(
    symbol: &str,
    signals: &[Signal],
    tie_break: &[AnalystId],
) -> AggregatedRecommendation {
    let mut contributing: Vec<Signal> = signals
        .iter()
        .inspect(|s| debug_assert_eq!(s.symbol, symbol, "signal for wrong symbol"))
        .filter(|s| s.symbol == symbol)
        .cloned()
        .collect();
    // Priority order first, unranked analysts after (by id) so the output
    // is independent of input permutation.
    contributing.sort_by_key(|s| rank_of(&s.analyst, tie_break));

    if contributing.is_empty() {
        return AggregatedRecommendation::hold(symbol);
    }

    let mut votes: [(SignalAction, f64); 3] = [
        (SignalAction::Buy, 0.0),
        (SignalAction::Sell, 0.0),
        (SignalAction::Hold, 0.0),
    ];
    for signal in &contributing {
        for (action, weight) in votes.iter_mut() {
            if *action == signal.action {
                *weight += signal.confidence;
            }
        }
    }
    let total: f64 = votes.iter().map(|(_, w)| w).sum();
    if total <= VOTE_EPS {
        // Only zero-confidence signals (all downgraded holds).
        let mut rec = AggregatedRecommendation::hold(symbol);
        rec.contributing = contributing;
        return rec;
    }

    let top_weight = votes.iter().map(|(_, w)| *w).fold(f64::MIN, f64::max);
    let tied: Vec<SignalAction> = votes
        .iter()
        .filter(|(_, w)| (top_weight - *w).abs() < VOTE_EPS)
        .map(|(a, _)| *a)
        .collect();

    let net_action = if tied.len() == 1 {
        tied[0]
    } else {
        break_tie(&tied, &contributing)
    };

    AggregatedRecommendation {
        symbol: symbol.to_string(),
        net_action,
        strength: top_weight / total,
        contributing,
    }
}

/// The earliest-ranked contributing analyst whose vote is among the tied
/// actions decides. `contributing` is already in priority order; if no
/// voter backs a tied action (cannot happen when every tied weight is
/// positive), Hold wins as the safe fallback.
fn break_tie(tied: &[SignalAction], contributing: &[Signal]) -> SignalAction {
    contributing
        .iter()
        .find(|s| tied.contains(&s.action))
        .map(|s| s.action)
        .unwrap_or(SignalAction::Hold)
}

fn rank_of(analyst: &AnalystId, tie_break: &[AnalystId]) -> (usize, AnalystId) {
    let rank = tie_break
        .iter()
        .position(|id| id == analyst)
        .unwrap_or(tie_break.len());
    (rank, analyst.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn sig(analyst: &str, action: SignalAction, confidence: f64) -> Signal {
        Signal::new(AnalystId::new(analyst), "SPY", action, confidence, "test", Utc::now())
    }

    fn roster() -> Vec<AnalystId> {
        ["risk-manager", "value-investor", "momentum-trader"]
            .into_iter()
            .map(AnalystId::new)
            .collect()
    }

    #[test]
    fn empty_signal_set_holds_with_zero_strength() {
        let rec = aggregate("SPY", &[], &roster());
        assert_eq!(rec.net_action, SignalAction::Hold);
        assert_eq!(rec.strength, 0.0);
    }

    #[test]
    fn unanimous_action_wins_with_full_strength() {
        let signals = vec![
            sig("value-investor", SignalAction::Buy, 0.6),
            sig("momentum-trader", SignalAction::Buy, 0.8),
        ];
        let rec = aggregate("SPY", &signals, &roster());
        assert_eq!(rec.net_action, SignalAction::Buy);
        assert!((rec.strength - 1.0).abs() < 1e-12);
    }

    #[test]
    fn higher_weight_beats_more_voters() {
        let signals = vec![
            sig("value-investor", SignalAction::Buy, 0.3),
            sig("momentum-trader", SignalAction::Buy, 0.3),
            sig("risk-manager", SignalAction::Sell, 0.9),
        ];
        let rec = aggregate("SPY", &signals, &roster());
        assert_eq!(rec.net_action, SignalAction::Sell);
        assert!((rec.strength - 0.6).abs() < 1e-12);
    }

    #[test]
    fn tie_broken_by_priority_order() {
        // Buy and Sell each carry 0.5; risk-manager ranks first and sold.
        let signals = vec![
            sig("momentum-trader", SignalAction::Buy, 0.5),
            sig("risk-manager", SignalAction::Sell, 0.5),
        ];
        let rec = aggregate("SPY", &signals, &roster());
        assert_eq!(rec.net_action, SignalAction::Sell);
    }

    #[test]
    fn deterministic_under_permutation() {
        let a = sig("momentum-trader", SignalAction::Buy, 0.5);
        let b = sig("risk-manager", SignalAction::Sell, 0.5);
        let c = sig("value-investor", SignalAction::Hold, 0.2);
        let fwd = aggregate("SPY", &[a.clone(), b.clone(), c.clone()], &roster());
        let rev = aggregate("SPY", &[c, b, a], &roster());
        assert_eq!(fwd.net_action, rev.net_action);
        assert_eq!(fwd.strength, rev.strength);
        let fwd_ids: Vec<_> = fwd.contributing.iter().map(|s| s.analyst.clone()).collect();
        let rev_ids: Vec<_> = rev.contributing.iter().map(|s| s.analyst.clone()).collect();
        assert_eq!(fwd_ids, rev_ids);
    }

    #[test]
    fn zero_confidence_set_is_neutral() {
        let signals = vec![
            sig("value-investor", SignalAction::Hold, 0.0),
            sig("momentum-trader", SignalAction::Hold, 0.0),
        ];
        let rec = aggregate("SPY", &signals, &roster());
        assert_eq!(rec.net_action, SignalAction::Hold);
        assert_eq!(rec.strength, 0.0);
        assert_eq!(rec.contributing.len(), 2);
    }

    proptest! {
        /// Identical-action signal sets always keep that action, and
        /// strength stays 1.0 regardless of total confidence.
        #[test]
        fn identical_actions_preserved(confs in proptest::collection::vec(0.01f64..=1.0, 1..8)) {
            let signals: Vec<Signal> = confs
                .iter()
                .enumerate()
                .map(|(i, c)| sig(&format!("analyst-{i}"), SignalAction::Buy, *c))
                .collect();
            let rec = aggregate("SPY", &signals, &roster());
            prop_assert_eq!(rec.net_action, SignalAction::Buy);
            prop_assert!((rec.strength - 1.0).abs() < 1e-9);
        }

        /// With a fixed opposing vote, the winning share is monotonic in
        /// the winner's total confidence.
        #[test]
        fn strength_monotonic_in_confidence(c1 in 0.5f64..=0.7, c2 in 0.71f64..=1.0) {
            let low = aggregate("SPY", &[
                sig("value-investor", SignalAction::Buy, c1),
                sig("risk-manager", SignalAction::Sell, 0.4),
            ], &roster());
            let high = aggregate("SPY", &[
                sig("value-investor", SignalAction::Buy, c2),
                sig("risk-manager", SignalAction::Sell, 0.4),
            ], &roster());
            prop_assert_eq!(high.net_action, SignalAction::Buy);
            prop_assert!(high.strength > low.strength);
        }
    }
}
