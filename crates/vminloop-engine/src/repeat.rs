//! Repeat decision for the search loop.
//!
//! Rule groups encode statically-declared correlation between site
//! positions, such as shared redundancy domains. Once any position in a
//! correlated group is implicated, the whole group must be retried
//! together. The decision merges overlapping groups into the snapshot's
//! `rule_result_bits` in declaration order; a merge earlier in the pass can
//! make a later group overlap, so implication cascades transitively within
//! one call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::results::SearchResults;
use crate::rule_groups::{parse_rule_groups, RuleGroupError};

// ---------------------------------------------------------------------------
// RepeatVerdict
// ---------------------------------------------------------------------------

/// Machine-readable outcome of one repeat evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatVerdict {
    /// Rule evaluation is permanently failed; never retried here.
    RulesFailed,
    /// The retry budget is exhausted for every result group.
    BudgetExhausted,
    /// At least one rule group merged into the rule result bits.
    Merged,
    /// No group shared a set position with the rule result bits.
    NoOverlap,
}

impl RepeatVerdict {
    /// Whether this verdict asks the driver for another iteration.
    pub fn repeats(self) -> bool {
        matches!(self, Self::Merged)
    }

    /// Stable string name used in logs and serialization.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RulesFailed => "rules_failed",
            Self::BudgetExhausted => "budget_exhausted",
            Self::Merged => "merged",
            Self::NoOverlap => "no_overlap",
        }
    }
}

impl fmt::Display for RepeatVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Evaluate the repeat decision, returning the full verdict.
///
/// `rule_groups_csv` is a comma-separated list of bit literals, one per
/// rule group, each as wide as the snapshot's site array. `rule_result_bits`
/// is mutated in place only when a group merges; both early exits and a
/// no-overlap pass leave it untouched. A malformed group string is a
/// configuration fault and is reported before any mutation.
pub fn evaluate_repeat(
    results: &mut SearchResults,
    rule_groups_csv: &str,
) -> Result<RepeatVerdict, RuleGroupError> {
    if results.failed_rules {
        return Ok(RepeatVerdict::RulesFailed);
    }
    if results.min_repetition_count() >= results.max_repetition_count {
        return Ok(RepeatVerdict::BudgetExhausted);
    }

    let groups = parse_rule_groups(rule_groups_csv, results.width())?;

    let mut merged = false;
    for group in &groups {
        if group.bits().overlaps(&results.rule_result_bits) {
            results.rule_result_bits.or_assign(group.bits());
            merged = true;
        }
    }

    Ok(if merged {
        RepeatVerdict::Merged
    } else {
        RepeatVerdict::NoOverlap
    })
}

/// Decide whether the search loop must run another iteration.
///
/// Boolean form of [`evaluate_repeat`]: `true` exactly when a rule group
/// merged new positions into `rule_result_bits`.
pub fn has_to_repeat_search(
    results: &mut SearchResults,
    rule_groups_csv: &str,
) -> Result<bool, RuleGroupError> {
    evaluate_repeat(results, rule_groups_csv).map(RepeatVerdict::repeats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{
        SearchIdentifiers, SearchResultData, SearchStateValues,
    };
    use crate::rule_groups::RuleGroupError;
    use crate::site_vector::{SiteVector, SiteVectorError};

    fn bits(literal: &str) -> SiteVector {
        SiteVector::from_bit_string(literal).expect("valid literal")
    }

    fn result_entry(repetition_count: u32) -> SearchResultData {
        SearchResultData {
            state_values: SearchStateValues {
                voltages: vec![-9999.0, 0.5, 0.5, 0.5],
                start_voltages: Vec::new(),
                end_voltage_limits: Vec::new(),
                execution_count: 1,
                mask_bits: SiteVector::zeros(4),
                fail_reason: String::new(),
                per_point_data: Vec::new(),
                per_target_increments: Vec::new(),
            },
            is_pass: false,
            identifiers: SearchIdentifiers::new("", 1, repetition_count),
        }
    }

    fn snapshot(repetition_count: u32) -> SearchResults {
        SearchResults {
            failed_rules: false,
            failed_search: true,
            test_result_bits: vec![bits("1000")],
            rule_result_bits: bits("1000"),
            incoming_mask: SiteVector::zeros(4),
            max_repetition_count: 2,
            per_result_data: vec![result_entry(repetition_count)],
        }
    }

    // -- Cascading merge --

    #[test]
    fn overlapping_groups_merge_and_repeat() {
        let mut results = snapshot(1);
        let repeat = has_to_repeat_search(&mut results, "0000,1100,0011").expect("valid config");
        assert!(repeat);
        assert_eq!(results.rule_result_bits.to_bit_string(), "1100");
    }

    #[test]
    fn merge_cascades_through_later_groups() {
        let mut results = snapshot(1);
        results.rule_result_bits = bits("1000");
        // First group pulls in bit 1, which makes the second group overlap.
        let repeat = has_to_repeat_search(&mut results, "1100,0110").expect("valid config");
        assert!(repeat);
        assert_eq!(results.rule_result_bits.to_bit_string(), "1110");
    }

    #[test]
    fn group_order_decides_how_far_a_cascade_reaches() {
        let mut results = snapshot(1);
        results.rule_result_bits = bits("1000");
        // Declared the other way round, the middle group is tested before
        // anything overlaps with it.
        let repeat = has_to_repeat_search(&mut results, "0110,1100").expect("valid config");
        assert!(repeat);
        assert_eq!(results.rule_result_bits.to_bit_string(), "1100");
    }

    #[test]
    fn subset_group_counts_as_a_merge() {
        // Overlap decides, not whether new positions appear.
        let mut results = snapshot(1);
        results.rule_result_bits = bits("1100");
        let verdict = evaluate_repeat(&mut results, "1000").expect("valid config");
        assert_eq!(verdict, RepeatVerdict::Merged);
        assert_eq!(results.rule_result_bits.to_bit_string(), "1100");
    }

    #[test]
    fn verdict_for_merge_is_merged() {
        let mut results = snapshot(1);
        let verdict = evaluate_repeat(&mut results, "1100").expect("valid config");
        assert_eq!(verdict, RepeatVerdict::Merged);
        assert!(verdict.repeats());
    }

    // -- No-overlap pass --

    #[test]
    fn no_overlap_leaves_bits_unchanged() {
        let mut results = snapshot(1);
        let repeat = has_to_repeat_search(&mut results, "0000").expect("valid config");
        assert!(!repeat);
        assert_eq!(results.rule_result_bits.to_bit_string(), "1000");
    }

    #[test]
    fn disjoint_groups_never_merge() {
        let mut results = snapshot(1);
        let verdict = evaluate_repeat(&mut results, "0100,0010,0001").expect("valid config");
        assert_eq!(verdict, RepeatVerdict::NoOverlap);
        assert_eq!(results.rule_result_bits.to_bit_string(), "1000");
    }

    #[test]
    fn all_zero_rule_bits_never_merge() {
        let mut results = snapshot(1);
        results.rule_result_bits = SiteVector::zeros(4);
        let verdict = evaluate_repeat(&mut results, "1111").expect("valid config");
        assert_eq!(verdict, RepeatVerdict::NoOverlap);
        assert_eq!(results.rule_result_bits.to_bit_string(), "0000");
    }

    // -- Early exits --

    #[test]
    fn permanent_rule_failure_never_repeats() {
        let mut results = snapshot(1);
        results.failed_rules = true;
        let verdict = evaluate_repeat(&mut results, "1100").expect("valid config");
        assert_eq!(verdict, RepeatVerdict::RulesFailed);
        assert_eq!(results.rule_result_bits.to_bit_string(), "1000");
    }

    #[test]
    fn exhausted_budget_never_repeats() {
        let mut results = snapshot(2);
        let verdict = evaluate_repeat(&mut results, "1100").expect("valid config");
        assert_eq!(verdict, RepeatVerdict::BudgetExhausted);
        assert_eq!(results.rule_result_bits.to_bit_string(), "1000");
    }

    #[test]
    fn budget_gates_on_the_smallest_repetition_count() {
        let mut results = snapshot(2);
        results.per_result_data.push(result_entry(1));
        let verdict = evaluate_repeat(&mut results, "1100").expect("valid config");
        assert_eq!(verdict, RepeatVerdict::Merged);
    }

    #[test]
    fn empty_result_groups_leave_the_budget_open() {
        let mut results = snapshot(1);
        results.per_result_data.clear();
        let verdict = evaluate_repeat(&mut results, "1100").expect("valid config");
        assert_eq!(verdict, RepeatVerdict::Merged);
    }

    #[test]
    fn early_exits_skip_parsing_entirely() {
        let mut results = snapshot(1);
        results.failed_rules = true;
        let verdict = evaluate_repeat(&mut results, "not-a-bit-string").expect("early exit");
        assert_eq!(verdict, RepeatVerdict::RulesFailed);

        let mut exhausted = snapshot(2);
        let verdict = evaluate_repeat(&mut exhausted, "not-a-bit-string").expect("early exit");
        assert_eq!(verdict, RepeatVerdict::BudgetExhausted);
    }

    // -- Configuration errors --

    #[test]
    fn malformed_group_is_a_configuration_fault() {
        let mut results = snapshot(1);
        let err = has_to_repeat_search(&mut results, "1100,banana").expect_err("malformed");
        assert_eq!(
            err,
            RuleGroupError::MalformedToken {
                index: 1,
                source: SiteVectorError::InvalidCharacter {
                    position: 0,
                    character: 'b'
                }
            }
        );
        assert_eq!(results.rule_result_bits.to_bit_string(), "1000");
    }

    #[test]
    fn width_mismatched_group_is_a_configuration_fault() {
        let mut results = snapshot(1);
        let err = has_to_repeat_search(&mut results, "11000").expect_err("wrong width");
        assert_eq!(
            err,
            RuleGroupError::MalformedToken {
                index: 0,
                source: SiteVectorError::WidthMismatch {
                    expected: 4,
                    found: 5
                }
            }
        );
    }

    #[test]
    fn configuration_fault_reports_before_any_mutation() {
        let mut results = snapshot(1);
        // The first token would merge, but the second token is malformed.
        let err = has_to_repeat_search(&mut results, "1100,xxxx");
        assert!(err.is_err());
        assert_eq!(results.rule_result_bits.to_bit_string(), "1000");
    }

    // -- Verdict surface --

    #[test]
    fn verdict_as_str_names_are_stable() {
        assert_eq!(RepeatVerdict::RulesFailed.as_str(), "rules_failed");
        assert_eq!(RepeatVerdict::BudgetExhausted.as_str(), "budget_exhausted");
        assert_eq!(RepeatVerdict::Merged.as_str(), "merged");
        assert_eq!(RepeatVerdict::NoOverlap.as_str(), "no_overlap");
    }

    #[test]
    fn only_merged_repeats() {
        assert!(RepeatVerdict::Merged.repeats());
        assert!(!RepeatVerdict::RulesFailed.repeats());
        assert!(!RepeatVerdict::BudgetExhausted.repeats());
        assert!(!RepeatVerdict::NoOverlap.repeats());
    }

    #[test]
    fn verdict_display_matches_as_str() {
        assert_eq!(RepeatVerdict::BudgetExhausted.to_string(), "budget_exhausted");
    }

    #[test]
    fn verdict_serde_round_trip_all_variants() {
        for verdict in [
            RepeatVerdict::RulesFailed,
            RepeatVerdict::BudgetExhausted,
            RepeatVerdict::Merged,
            RepeatVerdict::NoOverlap,
        ] {
            let json = serde_json::to_string(&verdict).expect("serialize");
            let restored: RepeatVerdict = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(verdict, restored);
        }
    }
}
