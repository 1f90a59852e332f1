//! Exit-port classification for a finished search.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::results::SearchResults;

// ---------------------------------------------------------------------------
// ExitPort
// ---------------------------------------------------------------------------

/// Categorical output bin for a finished search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPort {
    /// Both measurement and rule evaluation failed.
    Fail,
    /// Full pass.
    Pass,
    /// Rule evaluation failed but measurement passed.
    FailRules,
    /// Measurement failed but rule evaluation stayed intact.
    FailSearch,
}

impl ExitPort {
    /// Stable numeric port value used by the surrounding test program.
    pub fn number(self) -> u32 {
        match self {
            Self::Fail => 0,
            Self::Pass => 1,
            Self::FailRules => 2,
            Self::FailSearch => 3,
        }
    }

    /// Stable string name used in logs and serialization.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Pass => "pass",
            Self::FailRules => "fail_rules",
            Self::FailSearch => "fail_search",
        }
    }
}

impl fmt::Display for ExitPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ExitPort> for u32 {
    fn from(port: ExitPort) -> Self {
        port.number()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Map a finished snapshot's top-level flags to its exit port.
///
/// Pure function of `failed_rules` and `failed_search`; bit-vector contents
/// never affect the port.
pub fn classify_port(results: &SearchResults) -> ExitPort {
    match (results.failed_rules, results.failed_search) {
        (false, false) => ExitPort::Pass,
        (false, true) => ExitPort::FailSearch,
        (true, false) => ExitPort::FailRules,
        (true, true) => ExitPort::Fail,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site_vector::SiteVector;

    fn snapshot(failed_rules: bool, failed_search: bool) -> SearchResults {
        SearchResults {
            failed_rules,
            failed_search,
            test_result_bits: vec![SiteVector::zeros(4)],
            rule_result_bits: SiteVector::zeros(4),
            incoming_mask: SiteVector::zeros(4),
            max_repetition_count: 1,
            per_result_data: Vec::new(),
        }
    }

    // -- Classification table --

    #[test]
    fn clean_pass_is_port_one() {
        assert_eq!(classify_port(&snapshot(false, false)), ExitPort::Pass);
        assert_eq!(classify_port(&snapshot(false, false)).number(), 1);
    }

    #[test]
    fn failed_search_is_port_three() {
        assert_eq!(classify_port(&snapshot(false, true)), ExitPort::FailSearch);
        assert_eq!(classify_port(&snapshot(false, true)).number(), 3);
    }

    #[test]
    fn failed_rules_is_port_two() {
        assert_eq!(classify_port(&snapshot(true, false)), ExitPort::FailRules);
        assert_eq!(classify_port(&snapshot(true, false)).number(), 2);
    }

    #[test]
    fn both_failed_is_port_zero() {
        assert_eq!(classify_port(&snapshot(true, true)), ExitPort::Fail);
        assert_eq!(classify_port(&snapshot(true, true)).number(), 0);
    }

    #[test]
    fn all_four_combinations_map_to_distinct_ports() {
        let ports: Vec<u32> = [(false, false), (false, true), (true, false), (true, true)]
            .iter()
            .map(|(rules, search)| classify_port(&snapshot(*rules, *search)).number())
            .collect();
        assert_eq!(ports, vec![1, 3, 2, 0]);
    }

    #[test]
    fn classification_is_stable_across_repeated_calls() {
        let results = snapshot(false, true);
        let first = classify_port(&results);
        let second = classify_port(&results);
        assert_eq!(first, second);
    }

    #[test]
    fn bit_vector_contents_do_not_affect_the_port() {
        let mut results = snapshot(false, false);
        results.rule_result_bits = SiteVector::from_bit_string("1111").expect("literal");
        results.test_result_bits = vec![SiteVector::from_bit_string("1010").expect("literal")];
        assert_eq!(classify_port(&results), ExitPort::Pass);
    }

    // -- ExitPort surface --

    #[test]
    fn as_str_names_are_stable() {
        assert_eq!(ExitPort::Fail.as_str(), "fail");
        assert_eq!(ExitPort::Pass.as_str(), "pass");
        assert_eq!(ExitPort::FailRules.as_str(), "fail_rules");
        assert_eq!(ExitPort::FailSearch.as_str(), "fail_search");
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(ExitPort::FailSearch.to_string(), "fail_search");
    }

    #[test]
    fn conversion_into_u32() {
        assert_eq!(u32::from(ExitPort::Fail), 0);
        assert_eq!(u32::from(ExitPort::FailSearch), 3);
    }

    #[test]
    fn serde_round_trip_all_variants() {
        for port in [
            ExitPort::Fail,
            ExitPort::Pass,
            ExitPort::FailRules,
            ExitPort::FailSearch,
        ] {
            let json = serde_json::to_string(&port).expect("serialize");
            let restored: ExitPort = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(port, restored);
        }
        assert_eq!(
            serde_json::to_string(&ExitPort::FailRules).expect("serialize"),
            "\"fail_rules\""
        );
    }
}
