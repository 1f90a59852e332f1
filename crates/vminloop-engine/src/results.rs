//! Per-iteration search result snapshot.
//!
//! The driver assembles one `SearchResults` value per search-loop iteration
//! and hands it to the decision functions: the repeat decision mutates
//! `rule_result_bits` in place, the tracker gate and port classification
//! read the finished snapshot. All bit vectors in one snapshot share the
//! same width, fixed for the life of the search.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::site_vector::SiteVector;

// ---------------------------------------------------------------------------
// SnapshotError
// ---------------------------------------------------------------------------

/// Width-invariant violation inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SnapshotError {
    #[error("incoming mask width {found} does not match rule result width {expected}")]
    IncomingMaskWidth { expected: usize, found: usize },
    #[error("test result entry {index} width {found} does not match rule result width {expected}")]
    TestResultWidth {
        index: usize,
        expected: usize,
        found: usize,
    },
}

// ---------------------------------------------------------------------------
// Measured state
// ---------------------------------------------------------------------------

/// Failing-pattern descriptor attached to one search point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternData {
    pub pattern_name: String,
    pub burst_index: u32,
    pub pattern_id: u32,
    pub fail_vector: u64,
}

/// Voltages and failing pattern captured at one search point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPointData {
    pub voltages: Vec<f64>,
    pub fail_pattern: PatternData,
}

/// Measured values for one executed search pass.
///
/// Consumed as context only; the decision functions never interpret the
/// voltage contents beyond repetition accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStateValues {
    pub voltages: Vec<f64>,
    pub start_voltages: Vec<f64>,
    pub end_voltage_limits: Vec<f64>,
    pub execution_count: u32,
    pub mask_bits: SiteVector,
    pub fail_reason: String,
    pub per_point_data: Vec<SearchPointData>,
    pub per_target_increments: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifies one logical result group within the loop.
///
/// `tname_postfix` is the datalog name suffix of the form `MxRy`,
/// `multi_pass_count` the multi-pass ordinal, and `repetition_count` how
/// many times this group has already been repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIdentifiers {
    pub tname_postfix: String,
    pub multi_pass_count: u32,
    pub repetition_count: u32,
}

impl SearchIdentifiers {
    pub fn new(
        tname_postfix: impl Into<String>,
        multi_pass_count: u32,
        repetition_count: u32,
    ) -> Self {
        Self {
            tname_postfix: tname_postfix.into(),
            multi_pass_count,
            repetition_count,
        }
    }
}

/// One logical result group: measured state, pass/fail, identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultData {
    pub state_values: SearchStateValues,
    pub is_pass: bool,
    pub identifiers: SearchIdentifiers,
}

// ---------------------------------------------------------------------------
// SearchResults
// ---------------------------------------------------------------------------

/// Mutable result snapshot for one search-loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Rule evaluation is in a permanently-failed state this iteration.
    pub failed_rules: bool,
    /// The underlying measurement/search failed this iteration.
    pub failed_search: bool,
    /// One bit vector per per-target test result measured this iteration.
    pub test_result_bits: Vec<SiteVector>,
    /// Positions implicated by rule correlation, accumulated in place.
    pub rule_result_bits: SiteVector,
    /// Positions already masked/excluded coming into this iteration.
    pub incoming_mask: SiteVector,
    /// Retry budget ceiling, constant for the life of the search.
    pub max_repetition_count: u32,
    /// One entry per logical result group, for repetition accounting.
    pub per_result_data: Vec<SearchResultData>,
}

impl SearchResults {
    /// Site-array width shared by every vector in the snapshot.
    pub fn width(&self) -> usize {
        self.rule_result_bits.width()
    }

    /// Smallest repetition count across result groups; zero when no groups
    /// have been recorded yet.
    pub fn min_repetition_count(&self) -> u32 {
        self.per_result_data
            .iter()
            .map(|entry| entry.identifiers.repetition_count)
            .min()
            .unwrap_or(0)
    }

    /// OR-fold of all per-target test results; all-clear when none were
    /// measured.
    pub fn combined_test_bits(&self) -> SiteVector {
        SiteVector::or_fold(self.test_result_bits.iter())
            .unwrap_or_else(|| SiteVector::zeros(self.width()))
    }

    /// Mask to carry into the next iteration.
    ///
    /// With `use_rule_bits` the rule-implicated positions are masked; without
    /// it the raw per-target failures are. The incoming mask stays set either
    /// way.
    pub fn mask_bits(&self, use_rule_bits: bool) -> SiteVector {
        if use_rule_bits {
            let mut mask = self.rule_result_bits.clone();
            mask.or_assign(&self.incoming_mask);
            return mask;
        }
        if self.test_result_bits.is_empty() {
            return self.incoming_mask.clone();
        }
        let mut mask = self.combined_test_bits();
        mask.or_assign(&self.incoming_mask);
        mask
    }

    /// Re-derive `failed_search` from the accumulated result groups.
    ///
    /// For each multi-pass ordinal only the most recent repetition counts; a
    /// group passes when its latest entry passed or was never executed. A
    /// snapshot with no recorded groups is left unchanged.
    pub fn refresh_failed_search(&mut self) {
        let Some(last) = self.per_result_data.last() else {
            return;
        };
        let mut passing = last.is_pass;
        let mut current_multi_pass = last.identifiers.multi_pass_count.saturating_add(1);
        for entry in self.per_result_data.iter().rev() {
            if entry.identifiers.multi_pass_count >= current_multi_pass {
                continue;
            }
            passing &= entry.is_pass || entry.state_values.execution_count == 0;
            current_multi_pass = entry.identifiers.multi_pass_count;
        }
        self.failed_search = !passing;
    }

    /// Check the shared-width invariant across the snapshot's vectors.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let expected = self.width();
        if self.incoming_mask.width() != expected {
            return Err(SnapshotError::IncomingMaskWidth {
                expected,
                found: self.incoming_mask.width(),
            });
        }
        for (index, bits) in self.test_result_bits.iter().enumerate() {
            if bits.width() != expected {
                return Err(SnapshotError::TestResultWidth {
                    index,
                    expected,
                    found: bits.width(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
