//! Recovery tracker capability and the tracker-update gate.
//!
//! The persistent per-die recovery structure lives outside the engine; it
//! is consumed through a single-operation capability trait so any
//! persistence mechanism can stand in, including a recording tracker in
//! tests. The gate decides whether an iteration's outcome is pushed into
//! tracking at all: failed iterations record nothing unless the caller
//! forces the update.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::results::SearchResults;
use crate::site_vector::SiteVector;

// ---------------------------------------------------------------------------
// UpdateMode
// ---------------------------------------------------------------------------

/// How an update combines with the tracker's existing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Merge the new data with the existing data.
    Merge,
    /// Replace the existing data with the new data.
    Overwrite,
}

impl UpdateMode {
    /// Stable string name used in logs and serialization.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RecoveryTracker capability
// ---------------------------------------------------------------------------

/// Capability handle onto the persistent per-die recovery structure.
///
/// One atomic operation: merge this iteration's failing/incoming/test bit
/// vectors into tracking state under the given mode. Returns whether the
/// structural update succeeded. Serialization across concurrently-tested
/// sites is the tracker's responsibility.
pub trait RecoveryTracker {
    fn update_tracking_structure(
        &mut self,
        rule_bits: &SiteVector,
        incoming_mask: &SiteVector,
        test_bits: &SiteVector,
        mode: UpdateMode,
        log: bool,
    ) -> bool;
}

// ---------------------------------------------------------------------------
// Tracker-update gate
// ---------------------------------------------------------------------------

/// Push a finished iteration's outcome into recovery tracking when the
/// iteration qualifies.
///
/// The tracker is invoked iff `force_update` is set or both top-level
/// failure flags are clear; otherwise nothing is recorded and the update
/// counts as successful. When invoked, every entry of `test_result_bits`
/// produces one merge call, all entries run, and the result is the AND of
/// the per-call outcomes. A `false` tracker outcome is reported verbatim;
/// retry and rollback are the caller's decision.
pub fn update_recovery_trackers<T>(
    results: &SearchResults,
    tracker: &mut T,
    force_update: bool,
) -> bool
where
    T: RecoveryTracker + ?Sized,
{
    if !force_update && (results.failed_rules || results.failed_search) {
        return true;
    }

    let mut success = true;
    for test_bits in &results.test_result_bits {
        success &= tracker.update_tracking_structure(
            &results.rule_result_bits,
            &results.incoming_mask,
            test_bits,
            UpdateMode::Merge,
            true,
        );
    }
    success
}

// ---------------------------------------------------------------------------
// InMemoryTracker
// ---------------------------------------------------------------------------

/// One recorded tracker invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerCall {
    pub rule_bits: SiteVector,
    pub incoming_mask: SiteVector,
    pub test_bits: SiteVector,
    pub mode: UpdateMode,
    pub log: bool,
    pub accepted: bool,
}

/// In-memory recovery tracker.
///
/// Holds the tracking bits directly and records every invocation as a
/// structured [`TrackerCall`]. Serves as the reference tracker and as a
/// recording stub in tests. An update is rejected, and `false` returned,
/// when the offered vectors disagree in width with each other or with the
/// tracked state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryTracker {
    state: Option<SiteVector>,
    calls: Vec<TrackerCall>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tracking bits; `None` before the first accepted update.
    pub fn state(&self) -> Option<&SiteVector> {
        self.state.as_ref()
    }

    /// Every invocation recorded so far, in order.
    pub fn calls(&self) -> &[TrackerCall] {
        &self.calls
    }

    /// Number of recorded invocations.
    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    /// Drain the recorded invocations.
    pub fn drain_calls(&mut self) -> Vec<TrackerCall> {
        std::mem::take(&mut self.calls)
    }

    fn structurally_consistent(&self, rule_bits: &SiteVector, test_bits: &SiteVector) -> bool {
        if test_bits.width() != rule_bits.width() {
            return false;
        }
        match &self.state {
            Some(state) => state.width() == rule_bits.width(),
            None => true,
        }
    }
}

impl RecoveryTracker for InMemoryTracker {
    fn update_tracking_structure(
        &mut self,
        rule_bits: &SiteVector,
        incoming_mask: &SiteVector,
        test_bits: &SiteVector,
        mode: UpdateMode,
        log: bool,
    ) -> bool {
        let accepted = self.structurally_consistent(rule_bits, test_bits);
        if accepted {
            match &mut self.state {
                Some(state) if mode == UpdateMode::Merge => state.or_assign(rule_bits),
                state => *state = Some(rule_bits.clone()),
            }
        }
        self.calls.push(TrackerCall {
            rule_bits: rule_bits.clone(),
            incoming_mask: incoming_mask.clone(),
            test_bits: test_bits.clone(),
            mode,
            log,
            accepted,
        });
        accepted
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
