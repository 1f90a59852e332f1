#![forbid(unsafe_code)]

//! Recovery-loop decision engine for adaptive voltage-search test methods.
//!
//! An adaptive voltage search runs repeated measurement passes over an
//! array of sites/dice. After each pass the surrounding test method needs
//! three decisions, and only three, taken over one shared result snapshot:
//! - whether the loop must repeat because correlated rule failures pulled
//!   additional sites into the retry set ([`repeat`]),
//! - whether the pass outcome should be pushed into the persistent per-die
//!   recovery tracker ([`tracker`]),
//! - which categorical exit port the finished search bins into ([`port`]).
//!
//! The decisions are free functions over an explicit [`results::SearchResults`]
//! snapshot plus an injected [`tracker::RecoveryTracker`] capability; the
//! engine holds no state of its own across iterations. Instrument I/O,
//! pattern execution, console output, and the test-method lifecycle all
//! stay with the driver.

pub mod port;
pub mod repeat;
pub mod results;
pub mod rule_groups;
pub mod site_vector;
pub mod tracker;

pub use port::{classify_port, ExitPort};
pub use repeat::{evaluate_repeat, has_to_repeat_search, RepeatVerdict};
pub use tracker::{update_recovery_trackers, RecoveryTracker, UpdateMode};
