//! Rule-correlation group configuration.
//!
//! A rule group declares a set of site positions whose failures are
//! correlated: once any member of the group is implicated, the whole group
//! must be retried together. Groups arrive as a comma-separated string of
//! bit literals (`"0000,1100,0011"`), one literal per group, each exactly as
//! wide as the site array. Parsing is fail-closed: a malformed token is a
//! configuration error, never an all-zero fallback.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::site_vector::{SiteVector, SiteVectorError};

// ---------------------------------------------------------------------------
// RuleGroupError
// ---------------------------------------------------------------------------

/// Configuration error raised while parsing a rule-group string.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RuleGroupError {
    /// Token `index` (zero-based, in declaration order) failed to parse.
    #[error("rule group token {index} is malformed: {source}")]
    MalformedToken {
        index: usize,
        #[source]
        source: SiteVectorError,
    },
}

// ---------------------------------------------------------------------------
// RuleGroup
// ---------------------------------------------------------------------------

/// One declared set of correlated site positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    bits: SiteVector,
}

impl RuleGroup {
    /// Wrap an already-validated member vector.
    pub fn new(bits: SiteVector) -> Self {
        Self { bits }
    }

    /// Member positions of this group.
    pub fn bits(&self) -> &SiteVector {
        &self.bits
    }

    /// Whether the group declares no members.
    pub fn is_empty(&self) -> bool {
        !self.bits.any_set()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a comma-separated rule-group string against a site array of
/// `width` positions.
///
/// ASCII spaces are stripped before tokenizing. An empty token denotes a
/// group with no members. Every non-empty token must be exactly `width`
/// characters of `0`/`1`; anything else fails with the token's index.
pub fn parse_rule_groups(csv: &str, width: usize) -> Result<Vec<RuleGroup>, RuleGroupError> {
    let cleaned: String = csv.chars().filter(|c| *c != ' ').collect();
    cleaned
        .split(',')
        .enumerate()
        .map(|(index, token)| {
            if token.is_empty() {
                return Ok(RuleGroup::new(SiteVector::zeros(width)));
            }
            let bits = SiteVector::from_bit_string(token)
                .map_err(|source| RuleGroupError::MalformedToken { index, source })?;
            if bits.width() != width {
                return Err(RuleGroupError::MalformedToken {
                    index,
                    source: SiteVectorError::WidthMismatch {
                        expected: width,
                        found: bits.width(),
                    },
                });
            }
            Ok(RuleGroup::new(bits))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
