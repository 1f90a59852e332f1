//! Fixed-width per-site bit vectors.
//!
//! Every bit vector in the engine addresses the same array of sites/dice
//! under test: bit `i` corresponds to site `i`, and a set bit means
//! "failing / needs attention at this position". The canonical textual form
//! is a string of `0`/`1` characters, left to right, mapping to positions
//! `0..N-1`. Serialization uses that form so persisted and logged state
//! stays human-auditable.

use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// SiteVectorError
// ---------------------------------------------------------------------------

/// Error raised when parsing or combining site vectors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SiteVectorError {
    /// The bit literal contained no characters.
    #[error("bit literal is empty")]
    EmptyLiteral,
    /// The bit literal contained a character other than `0` or `1`.
    #[error("invalid character `{character}` at position {position} in bit literal")]
    InvalidCharacter { position: usize, character: char },
    /// A vector had a different width than the context requires.
    #[error("bit vector width mismatch: expected {expected}, found {found}")]
    WidthMismatch { expected: usize, found: usize },
}

// ---------------------------------------------------------------------------
// SiteVector
// ---------------------------------------------------------------------------

/// A fixed-width bit vector with one bit per site under test.
///
/// The width is fixed at construction. Binary operations expect operands of
/// equal width; positions beyond the shorter operand are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteVector {
    bits: Vec<bool>,
}

impl SiteVector {
    /// All-clear vector of the given width.
    pub fn zeros(width: usize) -> Self {
        Self {
            bits: vec![false; width],
        }
    }

    /// Parse a `0`/`1` literal into a vector, left to right.
    pub fn from_bit_string(literal: &str) -> Result<Self, SiteVectorError> {
        if literal.is_empty() {
            return Err(SiteVectorError::EmptyLiteral);
        }
        let mut bits = Vec::with_capacity(literal.len());
        for (position, character) in literal.chars().enumerate() {
            match character {
                '0' => bits.push(false),
                '1' => bits.push(true),
                _ => {
                    return Err(SiteVectorError::InvalidCharacter {
                        position,
                        character,
                    });
                }
            }
        }
        Ok(Self { bits })
    }

    /// Number of sites addressed by this vector.
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Bit at `index`, or `None` when out of range.
    pub fn bit(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    /// Whether any bit is set.
    pub fn any_set(&self) -> bool {
        self.bits.iter().any(|bit| *bit)
    }

    /// Number of set bits.
    pub fn count_set(&self) -> usize {
        self.bits.iter().filter(|bit| **bit).count()
    }

    /// Whether this vector shares at least one set position with `other`.
    pub fn overlaps(&self, other: &SiteVector) -> bool {
        debug_assert_eq!(self.width(), other.width());
        self.bits
            .iter()
            .zip(other.bits.iter())
            .any(|(a, b)| *a && *b)
    }

    /// Set every position that is set in `other`.
    pub fn or_assign(&mut self, other: &SiteVector) {
        debug_assert_eq!(self.width(), other.width());
        for (bit, incoming) in self.bits.iter_mut().zip(other.bits.iter()) {
            *bit |= *incoming;
        }
    }

    /// OR-fold a sequence of vectors. Returns `None` for an empty sequence.
    pub fn or_fold<'a, I>(vectors: I) -> Option<SiteVector>
    where
        I: IntoIterator<Item = &'a SiteVector>,
    {
        let mut iter = vectors.into_iter();
        let mut folded = iter.next()?.clone();
        for vector in iter {
            folded.or_assign(vector);
        }
        Some(folded)
    }

    /// Canonical `0`/`1` rendering, position 0 first.
    pub fn to_bit_string(&self) -> String {
        self.bits
            .iter()
            .map(|bit| if *bit { '1' } else { '0' })
            .collect()
    }
}

impl fmt::Display for SiteVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bit_string())
    }
}

impl Serialize for SiteVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_bit_string())
    }
}

impl<'de> Deserialize<'de> for SiteVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let literal = String::deserialize(deserializer)?;
        SiteVector::from_bit_string(&literal).map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
