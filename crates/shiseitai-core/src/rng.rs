//! Seeded random source shared by every stage of a run.
//!
//! The stream is mulberry32: an additive round constant followed by two
//! xor-shift/multiply rounds and a final xor-shift, normalized by 2^32. Any
//! implementation seeded with the same `u32` reproduces the same floats.

use rand::RngCore;
use rand::rand_core::impls;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const ROUND_CONSTANT: u32 = 0x6D2B_79F5;
const NORMALIZER: f64 = 4_294_967_296.0;

/// Caller-supplied seed before normalization.
///
/// Deserialization accepts any JSON value; one that is neither a number nor a
/// string becomes [`SeedInput::Unreadable`] and resolves to a clock seed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeedInput {
    Integer(i64),
    Float(f64),
    Text(String),
    Unreadable,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedRepr {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for SeedInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match SeedRepr::deserialize(deserializer)? {
            SeedRepr::Integer(value) => Self::Integer(value),
            SeedRepr::Float(value) => Self::Float(value),
            SeedRepr::Text(text) => Self::Text(text),
            SeedRepr::Other(_) => Self::Unreadable,
        })
    }
}

impl SeedInput {
    /// Normalizes to an unsigned 32-bit seed, or `None` when the input cannot be read as a number.
    #[must_use]
    pub fn to_seed(&self) -> Option<u32> {
        match self {
            // Truncating casts keep the low 32 bits, i.e. modulo 2^32.
            Self::Integer(value) => Some(*value as u32),
            Self::Float(value) if value.is_finite() => Some(value.trunc() as i64 as u32),
            Self::Float(_) => None,
            Self::Text(text) => parse_leading_integer(text),
            Self::Unreadable => None,
        }
    }
}

impl From<u32> for SeedInput {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for SeedInput {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for SeedInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SeedInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Reads an optional sign and the leading decimal digits, reduced modulo 2^32.
fn parse_leading_integer(text: &str) -> Option<u32> {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let mut magnitude: u32 = 0;
    let mut seen_digit = false;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            break;
        }
        seen_digit = true;
        magnitude = magnitude
            .wrapping_mul(10)
            .wrapping_add(u32::from(byte - b'0'));
    }
    if !seen_digit {
        return None;
    }
    Some(if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    })
}

/// Resolves an optional seed input, falling back to the wall clock.
#[must_use]
pub fn resolve_seed(input: Option<&SeedInput>) -> u32 {
    match input.and_then(SeedInput::to_seed) {
        Some(seed) => seed,
        None => {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis())
                .unwrap_or_default();
            let seed = millis as u32;
            debug!(seed, "seed missing or malformed; derived from clock");
            seed
        }
    }
}

/// Deterministic mulberry32 stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRng {
    seed: u32,
    state: u32,
}

impl SeededRng {
    /// Construct a stream from an already-normalized seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { seed, state: seed }
    }

    /// Construct a stream from raw caller input (clock fallback when absent or malformed).
    #[must_use]
    pub fn from_input(input: Option<&SeedInput>) -> Self {
        Self::new(resolve_seed(input))
    }

    /// The normalized seed this stream started from.
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    fn next_raw(&mut self) -> u32 {
        self.state = self.state.wrapping_add(ROUND_CONSTANT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_raw()) / NORMALIZER
    }

    /// Uniform integer in `[min, max]` (inclusive).
    pub fn int(&mut self, min: i64, max: i64) -> i64 {
        let span = (max - min + 1) as f64;
        (self.next_f64() * span).floor() as i64 + min
    }

    /// Uniform index into a non-empty collection of `len` items.
    pub fn index(&mut self, len: usize) -> usize {
        self.int(0, len as i64 - 1).max(0) as usize
    }

    /// Uniformly chosen element, `None` for an empty slice (no draw is consumed).
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.index(items.len());
        items.get(index)
    }

    /// Uniform float in `[min, max)`.
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        self.next_f64() * (max - min) + min
    }

    /// Uniform float in `[-span, span)`.
    pub fn signed(&mut self, span: f64) -> f64 {
        (self.next_f64() * 2.0 - 1.0) * span
    }

    /// Returns `true` with probability `probability`.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        self.next_raw()
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest);
    }
}
