//! # Error Types
//!
//! Parse errors for the hex-encoded primitives.

use thiserror::Error;

/// Errors raised while parsing addresses and hashes from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Wrong number of hex digits after the optional `0x` prefix.
    #[error("Invalid {kind} length: expected {expected} hex digits, got {got}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    /// Non-hex characters in the input.
    #[error("Invalid hex in {kind}: {input}")]
    InvalidHex { kind: &'static str, input: String },

    /// Unknown enum discriminant (doc type, category, ...).
    #[error("Unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: u64 },
}
