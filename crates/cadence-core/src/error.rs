//! Error types for cadence

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to turn notation text into a pattern.
///
/// Positions are byte offsets into the source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("Range error: {0}")]
    Range(String),
    #[error("Combination error at {position}: {message}")]
    Combination { position: usize, message: String },
}

impl ParseError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn range(message: impl Into<String>) -> Self {
        Self::Range(message.into())
    }

    pub(crate) fn combination(position: usize, message: impl Into<String>) -> Self {
        Self::Combination {
            position,
            message: message.into(),
        }
    }
}

/// Non-fatal findings attached to an otherwise valid descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseWarning {
    /// The rhythm has zero onsets
    EmptyPattern,
}

/// Malformed input to one of the format converters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("Empty input")]
    Empty,
    #[error("Invalid digit '{digit}' in {format} input")]
    InvalidDigit { digit: char, format: &'static str },
    #[error("Step count {0} is out of range")]
    StepCount(usize),
    #[error("Value {value} does not fit in {steps} steps")]
    Overflow { value: u64, steps: usize },
    #[error("Onset index {index} is outside {steps} steps")]
    OnsetOutOfRange { index: usize, steps: usize },
}

pub type Result<T> = std::result::Result<T, ParseError>;
