//! Lossless conversions between step sequences and their textual forms
//!
//! Every numeric form maps bit i to step i. Hex and octal strings are read
//! strictly left to right: the first digit covers the first 4 (or 3) steps,
//! with its lowest bit on the earliest step.

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::sequence::{MAX_STEPS, StepSequence};

/// Textual representations understood by both the converters and the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    Binary,
    Hex,
    Octal,
    Decimal,
    Onsets,
}

// ============================================================================
// Binary
// ============================================================================

pub fn to_binary(seq: &StepSequence) -> String {
    seq.steps().iter().map(|&s| if s { '1' } else { '0' }).collect()
}

pub fn from_binary(text: &str) -> Result<StepSequence, ConvertError> {
    let steps = text
        .chars()
        .map(|c| match c {
            '1' => Ok(true),
            '0' => Ok(false),
            other => Err(ConvertError::InvalidDigit {
                digit: other,
                format: "binary",
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    StepSequence::new(steps).ok_or(ConvertError::Empty)
}

// ============================================================================
// Integer (decimal)
// ============================================================================

/// Pack the sequence into an integer, step i at bit i
pub fn to_integer(seq: &StepSequence) -> Result<u64, ConvertError> {
    if seq.len() > MAX_STEPS {
        return Err(ConvertError::StepCount(seq.len()));
    }
    Ok(seq
        .steps()
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s)
        .fold(0u64, |acc, (i, _)| acc | (1u64 << i)))
}

pub fn from_integer(value: u64, steps: usize) -> Result<StepSequence, ConvertError> {
    if steps == 0 || steps > MAX_STEPS {
        return Err(ConvertError::StepCount(steps));
    }
    if steps < 64 && value >> steps != 0 {
        return Err(ConvertError::Overflow { value, steps });
    }
    let bits = (0..steps).map(|i| value & (1u64 << i) != 0).collect();
    StepSequence::new(bits).ok_or(ConvertError::Empty)
}

// ============================================================================
// Hex / octal
// ============================================================================

pub fn to_hex(seq: &StepSequence) -> String {
    to_grouped(seq, 4)
}

pub fn from_hex(digits: &str, steps: usize) -> Result<StepSequence, ConvertError> {
    from_grouped(digits, steps, 4, "hex")
}

pub fn to_octal(seq: &StepSequence) -> String {
    to_grouped(seq, 3)
}

pub fn from_octal(digits: &str, steps: usize) -> Result<StepSequence, ConvertError> {
    from_grouped(digits, steps, 3, "octal")
}

fn to_grouped(seq: &StepSequence, bits: usize) -> String {
    seq.steps()
        .chunks(bits)
        .map(|chunk| {
            let value = chunk
                .iter()
                .enumerate()
                .filter(|&(_, &s)| s)
                .fold(0u32, |acc, (i, _)| acc | (1 << i));
            char::from_digit(value, 1 << bits)
                .unwrap_or('0')
                .to_ascii_uppercase()
        })
        .collect()
}

fn from_grouped(
    digits: &str,
    steps: usize,
    bits: usize,
    format: &'static str,
) -> Result<StepSequence, ConvertError> {
    if digits.is_empty() {
        return Err(ConvertError::Empty);
    }
    if steps == 0 {
        return Err(ConvertError::StepCount(steps));
    }
    let radix = 1u32 << bits;
    let mut out = vec![false; steps];
    for (group, c) in digits.chars().enumerate() {
        let value = c
            .to_digit(radix)
            .ok_or(ConvertError::InvalidDigit { digit: c, format })?;
        for bit in 0..bits {
            if value & (1 << bit) == 0 {
                continue;
            }
            let index = group * bits + bit;
            if index >= steps {
                return Err(ConvertError::OnsetOutOfRange { index, steps });
            }
            out[index] = true;
        }
    }
    StepSequence::new(out).ok_or(ConvertError::Empty)
}

// ============================================================================
// Onset-index lists
// ============================================================================

pub fn to_onsets(seq: &StepSequence) -> Vec<usize> {
    seq.onset_positions()
}

/// Build a sequence from onset indices; duplicates collapse
pub fn from_onsets(onsets: &[usize], steps: usize) -> Result<StepSequence, ConvertError> {
    if steps == 0 {
        return Err(ConvertError::StepCount(steps));
    }
    let mut out = vec![false; steps];
    for &index in onsets {
        if index >= steps {
            return Err(ConvertError::OnsetOutOfRange { index, steps });
        }
        out[index] = true;
    }
    StepSequence::new(out).ok_or(ConvertError::Empty)
}

// ============================================================================
// Notation rendering
// ============================================================================

/// Render `seq` as notation the parser reads back to the same sequence
pub fn format_notation(seq: &StepSequence, format: Format) -> String {
    let n = seq.len();
    match format {
        Format::Binary => format!("b{}", to_binary(seq)),
        Format::Hex => format!("0x{}:{n}", to_hex(seq)),
        Format::Octal => format!("0o{}:{n}", to_octal(seq)),
        Format::Decimal => match to_integer(seq) {
            Ok(value) => format!("d{value}:{n}"),
            Err(_) => format!("b{}", to_binary(seq)),
        },
        Format::Onsets => {
            let list: Vec<String> = to_onsets(seq).iter().map(|i| i.to_string()).collect();
            format!("[{}]:{n}", list.join(","))
        }
    }
}
