//! Fixed-length boolean step sequences

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::convert;
use crate::error::ConvertError;

/// Upper bound on the step count of any parsed rhythm or accent sequence
pub const MAX_STEPS: usize = 64;

/// An ordered run of steps where `true` marks an onset.
///
/// Always holds at least one step. Serializes as a binary digit string
/// (`"10110110"`), step 0 first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepSequence(Vec<bool>);

impl StepSequence {
    /// Wrap a step vector, rejecting the empty sequence
    pub fn new(steps: Vec<bool>) -> Option<Self> {
        if steps.is_empty() {
            None
        } else {
            Some(Self(steps))
        }
    }

    /// A single step with one onset (the downbeat)
    pub fn downbeat() -> Self {
        Self(vec![true])
    }

    /// `len` steps with no onsets; zero is treated as one step
    pub fn silent(len: usize) -> Self {
        Self(vec![false; len.max(1)])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true; kept for API symmetry with slices
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[bool] {
        &self.0
    }

    pub fn into_steps(self) -> Vec<bool> {
        self.0
    }

    /// Step lookup that wraps around the cycle
    pub fn is_onset(&self, step: usize) -> bool {
        self.0[step % self.0.len()]
    }

    pub fn onset_count(&self) -> usize {
        self.0.iter().filter(|&&s| s).count()
    }

    /// Sorted step indices that carry an onset
    pub fn onset_positions(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect()
    }

    /// Ordinal of the onset at `step` within the cycle, if there is one
    pub fn onset_ordinal(&self, step: usize) -> Option<usize> {
        let step = step % self.0.len();
        if !self.0[step] {
            return None;
        }
        Some(self.0[..step].iter().filter(|&&s| s).count())
    }
}

impl fmt::Display for StepSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&convert::to_binary(self))
    }
}

impl TryFrom<String> for StepSequence {
    type Error = ConvertError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        convert::from_binary(&value)
    }
}

impl From<StepSequence> for String {
    fn from(value: StepSequence) -> Self {
        convert::to_binary(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(bits: &str) -> StepSequence {
        convert::from_binary(bits).unwrap()
    }

    #[test]
    fn test_rejects_empty() {
        assert!(StepSequence::new(Vec::new()).is_none());
        assert_eq!(StepSequence::silent(0).len(), 1);
    }

    #[test]
    fn test_onset_queries() {
        let s = seq("10110110");
        assert_eq!(s.onset_count(), 5);
        assert_eq!(s.onset_positions(), vec![0, 2, 3, 5, 6]);
        assert_eq!(s.onset_ordinal(3), Some(2));
        assert_eq!(s.onset_ordinal(1), None);
        assert!(s.is_onset(8));
    }

    #[test]
    fn test_serde_as_binary_string() {
        let s = seq("1001");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"1001\"");
        let back: StepSequence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(serde_json::from_str::<StepSequence>("\"\"").is_err());
    }
}
