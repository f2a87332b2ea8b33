//! Parsed pattern descriptors

use serde::{Deserialize, Serialize};

use crate::error::ParseWarning;
use crate::sequence::StepSequence;

/// Algorithm that moves a pattern one onset at a time toward its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformerKind {
    /// `e`: regenerate the maximally-even pattern for each onset count
    EvenDistribution,
    /// `b`: add the most / remove the least indispensable steps
    Indispensability,
    /// `w`: the anti-metric mirror of `b`
    InverseIndispensability,
    /// `d`: complement of the even pattern for the remaining steps
    InverseEvenDistribution,
}

impl TransformerKind {
    /// Notation letter placed before `>`
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'e' => Some(Self::EvenDistribution),
            'b' => Some(Self::Indispensability),
            'w' => Some(Self::InverseIndispensability),
            'd' => Some(Self::InverseEvenDistribution),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Self::EvenDistribution => 'e',
            Self::Indispensability => 'b',
            Self::InverseIndispensability => 'w',
            Self::InverseEvenDistribution => 'd',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EvenDistribution => "Even distribution",
            Self::Indispensability => "Indispensability",
            Self::InverseIndispensability => "Inverse indispensability",
            Self::InverseEvenDistribution => "Inverse even distribution",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Onsets are added on the way to the target
    Concentrate,
    /// Onsets are removed on the way to the target
    Dilute,
    /// Base already sits at the target
    Hold,
}

/// `X>N`: evolve the base pattern toward `target` onsets, one per advance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressiveSpec {
    pub kind: TransformerKind,
    pub target: usize,
    pub base: StepSequence,
}

impl ProgressiveSpec {
    pub fn new(kind: TransformerKind, target: usize, base: StepSequence) -> Self {
        Self { kind, target, base }
    }

    pub fn direction(&self) -> Direction {
        let onsets = self.base.onset_count();
        if self.target > onsets {
            Direction::Concentrate
        } else if self.target < onsets {
            Direction::Dilute
        } else {
            Direction::Hold
        }
    }
}

/// Immutable result of parsing one pattern (one scene).
///
/// A reparse or an advance produces a new descriptor; nothing mutates one
/// in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDescriptor {
    steps: StepSequence,
    accents: Option<StepSequence>,
    progressive: Option<ProgressiveSpec>,
    rotation_step: Option<i64>,
    lengthening: Option<usize>,
    source: String,
    warnings: Vec<ParseWarning>,
}

impl PatternDescriptor {
    pub(crate) fn new(steps: StepSequence, source: impl Into<String>) -> Self {
        let warnings = if steps.onset_count() == 0 {
            vec![ParseWarning::EmptyPattern]
        } else {
            Vec::new()
        };
        Self {
            steps,
            accents: None,
            progressive: None,
            rotation_step: None,
            lengthening: None,
            source: source.into(),
            warnings,
        }
    }

    pub(crate) fn with_accents(mut self, accents: Option<StepSequence>) -> Self {
        self.accents = accents;
        self
    }

    pub(crate) fn with_progressive(mut self, progressive: Option<ProgressiveSpec>) -> Self {
        self.progressive = progressive;
        self
    }

    pub(crate) fn with_rotation_step(mut self, rotation_step: Option<i64>) -> Self {
        self.rotation_step = rotation_step;
        self
    }

    pub(crate) fn with_lengthening(mut self, lengthening: Option<usize>) -> Self {
        self.lengthening = lengthening;
        self
    }

    /// Same descriptor over a different step sequence (progressive output)
    pub fn with_steps(&self, steps: StepSequence) -> Self {
        let mut next = self.clone();
        next.warnings.retain(|w| *w != ParseWarning::EmptyPattern);
        if steps.onset_count() == 0 {
            next.warnings.push(ParseWarning::EmptyPattern);
        }
        next.steps = steps;
        next
    }

    pub fn steps(&self) -> &StepSequence {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn onset_count(&self) -> usize {
        self.steps.onset_count()
    }

    pub fn accents(&self) -> Option<&StepSequence> {
        self.accents.as_ref()
    }

    pub fn progressive(&self) -> Option<&ProgressiveSpec> {
        self.progressive.as_ref()
    }

    /// `+N`: rotation applied once more on every advance
    pub fn rotation_step(&self) -> Option<i64> {
        self.rotation_step
    }

    /// `*N`: random steps appended on every advance
    pub fn lengthening(&self) -> Option<usize> {
        self.lengthening
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn is_empty_pattern(&self) -> bool {
        self.warnings.contains(&ParseWarning::EmptyPattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::from_binary;

    #[test]
    fn test_transformer_letters() {
        for kind in [
            TransformerKind::EvenDistribution,
            TransformerKind::Indispensability,
            TransformerKind::InverseIndispensability,
            TransformerKind::InverseEvenDistribution,
        ] {
            assert_eq!(TransformerKind::from_letter(kind.letter()), Some(kind));
        }
        assert_eq!(TransformerKind::from_letter('B'), Some(TransformerKind::Indispensability));
        assert_eq!(TransformerKind::from_letter('x'), None);
    }

    #[test]
    fn test_direction() {
        let base = from_binary("10010010").unwrap();
        let spec = |t| ProgressiveSpec::new(TransformerKind::Indispensability, t, base.clone());
        assert_eq!(spec(5).direction(), Direction::Concentrate);
        assert_eq!(spec(1).direction(), Direction::Dilute);
        assert_eq!(spec(3).direction(), Direction::Hold);
    }

    #[test]
    fn test_empty_warning_tracks_steps() {
        let d = PatternDescriptor::new(from_binary("0000").unwrap(), "0000");
        assert!(d.is_empty_pattern());
        let d = d.with_steps(from_binary("1000").unwrap());
        assert!(!d.is_empty_pattern());
        assert_eq!(d.source(), "0000");
    }
}
