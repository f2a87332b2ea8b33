//! Progressive transformations: one onset closer to the target per advance
//!
//! Each `(base, kind, target)` combination owns a small state machine:
//!
//! ```text
//! Base --advance--> Transforming(1) --advance--> ... --> Cycled --advance--> Base
//! ```
//!
//! States live in a bounded LRU cache so switching between patterns resumes
//! where each one left off.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::algorithms;
use crate::descriptor::{PatternDescriptor, ProgressiveSpec, TransformerKind};
use crate::indispensability;
use crate::lru::LruCache;
use crate::sequence::StepSequence;

pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Identity of one progression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressiveKey {
    pub base: StepSequence,
    pub kind: TransformerKind,
    pub target: usize,
}

impl From<&ProgressiveSpec> for ProgressiveKey {
    fn from(spec: &ProgressiveSpec) -> Self {
        Self {
            base: spec.base.clone(),
            kind: spec.kind,
            target: spec.target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Base,
    Transforming,
    /// At the target; the next advance returns to the base
    Cycled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressiveState {
    current: StepSequence,
    step_index: usize,
    phase: Phase,
}

impl ProgressiveState {
    fn base(spec: &ProgressiveSpec) -> Self {
        let phase = if spec.base.onset_count() == spec.target {
            Phase::Cycled
        } else {
            Phase::Base
        };
        Self {
            current: spec.base.clone(),
            step_index: 0,
            phase,
        }
    }

    pub fn current(&self) -> &StepSequence {
        &self.current
    }

    pub fn current_onsets(&self) -> usize {
        self.current.onset_count()
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

/// Apply one transformer step to `current`; `None` if no progress is possible
fn transform_step(current: &StepSequence, spec: &ProgressiveSpec) -> Option<StepSequence> {
    let length = current.len();
    let onsets = current.onset_count();
    let adding = spec.target > onsets;
    let next_count = if adding { onsets + 1 } else { onsets.checked_sub(1)? };

    let steps = match spec.kind {
        TransformerKind::EvenDistribution => algorithms::euclidean(next_count, length, 0),
        TransformerKind::InverseEvenDistribution => {
            algorithms::inverse_euclidean(next_count, length)
        }
        TransformerKind::Indispensability | TransformerKind::InverseIndispensability => {
            let inverse = spec.kind == TransformerKind::InverseIndispensability;
            if adding {
                indispensability::concentrate(current.steps(), next_count, inverse)
            } else {
                indispensability::dilute(current.steps(), next_count, inverse)
            }
        }
    };

    let next = StepSequence::new(steps)?;
    (next.onset_count() != onsets).then_some(next)
}

/// Owner of every progression's state
#[derive(Debug, Clone)]
pub struct ProgressiveEngine {
    cache: LruCache<ProgressiveKey, ProgressiveState>,
}

impl Default for ProgressiveEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressiveEngine {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn contains(&self, key: &ProgressiveKey) -> bool {
        self.cache.contains(key)
    }

    /// State for `key` without refreshing its recency
    pub fn state(&self, key: &ProgressiveKey) -> Option<&ProgressiveState> {
        self.cache.peek(key)
    }

    fn start(&mut self, key: ProgressiveKey, spec: &ProgressiveSpec) {
        if let Some((evicted, _)) = self.cache.insert(key, ProgressiveState::base(spec)) {
            debug!(base = %evicted.base, target = evicted.target, "evicted progressive state");
        }
    }

    /// Current sequence for `spec`, starting a new progression if needed
    pub fn current(&mut self, spec: &ProgressiveSpec) -> StepSequence {
        let key = ProgressiveKey::from(spec);
        if let Some(state) = self.cache.get(&key) {
            return state.current.clone();
        }
        self.start(key, spec);
        spec.base.clone()
    }

    /// Move one step toward the target.
    ///
    /// Unknown keys start at the base and return it unchanged. Once the
    /// target has been reached (or no further step is possible) the next
    /// call returns to the base.
    pub fn advance(&mut self, spec: &ProgressiveSpec) -> StepSequence {
        let key = ProgressiveKey::from(spec);
        let Some(state) = self.cache.get_mut(&key) else {
            self.start(key, spec);
            return spec.base.clone();
        };

        let next = match state.phase {
            Phase::Cycled => None,
            Phase::Base | Phase::Transforming => transform_step(&state.current, spec),
        };

        match next {
            Some(next) => {
                state.step_index += 1;
                state.phase = if next.onset_count() == spec.target {
                    Phase::Cycled
                } else {
                    Phase::Transforming
                };
                state.current = next;
                trace!(
                    kind = spec.kind.name(),
                    step = state.step_index,
                    current = %state.current,
                    "progressive step"
                );
                state.current.clone()
            }
            None => {
                *state = ProgressiveState::base(spec);
                debug!(kind = spec.kind.name(), base = %spec.base, "progression back to base");
                spec.base.clone()
            }
        }
    }

    /// Advance the descriptor's progression; descriptors without one pass through
    pub fn advance_descriptor(&mut self, descriptor: &PatternDescriptor) -> PatternDescriptor {
        match descriptor.progressive() {
            Some(spec) => descriptor.with_steps(self.advance(spec)),
            None => descriptor.clone(),
        }
    }

    pub fn current_descriptor(&mut self, descriptor: &PatternDescriptor) -> PatternDescriptor {
        match descriptor.progressive() {
            Some(spec) => descriptor.with_steps(self.current(spec)),
            None => descriptor.clone(),
        }
    }

    pub fn step_index(&self, spec: &ProgressiveSpec) -> Option<usize> {
        self.cache
            .peek(&ProgressiveKey::from(spec))
            .map(|s| s.step_index)
    }

    /// Back to the base for `spec`
    pub fn reset(&mut self, spec: &ProgressiveSpec) {
        self.cache.remove(&ProgressiveKey::from(spec));
    }

    /// Replay a persisted progression up to `step_index` and return the result
    pub fn restore(&mut self, spec: &ProgressiveSpec, step_index: usize) -> StepSequence {
        self.reset(spec);
        let mut current = self.current(spec);
        for _ in 0..step_index {
            if self.state(&ProgressiveKey::from(spec)).map(|s| s.phase) == Some(Phase::Cycled) {
                break;
            }
            current = self.advance(spec);
        }
        current
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::from_binary;

    fn spec(base: &str, kind: TransformerKind, target: usize) -> ProgressiveSpec {
        ProgressiveSpec::new(kind, target, from_binary(base).unwrap())
    }

    #[test]
    fn test_first_advance_returns_base() {
        let mut engine = ProgressiveEngine::new();
        let s = spec("10000000", TransformerKind::EvenDistribution, 3);
        assert_eq!(engine.advance(&s).to_string(), "10000000");
        assert_eq!(engine.step_index(&s), Some(0));
    }

    #[test]
    fn test_even_distribution_walks_to_target_and_cycles() {
        let mut engine = ProgressiveEngine::new();
        let s = spec("10000000", TransformerKind::EvenDistribution, 3);
        assert_eq!(engine.current(&s).to_string(), "10000000");
        assert_eq!(engine.advance(&s).to_string(), "10001000");
        assert_eq!(engine.advance(&s).to_string(), "10010010");
        let state = engine.state(&ProgressiveKey::from(&s)).unwrap();
        assert_eq!(state.phase(), Phase::Cycled);
        assert_eq!(state.step_index(), 2);
        assert_eq!(engine.advance(&s).to_string(), "10000000");
        assert_eq!(engine.step_index(&s), Some(0));
    }

    #[test]
    fn test_step_count_matches_onset_distance() {
        let cases = [
            ("10000000", TransformerKind::Indispensability, 8),
            ("11111111", TransformerKind::Indispensability, 1),
            ("10110110", TransformerKind::InverseIndispensability, 0),
            ("10000000", TransformerKind::InverseIndispensability, 6),
            ("1000000000000", TransformerKind::EvenDistribution, 13),
            ("0100100", TransformerKind::InverseEvenDistribution, 6),
        ];
        for (base, kind, target) in cases {
            let mut engine = ProgressiveEngine::new();
            let s = spec(base, kind, target);
            let start = engine.current(&s).onset_count();
            let distance = start.abs_diff(target);
            let mut last = engine.current(&s);
            for i in 1..=distance {
                last = engine.advance(&s);
                assert_eq!(last.onset_count().abs_diff(start), i, "{base} {kind:?}");
            }
            assert_eq!(last.onset_count(), target);
            assert_eq!(engine.advance(&s), s.base, "{base} {kind:?}");
        }
    }

    #[test]
    fn test_protected_downbeat_cycles_early() {
        let mut engine = ProgressiveEngine::new();
        let s = spec("10100000", TransformerKind::Indispensability, 0);
        engine.current(&s);
        assert_eq!(engine.advance(&s).to_string(), "10000000");
        assert_eq!(engine.advance(&s).to_string(), "10100000");
    }

    #[test]
    fn test_hold_stays_on_base() {
        let mut engine = ProgressiveEngine::new();
        let s = spec("10010010", TransformerKind::Indispensability, 3);
        assert_eq!(engine.advance(&s), s.base);
        assert_eq!(engine.advance(&s), s.base);
    }

    #[test]
    fn test_lru_eviction() {
        let mut engine = ProgressiveEngine::with_capacity(DEFAULT_CACHE_CAPACITY);
        let specs: Vec<_> = (1..=DEFAULT_CACHE_CAPACITY + 1)
            .map(|t| {
                let base = StepSequence::new(vec![false; 128]).unwrap();
                ProgressiveSpec::new(TransformerKind::EvenDistribution, t, base)
            })
            .collect();
        for s in &specs[..DEFAULT_CACHE_CAPACITY] {
            engine.advance(s);
        }
        // Touch the oldest so the second becomes the victim
        engine.advance(&specs[0]);
        engine.advance(&specs[DEFAULT_CACHE_CAPACITY]);
        assert_eq!(engine.len(), DEFAULT_CACHE_CAPACITY);
        assert!(engine.contains(&ProgressiveKey::from(&specs[0])));
        assert!(!engine.contains(&ProgressiveKey::from(&specs[1])));
    }

    #[test]
    fn test_restore_replays() {
        let mut engine = ProgressiveEngine::new();
        let s = spec("10000000", TransformerKind::Indispensability, 5);
        engine.current(&s);
        engine.advance(&s);
        let expected = engine.advance(&s);

        let mut fresh = ProgressiveEngine::new();
        assert_eq!(fresh.restore(&s, 2), expected);
        assert_eq!(fresh.step_index(&s), Some(2));
    }

    #[test]
    fn test_advance_descriptor() {
        let mut engine = ProgressiveEngine::new();
        let d = crate::parse("{10}E(1,8)E>3").unwrap();
        assert_eq!(engine.current_descriptor(&d).steps().to_string(), "10000000");
        let next = engine.advance_descriptor(&d);
        assert_eq!(next.steps().to_string(), "10001000");
        assert_eq!(next.accents(), d.accents());

        let plain = crate::parse("E(3,8)").unwrap();
        assert_eq!(engine.advance_descriptor(&plain), plain);
    }
}
