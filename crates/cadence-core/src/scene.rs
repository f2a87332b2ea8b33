//! Scene lists (`A|B|C`) with per-scene progressive offset and lengthening

use tracing::debug;

use crate::algorithms;
use crate::descriptor::PatternDescriptor;
use crate::error::Result;
use crate::notation::parse_scenes;
use crate::sequence::{MAX_STEPS, StepSequence};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    descriptor: PatternDescriptor,
    offset: i64,
    extension: Vec<bool>,
}

impl Scene {
    pub fn new(descriptor: PatternDescriptor) -> Self {
        Self {
            descriptor,
            offset: 0,
            extension: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &PatternDescriptor {
        &self.descriptor
    }

    /// Rotation accumulated from `+N` so far, kept within the step count
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Steps appended by `*N` so far
    pub fn extension(&self) -> &[bool] {
        &self.extension
    }

    /// Apply this scene's accumulated offset and lengthening to `steps`
    pub fn apply(&self, steps: &StepSequence) -> StepSequence {
        let mut out = algorithms::rotate(steps.steps(), self.offset);
        out.extend_from_slice(&self.extension);
        StepSequence::new(out).unwrap_or_else(|| steps.clone())
    }

    /// One progressive advance of the offset and lengthening suffixes.
    ///
    /// Lengthening that would pass the step limit starts over from the
    /// unextended pattern.
    pub fn bump(&mut self, rng: &mut fastrand::Rng) {
        let base = self.descriptor.step_count();
        if let Some(step) = self.descriptor.rotation_step() {
            let len = base as i64;
            self.offset = (self.offset.rem_euclid(len) + step.rem_euclid(len)) % len;
        }
        if let Some(extra) = self.descriptor.lengthening() {
            if (base + self.extension.len()).saturating_add(extra) > MAX_STEPS {
                debug!(scene = self.descriptor.source(), "lengthening wrapped");
                self.extension.clear();
            } else {
                let onsets = algorithms::bell_curve_onsets(extra, rng).min(extra);
                self.extension
                    .extend(algorithms::random(onsets, extra, rng.u64(..)));
            }
        }
    }

    pub(crate) fn set_offset(&mut self, offset: i64) {
        self.offset = offset.rem_euclid(self.descriptor.step_count() as i64);
    }

    pub(crate) fn clear_extension(&mut self) {
        self.extension.clear();
    }
}

/// Non-empty, cyclic list of scenes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneCycle {
    scenes: Vec<Scene>,
    index: usize,
}

impl SceneCycle {
    /// Parse `text` as one or more `|`-separated scenes
    pub fn parse(text: &str) -> Result<Self> {
        let scenes = parse_scenes(text)?.into_iter().map(Scene::new).collect();
        Ok(Self { scenes, index: 0 })
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn current(&self) -> &Scene {
        &self.scenes[self.index]
    }

    pub fn current_mut(&mut self) -> &mut Scene {
        &mut self.scenes[self.index]
    }

    /// Bump the current scene's suffixes, then move to the next scene
    pub fn advance(&mut self, rng: &mut fastrand::Rng) -> &Scene {
        self.scenes[self.index].bump(rng);
        self.index = (self.index + 1) % self.scenes.len();
        debug!(index = self.index, count = self.scenes.len(), "scene advanced");
        &self.scenes[self.index]
    }

    pub fn offsets(&self) -> Vec<i64> {
        self.scenes.iter().map(|s| s.offset).collect()
    }

    /// Reinstate a persisted position; returns false if it does not fit
    pub fn restore(&mut self, index: usize, offsets: &[i64]) -> bool {
        if index >= self.scenes.len() || offsets.len() != self.scenes.len() {
            return false;
        }
        self.index = index;
        for (scene, &offset) in self.scenes.iter_mut().zip(offsets) {
            scene.set_offset(offset);
            scene.clear_extension();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_wraps_and_bumps_offsets() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut cycle = SceneCycle::parse("E(3,8)+1|B(5,12)+2").unwrap();
        assert_eq!(cycle.len(), 2);
        assert_eq!(cycle.index(), 0);

        cycle.advance(&mut rng);
        assert_eq!(cycle.index(), 1);
        cycle.advance(&mut rng);
        assert_eq!(cycle.index(), 0);
        assert_eq!(cycle.offsets(), vec![1, 2]);

        let scene = cycle.current();
        let shown = scene.apply(scene.descriptor().steps());
        assert_eq!(shown.to_string(), "00100101");
    }

    #[test]
    fn test_lengthening_grows_then_wraps() {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut cycle = SceneCycle::parse("E(3,8)*20").unwrap();
        cycle.current_mut().bump(&mut rng);
        assert_eq!(cycle.current().extension().len(), 20);
        cycle.current_mut().bump(&mut rng);
        assert_eq!(cycle.current().extension().len(), 40);
        let scene = cycle.current();
        assert_eq!(scene.apply(scene.descriptor().steps()).len(), 48);
        // 8 + 40 + 20 passes 64
        cycle.current_mut().bump(&mut rng);
        assert!(cycle.current().extension().is_empty());
    }

    #[test]
    fn test_restore_validates_shape() {
        let mut cycle = SceneCycle::parse("E(3,8)|E(5,8)|tresillo").unwrap();
        assert!(!cycle.restore(3, &[0, 0, 0]));
        assert!(!cycle.restore(0, &[0, 0]));
        assert!(cycle.restore(2, &[1, -1, 4]));
        assert_eq!(cycle.index(), 2);
        assert_eq!(cycle.current().offset(), 4);
        assert_eq!(cycle.scenes()[1].offset(), 7);
    }

    #[test]
    fn test_huge_offset_stays_bounded() {
        let mut rng = fastrand::Rng::with_seed(5);
        let mut cycle = SceneCycle::parse("E(3,8)+9223372036854775807").unwrap();
        // i64::MAX is 7 mod 8
        cycle.current_mut().bump(&mut rng);
        assert_eq!(cycle.current().offset(), 7);
        cycle.current_mut().bump(&mut rng);
        assert_eq!(cycle.current().offset(), 6);
        for _ in 0..100 {
            cycle.advance(&mut rng);
        }
        assert!((0..8).contains(&cycle.current().offset()));
        let scene = cycle.current();
        assert_eq!(scene.apply(scene.descriptor().steps()).len(), 8);

        let mut negative = SceneCycle::parse("E(3,8)+-3").unwrap();
        negative.current_mut().bump(&mut rng);
        assert_eq!(negative.current().offset(), 5);
        let scene = negative.current();
        assert_eq!(scene.apply(scene.descriptor().steps()).to_string(), "01010010");
    }

    #[test]
    fn test_huge_lengthening_wraps_instead_of_overflowing() {
        let mut rng = fastrand::Rng::with_seed(9);
        let mut cycle = SceneCycle::parse("E(3,8)*18446744073709551615").unwrap();
        cycle.current_mut().bump(&mut rng);
        assert!(cycle.current().extension().is_empty());
    }
}
