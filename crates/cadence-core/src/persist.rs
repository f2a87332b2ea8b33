//! Shape of the state a host stores between sessions

use serde::{Deserialize, Serialize};

use crate::progressive::ProgressiveKey;
use crate::sequence::StepSequence;

/// Progress of the active progression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedProgress {
    pub key: ProgressiveKey,
    pub step_index: usize,
}

/// Frozen display from a manual edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSuspension {
    pub steps: StepSequence,
    pub accent_map: Vec<bool>,
}

/// Everything needed to resume a pattern where it was left
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    /// Notation text, scenes included
    pub source: String,
    #[serde(default)]
    pub scene_index: usize,
    #[serde(default)]
    pub scene_offsets: Vec<i64>,
    #[serde(default)]
    pub progress: Option<PersistedProgress>,
    #[serde(default)]
    pub accents: Option<StepSequence>,
    #[serde(default)]
    pub suspension: Option<PersistedSuspension>,
}

impl PersistedState {
    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }
}
