//! Control-context engine: parses notation, owns progressive and scene state,
//! and publishes playback snapshots for the dispatch side.

use std::sync::Arc;

use arc_swap::ArcSwap;
use cadence_core::{
    AccentPlan, AccentSynchronizer, DisplayMode, ParseError, PatternDescriptor, PersistedProgress,
    PersistedState, PersistedSuspension, ProgressiveEngine, ProgressiveKey, SceneCycle,
    StepSequence,
};
use crossbeam_channel::{Receiver, Sender, bounded};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dispatch::{AccentSource, DispatchEvent, DispatchHandle, PlaybackSnapshot};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Saved state does not match the pattern: {0}")]
    StateMismatch(String),
}

pub struct PatternEngine {
    config: EngineConfig,
    source: String,
    scenes: SceneCycle,
    progressive: ProgressiveEngine,
    synchronizer: AccentSynchronizer,
    /// Current scene after progression, offset and lengthening
    active: PatternDescriptor,
    snapshot: Arc<ArcSwap<PlaybackSnapshot>>,
    generation: u64,
    events_tx: Sender<DispatchEvent>,
    events_rx: Receiver<DispatchEvent>,
    rng: fastrand::Rng,
}

impl PatternEngine {
    pub fn new(config: EngineConfig, text: &str) -> Result<Self, EngineError> {
        let scenes = SceneCycle::parse(text)?;
        let mut progressive = ProgressiveEngine::with_capacity(config.progressive_cache_capacity);
        let active = resolve(&scenes, &mut progressive);
        let synchronizer = AccentSynchronizer::new();
        let snapshot = Arc::new(ArcSwap::from_pointee(PlaybackSnapshot::new(
            0,
            synchronizer.epoch(),
            active.steps().clone(),
            AccentSource::Notation(AccentPlan::from_descriptor(&active)),
        )));
        let (events_tx, events_rx) = bounded(config.event_queue_capacity.max(1));
        let rng = fastrand::Rng::with_seed(config.random_seed);

        info!(source = text.trim(), scenes = scenes.len(), "Pattern engine created");

        Ok(Self {
            config,
            source: text.to_string(),
            scenes,
            progressive,
            synchronizer,
            active,
            snapshot,
            generation: 0,
            events_tx,
            events_rx,
            rng,
        })
    }

    pub fn with_defaults(text: &str) -> Result<Self, EngineError> {
        Self::new(EngineConfig::default(), text)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Pattern currently playing in notation-driven mode
    pub fn descriptor(&self) -> &PatternDescriptor {
        &self.active
    }

    pub fn scenes(&self) -> &SceneCycle {
        &self.scenes
    }

    pub fn progressive(&self) -> &ProgressiveEngine {
        &self.progressive
    }

    /// Snapshot the dispatch side is reading right now
    pub fn snapshot(&self) -> Arc<PlaybackSnapshot> {
        self.snapshot.load_full()
    }

    pub fn dispatch_handle(&self) -> DispatchHandle {
        DispatchHandle::new(
            Arc::clone(&self.snapshot),
            Arc::clone(self.synchronizer.sync()),
            self.events_tx.clone(),
        )
    }

    /// Reparse `text`.
    ///
    /// On error the previous pattern keeps playing. Progressions already in
    /// the cache resume where they were.
    pub fn load(&mut self, text: &str) -> Result<(), EngineError> {
        let scenes = match SceneCycle::parse(text) {
            Ok(scenes) => scenes,
            Err(err) => {
                warn!(source = text.trim(), %err, "Keeping previous pattern");
                return Err(err.into());
            }
        };
        self.source = text.to_string();
        self.scenes = scenes;
        self.synchronizer.reset();
        self.refresh_active();
        self.publish();
        info!(source = text.trim(), steps = %self.active.steps(), "Pattern loaded");
        Ok(())
    }

    /// One progressive step of the current scene (transformation, offset
    /// and lengthening), with counters reset
    pub fn advance_progressive(&mut self) -> PatternDescriptor {
        if let Some(spec) = self.scenes.current().descriptor().progressive() {
            self.progressive.advance(spec);
        }
        self.scenes.current_mut().bump(&mut self.rng);
        self.synchronizer.reset();
        self.refresh_active();
        self.publish();
        info!(steps = %self.active.steps(), "Progressive advance");
        self.active.clone()
    }

    /// Accumulate the current scene's suffixes and move to the next scene
    pub fn advance_scene(&mut self) -> PatternDescriptor {
        self.scenes.advance(&mut self.rng);
        self.synchronizer.reset();
        self.refresh_active();
        self.publish();
        info!(
            index = self.scenes.index(),
            steps = %self.active.steps(),
            "Scene advance"
        );
        self.active.clone()
    }

    /// Restart accent counting from the first onset
    pub fn retrigger(&mut self) {
        self.synchronizer.reset_counters();
        self.publish();
        debug!("Retriggered");
    }

    pub fn accent_map_for_display(&self) -> Vec<bool> {
        self.synchronizer
            .display_map(self.active.steps(), &AccentPlan::from_descriptor(&self.active))
    }

    pub fn is_suspended(&self) -> bool {
        self.synchronizer.is_suspended()
    }

    /// Freeze display and playback on a manually edited sequence.
    ///
    /// Without `edited_accents` the accent map currently shown is kept.
    pub fn enter_suspension(&mut self, edited: StepSequence, edited_accents: Option<Vec<bool>>) {
        let accent_map = edited_accents.unwrap_or_else(|| self.accent_map_for_display());
        self.synchronizer.suspend(edited, accent_map);
        self.publish();
        info!("Manual edit suspended notation accents");
    }

    /// Returns whether a suspension ended
    pub fn exit_suspension(&mut self) -> bool {
        let resumed = self.synchronizer.resume();
        if resumed {
            self.publish();
            info!("Notation accents resumed");
        }
        resumed
    }

    /// Consume cycle-wrap events sent from the dispatch side
    pub fn drain_cycle_events(&mut self) -> usize {
        let count = self.events_rx.try_iter().count();
        if count >= self.config.event_queue_capacity {
            warn!(count, "Cycle event queue was full; some wraps were dropped");
        } else if count > 0 {
            debug!(count, "Drained cycle events");
        }
        count
    }

    pub fn save_state(&self) -> PersistedState {
        let progress = self
            .scenes
            .current()
            .descriptor()
            .progressive()
            .and_then(|spec| {
                self.progressive.step_index(spec).map(|step_index| PersistedProgress {
                    key: ProgressiveKey::from(spec),
                    step_index,
                })
            });
        let suspension = match self.synchronizer.mode() {
            DisplayMode::ManuallySuspended { steps, accent_map } => Some(PersistedSuspension {
                steps: steps.clone(),
                accent_map: accent_map.clone(),
            }),
            DisplayMode::NotationDriven => None,
        };
        PersistedState {
            source: self.source.clone(),
            scene_index: self.scenes.index(),
            scene_offsets: self.scenes.offsets(),
            progress,
            accents: self.active.accents().cloned(),
            suspension,
        }
    }

    /// Resume from a saved state. Nothing changes if it does not fit the
    /// saved source.
    pub fn restore_state(&mut self, state: &PersistedState) -> Result<(), EngineError> {
        let mut scenes = SceneCycle::parse(&state.source)?;
        let positioned = state.scene_offsets.is_empty() && state.scene_index == 0;
        if !positioned && !scenes.restore(state.scene_index, &state.scene_offsets) {
            return Err(EngineError::StateMismatch(format!(
                "scene {} of {} offsets for {} scenes",
                state.scene_index,
                state.scene_offsets.len(),
                scenes.len()
            )));
        }

        let spec = scenes.current().descriptor().progressive().cloned();
        if let Some(progress) = &state.progress {
            match &spec {
                Some(spec) if ProgressiveKey::from(spec) == progress.key => {}
                _ => {
                    return Err(EngineError::StateMismatch(
                        "progression key differs from the current scene".into(),
                    ));
                }
            }
        }

        let accents = scenes.current().descriptor().accents();
        if state.accents.is_some() && state.accents.as_ref() != accents {
            warn!("Saved accent pattern differs from notation; using notation");
        }

        if let (Some(spec), Some(progress)) = (&spec, &state.progress) {
            self.progressive.restore(spec, progress.step_index);
        }
        self.source = state.source.clone();
        self.scenes = scenes;
        self.synchronizer.reset();
        if let Some(suspension) = &state.suspension {
            self.synchronizer
                .suspend(suspension.steps.clone(), suspension.accent_map.clone());
        }
        self.refresh_active();
        self.publish();
        info!(source = state.source.trim(), "State restored");
        Ok(())
    }

    fn refresh_active(&mut self) {
        self.active = resolve(&self.scenes, &mut self.progressive);
    }

    /// Counter resets must happen before this so the snapshot carries the
    /// new epoch
    fn publish(&mut self) {
        self.generation += 1;
        let snapshot = match self.synchronizer.mode() {
            DisplayMode::ManuallySuspended { steps, accent_map } => PlaybackSnapshot::new(
                self.generation,
                self.synchronizer.epoch(),
                steps.clone(),
                AccentSource::Frozen(accent_map.clone()),
            ),
            DisplayMode::NotationDriven => PlaybackSnapshot::new(
                self.generation,
                self.synchronizer.epoch(),
                self.active.steps().clone(),
                AccentSource::Notation(AccentPlan::from_descriptor(&self.active)),
            ),
        };
        self.snapshot.store(Arc::new(snapshot));
        debug!(generation = self.generation, "Published snapshot");
    }
}

/// Current scene with its progression, offset and lengthening applied
fn resolve(scenes: &SceneCycle, progressive: &mut ProgressiveEngine) -> PatternDescriptor {
    let scene = scenes.current();
    let descriptor = scene.descriptor();
    let steps = match descriptor.progressive() {
        Some(spec) => progressive.current(spec),
        None => descriptor.steps().clone(),
    };
    descriptor.with_steps(scene.apply(&steps))
}
