//! Dispatch-context view of the engine
//!
//! Everything reachable from [`DispatchHandle`] is wait-free: the pattern is
//! read through an `ArcSwap` guard, the counters are one atomic word, and
//! events go out with `try_send`. Nothing here parses, locks or logs.

use std::sync::Arc;

use arc_swap::ArcSwap;
use cadence_core::{AccentPlan, StepSequence, SyncState};
use crossbeam_channel::Sender;

/// Where accents come from while a snapshot is live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccentSource {
    /// Accent pattern indexed by the running onset counter
    Notation(AccentPlan),
    /// Step-indexed map frozen by a manual edit
    Frozen(Vec<bool>),
}

/// Immutable pattern data published by the control context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    generation: u64,
    epoch: u16,
    steps: StepSequence,
    accents: AccentSource,
}

impl PlaybackSnapshot {
    pub fn new(generation: u64, epoch: u16, steps: StepSequence, accents: AccentSource) -> Self {
        Self {
            generation,
            epoch,
            steps,
            accents,
        }
    }

    /// Bumped on every publish
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Counter epoch this snapshot was published under
    pub fn epoch(&self) -> u16 {
        self.epoch
    }

    pub fn steps(&self) -> &StepSequence {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn accents(&self) -> &AccentSource {
        &self.accents
    }

    /// Accent length driving the stable offset; zero when frozen
    pub fn accent_len(&self) -> usize {
        match &self.accents {
            AccentSource::Notation(plan) => plan.accent_len(),
            AccentSource::Frozen(_) => 0,
        }
    }

    pub fn is_accented(&self, step: usize, onset_index: u32) -> bool {
        match &self.accents {
            AccentSource::Notation(plan) => plan.is_accented(onset_index as usize),
            AccentSource::Frozen(map) => map
                .get(step % self.steps.len())
                .copied()
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEvent {
    /// The rhythm wrapped to step 0; the stable offset may have moved
    CycleWrapped { generation: u64, onset_counter: u32 },
}

/// Result of dispatching one onset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnsetDecision {
    /// Running onset index this onset was dispatched at
    pub onset_index: u32,
    pub accented: bool,
}

/// Cloneable handle for the real-time side
#[derive(Clone)]
pub struct DispatchHandle {
    snapshot: Arc<ArcSwap<PlaybackSnapshot>>,
    sync: Arc<SyncState>,
    events: Sender<DispatchEvent>,
}

impl DispatchHandle {
    pub(crate) fn new(
        snapshot: Arc<ArcSwap<PlaybackSnapshot>>,
        sync: Arc<SyncState>,
        events: Sender<DispatchEvent>,
    ) -> Self {
        Self {
            snapshot,
            sync,
            events,
        }
    }

    pub fn step_count(&self) -> usize {
        self.snapshot.load().step_count()
    }

    pub fn is_onset(&self, step: usize) -> bool {
        self.snapshot.load().steps().is_onset(step)
    }

    pub fn sync(&self) -> &SyncState {
        &self.sync
    }

    /// Count an onset fired at `step` and decide its accent
    pub fn on_onset_dispatched(&self, step: usize) -> OnsetDecision {
        self.onset_at(&self.snapshot.load(), step)
    }

    /// The rhythm wrapped back to its first step.
    ///
    /// Call before dispatching that step's onset.
    pub fn on_cycle_boundary(&self) {
        self.boundary_at(&self.snapshot.load());
    }

    /// Handle a transport step: boundary bookkeeping on step 0, then the
    /// onset (if the step has one). Reads the snapshot once.
    pub fn process_step(&self, step: usize) -> Option<OnsetDecision> {
        let snapshot = self.snapshot.load();
        if step % snapshot.step_count() == 0 {
            self.boundary_at(&snapshot);
        }
        snapshot
            .steps()
            .is_onset(step)
            .then(|| self.onset_at(&snapshot, step))
    }

    pub(crate) fn onset_at(&self, snapshot: &PlaybackSnapshot, step: usize) -> OnsetDecision {
        let onset_index = self.sync.on_onset_dispatched(snapshot.epoch());
        OnsetDecision {
            onset_index,
            accented: snapshot.is_accented(step, onset_index),
        }
    }

    pub(crate) fn boundary_at(&self, snapshot: &PlaybackSnapshot) {
        let onset_counter = self
            .sync
            .on_cycle_boundary(snapshot.accent_len(), snapshot.epoch());
        let _ = self.events.try_send(DispatchEvent::CycleWrapped {
            generation: snapshot.generation(),
            onset_counter,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::convert::from_binary;
    use crossbeam_channel::{Receiver, bounded};

    fn notation(rhythm: &str, accents: Option<&str>, epoch: u16) -> PlaybackSnapshot {
        let steps = from_binary(rhythm).unwrap();
        let accents = accents.map(|a| from_binary(a).unwrap());
        let plan = AccentPlan::new(&steps, accents.as_ref());
        PlaybackSnapshot::new(1, epoch, steps, AccentSource::Notation(plan))
    }

    fn handle(rhythm: &str, accents: Option<&str>) -> (DispatchHandle, Receiver<DispatchEvent>) {
        let (tx, rx) = bounded(2);
        let handle = DispatchHandle::new(
            Arc::new(ArcSwap::from_pointee(notation(rhythm, accents, 0))),
            Arc::new(SyncState::new()),
            tx,
        );
        (handle, rx)
    }

    #[test]
    fn test_process_step_counts_onsets() {
        let (handle, _rx) = handle("10110110", Some("10"));
        let accented: Vec<bool> = (0..8)
            .filter_map(|step| handle.process_step(step))
            .map(|d| d.accented)
            .collect();
        assert_eq!(accented, vec![true, false, true, false, true]);
        assert_eq!(handle.sync().onset_counter(), 5);

        // Second cycle starts on an odd onset
        let first = handle.process_step(8).unwrap();
        assert_eq!(first.onset_index, 5);
        assert!(!first.accented);
        assert_eq!(handle.sync().stable_offset(), 1);
    }

    #[test]
    fn test_events_never_block() {
        let (handle, rx) = handle("1", Some("1"));
        for step in 0..10 {
            handle.process_step(step);
        }
        // Queue holds two; the rest were dropped
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_frozen_accents_are_step_indexed() {
        let steps = from_binary("1111").unwrap();
        let frozen = AccentSource::Frozen(vec![false, true, false, true]);
        let snapshot = PlaybackSnapshot::new(3, 0, steps, frozen);
        assert_eq!(snapshot.accent_len(), 0);
        assert!(snapshot.is_accented(5, 0));
        assert!(!snapshot.is_accented(4, 1));
    }
    #[test]
    fn test_cycle_event_reports_counter() {
        let (handle, rx) = handle("101", Some("10"));
        for step in 0..4 {
            handle.process_step(step);
        }
        let events: Vec<DispatchEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                DispatchEvent::CycleWrapped { generation: 1, onset_counter: 0 },
                DispatchEvent::CycleWrapped { generation: 1, onset_counter: 2 },
            ]
        );
    }

    #[test]
    fn test_stale_snapshot_does_not_leak_into_reset() {
        let (handle, _rx) = handle("10110110", Some("10"));
        for step in 0..3 {
            handle.process_step(step);
        }
        // Dispatch loads its guard, then the control side resets and publishes
        let stale = handle.snapshot.load_full();
        handle.sync().reset_to(1);
        let late = handle.onset_at(&stale, 3);
        assert_eq!(late.onset_index, 0);
        handle.snapshot.store(Arc::new(notation("10110110", Some("10"), 1)));

        let first = handle.process_step(0).unwrap();
        assert_eq!(first.onset_index, 0);
        assert!(first.accented);
        assert_eq!(handle.sync().onset_counter(), 1);
        assert_eq!(handle.sync().epoch(), 1);
    }
}
