//! Accent synchronization between the dispatch and display paths
//!
//! One onset counter is the source of truth. The dispatch path reads it as
//! each onset fires; the display path only sees the stable offset, which is
//! refreshed from the counter when the rhythm cycle wraps. Both values live
//! in a single atomic word, tagged with a reset epoch, so a reset clears
//! them together.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combine::lcm;
use crate::descriptor::PatternDescriptor;
use crate::sequence::StepSequence;

// ============================================================================
// Synchronization state
// ============================================================================

const COUNTER_SHIFT: u32 = 32;
const EPOCH_SHIFT: u32 = 16;
const FIELD_MASK: u64 = 0xFFFF;

fn pack(counter: u32, epoch: u16, offset: u16) -> u64 {
    ((counter as u64) << COUNTER_SHIFT) | ((epoch as u64) << EPOCH_SHIFT) | offset as u64
}

fn unpack(word: u64) -> (u32, u16, u16) {
    (
        (word >> COUNTER_SHIFT) as u32,
        ((word >> EPOCH_SHIFT) & FIELD_MASK) as u16,
        (word & FIELD_MASK) as u16,
    )
}

/// Counter and offset as seen from `epoch`; both are zero if the word was
/// reset to a different epoch.
fn seen_from(word: u64, epoch: u16) -> (u32, u16) {
    match unpack(word) {
        (counter, e, offset) if e == epoch => (counter, offset),
        _ => (0, 0),
    }
}

/// Onset counter, reset epoch and stable offset in one word.
///
/// The counter occupies the high 32 bits and wraps after 2^32 onsets. Every
/// reset moves to a new epoch; dispatch calls carry the epoch of the
/// snapshot they read, and a call from another epoch counts from zero in
/// the epoch it names. A late call from a stale snapshot therefore cannot
/// leak its count into the pattern that replaced it.
#[derive(Debug, Default)]
pub struct SyncState {
    word: AtomicU64,
}

impl SyncState {
    pub const fn new() -> Self {
        Self {
            word: AtomicU64::new(0),
        }
    }

    /// Apply `f` with a compare-exchange loop; returns the previous word
    fn update(&self, f: impl Fn(u64) -> u64) -> u64 {
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            match self.word.compare_exchange_weak(
                current,
                f(current),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(previous) => return previous,
                Err(actual) => current = actual,
            }
        }
    }

    /// `(onset_counter, stable_offset)` read together
    pub fn snapshot(&self) -> (u32, u32) {
        let (counter, _, offset) = unpack(self.word.load(Ordering::Acquire));
        (counter, offset as u32)
    }

    pub fn onset_counter(&self) -> u32 {
        self.snapshot().0
    }

    pub fn stable_offset(&self) -> u32 {
        self.snapshot().1
    }

    /// Epoch of the last reset
    pub fn epoch(&self) -> u16 {
        unpack(self.word.load(Ordering::Acquire)).1
    }

    /// Stable offset if the word is still in `epoch`, zero otherwise
    pub fn stable_offset_at(&self, epoch: u16) -> u32 {
        seen_from(self.word.load(Ordering::Acquire), epoch).1 as u32
    }

    /// Count one onset dispatched from `epoch`; returns the index it was
    /// dispatched at
    pub fn on_onset_dispatched(&self, epoch: u16) -> u32 {
        let previous = self.update(|word| {
            let (counter, offset) = seen_from(word, epoch);
            pack(counter.wrapping_add(1), epoch, offset)
        });
        seen_from(previous, epoch).0
    }

    /// Snapshot `counter mod accent_len` into the stable offset.
    ///
    /// Call when the rhythm wraps to its first step, before that step's
    /// onset is dispatched. Without an accent pattern (`accent_len == 0`)
    /// the offset keeps its value. Returns the onset counter it read.
    pub fn on_cycle_boundary(&self, accent_len: usize, epoch: u16) -> u32 {
        let previous = self.update(|word| {
            let (counter, offset) = seen_from(word, epoch);
            let offset = match accent_len {
                0 => offset,
                len => (counter as u64 % len as u64) as u16,
            };
            pack(counter, epoch, offset)
        });
        seen_from(previous, epoch).0
    }

    /// Zero counter and offset and enter `epoch`, in one store
    pub fn reset_to(&self, epoch: u16) {
        self.word.store(pack(0, epoch, 0), Ordering::Release);
    }
}

// ============================================================================
// Accent decisions
// ============================================================================

/// Accent pattern paired with the onset count of the rhythm it decorates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccentPlan {
    accents: Option<StepSequence>,
    onset_count: usize,
}

impl AccentPlan {
    pub fn new(rhythm: &StepSequence, accents: Option<&StepSequence>) -> Self {
        Self {
            accents: accents.cloned(),
            onset_count: rhythm.onset_count(),
        }
    }

    pub fn from_descriptor(descriptor: &PatternDescriptor) -> Self {
        Self::new(descriptor.steps(), descriptor.accents())
    }

    pub fn accents(&self) -> Option<&StepSequence> {
        self.accents.as_ref()
    }

    /// Length of the accent pattern, zero without one
    pub fn accent_len(&self) -> usize {
        self.accents.as_ref().map_or(0, |a| a.len())
    }

    /// Whether the onset with this running index is accented.
    ///
    /// False without accents, and false for every index when the rhythm has
    /// no onsets.
    pub fn is_accented(&self, onset_index: usize) -> bool {
        if self.onset_count == 0 {
            return false;
        }
        match &self.accents {
            Some(accents) => accents.steps()[onset_index % accents.len()],
            None => false,
        }
    }

    /// Onsets until accent and rhythm line up again
    pub fn cycle_onsets(&self) -> Option<usize> {
        if self.onset_count == 0 || self.accent_len() == 0 {
            return None;
        }
        Some(lcm(self.onset_count, self.accent_len()))
    }

    /// Steps until accent and rhythm line up again
    pub fn cycle_steps(&self, step_count: usize) -> Option<usize> {
        self.cycle_onsets()
            .map(|onsets| onsets / self.onset_count * step_count)
    }
}

/// Per-step accent map for one rhythm cycle, starting at onset `first_onset`
pub fn accent_map(rhythm: &StepSequence, plan: &AccentPlan, first_onset: usize) -> Vec<bool> {
    let mut ordinal = 0;
    rhythm
        .steps()
        .iter()
        .map(|&onset| {
            if !onset {
                return false;
            }
            let accented = plan.is_accented(first_onset + ordinal);
            ordinal += 1;
            accented
        })
        .collect()
}

/// Accent maps for every rhythm cycle of the full accent period
pub fn accent_table(rhythm: &StepSequence, plan: &AccentPlan) -> Vec<Vec<bool>> {
    let Some(cycle_steps) = plan.cycle_steps(rhythm.len()) else {
        return vec![vec![false; rhythm.len()]];
    };
    let cycles = cycle_steps / rhythm.len();
    let onsets = rhythm.onset_count();
    (0..cycles)
        .map(|cycle| accent_map(rhythm, plan, cycle * onsets))
        .collect()
}

// ============================================================================
// Display mode
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    /// Accents follow the notation and the stable offset
    NotationDriven,
    /// A manual edit froze the shown sequence and accent map
    ManuallySuspended {
        steps: StepSequence,
        accent_map: Vec<bool>,
    },
}

/// Shared counters plus the display-side suspension state machine
#[derive(Debug)]
pub struct AccentSynchronizer {
    sync: Arc<SyncState>,
    epoch: u16,
    mode: DisplayMode,
}

impl Default for AccentSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccentSynchronizer {
    pub fn new() -> Self {
        Self {
            sync: Arc::new(SyncState::new()),
            epoch: 0,
            mode: DisplayMode::NotationDriven,
        }
    }

    /// Counters to hand to the dispatch context
    pub fn sync(&self) -> &Arc<SyncState> {
        &self.sync
    }

    /// Epoch that snapshots published after the last reset must carry
    pub fn epoch(&self) -> u16 {
        self.epoch
    }

    pub fn mode(&self) -> &DisplayMode {
        &self.mode
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.mode, DisplayMode::ManuallySuspended { .. })
    }

    /// Freeze the display on a manually edited sequence.
    ///
    /// The accent map is padded or truncated to the sequence length.
    pub fn suspend(&mut self, steps: StepSequence, mut accent_map: Vec<bool>) {
        accent_map.resize(steps.len(), false);
        debug!(steps = %steps, "accent display suspended");
        self.mode = DisplayMode::ManuallySuspended { steps, accent_map };
    }

    /// Back to notation-driven accents; returns whether a suspension ended
    pub fn resume(&mut self) -> bool {
        let was_suspended = self.is_suspended();
        if was_suspended {
            debug!("accent display resumed");
        }
        self.mode = DisplayMode::NotationDriven;
        was_suspended
    }

    /// Zero both counters under a fresh epoch, leaving any suspension.
    ///
    /// Publish the next snapshot with [`Self::epoch`] so dispatch calls made
    /// through older snapshots are told apart.
    pub fn reset_counters(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.sync.reset_to(self.epoch);
        debug!(epoch = self.epoch, "accent counters reset");
    }

    /// Reparse and explicit advances: end any suspension and zero both
    /// counters.
    pub fn reset(&mut self) {
        self.resume();
        self.reset_counters();
    }

    /// What the display should show for `rhythm` right now.
    ///
    /// Never reads the live onset counter.
    pub fn display_map(&self, rhythm: &StepSequence, plan: &AccentPlan) -> Vec<bool> {
        match &self.mode {
            DisplayMode::ManuallySuspended { accent_map, .. } => accent_map.clone(),
            DisplayMode::NotationDriven => {
                accent_map(rhythm, plan, self.sync.stable_offset_at(self.epoch) as usize)
            }
        }
    }
}
