//! cadence-core: Pattern notation, rhythm generators and accent synchronization

pub mod accent;
pub mod algorithms;
pub mod combine;
pub mod convert;
mod descriptor;
mod error;
pub mod indispensability;
pub mod lru;
pub mod notation;
mod persist;
pub mod progressive;
pub mod scene;
mod sequence;

pub use accent::{AccentPlan, AccentSynchronizer, DisplayMode, SyncState};
pub use combine::CombineOp;
pub use convert::Format;
pub use descriptor::{Direction, PatternDescriptor, ProgressiveSpec, TransformerKind};
pub use error::{ConvertError, ParseError, ParseWarning, Result};
pub use notation::{parse, parse_scenes};
pub use persist::{PersistedProgress, PersistedState, PersistedSuspension};
pub use progressive::{ProgressiveEngine, ProgressiveKey, ProgressiveState};
pub use scene::{Scene, SceneCycle};
pub use sequence::{MAX_STEPS, StepSequence};
