//! cadence-services: Pattern engine, dispatch handle, config and logging

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod logging;

pub use config::{ConfigError, EngineConfig, config_path, load_config, save_config};
pub use dispatch::{
    AccentSource, DispatchEvent, DispatchHandle, OnsetDecision, PlaybackSnapshot,
};
pub use engine::{EngineError, PatternEngine};
pub use logging::{LoggingError, init_logging};
