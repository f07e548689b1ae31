//! Configuration for the Vitalis viewer.
//!
//! Settings persist to disk as `config.ron`. Every section carries `#[serde(default)]`
//! so older or partial files keep loading, and CLI flags parsed with clap override the
//! file at startup.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{AnimationConfig, BudgetConfig, Config, DebugConfig, LodConfig, MemoryConfig};
pub use error::ConfigError;
