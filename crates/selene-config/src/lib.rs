//! Runtime settings for the Selene LOD engine.
//!
//! Settings persist to disk as RON, tolerate missing and unknown fields, and
//! can be overridden from the command line.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{BodyConfig, CameraConfig, Config, DebugConfig, LodConfig, WindowConfig, default_config_dir};
pub use error::ConfigError;
