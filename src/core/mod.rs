//! Core utilities and common types.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, ProblemCode, Result, ValidationError};
pub use logging::{init_logging, LoggingConfig};
pub use types::*;
