//! Knowledge Base Core Library
//!
//! Domain models, error types, configuration, token claim decoding and the pure
//! record mapping shared by the API client and the CLI.

pub mod config;
pub mod error;
pub mod mapper;
pub mod models;
pub mod storage_types;
pub mod timesheet;
pub mod token;
pub mod validation;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{KbError, KbResult, LogLevel};
pub use storage_types::TokenBackend;
pub use validation::ensure_valid;
