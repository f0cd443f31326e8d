//! Data models for the knowledge base client
//!
//! Wire names follow the backend's JSON (`categoria`, `fileID`, ...); Rust field
//! names are English.

mod auth;
mod chips;
mod file;
mod record;

pub use auth::*;
pub use chips::*;
pub use file::*;
pub use record::*;
