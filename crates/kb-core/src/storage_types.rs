use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Token storage backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    /// Durable, one file per key under a directory
    Local,
    /// Process-local; lost on exit
    Memory,
}

impl FromStr for TokenBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "file" => Ok(TokenBackend::Local),
            "memory" => Ok(TokenBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid token backend: {}", s)),
        }
    }
}

impl Display for TokenBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TokenBackend::Local => write!(f, "local"),
            TokenBackend::Memory => write!(f, "memory"),
        }
    }
}
