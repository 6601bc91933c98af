//! Error types

use std::path::PathBuf;

use thiserror::Error;

use crate::session::GameState;
use crate::symbols::SymbolId;

/// Configuration loading and validation errors.
///
/// Raised only while loading or resolving a [`crate::GameConfig`], never mid-spin.
/// Callers decide whether to abort or substitute a known-good default.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config data: {0}")]
    MalformedData(String),

    #[error("Config validation failed: {0}")]
    ValidationFailed(String),

    #[error("Unknown symbol '{name}' referenced by {context}")]
    UnknownSymbol { name: String, context: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedData(e.to_string())
    }
}

impl From<serde_yml::Error> for ConfigError {
    fn from(e: serde_yml::Error) -> Self {
        Self::MalformedData(e.to_string())
    }
}

/// Errors surfaced by the game engine.
///
/// Every rejected operation leaves the owning [`crate::GameSession`] exactly as
/// it was before the call.
#[derive(Error, Debug)]
pub enum SlotError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Insufficient credit: required {required}, available {available}")]
    InsufficientCredit { required: u64, available: u64 },

    #[error("Invalid state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: GameState,
    },

    #[error("Reel {reel}: window {target:?} does not exist on the strip")]
    ReelSearch { reel: usize, target: Vec<SymbolId> },

    #[error("Invalid bet: {bet}")]
    InvalidBet { bet: u64 },

    #[error("Unknown purchase tier: {tier}")]
    InvalidTier { tier: usize },
}

pub type Result<T> = std::result::Result<T, SlotError>;
