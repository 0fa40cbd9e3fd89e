//! Runtime errors

use std::path::PathBuf;

use pyrium_vm_bytecode::BytecodeError;
use thiserror::Error;

/// Errors raised while configuring or starting a runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Config file could not be read
    #[error("Failed to read config '{}': {source}", path.display())]
    ConfigRead {
        /// Config path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`RuntimeConfig`](crate::RuntimeConfig)
    #[error("Failed to parse config '{}': {source}", path.display())]
    ConfigParse {
        /// Config path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: toml::de::Error,
    },

    /// Config values out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Mods directory could not be walked
    #[error("Failed to scan mods directory '{}': {source}", path.display())]
    ModsDir {
        /// Directory being scanned
        path: PathBuf,
        /// Underlying walk error
        #[source]
        source: walkdir::Error,
    },

    /// A single module failed to load
    #[error("Failed to load module '{}': {source}", path.display())]
    Module {
        /// Module file
        path: PathBuf,
        /// Decode error
        #[source]
        source: BytecodeError,
    },

    /// The fallback timer thread could not be started
    #[error("Failed to spawn tick thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl RuntimeError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type for runtime operations
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;
