//! TOML configuration for the Pyrium runtime

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pyrium_vm_bytecode::ENTRY_FUNCTION;

use crate::error::{RuntimeError, RuntimeResult};

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "pyrium.toml";

/// Nominal simulation rate of the game server
pub const DEFAULT_TICK_RATE: u32 = 20;

/// Where ticks come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickSource {
    /// Fallback timer thread inside the runtime
    #[default]
    Internal,
    /// The host's simulation loop calls `dispatch`
    External,
}

impl std::fmt::Display for TickSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal => f.write_str("internal"),
            Self::External => f.write_str("external"),
        }
    }
}

/// Runtime configuration loaded from `pyrium.toml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory scanned for `.pybc` modules
    pub mods_dir: PathBuf,

    /// Fallback timer rate in steps per second
    pub tick_rate: u32,

    /// Tick source strategy chosen at startup
    pub tick_source: TickSource,

    /// Function invoked on every tick
    pub entry_function: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mods_dir: PathBuf::from("mods"),
            tick_rate: DEFAULT_TICK_RATE,
            tick_source: TickSource::Internal,
            entry_function: ENTRY_FUNCTION.to_owned(),
        }
    }
}

impl RuntimeConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mods directory
    pub fn with_mods_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mods_dir = dir.into();
        self
    }

    /// Set the fallback timer rate
    pub fn with_tick_rate(mut self, rate: u32) -> Self {
        self.tick_rate = rate;
        self
    }

    /// Set the tick source strategy
    pub fn with_tick_source(mut self, source: TickSource) -> Self {
        self.tick_source = source;
        self
    }

    /// Set the per-tick entry function
    pub fn with_entry_function(mut self, name: impl Into<String>) -> Self {
        self.entry_function = name.into();
        self
    }

    /// Interval between fallback timer ticks
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str, origin: &Path) -> RuntimeResult<Self> {
        let config: Self = toml::from_str(content).map_err(|source| RuntimeError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> RuntimeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RuntimeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load an explicit path, or `pyrium.toml` if it exists, else defaults
    ///
    /// An explicit path must exist and parse. The default location is
    /// optional but must parse when present.
    pub fn load_or_default(path: Option<&Path>) -> RuntimeResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            Ok(Self::default())
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.tick_rate == 0 {
            return Err(RuntimeError::invalid_config("tick_rate must be at least 1"));
        }
        if self.entry_function.trim().is_empty() {
            return Err(RuntimeError::invalid_config("entry_function must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.mods_dir, PathBuf::from("mods"));
        assert_eq!(config.tick_rate, 20);
        assert_eq!(config.tick_source, TickSource::Internal);
        assert_eq!(config.entry_function, "on_tick");
        assert_eq!(config.tick_period(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_toml() {
        let config = RuntimeConfig::from_toml_str(
            "tick_source = \"external\"\ntick_rate = 10\n",
            Path::new("inline"),
        )
        .unwrap();

        assert_eq!(config.tick_source, TickSource::External);
        assert_eq!(config.tick_rate, 10);
        assert_eq!(config.mods_dir, PathBuf::from("mods"));
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new()
            .with_mods_dir("/srv/mods")
            .with_tick_rate(40)
            .with_tick_source(TickSource::External)
            .with_entry_function("tick");

        assert_eq!(config.mods_dir, PathBuf::from("/srv/mods"));
        assert_eq!(config.tick_period(), Duration::from_millis(25));
        assert_eq!(config.entry_function, "tick");
    }

    #[test]
    fn test_invalid_values() {
        let err = RuntimeConfig::from_toml_str("tick_rate = 0", Path::new("inline")).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));

        let err =
            RuntimeConfig::from_toml_str("tick_source = \"sometimes\"", Path::new("inline"))
                .unwrap_err();
        assert!(matches!(err, RuntimeError::ConfigParse { .. }));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = RuntimeConfig::load_or_default(Some(&missing)).unwrap_err();
        assert!(matches!(err, RuntimeError::ConfigRead { .. }));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mods_dir = \"plugins\"").unwrap();

        let config = RuntimeConfig::load(file.path()).unwrap();
        assert_eq!(config.mods_dir, PathBuf::from("plugins"));
        assert_eq!(config.tick_rate, DEFAULT_TICK_RATE);
    }
}
