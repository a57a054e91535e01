use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_CAPACITY;

/// Config file looked up in the working directory when no path is given.
pub const CONFIG_FILE: &str = "aristotle.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config in {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("buffer_capacity must be greater than zero")]
    ZeroCapacity,
}

/// Editor configuration from `aristotle.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Proof compiler to invoke. Resolved next to the executable, then on
    /// `PATH`, when unset.
    pub ndpc: Option<PathBuf>,
    /// How long a status message stays on the status line.
    pub message_duration_ms: u64,
    /// Maximum size of the text buffer in bytes.
    pub buffer_capacity: usize,
    /// Spaces inserted by the Tab key.
    pub tab_width: usize,
    /// Where tracing output goes. Defaults to `aristotle.log` in the temp dir.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ndpc: None,
            message_duration_ms: 1000,
            buffer_capacity: DEFAULT_CAPACITY,
            tab_width: 4,
            log_file: None,
        }
    }
}

impl Config {
    pub fn message_duration(&self) -> Duration {
        Duration::from_millis(self.message_duration_ms)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("aristotle.log"))
    }
}

/// Load configuration from `explicit`, or from [`CONFIG_FILE`] under `dir`.
///
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = dir.join(CONFIG_FILE);
            if !p.exists() {
                return Ok(Config::default());
            }
            p
        }
    };
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config: Config =
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;
    if config.buffer_capacity == 0 {
        return Err(ConfigError::ZeroCapacity);
    }
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_default_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load(None, dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load(Some(&dir.path().join("other.toml")), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "ndpc = \"/usr/local/bin/ndpc\"\ntab_width = 2\n",
        )
        .unwrap();
        let config = load(None, dir.path()).unwrap();
        assert_eq!(config.ndpc, Some(PathBuf::from("/usr/local/bin/ndpc")));
        assert_eq!(config.tab_width, 2);
        assert_eq!(config.message_duration(), Duration::from_secs(1));
        assert_eq!(config.buffer_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "colour = \"red\"\n").unwrap();
        assert!(matches!(
            load(None, dir.path()).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "buffer_capacity = 0\n").unwrap();
        assert!(matches!(
            load(None, dir.path()).unwrap_err(),
            ConfigError::ZeroCapacity
        ));
    }
}
