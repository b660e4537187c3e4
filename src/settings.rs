use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "bezi_bridge.json";
pub const DEFAULT_BEZI_PATH: &str = r"C:\Program Files\Bezi\Bezi.exe";

/// Persisted session state. Only an initialization run mutates and saves it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub initialized: bool,

    #[serde(default)]
    pub bezi_path: Option<String>,
}

impl SessionConfig {
    /// Load config from file. Missing or empty files give the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&contents).map_err(|source| BridgeError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the whole file through a sibling temp file so readers never see a partial write
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| BridgeError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp = temp_sibling(path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Mark the session initialized, recording the supplied executable or the default install path
    pub fn initialize(&mut self, bezi_path: Option<&str>) {
        self.initialized = true;
        self.bezi_path = Some(bezi_path.unwrap_or(DEFAULT_BEZI_PATH).to_string());
    }

    /// Executable to launch: command line override, then saved path, then the default install path
    pub fn resolve_exe(&self, override_path: Option<&str>) -> PathBuf {
        override_path
            .or(self.bezi_path.as_deref())
            .unwrap_or(DEFAULT_BEZI_PATH)
            .into()
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| CONFIG_FILE.into());
    name.push(".tmp");
    path.with_file_name(name)
}
