use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::history::MAX_HISTORY;
use crate::pipeline::ExportFormat;

const QUALIFIER: &str = "vn";
const ORGANIZATION: &str = "LegalDoc";
const APPLICATION: &str = "legaldoc";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not access config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {} is invalid: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Editor settings, read from `config.toml` in the platform config directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo depth
    pub max_history: usize,
    /// Title used when a document is mounted without one
    pub default_title: String,
    /// Directory template links resolve against
    pub assets_dir: PathBuf,
    pub export_format: ExportFormat,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            max_history: MAX_HISTORY,
            default_title: "Văn bản mới".to_string(),
            assets_dir: PathBuf::from("templates"),
            export_format: ExportFormat::Docx,
        }
    }
}

impl EditorConfig {
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load from the default location. Missing or broken files give defaults.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_or_default(&path),
            None => Self::default(),
        }
    }

    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "using default configuration");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: EditorConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        // History always keeps at least the seeded snapshot
        config.max_history = config.max_history.max(1);
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml).map_err(io_err)
    }
}
