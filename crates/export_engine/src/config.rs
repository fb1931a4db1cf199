use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::engine_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::FetchSettings;

/// All tunables of the export engine. Every section falls back to its
/// defaults, so a settings file only needs the keys it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub image_fetch: FetchSettings,
    pub storage: StorageSettings,
    pub generation: GenerationSettings,
    pub outline: OutlineSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding uploaded images. `None` disables storage lookups.
    pub root: Option<PathBuf>,
    /// URL path prefix that maps onto `root`, e.g. `/storage/`.
    pub url_prefix: String,
    /// Base used to resolve relative image references for remote fetches.
    pub public_base_url: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: None,
            url_prefix: "/storage/".to_string(),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub primary_model: String,
    pub fallback_model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub request_timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            primary_model: "gpt-4.1-mini".to_string(),
            fallback_model: Some("gpt-4o-mini".to_string()),
            temperature: 0.4,
            max_tokens: Some(200),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineSettings {
    /// Summarize sections concurrently. Slide order is kept either way.
    pub parallel: bool,
    pub max_bullets: usize,
    pub bullet_max_chars: usize,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            max_bullets: 4,
            bullet_max_chars: 110,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings from {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Load settings from a RON file. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<ExportSettings, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            engine_info!("No settings file at {:?}, using defaults", path);
            return Ok(ExportSettings::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let settings = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    engine_info!("Loaded export settings from {:?}", path);
    Ok(settings)
}
