//! Application configuration: a TOML file plus `SPM_*` environment overrides.
//!
//! ```toml
//! [sharepoint]
//! site_url = "https://contoso.sharepoint.com/sites/Team"
//! client_id = "…"
//! client_secret = "…"
//!
//! [folder]
//! library_name = "Shared Documents"
//! folder_name = "Reports"
//! ```

use serde::{Deserialize, Serialize};
use spm_sharepoint::SharePointConfig;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SPM_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no site URL configured (set [sharepoint].site_url or SPM_SITE_URL)")]
    MissingSiteUrl,
}

/// Library and folder the binary binds on start-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderSettings {
    pub library_name: String,
    /// Empty binds the library root.
    pub folder_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sharepoint: SharePointConfig,
    pub folder: FolderSettings,
}

impl AppConfig {
    /// Resolve the config path, read it, then apply the process environment.
    pub fn load(cli_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with(cli_path, |key| std::env::var(key).ok())
    }

    /// [`AppConfig::load`] with an explicit environment lookup.
    pub fn load_with<F>(cli_path: Option<PathBuf>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = cli_path.or_else(|| env(CONFIG_ENV).map(PathBuf::from));
        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(env);
        if config.sharepoint.site_url.trim().is_empty() {
            return Err(ConfigError::MissingSiteUrl);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overwrite fields from `SPM_*` variables.  Empty values are ignored.
    pub fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.is_empty());
        let sp = &mut self.sharepoint;

        if let Some(v) = var("SPM_SITE_URL") {
            sp.site_url = v;
        }
        for (key, slot) in [
            ("SPM_RELATIVE_URL", &mut sp.relative_url),
            ("SPM_USERNAME", &mut sp.username),
            ("SPM_PASSWORD", &mut sp.password),
            ("SPM_CLIENT_ID", &mut sp.client_id),
            ("SPM_CLIENT_SECRET", &mut sp.client_secret),
        ] {
            if let Some(v) = var(key) {
                *slot = Some(v);
            }
        }
        if let Some(v) = var("SPM_LIBRARY") {
            self.folder.library_name = v;
        }
        if let Some(v) = var("SPM_FOLDER") {
            self.folder.folder_name = v;
        }
    }
}

/// `{config_dir}/spm/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("spm").join("config.toml"))
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
