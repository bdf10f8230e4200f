//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "toolgate";
const PROJECT_FILES: [&str; 2] = ["toolgate.toml", ".toolgate.toml"];
const ENV_PREFIX: &str = "TOOLGATE_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Where a configuration layer comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSourceKind {
    Explicit,
    Project,
    Global,
    Environment,
    Defaults,
}

impl ConfigSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSourceKind::Explicit => "Explicit",
            ConfigSourceKind::Project => "Project",
            ConfigSourceKind::Global => "Global",
            ConfigSourceKind::Environment => "Env",
            ConfigSourceKind::Defaults => "Default",
        }
    }
}

/// One configuration layer, in priority order from [`ConfigLoader::sources`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    /// File path or description of the layer
    pub location: String,
    pub found: bool,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `TOOLGATE_*` environment variables (`__` separates nested keys)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./toolgate.toml` or `./.toolgate.toml`
    /// 4. Global: `<config dir>/toolgate/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        if let Some(path) = config_path
            && !path.exists()
        {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::figment(config_path)
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Load a single file on top of the defaults, ignoring every other layer
    pub fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Figment::new()
            .merge(Serialized::defaults(FileConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(project_path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&project_path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the global config file path (`<config dir>/toolgate/config.toml`)
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Every configuration layer, highest priority first
    pub fn sources(config_path: Option<&Path>) -> Vec<ConfigSource> {
        let mut sources = vec![ConfigSource {
            kind: ConfigSourceKind::Environment,
            location: format!("{}* variables", ENV_PREFIX),
            found: std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX)),
        }];

        if let Some(path) = config_path {
            sources.push(ConfigSource {
                kind: ConfigSourceKind::Explicit,
                location: path.display().to_string(),
                found: path.exists(),
            });
        }

        sources.push(match Self::project_config_path() {
            Some(path) => ConfigSource {
                kind: ConfigSourceKind::Project,
                location: path.display().to_string(),
                found: true,
            },
            None => ConfigSource {
                kind: ConfigSourceKind::Project,
                location: PROJECT_FILES
                    .iter()
                    .map(|f| format!("./{}", f))
                    .collect::<Vec<_>>()
                    .join(" or "),
                found: false,
            },
        });

        if let Some(path) = Self::global_config_path() {
            sources.push(ConfigSource {
                kind: ConfigSourceKind::Global,
                found: path.exists(),
                location: path.display().to_string(),
            });
        }

        sources.push(ConfigSource {
            kind: ConfigSourceKind::Defaults,
            location: "built-in defaults".to_string(),
            found: true,
        });
        sources
    }
}
