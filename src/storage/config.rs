//! Configuration handling for specdeck
//!
//! Configuration is stored in `.specdeck/config.toml` at the repository root
//! (project) and `~/.config/specdeck/config.toml` (global). Command-line flags
//! override both.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory holding project configuration, relative to the repository root
pub const PROJECT_DIR: &str = ".specdeck";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Output format for commands
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings for tracked sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackConfig {
    /// Quiet period in milliseconds before a task file change is handled
    pub debounce_ms: u64,

    /// Stage binary files in automated commits
    pub include_binaries: bool,

    /// Session kind used in commit subjects, e.g. `change(add-auth)`
    pub session_kind: String,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            include_binaries: false,
            session_kind: "change".to_string(),
        }
    }
}

impl TrackConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid(
                "track.debounce_ms must be greater than zero".to_string(),
            ));
        }
        if self.session_kind.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "track.session_kind must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    pub track: TrackConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Git executable used for automated commits
    pub git_binary: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Text,
            git_binary: "git".to_string(),
        }
    }
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub repo_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration for the repository containing `start`
    pub fn load(start: &Path) -> Result<Self, ConfigError> {
        let global = Self::load_global()?;
        let repo_root = Self::find_repo_root(start);
        let project = match &repo_root {
            Some(root) => Self::load_project_config(root)?,
            None => ProjectConfig::default(),
        };
        project.track.validate()?;

        Ok(Self {
            project,
            global,
            repo_root,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "specdeck", "specdeck")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn load_global() -> Result<GlobalConfig, ConfigError> {
        match Self::global_config_dir() {
            Some(dir) => read_toml(&dir.join("config.toml")),
            None => Ok(GlobalConfig::default()),
        }
    }

    /// Loads project configuration from a specific root
    pub fn load_project_config(repo_root: &Path) -> Result<ProjectConfig, ConfigError> {
        read_toml(&repo_root.join(PROJECT_DIR).join("config.toml"))
    }

    /// Finds the repository root by looking for a `.git` entry
    ///
    /// `.git` may be a file for worktrees and submodules.
    pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
        let mut current = if start.is_absolute() {
            start.to_path_buf()
        } else {
            std::env::current_dir().ok()?.join(start)
        };

        loop {
            if current.join(".git").exists() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}

/// Reads a TOML file, falling back to defaults when it does not exist
fn read_toml<T>(path: &Path) -> Result<T, ConfigError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
