//! Settings file for ecs-deploy
//!
//! Values here sit below command line flags and environment variables and
//! above the built-in defaults. The file is looked up in this order:
//!
//! 1. `ECS_DEPLOY_CONFIG` (must exist when set)
//! 2. `<config dir>/ecs-deploy/config.yaml` (optional)
//!
//! ```yaml
//! region: us-east-1
//! role: arn:aws:iam::123456789012:role/deployer
//! max_attempts: 60
//! description: Desired version set by release pipeline
//! ```

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV: &str = "ECS_DEPLOY_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// AWS region used when neither `--region` nor `AWS_REGION` is given
    pub region: Option<String>,

    /// IAM role assumed before any AWS call
    pub role: Option<String>,

    /// Stability polls before giving up
    pub max_attempts: Option<u32>,

    /// Description recorded with the desired version
    pub description: Option<String>,
}

impl Settings {
    /// Parse settings from `path`
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// `flag` if given, else the settings value
    pub fn role_or(&self, flag: Option<String>) -> Option<String> {
        flag.or_else(|| self.role.clone())
    }

    pub fn region_or(&self, flag: Option<String>) -> Option<String> {
        flag.or_else(|| self.region.clone())
    }

    pub fn max_attempts_or(&self, flag: Option<u32>, default: u32) -> u32 {
        flag.or(self.max_attempts).unwrap_or(default)
    }

    pub fn description_or(&self, flag: Option<String>, default: &str) -> String {
        flag.or_else(|| self.description.clone())
            .unwrap_or_else(|| default.to_string())
    }
}

/// Default location of the settings file
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ecs-deploy").join("config.yaml"))
}

/// Find the settings file to use, if any.
pub fn find_settings_file() -> Result<Option<PathBuf>> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path));
        }
        return Ok(Some(path));
    }

    Ok(default_settings_path().filter(|path| path.exists()))
}

/// Load settings, falling back to defaults when no file exists.
pub fn load_settings() -> Result<Settings> {
    match find_settings_file()? {
        Some(path) => Settings::from_file(&path),
        None => Ok(Settings::default()),
    }
}
