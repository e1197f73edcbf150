//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/taxonomy/taxonomy.toml`
//! 3. Local config: `<project_dir>/.taxonomy.toml`
//! 4. Environment variables: `TAXONOMY_*` prefix, `__` between section and key

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::Scope;

/// Remote store connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the REST API; `~` and `$VAR` are expanded
    pub base_url: String,
    pub timeout_secs: u64,
    /// `limit` query parameter sent with list calls
    pub page_limit: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".into(),
            timeout_secs: 30,
            page_limit: 1000,
        }
    }
}

/// Default scope for commands that do not name one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScopeConfig {
    pub company: Option<String>,
    /// Suffix stripped from names during matching (e.g. "AC")
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeleteConfig {
    /// Remove descendants instead of refusing to delete a node with children
    pub cascade: bool,
    /// Send batches through `POST /{resource}/bulk-delete`
    pub bulk_endpoint: bool,
}

/// Raw overlay as read from one config file; `None` means "not specified".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub remote: RawRemoteConfig,
    pub scope: ScopeConfig,
    pub delete: RawDeleteConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRemoteConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub page_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawDeleteConfig {
    pub cascade: Option<bool>,
    pub bulk_endpoint: Option<bool>,
}

/// Unified configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub remote: RemoteConfig,
    pub scope: ScopeConfig,
    pub delete: DeleteConfig,
}

/// Get the XDG config directory.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "taxonomy").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("taxonomy.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".taxonomy.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Scope from `[scope]`, if a company is configured.
    pub fn scope(&self) -> Option<Scope> {
        self.scope.company.as_ref().map(|company| {
            Scope::new(
                company.clone(),
                self.scope.abbreviation.clone().unwrap_or_default(),
            )
        })
    }

    fn expand_paths(&mut self) {
        self.remote.base_url = shellexpand::full(&self.remote.base_url)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| self.remote.base_url.clone());
    }

    /// Overlay a file: values present in `overlay` replace ours.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            remote: RemoteConfig {
                base_url: overlay
                    .remote
                    .base_url
                    .clone()
                    .unwrap_or_else(|| self.remote.base_url.clone()),
                timeout_secs: overlay.remote.timeout_secs.unwrap_or(self.remote.timeout_secs),
                page_limit: overlay.remote.page_limit.unwrap_or(self.remote.page_limit),
            },
            scope: ScopeConfig {
                company: overlay
                    .scope
                    .company
                    .clone()
                    .or_else(|| self.scope.company.clone()),
                abbreviation: overlay
                    .scope
                    .abbreviation
                    .clone()
                    .or_else(|| self.scope.abbreviation.clone()),
            },
            delete: DeleteConfig {
                cascade: overlay.delete.cascade.unwrap_or(self.delete.cascade),
                bulk_endpoint: overlay
                    .delete
                    .bulk_endpoint
                    .unwrap_or(self.delete.bulk_endpoint),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for local config
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = project_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current, Self::environment())?;
        current.expand_paths();

        Ok(current)
    }

    fn environment() -> Environment {
        Environment::with_prefix("TAXONOMY").separator("__")
    }

    /// Apply TAXONOMY_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self, env: Environment) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(env)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("remote.base_url") {
            settings.remote.base_url = val;
        }
        if let Ok(val) = config.get::<u64>("remote.timeout_secs") {
            settings.remote.timeout_secs = val;
        }
        if let Ok(val) = config.get::<usize>("remote.page_limit") {
            settings.remote.page_limit = val;
        }
        if let Ok(val) = config.get_string("scope.company") {
            settings.scope.company = Some(val);
        }
        if let Ok(val) = config.get_string("scope.abbreviation") {
            settings.scope.abbreviation = Some(val);
        }
        if let Ok(val) = config.get_bool("delete.cascade") {
            settings.delete.cascade = val;
        }
        if let Ok(val) = config.get_bool("delete.bulk_endpoint") {
            settings.delete.bulk_endpoint = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# taxonomy configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/taxonomy/taxonomy.toml
#   Local:  <project_dir>/.taxonomy.toml
#   Env:    TAXONOMY_* environment variables, e.g. TAXONOMY_REMOTE__BASE_URL

[remote]
# base_url = "http://localhost:8000/api"
# timeout_secs = 30
# page_limit = 1000

[scope]
# company = "Acme Corporation"
# abbreviation = "AC"

[delete]
# Remove descendants first instead of refusing nodes with children
# cascade = false
# Send batches as one POST /{resource}/bulk-delete request
# bulk_endpoint = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
