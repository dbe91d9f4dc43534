//! Configuration loader with tier-based merging.

use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.yaml";

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
    /// Explicit config file, replaces the project and user tiers
    pub explicit_file: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: TODO_CACHE_USER_DIR or ~/.todo-cache
        let user_dir = std::env::var("TODO_CACHE_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".todo-cache")));

        // Project dir: TODO_CACHE_PROJECT_DIR or $CWD/todo-cache
        let project_dir = std::env::var("TODO_CACHE_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("todo-cache")));

        let explicit_file = std::env::var("TODO_CACHE_CONFIG_PATH")
            .ok()
            .map(PathBuf::from);

        Self {
            project_dir,
            user_dir,
            explicit_file,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
            explicit_file: None,
        }
    }

    pub fn with_explicit_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(file.into());
        self
    }
}

/// Resolved configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority file that contributed, if any
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load from discovered paths and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover(), |name| std::env::var(name).ok())
    }

    /// Load with explicit paths and an environment lookup.
    pub fn load_with_paths<E>(paths: ConfigPaths, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut layers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut config_path = None;

        if let Some(ref file) = paths.explicit_file {
            // An explicit file must exist and parse
            layers.push(read_yaml(file)?);
            config_path = Some(file.clone());
        } else {
            let tiers = [paths.user_dir.as_deref(), paths.project_dir.as_deref()];
            for dir in tiers.into_iter().flatten() {
                let file = dir.join(CONFIG_FILE);
                if !file.exists() {
                    continue;
                }
                match read_yaml(&file) {
                    Ok(layer) => {
                        debug!(path = %file.display(), "Loaded config tier");
                        layers.push(layer);
                        config_path = Some(file);
                    }
                    Err(e) => warn!(path = %file.display(), error = %e, "Ignoring unreadable config"),
                }
            }
        }

        let merged = layers.into_iter().fold(Value::Null, merge);
        let mut config: Config = serde_json::from_value(merged).context("Invalid configuration")?;
        apply_env_overrides(&mut config, env);

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Field-by-field merge; `overlay` wins, nulls mean "not specified".
fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut into), Value::Object(from)) => {
            for (key, value) in from {
                let merged = match into.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                into.insert(key, merged);
            }
            Value::Object(into)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

fn apply_env_overrides<E>(config: &mut Config, env: E)
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(dir) = env("TODO_CACHE_DATA_DIR") {
        config.storage.data_dir = PathBuf::from(dir);
    }

    if let Some(secs) = env("TODO_CACHE_STALE_SECS") {
        match secs.parse() {
            Ok(secs) => config.cache.stale_secs = secs,
            Err(_) => warn!(value = %secs, "Ignoring invalid TODO_CACHE_STALE_SECS"),
        }
    }

    if let Some(required) = env("TODO_CACHE_REQUIRE_AUTH") {
        match required.to_lowercase().as_str() {
            "1" | "true" | "yes" => config.auth.required = true,
            "0" | "false" | "no" => config.auth.required = false,
            _ => warn!(value = %required, "Ignoring invalid TODO_CACHE_REQUIRE_AUTH"),
        }
    }
}
