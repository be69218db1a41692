//! Local configuration manager with lazy loading and caching.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::error::ConfigError;
use crate::file_config::{current_env_name_with_env, find_config_directory_with_env, load_multi_env_config};
use crate::multi_env::{EnvConfig, MultiEnvConfig};
use crate::shared::DEFAULT_SHARED_KEY;

/// Loads the config documents on first access and keeps the composed result.
///
/// Thread-safe via RwLock. The config directory and env name come from the
/// process environment unless overridden with the builder methods.
pub struct LocalConfigManager {
    inner: RwLock<Option<Arc<MultiEnvConfig>>>,
    config_dir: Option<PathBuf>,
    shared_key: String,
    env_override: Option<HashMap<String, String>>,
}

impl LocalConfigManager {
    /// Create a new manager with default settings.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
            config_dir: None,
            shared_key: DEFAULT_SHARED_KEY.to_string(),
            env_override: None,
        }
    }

    /// Use this directory instead of searching for one.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Reserved key of the shared blocks in the documents.
    pub fn with_shared_key(mut self, key: &str) -> Self {
        self.shared_key = key.to_string();
        self
    }

    /// Override environment variables (for testing).
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env_override = Some(env);
        self
    }

    fn env_vars(&self) -> HashMap<String, String> {
        self.env_override.clone().unwrap_or_else(|| std::env::vars().collect())
    }

    fn load(&self) -> Result<MultiEnvConfig, ConfigError> {
        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => find_config_directory_with_env(&self.env_vars())?,
        };
        debug!(dir = %config_dir.display(), "loading config documents");
        load_multi_env_config(&config_dir, &self.shared_key)
    }

    /// The composed config, loaded on first call.
    pub fn config(&self) -> Result<Arc<MultiEnvConfig>, ConfigError> {
        if let Some(config) = self.inner.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(config));
        }

        // the cache holds either nothing or a fully built config, so a poisoned lock is still usable
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // another thread may have loaded while we waited
        if let Some(config) = inner.as_ref() {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(self.load()?);
        *inner = Some(Arc::clone(&config));
        Ok(config)
    }

    pub fn get_env(&self, env_name: &str) -> Result<EnvConfig, ConfigError> {
        self.config()?.get_env(env_name)
    }

    /// Config of the env named by MULTIENV_ENV (default `dev`).
    pub fn current_env(&self) -> Result<EnvConfig, ConfigError> {
        let env_name = current_env_name_with_env(&self.env_vars())?;
        self.get_env(&env_name)
    }

    /// One top-level value of the current env.
    pub fn get(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.current_env()?.get(key).cloned())
    }

    /// Drop the cached config; the next access reloads from disk.
    pub fn invalidate(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[cfg(test)]
    fn is_loaded(&self) -> bool {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

impl Default for LocalConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
