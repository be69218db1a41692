//! Multi-environment config built from a non-secret and a secret document.
//!
//! Both documents are objects keyed by env name, optionally carrying shared
//! blocks at any depth:
//!
//! ```json
//! {
//!     "defaults": { "*.project_name": "my_project", "*.username": "admin" },
//!     "dev": { "servers": { "blue": {} } },
//!     "prod": { "username": "root" }
//! }
//! ```
//!
//! Shared blocks are resolved per document, then the two are merged strictly,
//! so a value can be defined in exactly one of them.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{kind_name, ConfigError};
use crate::merge::merge;
use crate::shared::{apply_shared_blocks_with_key, DEFAULT_SHARED_KEY};
use crate::utils::{normalize_parameter_name, slugify, validate_env_name, validate_project_name};

/// Env name used for the deployment that carries every env.
pub const ALL_ENV: &str = "all";

pub const KEY_PROJECT_NAME: &str = "project_name";
pub const KEY_ENV_NAME: &str = "env_name";
pub const KEY_DATA: &str = "data";
pub const KEY_SECRET_DATA: &str = "secret_data";

/// Composed config for every env, plus the documents it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiEnvConfig {
    data: Value,
    secret_data: Value,
    applied_data: Value,
    applied_secret_data: Value,
    merged: Map<String, Value>,
    project_name: String,
}

impl MultiEnvConfig {
    /// Compose `data` and `secret_data` using the `"defaults"` shared key.
    pub fn new(data: Value, secret_data: Value) -> Result<Self, ConfigError> {
        Self::with_shared_key(data, secret_data, DEFAULT_SHARED_KEY)
    }

    /// Compose `data` and `secret_data`, resolving shared blocks under `shared_key`.
    pub fn with_shared_key(data: Value, secret_data: Value, shared_key: &str) -> Result<Self, ConfigError> {
        ensure_object(&data, KEY_DATA)?;
        ensure_object(&secret_data, KEY_SECRET_DATA)?;

        let applied_data = apply_shared_blocks_with_key(data.clone(), shared_key)?;
        let applied_secret_data = apply_shared_blocks_with_key(secret_data.clone(), shared_key)?;
        let merged = match merge(applied_data.clone(), applied_secret_data.clone())? {
            Value::Object(map) => map,
            // two objects always merge into an object
            other => {
                return Err(ConfigError::InvalidDocument(format!(
                    "composed config is not an object: {}",
                    other
                )))
            }
        };

        let project_name = check_envs(&merged)?;
        debug!(project = %project_name, envs = merged.len(), "composed multi-env config");

        Ok(Self {
            data,
            secret_data,
            applied_data,
            applied_secret_data,
            merged,
            project_name,
        })
    }

    /// Rebuild from a stored `{"data": ..., "secret_data": ...}` document.
    pub fn from_document(document: Value) -> Result<Self, ConfigError> {
        let mut document = match document {
            Value::Object(map) => map,
            _ => return Err(ConfigError::InvalidDocument("stored config must be an object".to_string())),
        };
        let data = document
            .shift_remove(KEY_DATA)
            .ok_or_else(|| ConfigError::InvalidDocument(format!("missing {:?}", KEY_DATA)))?;
        let secret_data = document
            .shift_remove(KEY_SECRET_DATA)
            .unwrap_or_else(|| Value::Object(Map::new()));
        Self::new(data, secret_data)
    }

    /// The raw documents in their storable form.
    pub fn to_document(&self) -> Value {
        let mut document = Map::new();
        document.insert(KEY_DATA.to_string(), self.data.clone());
        document.insert(KEY_SECRET_DATA.to_string(), self.secret_data.clone());
        Value::Object(document)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn secret_data(&self) -> &Value {
        &self.secret_data
    }

    pub fn applied_data(&self) -> &Value {
        &self.applied_data
    }

    pub fn applied_secret_data(&self) -> &Value {
        &self.applied_secret_data
    }

    pub fn merged(&self) -> &Map<String, Value> {
        &self.merged
    }

    pub fn env_names(&self) -> Vec<&str> {
        self.merged.keys().map(String::as_str).collect()
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Example: `my-project`
    pub fn project_name_slug(&self) -> String {
        slugify(&self.project_name, "-")
    }

    /// Example: `my_project`
    pub fn project_name_snake(&self) -> String {
        slugify(&self.project_name, "_")
    }

    /// Name of the all-env parameter, usually the snake project name.
    pub fn parameter_name(&self) -> String {
        normalize_parameter_name(&self.project_name_snake())
    }

    /// Composed config of one env, with `env_name` filled in.
    pub fn get_env(&self, env_name: &str) -> Result<EnvConfig, ConfigError> {
        let mut values = match self.merged.get(env_name) {
            Some(Value::Object(values)) => values.clone(),
            _ => return Err(ConfigError::UnknownEnv(env_name.to_string())),
        };
        values.insert(KEY_ENV_NAME.to_string(), Value::String(env_name.to_string()));
        Ok(EnvConfig {
            project_name: self.project_name.clone(),
            env_name: env_name.to_string(),
            values,
        })
    }

    /// Split into the all-env deployment followed by one per env.
    pub fn prepare_deploy(&self) -> Result<Vec<Deployment>, ConfigError> {
        let mut deployments = Vec::with_capacity(self.merged.len() + 1);
        deployments.push(Deployment::new(
            self.parameter_name(),
            &self.project_name,
            ALL_ENV,
            self.to_document(),
        ));

        for env_name in self.merged.keys() {
            let env = self.get_env(env_name)?;
            let document = serde_json::json!({
                KEY_DATA: { env_name.as_str(): env_section(&self.applied_data, env_name) },
                KEY_SECRET_DATA: { env_name.as_str(): env_section(&self.applied_secret_data, env_name) },
            });
            deployments.push(Deployment::new(
                env.parameter_name(),
                &self.project_name,
                env_name,
                document,
            ));
        }
        Ok(deployments)
    }
}

/// One env's composed values.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvConfig {
    project_name: String,
    env_name: String,
    values: Map<String, Value>,
}

impl EnvConfig {
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn project_name_slug(&self) -> String {
        slugify(&self.project_name, "-")
    }

    pub fn project_name_snake(&self) -> String {
        slugify(&self.project_name, "_")
    }

    /// Example: `my-project-dev`
    pub fn prefix_name_slug(&self) -> String {
        format!("{}-{}", self.project_name_slug(), self.env_name)
    }

    /// Example: `my_project-dev`
    pub fn prefix_name_snake(&self) -> String {
        format!("{}-{}", self.project_name_snake(), self.env_name)
    }

    /// Per-env parameter name, usually `${project_name}-${env_name}`.
    pub fn parameter_name(&self) -> String {
        normalize_parameter_name(&self.prefix_name_snake())
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Deserialize into an application struct.
    ///
    /// Use `#[serde(deny_unknown_fields)]` on the target to catch keys in the
    /// JSON file that the struct does not declare.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(self.to_value()).map_err(|source| ConfigError::Deserialize {
            env_name: self.env_name.clone(),
            source,
        })
    }
}

/// A document ready to hand to a [`crate::store::ConfigStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub parameter_name: String,
    pub project_name: String,
    pub env_name: String,
    pub document: Value,
    pub tags: BTreeMap<String, String>,
}

impl Deployment {
    fn new(parameter_name: String, project_name: &str, env_name: &str, document: Value) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("ProjectName".to_string(), project_name.to_string());
        tags.insert("EnvName".to_string(), env_name.to_string());
        Self {
            parameter_name,
            project_name: project_name.to_string(),
            env_name: env_name.to_string(),
            document,
            tags,
        }
    }
}

fn ensure_object(document: &Value, name: &str) -> Result<(), ConfigError> {
    if document.is_object() {
        Ok(())
    } else {
        Err(ConfigError::InvalidDocument(format!("{} must be an object keyed by env name", name)))
    }
}

fn env_section(document: &Value, env_name: &str) -> Value {
    document
        .get(env_name)
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Validate env names and project names; returns the shared project name.
fn check_envs(merged: &Map<String, Value>) -> Result<String, ConfigError> {
    let mut project_name: Option<&str> = None;
    for (env_name, env) in merged {
        validate_env_name(env_name)?;
        let env = env.as_object().ok_or_else(|| {
            ConfigError::InvalidDocument(format!(
                "env {:?} must be an object, found {}",
                env_name,
                kind_name(env)
            ))
        })?;
        let found = env
            .get(KEY_PROJECT_NAME)
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::MissingProjectName(env_name.clone()))?;
        validate_project_name(found)?;
        match project_name {
            None => project_name = Some(found),
            Some(expected) if expected != found => {
                return Err(ConfigError::InconsistentProjectName {
                    env_name: env_name.clone(),
                    expected: expected.to_string(),
                    found: found.to_string(),
                })
            }
            Some(_) => {}
        }
    }
    project_name
        .map(str::to_string)
        .ok_or_else(|| ConfigError::InvalidDocument("config defines no env".to_string()))
}
