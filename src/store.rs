//! Where deployed config documents live.
//!
//! [`LocalDirStore`] keeps every parameter in its own folder, with the current
//! document next to numbered history copies:
//!
//! ```text
//! {root}/my_project-dev/my_project-dev-latest.json
//! {root}/my_project-dev/my_project-dev-000001.json
//! {root}/my_project-dev/my_project-dev-000002.json
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::error::ConfigError;
use crate::file_config::read_json_file;
use crate::multi_env::{Deployment, MultiEnvConfig};

const LATEST_SUFFIX: &str = "latest";
const VERSION_WIDTH: usize = 6;

/// A document written by a deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVersion {
    pub parameter_name: String,
    pub version: u32,
    pub path: PathBuf,
}

/// The latest document of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredConfig {
    pub parameter_name: String,
    pub version: u32,
    pub document: Value,
}

/// Backend that deployments are written to.
pub trait ConfigStore {
    /// Write `deployment`; `None` when the stored document is already identical.
    fn deploy(&self, deployment: &Deployment) -> Result<Option<StoredVersion>, ConfigError>;

    /// Latest document stored under `parameter_name`.
    fn read(&self, parameter_name: &str) -> Result<StoredConfig, ConfigError>;

    /// Remove the latest document, or everything when `include_history` is set.
    /// Returns whether anything was removed.
    fn delete(&self, parameter_name: &str, include_history: bool) -> Result<bool, ConfigError>;
}

/// Versioned store on a local directory.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder(&self, parameter_name: &str) -> PathBuf {
        self.root.join(parameter_name)
    }

    fn latest_path(&self, parameter_name: &str) -> PathBuf {
        self.folder(parameter_name)
            .join(format!("{}-{}.json", parameter_name, LATEST_SUFFIX))
    }

    fn version_path(&self, parameter_name: &str, version: u32) -> PathBuf {
        self.folder(parameter_name).join(format!(
            "{}-{:0width$}.json",
            parameter_name,
            version,
            width = VERSION_WIDTH
        ))
    }

    /// Highest history version present, 0 when there is none.
    fn latest_version(&self, parameter_name: &str) -> Result<u32, ConfigError> {
        let folder = self.folder(parameter_name);
        let entries = match fs::read_dir(&folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => return Err(ConfigError::Io { path: folder, source }),
        };

        let prefix = format!("{}-", parameter_name);
        let mut latest = 0;
        for entry in entries {
            let entry = entry.map_err(|source| ConfigError::Io {
                path: folder.clone(),
                source,
            })?;
            let file_name = entry.file_name();
            let version = file_name
                .to_str()
                .and_then(|name| name.strip_prefix(&prefix))
                .and_then(|rest| rest.strip_suffix(".json"))
                // history names are zero-padded to at least VERSION_WIDTH digits
                .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|digits| digits.parse::<u32>().ok());
            if let Some(version) = version {
                latest = latest.max(version);
            }
        }
        Ok(latest)
    }
}

fn write_json(path: &Path, document: &Value) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(document).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl ConfigStore for LocalDirStore {
    fn deploy(&self, deployment: &Deployment) -> Result<Option<StoredVersion>, ConfigError> {
        let name = deployment.parameter_name.as_str();
        let latest_path = self.latest_path(name);
        info!(path = %latest_path.display(), env = %deployment.env_name, "deploy config");

        if latest_path.is_file() && read_json_file(&latest_path)? == deployment.document {
            info!(parameter = name, "config data is the same as existing one, do nothing");
            return Ok(None);
        }

        let folder = self.folder(name);
        fs::create_dir_all(&folder).map_err(|source| ConfigError::Io { path: folder, source })?;

        let version = self.latest_version(name)? + 1;
        let version_path = self.version_path(name, version);
        write_json(&latest_path, &deployment.document)?;
        write_json(&version_path, &deployment.document)?;
        info!(parameter = name, version, "config deployed");

        Ok(Some(StoredVersion {
            parameter_name: name.to_string(),
            version,
            path: version_path,
        }))
    }

    fn read(&self, parameter_name: &str) -> Result<StoredConfig, ConfigError> {
        let latest_path = self.latest_path(parameter_name);
        if !latest_path.is_file() {
            return Err(ConfigError::NotFound(parameter_name.to_string()));
        }
        let document = read_json_file(&latest_path)?;
        Ok(StoredConfig {
            parameter_name: parameter_name.to_string(),
            version: self.latest_version(parameter_name)?,
            document,
        })
    }

    fn delete(&self, parameter_name: &str, include_history: bool) -> Result<bool, ConfigError> {
        if include_history {
            let folder = self.folder(parameter_name);
            info!(path = %folder.display(), "delete config and its history");
            return match fs::remove_dir_all(&folder) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(source) => Err(ConfigError::Io { path: folder, source }),
            };
        }

        let latest_path = self.latest_path(parameter_name);
        info!(path = %latest_path.display(), "delete latest config");
        match fs::remove_file(&latest_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ConfigError::Io {
                path: latest_path,
                source,
            }),
        }
    }
}

impl MultiEnvConfig {
    /// Deploy the all-env document and one document per env.
    ///
    /// Entries are `None` for documents that were already up to date.
    pub fn deploy<S: ConfigStore + ?Sized>(&self, store: &S) -> Result<Vec<Option<StoredVersion>>, ConfigError> {
        self.prepare_deploy()?
            .iter()
            .map(|deployment| store.deploy(deployment))
            .collect()
    }

    /// Delete every document [`MultiEnvConfig::deploy`] would write.
    pub fn delete<S: ConfigStore + ?Sized>(&self, store: &S, include_history: bool) -> Result<Vec<bool>, ConfigError> {
        self.prepare_deploy()?
            .iter()
            .map(|deployment| store.delete(&deployment.parameter_name, include_history))
            .collect()
    }

    /// Rebuild a config from a stored document.
    pub fn read_from<S: ConfigStore + ?Sized>(store: &S, parameter_name: &str) -> Result<Self, ConfigError> {
        Self::from_document(store.read(parameter_name)?.document)
    }
}
