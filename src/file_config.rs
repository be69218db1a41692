//! Locating and loading the config documents on disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::multi_env::MultiEnvConfig;
use crate::utils::validate_env_name;

pub const ENV_CONFIG_DIR: &str = "MULTIENV_CONFIG_DIR";
pub const ENV_LEVELS_UP_LIMIT: &str = "MULTIENV_CONFIG_LEVELS_UP_LIMIT";
pub const ENV_ENV_NAME: &str = "MULTIENV_ENV";

pub const CONFIG_FILE: &str = "config.json";
pub const SECRET_CONFIG_FILE: &str = "secret_config.json";
pub const DEFAULT_ENV_NAME: &str = "dev";

const CANDIDATES: [&str; 2] = [".multienv-config", "multienv-config"];
const DEFAULT_LEVELS_UP_LIMIT: usize = 5;

/// Find the directory holding `config.json`.
///
/// Search order:
/// 1. MULTIENV_CONFIG_DIR env var
/// 2. CWD/.multienv-config or CWD/multienv-config
/// 3. Walk up the directory tree (MULTIENV_CONFIG_LEVELS_UP_LIMIT, default 5)
pub fn find_config_directory() -> Result<PathBuf, ConfigError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    find_config_directory_with_env(&env)
}

/// Find the config directory using a provided env map.
pub fn find_config_directory_with_env(env: &HashMap<String, String>) -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    find_config_directory_from(&cwd, env)
}

/// Same as [`find_config_directory_with_env`], starting the search at `start`.
pub fn find_config_directory_from(start: &Path, env: &HashMap<String, String>) -> Result<PathBuf, ConfigError> {
    if let Some(config_dir) = env.get(ENV_CONFIG_DIR) {
        let dir = PathBuf::from(config_dir);
        if dir.is_dir() {
            return Ok(dir);
        }
        return Err(ConfigError::ConfigDirNotFound(format!(
            "the directory specified in {} does not exist: {}",
            ENV_CONFIG_DIR, config_dir
        )));
    }

    let levels_up_limit: usize = env
        .get(ENV_LEVELS_UP_LIMIT)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_LEVELS_UP_LIMIT);

    let mut search_dir = start;
    for level in 0..=levels_up_limit {
        if level > 0 {
            match search_dir.parent() {
                Some(parent) => search_dir = parent,
                None => break,
            }
        }
        for candidate in CANDIDATES {
            let dir = search_dir.join(candidate);
            if dir.is_dir() {
                debug!(dir = %dir.display(), level, "found config directory");
                return Ok(dir);
            }
        }
    }

    Err(ConfigError::ConfigDirNotFound(format!(
        "searched {} levels up from {}",
        levels_up_limit,
        start.display()
    )))
}

/// Name of the env to use, from MULTIENV_ENV (default `dev`).
pub fn current_env_name() -> Result<String, ConfigError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    current_env_name_with_env(&env)
}

pub fn current_env_name_with_env(env: &HashMap<String, String>) -> Result<String, ConfigError> {
    let name = env
        .get(ENV_ENV_NAME)
        .cloned()
        .unwrap_or_else(|| DEFAULT_ENV_NAME.to_string());
    validate_env_name(&name)?;
    Ok(name)
}

/// Read and parse one JSON file.
pub fn read_json_file(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `config.json` (required) and `secret_config.json` (optional, `{}` when absent).
pub fn load_documents(config_dir: &Path) -> Result<(Value, Value), ConfigError> {
    let data = read_json_file(&config_dir.join(CONFIG_FILE))?;

    let secret_path = config_dir.join(SECRET_CONFIG_FILE);
    let secret_data = if secret_path.is_file() {
        read_json_file(&secret_path)?
    } else {
        warn!(path = %secret_path.display(), "no secret config found, using an empty one");
        Value::Object(Map::new())
    };
    Ok((data, secret_data))
}

/// Load both documents from `config_dir` and compose them.
pub fn load_multi_env_config(config_dir: &Path, shared_key: &str) -> Result<MultiEnvConfig, ConfigError> {
    let (data, secret_data) = load_documents(config_dir)?;
    MultiEnvConfig::with_shared_key(data, secret_data, shared_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::DEFAULT_SHARED_KEY;
    use serde_json::json;
    use std::io::Write;

    fn make_config_dir(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let config_dir = dir.join(name);
        fs::create_dir_all(&config_dir).unwrap();
        for (name, content) in files {
            let mut f = fs::File::create(config_dir.join(name)).unwrap();
            f.write_all(content.as_bytes()).unwrap();
        }
        config_dir
    }

    fn make_env(extra: &[(&str, &str)]) -> HashMap<String, String> {
        extra.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_env_var_dir_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = make_config_dir(dir.path(), "custom", &[]);
        let env = make_env(&[(ENV_CONFIG_DIR, config_dir.to_str().unwrap())]);
        assert_eq!(find_config_directory_from(dir.path(), &env).unwrap(), config_dir);
    }

    #[test]
    fn test_env_var_dir_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let env = make_env(&[(ENV_CONFIG_DIR, missing.to_str().unwrap())]);
        let err = find_config_directory_from(dir.path(), &env).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigDirNotFound(_)));
    }

    #[test]
    fn test_finds_candidate_in_start_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = make_config_dir(dir.path(), "multienv-config", &[]);
        assert_eq!(find_config_directory_from(dir.path(), &make_env(&[])).unwrap(), config_dir);
    }

    #[test]
    fn test_hidden_candidate_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let hidden = make_config_dir(dir.path(), ".multienv-config", &[]);
        make_config_dir(dir.path(), "multienv-config", &[]);
        assert_eq!(find_config_directory_from(dir.path(), &make_env(&[])).unwrap(), hidden);
    }

    #[test]
    fn test_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = make_config_dir(dir.path(), ".multienv-config", &[]);
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_config_directory_from(&nested, &make_env(&[])).unwrap(), config_dir);
    }

    #[test]
    fn test_levels_up_limit() {
        let dir = tempfile::tempdir().unwrap();
        make_config_dir(dir.path(), ".multienv-config", &[]);
        let nested = dir.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();
        let env = make_env(&[(ENV_LEVELS_UP_LIMIT, "2")]);
        let err = find_config_directory_from(&nested, &env).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigDirNotFound(_)));
    }

    #[test]
    fn test_current_env_name() {
        assert_eq!(current_env_name_with_env(&make_env(&[])).unwrap(), "dev");
        assert_eq!(
            current_env_name_with_env(&make_env(&[(ENV_ENV_NAME, "prod")])).unwrap(),
            "prod"
        );
        assert!(current_env_name_with_env(&make_env(&[(ENV_ENV_NAME, "my_prod")])).is_err());
    }

    #[test]
    fn test_load_documents_without_secret() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = make_config_dir(
            dir.path(),
            ".multienv-config",
            &[(CONFIG_FILE, r#"{"dev":{"project_name":"my_project"}}"#)],
        );
        let (data, secret) = load_documents(&config_dir).unwrap();
        assert_eq!(data, json!({"dev": {"project_name": "my_project"}}));
        assert_eq!(secret, json!({}));
    }

    #[test]
    fn test_load_documents_requires_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = make_config_dir(dir.path(), ".multienv-config", &[]);
        let err = load_documents(&config_dir).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn test_load_documents_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = make_config_dir(
            dir.path(),
            ".multienv-config",
            &[(CONFIG_FILE, "{}"), (SECRET_CONFIG_FILE, "{not json")],
        );
        let err = load_documents(&config_dir).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn test_load_multi_env_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = make_config_dir(
            dir.path(),
            ".multienv-config",
            &[
                (
                    CONFIG_FILE,
                    r#"{"defaults":{"*.project_name":"my_project"},"dev":{"username":"dev.user"}}"#,
                ),
                (SECRET_CONFIG_FILE, r#"{"dev":{"password":"pwd"}}"#),
            ],
        );
        let config = load_multi_env_config(&config_dir, DEFAULT_SHARED_KEY).unwrap();
        let dev = config.get_env("dev").unwrap();
        assert_eq!(dev.get("username"), Some(&json!("dev.user")));
        assert_eq!(dev.get("password"), Some(&json!("pwd")));
        assert_eq!(dev.project_name(), "my_project");
    }
}
