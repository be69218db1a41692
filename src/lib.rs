//! Hierarchical multi-environment JSON configuration.
//!
//! Documents are keyed by env name and may carry shared blocks at any depth.
//! A shared block maps dotted path expressions (with `*` wildcards) to default
//! values, which are filled into every matching position that does not
//! already define the key. The non-secret and secret documents are then merged
//! strictly: objects union, equal-length arrays merge element-wise, and a leaf
//! defined on both sides is an error.
//!
//! ```
//! use multienv_config::{apply_shared_blocks, merge};
//! use serde_json::json;
//!
//! let data = apply_shared_blocks(json!({
//!     "defaults": {"*.username": "admin"},
//!     "dev": {},
//!     "prod": {"username": "root"},
//! }))
//! .unwrap();
//! let secret = json!({"dev": {"password": "dev.pwd"}, "prod": {"password": "prod.pwd"}});
//!
//! let config = merge(data, secret).unwrap();
//! assert_eq!(config["dev"], json!({"username": "admin", "password": "dev.pwd"}));
//! assert_eq!(config["prod"]["username"], json!("root"));
//! ```

pub mod error;
pub mod file_config;
pub mod local;
pub mod logging;
pub mod merge;
pub mod multi_env;
pub mod path;
pub mod shared;
pub mod store;
pub mod utils;

pub use error::{ComposeError, ConfigError, ErrorClass};
pub use file_config::{find_config_directory, find_config_directory_with_env, load_multi_env_config};
pub use local::LocalConfigManager;
pub use merge::{compose, merge};
pub use multi_env::{Deployment, EnvConfig, MultiEnvConfig};
pub use path::{Segment, SharedPath};
pub use shared::{apply_shared_blocks, apply_shared_blocks_with_key, set_at_path, DEFAULT_SHARED_KEY};
pub use store::{ConfigStore, LocalDirStore, StoredConfig, StoredVersion};
pub use utils::{normalize_parameter_name, slugify, validate_env_name, validate_project_name};
