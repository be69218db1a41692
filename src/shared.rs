//! Shared-value propagation.
//!
//! A shared block is a reserved key (`"defaults"` unless configured otherwise)
//! whose value maps path expressions to default values:
//!
//! ```json
//! {
//!     "defaults": { "*.servers.*.cpu": 1 },
//!     "dev":  { "servers": { "blue": {}, "green": { "cpu": 4 } } },
//!     "prod": { "servers": { "black": {} } }
//! }
//! ```
//!
//! Paths are scoped to the object that holds the block. Values are only ever
//! written where the target key is absent, and blocks are processed deepest
//! first, so a more specific default always claims a slot before a broader one.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{kind_name, ComposeError};
use crate::path::{Segment, SharedPath};

/// Reserved key for shared blocks.
pub const DEFAULT_SHARED_KEY: &str = "defaults";

/// Set `value` at every location `path` selects in `tree`, keeping existing values.
///
/// Arrays broadcast the remaining path to each element, `*` fans out over every
/// value of an object, and only the final key is ever created. Consumes `tree`
/// and returns it with the defaults filled in.
pub fn set_at_path(mut tree: Value, path: &str, value: &Value) -> Result<Value, ComposeError> {
    let path: SharedPath = path.parse()?;
    path.apply_to(&mut tree, value)?;
    Ok(tree)
}

/// Resolve every `"defaults"` block in `tree`, removing the blocks.
pub fn apply_shared_blocks(tree: Value) -> Result<Value, ComposeError> {
    apply_shared_blocks_with_key(tree, DEFAULT_SHARED_KEY)
}

/// Resolve every shared block stored under `shared_key`.
pub fn apply_shared_blocks_with_key(mut tree: Value, shared_key: &str) -> Result<Value, ComposeError> {
    resolve_blocks(&mut tree, shared_key)?;
    Ok(tree)
}

impl SharedPath {
    /// Write `value` into `tree` in place.
    ///
    /// On error `tree` may already hold some of the defaults: fan-out visits
    /// siblings in order and nothing is rolled back.
    pub fn apply_to(&self, tree: &mut Value, value: &Value) -> Result<(), ComposeError> {
        match tree {
            Value::Object(_) | Value::Array(_) => {}
            other => {
                return Err(ComposeError::UnsupportedRootType {
                    path: self.to_string(),
                    found: kind_name(other),
                })
            }
        }
        descend(tree, self.segments(), value, self)
    }
}

fn descend(node: &mut Value, segments: &[Segment], value: &Value, path: &SharedPath) -> Result<(), ComposeError> {
    let (segment, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };

    match node {
        Value::Array(items) => {
            for item in items.iter_mut() {
                descend(item, segments, value, path)?;
            }
            Ok(())
        }
        Value::Object(map) => match segment {
            Segment::Wildcard => {
                for child in map.values_mut() {
                    ensure_navigable(child, segment, path)?;
                    descend(child, rest, value, path)?;
                }
                Ok(())
            }
            Segment::Key(key) if rest.is_empty() => {
                if !map.contains_key(key) {
                    map.insert(key.clone(), value.clone());
                }
                Ok(())
            }
            Segment::Key(key) => match map.get_mut(key) {
                None => Err(ComposeError::MissingIntermediateKey {
                    path: path.to_string(),
                    key: key.clone(),
                }),
                Some(child) => {
                    ensure_navigable(child, segment, path)?;
                    descend(child, rest, value, path)
                }
            },
        },
        // array elements are the only way to reach a scalar here
        other => Err(ComposeError::NonNavigableNode {
            path: path.to_string(),
            segment: segment.to_string(),
            found: kind_name(other),
        }),
    }
}

fn ensure_navigable(node: &Value, segment: &Segment, path: &SharedPath) -> Result<(), ComposeError> {
    match node {
        Value::Object(_) | Value::Array(_) => Ok(()),
        other => Err(ComposeError::NonNavigableNode {
            path: path.to_string(),
            segment: segment.to_string(),
            found: kind_name(other),
        }),
    }
}

fn resolve_blocks(node: &mut Value, shared_key: &str) -> Result<(), ComposeError> {
    match node {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key != shared_key {
                    resolve_blocks(child, shared_key)?;
                }
            }
            let block = match map.shift_remove(shared_key) {
                Some(block) => block,
                None => return Ok(()),
            };
            let entries = parse_block(block, shared_key)?;
            debug!(entries = entries.len(), key = shared_key, "applying shared block");
            for (path, value) in &entries {
                path.apply_to(node, value)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                resolve_blocks(item, shared_key)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn parse_block(block: Value, shared_key: &str) -> Result<Vec<(SharedPath, Value)>, ComposeError> {
    let entries: Map<String, Value> = match block {
        Value::Object(entries) => entries,
        other => {
            return Err(ComposeError::InvalidSharedBlock {
                key: shared_key.to_string(),
                reason: format!("expected an object of path -> value, got a {}", kind_name(&other)),
            })
        }
    };

    entries
        .into_iter()
        .map(|(raw, mut value)| {
            let path = raw.parse::<SharedPath>().map_err(|e| ComposeError::InvalidSharedBlock {
                key: shared_key.to_string(),
                reason: e.to_string(),
            })?;
            if path.target_key() == Some(shared_key) {
                return Err(ComposeError::InvalidSharedBlock {
                    key: shared_key.to_string(),
                    reason: format!("entry {:?} would write the reserved key back into the tree", raw),
                });
            }
            // defaults are inserted verbatim, so their own blocks go first
            resolve_blocks(&mut value, shared_key)?;
            Ok((path, value))
        })
        .collect()
}
