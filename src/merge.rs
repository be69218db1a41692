//! Strict deep merge of two same-shaped documents.
//!
//! Used to lay secret config over non-secret config. Unlike an override merge
//! there is no winner: objects union their keys, equal-length arrays merge
//! element by element, and any leaf defined on both sides is an error.

use serde_json::Value;

use crate::error::{kind_name, ComposeError};
use crate::shared::apply_shared_blocks_with_key;

/// Deep merge where objects union, arrays zip, and colliding leaves fail.
pub fn merge(left: Value, right: Value) -> Result<Value, ComposeError> {
    merge_at(left, right, &mut Location::root())
}

/// Resolve the shared blocks of both documents, then merge them.
///
/// This is the full composition step for a non-secret document and its
/// secret counterpart.
pub fn compose(data: Value, secret_data: Value, shared_key: &str) -> Result<Value, ComposeError> {
    let data = apply_shared_blocks_with_key(data, shared_key)?;
    let secret_data = apply_shared_blocks_with_key(secret_data, shared_key)?;
    merge(data, secret_data)
}

fn merge_at(left: Value, right: Value, at: &mut Location) -> Result<Value, ComposeError> {
    match (left, right) {
        // Objects: union of keys, shared keys recurse
        (Value::Object(left_map), Value::Object(right_map)) => {
            let mut result = left_map;
            for (key, right_value) in right_map {
                let merged = match result.get_mut(&key) {
                    Some(slot) => {
                        let left_value = std::mem::take(slot);
                        at.push_key(&key);
                        let merged = merge_at(left_value, right_value, at)?;
                        at.pop();
                        merged
                    }
                    None => right_value,
                };
                // preserve_order: inserting an existing key keeps its slot
                result.insert(key, merged);
            }
            Ok(Value::Object(result))
        }

        // Arrays: positional, lengths must agree
        (Value::Array(left_items), Value::Array(right_items)) => {
            if left_items.len() != right_items.len() {
                return Err(ComposeError::ArrayLengthMismatch {
                    at: at.to_string(),
                    left: left_items.len(),
                    right: right_items.len(),
                });
            }
            let mut result = Vec::with_capacity(left_items.len());
            for (index, (l, r)) in left_items.into_iter().zip(right_items).enumerate() {
                at.push_index(index);
                result.push(merge_at(l, r, at)?);
                at.pop();
            }
            Ok(Value::Array(result))
        }

        // Everything else is a leaf collision or a shape mismatch
        (left, right) => Err(ComposeError::AmbiguousScalarMerge {
            at: at.to_string(),
            left: kind_name(&left),
            right: kind_name(&right),
        }),
    }
}

/// Breadcrumb of the position being merged, rendered as `a.b[1].c`.
#[derive(Debug, Default)]
struct Location {
    steps: Vec<Step>,
}

#[derive(Debug)]
enum Step {
    Key(String),
    Index(usize),
}

impl Location {
    fn root() -> Self {
        Self::default()
    }

    fn push_key(&mut self, key: &str) {
        self.steps.push(Step::Key(key.to_string()));
    }

    fn push_index(&mut self, index: usize) {
        self.steps.push(Step::Index(index));
    }

    fn pop(&mut self) {
        self.steps.pop();
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("<root>");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                Step::Key(key) if i == 0 => write!(f, "{}", key)?,
                Step::Key(key) => write!(f, ".{}", key)?,
                Step::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}
