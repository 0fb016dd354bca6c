//! Path writes into context values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tether_core::{format_path, PathSegment, Value};

use crate::context::NodeId;

/// How far past an array's end a `Create` write may pad with `null`.
pub const MAX_ARRAY_GROWTH: usize = 4096;

/// Whether a write may build structure that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Create missing objects and arrays (padding arrays with `null`) and
    /// overwrite scalars that stand in the way.
    #[default]
    Create,
    /// Only write through containers that already exist. The final
    /// segment may add a key to an existing object or append at an
    /// array's length.
    Existing,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("no context '{context_id}' is visible from node {node:?}")]
    TargetMissing { context_id: String, node: NodeId },
    #[error("path '{path}' cannot be reached in context '{context_id}'")]
    PathUnreachable { context_id: String, path: String },
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Result of a successful write and the cascade it triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Node declaring the context that was written.
    pub owner: NodeId,
    /// Callbacks invoked while settling, queued writes included.
    pub notified: usize,
}

/// Write `value` at `path` inside `target`. Returns `false`, leaving
/// `target` untouched, when the policy forbids reaching the path or an
/// index lies more than [`MAX_ARRAY_GROWTH`] slots past the end.
pub fn write_path(
    target: &mut Value,
    path: &[PathSegment],
    value: Value,
    policy: WritePolicy,
) -> bool {
    if !within_growth(target, path) {
        return false;
    }
    write_checked(target, path, value, policy)
}

/// Walks the existing structure to check every index before anything is
/// created, so a refused write leaves no partial padding behind.
fn within_growth(target: &Value, path: &[PathSegment]) -> bool {
    let mut current = Some(target);
    for segment in path {
        match (segment, current) {
            (PathSegment::Index(index), Some(Value::Array(items))) => {
                if *index > items.len().saturating_add(MAX_ARRAY_GROWTH) {
                    return false;
                }
                current = items.get(*index);
            }
            (PathSegment::Index(index), _) => {
                if *index > MAX_ARRAY_GROWTH {
                    return false;
                }
                current = None;
            }
            (PathSegment::Key(key), Some(Value::Object(fields))) => current = fields.get(key),
            (PathSegment::Key(_), _) => current = None,
        }
    }
    true
}

fn write_checked(
    target: &mut Value,
    path: &[PathSegment],
    value: Value,
    policy: WritePolicy,
) -> bool {
    let Some((head, rest)) = path.split_first() else {
        *target = value;
        return true;
    };
    let create = policy == WritePolicy::Create;

    match head {
        PathSegment::Key(key) => {
            if !matches!(target, Value::Object(_)) {
                if !create {
                    return false;
                }
                *target = Value::Object(BTreeMap::new());
            }
            let Value::Object(fields) = target else {
                return false;
            };
            if rest.is_empty() {
                fields.insert(key.clone(), value);
                return true;
            }
            if !fields.contains_key(key) {
                if !create {
                    return false;
                }
                fields.insert(key.clone(), empty_container(&rest[0]));
            }
            match fields.get_mut(key) {
                Some(child) => write_checked(child, rest, value, policy),
                None => false,
            }
        }
        PathSegment::Index(index) => {
            let index = *index;
            if !matches!(target, Value::Array(_)) {
                if !create {
                    return false;
                }
                *target = Value::Array(Vec::new());
            }
            let Value::Array(items) = target else {
                return false;
            };
            if index >= items.len() {
                if create {
                    let Some(len) = index.checked_add(1) else {
                        return false;
                    };
                    items.resize(len, Value::Null);
                } else if rest.is_empty() && index == items.len() {
                    items.push(value);
                    return true;
                } else {
                    return false;
                }
            }
            match items.get_mut(index) {
                Some(slot) => write_checked(slot, rest, value, policy),
                None => false,
            }
        }
    }
}

fn empty_container(next: &PathSegment) -> Value {
    match next {
        PathSegment::Key(_) => Value::Object(BTreeMap::new()),
        PathSegment::Index(_) => Value::Array(Vec::new()),
    }
}

pub(crate) fn path_unreachable(context_id: &str, path: &[PathSegment]) -> MutationError {
    MutationError::PathUnreachable {
        context_id: context_id.to_string(),
        path: format_path(path),
    }
}
