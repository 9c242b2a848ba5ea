// src/sanitize.rs
//! Boundary sanitizer: turns dynamic response payloads into plain JSON
//! trees before transmission. Reference cycles become a `"[Circular]"`
//! marker, non-serializable leaves become descriptive placeholders, and
//! non-finite numbers become `null`. The input is never mutated.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::{json, Map, Value as Json};

/// Marker substituted for a container already seen during traversal.
pub const CIRCULAR_MARKER: &str = "[Circular]";
/// Marker substituted when the fallback tier truncates a deep branch.
pub const TRUNCATED_MARKER: &str = "[Truncated]";

/// Primary tier refuses to descend past this depth.
pub const MAX_DEPTH: usize = 64;
/// Fallback tier copies at most this many levels.
const FALLBACK_MAX_DEPTH: usize = 16;

/// Fixed-shape payload returned when no tier can produce a safe value.
pub fn error_payload() -> Json {
    json!({ "error": "Unable to process response data" })
}

/// A dynamic payload value. Lists and maps are reference-counted, so
/// aliasing (and therefore reference cycles) can occur when components
/// share or re-link subtrees while assembling a response.
#[derive(Debug, Clone)]
pub enum Raw {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Non-serializable leaf: function references, runtime handles,
    /// UI-node-like objects. Carries a short label for the placeholder.
    Opaque(&'static str),
    List(Arc<RwLock<Vec<Raw>>>),
    Map(Arc<RwLock<BTreeMap<String, Raw>>>),
}

impl Raw {
    pub fn list(items: Vec<Raw>) -> Self {
        Raw::List(Arc::new(RwLock::new(items)))
    }

    pub fn map() -> Self {
        Raw::Map(Arc::new(RwLock::new(BTreeMap::new())))
    }

    /// Insert into a map value; no-op on other variants.
    pub fn insert(&self, key: &str, value: Raw) {
        if let Raw::Map(cells) = self {
            if let Ok(mut guard) = cells.write() {
                guard.insert(key.to_string(), value);
            }
        }
    }

    /// Append to a list value; no-op on other variants.
    pub fn push(&self, value: Raw) {
        if let Raw::List(cells) = self {
            if let Ok(mut guard) = cells.write() {
                guard.push(value);
            }
        }
    }

    /// Build a `Raw` tree from parsed JSON. The result has no aliasing.
    pub fn from_json(value: &Json) -> Self {
        match value {
            Json::Null => Raw::Null,
            Json::Bool(b) => Raw::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Raw::Int(i)
                } else {
                    Raw::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Json::String(s) => Raw::Str(s.clone()),
            Json::Array(items) => Raw::list(items.iter().map(Raw::from_json).collect()),
            Json::Object(map) => {
                let out = Raw::map();
                for (k, v) in map {
                    out.insert(k, Raw::from_json(v));
                }
                out
            }
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("payload exceeds maximum depth {}", MAX_DEPTH)]
    DepthExceeded,
    #[error("payload container lock poisoned")]
    Poisoned,
}

/// Primary sanitize pass. Falls back to [`sanitize_fallback`] when the
/// structural traversal itself errors, so callers always get a value.
pub fn sanitize(value: &Raw) -> Raw {
    let mut visited: HashSet<usize> = HashSet::new();
    match sanitize_checked(value, &mut visited, 0) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(error = %err, "primary sanitize failed; using fallback copy");
            sanitize_fallback(value)
        }
    }
}

fn sanitize_checked(
    value: &Raw,
    visited: &mut HashSet<usize>,
    depth: usize,
) -> Result<Raw, SanitizeError> {
    if depth > MAX_DEPTH {
        return Err(SanitizeError::DepthExceeded);
    }
    match value {
        Raw::Null => Ok(Raw::Null),
        Raw::Bool(b) => Ok(Raw::Bool(*b)),
        Raw::Int(i) => Ok(Raw::Int(*i)),
        Raw::Float(f) => {
            if f.is_finite() {
                Ok(Raw::Float(*f))
            } else {
                Ok(Raw::Null)
            }
        }
        Raw::Str(s) => Ok(Raw::Str(s.clone())),
        Raw::Opaque(label) => Ok(Raw::Str(format!("[Unserializable: {label}]"))),
        Raw::List(cells) => {
            // Identity, not value equality: two lists with equal contents
            // are distinct; the same Arc seen twice is a repeat visit.
            if !visited.insert(Arc::as_ptr(cells) as usize) {
                return Ok(Raw::Str(CIRCULAR_MARKER.to_string()));
            }
            let guard = cells.read().map_err(|_| SanitizeError::Poisoned)?;
            let mut out = Vec::with_capacity(guard.len());
            for item in guard.iter() {
                out.push(sanitize_checked(item, visited, depth + 1)?);
            }
            Ok(Raw::list(out))
        }
        Raw::Map(cells) => {
            if !visited.insert(Arc::as_ptr(cells) as usize) {
                return Ok(Raw::Str(CIRCULAR_MARKER.to_string()));
            }
            let guard = cells.read().map_err(|_| SanitizeError::Poisoned)?;
            let out = Raw::map();
            for (k, v) in guard.iter() {
                out.insert(k, sanitize_checked(v, visited, depth + 1)?);
            }
            Ok(out)
        }
    }
}

/// Fallback tier: manual recursive copy that skips known-bad values and
/// truncates at a fixed depth. Used only when the primary tier errors;
/// must stay independent of it.
pub fn sanitize_fallback(value: &Raw) -> Raw {
    fallback_copy(value, 0)
}

fn fallback_copy(value: &Raw, depth: usize) -> Raw {
    if depth > FALLBACK_MAX_DEPTH {
        return Raw::Str(TRUNCATED_MARKER.to_string());
    }
    match value {
        Raw::Null => Raw::Null,
        Raw::Bool(b) => Raw::Bool(*b),
        Raw::Int(i) => Raw::Int(*i),
        Raw::Float(f) => {
            if f.is_finite() {
                Raw::Float(*f)
            } else {
                Raw::Null
            }
        }
        Raw::Str(s) => Raw::Str(s.clone()),
        // Known-bad leaves are dropped entirely in this tier.
        Raw::Opaque(_) => Raw::Null,
        Raw::List(cells) => match cells.try_read() {
            Ok(guard) => Raw::list(
                guard
                    .iter()
                    .filter(|v| !matches!(v, Raw::Opaque(_)))
                    .map(|v| fallback_copy(v, depth + 1))
                    .collect(),
            ),
            Err(_) => Raw::Str(TRUNCATED_MARKER.to_string()),
        },
        Raw::Map(cells) => match cells.try_read() {
            Ok(guard) => {
                let out = Raw::map();
                for (k, v) in guard.iter() {
                    if matches!(v, Raw::Opaque(_)) {
                        continue;
                    }
                    out.insert(k, fallback_copy(v, depth + 1));
                }
                out
            }
            Err(_) => Raw::Str(TRUNCATED_MARKER.to_string()),
        },
    }
}

/// Convert a sanitized `Raw` tree into `serde_json::Value`. Safe on any
/// input: residual opaque leaves and unreadable containers still map to
/// placeholders rather than errors.
pub fn into_json(value: &Raw) -> Json {
    match value {
        Raw::Null => Json::Null,
        Raw::Bool(b) => Json::Bool(*b),
        Raw::Int(i) => json!(i),
        Raw::Float(f) => {
            if f.is_finite() {
                json!(f)
            } else {
                Json::Null
            }
        }
        Raw::Str(s) => Json::String(s.clone()),
        Raw::Opaque(label) => Json::String(format!("[Unserializable: {label}]")),
        Raw::List(cells) => match cells.read() {
            Ok(guard) => Json::Array(guard.iter().map(into_json).collect()),
            Err(_) => Json::String(TRUNCATED_MARKER.to_string()),
        },
        Raw::Map(cells) => match cells.read() {
            Ok(guard) => {
                let mut out = Map::with_capacity(guard.len());
                for (k, v) in guard.iter() {
                    out.insert(k.clone(), into_json(v));
                }
                Json::Object(out)
            }
            Err(_) => Json::String(TRUNCATED_MARKER.to_string()),
        },
    }
}

/// Serialize a typed payload through the sanitizer. This is the single
/// path every HTTP response body takes; serialization failure yields the
/// fixed-shape error payload instead of a 5xx.
pub fn safe_json<T: Serialize>(payload: &T) -> Json {
    match serde_json::to_value(payload) {
        Ok(plain) => into_json(&sanitize(&Raw::from_json(&plain))),
        Err(err) => {
            tracing::warn!(error = %err, "response serialization failed");
            error_payload()
        }
    }
}
