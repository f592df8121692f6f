use crate::engine::config::KeyMatchMode;
use crate::model::{NodeId, NodeTree, Scalar, ScalarTag};
use fancy_regex::Regex;
use lru::LruCache;
use core::fmt;
use std::num::NonZeroUsize;

/// Typed view of a map key or wanted key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl KeyValue {
    /// Key of the scalar at `id`; `None` for containers.
    pub fn of(tree: &NodeTree, id: NodeId) -> Option<Self> {
        let scalar = tree.scalar(tree.resolve(id))?;
        Some(match scalar.tag {
            ScalarTag::Null => KeyValue::Null,
            ScalarTag::Bool => KeyValue::Bool(scalar.is_truthy()),
            ScalarTag::Int => match scalar.as_i64() {
                Some(i) => KeyValue::Int(i),
                None => KeyValue::Str(scalar.value.clone()),
            },
            ScalarTag::Float => match scalar.as_f64() {
                Some(f) => KeyValue::Float(f),
                None => KeyValue::Str(scalar.value.clone()),
            },
            ScalarTag::Str | ScalarTag::Timestamp | ScalarTag::Merge => {
                KeyValue::Str(scalar.value.clone())
            }
        })
    }

    /// Scalar for a synthesized key node of the same runtime type.
    pub fn to_scalar(&self) -> Scalar {
        match self {
            KeyValue::Str(s) => Scalar::string(s.as_str()),
            KeyValue::Int(i) => Scalar::int(*i),
            KeyValue::Float(x) => Scalar::float(*x),
            KeyValue::Bool(b) => Scalar::bool(*b),
            KeyValue::Null => Scalar::null(),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Str(s) => f.write_str(s),
            KeyValue::Int(i) => write!(f, "{i}"),
            KeyValue::Float(x) => write!(f, "{x}"),
            KeyValue::Bool(b) => write!(f, "{b}"),
            KeyValue::Null => f.write_str("null"),
        }
    }
}

/// Compares map keys against wanted keys. Glob patterns are compiled once and
/// kept in a bounded cache.
pub struct KeyMatcher {
    mode: KeyMatchMode,
    patterns: LruCache<String, Option<Regex>>,
}

impl KeyMatcher {
    pub fn new(mode: KeyMatchMode, capacity: NonZeroUsize) -> Self {
        Self { mode, patterns: LruCache::new(capacity) }
    }

    pub fn mode(&self) -> KeyMatchMode {
        self.mode
    }

    pub fn matches(&mut self, actual: &KeyValue, wanted: &KeyValue) -> bool {
        match (actual, wanted) {
            (KeyValue::Str(actual), KeyValue::Str(wanted)) => self.matches_str(actual, wanted),
            (KeyValue::Int(a), KeyValue::Float(b)) | (KeyValue::Float(b), KeyValue::Int(a)) => {
                (*a as f64) == *b
            }
            (a, b) => a == b,
        }
    }

    pub fn matches_str(&mut self, actual: &str, wanted: &str) -> bool {
        if self.mode == KeyMatchMode::Exact || !wanted.contains('*') {
            return actual == wanted;
        }
        if wanted == "*" {
            return true;
        }
        let regex = self.patterns.get_or_insert(wanted.to_string(), || glob_to_regex(wanted));
        match regex {
            Some(re) => re.is_match(actual).unwrap_or(false),
            None => false,
        }
    }
}

fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let body = pattern.split('*').map(fancy_regex::escape).collect::<Vec<_>>().join(".*");
    match Regex::new(&format!("^(?s){body}$")) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::debug!(pattern, error = %e, "key pattern did not compile");
            None
        }
    }
}
