//! Domain types shared by the engine and its callers.
//!
//! A [`Reference`] is the parsed form of an `@kind:value` token. Parsing is
//! strict about the kind (`[A-Za-z_][A-Za-z0-9_]*`) and takes the value as
//! everything up to the first whitespace character.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ResolveError;

/// Caller-owned variables passed unchanged to every resolver invocation.
pub type Context = BTreeMap<String, Value>;

/// Render a context value as plain text: strings verbatim, `null` as empty,
/// everything else as its JSON text.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Reference
// ---------------------------------------------------------------------------

/// A parsed `@kind:value` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    kind: String,
    value: String,
}

impl Reference {
    /// Build a reference from parts, validating both against the grammar.
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Result<Self, ResolveError> {
        let kind = kind.into();
        let value = value.into();
        if !is_valid_kind(&kind) || value.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(ResolveError::InvalidReference(format!("@{kind}:{value}")));
        }
        Ok(Self { kind, value })
    }

    /// Parse a literal. The input must start with `@`; the value runs to the
    /// first whitespace character and anything after it is ignored.
    pub fn parse(literal: &str) -> Result<Self, ResolveError> {
        let invalid = || ResolveError::InvalidReference(literal.to_string());

        let rest = literal.strip_prefix('@').ok_or_else(invalid)?;
        let (kind, tail) = rest.split_once(':').ok_or_else(invalid)?;
        if !is_valid_kind(kind) {
            return Err(invalid());
        }
        let value = tail
            .split(char::is_whitespace)
            .next()
            .unwrap_or_default();
        if value.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            kind: kind.to_string(),
            value: value.to_string(),
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The canonical literal form, `@kind:value`.
    pub fn literal(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}:{}", self.kind, self.value)
    }
}

impl FromStr for Reference {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reference::parse(s)
    }
}

/// `true` if `kind` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_kind(kind: &str) -> bool {
    let mut chars = kind.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// Cache statistics
// ---------------------------------------------------------------------------

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    /// `hits / (hits + misses)`, `0.0` before the first lookup.
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64, size: usize) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        Self {
            hits,
            misses,
            size,
            hit_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
