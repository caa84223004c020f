//! Token scanning and `{{var}}` substitution.
//!
//! Both scanners walk the text left to right and never overlap matches, so
//! substitution order is always discovery order.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use weave_core::{value_to_text, Context};

/// `@kind:value`, value running to the next whitespace.
static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[A-Za-z_][A-Za-z0-9_]*:\S+").unwrap());

/// `{{ name }}` with optional inner whitespace.
static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").unwrap());

/// A reference token found in a larger text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    /// Byte range of the token within the scanned text.
    pub range: Range<usize>,
    /// The literal token, e.g. `@doc:a.md`.
    pub token: String,
}

/// All reference tokens in `text`, in left-to-right order.
pub fn find_references(text: &str) -> Vec<TokenMatch> {
    REFERENCE_RE
        .find_iter(text)
        .map(|m| TokenMatch {
            range: m.range(),
            token: m.as_str().to_string(),
        })
        .collect()
}

/// `true` if `text` contains at least one reference token.
pub fn has_references(text: &str) -> bool {
    REFERENCE_RE.is_match(text)
}

/// Rebuild `text` with every token replaced by `replace(token)`.
///
/// Stops at the first error and returns it; no partial text escapes.
pub fn replace_references<E>(
    text: &str,
    mut replace: impl FnMut(&str) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for m in REFERENCE_RE.find_iter(text) {
        out.push_str(&text[cursor..m.start()]);
        out.push_str(&replace(m.as_str())?);
        cursor = m.end();
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// Fill `{{name}}` placeholders from `context`. Missing names render empty.
pub fn substitute_variables(template: &str, context: &Context) -> String {
    VARIABLE_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            context
                .get(&caps[1])
                .map(value_to_text)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Placeholder names used in `template`, first occurrence order, no repeats.
pub fn template_variables(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in VARIABLE_RE.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
