//! Streaming YAML emission.
//!
//! [`YamlWriter`] keeps a single text buffer and an indentation depth. Every write method
//! returns `&mut Self` so nested structures can be written as one chain; the first error
//! is latched and turns every later call into a no-op, and [`YamlWriter::finish`] hands
//! it back to the caller.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;

const INDENT: &str = "  ";

/// Fixed verb priority; verbs outside this list sort after it alphabetically.
pub const VERB_ORDER: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

/// A value that can be written as a scalar field.
pub trait Scalar {
    /// Empty defaults (`""`, `false`, zero, `None`) are not written at all.
    fn is_blank(&self) -> bool;

    /// Inline YAML text of the value.
    fn render(&self) -> String;

    /// Text that needs a block scalar, if any.
    fn multiline(&self) -> Option<&str> {
        None
    }
}

impl Scalar for str {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }

    fn render(&self) -> String {
        quote(self)
    }

    fn multiline(&self) -> Option<&str> {
        self.contains('\n').then_some(self)
    }
}

impl Scalar for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }

    fn render(&self) -> String {
        quote(self)
    }

    fn multiline(&self) -> Option<&str> {
        self.as_str().multiline()
    }
}

impl Scalar for bool {
    fn is_blank(&self) -> bool {
        !*self
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

macro_rules! integer_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                fn is_blank(&self) -> bool {
                    *self == 0
                }

                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

integer_scalar!(i32, i64, u16, u32, u64, usize);

impl Scalar for f64 {
    fn is_blank(&self) -> bool {
        *self == 0.0
    }

    fn render(&self) -> String {
        format_float(*self)
    }
}

impl<T: Scalar + ?Sized> Scalar for &T {
    fn is_blank(&self) -> bool {
        (**self).is_blank()
    }

    fn render(&self) -> String {
        (**self).render()
    }

    fn multiline(&self) -> Option<&str> {
        (**self).multiline()
    }
}

impl<T: Scalar> Scalar for Option<T> {
    fn is_blank(&self) -> bool {
        self.as_ref().map_or(true, Scalar::is_blank)
    }

    fn render(&self) -> String {
        self.as_ref().map(Scalar::render).unwrap_or_default()
    }

    fn multiline(&self) -> Option<&str> {
        self.as_ref().and_then(Scalar::multiline)
    }
}

/// Integral values print as integers, everything else with six decimals.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        ".nan".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { ".inf" } else { "-.inf" };
        text.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.6}", value)
    }
}

/// Double-quoted scalar with JSON escaping, which YAML accepts as is.
fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text.escape_default()))
}

/// Whether `text` reads back unchanged from a folded `>-` block.
///
/// Indentation, edge whitespace and trailing breaks are not preserved by folding; such
/// text is written as a quoted scalar instead.
fn folds_cleanly(text: &str) -> bool {
    !text.starts_with('\n')
        && !text.ends_with('\n')
        && !text.chars().any(|c| c.is_control() && c != '\n')
        && text.split('\n').all(|line| {
            !line.starts_with(char::is_whitespace) && !line.ends_with(char::is_whitespace)
        })
}

/// Mapping keys stay bare when YAML would read them back as the same plain string.
pub fn key(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '$'));
    let reserved = matches!(
        name.to_ascii_lowercase().as_str(),
        "true" | "false" | "null" | "yes" | "no" | "on" | "off" | "y" | "n"
    );
    if plain && !reserved {
        name.to_string()
    } else {
        quote(name)
    }
}

fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() => format_float(f),
            _ => n.to_string(),
        }),
        Value::String(s) => Some(quote(s)),
        Value::Array(items) if items.is_empty() => Some("[]".to_string()),
        Value::Object(map) if map.is_empty() => Some("{}".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Error-sticky, indentation-tracking YAML writer.
#[derive(Debug, Default)]
pub struct YamlWriter {
    out: String,
    depth: usize,
    open: usize,
    error: Option<Error>,
}

impl YamlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Latches `error` unless an earlier one is already latched.
    pub fn fail(&mut self, error: Error) -> &mut Self {
        if self.error.is_none() {
            log::debug!("Writer failed: {}", error);
            self.error = Some(error);
        }
        self
    }

    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Opens a nested mapping under `name`.
    pub fn block(&mut self, name: &str) -> &mut Self {
        if self.is_failed() {
            return self;
        }
        self.line(self.depth, &format!("{}:", key(name)));
        self.depth += 1;
        self.open += 1;
        self
    }

    /// Closes the innermost block opened by [`block`](Self::block) or
    /// [`item_block`](Self::item_block).
    pub fn end(&mut self) -> &mut Self {
        if self.is_failed() {
            return self;
        }
        if self.open == 0 {
            return self.fail(Error::UnbalancedBlock);
        }
        self.open -= 1;
        self.depth -= 1;
        self
    }

    /// Writes `name: value`, or nothing when the value is blank.
    pub fn field<S: Scalar + ?Sized>(&mut self, name: &str, value: &S) -> &mut Self {
        if self.is_failed() || value.is_blank() {
            return self;
        }
        match value.multiline() {
            Some(text) if folds_cleanly(text) => {
                self.line(self.depth, &format!("{}: >-", key(name)));
                // Folded scalars join single line breaks, so each break is doubled.
                let mut first = true;
                for part in text.split('\n') {
                    if !first {
                        self.out.push('\n');
                    }
                    first = false;
                    if part.is_empty() {
                        continue;
                    }
                    self.line(self.depth + 1, part);
                }
            }
            _ => {
                let rendered = value.render();
                self.line(self.depth, &format!("{}: {}", key(name), rendered));
            }
        }
        self
    }

    /// Writes `name: value` with the value unquoted; for internal constants only.
    pub fn keyword(&mut self, name: &str, value: &str) -> &mut Self {
        if self.is_failed() || value.is_empty() {
            return self;
        }
        self.line(self.depth, &format!("{}: {}", key(name), value));
        self
    }

    /// Writes a sequence entry.
    pub fn item<S: Scalar + ?Sized>(&mut self, value: &S) -> &mut Self {
        if self.is_failed() {
            return self;
        }
        let rendered = value.render();
        self.line(self.depth, &format!("- {}", rendered));
        self
    }

    /// Writes a sequence entry that starts a mapping; further fields belong to the entry
    /// until the matching [`end`](Self::end).
    pub fn item_block<S: Scalar + ?Sized>(&mut self, name: &str, value: &S) -> &mut Self {
        if self.is_failed() {
            return self;
        }
        let rendered = value.render();
        self.line(self.depth, &format!("- {}: {}", key(name), rendered));
        self.depth += 1;
        self.open += 1;
        self
    }

    /// Starts a sequence entry holding a mapping whose first key is not known yet.
    pub fn item_open(&mut self) -> &mut Self {
        if self.is_failed() {
            return self;
        }
        self.line(self.depth, "-");
        self.depth += 1;
        self.open += 1;
        self
    }

    /// Writes a list of strings under `name`, or nothing when it is empty.
    pub fn list<S: AsRef<str>>(&mut self, name: &str, values: &[S]) -> &mut Self {
        if self.is_failed() || values.is_empty() {
            return self;
        }
        self.block(name);
        for value in values {
            self.item(value.as_ref());
        }
        self.end()
    }

    /// Writes pre-formatted lines at the current depth, as they are.
    pub fn raw<S: AsRef<str>>(&mut self, lines: &[S]) -> &mut Self {
        if self.is_failed() {
            return self;
        }
        for text in lines {
            self.line(self.depth, text.as_ref());
        }
        self
    }

    /// Writes an arbitrary JSON value under `name`, nesting objects and arrays.
    pub fn value(&mut self, name: &str, value: &Value) -> &mut Self {
        if self.is_failed() {
            return self;
        }
        let mut lines = Vec::new();
        entry_lines(name, value, 0, &mut lines);
        let depth = self.depth;
        for text in &lines {
            self.line(depth, text);
        }
        self
    }

    /// Returns the document, or the first latched error.
    pub fn finish(self) -> Result<String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.out),
        }
    }
}

fn indent(depth: usize) -> String {
    INDENT.repeat(depth)
}

fn entry_lines(name: &str, value: &Value, depth: usize, lines: &mut Vec<String>) {
    let pad = indent(depth);
    if let Some(scalar) = json_scalar(value) {
        lines.push(format!("{}{}: {}", pad, key(name), scalar));
        return;
    }
    lines.push(format!("{}{}:", pad, key(name)));
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                entry_lines(k, v, depth + 1, lines);
            }
        }
        Value::Array(items) => {
            for item in items {
                item_lines(item, depth + 1, lines);
            }
        }
        _ => {}
    }
}

/// A sequence entry; nested mappings and sequences start on the dash line.
fn item_lines(value: &Value, depth: usize, lines: &mut Vec<String>) {
    let pad = indent(depth);
    if let Some(scalar) = json_scalar(value) {
        lines.push(format!("{}- {}", pad, scalar));
        return;
    }

    let mut nested = Vec::new();
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                entry_lines(k, v, depth + 1, &mut nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                item_lines(item, depth + 1, &mut nested);
            }
        }
        _ => {}
    }

    let inner = indent(depth + 1);
    for (idx, text) in nested.into_iter().enumerate() {
        if idx == 0 {
            let rest = text.strip_prefix(inner.as_str()).unwrap_or(&text);
            lines.push(format!("{}- {}", pad, rest));
        } else {
            lines.push(text);
        }
    }
}

/// Sort key for an HTTP verb.
pub fn verb_rank(verb: &str) -> (usize, String) {
    let upper = verb.to_ascii_uppercase();
    let rank = VERB_ORDER
        .iter()
        .position(|v| *v == upper)
        .unwrap_or(VERB_ORDER.len());
    (rank, upper)
}

/// Map entries ordered by verb priority.
pub fn sorted_verbs<V>(map: &HashMap<String, V>) -> Vec<(&str, &V)> {
    let mut entries: Vec<(&str, &V)> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|(a, _), (b, _)| verb_rank(a).cmp(&verb_rank(b)).then_with(|| a.cmp(b)));
    entries
}

/// Map entries ordered by numeric status code.
pub fn sorted_codes<V>(map: &HashMap<u16, V>) -> Vec<(u16, &V)> {
    let mut entries: Vec<(u16, &V)> = map.iter().map(|(k, v)| (*k, v)).collect();
    entries.sort_by_key(|(code, _)| *code);
    entries
}

/// Items ordered by the name `name_of` returns.
pub fn sorted_by_name<'a, T>(items: &'a [T], name_of: impl Fn(&T) -> &str) -> Vec<&'a T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| name_of(a).cmp(name_of(b)));
    sorted
}
