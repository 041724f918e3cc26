//! The per-field tag mini-language.
//!
//! A tag is a comma separated list of tokens:
//!
//! ```text
//! required,example,description:'Name, as shown to users',enum:[a,b,"c,d"],#free text
//! ```
//!
//! Each token is a bare flag, a `name:value` pair or a `#` comment. Commas inside quotes
//! (`"…"`, `'…'`) or brackets (`()`, `[]`, `{}`) do not split tokens.

use std::fmt;

/// Token names accepted besides `x-` extensions.
pub const KNOWN_TOKENS: &[&str] = &[
    "name",
    "description",
    "type",
    "itemType",
    "format",
    "itemFormat",
    "required",
    "deprecated",
    "example",
    "default",
    "enum",
    "pattern",
    "minimum",
    "maximum",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "minProperties",
    "maxProperties",
    "multipleOf",
    "nullable",
    "uniqueItems",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "readOnly",
    "writeOnly",
    "$ref",
];

/// Tokens still honoured after a `$ref` has been applied.
pub const REF_PASSTHROUGH: &[&str] = &["name", "type", "itemType", "required"];

/// A parse failure, reported against the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagError {
    pub token: String,
    pub reason: String,
}

impl TagError {
    fn new(token: &str, reason: impl Into<String>) -> Self {
        Self {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "token '{}': {}", self.token, self.reason)
    }
}

impl std::error::Error for TagError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Flag(String),
    Pair { name: String, value: String },
}

impl Directive {
    pub fn name(&self) -> &str {
        match self {
            Directive::Flag(name) => name,
            Directive::Pair { name, .. } => name,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Directive::Flag(_) => None,
            Directive::Pair { value, .. } => Some(value),
        }
    }

    /// Source text of the token, for error messages.
    pub fn token(&self) -> String {
        match self {
            Directive::Flag(name) => name.clone(),
            Directive::Pair { name, value } => format!("{}:{}", name, value),
        }
    }

    pub fn is_ref(&self) -> bool {
        self.name() == "$ref"
    }
}

/// A parsed tag: directives in processing order plus collected comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTag {
    pub directives: Vec<Directive>,
    pub comments: Vec<String>,
}

impl ParsedTag {
    pub fn has_ref(&self) -> bool {
        self.directives.iter().any(Directive::is_ref)
    }

    /// Directives that take effect: everything without a `$ref`, otherwise the `$ref`
    /// itself followed by the pass-through names only.
    pub fn effective(&self) -> impl Iterator<Item = &Directive> {
        let has_ref = self.has_ref();
        self.directives
            .iter()
            .filter(move |d| !has_ref || d.is_ref() || REF_PASSTHROUGH.contains(&d.name()))
    }

    pub fn comment(&self) -> Option<String> {
        if self.comments.is_empty() {
            None
        } else {
            Some(self.comments.join(" "))
        }
    }
}

/// Splits a tag into raw tokens, honouring quotes and brackets.
pub fn tokenize(tag: &str) -> Result<Vec<String>, TagError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut brackets: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in tag.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            // A quote only opens at the start of a value; elsewhere it is a literal.
            '"' | '\'' if opens_value(&current) => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' | '[' | '{' => {
                brackets.push(ch);
                current.push(ch);
            }
            ')' | ']' | '}' => {
                let open = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if brackets.pop() != Some(open) {
                    return Err(TagError::new(
                        current.trim(),
                        format!("unbalanced '{}'", ch),
                    ));
                }
                current.push(ch);
            }
            ',' if brackets.is_empty() => {
                push_token(&mut tokens, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if quote.is_some() {
        return Err(TagError::new(current.trim(), "unterminated quote"));
    }
    if let Some(open) = brackets.last() {
        return Err(TagError::new(current.trim(), format!("unclosed '{}'", open)));
    }
    push_token(&mut tokens, &current);
    Ok(tokens)
}

fn opens_value(current: &str) -> bool {
    matches!(
        current.trim_end().chars().last(),
        None | Some(':') | Some(',') | Some('[') | Some('(') | Some('{')
    )
}

fn push_token(tokens: &mut Vec<String>, raw: &str) {
    let token = raw.trim();
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
}

/// Removes one level of matching quotes, resolving backslash escapes.
pub fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    let quoted = value.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[value.len() - 1] == bytes[0];
    if !quoted {
        return value.to_string();
    }

    let inner = &value[1..value.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn is_known(name: &str) -> bool {
    name.starts_with("x-") || KNOWN_TOKENS.contains(&name)
}

/// Parses one raw token.
fn parse_token(token: &str) -> Result<Directive, TagError> {
    match token.split_once(':') {
        Some((name, value)) => {
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() {
                return Err(TagError::new(token, "missing name before ':'"));
            }
            if value.is_empty() {
                return Err(TagError::new(token, "missing value after ':'"));
            }
            if !is_known(name) {
                return Err(TagError::new(token, format!("unknown token '{}'", name)));
            }
            Ok(Directive::Pair {
                name: name.to_string(),
                value: unquote(value),
            })
        }
        None => {
            if !is_known(token) {
                return Err(TagError::new(token, format!("unknown token '{}'", token)));
            }
            Ok(Directive::Flag(token.to_string()))
        }
    }
}

/// Parses a whole tag. Directives come back stably sorted with `$ref` first.
pub fn parse(tag: &str) -> Result<ParsedTag, TagError> {
    let mut parsed = ParsedTag::default();
    for token in tokenize(tag)? {
        if let Some(comment) = token.strip_prefix('#') {
            parsed.comments.push(comment.trim().to_string());
            continue;
        }
        parsed.directives.push(parse_token(&token)?);
    }
    parsed.directives.sort_by_key(|d| !d.is_ref());
    Ok(parsed)
}

/// Splits a list value such as `[a, b, "c,d"]` into unquoted items.
///
/// A value without brackets is a single item.
pub fn split_list(value: &str) -> Result<Vec<String>, TagError> {
    let trimmed = value.trim();
    let inner = match trimmed.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        Some(inner) => inner,
        None => return Ok(vec![unquote(trimmed)]),
    };
    Ok(tokenize(inner)?.iter().map(|item| unquote(item)).collect())
}
