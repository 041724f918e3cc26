//! Path template parsing.
//!
//! A route template is a `/`-delimited path whose segments may embed placeholders of the
//! form `{name}` or `{name: pattern}`. The pattern only constrains route matching in the
//! router; for documentation purposes only the name and its position matter.

use crate::error::{Error, Result};
use log::debug;

/// One `{...}` placeholder found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub pattern: Option<String>,
    /// Byte range of the placeholder, braces included
    pub span: (usize, usize),
}

/// Scans `template` and returns its placeholders in declaration order.
///
/// Braces inside a pattern are allowed as long as they balance (`{id:[0-9]{3}}`).
pub fn placeholders(template: &str) -> Result<Vec<Placeholder>> {
    let fail = |reason: &str| Error::PathTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut found: Vec<Placeholder> = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (idx, ch) in template.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    return Err(fail("unbalanced braces: unexpected '}'"));
                }
                depth -= 1;
                if depth == 0 {
                    let inner = &template[start + 1..idx];
                    let (name, pattern) = match inner.split_once(':') {
                        Some((name, pattern)) => (name.trim(), Some(pattern.trim().to_string())),
                        None => (inner.trim(), None),
                    };
                    if name.is_empty() {
                        return Err(fail("placeholder without a name"));
                    }
                    if found.iter().any(|p| p.name == name) {
                        return Err(fail(&format!("parameter '{}' declared twice", name)));
                    }
                    found.push(Placeholder {
                        name: name.to_string(),
                        pattern,
                        span: (start, idx + 1),
                    });
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(fail("unbalanced braces: unclosed '{'"));
    }

    debug!("Template {} has {} placeholders", template, found.len());
    Ok(found)
}

/// Extracts parameter names in the order they appear in the template.
pub fn extract(template: &str) -> Result<Vec<String>> {
    Ok(placeholders(template)?
        .into_iter()
        .map(|p| p.name)
        .collect())
}

/// Returns the template with every pattern removed, as used for document path keys.
///
/// `/foo/{fooId: [a-z]*}/bar` becomes `/foo/{fooId}/bar`.
pub fn document_path(template: &str) -> Result<String> {
    let found = placeholders(template)?;
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for placeholder in &found {
        out.push_str(&template[cursor..placeholder.span.0]);
        out.push('{');
        out.push_str(&placeholder.name);
        out.push('}');
        cursor = placeholder.span.1;
    }
    out.push_str(&template[cursor..]);
    Ok(out)
}

/// Splits a template into `/`-prefixed segments without cutting through placeholders.
///
/// `/pets/{id:[a-z/]+}/toys` yields `["/pets", "/{id:[a-z/]+}", "/toys"]`. A trailing `/`
/// is dropped.
pub fn segments(template: &str) -> Result<Vec<String>> {
    // Validates the braces first so the split below can trust them.
    placeholders(template)?;

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in template.chars() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 && !current.is_empty() => {
                parts.push(std::mem::take(&mut current));
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.is_empty() && current != "/" {
        parts.push(current);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_in_declaration_order() {
        let names = extract("/foo/{fooId: [a-z]*}/bar/{barId}/{year}-{month}").unwrap();
        assert_eq!(names, vec!["fooId", "barId", "year", "month"]);
    }

    #[test]
    fn test_extract_without_placeholders() {
        assert!(extract("/health").unwrap().is_empty());
        assert!(extract("").unwrap().is_empty());
    }

    #[test]
    fn test_unclosed_brace_fails() {
        let err = extract("/foo/{unclosed").unwrap_err();
        assert!(err.to_string().contains("unbalanced"));
    }

    #[test]
    fn test_stray_closing_brace_fails() {
        assert!(extract("/foo/bar}").is_err());
    }

    #[test]
    fn test_nested_braces_in_pattern() {
        let found = placeholders("/codes/{code:[0-9]{3}}").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "code");
        assert_eq!(found[0].pattern.as_deref(), Some("[0-9]{3}"));
    }

    #[test]
    fn test_empty_name_fails() {
        assert!(extract("/foo/{: [a-z]+}").is_err());
        assert!(extract("/foo/{}").is_err());
    }

    #[test]
    fn test_duplicate_name_fails() {
        assert!(extract("/a/{id}/b/{id}").is_err());
    }

    #[test]
    fn test_document_path_strips_patterns() {
        assert_eq!(
            document_path("/foo/{fooId: [a-z]*}/bar/{barId}").unwrap(),
            "/foo/{fooId}/bar/{barId}"
        );
        assert_eq!(document_path("/plain").unwrap(), "/plain");
    }

    #[test]
    fn test_segments_keep_placeholders_whole() {
        assert_eq!(
            segments("/pets/{id:[a-z/]+}/toys").unwrap(),
            vec!["/pets", "/{id:[a-z/]+}", "/toys"]
        );
        assert_eq!(segments("/").unwrap(), Vec::<String>::new());
        assert_eq!(segments("/a/").unwrap(), vec!["/a"]);
    }
}
