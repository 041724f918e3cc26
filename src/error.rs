use crate::model::Area;
use std::fmt;
use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for document assembly, synthesis and emission
#[derive(Debug)]
pub enum Error {
    /// A component (or other named node) was declared without a name
    MissingName { area: Area, location: String },
    /// Two entries of one components collection share a name
    DuplicateName { area: Area, name: String },
    /// `end()` was called on the writer without a matching open block
    UnbalancedBlock,
    Reference(RefError),
    /// A tag mini-language directive could not be applied
    Tag {
        record: String,
        field: String,
        token: String,
        reason: String,
    },
    /// Synthesis was asked for something that is not a record
    NotAStruct(String),
    /// A record was expanded inside itself without going through `$ref`
    RecursiveType { record: String, field: String },
    PathTemplate { template: String, reason: String },
    Io(std::io::Error),
    Parse { file: PathBuf, message: String },
    Serialization(String),
}

/// Where in the document a reference (or structural problem) was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: Option<String>,
    pub method: Option<String>,
    pub item: String,
}

impl Location {
    pub fn item(item: impl Into<String>) -> Self {
        Self {
            path: None,
            method: None,
            item: item.into(),
        }
    }

    pub fn operation(path: &str, method: &str, item: impl Into<String>) -> Self {
        Self {
            path: Some(path.to_string()),
            method: Some(method.to_string()),
            item: item.into(),
        }
    }

    pub fn path(path: &str, item: impl Into<String>) -> Self {
        Self {
            path: Some(path.to_string()),
            method: None,
            item: item.into(),
        }
    }

    /// Same path and method, deeper item.
    pub fn child(&self, segment: &str) -> Self {
        let item = if self.item.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", self.item, segment)
        };
        Self {
            path: self.path.clone(),
            method: self.method.clone(),
            item,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "path {}", path)?;
            if let Some(method) = &self.method {
                write!(f, " {}", method)?;
            }
            if !self.item.is_empty() {
                write!(f, ": ")?;
            }
        }
        write!(f, "{}", self.item)
    }
}

/// Why a reference failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefErrorKind {
    NoComponents,
    NotFound,
    AreaMismatch { expected: Area },
    Cyclic,
    /// The node declares an inline schema and a reference at once
    Ambiguous,
    InvalidPointer,
}

/// A reference that could not be resolved, with enough context to find its declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefError {
    /// Fully qualified `#/components/<area>/<name>` form, or the raw text if unparsable
    pub reference: String,
    pub location: Location,
    pub kind: RefErrorKind,
}

impl fmt::Display for RefErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RefErrorKind::NoComponents => write!(f, "document declares no components"),
            RefErrorKind::NotFound => write!(f, "no such component"),
            RefErrorKind::AreaMismatch { expected } => {
                write!(f, "reference must point into {}", expected)
            }
            RefErrorKind::Cyclic => write!(f, "cyclic ref"),
            RefErrorKind::Ambiguous => write!(f, "both an inline schema and a $ref are set"),
            RefErrorKind::InvalidPointer => write!(f, "not a #/components/<area>/<name> pointer"),
        }
    }
}

impl fmt::Display for RefError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: reference {}: {}",
            self.location, self.reference, self.kind
        )
    }
}

impl std::error::Error for RefError {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingName { area, location } => {
                write!(f, "{}: {} entry has no name", location, area)
            }
            Error::DuplicateName { area, name } => {
                write!(f, "duplicate name '{}' in components.{}", name, area)
            }
            Error::UnbalancedBlock => write!(f, "unbalanced block"),
            Error::Reference(e) => write!(f, "{}", e),
            Error::Tag {
                record,
                field,
                token,
                reason,
            } => write!(
                f,
                "{}.{}: tag token '{}': {}",
                record, field, token, reason
            ),
            Error::NotAStruct(name) => write!(f, "sample must be a struct, got {}", name),
            Error::RecursiveType { record, field } => write!(
                f,
                "{}.{}: recursive type must be described with $ref",
                record, field
            ),
            Error::PathTemplate { template, reason } => {
                write!(f, "path template '{}': {}", template, reason)
            }
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Parse { file, message } => {
                write!(f, "parse error {}: {}", file.display(), message)
            }
            Error::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Reference(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RefError> for Error {
    fn from(err: RefError) -> Self {
        Error::Reference(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

impl From<syn::Error> for Error {
    fn from(err: syn::Error) -> Self {
        Error::Parse {
            file: PathBuf::from("<unknown>"),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = Location::operation("/pets/{petId}", "GET", "responses.200");
        assert_eq!(loc.to_string(), "path /pets/{petId} GET: responses.200");

        let loc = Location::item("components.schemas.Pet");
        assert_eq!(loc.to_string(), "components.schemas.Pet");
    }

    #[test]
    fn test_location_child() {
        let loc = Location::item("components.schemas.Pet").child("properties.category");
        assert_eq!(loc.item, "components.schemas.Pet.properties.category");
    }

    #[test]
    fn test_ref_error_display() {
        let err = RefError {
            reference: "#/components/schemas/Category".to_string(),
            location: Location::item("components.schemas.Pet.properties.category"),
            kind: RefErrorKind::NotFound,
        };
        assert_eq!(
            err.to_string(),
            "components.schemas.Pet.properties.category: reference #/components/schemas/Category: no such component"
        );
    }

    #[test]
    fn test_tag_error_names_token() {
        let err = Error::Tag {
            record: "Pet".to_string(),
            field: "name".to_string(),
            token: "bogus".to_string(),
            reason: "unknown token".to_string(),
        };
        assert!(err.to_string().contains("'bogus'"));
    }
}
