use std::fmt;
use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every way parsing a VCF source can fail.
#[derive(thiserror::Error, Debug)]
pub enum ErrorKind {
    #[error("unexpected end of metadata")]
    UnexpectedMetadataEnd,

    #[error("malformed meta line '{line}'")]
    MalformedMetaLine { line: String },

    /// A fixed column of the `#CHROM` line is missing or misnamed. `column` is 1-based.
    #[error("malformed header - expected {expected} but got {} in column {column}", .found.as_deref().unwrap_or("nothing"))]
    MalformedHeader {
        column: usize,
        expected: &'static str,
        found: Option<String>,
    },

    #[error("required key '{key}' not found")]
    MissingRequiredKey { key: &'static str },

    #[error("expected a {expected} for '{key}', got {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("expected a number, got '{value}'")]
    InvalidFieldNumber { value: String },

    #[error("expected a type, got '{value}'")]
    InvalidFieldType { value: String },

    #[error("unterminated string value for '{key}'")]
    UnterminatedQuotedValue { key: String },

    #[error("expected {expected} fields, got {found}")]
    FieldCountMismatch { expected: usize, found: usize },

    #[error("invalid position '{value}'")]
    InvalidPosition { value: String },

    #[error("unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("cannot find VEP annotation '{field}'")]
    UnknownField { field: String },

    #[error("cannot find format specification for VEP annotations in INFO declaration of '{field}'")]
    MissingFormatSpec { field: String },

    #[error("VEP format expects {expected} components, but the value has {found}")]
    AnnotationArityMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Where in which source an error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub source_name: String,
    pub line: usize,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    location: Option<Location>,
}

impl Error {
    pub(crate) fn located(kind: ErrorKind, source_name: &str, line: usize) -> Self {
        Error {
            kind,
            location: Some(Location {
                source_name: source_name.to_owned(),
                line,
            }),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            location: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(Location { source_name, line }) => {
                write!(f, "reading {}:{}: {}", source_name, line, self.kind)
            }
            None => fmt::Display::fmt(&self.kind, f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_located_display() {
        let error = Error::located(ErrorKind::UnexpectedEndOfInput, "calls.vcf", 12);
        assert_eq!(
            error.to_string(),
            "reading calls.vcf:12: unexpected end of input"
        );
        assert_eq!(error.location().map(|l| l.line), Some(12));
    }

    #[test]
    fn test_malformed_header_display() {
        let error: Error = ErrorKind::MalformedHeader {
            column: 6,
            expected: "QUAL",
            found: Some("FILTER".into()),
        }
        .into();
        assert!(error.location().is_none());
        assert_eq!(
            error.to_string(),
            "malformed header - expected QUAL but got FILTER in column 6"
        );
    }
}
