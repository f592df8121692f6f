use core::fmt;
use std::sync::Arc;

/// Error categories emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Operation applied to a node of the wrong kind (indexing a scalar,
    /// `unique` on a mapping, ...).
    StructuralType,
    /// Negative index resolving before position 0.
    IndexRange,
    /// Mutation the tree cannot express, e.g. replacing a map key.
    UnsupportedMutation,
    /// Wrapped failure of the document or timestamp parser.
    ParseDelegation,
    /// Host environment lookup failed (unknown timezone name).
    Environment,
    /// A sub-expression required to produce a value produced none.
    EvaluationPrecondition,
    /// Expression text could not be compiled.
    Syntax,
    /// Reading an input source failed.
    Io,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::StructuralType => "structural-type",
            ErrorCode::IndexRange => "index-range",
            ErrorCode::UnsupportedMutation => "unsupported-mutation",
            ErrorCode::ParseDelegation => "parse",
            ErrorCode::Environment => "environment",
            ErrorCode::EvaluationPrecondition => "precondition",
            ErrorCode::Syntax => "syntax",
            ErrorCode::Io => "io",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), source: None }
    }

    pub fn structural(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::StructuralType, msg)
    }

    pub fn index_range(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::IndexRange, msg)
    }

    pub fn unsupported_mutation(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::UnsupportedMutation, msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::ParseDelegation, msg)
    }

    pub fn environment(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::Environment, msg)
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::EvaluationPrecondition, msg)
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::Syntax, msg)
    }

    /// Prefix the message with where the failure happened.
    #[must_use]
    pub fn with_context(mut self, context: impl AsRef<str>) -> Self {
        self.message = format!("{}: {}", context.as_ref(), self.message);
        self
    }

    /// Compose an error with a source cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::from_code(ErrorCode::Io, e.to_string()).with_source(e)
    }
}

impl From<yaml_rust2::scanner::ScanError> for Error {
    fn from(e: yaml_rust2::scanner::ScanError) -> Self {
        Error::parse(format!("failed to decode: {e}")).with_source(e)
    }
}
