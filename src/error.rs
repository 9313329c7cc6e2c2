use crate::speech::FailureClass;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "run.max_chars")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "credential_pool", "segment_writer")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the relay.
///
/// Per-attempt failures (`Remote`, `MalformedResponse`) are normally absorbed by
/// the executor's rotation/backoff loop and only surface wrapped inside
/// `AllCredentialsExhausted`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Initialization error: {message}{}", format_context(.context))]
    Initialization {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Remote error ({class}){}: {message}", format_status(.status))]
    Remote {
        class: FailureClass,
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("All credentials exhausted after {attempts} attempt(s); last error: {last}")]
    AllCredentialsExhausted { attempts: usize, last: Box<Error> },

    #[error("No artifacts found matching '{pattern}'")]
    NoArtifactsFound { pattern: String },

    #[error("Audio format mismatch in {path}: expected {expected}, found {found}")]
    FormatMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Audio codec unavailable: {message}")]
    CodecUnavailable { message: String },

    #[error("Audio codec error: {0}")]
    Codec(#[from] hound::Error),

    #[error("Audio encoder failed: {message}")]
    Encoder { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" HTTP {}", code),
        None => String::new(),
    }
}

impl Error {
    pub fn initialization(msg: impl Into<String>) -> Self {
        Error::Initialization {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn initialization_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Initialization {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn remote(class: FailureClass, status: Option<u16>, msg: impl Into<String>) -> Self {
        Error::Remote {
            class,
            status,
            message: msg.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedResponse {
            message: msg.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Initialization { context, .. }
            | Error::Configuration { context, .. }
            | Error::Validation { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn is_quota_exhausted(&self) -> bool {
        matches!(
            self,
            Error::Remote {
                class: FailureClass::QuotaExhausted,
                ..
            }
        )
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Remote {
                class: FailureClass::Transient,
                ..
            }
        )
    }

    /// API errors other than quota exhaustion. These wait and retry on the
    /// same credential; quota errors and malformed payloads rotate instead.
    pub fn is_backoff_eligible(&self) -> bool {
        matches!(self, Error::Remote { class, .. } if *class != FailureClass::QuotaExhausted)
    }

    /// Failures that belong to the request itself and are handled by the
    /// rotation/backoff loop. Anything else aborts the segment immediately.
    pub fn is_request_failure(&self) -> bool {
        matches!(self, Error::Remote { .. } | Error::MalformedResponse { .. })
    }
}
