use arbor_core_types::SubmissionId;
use thiserror::Error;

/// Result type alias using ArborError
pub type Result<T> = std::result::Result<T, ArborError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input validation
    InvalidInput,

    // Compile time: a path or a declared type does not fit the schema
    TypeError,

    // Resolution: the addressed entry is absent
    NotFound,

    // Structurally disallowed mutation
    InvalidArgument,

    // Reference still has unbound parameters
    Indefinite,

    // User accessor logic failed
    AccessorFailure,

    // Hooks and drivers
    HookFailure,
    InvalidHook,
    FlushFailure,

    // Configuration
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::TypeError => "ERR_TYPE",
            ExErrorKind::NotFound => "ERR_NONEXISTENT_ENTRY",
            ExErrorKind::InvalidArgument => "ERR_INVALID_ARGUMENT",
            ExErrorKind::Indefinite => "ERR_INDEFINITE_REFERENCE",
            ExErrorKind::AccessorFailure => "ERR_ACCESSOR",
            ExErrorKind::HookFailure => "ERR_HOOK_FAILED",
            ExErrorKind::InvalidHook => "ERR_INVALID_HOOK",
            ExErrorKind::FlushFailure => "ERR_FLUSH_FAILED",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Structured counterpart of [`ArborError`] carrying classification fields
/// for programmatic handling and context for log correlation.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    path: Option<String>,
    hook: Option<String>,
    submission_id: Option<SubmissionId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            path: None,
            hook: None,
            submission_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add tree path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add hook name context
    pub fn with_hook(mut self, hook: impl Into<String>) -> Self {
        self.hook = Some(hook.into());
        self
    }

    /// Add submission ID context
    pub fn with_submission_id(mut self, submission_id: SubmissionId) -> Self {
        self.submission_id = Some(submission_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn hook(&self) -> Option<&str> {
        self.hook.as_deref()
    }

    pub fn submission_id(&self) -> Option<&SubmissionId> {
        self.submission_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(hook) = &self.hook {
            write!(f, " (hook: {})", hook)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for state tree operations
///
/// The variants fall into four families:
/// - type errors, raised while compiling a path against the schema
/// - nonexistent entries, an expected outcome of resolving a reference
/// - invalid arguments, for mutations the tree structure does not allow
/// - failures raised by user code (accessors, hooks) and surfaced unchanged
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArborError {
    // ===== Input Errors =====
    /// Identifier failed validation
    #[error("Invalid identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: String },

    /// Path text could not be parsed
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    // ===== Type Errors =====
    /// A type name is not declared in the schema
    #[error("Unknown type: {type_name}")]
    UnknownType { type_name: String },

    /// Declared and structural types disagree
    #[error("Type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// A segment cannot be classified against the current type
    #[error("Cannot resolve segment {segment:?} of {path} in type {type_name}")]
    UnknownSegment {
        path: String,
        segment: String,
        type_name: String,
    },

    /// A tag that is not one of the union's cases
    #[error("Tag {tag:?} is not a case of union {union_name} (at {path})")]
    UnknownTag {
        path: String,
        tag: String,
        union_name: String,
    },

    // ===== Resolution =====
    /// The addressed entry does not exist in this snapshot
    #[error("Nonexistent entry: {path}")]
    NonexistentEntry { path: String },

    /// The reference still has unbound parameters
    #[error("Reference {path} has unbound parameters")]
    IndefiniteReference { path: String },

    // ===== Mutation =====
    /// The requested mutation is not allowed at this location
    #[error("Invalid argument for {path}: {reason}")]
    InvalidArgument { path: String, reason: String },

    // ===== User Code =====
    /// A record type's accessor or constructor logic failed
    #[error("Accessor failure in {type_name}.{field}: {message}")]
    Accessor {
        type_name: String,
        field: String,
        message: String,
    },

    /// A hook callback reported failure
    #[error("Hook {hook} failed: {message}")]
    HookFailed { hook: String, message: String },

    /// A hook receiver declares a method that cannot be registered
    #[error("Hook method {receiver}::{method} rejected: {reason}")]
    InvalidHookMethod {
        receiver: String,
        method: String,
        reason: String,
    },

    /// A hook method parameter cannot be supplied for its scope
    #[error("Hook method {receiver}::{method} parameter {parameter:?} rejected: {reason}")]
    InvalidHookParameter {
        receiver: String,
        method: String,
        parameter: String,
        reason: String,
    },

    // ===== Driver =====
    /// A buffered update was refused downstream during a flush
    #[error("Flush failed: update at {path} was refused ({pending} still pending)")]
    FlushFailed {
        path: String,
        pending: usize,
        #[source]
        source: Box<ArborError>,
    },

    // ===== Generic Errors =====
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ArborError {
    pub fn nonexistent(path: impl ToString) -> Self {
        ArborError::NonexistentEntry {
            path: path.to_string(),
        }
    }

    pub fn invalid_argument(path: impl ToString, reason: impl Into<String>) -> Self {
        ArborError::InvalidArgument {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn type_mismatch(
        path: impl ToString,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        ArborError::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Compile-time schema violations
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            ArborError::UnknownType { .. }
                | ArborError::TypeMismatch { .. }
                | ArborError::UnknownSegment { .. }
                | ArborError::UnknownTag { .. }
        )
    }

    pub fn is_nonexistent(&self) -> bool {
        matches!(self, ArborError::NonexistentEntry { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ArborError::InvalidArgument { .. })
    }

    pub fn kind(&self) -> ExErrorKind {
        ExError::from(self).kind()
    }
}

/// Conversion from ArborError to ExError
impl From<&ArborError> for ExError {
    fn from(err: &ArborError) -> Self {
        match err {
            ArborError::InvalidIdentifier { value, reason } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_message(format!("Invalid identifier {:?}: {}", value, reason))
            }
            ArborError::InvalidPath { path, reason } => ExError::new(ExErrorKind::InvalidInput)
                .with_path(path.clone())
                .with_message(reason.clone()),
            ArborError::UnknownType { type_name } => ExError::new(ExErrorKind::TypeError)
                .with_message(format!("Unknown type {}", type_name)),
            ArborError::TypeMismatch {
                path,
                expected,
                found,
            } => ExError::new(ExErrorKind::TypeError)
                .with_path(path.clone())
                .with_message(format!("expected {}, found {}", expected, found)),
            ArborError::UnknownSegment {
                path,
                segment,
                type_name,
            } => ExError::new(ExErrorKind::TypeError)
                .with_path(path.clone())
                .with_message(format!("segment {:?} not valid in {}", segment, type_name)),
            ArborError::UnknownTag {
                path,
                tag,
                union_name,
            } => ExError::new(ExErrorKind::TypeError)
                .with_path(path.clone())
                .with_message(format!("tag {:?} not a case of {}", tag, union_name)),
            ArborError::NonexistentEntry { path } => ExError::new(ExErrorKind::NotFound)
                .with_path(path.clone())
                .with_message("Nonexistent entry"),
            ArborError::IndefiniteReference { path } => ExError::new(ExErrorKind::Indefinite)
                .with_path(path.clone())
                .with_message("Reference has unbound parameters"),
            ArborError::InvalidArgument { path, reason } => {
                ExError::new(ExErrorKind::InvalidArgument)
                    .with_path(path.clone())
                    .with_message(reason.clone())
            }
            ArborError::Accessor {
                type_name,
                field,
                message,
            } => ExError::new(ExErrorKind::AccessorFailure)
                .with_message(format!("{}.{}: {}", type_name, field, message)),
            ArborError::HookFailed { hook, message } => ExError::new(ExErrorKind::HookFailure)
                .with_hook(hook.clone())
                .with_message(message.clone()),
            ArborError::InvalidHookMethod {
                receiver,
                method,
                reason,
            } => ExError::new(ExErrorKind::InvalidHook)
                .with_hook(format!("{}::{}", receiver, method))
                .with_message(reason.clone()),
            ArborError::InvalidHookParameter {
                receiver,
                method,
                parameter,
                reason,
            } => ExError::new(ExErrorKind::InvalidHook)
                .with_hook(format!("{}::{}", receiver, method))
                .with_message(format!("parameter {:?}: {}", parameter, reason)),
            ArborError::FlushFailed {
                path,
                pending,
                source,
            } => ExError::new(ExErrorKind::FlushFailure)
                .with_path(path.clone())
                .with_message(format!("{} ({} still pending)", source, pending)),
            ArborError::Config { message } => {
                ExError::new(ExErrorKind::Config).with_message(message.clone())
            }
            ArborError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message.clone())
            }
        }
    }
}

impl From<ArborError> for ExError {
    fn from(err: ArborError) -> Self {
        ExError::from(&err)
    }
}
