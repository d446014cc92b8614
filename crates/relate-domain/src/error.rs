use std::fmt;

/// Stable diagnostic codes attached to every registry failure.
pub mod codes {
    pub const NOT_FOUND: &str = "RL404";
    pub const INVALID_ARGUMENT: &str = "RL400";
    pub const TARGET_EXISTS: &str = "RL409";
    pub const EXTENSION_EXISTS: &str = "RL410";
    pub const AMBIGUOUS_TARGET: &str = "RL420";
    pub const VALIDATION_FAILURE: &str = "RL401";
    pub const NOT_SUPPORTED: &str = "RL501";
}

/// Closed taxonomy of failures surfaced at the registry boundary.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("[RL404] {0}")]
    NotFound(String),
    #[error("[RL400] {0}")]
    InvalidArgument(String),
    #[error("[RL409] {0}")]
    TargetExists(String),
    #[error("[RL410] {0}")]
    ExtensionExists(String),
    #[error("[RL420] {0}")]
    AmbiguousTarget(String),
    #[error("[RL401] {0}")]
    ValidationFailure(String),
    #[error("[RL501] {0}")]
    NotSupported(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    TargetExists,
    ExtensionExists,
    AmbiguousTarget,
    ValidationFailure,
    NotSupported,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::TargetExists => "target-exists",
            ErrorKind::ExtensionExists => "extension-exists",
            ErrorKind::AmbiguousTarget => "ambiguous-target",
            ErrorKind::ValidationFailure => "validation-failure",
            ErrorKind::NotSupported => "not-supported",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RegistryError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn target_exists(message: impl Into<String>) -> Self {
        Self::TargetExists(message.into())
    }

    pub fn extension_exists(message: impl Into<String>) -> Self {
        Self::ExtensionExists(message.into())
    }

    pub fn ambiguous_target(message: impl Into<String>) -> Self {
        Self::AmbiguousTarget(message.into())
    }

    pub fn validation_failure(message: impl Into<String>) -> Self {
        Self::ValidationFailure(message.into())
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported(message.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::TargetExists(_) => ErrorKind::TargetExists,
            Self::ExtensionExists(_) => ErrorKind::ExtensionExists,
            Self::AmbiguousTarget(_) => ErrorKind::AmbiguousTarget,
            Self::ValidationFailure(_) => ErrorKind::ValidationFailure,
            Self::NotSupported(_) => ErrorKind::NotSupported,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => codes::NOT_FOUND,
            ErrorKind::InvalidArgument => codes::INVALID_ARGUMENT,
            ErrorKind::TargetExists => codes::TARGET_EXISTS,
            ErrorKind::ExtensionExists => codes::EXTENSION_EXISTS,
            ErrorKind::AmbiguousTarget => codes::AMBIGUOUS_TARGET,
            ErrorKind::ValidationFailure => codes::VALIDATION_FAILURE,
            ErrorKind::NotSupported => codes::NOT_SUPPORTED,
        }
    }

    /// Message without the code prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::InvalidArgument(msg)
            | Self::TargetExists(msg)
            | Self::ExtensionExists(msg)
            | Self::AmbiguousTarget(msg)
            | Self::ValidationFailure(msg)
            | Self::NotSupported(msg) => msg,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
