use std::fmt;

/// Failure of an engine operation.
///
/// Every variant except [`EngineError::UnavailablePrimitive`] is a caller
/// error; that one means the build cannot provide the requested primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidArgument(String),
    UnknownAlgorithm(String),
    UnavailablePrimitive(String),
    InvalidKeyLength {
        primitive: &'static str,
        expected: &'static str,
        actual: usize,
    },
    InvalidNonceLength {
        mode: &'static str,
        actual: usize,
    },
    InvalidPadding,
    AuthenticationFailed,
    SessionConflict(&'static str),
    SessionNotOpen(&'static str),
}

impl EngineError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        EngineError::InvalidArgument(reason.into())
    }

    /// `true` for "bad request" failures, `false` for a misconfigured build.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, EngineError::UnavailablePrimitive(_))
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            EngineError::UnknownAlgorithm(id) => write!(f, "unknown algorithm: {id}"),
            EngineError::UnavailablePrimitive(name) => {
                write!(f, "primitive '{name}' is not available in this build")
            }
            EngineError::InvalidKeyLength {
                primitive,
                expected,
                actual,
            } => write!(
                f,
                "invalid key size of {actual} for {primitive} (expected {expected})"
            ),
            EngineError::InvalidNonceLength { mode, actual } => {
                write!(f, "invalid IV size of {actual} for {mode}")
            }
            EngineError::InvalidPadding => write!(f, "invalid padding or truncated ciphertext"),
            EngineError::AuthenticationFailed => {
                write!(f, "authentication failed: ciphertext or tag was tampered with")
            }
            EngineError::SessionConflict(kind) => write!(f, "a {kind} session is already open"),
            EngineError::SessionNotOpen(kind) => write!(f, "no {kind} session is open"),
        }
    }
}

impl std::error::Error for EngineError {}

pub type Result<T> = std::result::Result<T, EngineError>;
