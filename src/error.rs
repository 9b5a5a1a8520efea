use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtoStoreErrorCode {
    InvalidPath,
    InvalidArgument,
    Operation,
    Decode,
    Io,
    Credential,
}

impl ProtoStoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtoStoreErrorCode::InvalidPath => "proto-store/invalid-path",
            ProtoStoreErrorCode::InvalidArgument => "proto-store/invalid-argument",
            ProtoStoreErrorCode::Operation => "proto-store/operation",
            ProtoStoreErrorCode::Decode => "proto-store/decode",
            ProtoStoreErrorCode::Io => "proto-store/io",
            ProtoStoreErrorCode::Credential => "proto-store/credential",
        }
    }
}

/// Canonical status attached to failed remote operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpcStatus {
    Cancelled,
    Unknown,
    InvalidArgument,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    DeadlineExceeded,
    Unavailable,
    Unauthenticated,
    Internal,
}

impl RpcStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcStatus::Cancelled => "CANCELLED",
            RpcStatus::Unknown => "UNKNOWN",
            RpcStatus::InvalidArgument => "INVALID_ARGUMENT",
            RpcStatus::NotFound => "NOT_FOUND",
            RpcStatus::AlreadyExists => "ALREADY_EXISTS",
            RpcStatus::PermissionDenied => "PERMISSION_DENIED",
            RpcStatus::ResourceExhausted => "RESOURCE_EXHAUSTED",
            RpcStatus::FailedPrecondition => "FAILED_PRECONDITION",
            RpcStatus::Aborted => "ABORTED",
            RpcStatus::DeadlineExceeded => "DEADLINE_EXCEEDED",
            RpcStatus::Unavailable => "UNAVAILABLE",
            RpcStatus::Unauthenticated => "UNAUTHENTICATED",
            RpcStatus::Internal => "INTERNAL",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProtoStoreError {
    pub code: ProtoStoreErrorCode,
    status: Option<RpcStatus>,
    message: String,
}

impl ProtoStoreError {
    pub fn new(code: ProtoStoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status: None,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// The remote status for `Operation` errors.
    pub fn status(&self) -> Option<RpcStatus> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_operation(&self) -> bool {
        self.code == ProtoStoreErrorCode::Operation
    }
}

impl Display for ProtoStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({}: {})", self.message, self.code_str(), status.as_str()),
            None => write!(f, "{} ({})", self.message, self.code_str()),
        }
    }
}

impl Error for ProtoStoreError {}

pub type ProtoStoreResult<T> = Result<T, ProtoStoreError>;

pub fn invalid_path(message: impl Into<String>) -> ProtoStoreError {
    ProtoStoreError::new(ProtoStoreErrorCode::InvalidPath, message)
}

pub fn invalid_argument(message: impl Into<String>) -> ProtoStoreError {
    ProtoStoreError::new(ProtoStoreErrorCode::InvalidArgument, message)
}

pub fn operation_error(status: RpcStatus, message: impl Into<String>) -> ProtoStoreError {
    ProtoStoreError {
        code: ProtoStoreErrorCode::Operation,
        status: Some(status),
        message: message.into(),
    }
}

pub fn decode_error(message: impl Into<String>) -> ProtoStoreError {
    ProtoStoreError::new(ProtoStoreErrorCode::Decode, message)
}

pub fn io_error(message: impl Into<String>) -> ProtoStoreError {
    ProtoStoreError::new(ProtoStoreErrorCode::Io, message)
}

pub fn credential_error(message: impl Into<String>) -> ProtoStoreError {
    ProtoStoreError::new(ProtoStoreErrorCode::Credential, message)
}

pub fn internal_error(message: impl Into<String>) -> ProtoStoreError {
    operation_error(RpcStatus::Internal, message)
}

pub fn unauthenticated(message: impl Into<String>) -> ProtoStoreError {
    operation_error(RpcStatus::Unauthenticated, message)
}

pub fn unavailable(message: impl Into<String>) -> ProtoStoreError {
    operation_error(RpcStatus::Unavailable, message)
}

pub fn cancelled(message: impl Into<String>) -> ProtoStoreError {
    operation_error(RpcStatus::Cancelled, message)
}
