//! Handler error types

use inbox_common::AuthError;
use thiserror::Error;

use crate::protocol::{CloseCode, FrameError, OpCode};

/// Anything that ends a connection while handling a client frame
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Op code {0} cannot be sent by clients")]
    UnknownOpcode(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(#[from] AuthError),

    #[error("Already authenticated")]
    AlreadyAuthenticated,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn server_only(op: OpCode) -> Self {
        Self::UnknownOpcode(op.to_string())
    }

    /// Close code sent to the client for this error
    pub fn to_close_code(&self) -> CloseCode {
        match self {
            Self::InvalidPayload(_) => CloseCode::DecodeError,
            Self::UnknownOpcode(_) => CloseCode::UnknownOpcode,
            Self::NotAuthenticated => CloseCode::NotAuthenticated,
            Self::AuthenticationFailed(_) => CloseCode::AuthenticationFailed,
            Self::AlreadyAuthenticated => CloseCode::AlreadyAuthenticated,
            Self::Internal(_) => CloseCode::UnknownError,
        }
    }
}

impl From<FrameError> for HandlerError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Decode(e) => Self::InvalidPayload(e.to_string()),
            FrameError::UnknownOpcode(op) => Self::UnknownOpcode(op.to_string()),
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
