/******************************************************************************
    Author: Joaquín Béjar García
    Email: jb@taunais.com
    Date: 19/10/26
 ******************************************************************************/
use std::fmt::{self, Display, Formatter};
use std::io;

/// Outcome classification of a single HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be built (bad URL, bad header value).
    InvalidRequest(String),
    /// The server answered outside the 2xx range; the body is kept for diagnostics.
    HttpStatus { status: u16, body: String },
    /// A 2xx response arrived without a body.
    EmptyBody,
    /// The exchange never produced a response.
    Transport(String),
    DecodingFailed(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            TransportError::HttpStatus { status, body } => {
                write!(f, "unexpected http status: {status}, body: {body}")
            }
            TransportError::EmptyBody => write!(f, "response carried no body"),
            TransportError::Transport(msg) => write!(f, "transport error: {msg}"),
            TransportError::DecodingFailed(msg) => write!(f, "decoding error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::DecodingFailed(e.to_string())
    }
}

/// Errors surfaced by the token, feed and profile services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    InvalidRequest(String),
    /// A token exchange for the same code is already running.
    DuplicateRequest,
    /// No bearer token is stored.
    AuthRequired,
    Http(u16),
    Transport(String),
    Decoding(String),
    /// The request was superseded or reset before its result could be applied.
    Cancelled,
    Storage(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            AppError::DuplicateRequest => write!(f, "duplicate request"),
            AppError::AuthRequired => write!(f, "authorization required"),
            AppError::Http(status) => write!(f, "unexpected http status: {status}"),
            AppError::Transport(msg) => write!(f, "transport error: {msg}"),
            AppError::Decoding(msg) => write!(f, "decoding error: {msg}"),
            AppError::Cancelled => write!(f, "request cancelled"),
            AppError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<TransportError> for AppError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::InvalidRequest(msg) => AppError::InvalidRequest(msg),
            TransportError::HttpStatus { status, .. } => AppError::Http(status),
            TransportError::EmptyBody => {
                AppError::Transport("response carried no body".to_string())
            }
            TransportError::Transport(msg) => AppError::Transport(msg),
            TransportError::DecodingFailed(msg) => AppError::Decoding(msg),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(e: io::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Decoding(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_cancelled() {
            AppError::Cancelled
        } else {
            AppError::Transport(format!("request task failed: {e}"))
        }
    }
}
