//! Error types for the scanning engine.
//!
//! [`ScanError`] aborts a run. [`ProbeError`] belongs to a single target and
//! is carried inside its result while the run goes on.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    /// An input source could not be opened or read.
    #[error("failed to read {name}: {error}")]
    Input {
        name: String,
        #[source]
        error: io::Error,
    },

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("TLS setup failed: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ScanError {
    pub fn input(name: impl Into<String>, error: io::Error) -> Self {
        ScanError::Input {
            name: name.into(),
            error,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("reading response body failed: {0}")]
    Body(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("connection failed: {0}")]
    Transport(#[source] io::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("could not build client for {address}: {error}")]
    Client {
        address: String,
        #[source]
        error: reqwest::Error,
    },
}

impl ProbeError {
    /// Classifies an error raised while sending a request.
    pub fn from_send(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProbeError::Timeout
        } else if error.is_connect() {
            ProbeError::Connect(error)
        } else {
            ProbeError::Request(error)
        }
    }

    /// Classifies an error raised while reading the body.
    pub fn from_body(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProbeError::Timeout
        } else {
            ProbeError::Body(error)
        }
    }
}
