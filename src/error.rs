//! Error handling for ocdplot-rs
//!
//! This module defines the error taxonomy of the sampling core and a Result
//! alias used throughout the crate.
//!
//! Only connect, transport, reset and decode failures terminate a session.
//! Responses that do not match the value grammar are not errors at all: the
//! parser absorbs them into a zero-valued sample (see [`crate::backend::parser`]).

use thiserror::Error;

/// Main error type for ocdplot-rs operations
#[derive(Error, Debug)]
pub enum OcdError {
    /// The debug server could not be reached or did not send its greeting
    #[error("Connect error: {0}")]
    Connect(String),

    /// The stream broke while a command was in flight
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server closed the connection
    #[error("Connection closed by debug server")]
    ConnectionClosed,

    /// The target reset command did not complete
    #[error("Target reset failed: {0}")]
    Reset(String),

    /// A value could not be reinterpreted in the requested representation
    #[error("Decode error: {0}")]
    Decode(String),

    /// A memory address was not a valid hex literal
    #[error("Invalid address '{0}': expected a hex literal such as 0x20000000")]
    InvalidAddress(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation was attempted in the wrong session state
    #[error("Session error: {0}")]
    Session(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<OcdError>,
    },
}

impl OcdError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        OcdError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping context wrappers
    pub fn root(&self) -> &OcdError {
        match self {
            OcdError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True if the error means the connection to the debug server is gone
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self.root(),
            OcdError::Transport(_) | OcdError::ConnectionClosed | OcdError::Io(_)
        )
    }
}

/// Result type alias for ocdplot-rs operations
pub type Result<T> = std::result::Result<T, OcdError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
