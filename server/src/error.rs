//! Error types for sessions and the listener.

use crate::config::ConfigError;
use std::io;
use thiserror::Error;

/// Failure that ends a single session. Never affects other sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("stream error: {0}")]
    Stream(#[from] io::Error),
}

/// Failure that stops the whole server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
