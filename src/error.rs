//! Error types shared by the media and reveal subsystems.
//!
//! Generation failures never leave a cell: they are folded into the
//! `Failed` state and logged. Reveal errors only guard misuse of the
//! coordinator lifecycle.

use std::time::Duration;

/// Why a generation request produced no usable image.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Network or TLS failure talking to the service
    #[error("transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, trimmed
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Response parsed but no part carried inline image data
    #[error("response contained no inline image data")]
    NoImageData,

    /// Request did not resolve within the configured bound
    #[error("no response after {0:?}")]
    TimedOut(Duration),

    /// No API key configured
    #[error("no Gemini API key configured")]
    MissingApiKey,

    /// Generation disabled for this session
    #[error("generation disabled (offline mode)")]
    Offline,
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Misuse of the reveal coordinator lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevealError {
    /// `register` after `teardown`
    #[error("reveal coordinator already torn down")]
    TornDown,
}
