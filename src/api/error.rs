//! Error types for the e24cloud HTTP client.

use thiserror::Error;

use crate::signing::SigningError;

/// Faults raised by the transport and resource client.
///
/// Signature mismatches are reported by the API as ordinary non-200
/// responses, so they surface as [`ApiError::Api`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// Raised before sending when the request cannot be signed.
    #[error("request signing failed: {0}")]
    Signing(#[from] SigningError),
    /// Raised for DNS, connect, timeout and body read failures.
    #[error("transport error: {message}")]
    Transport {
        /// Message from the HTTP client.
        message: String,
    },
    /// Raised for any response other than `200 OK`.
    #[error("e24cloud returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// Raised when a `200 OK` body does not match the expected envelope.
    #[error("cannot decode {resource} response: {message}")]
    Decode {
        /// Resource being decoded.
        resource: String,
        /// Parser message.
        message: String,
    },
    /// Raised when a named resource is absent.
    #[error("{resource} '{name}' not found")]
    NotFound {
        /// Resource kind (for example `ssh key`).
        resource: String,
        /// Name or id that was looked up.
        name: String,
    },
    /// Raised when the API answers `success: false`.
    #[error("e24cloud rejected {operation} for {target}")]
    Rejected {
        /// Operation that was attempted.
        operation: String,
        /// Machine id or name the operation targeted.
        target: String,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport {
            message: value.to_string(),
        }
    }
}
