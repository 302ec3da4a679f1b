//! Errors raised while provisioning a machine.

use std::time::Duration;

use thiserror::Error;

use crate::api::ApiError;
use crate::machine::SpecError;

/// Provisioning failures.
///
/// Variants raised after creation succeeded carry the machine id so the
/// caller can delete the orphan.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProvisionError {
    /// Raised before any request when the spec breaks a provider limit.
    #[error("invalid machine spec: {0}")]
    Validation(#[source] SpecError),
    /// Raised when the create call fails; no machine id is known.
    #[error("failed to create machine: {0}")]
    Create(#[source] ApiError),
    /// Raised when fetching the machine fails while waiting for an address.
    #[error("failed to fetch machine {machine_id} while waiting for an address: {source}")]
    Poll {
        /// Provider machine id.
        machine_id: String,
        /// Fetch error.
        #[source]
        source: ApiError,
    },
    /// Raised when the provider reports an address that does not parse.
    #[error("machine {machine_id} reported an invalid address: {address}")]
    InvalidAddress {
        /// Provider machine id.
        machine_id: String,
        /// Raw address string.
        address: String,
    },
    /// Raised when no address appears before the polling deadline.
    #[error("timeout waiting for an address on machine {machine_id} after {attempts} polls ({elapsed:?})")]
    Timeout {
        /// Provider machine id.
        machine_id: String,
        /// Polls issued.
        attempts: u32,
        /// Time spent polling.
        elapsed: Duration,
    },
    /// Raised when `run` is called twice on the same lifecycle.
    #[error("provisioning already started")]
    AlreadyStarted,
}

impl ProvisionError {
    /// Machine id left behind by the failure, if creation succeeded.
    #[must_use]
    pub fn machine_id(&self) -> Option<&str> {
        match self {
            Self::Poll { machine_id, .. }
            | Self::InvalidAddress { machine_id, .. }
            | Self::Timeout { machine_id, .. } => Some(machine_id),
            Self::Validation(_) | Self::Create(_) | Self::AlreadyStarted => None,
        }
    }
}
