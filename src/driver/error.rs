//! Errors surfaced by the driver.

use thiserror::Error;

use super::ssh_key::KeyCopyError;
use crate::api::ApiError;
use crate::config::ConfigError;
use crate::lifecycle::ProvisionError;

/// Failures reported to the host runtime.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DriverError {
    /// Pre-flight configuration check failed; nothing was sent.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Provider call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Provisioning failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    /// Copying the private key failed.
    #[error(transparent)]
    KeyCopy(#[from] KeyCopyError),
    /// The operation needs a machine but none is attached.
    #[error("no machine has been created")]
    NoMachine,
    /// A machine is already attached to this driver.
    #[error("machine {machine_id} already exists")]
    AlreadyCreated {
        /// Attached machine id.
        machine_id: String,
    },
    /// The provider declined the delete; the machine is still attached.
    #[error("provider declined to delete machine {machine_id}")]
    DeleteRejected {
        /// Machine id.
        machine_id: String,
    },
    /// The provider has no equivalent for the operation.
    #[error("{operation} is not supported by e24cloud")]
    Unsupported {
        /// Operation name.
        operation: String,
    },
}
