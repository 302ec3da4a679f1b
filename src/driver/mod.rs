//! Machine driver consumed by a host runtime.
//!
//! [`E24Driver`] owns the single in-flight machine handle: the id returned
//! by create and the address observed while provisioning. State queries and
//! power actions always re-fetch from the provider.

mod error;
pub mod ssh_key;

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::config::DriverConfig;
use crate::lifecycle::{ProvisionError, ProvisioningLifecycle};
use crate::machine::{LifecycleState, MachineApi, PowerAction};

pub use error::DriverError;

/// Port the Docker daemon listens on.
pub const DOCKER_PORT: u16 = 2376;
/// Login user on provisioned machines.
pub const SSH_USER: &str = "e24";

/// Machine state as reported to the host runtime.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MachineState {
    /// Installing.
    Provisioning,
    /// Online.
    Running,
    /// Offline or being deleted.
    Stopped,
    /// No machine, or a state the provider does not document.
    Unknown,
}

impl MachineState {
    /// Maps the provider's status.
    #[must_use]
    pub const fn from_provider(state: LifecycleState) -> Self {
        match state {
            LifecycleState::Provisioning => Self::Provisioning,
            LifecycleState::Online => Self::Running,
            LifecycleState::Offline | LifecycleState::Deleting => Self::Stopped,
            LifecycleState::Unknown => Self::Unknown,
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Provisioning => "provisioning",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Future returned by [`MachineDriver`] operations.
pub type DriverFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DriverError>> + Send + 'a>>;

/// Lifecycle operations a host runtime invokes.
pub trait MachineDriver {
    /// Checks configuration without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Config`] describing the first bad setting.
    fn validate_config(&self) -> Result<(), DriverError>;

    /// Creates the machine and waits for its address.
    fn create(&mut self) -> DriverFuture<'_, ()>;

    /// Fetches the machine's current state.
    fn current_state(&self) -> DriverFuture<'_, MachineState>;

    /// Powers the machine on.
    fn start(&self) -> DriverFuture<'_, ()>;

    /// Shuts the machine down.
    fn stop(&self) -> DriverFuture<'_, ()>;

    /// Reboots the machine.
    fn restart(&self) -> DriverFuture<'_, ()>;

    /// Forcefully stops the machine.
    ///
    /// # Errors
    ///
    /// Always returns [`DriverError::Unsupported`].
    fn kill(&self) -> Result<(), DriverError>;

    /// Deletes the machine and detaches it.
    fn destroy(&mut self) -> DriverFuture<'_, ()>;

    /// Address observed during provisioning, if any.
    fn address(&self) -> Option<IpAddr>;
}

/// Driver backed by any [`MachineApi`].
#[derive(Debug)]
pub struct E24Driver<A> {
    api: A,
    config: DriverConfig,
    name: String,
    key_destination: Option<Utf8PathBuf>,
    machine_id: Option<String>,
    address: Option<IpAddr>,
}

impl<A: MachineApi> E24Driver<A> {
    /// Creates a driver for a machine called `name`.
    #[must_use]
    pub fn new(api: A, config: DriverConfig, name: impl Into<String>) -> Self {
        Self {
            api,
            config,
            name: name.into(),
            key_destination: None,
            machine_id: None,
            address: None,
        }
    }

    /// Copies the private key to `path` during create.
    #[must_use]
    pub fn with_key_destination(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.key_destination = Some(path.into());
        self
    }

    /// Attaches an existing machine.
    #[must_use]
    pub fn with_machine(mut self, machine_id: impl Into<String>) -> Self {
        self.machine_id = Some(machine_id.into());
        self
    }

    /// Provider client.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Attached machine id, including one orphaned by a failed create.
    #[must_use]
    pub fn machine_id(&self) -> Option<&str> {
        self.machine_id.as_deref()
    }

    /// Docker endpoint on the machine's address.
    #[must_use]
    pub fn docker_url(&self) -> Option<String> {
        self.address
            .map(|address| format!("tcp://{address}:{DOCKER_PORT}"))
    }

    /// Login user for SSH.
    #[must_use]
    pub const fn ssh_username(&self) -> &'static str {
        SSH_USER
    }

    fn require_machine(&self) -> Result<&str, DriverError> {
        self.machine_id().ok_or(DriverError::NoMachine)
    }

    async fn create_machine(&mut self) -> Result<(), DriverError> {
        if let Some(machine_id) = &self.machine_id {
            return Err(DriverError::AlreadyCreated {
                machine_id: machine_id.clone(),
            });
        }
        self.config.validate()?;

        let key_id = self.api.key_id_by_name(&self.config.ssh_key_name).await?;
        info!(key = %self.config.ssh_key_name, key_id, "resolved ssh key");
        if let Some(destination) = &self.key_destination {
            ssh_key::copy_private_key(Utf8Path::new(&self.config.ssh_key_path), destination)?;
        }

        let spec = self
            .config
            .machine_spec(&self.name, key_id)
            .map_err(ProvisionError::Validation)?;
        let mut lifecycle = ProvisioningLifecycle::with_policy(&self.api, self.config.poll_policy());
        match lifecycle.run(&spec).await {
            Ok(machine) => {
                self.machine_id = Some(machine.machine_id);
                self.address = Some(machine.address);
                Ok(())
            }
            Err(err) => {
                if let Some(orphan) = err.machine_id() {
                    warn!(machine_id = orphan, "create failed after the machine was submitted");
                    self.machine_id = Some(orphan.to_owned());
                }
                Err(err.into())
            }
        }
    }

    async fn fetch_state(&self) -> Result<MachineState, DriverError> {
        let Some(machine_id) = self.machine_id() else {
            return Ok(MachineState::Unknown);
        };
        let machine = self.api.get_machine(machine_id).await?;
        Ok(MachineState::from_provider(machine.state))
    }

    async fn power(&self, action: PowerAction) -> Result<(), DriverError> {
        let machine_id = self.require_machine()?;
        info!(machine_id, action = action.path_segment(), "changing power state");
        self.api.power(machine_id, action).await?;
        Ok(())
    }

    /// Re-fetches the machine and records its current address.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoMachine`] when nothing is attached and
    /// [`DriverError::Api`] when the fetch fails. An address that does not
    /// parse is [`ProvisionError::InvalidAddress`] and leaves the cached
    /// address untouched.
    pub async fn refresh_address(&mut self) -> Result<Option<IpAddr>, DriverError> {
        let machine_id = self.require_machine()?;
        let machine = self.api.get_machine(machine_id).await?;
        let address: Option<IpAddr> = machine
            .public_ip
            .map(|raw| {
                raw.parse().map_err(|_| ProvisionError::InvalidAddress {
                    machine_id: machine.id.clone(),
                    address: raw,
                })
            })
            .transpose()?;
        self.address = address;
        Ok(address)
    }

    async fn delete(&mut self) -> Result<(), DriverError> {
        let machine_id = self.require_machine()?.to_owned();
        if !self.api.delete_machine(&machine_id).await? {
            warn!(%machine_id, "provider declined delete");
            return Err(DriverError::DeleteRejected { machine_id });
        }
        info!(%machine_id, "machine deleted");
        self.machine_id = None;
        self.address = None;
        Ok(())
    }
}

impl<A> MachineDriver for E24Driver<A>
where
    A: MachineApi + Send + Sync,
{
    fn validate_config(&self) -> Result<(), DriverError> {
        Ok(self.config.validate()?)
    }

    fn create(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move { self.create_machine().await })
    }

    fn current_state(&self) -> DriverFuture<'_, MachineState> {
        Box::pin(async move { self.fetch_state().await })
    }

    fn start(&self) -> DriverFuture<'_, ()> {
        Box::pin(async move { self.power(PowerAction::PowerOn).await })
    }

    fn stop(&self) -> DriverFuture<'_, ()> {
        Box::pin(async move { self.power(PowerAction::ShutDown).await })
    }

    fn restart(&self) -> DriverFuture<'_, ()> {
        Box::pin(async move { self.power(PowerAction::Reboot).await })
    }

    fn kill(&self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported {
            operation: String::from("kill"),
        })
    }

    fn destroy(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(async move { self.delete().await })
    }

    fn address(&self) -> Option<IpAddr> {
        self.address
    }
}
