//! Resource operations built on [`ApiTransport`].

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::transport::ApiTransport;
use super::types::{
    AccountEnvelope, CreateVmBody, CreateVmEnvelope, CreateVmResponse, MachineEnvelope,
    RegionsEnvelope, SuccessEnvelope, TemplatesEnvelope,
};
use super::{ApiError, RegionInfo, Template};
use crate::credentials::{Credentials, Region};
use crate::machine::{ApiFuture, MachineApi, MachineHandle, MachineSpec, PowerAction, SshKeyRef};

const MACHINES_PATH: &str = "virtual-machines";
const ACCOUNT_PATH: &str = "account";
const TEMPLATES_PATH: &str = "templates";
const REGIONS_PATH: &str = "regions";

/// e24cloud API client for one set of credentials.
///
/// The client holds no per-machine state and can be cloned freely; clones
/// share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct E24Client {
    transport: ApiTransport,
    region: Region,
}

fn decode<T: DeserializeOwned>(resource: &str, body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::Decode {
        resource: resource.to_owned(),
        message: err.to_string(),
    })
}

fn machine_path(id: &str) -> String {
    format!("{MACHINES_PATH}/{id}")
}

impl E24Client {
    /// Creates a client for the credentials' region.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self, ApiError> {
        let region = credentials.region();
        Ok(Self {
            transport: ApiTransport::new(credentials)?,
            region,
        })
    }

    /// Wraps an existing transport.
    #[must_use]
    pub const fn from_transport(transport: ApiTransport) -> Self {
        let region = transport.credentials().region();
        Self { transport, region }
    }

    /// Submits a create request and returns the machine id.
    ///
    /// The zone id comes from the client's region. Creation is not
    /// idempotent and is never retried.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport or status failures, and
    /// [`ApiError::Rejected`] when the API reports `success: false` or omits
    /// the id.
    #[instrument(skip(self, spec), fields(name = %spec.name, region = %self.region))]
    pub async fn create_machine(&self, spec: &MachineSpec) -> Result<String, ApiError> {
        let envelope = CreateVmEnvelope {
            create_vm: CreateVmBody::new(spec, self.region.zone_id()),
        };
        let body = serde_json::to_vec(&envelope).map_err(|err| ApiError::Decode {
            resource: String::from("create_vm"),
            message: err.to_string(),
        })?;

        let raw = self.transport.send(Method::PUT, MACHINES_PATH, body).await?;
        let response: CreateVmResponse = decode("virtual machine", &raw)?;

        let id = response
            .virtual_machine
            .and_then(|vm| vm.id)
            .filter(|id| !id.is_empty());
        match id {
            Some(id) if response.success => {
                debug!(machine_id = %id, "machine create accepted");
                Ok(id)
            }
            _ => Err(ApiError::Rejected {
                operation: String::from("create"),
                target: spec.name.clone(),
            }),
        }
    }

    /// Fetches a machine.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] for a malformed body and
    /// [`ApiError::NotFound`] when the API answers `success: false` or the
    /// body carries no machine id.
    pub async fn get_machine(&self, id: &str) -> Result<MachineHandle, ApiError> {
        let raw = self
            .transport
            .send(Method::GET, &machine_path(id), Vec::new())
            .await?;
        let envelope: MachineEnvelope = decode("virtual machine", &raw)?;

        let not_found = || ApiError::NotFound {
            resource: String::from("virtual machine"),
            name: id.to_owned(),
        };
        if !envelope.success {
            return Err(not_found());
        }
        envelope
            .virtual_machine
            .and_then(super::types::MachineDetails::into_handle)
            .ok_or_else(not_found)
    }

    /// Deletes a machine, returning the API's `success` flag.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, status or decode failures.
    #[instrument(skip(self))]
    pub async fn delete_machine(&self, id: &str) -> Result<bool, ApiError> {
        let raw = self
            .transport
            .send(Method::DELETE, &machine_path(id), Vec::new())
            .await?;
        let envelope: SuccessEnvelope = decode("delete", &raw)?;
        Ok(envelope.success)
    }

    /// Lists the account's SSH keys in the order the API returns them.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, status or decode failures.
    pub async fn ssh_keys(&self) -> Result<Vec<SshKeyRef>, ApiError> {
        let raw = self
            .transport
            .send(Method::GET, ACCOUNT_PATH, Vec::new())
            .await?;
        let envelope: AccountEnvelope = decode("account", &raw)?;
        Ok(envelope
            .account
            .and_then(|account| account.ssh_keys)
            .unwrap_or_default()
            .into_iter()
            .map(SshKeyRef::from)
            .collect())
    }

    /// Returns the id of the first key named `name`.
    ///
    /// Names are not unique on the account; the first entry in listed order
    /// wins.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when no key matches, including when the
    /// account has no keys.
    pub async fn key_id_by_name(&self, name: &str) -> Result<u64, ApiError> {
        self.ssh_keys()
            .await?
            .into_iter()
            .find(|key| key.name == name)
            .map(|key| key.id)
            .ok_or_else(|| ApiError::NotFound {
                resource: String::from("ssh key"),
                name: name.to_owned(),
            })
    }

    /// Requests a power transition without waiting for it to complete.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the API answers `success: false`.
    #[instrument(skip(self))]
    pub async fn power(&self, id: &str, action: PowerAction) -> Result<(), ApiError> {
        let path = format!("{}/{}", machine_path(id), action.path_segment());
        let raw = self.transport.send(Method::POST, &path, Vec::new()).await?;
        let envelope: SuccessEnvelope = decode(action.path_segment(), &raw)?;
        if envelope.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                operation: action.path_segment().to_owned(),
                target: id.to_owned(),
            })
        }
    }

    /// Boots a stopped machine.
    ///
    /// # Errors
    ///
    /// See [`E24Client::power`].
    pub async fn power_on(&self, id: &str) -> Result<(), ApiError> {
        self.power(id, PowerAction::PowerOn).await
    }

    /// Shuts a machine down.
    ///
    /// # Errors
    ///
    /// See [`E24Client::power`].
    pub async fn shut_down(&self, id: &str) -> Result<(), ApiError> {
        self.power(id, PowerAction::ShutDown).await
    }

    /// Reboots a machine.
    ///
    /// # Errors
    ///
    /// See [`E24Client::power`].
    pub async fn reboot(&self, id: &str) -> Result<(), ApiError> {
        self.power(id, PowerAction::Reboot).await
    }

    /// Lists OS templates.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, status or decode failures.
    pub async fn templates(&self) -> Result<Vec<Template>, ApiError> {
        let raw = self
            .transport
            .send(Method::GET, TEMPLATES_PATH, Vec::new())
            .await?;
        let envelope: TemplatesEnvelope = decode("templates", &raw)?;
        Ok(envelope.templates.unwrap_or_default())
    }

    /// Lists regions.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport, status or decode failures.
    pub async fn regions(&self) -> Result<Vec<RegionInfo>, ApiError> {
        let raw = self
            .transport
            .send(Method::GET, REGIONS_PATH, Vec::new())
            .await?;
        let envelope: RegionsEnvelope = decode("regions", &raw)?;
        Ok(envelope.regions.unwrap_or_default())
    }
}

impl MachineApi for E24Client {
    fn create_machine<'a>(&'a self, spec: &'a MachineSpec) -> ApiFuture<'a, String> {
        Box::pin(async move { Self::create_machine(self, spec).await })
    }

    fn get_machine<'a>(&'a self, id: &'a str) -> ApiFuture<'a, MachineHandle> {
        Box::pin(async move { Self::get_machine(self, id).await })
    }

    fn delete_machine<'a>(&'a self, id: &'a str) -> ApiFuture<'a, bool> {
        Box::pin(async move { Self::delete_machine(self, id).await })
    }

    fn key_id_by_name<'a>(&'a self, name: &'a str) -> ApiFuture<'a, u64> {
        Box::pin(async move { Self::key_id_by_name(self, name).await })
    }

    fn power<'a>(&'a self, id: &'a str, action: PowerAction) -> ApiFuture<'a, ()> {
        Box::pin(async move { Self::power(self, id, action).await })
    }

    fn templates(&self) -> ApiFuture<'_, Vec<Template>> {
        Box::pin(async move { Self::templates(self).await })
    }

    fn regions(&self) -> ApiFuture<'_, Vec<RegionInfo>> {
        Box::pin(async move { Self::regions(self).await })
    }
}
