//! JSON envelopes exchanged with the e24cloud API.

use serde::{Deserialize, Deserializer, Serialize};

use crate::machine::{LifecycleState, MachineHandle, MachineSpec, SshKeyRef};

/// OS template offered by the provider.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Template {
    /// Template identifier, usable as the machine's OS image.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Region listed by the `regions` endpoint.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RegionInfo {
    /// Region identifier.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Accepts numeric or string identifiers.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(value) => value.to_string(),
        RawId::Text(value) => value,
    })
}

#[derive(Serialize)]
pub(super) struct CreateVmEnvelope<'a> {
    pub(super) create_vm: CreateVmBody<'a>,
}

#[derive(Serialize)]
pub(super) struct CreateVmBody<'a> {
    cpus: u32,
    ram: u32,
    zone_id: &'a str,
    name: &'a str,
    boot_type: &'a str,
    os: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_data: Option<&'a str>,
}

impl<'a> CreateVmBody<'a> {
    pub(super) fn new(spec: &'a MachineSpec, zone_id: &'a str) -> Self {
        Self {
            cpus: spec.cpus,
            ram: spec.ram_mb,
            zone_id,
            name: &spec.name,
            boot_type: &spec.boot_type,
            os: &spec.os_image,
            password: spec.password.as_deref(),
            key_id: spec.ssh_key_id.map(|id| id.to_string()),
            user_data: spec.user_data.as_deref(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct CreateVmResponse {
    #[serde(default)]
    pub(super) success: bool,
    #[serde(default)]
    pub(super) virtual_machine: Option<MachineId>,
}

#[derive(Deserialize)]
pub(super) struct MachineId {
    #[serde(default, deserialize_with = "optional_id")]
    pub(super) id: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct MachineEnvelope {
    #[serde(default)]
    pub(super) success: bool,
    #[serde(default)]
    pub(super) virtual_machine: Option<MachineDetails>,
}

#[derive(Deserialize)]
pub(super) struct MachineDetails {
    #[serde(default, deserialize_with = "optional_id")]
    id: Option<String>,
    #[serde(default)]
    cores: Option<u32>,
    #[serde(default)]
    ram: Option<u32>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    public_interface: Option<PublicInterface>,
}

#[derive(Deserialize)]
struct PublicInterface {
    #[serde(default)]
    primary_ip_ipv4address: Option<String>,
}

impl MachineDetails {
    /// Converts the wire shape, returning `None` when the id is missing.
    pub(super) fn into_handle(self) -> Option<MachineHandle> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let public_ip = self
            .public_interface
            .and_then(|iface| iface.primary_ip_ipv4address)
            .map(|ip| ip.trim().to_owned())
            .filter(|ip| !ip.is_empty());
        Some(MachineHandle {
            id,
            cpus: self.cores.unwrap_or_default(),
            ram_mb: self.ram.unwrap_or_default(),
            state: self
                .state
                .as_deref()
                .map_or(LifecycleState::Unknown, LifecycleState::from_provider),
            public_ip,
        })
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "id_as_string")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(id)| id))
}

#[derive(Deserialize)]
pub(super) struct SuccessEnvelope {
    #[serde(default)]
    pub(super) success: bool,
}

#[derive(Deserialize)]
pub(super) struct AccountEnvelope {
    #[serde(default)]
    pub(super) account: Option<Account>,
}

#[derive(Deserialize)]
pub(super) struct Account {
    #[serde(default)]
    pub(super) ssh_keys: Option<Vec<SshKeyEntry>>,
}

#[derive(Deserialize)]
pub(super) struct SshKeyEntry {
    id: u64,
    #[serde(default)]
    name: Option<String>,
}

impl From<SshKeyEntry> for SshKeyRef {
    fn from(value: SshKeyEntry) -> Self {
        Self {
            id: value.id,
            name: value.name.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct TemplatesEnvelope {
    #[serde(default)]
    pub(super) templates: Option<Vec<Template>>,
}

#[derive(Deserialize)]
pub(super) struct RegionsEnvelope {
    #[serde(default)]
    pub(super) regions: Option<Vec<RegionInfo>>,
}
