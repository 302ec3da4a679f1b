//! Machine descriptions and the provider seam used by the lifecycle.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::api::{ApiError, RegionInfo, Template};

/// Largest vCPU count the provider accepts.
pub const MAX_CPUS: u32 = 16;
/// Largest RAM size, in megabytes, the provider accepts.
pub const MAX_RAM_MB: u32 = 32_000;
/// Boot type used for template based installs.
pub const DEFAULT_BOOT_TYPE: &str = "image";
/// Ubuntu template identifier.
pub const DEFAULT_OS_IMAGE: &str = "2528";

/// Parameters for a new virtual machine.
///
/// The placement zone is not part of the spec; the client derives it from
/// its region.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MachineSpec {
    /// Number of virtual CPUs.
    pub cpus: u32,
    /// RAM in megabytes.
    pub ram_mb: u32,
    /// Machine name shown in the provider console.
    pub name: String,
    /// Boot type (`image` for template installs).
    pub boot_type: String,
    /// Operating system template identifier.
    pub os_image: String,
    /// SSH key installed on first boot.
    pub ssh_key_id: Option<u64>,
    /// Optional root password.
    pub password: Option<String>,
    /// Optional cloud-init style user data.
    pub user_data: Option<String>,
}

/// Pre-flight validation failures for a [`MachineSpec`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SpecError {
    /// Raised when a required field is empty.
    #[error("missing or empty field: {0}")]
    Missing(String),
    /// Raised when a numeric field is zero or above the provider limit.
    #[error("{field} must be between 1 and {max}, got {value}")]
    OutOfRange {
        /// Field name.
        field: String,
        /// Rejected value.
        value: u32,
        /// Upper bound.
        max: u32,
    },
}

impl MachineSpec {
    /// Starts a builder with provider defaults.
    #[must_use]
    pub fn builder() -> MachineSpecBuilder {
        MachineSpecBuilder::new()
    }

    /// Checks the resource limits and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] describing the first offending field.
    pub fn validate(&self) -> Result<(), SpecError> {
        check_range("cpus", self.cpus, MAX_CPUS)?;
        check_range("ram", self.ram_mb, MAX_RAM_MB)?;
        if self.name.is_empty() {
            return Err(SpecError::Missing("name".to_owned()));
        }
        if self.boot_type.is_empty() {
            return Err(SpecError::Missing("boot_type".to_owned()));
        }
        if self.os_image.is_empty() {
            return Err(SpecError::Missing("os_image".to_owned()));
        }
        Ok(())
    }
}

/// Checks that `value` is in `1..=max`.
///
/// # Errors
///
/// Returns [`SpecError::OutOfRange`] otherwise.
pub fn check_range(field: &str, value: u32, max: u32) -> Result<(), SpecError> {
    if value == 0 || value > max {
        return Err(SpecError::OutOfRange {
            field: field.to_owned(),
            value,
            max,
        });
    }
    Ok(())
}

/// Builder for [`MachineSpec`] that trims strings and validates on build.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MachineSpecBuilder {
    cpus: u32,
    ram_mb: u32,
    name: String,
    boot_type: String,
    os_image: String,
    ssh_key_id: Option<u64>,
    password: Option<String>,
    user_data: Option<String>,
}

impl Default for MachineSpecBuilder {
    fn default() -> Self {
        Self {
            cpus: 1,
            ram_mb: 512,
            name: String::new(),
            boot_type: DEFAULT_BOOT_TYPE.to_owned(),
            os_image: DEFAULT_OS_IMAGE.to_owned(),
            ssh_key_id: None,
            password: None,
            user_data: None,
        }
    }
}

impl MachineSpecBuilder {
    /// Creates a builder with one CPU, 512 MB and the Ubuntu template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the CPU count.
    #[must_use]
    pub const fn cpus(mut self, value: u32) -> Self {
        self.cpus = value;
        self
    }

    /// Sets the RAM size in megabytes.
    #[must_use]
    pub const fn ram_mb(mut self, value: u32) -> Self {
        self.ram_mb = value;
        self
    }

    /// Sets the machine name.
    #[must_use]
    pub fn name(mut self, value: impl Into<String>) -> Self {
        self.name = value.into();
        self
    }

    /// Sets the boot type.
    #[must_use]
    pub fn boot_type(mut self, value: impl Into<String>) -> Self {
        self.boot_type = value.into();
        self
    }

    /// Sets the operating system template.
    #[must_use]
    pub fn os_image(mut self, value: impl Into<String>) -> Self {
        self.os_image = value.into();
        self
    }

    /// Sets the SSH key id.
    #[must_use]
    pub const fn ssh_key_id(mut self, value: Option<u64>) -> Self {
        self.ssh_key_id = value;
        self
    }

    /// Sets the root password.
    #[must_use]
    pub fn password(mut self, value: Option<String>) -> Self {
        self.password = value;
        self
    }

    /// Sets the user data payload.
    #[must_use]
    pub fn user_data(mut self, value: Option<String>) -> Self {
        self.user_data = value;
        self
    }

    /// Builds and validates the [`MachineSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when a limit is exceeded or a field is empty.
    pub fn build(self) -> Result<MachineSpec, SpecError> {
        let spec = MachineSpec {
            cpus: self.cpus,
            ram_mb: self.ram_mb,
            name: self.name.trim().to_owned(),
            boot_type: self.boot_type.trim().to_owned(),
            os_image: self.os_image.trim().to_owned(),
            ssh_key_id: self.ssh_key_id,
            password: self.password.filter(|value| !value.is_empty()),
            user_data: self.user_data.filter(|value| !value.trim().is_empty()),
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Provider reported machine status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LifecycleState {
    /// `installing`
    Provisioning,
    /// `online`
    Online,
    /// `offline`
    Offline,
    /// `deleting`
    Deleting,
    /// Anything else, including a missing state.
    #[default]
    Unknown,
}

impl LifecycleState {
    /// Maps the provider's state string.
    #[must_use]
    pub fn from_provider(value: &str) -> Self {
        match value {
            "installing" => Self::Provisioning,
            "online" => Self::Online,
            "offline" => Self::Offline,
            "deleting" => Self::Deleting,
            _ => Self::Unknown,
        }
    }
}

/// Snapshot of a machine as last fetched from the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MachineHandle {
    /// Provider assigned identifier.
    pub id: String,
    /// vCPU count.
    pub cpus: u32,
    /// RAM in megabytes.
    pub ram_mb: u32,
    /// Provider status.
    pub state: LifecycleState,
    /// Primary public IPv4 address, once assigned.
    pub public_ip: Option<String>,
}

/// SSH key registered on the account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SshKeyRef {
    /// Key identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
}

/// Power transitions the provider supports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PowerAction {
    /// Boot a stopped machine.
    PowerOn,
    /// Graceful shutdown.
    ShutDown,
    /// Restart.
    Reboot,
}

impl PowerAction {
    /// Path segment appended to `virtual-machines/{id}/`.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::PowerOn => "poweron",
            Self::ShutDown => "shutdown",
            Self::Reboot => "reboot",
        }
    }
}

/// Future returned by [`MachineApi`] operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Provider operations the lifecycle and driver depend on.
pub trait MachineApi {
    /// Submits a create request and returns the new machine id.
    fn create_machine<'a>(&'a self, spec: &'a MachineSpec) -> ApiFuture<'a, String>;

    /// Fetches the current snapshot of a machine.
    fn get_machine<'a>(&'a self, id: &'a str) -> ApiFuture<'a, MachineHandle>;

    /// Deletes a machine; `false` means the provider declined.
    fn delete_machine<'a>(&'a self, id: &'a str) -> ApiFuture<'a, bool>;

    /// Resolves an SSH key name to its id, first match wins.
    fn key_id_by_name<'a>(&'a self, name: &'a str) -> ApiFuture<'a, u64>;

    /// Requests a power transition without waiting for it.
    fn power<'a>(&'a self, id: &'a str, action: PowerAction) -> ApiFuture<'a, ()>;

    /// Lists OS templates.
    fn templates(&self) -> ApiFuture<'_, Vec<Template>>;

    /// Lists regions.
    fn regions(&self) -> ApiFuture<'_, Vec<RegionInfo>>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn builder_applies_provider_defaults() {
        let spec = MachineSpec::builder()
            .name("  docker-host ")
            .password(Some(String::new()))
            .user_data(Some(String::from("  ")))
            .build()
            .unwrap_or_else(|err| panic!("defaults should be valid: {err}"));

        assert_eq!(spec.cpus, 1);
        assert_eq!(spec.ram_mb, 512);
        assert_eq!(spec.name, "docker-host");
        assert_eq!(spec.boot_type, DEFAULT_BOOT_TYPE);
        assert_eq!(spec.os_image, DEFAULT_OS_IMAGE);
        assert_eq!(spec.password, None);
        assert_eq!(spec.user_data, None);
    }

    #[rstest]
    #[case(16, 32_000, true)]
    #[case(17, 512, false)]
    #[case(1, 32_001, false)]
    #[case(0, 512, false)]
    #[case(1, 0, false)]
    fn limits_are_enforced_before_submission(
        #[case] cpus: u32,
        #[case] ram_mb: u32,
        #[case] accepted: bool,
    ) {
        let result = MachineSpec::builder()
            .name("limits")
            .cpus(cpus)
            .ram_mb(ram_mb)
            .build();

        assert_eq!(result.is_ok(), accepted, "{result:?}");
    }

    #[test]
    fn empty_name_is_missing() {
        let err = MachineSpec::builder()
            .name(" ")
            .build()
            .expect_err("blank name should be rejected");

        assert_eq!(err, SpecError::Missing(String::from("name")));
    }

    #[rstest]
    #[case("installing", LifecycleState::Provisioning)]
    #[case("online", LifecycleState::Online)]
    #[case("offline", LifecycleState::Offline)]
    #[case("deleting", LifecycleState::Deleting)]
    #[case("", LifecycleState::Unknown)]
    #[case("ONLINE", LifecycleState::Unknown)]
    fn provider_states_map(#[case] raw: &str, #[case] expected: LifecycleState) {
        assert_eq!(LifecycleState::from_provider(raw), expected);
    }
}
