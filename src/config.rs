//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use camino::Utf8Path;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::api::{ApiTransport, E24Client};
use crate::credentials::{Credentials, Region};
use crate::driver::ssh_key::key_exists;
use crate::machine::{MAX_CPUS, MAX_RAM_MB, MachineSpec, SpecError, check_range};
use crate::poll::PollPolicy;

/// Driver settings merged from defaults, configuration files, environment
/// variables, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "E24CLOUD",
    discovery(
        app_name = "e24cloud",
        env_var = "E24CLOUD_CONFIG_PATH",
        config_file_name = "e24cloud.toml",
        dotfile_name = ".e24cloud.toml",
        project_file_name = "e24cloud.toml"
    )
)]
pub struct DriverConfig {
    /// API key identifying the account.
    pub api_key: String,
    /// API secret used to sign requests.
    pub api_secret: String,
    /// Region name. Defaults to `eu-poland-1warszawa`.
    #[ortho_config(default = "eu-poland-1warszawa".to_owned())]
    pub region: String,
    /// Name of the account SSH key installed on new machines.
    #[ortho_config(default = String::new())]
    pub ssh_key_name: String,
    /// Local path of the matching private key.
    #[ortho_config(default = String::new())]
    pub ssh_key_path: String,
    /// vCPU count for new machines.
    #[ortho_config(default = 1)]
    pub cpus: u32,
    /// RAM in megabytes for new machines.
    #[ortho_config(default = 512)]
    pub ram: u32,
    /// Operating system template identifier.
    #[ortho_config(default = "2528".to_owned())]
    pub os_image: String,
    /// Seconds between polls while waiting for an address.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Upper bound on the provisioning wait in seconds; `0` waits forever.
    #[ortho_config(default = 1800)]
    pub provision_timeout_secs: u64,
    /// Overrides the region's API base URL, for example to reach a proxy.
    pub api_url: Option<String>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn hint(&self) -> String {
        format!(
            "set {} or add {} to [e24cloud] in e24cloud.toml",
            self.env_var, self.toml_key
        )
    }
}

const API_KEY: FieldMetadata = FieldMetadata::new("e24cloud API key", "E24CLOUD_API_KEY", "api_key");
const API_SECRET: FieldMetadata =
    FieldMetadata::new("e24cloud API secret", "E24CLOUD_API_SECRET", "api_secret");
const REGION: FieldMetadata = FieldMetadata::new("region", "E24CLOUD_REGION", "region");
const SSH_KEY_NAME: FieldMetadata =
    FieldMetadata::new("SSH key name", "E24CLOUD_SSH_KEY_NAME", "ssh_key_name");
const SSH_KEY_PATH: FieldMetadata =
    FieldMetadata::new("SSH private key path", "E24CLOUD_SSH_KEY_PATH", "ssh_key_path");
const CPUS: FieldMetadata = FieldMetadata::new("vCPU count", "E24CLOUD_CPUS", "cpus");
const RAM: FieldMetadata = FieldMetadata::new("RAM size", "E24CLOUD_RAM", "ram");
const POLL_INTERVAL: FieldMetadata = FieldMetadata::new(
    "poll interval",
    "E24CLOUD_POLL_INTERVAL_SECS",
    "poll_interval_secs",
);

impl DriverConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }

    fn invalid(metadata: &FieldMetadata, reason: impl std::fmt::Display) -> ConfigError {
        ConfigError::Invalid(format!(
            "invalid {}: {reason}; {}",
            metadata.description,
            metadata.hint()
        ))
    }

    /// Loads configuration from defaults, `e24cloud.toml` and `E24CLOUD_*`
    /// environment variables, in that order of precedence. Command-line
    /// arguments belong to the subcommand parser and are not consulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("e24cloud-driver")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Parsed region.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for names outside the region table.
    pub fn parsed_region(&self) -> Result<Region, ConfigError> {
        Self::require_field(&self.region, &REGION)?;
        self.region
            .parse()
            .map_err(|err| Self::invalid(&REGION, err))
    }

    /// Checks credentials, region, key settings and resource limits. Never
    /// touches the network.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for empty required values and
    /// [`ConfigError::Invalid`] for values the provider would reject.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_region()?;
        Self::require_field(&self.api_secret, &API_SECRET)?;
        Self::require_field(&self.api_key, &API_KEY)?;
        Self::require_field(&self.ssh_key_name, &SSH_KEY_NAME)?;
        Self::require_field(&self.ssh_key_path, &SSH_KEY_PATH)?;
        match key_exists(Utf8Path::new(&self.ssh_key_path)) {
            Ok(true) => {}
            Ok(false) => {
                return Err(Self::invalid(
                    &SSH_KEY_PATH,
                    format!("{} does not exist", self.ssh_key_path),
                ));
            }
            Err(err) => return Err(Self::invalid(&SSH_KEY_PATH, err)),
        }
        check_range("cpus", self.cpus, MAX_CPUS).map_err(|err| Self::invalid(&CPUS, err))?;
        check_range("ram", self.ram, MAX_RAM_MB).map_err(|err| Self::invalid(&RAM, err))?;
        if self.poll_interval_secs == 0 {
            return Err(Self::invalid(&POLL_INTERVAL, "must be at least one second"));
        }
        Ok(())
    }

    /// Credentials for the configured region.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the region or credentials are invalid.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let region = self.parsed_region()?;
        Self::require_field(&self.api_secret, &API_SECRET)?;
        Self::require_field(&self.api_key, &API_KEY)?;
        Ok(Credentials::new(
            self.api_key.trim(),
            self.api_secret.trim(),
            region,
        ))
    }

    /// Builds an API client, honouring `api_url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid credentials or when the HTTP client
    /// cannot be constructed.
    pub fn client(&self) -> Result<E24Client, ConfigError> {
        let mut transport = ApiTransport::new(self.credentials()?)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if let Some(url) = self.api_url.as_deref().filter(|url| !url.trim().is_empty()) {
            transport = transport.with_base_url(url.trim());
        }
        Ok(E24Client::from_transport(transport))
    }

    /// Polling policy derived from the interval and timeout settings.
    #[must_use]
    pub const fn poll_policy(&self) -> PollPolicy {
        let policy = PollPolicy::new(Duration::from_secs(self.poll_interval_secs));
        if self.provision_timeout_secs == 0 {
            policy
        } else {
            policy.with_deadline(Duration::from_secs(self.provision_timeout_secs))
        }
    }

    /// Builds the machine request for `name` with the resolved key id.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when the configured resources break provider
    /// limits or the name is empty.
    pub fn machine_spec(&self, name: &str, ssh_key_id: u64) -> Result<MachineSpec, SpecError> {
        MachineSpec::builder()
            .name(name)
            .cpus(self.cpus)
            .ram_mb(self.ram)
            .os_image(&self.os_image)
            .ssh_key_id(Some(ssh_key_id))
            .build()
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a value the provider would reject.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}
