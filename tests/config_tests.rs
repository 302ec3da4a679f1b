//! Unit tests for driver configuration validation.

#[path = "common/key_file.rs"]
mod key_file;
#[path = "common/test_constants.rs"]
mod test_constants;

use std::time::Duration;

use e24cloud_driver::test_support::sample_config;
use e24cloud_driver::{ConfigError, DriverConfig, Region};
use rstest::*;

use key_file::{KeyFile, key_file};
use test_constants::{KEY_FILE_NAME, MAX_CPUS, MAX_RAM_MB};

#[fixture]
fn key() -> KeyFile {
    key_file(KEY_FILE_NAME)
}

fn valid_config(key: &KeyFile) -> DriverConfig {
    sample_config(key.path.as_str())
}

#[rstest]
fn sample_config_validates(key: KeyFile) {
    valid_config(&key)
        .validate()
        .unwrap_or_else(|err| panic!("sample config should validate: {err}"));
}

#[rstest]
fn config_validation_rejects_missing_secret_with_actionable_error(key: KeyFile) {
    let cfg = DriverConfig {
        api_secret: String::from("  "),
        ..valid_config(&key)
    };

    let error = cfg.validate().expect_err("secret is required");
    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error, got {error:?}");
    };
    assert!(
        message.contains("E24CLOUD_API_SECRET"),
        "error should mention env var: {message}"
    );
    assert!(
        message.contains("e24cloud.toml"),
        "error should mention config file: {message}"
    );
    assert!(
        message.contains("api_secret"),
        "error should mention TOML key: {message}"
    );
}

/// Verifies that validation produces actionable errors mentioning both the
/// environment variable and configuration file for each required field.
#[rstest]
#[case::api_key(|cfg: &mut DriverConfig| cfg.api_key.clear(), "E24CLOUD_API_KEY", "api_key")]
#[case::region(|cfg: &mut DriverConfig| cfg.region.clear(), "E24CLOUD_REGION", "region")]
#[case::key_name(
    |cfg: &mut DriverConfig| cfg.ssh_key_name.clear(),
    "E24CLOUD_SSH_KEY_NAME",
    "ssh_key_name"
)]
#[case::key_path(
    |cfg: &mut DriverConfig| cfg.ssh_key_path.clear(),
    "E24CLOUD_SSH_KEY_PATH",
    "ssh_key_path"
)]
fn config_validation_produces_actionable_errors(
    key: KeyFile,
    #[case] mutate: fn(&mut DriverConfig),
    #[case] env_var: &str,
    #[case] toml_key: &str,
) {
    let mut cfg = valid_config(&key);
    mutate(&mut cfg);

    let error = cfg.validate().expect_err("validation should fail");
    assert!(
        matches!(error, ConfigError::MissingField(_)),
        "unexpected error: {error:?}"
    );
    let message = error.to_string();
    assert!(
        message.contains(env_var),
        "error should mention env var {env_var}: {message}"
    );
    assert!(
        message.contains(toml_key),
        "error should mention TOML key {toml_key}: {message}"
    );
}

#[rstest]
#[case(MAX_CPUS, 512, true)]
#[case(MAX_CPUS + 1, 512, false)]
#[case(1, MAX_RAM_MB, true)]
#[case(1, MAX_RAM_MB + 1, false)]
#[case(0, 512, false)]
fn resource_limits_are_checked(
    key: KeyFile,
    #[case] cpus: u32,
    #[case] ram: u32,
    #[case] accepted: bool,
) {
    let cfg = DriverConfig {
        cpus,
        ram,
        ..valid_config(&key)
    };

    let result = cfg.validate();
    assert_eq!(result.is_ok(), accepted, "{result:?}");
    if let Err(error) = result {
        assert!(
            matches!(error, ConfigError::Invalid(_)),
            "unexpected error: {error:?}"
        );
    }
}

#[rstest]
fn unknown_region_is_invalid(key: KeyFile) {
    let cfg = DriverConfig {
        region: String::from("eu-germany-1"),
        ..valid_config(&key)
    };

    let error = cfg.validate().expect_err("unknown region should fail");
    assert!(
        matches!(&error, ConfigError::Invalid(message) if message.contains("eu-germany-1")),
        "unexpected error: {error:?}"
    );
}

#[rstest]
fn missing_key_file_is_invalid(key: KeyFile) {
    let absent = key.root.join("id_missing");
    let cfg = DriverConfig {
        ssh_key_path: absent.to_string(),
        ..valid_config(&key)
    };

    let error = cfg.validate().expect_err("missing key should fail");
    assert!(
        matches!(&error, ConfigError::Invalid(message) if message.contains(absent.as_str())),
        "unexpected error: {error:?}"
    );
}

#[rstest]
fn credentials_follow_region(key: KeyFile) {
    let cfg = DriverConfig {
        region: String::from("eu-poland-1poznan"),
        ..valid_config(&key)
    };

    let credentials = cfg
        .credentials()
        .unwrap_or_else(|err| panic!("credentials should build: {err}"));
    assert_eq!(credentials.region(), Region::EuPoland1Poznan);
    assert_eq!(credentials.api_key(), "E24APIKEYEXAMPLE");
}

#[rstest]
fn zero_timeout_polls_without_deadline(key: KeyFile) {
    let bounded = valid_config(&key).poll_policy();
    assert_eq!(bounded.interval(), Duration::from_secs(5));
    assert_eq!(bounded.deadline(), Some(Duration::from_secs(1800)));

    let unbounded = DriverConfig {
        provision_timeout_secs: 0,
        ..valid_config(&key)
    }
    .poll_policy();
    assert_eq!(unbounded.deadline(), None);
}

#[rstest]
fn machine_spec_carries_configured_resources(key: KeyFile) {
    let cfg = DriverConfig {
        cpus: 4,
        ram: 8192,
        ..valid_config(&key)
    };

    let spec = cfg
        .machine_spec("builder", 7)
        .unwrap_or_else(|err| panic!("spec should build: {err}"));
    assert_eq!(spec.cpus, 4);
    assert_eq!(spec.ram_mb, 8192);
    assert_eq!(spec.ssh_key_id, Some(7));
    assert_eq!(spec.os_image, "2528");
}
