//! Core library for the e24cloud machine driver.
//!
//! The crate signs and issues calls against the e24cloud v2 API, drives a
//! new machine from create request to a reachable public address, and
//! exposes that lifecycle through a small driver surface for a host runtime.

pub mod api;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod lifecycle;
pub mod machine;
pub mod poll;
pub mod signing;
pub mod test_support;

pub use api::{ApiError, ApiTransport, E24Client, RegionInfo, Template};
pub use config::{ConfigError, DriverConfig};
pub use credentials::{Credentials, Region, UnknownRegion};
pub use driver::{DriverError, E24Driver, MachineDriver, MachineState};
pub use lifecycle::{ProvisionError, ProvisionState, ProvisionedMachine, ProvisioningLifecycle};
pub use machine::{
    LifecycleState, MachineApi, MachineHandle, MachineSpec, MachineSpecBuilder, PowerAction,
    SpecError, SshKeyRef,
};
pub use poll::{PollError, PollPolicy, Polled, poll_until};
pub use signing::{
    RequestSignature, SigningError, authorization, canonical_string, http_date, sign, sign_request,
};
