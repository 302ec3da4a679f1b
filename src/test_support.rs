//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::api::{ApiError, RegionInfo, Template};
use crate::config::DriverConfig;
use crate::machine::{
    ApiFuture, DEFAULT_OS_IMAGE, LifecycleState, MachineApi, MachineHandle, MachineSpec,
    PowerAction, SshKeyRef,
};

/// Records a single call made through [`ScriptedApi`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApiCall {
    /// `create_machine` with the spec's name.
    Create(String),
    /// `get_machine` with the machine id.
    Get(String),
    /// `delete_machine` with the machine id.
    Delete(String),
    /// `key_id_by_name` with the key name.
    KeyLookup(String),
    /// `power` with the machine id and action.
    Power(String, PowerAction),
    /// `templates`.
    Templates,
    /// `regions`.
    Regions,
}

#[derive(Debug, Default)]
struct Script {
    creates: VecDeque<Result<String, ApiError>>,
    machines: VecDeque<Result<MachineHandle, ApiError>>,
    deletes: VecDeque<Result<bool, ApiError>>,
    power: VecDeque<Result<(), ApiError>>,
    keys: Vec<SshKeyRef>,
    calls: Vec<ApiCall>,
}

/// Scripted [`MachineApi`] that returns pre-seeded results in FIFO order.
///
/// Used to drive deterministic provider behaviour without HTTP. When a queue
/// runs dry, creates are rejected, fetches report not-found, deletes return
/// `false` and power actions succeed.
#[derive(Debug, Default)]
pub struct ScriptedApi {
    script: Mutex<Script>,
}

/// Builds a snapshot of a machine that has no address yet.
#[must_use]
pub fn pending_machine(id: &str) -> MachineHandle {
    MachineHandle {
        id: id.to_owned(),
        cpus: 1,
        ram_mb: 512,
        state: LifecycleState::Provisioning,
        public_ip: None,
    }
}

/// Builds a snapshot of an online machine with `ip` assigned.
#[must_use]
pub fn addressed_machine(id: &str, ip: &str) -> MachineHandle {
    MachineHandle {
        state: LifecycleState::Online,
        public_ip: Some(ip.to_owned()),
        ..pending_machine(id)
    }
}

impl ScriptedApi {
    /// Creates an API double with empty queues and no SSH keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues the result of the next `create_machine`.
    pub fn push_create(&self, result: Result<String, ApiError>) {
        self.script().creates.push_back(result);
    }

    /// Queues the result of the next `get_machine`.
    pub fn push_machine(&self, result: Result<MachineHandle, ApiError>) {
        self.script().machines.push_back(result);
    }

    /// Queues the result of the next `delete_machine`.
    pub fn push_delete(&self, result: Result<bool, ApiError>) {
        self.script().deletes.push_back(result);
    }

    /// Queues the result of the next power action.
    pub fn push_power(&self, result: Result<(), ApiError>) {
        self.script().power.push_back(result);
    }

    /// Replaces the account's SSH keys.
    pub fn set_keys(&self, keys: impl IntoIterator<Item = (u64, &'static str)>) {
        self.script().keys = keys
            .into_iter()
            .map(|(id, name)| SshKeyRef {
                id,
                name: name.to_owned(),
            })
            .collect();
    }

    /// Returns a snapshot of all calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.script().calls.clone()
    }

    /// Number of `get_machine` calls recorded so far.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|call| matches!(call, ApiCall::Get(_)))
            .count()
    }

    fn record(&self, call: ApiCall) -> MutexGuard<'_, Script> {
        let mut script = self.script();
        script.calls.push(call);
        script
    }
}

impl MachineApi for ScriptedApi {
    fn create_machine<'a>(&'a self, spec: &'a MachineSpec) -> ApiFuture<'a, String> {
        let result = self
            .record(ApiCall::Create(spec.name.clone()))
            .creates
            .pop_front()
            .unwrap_or_else(|| {
                Err(ApiError::Rejected {
                    operation: String::from("create"),
                    target: spec.name.clone(),
                })
            });
        Box::pin(async move { result })
    }

    fn get_machine<'a>(&'a self, id: &'a str) -> ApiFuture<'a, MachineHandle> {
        let result = self
            .record(ApiCall::Get(id.to_owned()))
            .machines
            .pop_front()
            .unwrap_or_else(|| {
                Err(ApiError::NotFound {
                    resource: String::from("virtual machine"),
                    name: id.to_owned(),
                })
            });
        Box::pin(async move { result })
    }

    fn delete_machine<'a>(&'a self, id: &'a str) -> ApiFuture<'a, bool> {
        let result = self
            .record(ApiCall::Delete(id.to_owned()))
            .deletes
            .pop_front()
            .unwrap_or(Ok(false));
        Box::pin(async move { result })
    }

    fn key_id_by_name<'a>(&'a self, name: &'a str) -> ApiFuture<'a, u64> {
        let result = self
            .record(ApiCall::KeyLookup(name.to_owned()))
            .keys
            .iter()
            .find(|key| key.name == name)
            .map(|key| key.id)
            .ok_or_else(|| ApiError::NotFound {
                resource: String::from("ssh key"),
                name: name.to_owned(),
            });
        Box::pin(async move { result })
    }

    fn power<'a>(&'a self, id: &'a str, action: PowerAction) -> ApiFuture<'a, ()> {
        let result = self
            .record(ApiCall::Power(id.to_owned(), action))
            .power
            .pop_front()
            .unwrap_or(Ok(()));
        Box::pin(async move { result })
    }

    fn templates(&self) -> ApiFuture<'_, Vec<Template>> {
        drop(self.record(ApiCall::Templates));
        Box::pin(async { Ok(Vec::new()) })
    }

    fn regions(&self) -> ApiFuture<'_, Vec<RegionInfo>> {
        drop(self.record(ApiCall::Regions));
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// Builds a valid configuration pointing at `ssh_key_path`.
#[must_use]
pub fn sample_config(ssh_key_path: &str) -> DriverConfig {
    DriverConfig {
        api_key: String::from("E24APIKEYEXAMPLE"),
        api_secret: String::from("E24APISECRETEXAMPLE"),
        region: String::from("eu-poland-1warszawa"),
        ssh_key_name: String::from("deploy"),
        ssh_key_path: ssh_key_path.to_owned(),
        cpus: 1,
        ram: 512,
        os_image: String::from(DEFAULT_OS_IMAGE),
        poll_interval_secs: 5,
        provision_timeout_secs: 1800,
        api_url: None,
    }
}
