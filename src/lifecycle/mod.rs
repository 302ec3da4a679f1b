//! Provisioning state machine: create, poll until addressable, ready.
//!
//! ```text
//! Requested ──create──▶ Provisioning ──ip seen──▶ Addressable ──▶ Ready
//!     │                    │  ▲   │
//!     │                    └──┘   │ (no ip yet: wait, re-poll)
//!     └──────── fault ─────────────┴──▶ Failed
//! ```
//!
//! Creation is never retried because the API offers no idempotency key.
//! Polling faults are surfaced rather than retried, since a transient error
//! and a broken machine look the same from here. The public IP is the only
//! readiness signal; the provider's `state` field is logged but not required.

mod error;

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::machine::{MachineApi, MachineSpec};
use crate::poll::{PollError, PollPolicy, poll_until};

pub use error::ProvisionError;

/// Wait between polls while the machine has no public IP.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default upper bound on the provisioning wait.
pub const DEFAULT_PROVISION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Local provisioning progress, distinct from the provider's machine state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ProvisionState {
    /// Nothing submitted yet.
    #[default]
    Requested,
    /// Create accepted, waiting for an address.
    Provisioning {
        /// Provider machine id.
        machine_id: String,
    },
    /// A public IP has been observed.
    Addressable {
        /// Provider machine id.
        machine_id: String,
        /// Assigned address.
        address: IpAddr,
    },
    /// Terminal success.
    Ready {
        /// Provider machine id.
        machine_id: String,
        /// Assigned address.
        address: IpAddr,
    },
    /// Terminal failure.
    Failed {
        /// Machine id, when creation got that far.
        machine_id: Option<String>,
    },
}

impl ProvisionState {
    /// Returns `true` for `Ready` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready { .. } | Self::Failed { .. })
    }
}

/// Result of a successful provisioning run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionedMachine {
    /// Provider machine id.
    pub machine_id: String,
    /// Reachable public address.
    pub address: IpAddr,
    /// Number of `get_machine` calls made while waiting.
    pub polls: u32,
}

/// Drives one machine from request to a reachable address.
#[derive(Debug)]
pub struct ProvisioningLifecycle<'a, A> {
    api: &'a A,
    policy: PollPolicy,
    state: ProvisionState,
    history: Vec<ProvisionState>,
}

impl<'a, A: MachineApi> ProvisioningLifecycle<'a, A> {
    /// Creates a lifecycle polling every five seconds for up to thirty
    /// minutes.
    #[must_use]
    pub fn new(api: &'a A) -> Self {
        Self::with_policy(
            api,
            PollPolicy::new(POLL_INTERVAL).with_deadline(DEFAULT_PROVISION_TIMEOUT),
        )
    }

    /// Creates a lifecycle with an explicit polling policy.
    #[must_use]
    pub fn with_policy(api: &'a A, policy: PollPolicy) -> Self {
        Self {
            api,
            policy,
            state: ProvisionState::Requested,
            history: vec![ProvisionState::Requested],
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &ProvisionState {
        &self.state
    }

    /// Every state visited so far, in order.
    #[must_use]
    pub fn history(&self) -> &[ProvisionState] {
        &self.history
    }

    fn transition(&mut self, next: ProvisionState) {
        debug!(from = ?self.state, to = ?next, "provisioning transition");
        self.history.push(next.clone());
        self.state = next;
    }

    fn fail(&mut self, error: ProvisionError) -> ProvisionError {
        warn!(%error, "provisioning failed");
        self.transition(ProvisionState::Failed {
            machine_id: error.machine_id().map(str::to_owned),
        });
        error
    }

    /// Creates the machine and waits until it has a public address.
    ///
    /// On failure after the machine id is known, the error carries that id;
    /// deleting the orphaned machine is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] describing the failing step. Calling `run`
    /// on a lifecycle that already left `Requested` also fails.
    pub async fn run(
        &mut self,
        spec: &MachineSpec,
    ) -> Result<ProvisionedMachine, ProvisionError> {
        if self.state != ProvisionState::Requested {
            return Err(ProvisionError::AlreadyStarted);
        }
        if let Err(err) = spec.validate() {
            return Err(self.fail(ProvisionError::Validation(err)));
        }

        info!(name = %spec.name, cpus = spec.cpus, ram_mb = spec.ram_mb, "creating machine");
        let machine_id = match self.api.create_machine(spec).await {
            Ok(id) => id,
            Err(source) => return Err(self.fail(ProvisionError::Create(source))),
        };
        self.transition(ProvisionState::Provisioning {
            machine_id: machine_id.clone(),
        });

        info!(%machine_id, "waiting for public address");
        let api = self.api;
        let id = machine_id.as_str();
        let polled = poll_until(self.policy, |attempt| async move {
            let machine = api.get_machine(id).await?;
            debug!(machine_id = id, attempt, state = ?machine.state, "polled machine");
            Ok::<_, ApiError>(machine.public_ip)
        })
        .await;

        let (raw_address, polls) = match polled {
            Ok(done) => (done.value, done.attempts),
            Err(PollError::Probe { source, .. }) => {
                return Err(self.fail(ProvisionError::Poll { machine_id, source }));
            }
            Err(PollError::Exhausted { attempts, elapsed }) => {
                return Err(self.fail(ProvisionError::Timeout {
                    machine_id,
                    attempts,
                    elapsed,
                }));
            }
        };

        let Ok(address) = IpAddr::from_str(&raw_address) else {
            return Err(self.fail(ProvisionError::InvalidAddress {
                machine_id,
                address: raw_address,
            }));
        };

        self.transition(ProvisionState::Addressable {
            machine_id: machine_id.clone(),
            address,
        });
        self.transition(ProvisionState::Ready {
            machine_id: machine_id.clone(),
            address,
        });
        info!(%machine_id, %address, polls, "machine ready");

        Ok(ProvisionedMachine {
            machine_id,
            address,
            polls,
        })
    }
}
