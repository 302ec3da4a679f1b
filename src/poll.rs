//! Cooperative fixed-interval polling.
//!
//! A probe returns `Ok(Some(value))` when the awaited condition holds,
//! `Ok(None)` to wait one interval and probe again, and `Err(_)` to stop
//! immediately. Probe errors are never retried.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Interval and optional bounds for [`poll_until`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    interval: Duration,
    max_attempts: Option<u32>,
    deadline: Option<Duration>,
}

impl PollPolicy {
    /// Unbounded policy probing every `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            deadline: None,
        }
    }

    /// Stops after `attempts` probes.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Stops once another wait would pass `deadline` since the first probe.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Wait between probes.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Overall bound, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    fn exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        if self.max_attempts.is_some_and(|max| attempts >= max) {
            return true;
        }
        self.deadline
            .is_some_and(|deadline| elapsed.saturating_add(self.interval) > deadline)
    }
}

/// Successful poll result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Polled<T> {
    /// Value produced by the final probe.
    pub value: T,
    /// Number of probes issued, including the final one.
    pub attempts: u32,
}

/// Reasons a poll stops without a value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollError<E> {
    /// The probe failed; the error is passed through unchanged.
    Probe {
        /// Probes issued, including the failing one.
        attempts: u32,
        /// Probe error.
        source: E,
    },
    /// Attempts or deadline ran out before the condition held.
    Exhausted {
        /// Probes issued.
        attempts: u32,
        /// Time since the first probe.
        elapsed: Duration,
    },
}

/// Probes until it yields a value, fails, or the policy is exhausted.
///
/// The probe receives the 1-based attempt number.
///
/// # Errors
///
/// Returns [`PollError::Probe`] on the first probe error and
/// [`PollError::Exhausted`] when the policy's bounds are reached.
pub async fn poll_until<T, E, F, Fut>(
    policy: PollPolicy,
    mut probe: F,
) -> Result<Polled<T>, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        match probe(attempts).await {
            Ok(Some(value)) => return Ok(Polled { value, attempts }),
            Ok(None) => {}
            Err(source) => return Err(PollError::Probe { attempts, source }),
        }

        let elapsed = started.elapsed();
        if policy.exhausted(attempts, elapsed) {
            return Err(PollError::Exhausted { attempts, elapsed });
        }
        sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(5);

    fn assert_waited(started: Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_secs(1),
            "expected about {expected:?} of simulated wait, got {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn returns_value_after_waiting_between_probes() {
        let started = Instant::now();
        let result: Result<Polled<&str>, PollError<()>> =
            poll_until(PollPolicy::new(INTERVAL), |attempt| async move {
                Ok((attempt == 3).then_some("ready"))
            })
            .await;

        assert_eq!(
            result,
            Ok(Polled {
                value: "ready",
                attempts: 3
            })
        );
        assert_waited(started, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_first_probe_error() {
        let mut calls = 0;
        let result: Result<Polled<()>, PollError<&str>> =
            poll_until(PollPolicy::new(INTERVAL), |attempt| {
                calls += 1;
                async move { if attempt == 2 { Err("boom") } else { Ok(None) } }
            })
            .await;

        assert_eq!(
            result,
            Err(PollError::Probe {
                attempts: 2,
                source: "boom"
            })
        );
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn max_attempts_bounds_the_loop() {
        let result: Result<Polled<()>, PollError<()>> = poll_until(
            PollPolicy::new(INTERVAL).with_max_attempts(4),
            |_| async { Ok(None) },
        )
        .await;

        assert!(
            matches!(result, Err(PollError::Exhausted { attempts: 4, .. })),
            "{result:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_the_loop() {
        let started = Instant::now();
        let result: Result<Polled<()>, PollError<()>> = poll_until(
            PollPolicy::new(INTERVAL).with_deadline(Duration::from_secs(12)),
            |_| async { Ok(None) },
        )
        .await;

        assert!(
            matches!(result, Err(PollError::Exhausted { attempts: 3, .. })),
            "{result:?}"
        );
        assert_waited(started, Duration::from_secs(10));
    }
}
