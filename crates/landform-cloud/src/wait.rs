//! Status poller
//!
//! [`wait_for`] calls a state-check function until it reports the awaited
//! condition, returns an error, or the [`Context`] is cancelled or expires.
//! Between attempts the task sleeps (cooperatively) for a backoff delay taken
//! from a [`PollPolicy`].

use crate::context::{Context, Interrupted};
use crate::error::{ApiError, Cause, CloudError, Operation, ResourceKind, Result};
use crate::state::State;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Outcome of one state check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// The awaited condition holds; stop polling
    Ready(T),
    /// Not there yet; poll again after the next delay
    Pending(T),
}

/// Backoff and timeout settings for the poller
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay after the first unsuccessful check
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Backoff multiplier applied per attempt
    pub backoff_multiplier: f64,

    /// Overall limit, applied on top of the context deadline
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            timeout: Some(Duration::from_secs(60 * 60)),
        }
    }
}

impl PollPolicy {
    /// Constant interval, no policy-level timeout
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_delay: interval,
            max_delay: interval,
            backoff_multiplier: 1.0,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Delay to sleep after the given (zero-based) attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay.max(0.0))
    }
}

/// Why [`wait_for`] gave up
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("deadline exceeded after {attempts} attempts (last observed: {last_observed:?})")]
    Timeout {
        attempts: u32,
        last_observed: Option<String>,
    },

    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    #[error(transparent)]
    Check(CloudError),
}

impl WaitError {
    /// Scope a wait failure to the resource being polled
    ///
    /// Timeouts and cancellations become status-check errors; errors returned
    /// by the check itself are passed through unchanged.
    pub fn into_cloud_error(self, resource: ResourceKind, id: &str) -> CloudError {
        match self {
            WaitError::Timeout { .. } => {
                ApiError::new(Operation::StatusCheck, resource, id, Cause::Timeout).into()
            }
            WaitError::Cancelled { .. } => {
                ApiError::new(Operation::StatusCheck, resource, id, Cause::Cancelled).into()
            }
            WaitError::Check(e) => e,
        }
    }
}

/// Poll `check` until it reports [`Poll::Ready`]
///
/// An `Err` from `check` is terminal: it is returned immediately and `check`
/// is never called again. The loop stops on cancellation or when the earlier
/// of the context deadline and `policy.timeout` passes.
pub async fn wait_for<T, F, Fut>(
    ctx: &Context,
    policy: &PollPolicy,
    mut check: F,
) -> std::result::Result<T, WaitError>
where
    T: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll<T>>>,
{
    let ctx = match policy.timeout {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx.clone(),
    };
    let mut attempts: u32 = 0;
    let mut last_observed: Option<String> = None;

    loop {
        if ctx.is_cancelled() {
            return Err(WaitError::Cancelled { attempts });
        }
        if ctx.is_expired() {
            return Err(WaitError::Timeout {
                attempts,
                last_observed,
            });
        }

        attempts += 1;
        let outcome = match ctx.run(check()).await {
            Ok(outcome) => outcome,
            Err(interrupted) => return Err(interrupted_error(interrupted, attempts, last_observed)),
        };

        match outcome {
            Ok(Poll::Ready(value)) => {
                tracing::debug!(attempts, observed = ?value, "wait condition reached");
                return Ok(value);
            }
            Ok(Poll::Pending(value)) => {
                tracing::debug!(attempts, observed = ?value, "wait condition not reached yet");
                last_observed = Some(format!("{:?}", value));
            }
            Err(e) => return Err(WaitError::Check(e)),
        }

        let delay = policy.delay_for_attempt(attempts - 1);
        if let Err(interrupted) = ctx.sleep(delay).await {
            return Err(interrupted_error(interrupted, attempts, last_observed));
        }
    }
}

fn interrupted_error(
    interrupted: Interrupted,
    attempts: u32,
    last_observed: Option<String>,
) -> WaitError {
    match interrupted {
        Interrupted::Cancelled => WaitError::Cancelled { attempts },
        Interrupted::DeadlineExceeded => WaitError::Timeout {
            attempts,
            last_observed,
        },
    }
}

/// Classify `state` against a set of target states
///
/// Failure states that are not themselves a target stop the wait with
/// [`Cause::FailedState`].
pub fn until_state(
    state: State,
    targets: &[State],
    resource: ResourceKind,
    id: &str,
) -> Result<Poll<State>> {
    if targets.contains(&state) {
        return Ok(Poll::Ready(state));
    }
    if state.is_failure() {
        return Err(ApiError::new(
            Operation::StatusCheck,
            resource,
            id,
            Cause::FailedState(state),
        )
        .into());
    }
    Ok(Poll::Pending(state))
}

/// Classify `state` as settled (any terminal state, failures included)
pub fn until_terminal(state: State) -> Poll<State> {
    if state.is_terminal() {
        Poll::Ready(state)
    } else {
        Poll::Pending(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn counting_check(
        calls: Arc<AtomicU32>,
        ready_on: u32,
    ) -> impl FnMut() -> std::future::Ready<Result<Poll<u32>>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let outcome = if n >= ready_on {
                Poll::Ready(n)
            } else {
                Poll::Pending(n)
            };
            std::future::ready(Ok(outcome))
        }
    }

    #[test]
    fn test_delay_calculation() {
        let policy = PollPolicy {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10000),
            backoff_multiplier: 2.0,
            timeout: None,
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(8000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(10000)); // capped at max
        assert_eq!(policy.delay_for_attempt(400), Duration::from_millis(10000));
    }

    #[test]
    fn test_fixed_policy() {
        let policy = PollPolicy::fixed(Duration::from_secs(3));
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(3));
        assert_eq!(policy.delay_for_attempt(7), Duration::from_secs(3));
        assert!(policy.timeout.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_after_exactly_n_calls() {
        let calls = Arc::new(AtomicU32::new(0));
        let ctx = Context::background();
        let policy = PollPolicy::fixed(Duration::from_secs(1));

        let value = wait_for(&ctx, &policy, counting_check(calls.clone(), 4))
            .await
            .unwrap();

        assert_eq!(value, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_error_is_terminal() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let ctx = Context::background();
        let policy = PollPolicy::fixed(Duration::from_secs(1));

        let result = wait_for(&ctx, &policy, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let state = if n == 3 { State::DeploymentError } else { State::Deploying };
            std::future::ready(until_state(
                state,
                &[State::Deployed],
                ResourceKind::Environment,
                "env-1",
            ))
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            &err,
            WaitError::Check(CloudError::Api(ApiError {
                cause: Cause::FailedState(State::DeploymentError),
                ..
            }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // the deadline is far away but nothing else is called
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_policy_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let ctx = Context::background();
        let policy = PollPolicy::fixed(Duration::from_secs(10)).with_timeout(Duration::from_secs(35));

        let err = wait_for(&ctx, &policy, counting_check(calls.clone(), u32::MAX))
            .await
            .unwrap_err();

        match err {
            WaitError::Timeout {
                attempts,
                last_observed,
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(last_observed.as_deref(), Some("4"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_context_deadline() {
        let calls = Arc::new(AtomicU32::new(0));
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        let policy = PollPolicy::fixed(Duration::from_secs(2));

        let err = wait_for(&ctx, &policy, counting_check(calls.clone(), u32::MAX))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Timeout { .. }));
        let mapped = err.into_cloud_error(ResourceKind::Cluster, "c1");
        assert_eq!(
            mapped.api().map(|e| (&e.operation, &e.cause)),
            Some((&Operation::StatusCheck, &Cause::Timeout))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_returns_within_one_interval() {
        let calls = Arc::new(AtomicU32::new(0));
        let (ctx, handle) = Context::with_cancel();
        let interval = Duration::from_secs(10);
        let policy = PollPolicy::fixed(interval);

        let poll_ctx = ctx.clone();
        let check_calls = calls.clone();
        let task = tokio::spawn(async move {
            wait_for(&poll_ctx, &policy, counting_check(check_calls, u32::MAX)).await
        });

        tokio::time::sleep(Duration::from_secs(15)).await;
        let cancelled_at = Instant::now();
        handle.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, WaitError::Cancelled { .. }));
        assert!(Instant::now() - cancelled_at <= interval);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_never_calls_check() {
        let calls = Arc::new(AtomicU32::new(0));
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();

        let err = wait_for(
            &ctx,
            &PollPolicy::default(),
            counting_check(calls.clone(), 1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Cancelled { attempts: 0 }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_until_terminal_accepts_failures() {
        assert_eq!(until_terminal(State::StopError), Poll::Ready(State::StopError));
        assert_eq!(until_terminal(State::Deploying), Poll::Pending(State::Deploying));
    }

    #[test]
    fn test_until_state_target_may_be_failure_free() {
        let ready = until_state(State::Stopped, &[State::Stopped], ResourceKind::Cluster, "c");
        assert_eq!(ready.unwrap(), Poll::Ready(State::Stopped));

        let pending = until_state(State::Deployed, &[State::Stopped], ResourceKind::Cluster, "c");
        assert_eq!(pending.unwrap(), Poll::Pending(State::Deployed));
    }
}
