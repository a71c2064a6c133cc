//! Bounded polling and retrying.
//!
//! Neither primitive writes to the diagnostic log; callers log around them.
//! All timing goes through [`tokio::time`], so waits suspend only the calling
//! scenario's task.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::error::{Error, ErrorKind, Result};

#[derive(Clone, Debug)]
pub struct PollOptions {
	pub timeout: Duration,
	pub interval: Duration,
	/// Used as the [`Error::Timeout`] message when the wait expires.
	pub message: Option<String>,
}

impl PollOptions {
	pub fn new(timeout: Duration, interval: Duration) -> Self {
		Self {
			timeout,
			interval,
			message: None,
		}
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}
}

/// Evaluates `condition` until it holds or `timeout` elapses.
///
/// The first evaluation happens immediately. Later evaluations are spaced by
/// `interval`, and the final one lands on the deadline, so success is never
/// reported without the condition having held on the last check.
pub async fn poll<F, Fut>(options: &PollOptions, mut condition: F) -> Result<()>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = bool>,
{
	let start = Instant::now();
	let mut checks: u32 = 0;

	loop {
		checks += 1;
		if condition().await {
			trace!(target = "specdrive.wait", checks, "condition satisfied");
			return Ok(());
		}

		let elapsed = start.elapsed();
		if elapsed >= options.timeout {
			debug!(target = "specdrive.wait", checks, waited = ?elapsed, "poll timed out");
			return Err(Error::Timeout {
				waited: elapsed,
				message: options
					.message
					.clone()
					.unwrap_or_else(|| "condition to become true".to_string()),
			});
		}

		let remaining = options.timeout - elapsed;
		sleep(options.interval.min(remaining)).await;
	}
}

/// Retry budget for [`retry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total invocations, including the first. Zero behaves as one.
	pub max_attempts: u32,
	pub backoff: Duration,
	pub retryable: Vec<ErrorKind>,
}

impl RetryPolicy {
	pub fn new(max_attempts: u32, backoff: Duration, retryable: impl Into<Vec<ErrorKind>>) -> Self {
		Self {
			max_attempts,
			backoff,
			retryable: retryable.into(),
		}
	}

	/// Grid node lookup: first try plus five more, two seconds apart.
	pub fn grid_node_lookup() -> Self {
		Self::new(
			6,
			Duration::from_secs(2),
			[ErrorKind::EmptyResponse, ErrorKind::MalformedResponse, ErrorKind::MissingField],
		)
	}

	/// UI actions racing a re-rendering DOM.
	pub fn stale_guard() -> Self {
		Self::new(6, Duration::from_millis(500), [ErrorKind::TransientProtocol])
	}

	pub fn is_retryable(&self, err: &Error) -> bool {
		self.retryable.contains(&err.kind())
	}
}

/// Runs `action` until it succeeds, fails with a non-retryable kind, or the
/// attempt budget is spent. The last error is returned on exhaustion.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut action: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let max_attempts = policy.max_attempts.max(1);
	let mut attempt: u32 = 0;

	loop {
		attempt += 1;
		match action().await {
			Ok(value) => return Ok(value),
			Err(err) if attempt < max_attempts && policy.is_retryable(&err) => {
				debug!(
					target = "specdrive.wait",
					attempt,
					max_attempts,
					backoff = ?policy.backoff,
					error = %err,
					"retrying"
				);
				sleep(policy.backoff).await;
			}
			Err(err) => return Err(err),
		}
	}
}

/// Runs a UI action under [`RetryPolicy::stale_guard`].
pub async fn stale_guard<T, F, Fut>(action: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	retry(&RetryPolicy::stale_guard(), action).await
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;

	const I: Duration = Duration::from_millis(250);

	async fn true_after(k: u32, timeout: Duration) -> (Result<()>, Duration) {
		let start = Instant::now();
		let ready_at = start + I * k;
		let result = poll(&PollOptions::new(timeout, I), move || async move { Instant::now() >= ready_at }).await;
		(result, start.elapsed())
	}

	#[tokio::test(start_paused = true)]
	async fn poll_returns_immediately_when_condition_already_holds() {
		let calls = Cell::new(0);
		let start = Instant::now();
		poll(&PollOptions::new(Duration::from_secs(5), I), || {
			calls.set(calls.get() + 1);
			async { true }
		})
		.await
		.unwrap();
		assert_eq!(calls.get(), 1);
		assert_eq!(start.elapsed(), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn poll_succeeds_when_condition_holds_at_deadline() {
		let (result, elapsed) = true_after(4, I * 4).await;
		result.unwrap();
		assert_eq!(elapsed, I * 4);
	}

	#[tokio::test(start_paused = true)]
	async fn poll_succeeds_before_deadline() {
		let (result, elapsed) = true_after(2, Duration::from_secs(5)).await;
		result.unwrap();
		assert_eq!(elapsed, I * 2);
	}

	#[tokio::test(start_paused = true)]
	async fn poll_times_out_when_condition_holds_after_deadline() {
		let (result, elapsed) = true_after(5, I * 4).await;
		let err = result.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Timeout);
		assert_eq!(elapsed, I * 4);
	}

	#[tokio::test(start_paused = true)]
	async fn poll_final_check_lands_on_uneven_deadline() {
		let start = Instant::now();
		let checks = Cell::new(0);
		let options = PollOptions::new(Duration::from_millis(600), I).with_message("the job to finish");
		let err = poll(&options, || {
			checks.set(checks.get() + 1);
			async { false }
		})
		.await
		.unwrap_err();

		// 0, 250, 500, 600
		assert_eq!(checks.get(), 4);
		assert_eq!(start.elapsed(), Duration::from_millis(600));
		assert!(err.to_string().contains("the job to finish"));
	}

	#[tokio::test(start_paused = true)]
	async fn retry_returns_value_after_max_minus_one_failures() {
		let policy = RetryPolicy::new(4, Duration::from_secs(1), [ErrorKind::TransientProtocol]);
		let calls = Cell::new(0u32);
		let start = Instant::now();
		let value = retry(&policy, || {
			calls.set(calls.get() + 1);
			let n = calls.get();
			async move {
				if n < 4 {
					Err(Error::TransientProtocol("stale element reference".into()))
				} else {
					Ok(n)
				}
			}
		})
		.await
		.unwrap();

		assert_eq!(value, 4);
		assert_eq!(start.elapsed(), Duration::from_secs(3));
	}

	#[tokio::test(start_paused = true)]
	async fn retry_exhaustion_returns_last_error() {
		let policy = RetryPolicy::new(3, Duration::from_millis(10), [ErrorKind::EmptyResponse]);
		let calls = Cell::new(0u32);
		let err = retry(&policy, || {
			calls.set(calls.get() + 1);
			let n = calls.get();
			async move {
				Err::<(), _>(Error::EmptyResponse {
					endpoint: format!("attempt {n}"),
				})
			}
		})
		.await
		.unwrap_err();

		assert_eq!(calls.get(), 3);
		assert!(err.to_string().contains("attempt 3"));
	}

	#[tokio::test(start_paused = true)]
	async fn retry_propagates_non_retryable_kind_immediately() {
		let policy = RetryPolicy::stale_guard();
		let calls = Cell::new(0u32);
		let start = Instant::now();
		let err = retry(&policy, || {
			calls.set(calls.get() + 1);
			async { Err::<(), _>(Error::UnexpectedAlert("alert open".into())) }
		})
		.await
		.unwrap_err();

		assert_eq!(calls.get(), 1);
		assert_eq!(err.kind(), ErrorKind::UnexpectedAlert);
		assert_eq!(start.elapsed(), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn zero_attempts_still_runs_once() {
		let policy = RetryPolicy::new(0, Duration::from_secs(1), [ErrorKind::TransientProtocol]);
		let calls = Cell::new(0u32);
		let _ = retry(&policy, || {
			calls.set(calls.get() + 1);
			async { Err::<(), _>(Error::TransientProtocol("gone".into())) }
		})
		.await;
		assert_eq!(calls.get(), 1);
	}

	#[test]
	fn presets_count_total_attempts() {
		assert_eq!(RetryPolicy::grid_node_lookup().max_attempts, 6);
		assert_eq!(RetryPolicy::grid_node_lookup().backoff, Duration::from_secs(2));
		assert_eq!(RetryPolicy::stale_guard().max_attempts, 6);
		assert_eq!(RetryPolicy::stale_guard().backoff, Duration::from_millis(500));
	}
}
