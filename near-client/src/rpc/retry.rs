/*!
Retry state machine of the transport.

Every call moves through `pending -> (success | retrying -> pending | failed)`.
The delay before retry `n` is `initial_delay * 2^(n-1)` with no jitter.
Retries are driven by [backoff::future::Retry] and sleeping goes through an
injected [Sleeper] so schedules can be observed without waiting.
*/
use std::{fmt, future::Future, pin::Pin, sync::Arc, time::Duration};

use backoff::{backoff::Backoff, future::Retry};
pub use backoff::future::Sleeper;
use tracing::{trace, warn};

use crate::{
	config::RetryConfig,
	error::{ClientError, ClientResult, NetworkError},
};

/// HTTP statuses worth retrying
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Whether an HTTP status is worth retrying
pub fn is_retryable_status(status: u16) -> bool {
	RETRYABLE_STATUSES.contains(&status)
}

/// Deterministic exponential schedule, exhausted after `max_retries` delays
#[derive(Debug, Clone)]
pub struct RetrySchedule {
	config: RetryConfig,
	retries: u32,
}

impl RetrySchedule {
	/// Fresh schedule
	pub fn new(config: RetryConfig) -> Self {
		Self { config, retries: 0 }
	}

	/// Delay before the given retry, counting retries from 1
	pub fn delay_for(&self, retry: u32) -> Duration {
		let factor = retry
			.checked_sub(1)
			.and_then(|exponent| 1u32.checked_shl(exponent))
			.unwrap_or(u32::MAX);

		self.config.initial_delay.saturating_mul(factor)
	}
}

impl Backoff for RetrySchedule {
	fn reset(&mut self) {
		self.retries = 0;
	}

	fn next_backoff(&mut self) -> Option<Duration> {
		if self.retries >= self.config.max_retries {
			return None;
		}

		self.retries += 1;

		Some(self.delay_for(self.retries))
	}
}

/// Future returned by the sleepers the client accepts
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Cloneable handle to any [Sleeper] producing a [Sleep]
#[derive(Clone)]
pub struct SharedSleeper(Arc<dyn Sleeper<Sleep = Sleep> + Send + Sync>);

impl SharedSleeper {
	/// Wrap a sleeper
	pub fn new<S>(sleeper: S) -> Self
	where
		S: Sleeper<Sleep = Sleep> + Send + Sync + 'static,
	{
		Self(Arc::new(sleeper))
	}
}

impl Default for SharedSleeper {
	fn default() -> Self {
		Self::new(TokioSleeper)
	}
}

impl Sleeper for SharedSleeper {
	type Sleep = Sleep;

	fn sleep(&self, duration: Duration) -> Sleep {
		self.0.sleep(duration)
	}
}

impl fmt::Debug for SharedSleeper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SharedSleeper").finish()
	}
}

/// [Sleeper] backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
	type Sleep = Sleep;

	fn sleep(&self, duration: Duration) -> Sleep {
		Box::pin(tokio::time::sleep(duration))
	}
}

/// A failure that a later attempt may not repeat.
///
/// It is reported as [NetworkError::RetriesExhausted] when no retry is left.
pub fn transient(
	attempt: u32,
	status: Option<u16>,
	message: String,
) -> backoff::Error<ClientError> {
	backoff::Error::transient(
		NetworkError::RetriesExhausted {
			attempts: attempt,
			status,
			message,
		}
		.into(),
	)
}

/// Runs `operation` until it succeeds, fails permanently or the schedule is
/// exhausted. The operation receives the 1-based attempt number.
pub async fn retry<T, O, Fut>(
	config: RetryConfig,
	sleeper: SharedSleeper,
	mut operation: O,
) -> ClientResult<T>
where
	O: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, backoff::Error<ClientError>>>,
{
	let mut attempt = 0;
	let operation = move || {
		attempt += 1;
		trace!("Attempt {}", attempt);
		operation(attempt)
	};

	let notify = |err: ClientError, duration: Duration| match err {
		ClientError::Network(NetworkError::RetriesExhausted {
			attempts,
			status,
			message,
		}) => warn!(
			"Retrying in {:?} after attempt {} failed with status {:?}: {}",
			duration, attempts, status, message
		),
		err => warn!("Retrying in {:?} after error: {}", duration, err),
	};

	Retry::new(sleeper, RetrySchedule::new(config), notify, operation).await
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use super::*;

	#[derive(Debug, Default, Clone)]
	struct RecordingSleeper(Arc<Mutex<Vec<Duration>>>);

	impl Sleeper for RecordingSleeper {
		type Sleep = Sleep;

		fn sleep(&self, duration: Duration) -> Sleep {
			self.0.lock().unwrap().push(duration);
			Box::pin(async {})
		}
	}

	impl RecordingSleeper {
		fn delays(&self) -> Vec<Duration> {
			self.0.lock().unwrap().clone()
		}
	}

	fn config(max_retries: u32) -> RetryConfig {
		RetryConfig {
			max_retries,
			initial_delay: Duration::from_millis(100),
		}
	}

	fn unavailable(attempt: u32) -> backoff::Error<ClientError> {
		transient(attempt, Some(503), "Service Unavailable".into())
	}

	#[test]
	fn should_double_delays_without_jitter() {
		let mut schedule = RetrySchedule::new(config(4));
		let delays: Vec<_> = std::iter::from_fn(|| schedule.next_backoff())
			.map(|delay| delay.as_millis())
			.collect();

		assert_eq!(delays, vec![100, 200, 400, 800]);
	}

	#[test]
	fn should_restart_after_reset() {
		let mut schedule = RetrySchedule::new(config(1));

		assert!(schedule.next_backoff().is_some());
		assert!(schedule.next_backoff().is_none());

		schedule.reset();

		assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(100)));
	}

	#[test]
	fn should_saturate_huge_delays() {
		let schedule = RetrySchedule::new(config(100));

		assert_eq!(
			schedule.delay_for(64),
			Duration::from_millis(100) * u32::MAX
		);
	}

	#[test]
	fn should_know_retryable_statuses() {
		for status in [408, 429, 500, 502, 503, 504] {
			assert!(is_retryable_status(status));
		}

		for status in [400, 401, 404, 422, 501] {
			assert!(!is_retryable_status(status));
		}
	}

	#[tokio::test]
	async fn should_succeed_after_k_failures() {
		let sleeper = RecordingSleeper::default();
		let mut calls = 0;

		let result = retry(
			config(3),
			SharedSleeper::new(sleeper.clone()),
			|attempt| {
				calls += 1;
				let outcome = if attempt <= 2 {
					Err(unavailable(attempt))
				} else {
					Ok(attempt)
				};
				async move { outcome }
			},
		)
		.await;

		assert_eq!(result.unwrap(), 3);
		assert_eq!(calls, 3);
		assert_eq!(
			sleeper.delays(),
			vec![Duration::from_millis(100), Duration::from_millis(200)]
		);
	}

	#[tokio::test]
	async fn should_report_attempts_when_exhausted() {
		let sleeper = RecordingSleeper::default();
		let mut calls = 0;

		let result = retry(
			config(2),
			SharedSleeper::new(sleeper.clone()),
			|attempt| {
				calls += 1;
				async move { Err::<(), _>(unavailable(attempt)) }
			},
		)
		.await;

		assert_eq!(calls, 3);
		assert_eq!(sleeper.delays().len(), 2);
		assert!(matches!(
			result,
			Err(ClientError::Network(NetworkError::RetriesExhausted {
				attempts: 3,
				status: Some(503),
				..
			}))
		));
	}

	#[tokio::test]
	async fn should_give_up_at_once_without_retries() {
		let sleeper = RecordingSleeper::default();

		let result = retry(
			config(0),
			SharedSleeper::new(sleeper.clone()),
			|attempt| async move { Err::<(), _>(unavailable(attempt)) },
		)
		.await;

		assert!(sleeper.delays().is_empty());
		assert!(matches!(
			result,
			Err(ClientError::Network(NetworkError::RetriesExhausted {
				attempts: 1,
				..
			}))
		));
	}

	#[tokio::test]
	async fn should_stop_on_permanent_failure() {
		let sleeper = RecordingSleeper::default();
		let mut calls = 0;

		let result = retry(
			config(5),
			SharedSleeper::new(sleeper.clone()),
			|_| {
				calls += 1;
				async {
					Err::<(), _>(backoff::Error::permanent(ClientError::from(
						NetworkError::Failed {
							status: Some(400),
							message: "Bad Request".into(),
						},
					)))
				}
			},
		)
		.await;

		assert_eq!(calls, 1);
		assert!(sleeper.delays().is_empty());
		assert!(matches!(
			result,
			Err(ClientError::Network(NetworkError::Failed {
				status: Some(400),
				..
			}))
		));
	}
}
