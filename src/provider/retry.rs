//! Retry classification and backoff.
//!
//! [`RetryPolicy::classify`] is a pure function of the provider error code;
//! waiting is delegated to a [`Sleeper`] so the policy can be tested without
//! real delays.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

use super::ProviderError;

/// Class of a provider error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Caller or document problem; retrying cannot help
    NonRetryable,
    /// Provisioned throughput or limit exceeded
    ThroughputExceeded,
    /// Request rate throttled
    Throttling,
    /// Transient service-side fault
    ServiceFault,
    /// Any code not listed above
    Unclassified,
}

impl ErrorClass {
    /// Classify a provider error code.
    pub fn of(code: &str) -> Self {
        match code {
            "InvalidJobIdException"
            | "InvalidParameterException"
            | "AccessDeniedException"
            | "InvalidS3ObjectException"
            | "InvalidKMSKeyException"
            | "UnsupportedDocumentException"
            | "BadDocumentException"
            | "DocumentTooLargeException"
            | "IdempotentParameterMismatchException" => ErrorClass::NonRetryable,
            "ProvisionedThroughputExceededException" | "LimitExceededException" => {
                ErrorClass::ThroughputExceeded
            }
            "ThrottlingException" => ErrorClass::Throttling,
            "InternalServerError" => ErrorClass::ServiceFault,
            _ => ErrorClass::Unclassified,
        }
    }

    /// Check if errors of this class may be retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorClass::NonRetryable)
    }
}

/// Outcome of classifying a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up and surface the error
    Fail,
    /// Wait `delay`, then try again
    Retry { class: ErrorClass, delay: Duration },
}

/// Retry budget and per-class backoff multipliers.
///
/// Each class scales `base_interval` by its own multiplier. The
/// multipliers are independent; none is derived from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Base wait between attempts
    pub base_interval: Duration,

    /// Maximum number of attempts, first attempt included
    pub max_attempts: u32,

    /// Multiplier for throughput/limit errors
    pub throughput_multiplier: u32,

    /// Multiplier for throttling errors
    pub throttling_multiplier: u32,

    /// Multiplier for transient service faults
    pub service_fault_multiplier: u32,

    /// Multiplier for unclassified errors
    pub unclassified_multiplier: u32,
}

impl RetryPolicy {
    /// Create a policy with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the base interval (`retry_interval`, seconds) and attempt budget
    /// (`max_retry_attempt`) from the environment, keeping defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self> {
        let mut policy = Self::default();
        if let Some(secs) = env_u64("retry_interval")? {
            policy.base_interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = env_u32("max_retry_attempt")? {
            policy.max_attempts = attempts;
        }
        Ok(policy)
    }

    /// Set the base interval.
    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    /// Set the attempt budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the multiplier for one error class.
    pub fn with_multiplier(mut self, class: ErrorClass, multiplier: u32) -> Self {
        match class {
            ErrorClass::ThroughputExceeded => self.throughput_multiplier = multiplier,
            ErrorClass::Throttling => self.throttling_multiplier = multiplier,
            ErrorClass::ServiceFault => self.service_fault_multiplier = multiplier,
            ErrorClass::Unclassified => self.unclassified_multiplier = multiplier,
            ErrorClass::NonRetryable => {}
        }
        self
    }

    /// Multiplier applied to the base interval for a class.
    pub fn multiplier(&self, class: ErrorClass) -> Option<u32> {
        match class {
            ErrorClass::NonRetryable => None,
            ErrorClass::ThroughputExceeded => Some(self.throughput_multiplier),
            ErrorClass::Throttling => Some(self.throttling_multiplier),
            ErrorClass::ServiceFault => Some(self.service_fault_multiplier),
            ErrorClass::Unclassified => Some(self.unclassified_multiplier),
        }
    }

    /// Decide what to do about a provider error code.
    pub fn classify(&self, code: &str) -> RetryDecision {
        let class = ErrorClass::of(code);
        match self.multiplier(class) {
            Some(multiplier) => RetryDecision::Retry {
                class,
                delay: self.base_interval.saturating_mul(multiplier),
            },
            None => RetryDecision::Fail,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(30),
            max_attempts: 5,
            throughput_multiplier: 3,
            throttling_multiplier: 6,
            service_fault_multiplier: 1,
            unclassified_multiplier: 1,
        }
    }
}

pub(crate) fn env_u64(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidInput(format!("{} must be an integer, got {:?}", name, value))),
        Err(_) => Ok(None),
    }
}

/// Read an integer environment variable that must fit in a `u32`.
pub(crate) fn env_u32(name: &str) -> Result<Option<u32>> {
    match env_u64(name)? {
        Some(value) => u32::try_from(value).map(Some).map_err(|_| {
            Error::InvalidInput(format!("{} is out of range, got {}", name, value))
        }),
        None => Ok(None),
    }
}

/// Suspends the current job between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Runs provider calls under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub(crate) struct Retrier<S> {
    pub(crate) policy: RetryPolicy,
    pub(crate) sleeper: S,
    pub(crate) cancel: Option<Arc<AtomicBool>>,
}

impl<S: Sleeper> Retrier<S> {
    pub(crate) fn new(policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            policy,
            sleeper,
            cancel: None,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Call `op` until it succeeds, fails permanently, or the budget runs
    /// out. Returns the value and the number of attempts used.
    ///
    /// `on_retry` is told about every failed attempt that will be retried.
    pub(crate) fn run<T>(
        &self,
        label: &str,
        mut op: impl FnMut(u32) -> std::result::Result<T, ProviderError>,
        mut on_retry: impl FnMut(u32, &ProviderError),
    ) -> Result<(T, u32)> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if self.is_cancelled() {
                log::info!("{}: cancelled before attempt {}", label, attempt + 1);
                return Err(Error::Cancelled(label.to_string()));
            }

            attempt += 1;
            let err = match op(attempt) {
                Ok(value) => return Ok((value, attempt)),
                Err(err) => err,
            };

            match self.policy.classify(&err.code) {
                RetryDecision::Fail => {
                    log::error!("{}: {} is not retryable", label, err);
                    return Err(Error::ProviderPermanent {
                        code: err.code,
                        message: err.message,
                    });
                }
                RetryDecision::Retry { class, delay } => {
                    if attempt >= max_attempts {
                        log::error!(
                            "{}: failed after {} attempts, aborting: {}",
                            label,
                            attempt,
                            err
                        );
                        return Err(Error::RetriesExhausted {
                            attempts: attempt,
                            code: err.code,
                            message: err.message,
                        });
                    }
                    log::warn!(
                        "{}: {} ({:?}, attempt {}/{}), retrying in {:?}",
                        label,
                        err,
                        class,
                        attempt,
                        max_attempts,
                        delay
                    );
                    on_retry(attempt, &err);
                    self.sleeper.sleep(delay);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper(Mutex<Vec<Duration>>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    #[test]
    fn test_classify_codes() {
        assert_eq!(ErrorClass::of("InvalidJobIdException"), ErrorClass::NonRetryable);
        assert_eq!(ErrorClass::of("AccessDeniedException"), ErrorClass::NonRetryable);
        assert_eq!(
            ErrorClass::of("ProvisionedThroughputExceededException"),
            ErrorClass::ThroughputExceeded
        );
        assert_eq!(ErrorClass::of("ThrottlingException"), ErrorClass::Throttling);
        assert_eq!(ErrorClass::of("InternalServerError"), ErrorClass::ServiceFault);
        assert_eq!(ErrorClass::of("SomethingNew"), ErrorClass::Unclassified);
    }

    #[test]
    fn test_default_multipliers_are_distinct() {
        let policy = RetryPolicy::new().with_base_interval(Duration::from_secs(10));

        assert_eq!(
            policy.classify("ProvisionedThroughputExceededException"),
            RetryDecision::Retry {
                class: ErrorClass::ThroughputExceeded,
                delay: Duration::from_secs(30),
            }
        );
        assert_eq!(
            policy.classify("ThrottlingException"),
            RetryDecision::Retry {
                class: ErrorClass::Throttling,
                delay: Duration::from_secs(60),
            }
        );
        assert_eq!(
            policy.classify("InternalServerError"),
            RetryDecision::Retry {
                class: ErrorClass::ServiceFault,
                delay: Duration::from_secs(10),
            }
        );
        assert_eq!(policy.classify("InvalidParameterException"), RetryDecision::Fail);
    }

    #[test]
    fn test_custom_multiplier() {
        let policy = RetryPolicy::new()
            .with_base_interval(Duration::from_secs(2))
            .with_multiplier(ErrorClass::Unclassified, 0);
        assert_eq!(
            policy.classify("Weird"),
            RetryDecision::Retry {
                class: ErrorClass::Unclassified,
                delay: Duration::ZERO,
            }
        );
        assert_eq!(policy.multiplier(ErrorClass::Throttling), Some(6));
    }

    #[test]
    fn test_run_retries_then_succeeds() {
        let policy = RetryPolicy::new().with_base_interval(Duration::from_millis(5));
        let retrier = Retrier::new(policy, RecordingSleeper::default());
        let mut retried = Vec::new();

        let (value, attempts) = retrier
            .run(
                "test",
                |attempt| {
                    if attempt < 3 {
                        Err(ProviderError::new("InternalServerError", "boom"))
                    } else {
                        Ok(attempt * 10)
                    }
                },
                |attempt, _| retried.push(attempt),
            )
            .unwrap();

        assert_eq!(value, 30);
        assert_eq!(attempts, 3);
        assert_eq!(retried, vec![1, 2]);
        assert_eq!(
            *retrier.sleeper.0.lock().unwrap(),
            vec![Duration::from_millis(5); 2]
        );
    }

    #[test]
    fn test_run_cancelled() {
        let mut retrier = Retrier::new(RetryPolicy::new(), RecordingSleeper::default());
        retrier.cancel = Some(Arc::new(AtomicBool::new(true)));

        let result: Result<((), u32)> = retrier.run("job-9", |_| Ok(()), |_, _| {});
        assert!(matches!(result, Err(Error::Cancelled(label)) if label == "job-9"));
    }

    #[test]
    fn test_from_env_defaults() {
        std::env::remove_var("retry_interval");
        std::env::remove_var("max_retry_attempt");
        let policy = RetryPolicy::from_env().unwrap();
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn test_env_u32_rejects_out_of_range() {
        std::env::set_var("blockdoc_test_attempts", "4294967296");
        let err = env_u32("blockdoc_test_attempts").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        std::env::set_var("blockdoc_test_attempts", "12");
        assert_eq!(env_u32("blockdoc_test_attempts").unwrap(), Some(12));
        std::env::remove_var("blockdoc_test_attempts");
    }

    #[test]
    fn test_huge_interval_saturates() {
        let policy = RetryPolicy::new().with_base_interval(Duration::from_secs(u64::MAX));
        assert_eq!(
            policy.classify("ThrottlingException"),
            RetryDecision::Retry {
                class: ErrorClass::Throttling,
                delay: Duration::MAX,
            }
        );
    }
}
