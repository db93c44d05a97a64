use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::KiraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts,
            retry_delay,
        }
    }

    pub fn identity_default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }

    pub fn kegg_default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn kegg_default() -> Self {
        Self::new(Duration::from_millis(334))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Blocks until `min_interval` has passed since the previous call start, then
    /// records the new start. The lock is held while sleeping so waiters queue up.
    pub fn acquire(&self) {
        let mut last_call = match self.last_call.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[derive(Debug, Clone)]
pub struct RetryingClient {
    policy: RetryPolicy,
    limiter: Option<Arc<RateLimiter>>,
}

impl RetryingClient {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            limiter: None,
        }
    }

    pub fn with_limiter(policy: RetryPolicy, limiter: Arc<RateLimiter>) -> Self {
        Self {
            policy,
            limiter: Some(limiter),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn execute<T, F>(&self, operation: &str, mut call: F) -> Result<T, KiraError>
    where
        F: FnMut() -> Result<T, KiraError>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if let Some(limiter) = &self.limiter {
                limiter.acquire();
            }
            match call() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts => {
                    warn!(operation, attempt, max_attempts, error = %err, "retrying");
                    thread::sleep(self.policy.retry_delay);
                }
                Err(err) => {
                    error!(operation, attempts = attempt, error = %err, "giving up");
                    return Err(KiraError::ExhaustedRetries {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
            }
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
