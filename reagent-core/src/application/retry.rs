//! Bounded retries for blocking calls, each attempt under its own deadline.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::defaults::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_TIMEOUT_SECS};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetryError {
    #[error("'{name}' failed after {attempts} attempts: {last_error}")]
    Exhausted {
        name: String,
        attempts: u32,
        last_error: String,
    },
    #[error("'{name}' failed on attempt {attempt} with a non-retryable error: {message}")]
    Aborted {
        name: String,
        attempt: u32,
        message: String,
    },
}

impl RetryError {
    pub fn user_message(&self) -> String {
        match self {
            RetryError::Exhausted { attempts, .. } => format!(
                "The language model could not be reached after {attempts} attempts. Check the model endpoint and try again."
            ),
            RetryError::Aborted { message, .. } => {
                format!("The language model request failed: {message}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            timeout: Duration::from_secs(DEFAULT_RETRY_TIMEOUT_SECS),
            wait: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, timeout: Duration, wait: Duration) -> Self {
        Self {
            attempts,
            timeout,
            wait,
        }
    }

    /// Retries on every error.
    pub fn run<T, E, F>(&self, name: &str, call: F) -> Result<T, RetryError>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.run_with(name, call, |_: &E| true)
    }

    /// Runs `call` up to `attempts` times. Each attempt executes on a fresh
    /// thread; an attempt that outlives `timeout` is abandoned and counted as
    /// failed. Errors for which `is_retryable` returns false end the loop.
    pub fn run_with<T, E, F, P>(&self, name: &str, call: F, is_retryable: P) -> Result<T, RetryError>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
        P: Fn(&E) -> bool,
    {
        let attempts = self.attempts.max(1);
        let call = Arc::new(call);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            debug!(name, attempt, attempts, "starting attempt");
            let (tx, rx) = mpsc::channel();
            let task = Arc::clone(&call);
            let spawned = thread::Builder::new()
                .name(format!("{name}-attempt-{attempt}"))
                .spawn(move || {
                    let _ = tx.send(task());
                });

            if let Err(err) = spawned {
                last_error = format!("could not start attempt: {err}");
                warn!(name, attempt, error = %err, "failed to spawn attempt thread");
            } else {
                match rx.recv_timeout(self.timeout) {
                    Ok(Ok(value)) => return Ok(value),
                    Ok(Err(err)) => {
                        if !is_retryable(&err) {
                            return Err(RetryError::Aborted {
                                name: name.to_string(),
                                attempt,
                                message: err.to_string(),
                            });
                        }
                        last_error = err.to_string();
                        warn!(name, attempt, attempts, error = %last_error, "attempt failed");
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        last_error = format!("timed out after {:?}", self.timeout);
                        warn!(name, attempt, attempts, timeout = ?self.timeout, "attempt timed out");
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        last_error = "attempt panicked".to_string();
                        warn!(name, attempt, attempts, "attempt panicked");
                    }
                }
            }

            if attempt < attempts && !self.wait.is_zero() {
                thread::sleep(self.wait);
            }
        }

        Err(RetryError::Exhausted {
            name: name.to_string(),
            attempts,
            last_error,
        })
    }
}
