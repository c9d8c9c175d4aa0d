// src/explorer/retry.rs
use std::future::Future;
use tokio::time::Duration;

use super::error::{ExplorerError, ExplorerErrorType};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub retry_on_errors: Vec<ExplorerErrorType>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            retry_on_errors: vec![
                ExplorerErrorType::NetworkError,
                ExplorerErrorType::TimeoutError,
                ExplorerErrorType::ServerError,
                ExplorerErrorType::MalformedResponse,
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryHandler {
    config: RetryConfig,
}

impl RetryHandler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. Exhausted retries surface as
    /// `TransientUpstream` tagged with `endpoint`.
    pub async fn retry<F, Fut, T>(&self, endpoint: &str, operation: F) -> Result<T, ExplorerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ExplorerError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0;
        let mut delay = self.config.initial_delay;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !self.should_retry(&error) {
                        return Err(error);
                    }
                    if attempts >= max_attempts {
                        return Err(ExplorerError::TransientUpstream {
                            endpoint: endpoint.to_string(),
                            attempts,
                            message: error.to_string(),
                        });
                    }

                    log::warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        endpoint,
                        attempts,
                        max_attempts,
                        error,
                        delay
                    );

                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(
                        delay.mul_f64(self.config.backoff_factor),
                        self.config.max_delay,
                    );
                }
            }
        }
    }

    fn should_retry(&self, error: &ExplorerError) -> bool {
        self.config.retry_on_errors.contains(&error.error_type())
    }
}
