//! Retry policy and per-request retry bookkeeping
//!
//! Delays are fixed per failure class; there is no jitter and no backoff growth.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::http::transport::TransportError;
use crate::{Error, ErrorKind, Result};

/// Wait after a transient server error or a network failure
pub const TRANSIENT_DELAY: Duration = Duration::from_secs(1);
/// Wait after a rate-limit error (codes 56, 506, 9000)
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(10);
/// Wait when the server sends 201/202 without a `retryIn` header
pub const REPORT_POLL_DELAY: Duration = Duration::from_secs(10);
/// Wait after running out of API units (code 152)
pub const INSUFFICIENT_UNITS_DELAY: Duration = Duration::from_secs(300);

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Wait and resend when the account is out of units
    pub retry_if_not_enough_units: bool,
    /// Wait and resend on request-rate and report-queue limits
    pub retry_if_exceeded_limit: bool,
    /// Resends allowed per request after transient server or network errors
    pub retries_if_server_error: u32,
    /// Keep polling a report until it is ready
    pub wait_report: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_if_not_enough_units: false,
            retry_if_exceeded_limit: true,
            retries_if_server_error: 5,
            wait_report: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that never resends anything
    pub fn none() -> Self {
        Self {
            retry_if_not_enough_units: false,
            retry_if_exceeded_limit: false,
            retries_if_server_error: 0,
            wait_report: false,
        }
    }

    pub fn with_retry_if_not_enough_units(mut self, enabled: bool) -> Self {
        self.retry_if_not_enough_units = enabled;
        self
    }

    pub fn with_retry_if_exceeded_limit(mut self, enabled: bool) -> Self {
        self.retry_if_exceeded_limit = enabled;
        self
    }

    /// Set the server-error budget
    pub fn with_server_error_retries(mut self, retries: u32) -> Self {
        self.retries_if_server_error = retries;
        self
    }

    pub fn with_wait_report(mut self, wait: bool) -> Self {
        self.wait_report = wait;
        self
    }
}

/// Decision on whether to retry a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay
    Retry { delay: Duration },
    /// Do not retry the request
    NoRetry,
}

/// Retry bookkeeping for a single request descriptor
#[derive(Debug)]
pub struct RetryHandler {
    policy: RetryPolicy,
    attempts: u32,
    server_errors: u32,
    report_polls: u32,
}

impl RetryHandler {
    /// Create a new retry handler with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            server_errors: 0,
            report_polls: 0,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Count one send
    pub fn record_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Count a retry the classifier approved
    pub fn record_retry(&mut self, kind: ErrorKind) {
        if kind == ErrorKind::TransientServer {
            self.server_errors += 1;
        }
    }

    pub fn record_report_poll(&mut self) -> u32 {
        self.report_polls += 1;
        self.report_polls
    }

    /// Network failures share the server-error budget
    pub fn on_network_failure(&mut self, error: &TransportError) -> RetryDecision {
        if !error.is_retryable() || self.server_errors >= self.policy.retries_if_server_error {
            return RetryDecision::NoRetry;
        }
        self.server_errors += 1;
        RetryDecision::Retry { delay: TRANSIENT_DELAY }
    }

    /// Number of sends made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Transient failures already retried for this request
    pub fn server_errors(&self) -> u32 {
        self.server_errors
    }

    pub fn report_polls(&self) -> u32 {
        self.report_polls
    }
}

/// Sleep for `delay` unless `cancel` fires first
pub async fn wait_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
