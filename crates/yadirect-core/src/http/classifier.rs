//! Response classification
//!
//! Maps one decoded response to what the engine should do next. Rules are checked in
//! order; the first match wins.

use std::time::Duration;

use crate::http::error::{ApiError, ErrorPayload};
use crate::http::retry::{
    RetryPolicy, INSUFFICIENT_UNITS_DELAY, RATE_LIMIT_DELAY, REPORT_POLL_DELAY, TRANSIENT_DELAY,
};
use crate::http::transport::Exchange;
use crate::ErrorKind;

/// Out of API units
pub const CODE_NOT_ENOUGH_UNITS: i64 = 152;
/// OAuth token missing or invalid
pub const CODE_TOKEN: i64 = 53;
/// Too many requests, concurrent request limit or report queue full
pub const CODES_RATE_LIMITED: [i64; 3] = [56, 506, 9000];
/// Server-side failures worth resending
pub const CODES_TRANSIENT: [i64; 4] = [52, 1000, 1001, 1002];

const TOKEN_MISSING_DETAIL: &str = "OAuth token is missing";

/// What to do with a response
#[derive(Debug, Clone)]
pub enum ResponseOutcome {
    Success(Exchange),
    /// Report is still being built; ask again after `retry_in`
    ReportPending { exchange: Exchange, retry_in: Duration },
    /// Send the same request again after `wait`
    Retryable { kind: ErrorKind, wait: Duration },
    Fatal(ApiError),
}

impl ResponseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success(_))
    }
}

/// Classify one response
///
/// `server_errors_so_far` counts transient failures already retried for this request;
/// once it reaches `policy.retries_if_server_error` transient failures become fatal.
pub fn classify(exchange: Exchange, policy: &RetryPolicy, server_errors_so_far: u32) -> ResponseOutcome {
    match exchange.status {
        201 | 202 => {
            let retry_in = retry_in(&exchange).unwrap_or(REPORT_POLL_DELAY);
            return ResponseOutcome::ReportPending { exchange, retry_in };
        }
        502 => {
            let mut error = ApiError::from_exchange(ErrorKind::ServerTimeout, &exchange);
            error.message = format!(
                "server timed out building the response, reduce the period or volume of requested data ({})",
                error.message
            );
            return ResponseOutcome::Fatal(error);
        }
        405 => {
            return ResponseOutcome::Fatal(ApiError::from_exchange(
                ErrorKind::MethodNotSupported,
                &exchange,
            ))
        }
        _ => {}
    }

    let transient = |exchange: &Exchange| {
        if server_errors_so_far < policy.retries_if_server_error {
            ResponseOutcome::Retryable {
                kind: ErrorKind::TransientServer,
                wait: TRANSIENT_DELAY,
            }
        } else {
            ResponseOutcome::Fatal(ApiError::from_exchange(ErrorKind::TransientServer, exchange))
        }
    };

    if let Some(payload) = exchange.body.as_json().and_then(ErrorPayload::from_body) {
        let code = payload.error_code;
        return if code == CODE_NOT_ENOUGH_UNITS {
            if policy.retry_if_not_enough_units {
                ResponseOutcome::Retryable {
                    kind: ErrorKind::InsufficientUnits,
                    wait: INSUFFICIENT_UNITS_DELAY,
                }
            } else {
                ResponseOutcome::Fatal(ApiError::from_exchange(ErrorKind::InsufficientUnits, &exchange))
            }
        } else if code == CODE_TOKEN || payload.error_detail.as_deref() == Some(TOKEN_MISSING_DETAIL) {
            ResponseOutcome::Fatal(ApiError::from_exchange(ErrorKind::Token, &exchange))
        } else if CODES_RATE_LIMITED.contains(&code) {
            if policy.retry_if_exceeded_limit {
                ResponseOutcome::Retryable {
                    kind: ErrorKind::RateLimited,
                    wait: RATE_LIMIT_DELAY,
                }
            } else {
                let mut error = ApiError::from_exchange(ErrorKind::RateLimited, &exchange);
                if code == 9000 {
                    error.message = format!("maximum number of reports already queued ({})", error.message);
                }
                ResponseOutcome::Fatal(error)
            }
        } else if CODES_TRANSIENT.contains(&code) {
            transient(&exchange)
        } else {
            ResponseOutcome::Fatal(ApiError::from_exchange(ErrorKind::Client, &exchange))
        };
    }

    match exchange.status {
        500 => transient(&exchange),
        status if status >= 400 => {
            ResponseOutcome::Fatal(ApiError::from_exchange(ErrorKind::Http, &exchange))
        }
        _ => ResponseOutcome::Success(exchange),
    }
}

/// `retryIn` header in seconds; fractional values are accepted
fn retry_in(exchange: &Exchange) -> Option<Duration> {
    let raw = exchange.header("retryin")?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}
