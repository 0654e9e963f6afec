//! Client configuration
//!
//! One [`ClientConfig`] is fixed at client construction and read by every request.
//! Per-call [`CallOptions`](crate::call::CallOptions) are layered on top with
//! [`ClientConfig::apply`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::call::CallOptions;
use crate::http::retry::RetryPolicy;
use crate::{Error, Result};

pub const PRODUCTION_HOST: &str = "api.direct.yandex.com";
pub const SANDBOX_HOST: &str = "api-sandbox.direct.yandex.com";

pub const DEFAULT_LANGUAGE: &str = "ru";

/// How the server builds a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    #[default]
    Auto,
    Online,
    Offline,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Auto => "auto",
            ProcessingMode::Online => "online",
            ProcessingMode::Offline => "offline",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header toggles sent with report requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub processing_mode: ProcessingMode,
    pub return_money_in_micros: bool,
    /// Drop the title line (report name and period)
    pub skip_report_header: bool,
    /// Drop the column-name line
    pub skip_column_header: bool,
    /// Drop the trailing `Total rows` line
    pub skip_report_summary: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            processing_mode: ProcessingMode::Auto,
            return_money_in_micros: false,
            skip_report_header: true,
            skip_column_header: false,
            skip_report_summary: true,
        }
    }
}

/// Configuration shared by every request a client makes
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub access_token: Option<String>,
    /// Advertiser login; required when an agency acts for a client
    pub login: Option<String>,
    /// Spend the agency's units instead of the advertiser's
    pub use_operator_units: bool,
    pub language: String,
    pub is_sandbox: bool,
    /// Replaces `https://<host>/`, for proxies and tests
    pub api_root: Option<String>,
    /// Split oversized id filters into several requests
    pub auto_request_generation: bool,
    /// Follow `LimitedBy` until every object is fetched
    pub receive_all_objects: bool,
    pub retry: RetryPolicy,
    pub report: ReportOptions,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Chunks of one fanned-out call allowed in flight at once
    pub max_concurrent_chunks: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            login: None,
            use_operator_units: false,
            language: DEFAULT_LANGUAGE.to_string(),
            is_sandbox: false,
            api_root: None,
            auto_request_generation: false,
            receive_all_objects: false,
            retry: RetryPolicy::default(),
            report: ReportOptions::default(),
            timeout_secs: 60,
            max_concurrent_chunks: 1,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("login", &self.login)
            .field("use_operator_units", &self.use_operator_units)
            .field("language", &self.language)
            .field("is_sandbox", &self.is_sandbox)
            .field("api_root", &self.api_root)
            .field("auto_request_generation", &self.auto_request_generation)
            .field("receive_all_objects", &self.receive_all_objects)
            .field("retry", &self.retry)
            .field("report", &self.report)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_concurrent_chunks", &self.max_concurrent_chunks)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration with the given OAuth token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..Default::default()
        }
    }

    /// Load from the environment, reading a `.env` file first if one exists
    ///
    /// Recognised variables: `YANDEX_DIRECT_TOKEN`, `YANDEX_DIRECT_LOGIN`,
    /// `YANDEX_DIRECT_LANGUAGE`, `YANDEX_DIRECT_SANDBOX`, `YANDEX_DIRECT_API_ROOT`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        config.access_token = env_string("YANDEX_DIRECT_TOKEN");
        config.login = env_string("YANDEX_DIRECT_LOGIN");
        if let Some(language) = env_string("YANDEX_DIRECT_LANGUAGE") {
            config.language = language;
        }
        if let Some(sandbox) = env_string("YANDEX_DIRECT_SANDBOX") {
            config.is_sandbox = parse_flag("YANDEX_DIRECT_SANDBOX", &sandbox)?;
        }
        config.api_root = env_string("YANDEX_DIRECT_API_ROOT");

        config.validate()?;
        Ok(config)
    }

    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.is_sandbox = sandbox;
        self
    }

    pub fn with_api_root(mut self, root: impl Into<String>) -> Self {
        self.api_root = Some(root.into());
        self
    }

    pub fn with_operator_units(mut self, enabled: bool) -> Self {
        self.use_operator_units = enabled;
        self
    }

    pub fn with_auto_request_generation(mut self, enabled: bool) -> Self {
        self.auto_request_generation = enabled;
        self
    }

    pub fn with_receive_all_objects(mut self, enabled: bool) -> Self {
        self.receive_all_objects = enabled;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_report_options(mut self, options: ReportOptions) -> Self {
        self.report = options;
        self
    }

    /// Request timeout in whole seconds; a fractional part rounds up
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self
    }

    pub fn with_max_concurrent_chunks(mut self, max: usize) -> Self {
        self.max_concurrent_chunks = max;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Scheme and host every resource path is joined to, always ending in `/`
    pub fn api_root(&self) -> String {
        match &self.api_root {
            Some(root) => format!("{}/", root.trim_end_matches('/')),
            None if self.is_sandbox => format!("https://{}/", SANDBOX_HOST),
            None => format!("https://{}/", PRODUCTION_HOST),
        }
    }

    /// Reject configurations no request could be built from
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(Error::Configuration {
                message: "language must not be empty".to_string(),
                source: None,
            });
        }
        if self.max_concurrent_chunks == 0 {
            return Err(Error::Configuration {
                message: "max_concurrent_chunks must be at least 1".to_string(),
                source: None,
            });
        }
        if self.timeout_secs == 0 {
            return Err(Error::Configuration {
                message: "timeout_secs must be greater than zero".to_string(),
                source: None,
            });
        }
        if let Some(root) = &self.api_root {
            url::Url::parse(root).map_err(|e| Error::Configuration {
                message: format!("invalid api_root {}", root),
                source: Some(anyhow::Error::new(e)),
            })?;
        }
        Ok(())
    }

    /// Effective configuration for one call, validated after the overrides
    pub fn apply(&self, options: &CallOptions) -> Result<ClientConfig> {
        let mut config = self.clone();
        if let Some(login) = &options.login {
            config.login = Some(login.clone());
        }
        if let Some(language) = &options.language {
            config.language = language.clone();
        }
        if let Some(v) = options.use_operator_units {
            config.use_operator_units = v;
        }
        if let Some(v) = options.auto_request_generation {
            config.auto_request_generation = v;
        }
        if let Some(v) = options.receive_all_objects {
            config.receive_all_objects = v;
        }
        if let Some(v) = options.retry_if_not_enough_units {
            config.retry.retry_if_not_enough_units = v;
        }
        if let Some(v) = options.retry_if_exceeded_limit {
            config.retry.retry_if_exceeded_limit = v;
        }
        if let Some(v) = options.retries_if_server_error {
            config.retry.retries_if_server_error = v;
        }
        if let Some(v) = options.wait_report {
            config.retry.wait_report = v;
        }
        if let Some(v) = options.processing_mode {
            config.report.processing_mode = v;
        }
        if let Some(v) = options.return_money_in_micros {
            config.report.return_money_in_micros = v;
        }
        if let Some(v) = options.skip_report_header {
            config.report.skip_report_header = v;
        }
        if let Some(v) = options.skip_column_header {
            config.report.skip_column_header = v;
        }
        if let Some(v) = options.skip_report_summary {
            config.report.skip_report_summary = v;
        }
        config.validate()?;
        Ok(config)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Configuration {
            message: format!("{} must be a boolean, got '{}'", name, other),
            source: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.language, "ru");
        assert!(!config.is_sandbox);
        assert!(!config.auto_request_generation);
        assert!(!config.receive_all_objects);
        assert_eq!(config.report.processing_mode, ProcessingMode::Auto);
        assert!(config.report.skip_report_header);
        assert!(!config.report.skip_column_header);
        assert!(config.report.skip_report_summary);
        assert_eq!(config.max_concurrent_chunks, 1);
    }

    #[test]
    fn test_api_root() {
        assert_eq!(
            ClientConfig::default().api_root(),
            "https://api.direct.yandex.com/"
        );
        assert_eq!(
            ClientConfig::default().with_sandbox(true).api_root(),
            "https://api-sandbox.direct.yandex.com/"
        );
        assert_eq!(
            ClientConfig::default()
                .with_sandbox(true)
                .with_api_root("http://127.0.0.1:8080")
                .api_root(),
            "http://127.0.0.1:8080/"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", ClientConfig::new("secret-token"));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_validate() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(ClientConfig::default().with_language(" ").validate().is_err());
        assert!(ClientConfig::default().with_max_concurrent_chunks(0).validate().is_err());
        assert!(ClientConfig::default().with_api_root("not a url").validate().is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let base = ClientConfig::new("token").with_login("agency-client");
        let options = CallOptions {
            receive_all_objects: Some(true),
            wait_report: Some(false),
            processing_mode: Some(ProcessingMode::Offline),
            login: Some("other-client".to_string()),
            ..Default::default()
        };

        let effective = base.apply(&options).unwrap();
        assert!(effective.receive_all_objects);
        assert!(!effective.retry.wait_report);
        assert_eq!(effective.report.processing_mode, ProcessingMode::Offline);
        assert_eq!(effective.login.as_deref(), Some("other-client"));
        // base is untouched
        assert!(!base.receive_all_objects);
        assert_eq!(base.login.as_deref(), Some("agency-client"));
    }

    #[test]
    fn test_apply_rejects_empty_language() {
        let options = CallOptions {
            language: Some("".to_string()),
            ..Default::default()
        };
        let err = ClientConfig::new("token").apply(&options).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
        assert!(err.to_string().contains("language"));
    }

    #[test]
    fn test_timeout_rounds_up() {
        let config = ClientConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout_secs, 1);
        assert!(config.validate().is_ok());

        let config = ClientConfig::default().with_timeout(Duration::from_millis(2500));
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(ClientConfig::default().with_timeout(Duration::from_secs(30)).timeout_secs, 30);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ClientConfig = serde_json::from_value(serde_json::json!({
            "access_token": "t",
            "is_sandbox": true,
            "retry": {"retries_if_server_error": 2}
        }))
        .unwrap();
        assert!(config.is_sandbox);
        assert_eq!(config.retry.retries_if_server_error, 2);
        assert!(config.retry.retry_if_exceeded_limit);
        assert_eq!(config.language, "ru");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("X", "Yes").unwrap());
        assert!(!parse_flag("X", "0").unwrap());
        assert!(parse_flag("X", "maybe").is_err());
    }
}
