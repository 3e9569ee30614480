//! Configuration types for the client.

use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::errors::MeiliError;
use crate::executor::{ExecutionMode, Executor};
use crate::index::DEFAULT_BATCH_SIZE;
use crate::tasks::WaitOptions;

const DEFAULT_URL: &str = "http://localhost:7700";

/// Which HTTP proxy the transport goes through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxyMode {
    /// `HTTP_PROXY`, `HTTPS_PROXY` and `NO_PROXY` from the environment.
    #[default]
    Environment,
    /// Connect to the server directly.
    Disabled,
    /// Send every request through this proxy URL.
    Url(String),
}

/// Configuration for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server URL.
    pub url: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    /// Per-request HTTP timeout. `None` waits for the server indefinitely.
    pub timeout: Option<Duration>,
    pub proxy: ProxyMode,
    pub execution_mode: ExecutionMode,
    /// Maximum number of batches in flight. `None` runs every batch at once.
    pub concurrency_limit: Option<NonZeroUsize>,
    /// Default number of documents per batch.
    pub batch_size: usize,
    /// Default task polling behaviour.
    pub wait: WaitOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout: None,
            proxy: ProxyMode::Environment,
            execution_mode: ExecutionMode::Concurrent,
            concurrency_limit: None,
            batch_size: DEFAULT_BATCH_SIZE,
            wait: WaitOptions::default(),
        }
    }
}

impl ClientConfig {
    /// Create a config for the server at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Read the config from `MEILI_URL`, `MEILI_API_KEY`, `MEILI_TIMEOUT_MS`
    /// and `MEILI_CONCURRENCY_LIMIT`.
    pub fn from_env() -> Result<Self, MeiliError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MeiliError> {
        let parse = |key: &str| -> Result<Option<u64>, MeiliError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(|v| {
                    v.trim().parse::<u64>().map_err(|e| {
                        MeiliError::validation(format!("Invalid {} '{}': {}", key, v, e))
                    })
                })
                .transpose()
        };

        let mut config = Self::new(lookup("MEILI_URL").unwrap_or_else(|| DEFAULT_URL.to_string()));
        config.api_key = lookup("MEILI_API_KEY").filter(|k| !k.is_empty());
        config.timeout = parse("MEILI_TIMEOUT_MS")?.map(Duration::from_millis);
        config.concurrency_limit = parse("MEILI_CONCURRENCY_LIMIT")?
            .and_then(|limit| NonZeroUsize::new(limit as usize));
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyMode) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    /// Limit the number of batches in flight; `0` removes the limit.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = NonZeroUsize::new(limit);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// The executor every operation of the client runs on.
    pub fn executor(&self) -> Executor {
        Executor::new(self.execution_mode, self.concurrency_limit)
    }
}
