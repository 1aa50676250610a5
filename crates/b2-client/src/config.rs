//! Client configuration

use crate::{ClientError, Result};
use std::time::Duration;

/// Default block size used when hashing files
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Authorization endpoint URL (API and download hosts come from the session)
    pub endpoint: String,
    /// Request timeout, applied to the whole exchange including the body
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Block size for SHA-1 computation (bytes)
    pub block_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "https://api.backblazeb2.com".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("b2-client/{}", env!("CARGO_PKG_VERSION")),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl Config {
    /// Create a new config with the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the hashing block size
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Endpoint without a trailing slash
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(ClientError::Config("endpoint must not be empty".to_string()));
        }
        if self.block_size == 0 {
            return Err(ClientError::Config("block_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
