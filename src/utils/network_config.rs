//! Mint Endpoint Configuration
//!
//! Validates and manages the issuer endpoint with:
//! - URL format validation
//! - TLS requirement enforcement (plain HTTP only for local development)
//! - Request timeouts and user agent
//! - Environment overrides

use crate::error::{WalletError, WalletResult};
use std::time::Duration;
use url::Url;

/// Environment variable naming the default mint
pub const ENV_MINT_URL: &str = "CASHU_MINT_URL";
/// Environment variable overriding the request timeout, in seconds
pub const ENV_TIMEOUT_SECS: &str = "CASHU_TIMEOUT_SECS";
/// Environment variable enabling debug logging when set to `1` or `true`
pub const ENV_DEBUG: &str = "CASHU_DEBUG";

const DEFAULT_MINT_URL: &str = "http://localhost:3338";

/// Connection settings for one issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintConfig {
    pub mint_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            mint_url: DEFAULT_MINT_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("cashu-wallet-core/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl MintConfig {
    pub fn new(mint_url: impl Into<String>) -> Self {
        Self {
            mint_url: mint_url.into(),
            ..Self::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Defaults overridden by `CASHU_MINT_URL` and `CASHU_TIMEOUT_SECS`.
    /// `CASHU_DEBUG` switches on debug logging as a side effect.
    pub fn from_env() -> WalletResult<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        if std::env::var(ENV_DEBUG)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            super::logging::enable_debug();
        }

        Ok(config)
    }

    fn from_lookup<F>(lookup: F) -> WalletResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_MINT_URL) {
            config.mint_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                WalletError::invalid_input(format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validated, normalized copy of this configuration
    pub fn validated(mut self) -> WalletResult<Self> {
        let validation = validate_mint_url(&self.mint_url);
        match validation.url {
            Some(url) if validation.is_valid => {
                self.mint_url = url;
                Ok(self)
            }
            _ => Err(WalletError::invalid_mint_url(validation.errors.join("; "))),
        }
    }
}

/// Validation result for a mint URL
#[derive(Debug, Clone)]
pub struct MintUrlValidation {
    pub is_valid: bool,
    /// Normalized URL without a trailing slash
    pub url: Option<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

fn is_local_host(host: &str) -> bool {
    host == "localhost" || host == "127.0.0.1" || host.starts_with("192.168.")
}

/// Validate a mint base URL
pub fn validate_mint_url(url: &str) -> MintUrlValidation {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let parsed = match Url::parse(url.trim()) {
        Ok(u) => u,
        Err(e) => {
            errors.push(format!("Invalid URL format: {}", e));
            return MintUrlValidation {
                is_valid: false,
                url: None,
                warnings,
                errors,
            };
        }
    };

    match parsed.scheme() {
        "https" => {}
        "http" => {
            // Plain HTTP is only tolerated for local development
            match parsed.host_str() {
                Some(host) if is_local_host(host) => {
                    warnings.push("HTTP allowed for local development only".to_string());
                }
                _ => errors.push("HTTPS required for remote mints".to_string()),
            }
        }
        other => errors.push(format!("Unsupported URL scheme: {}", other)),
    }

    if parsed.host_str().is_none() {
        errors.push("Mint URL has no host".to_string());
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        errors.push("Mint URL must not carry a query or fragment".to_string());
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        warnings.push("Credentials in URL - they will be sent with every request".to_string());
    }

    let is_valid = errors.is_empty();
    let normalized = if is_valid {
        Some(parsed.as_str().trim_end_matches('/').to_string())
    } else {
        None
    };

    MintUrlValidation {
        is_valid,
        url: normalized,
        warnings,
        errors,
    }
}
