//! Manager configuration loaded from TOML, with the token registry and price formatting limits.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use range_core::{PoolKind, PricePolicy, TokenMetadata, MAX_TOKEN_DECIMALS};
use serde::{Deserialize, Serialize};

use crate::error::{PositionError, PositionResult};

/// Position manager configuration loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Chain the pools live on
    pub chain_id: u64,

    /// Quiet period before a dependent-amount request is sent
    pub debounce_ms: u64,

    /// Upper bound on every service call
    pub service_timeout_ms: u64,

    /// How often the pool-state watcher refreshes
    pub pool_poll_interval_ms: u64,

    pub logging: LoggingConfig,

    pub formatting: FormattingConfig,

    /// Known tokens
    pub tokens: Vec<TokenMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

/// Price display limits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FormattingConfig {
    pub price_significant_digits: u32,
    pub usd_price_decimals: u32,
    pub max_price_decimals: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            debounce_ms: 400,
            service_timeout_ms: 10_000,
            pool_poll_interval_ms: 12_000,
            logging: LoggingConfig::default(),
            formatting: FormattingConfig::default(),
            tokens: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            price_significant_digits: range_core::DEFAULT_PRICE_SIGNIFICANT_DIGITS,
            usd_price_decimals: range_core::DEFAULT_USD_PRICE_DECIMALS,
            max_price_decimals: range_core::DEFAULT_MAX_PRICE_DECIMALS,
        }
    }
}

impl ManagerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ManagerConfig = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> PositionResult<()> {
        if self.debounce_ms == 0 {
            return Err(invalid("debounce_ms", "0", "greater than 0"));
        }
        if self.service_timeout_ms == 0 {
            return Err(invalid("service_timeout_ms", "0", "greater than 0"));
        }
        if self.pool_poll_interval_ms == 0 {
            return Err(invalid("pool_poll_interval_ms", "0", "greater than 0"));
        }
        if self.formatting.price_significant_digits == 0 {
            return Err(invalid("formatting.price_significant_digits", "0", "greater than 0"));
        }
        if self.formatting.usd_price_decimals > self.formatting.max_price_decimals {
            return Err(invalid(
                "formatting.usd_price_decimals",
                &self.formatting.usd_price_decimals.to_string(),
                "at most max_price_decimals",
            ));
        }

        let mut addresses = HashSet::new();
        for token in &self.tokens {
            if token.decimals > MAX_TOKEN_DECIMALS {
                return Err(invalid(
                    &format!("tokens.{}.decimals", token.symbol),
                    &token.decimals.to_string(),
                    "at most 36",
                ));
            }
            if token.display_decimals > token.decimals {
                return Err(invalid(
                    &format!("tokens.{}.display_decimals", token.symbol),
                    &token.display_decimals.to_string(),
                    "at most the token decimals",
                ));
            }
            if !addresses.insert(token.address.to_lowercase()) {
                return Err(invalid("tokens.address", &token.address, "unique"));
            }
        }

        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_millis(self.service_timeout_ms)
    }

    pub fn pool_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pool_poll_interval_ms)
    }

    pub fn token_registry(&self) -> TokenRegistry {
        TokenRegistry::new(self.tokens.clone())
    }
}

impl FormattingConfig {
    /// Display policy for prices quoted in `quote`
    pub fn price_policy(&self, quote: &TokenMetadata, kind: PoolKind) -> PricePolicy {
        let policy = PricePolicy::for_quote(quote, kind)
            .with_significant_digits(self.price_significant_digits)
            .with_max_decimals(self.max_price_decimals);

        if quote.is_usd_pegged() && kind == PoolKind::Volatile {
            policy.with_decimals(self.usd_price_decimals)
        } else {
            policy
        }
    }
}

fn invalid(field: &str, value: &str, expected: &str) -> PositionError {
    PositionError::Configuration(format!("{field} = {value}, expected {expected}"))
}

/// Lookup table over the configured tokens
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: Vec<TokenMetadata>,
}

impl TokenRegistry {
    pub fn new(tokens: Vec<TokenMetadata>) -> Self {
        Self { tokens }
    }

    pub fn by_address(&self, address: &str) -> Option<&TokenMetadata> {
        self.tokens
            .iter()
            .find(|t| t.address.eq_ignore_ascii_case(address))
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&TokenMetadata> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
