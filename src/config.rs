use crate::error::{FilterError, Result};
use crate::hash::{HashStrategy, optimal_bit_count, optimal_hash_rounds};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a remote Bloom filter.
///
/// Only describes the filter; the store it talks to is supplied separately
/// when the filter is constructed.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct FilterConfig {
    /// Store key holding the bit array
    #[builder(setter(into))]
    pub key: String,

    /// Number of elements the filter is sized for
    #[builder(default = "1_000_000")]
    pub expected_insertions: u64,

    /// Target false positive rate (0.0 to 1.0, exclusive)
    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// TTL refreshed on the key after every insert
    #[builder(default = "None", setter(strip_option))]
    pub expiry: Option<Duration>,

    #[builder(default)]
    pub hash_strategy: HashStrategy,
}

impl FilterConfig {
    /// Checks capacity, error rate and key, in that order.
    pub fn validate(&self) -> Result<()> {
        if self.expected_insertions == 0 {
            return Err(FilterError::InvalidCapacity);
        }
        // Written so that NaN is rejected too.
        if !(self.false_positive_rate > 0.0 && self.false_positive_rate < 1.0)
        {
            return Err(FilterError::InvalidErrorRate {
                rate: self.false_positive_rate,
            });
        }
        if self.key.is_empty() {
            return Err(FilterError::EmptyKey);
        }
        Ok(())
    }

    /// Reads the configuration from `BLOOM_*` environment variables,
    /// loading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let key = std::env::var("BLOOM_KEY")
            .unwrap_or_else(|_| "bloom:filter".to_string());
        let expected_insertions =
            parse_env("BLOOM_EXPECTED_INSERTIONS", "1000000")?;
        let false_positive_rate = parse_env("BLOOM_FALSE_POSITIVE_RATE", "0.01")?;
        let expiry = match std::env::var("BLOOM_EXPIRY_SECS") {
            Ok(value) if !value.trim().is_empty() => {
                let secs: u64 = value.trim().parse().map_err(
                    |e: std::num::ParseIntError| FilterError::EnvParseError {
                        var_name: "BLOOM_EXPIRY_SECS".to_string(),
                        value: value.clone(),
                        error: e.to_string(),
                    },
                )?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };
        let hash_strategy = parse_env("BLOOM_HASH_STRATEGY", "xxhash")?;

        let config = Self {
            key,
            expected_insertions,
            false_positive_rate,
            expiry,
            hash_strategy,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_env<T>(var_name: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value =
        std::env::var(var_name).unwrap_or_else(|_| default.to_string());
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| FilterError::EnvParseError {
            var_name: var_name.to_string(),
            value: value.clone(),
            error: e.to_string(),
        })
}

/// Derived parameters, fixed once the filter is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    pub bit_count: u64,
    pub hash_rounds: u32,
}

impl FilterParams {
    /// Inputs must already be valid: `n > 0` and `0 < fpr < 1`.
    pub fn calculate(expected_insertions: u64, false_positive_rate: f64) -> Self {
        let bit_count =
            optimal_bit_count(expected_insertions, false_positive_rate).max(1);
        let hash_rounds = optimal_hash_rounds(expected_insertions, bit_count);

        Self {
            bit_count,
            hash_rounds,
        }
    }
}

impl From<&FilterConfig> for FilterParams {
    fn from(config: &FilterConfig) -> Self {
        Self::calculate(config.expected_insertions, config.false_positive_rate)
    }
}
