//! Pool definition loaded from TOML

use anyhow::{Context, Result};
use pool_converter::Address;
use serde::{de, Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    #[error("unknown account or token {0:?}")]
    UnknownName(String),

    #[error("label {0:?} is defined twice")]
    DuplicateLabel(String),

    #[error("initial deposits must be given for every reserve or for none")]
    PartialDeposits,

    #[error("a pool needs at least one reserve")]
    NoReserves,
}

/// Parse a token amount, allowing `_` digit separators
pub fn parse_amount(text: &str) -> Result<u128, ConfigError> {
    let digits: String = text.trim().chars().filter(|c| *c != '_').collect();
    digits
        .parse()
        .map_err(|_| ConfigError::InvalidAmount(text.to_string()))
}

/// Token amount that accepts TOML integers or decimal strings
///
/// TOML integers stop at `i64::MAX`, so 18-decimal balances are usually
/// written as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Amount(pub u128);

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> de::Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative integer or a decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount(u128::from(v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                u128::try_from(v)
                    .map(Amount)
                    .map_err(|_| E::custom(ConfigError::InvalidAmount(v.to_string())))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                parse_amount(v).map(Amount).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConverterSection {
    pub address: Address,
    /// Label or address of the owner
    pub owner: String,
    /// Fee ceiling in ppm
    pub max_conversion_fee: u32,
    #[serde(default)]
    pub conversion_fee: u32,
    #[serde(default)]
    pub manager: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolTokenSection {
    pub address: Address,
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReserveSection {
    pub symbol: String,
    pub address: Address,
    /// Weight in ppm
    pub weight: u32,
    #[serde(default)]
    pub virtual_balance: Option<Amount>,
    /// Deposited by the owner when the pool is created
    #[serde(default)]
    pub initial_deposit: Option<Amount>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BalanceSection {
    pub holder: String,
    pub token: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    pub converter: ConverterSection,
    pub pool_token: PoolTokenSection,
    #[serde(default)]
    pub reserves: Vec<ReserveSection>,
    /// Named accounts usable wherever an address is expected
    #[serde(default)]
    pub accounts: BTreeMap<String, Address>,
    /// Starting token balances
    #[serde(default)]
    pub balances: Vec<BalanceSection>,
}

impl PoolConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let path = expand_path(path)?;
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read pool config: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid pool config: {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: PoolConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.reserves.is_empty() {
            return Err(ConfigError::NoReserves);
        }
        let deposits = self
            .reserves
            .iter()
            .filter(|r| r.initial_deposit.is_some())
            .count();
        if deposits != 0 && deposits != self.reserves.len() {
            return Err(ConfigError::PartialDeposits);
        }
        self.labels().map(|_| ())
    }

    /// Account labels plus the converter itself, keyed in lowercase
    pub fn labels(&self) -> Result<BTreeMap<String, Address>, ConfigError> {
        let mut labels = BTreeMap::new();
        let named = self
            .accounts
            .iter()
            .map(|(name, address)| (name.to_lowercase(), *address))
            .chain(std::iter::once(("converter".to_string(), self.converter.address)));
        for (name, address) in named {
            if labels.insert(name.clone(), address).is_some() {
                return Err(ConfigError::DuplicateLabel(name));
            }
        }
        Ok(labels)
    }

    pub fn has_initial_deposits(&self) -> bool {
        self.reserves.iter().all(|r| r.initial_deposit.is_some())
    }
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path: {}", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
