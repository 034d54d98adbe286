//! Simulation state persisted between CLI invocations

use anyhow::{Context, Result};
use log::info;
use pool_converter::{
    Address, Converter, ConverterEvent, MemoryHost, PricingMode, ReserveAmount, TokenHost,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::{expand_path, ConfigError, PoolConfig};

#[derive(Debug, Serialize, Deserialize)]
pub struct SimulationState {
    pub host: MemoryHost,
    pub converter: Converter,
    /// Converters replaced by `upgrade`, oldest first
    #[serde(default)]
    pub retired: Vec<Converter>,
    /// Lowercase label → address
    pub labels: BTreeMap<String, Address>,
    /// Every event emitted so far
    #[serde(default)]
    pub history: Vec<ConverterEvent>,
}

impl SimulationState {
    /// Build a live pool from its definition
    ///
    /// Creates the tokens, hands out starting balances, registers the
    /// reserves, activates the converter and, when every reserve carries an
    /// initial deposit, seeds the pool from the owner's account.
    pub fn from_config(config: &PoolConfig) -> Result<Self> {
        let labels = config.labels()?;
        let mut host = MemoryHost::new();
        let owner = resolve_in(&labels, &host, &config.converter.owner)?;
        let this = config.converter.address;
        let pool = config.pool_token.address;

        host.create_token(pool, &config.pool_token.symbol, Some(owner))?;
        for reserve in &config.reserves {
            host.create_token(reserve.address, &reserve.symbol, None)?;
        }
        for balance in &config.balances {
            let holder = resolve_in(&labels, &host, &balance.holder)?;
            let token = resolve_in(&labels, &host, &balance.token)?;
            host.mint(&token, &holder, balance.amount.0)?;
        }

        let mut conv = Converter::new(this, pool, owner, config.converter.max_conversion_fee, None)
            .context("Failed to create converter")?;
        for reserve in &config.reserves {
            conv.add_reserve(&owner, reserve.address, reserve.weight)
                .with_context(|| format!("Failed to add reserve {}", reserve.symbol))?;
            if let Some(amount) = reserve.virtual_balance {
                conv.update_reserve(
                    &owner,
                    &reserve.address,
                    reserve.weight,
                    PricingMode::Virtual(amount.0),
                )
                .with_context(|| format!("Failed to set virtual balance of {}", reserve.symbol))?;
            }
        }

        host.transfer_token_ownership(&pool, &owner, &this)?;
        conv.accept_token_ownership(&mut host, &owner)
            .context("Failed to activate converter")?;
        conv.set_conversion_fee(&owner, config.converter.conversion_fee)?;
        if let Some(manager) = &config.converter.manager {
            let manager = resolve_in(&labels, &host, manager)?;
            conv.transfer_management(&owner, manager)?;
            conv.accept_management(&manager)?;
        }

        if config.has_initial_deposits() {
            let mut deposits = Vec::with_capacity(config.reserves.len());
            for reserve in &config.reserves {
                let amount = reserve.initial_deposit.map(|a| a.0).unwrap_or_default();
                host.mint(&reserve.address, &owner, amount)?;
                host.approve(&reserve.address, &owner, &this, amount)?;
                deposits.push(ReserveAmount {
                    reserve: reserve.address,
                    amount,
                });
            }
            let receipt = conv
                .add_liquidity(&mut host, &owner, &deposits, 1)
                .context("Failed to seed initial liquidity")?;
            info!("pool seeded with {} pool tokens", receipt.pool_amount);
        }

        let mut state = SimulationState {
            host,
            converter: conv,
            retired: Vec::new(),
            labels,
            history: Vec::new(),
        };
        state.record_events();
        Ok(state)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let path = expand_path(path)?;
        let text = fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read state file: {}\nCreate one with: converter init --config <pool.toml>",
                path.display()
            )
        })?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let path = expand_path(path)?;
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&path, text)
            .with_context(|| format!("Failed to write state file: {}", path.display()))
    }

    /// Resolve a label, token symbol or hex address
    pub fn resolve(&self, name: &str) -> Result<Address, ConfigError> {
        resolve_in(&self.labels, &self.host, name)
    }

    /// Display name for an address: its label, its token symbol, or hex
    pub fn name_of(&self, address: &Address) -> String {
        if let Some((label, _)) = self.labels.iter().find(|(_, a)| *a == address) {
            return label.clone();
        }
        if let Some(token) = self.host.token(address) {
            return token.symbol.clone();
        }
        address.to_string()
    }

    /// Move the converter's pending events into the history, returning them
    pub fn record_events(&mut self) -> Vec<ConverterEvent> {
        let events = self.converter.drain_events();
        self.history.extend(events.iter().cloned());
        events
    }

    pub fn supply(&self) -> Result<u128> {
        Ok(self.host.total_supply(&self.converter.pool_token())?)
    }
}

fn resolve_in(
    labels: &BTreeMap<String, Address>,
    host: &MemoryHost,
    name: &str,
) -> Result<Address, ConfigError> {
    if let Some(address) = labels.get(&name.to_lowercase()) {
        return Ok(*address);
    }
    if let Some(address) = host.find_by_symbol(name) {
        return Ok(address);
    }
    name.parse()
        .map_err(|_| ConfigError::UnknownName(name.to_string()))
}
