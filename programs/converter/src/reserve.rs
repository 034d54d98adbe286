//! Reserve ledger
//!
//! Per-converter bookkeeping of reserve assets. Invariants:
//!
//! - R1: every weight is in `1..=MAX_WEIGHT`
//! - R2: the weight sum never exceeds `MAX_WEIGHT`
//! - R3: reserve identities are unique and keep their registration order
//! - R4: a virtual pricing balance is positive and never below the real balance

use crate::{Address, ConverterError, Result};
use bonding_curve::{FormulaError, MAX_WEIGHT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balance a reserve is priced against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingMode {
    /// Price against the held balance
    Real,
    /// Price against an override that moves with the held balance
    Virtual(u128),
}

/// Pricing balance resolved for a reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveBalance {
    Real(u128),
    Virtual(u128),
}

impl EffectiveBalance {
    pub fn amount(self) -> u128 {
        match self {
            EffectiveBalance::Real(amount) | EffectiveBalance::Virtual(amount) => amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    /// Held amount, authoritative for settlement
    pub balance: u128,

    /// Weight in ppm
    pub weight: u32,

    pub pricing: PricingMode,

    /// Whether the reserve may be deposited against
    pub purchases_enabled: bool,
}

impl Reserve {
    pub fn effective_balance(&self) -> EffectiveBalance {
        match self.pricing {
            PricingMode::Real => EffectiveBalance::Real(self.balance),
            PricingMode::Virtual(amount) => EffectiveBalance::Virtual(amount),
        }
    }
}

fn validate_weight(weight: u32) -> Result<()> {
    if weight == 0 || weight > MAX_WEIGHT {
        return Err(ConverterError::InvalidArgument("reserve weight must be in 1..=1000000 ppm"));
    }
    Ok(())
}

fn validate_pricing(pricing: PricingMode, balance: u128) -> Result<()> {
    if let PricingMode::Virtual(amount) = pricing {
        if amount == 0 || amount < balance {
            return Err(ConverterError::InvalidArgument(
                "virtual balance must be positive and at least the real balance",
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveLedger {
    order: Vec<Address>,
    reserves: BTreeMap<Address, Reserve>,
}

impl ReserveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, asset: &Address) -> bool {
        self.reserves.contains_key(asset)
    }

    /// Reserve identities in registration order
    pub fn assets(&self) -> &[Address] {
        &self.order
    }

    /// Reserves in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Reserve)> + '_ {
        self.order
            .iter()
            .filter_map(move |asset| self.reserves.get(asset).map(|reserve| (asset, reserve)))
    }

    pub fn total_weight(&self) -> u32 {
        self.reserves.values().map(|r| r.weight).sum()
    }

    /// Whether the weights cover the full ratio (required for proportional operations)
    pub fn is_fully_weighted(&self) -> bool {
        !self.is_empty() && self.total_weight() == MAX_WEIGHT
    }

    pub fn get(&self, asset: &Address) -> Result<&Reserve> {
        self.reserves
            .get(asset)
            .ok_or(ConverterError::StateConflict("reserve not found"))
    }

    fn get_mut(&mut self, asset: &Address) -> Result<&mut Reserve> {
        self.reserves
            .get_mut(asset)
            .ok_or(ConverterError::StateConflict("reserve not found"))
    }

    pub fn effective_balance(&self, asset: &Address) -> Result<EffectiveBalance> {
        Ok(self.get(asset)?.effective_balance())
    }

    /// Register a new reserve, priced against its real balance
    pub fn add(&mut self, asset: Address, weight: u32) -> Result<()> {
        validate_weight(weight)?;
        if self.contains(&asset) {
            return Err(ConverterError::StateConflict("reserve already exists"));
        }
        if self.total_weight() + weight > MAX_WEIGHT {
            return Err(ConverterError::StateConflict("reserve weights would exceed 100%"));
        }

        self.order.push(asset);
        self.reserves.insert(
            asset,
            Reserve {
                balance: 0,
                weight,
                pricing: PricingMode::Real,
                purchases_enabled: true,
            },
        );
        Ok(())
    }

    /// Change weight and pricing mode of an existing reserve
    ///
    /// A virtual balance must be supplied together with the weight change so
    /// a stale override can never survive a reconfiguration.
    pub fn update(&mut self, asset: &Address, weight: u32, pricing: PricingMode) -> Result<()> {
        validate_weight(weight)?;
        let current = self.get(asset)?;
        validate_pricing(pricing, current.balance)?;

        let others = self.total_weight() - current.weight;
        if others + weight > MAX_WEIGHT {
            return Err(ConverterError::StateConflict("reserve weights would exceed 100%"));
        }

        let reserve = self.get_mut(asset)?;
        reserve.weight = weight;
        reserve.pricing = pricing;
        Ok(())
    }

    pub fn set_purchases_enabled(&mut self, asset: &Address, enabled: bool) -> Result<()> {
        self.get_mut(asset)?.purchases_enabled = enabled;
        Ok(())
    }

    /// Record an incoming settlement
    pub fn credit(&mut self, asset: &Address, amount: u128) -> Result<()> {
        let reserve = self.get_mut(asset)?;
        reserve.balance = reserve
            .balance
            .checked_add(amount)
            .ok_or(FormulaError::Overflow)?;
        if let PricingMode::Virtual(virtual_balance) = &mut reserve.pricing {
            *virtual_balance = virtual_balance
                .checked_add(amount)
                .ok_or(FormulaError::Overflow)?;
        }
        Ok(())
    }

    /// Record an outgoing settlement
    pub fn debit(&mut self, asset: &Address, amount: u128) -> Result<()> {
        let reserve = self.get_mut(asset)?;
        if amount > reserve.balance {
            return Err(ConverterError::StateConflict("insufficient reserve balance"));
        }
        reserve.balance -= amount;
        if let PricingMode::Virtual(virtual_balance) = &mut reserve.pricing {
            // R4 keeps the override at or above the real balance
            *virtual_balance -= amount;
        }
        Ok(())
    }

    /// Overwrite the held balance, shifting a virtual override by the same delta
    pub fn set_balance(&mut self, asset: &Address, balance: u128) -> Result<()> {
        let current = self.get(asset)?.balance;
        if balance >= current {
            self.credit(asset, balance - current)
        } else {
            self.debit(asset, current - balance)
        }
    }

    /// Insert a full copy of another ledger's reserve (upgrade hand-off)
    pub(crate) fn replicate(&mut self, asset: Address, reserve: &Reserve) -> Result<()> {
        validate_pricing(reserve.pricing, reserve.balance)?;
        self.add(asset, reserve.weight)?;
        let entry = self.get_mut(&asset)?;
        *entry = reserve.clone();
        Ok(())
    }
}
