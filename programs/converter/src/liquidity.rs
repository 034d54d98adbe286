//! Proportional liquidity
//!
//! Fund and liquidate mint or burn pool tokens against every reserve in
//! proportion to its balance. All four operations require the reserve
//! weights to sum to exactly 100%, and price every reserve against the
//! supply and balances read before the call touches anything.

use crate::{Address, Converter, ConverterError, ConverterEvent, FormulaError, Result, TokenHost};
use bonding_curve::{fund_cost, geometric_mean, liquidate_return, mul_div};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveAmount {
    pub reserve: Address,
    pub amount: u128,
}

/// Outcome of a liquidity operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityReceipt {
    /// Pool tokens issued or destroyed
    pub pool_amount: u128,
    /// Reserve amounts deposited or withdrawn, in registration order
    pub reserves: Vec<ReserveAmount>,
}

impl Converter {
    fn ensure_proportional(&self) -> Result<()> {
        self.ensure_active()?;
        if !self.reserves.is_fully_weighted() {
            return Err(ConverterError::StateConflict("reserve weights must sum to 100%"));
        }
        Ok(())
    }

    /// Snapshot of real balances in registration order
    fn balances(&self) -> Vec<(Address, u128)> {
        self.reserves
            .iter()
            .map(|(asset, reserve)| (*asset, reserve.balance))
            .collect()
    }

    /// Per-reserve cost of minting `amount` pool tokens, rounded up
    fn fund_costs(&self, supply: u128, amount: u128) -> Result<Vec<ReserveAmount>> {
        let mut costs = Vec::with_capacity(self.reserves.len());
        for (asset, balance) in self.balances() {
            let cost = fund_cost(supply, balance, amount)?;
            costs.push(ReserveAmount { reserve: asset, amount: cost });
        }
        Ok(costs)
    }

    /// Per-reserve payout for burning `amount` pool tokens, rounded down
    fn liquidate_returns(&self, supply: u128, amount: u128) -> Result<Vec<ReserveAmount>> {
        if amount > supply {
            return Err(ConverterError::InvalidArgument("amount exceeds pool supply"));
        }
        let mut payouts = Vec::with_capacity(self.reserves.len());
        for (asset, balance) in self.balances() {
            let payout = liquidate_return(supply, balance, amount)?;
            payouts.push(ReserveAmount { reserve: asset, amount: payout });
        }
        Ok(payouts)
    }

    /// Pool tokens minted for an ordered bundle, and what each reserve is charged
    fn liquidity_share(
        &self,
        supply: u128,
        offered: Vec<ReserveAmount>,
    ) -> Result<(u128, Vec<ReserveAmount>)> {
        if supply == 0 {
            let values: Vec<u128> = offered.iter().map(|o| o.amount).collect();
            return Ok((geometric_mean(&values)?, offered));
        }
        let mut minted = u128::MAX;
        for (offer, (_, balance)) in offered.iter().zip(self.balances()) {
            minted = minted.min(mul_div(offer.amount, supply, balance)?);
        }
        Ok((minted, self.fund_costs(supply, minted)?))
    }

    // ========================================================================
    // Previews
    // ========================================================================

    /// What `fund(amount)` would charge, without touching any state
    pub fn preview_fund<H: TokenHost>(&self, host: &H, amount: u128) -> Result<LiquidityReceipt> {
        if amount == 0 {
            return Err(ConverterError::InvalidArgument("amount must be positive"));
        }
        self.ensure_proportional()?;
        let supply = host.total_supply(&self.pool_token)?;
        Ok(LiquidityReceipt {
            pool_amount: amount,
            reserves: self.fund_costs(supply, amount)?,
        })
    }

    /// What `liquidate(amount)` or `remove_liquidity(amount, ..)` would pay out
    pub fn preview_liquidate<H: TokenHost>(
        &self,
        host: &H,
        amount: u128,
    ) -> Result<LiquidityReceipt> {
        if amount == 0 {
            return Err(ConverterError::InvalidArgument("amount must be positive"));
        }
        self.ensure_proportional()?;
        let supply = host.total_supply(&self.pool_token)?;
        Ok(LiquidityReceipt {
            pool_amount: amount,
            reserves: self.liquidate_returns(supply, amount)?,
        })
    }

    /// Pool tokens `add_liquidity(amounts, ..)` would mint and what it would charge
    pub fn preview_add_liquidity<H: TokenHost>(
        &self,
        host: &H,
        amounts: &[ReserveAmount],
    ) -> Result<LiquidityReceipt> {
        self.ensure_proportional()?;
        let offered = self.order_amounts(amounts)?;
        let supply = host.total_supply(&self.pool_token)?;
        let (pool_amount, reserves) = self.liquidity_share(supply, offered)?;
        Ok(LiquidityReceipt {
            pool_amount,
            reserves,
        })
    }

    /// Mint exactly `amount` pool tokens, charging each reserve its share rounded up
    pub fn fund<H: TokenHost>(
        &mut self,
        host: &mut H,
        provider: &Address,
        amount: u128,
    ) -> Result<LiquidityReceipt> {
        if amount == 0 {
            return Err(ConverterError::InvalidArgument("amount must be positive"));
        }
        self.ensure_proportional()?;

        self.atomically(host, "fund", |conv, host| {
            let supply = host.total_supply(&conv.pool_token)?;
            let deposits = conv.fund_costs(supply, amount)?;
            conv.deposit(host, provider, supply, amount, deposits)
        })
    }

    /// Burn exactly `amount` pool tokens, paying out each reserve's share rounded down
    pub fn liquidate<H: TokenHost>(
        &mut self,
        host: &mut H,
        provider: &Address,
        amount: u128,
    ) -> Result<LiquidityReceipt> {
        if amount == 0 {
            return Err(ConverterError::InvalidArgument("amount must be positive"));
        }
        self.ensure_proportional()?;
        self.atomically(host, "liquidate", |conv, host| {
            conv.withdraw(host, provider, amount, None)
        })
    }

    /// Deposit a bundle of reserves and mint the largest share it fully covers
    ///
    /// `amounts` must name every reserve exactly once. On an empty pool the
    /// whole bundle is taken and the initial supply is the geometric mean of
    /// the deposits; otherwise each reserve is charged only what the minted
    /// share costs, which never exceeds the offered amount.
    pub fn add_liquidity<H: TokenHost>(
        &mut self,
        host: &mut H,
        provider: &Address,
        amounts: &[ReserveAmount],
        min_return: u128,
    ) -> Result<LiquidityReceipt> {
        if min_return == 0 {
            return Err(ConverterError::InvalidArgument("minimum return must be positive"));
        }
        self.ensure_proportional()?;
        let offered = self.order_amounts(amounts)?;

        self.atomically(host, "add_liquidity", |conv, host| {
            let supply = host.total_supply(&conv.pool_token)?;
            let (minted, deposits) = conv.liquidity_share(supply, offered)?;
            if minted < min_return {
                return Err(ConverterError::SlippageExceeded {
                    minimum: min_return,
                    actual: minted,
                });
            }
            conv.deposit(host, provider, supply, minted, deposits)
        })
    }

    /// Burn `amount` pool tokens with a minimum return per reserve
    ///
    /// `min_returns` follows registration order and every entry must be positive.
    pub fn remove_liquidity<H: TokenHost>(
        &mut self,
        host: &mut H,
        provider: &Address,
        amount: u128,
        min_returns: &[u128],
    ) -> Result<LiquidityReceipt> {
        if amount == 0 {
            return Err(ConverterError::InvalidArgument("amount must be positive"));
        }
        self.ensure_proportional()?;
        if min_returns.len() != self.reserves.len() {
            return Err(ConverterError::InvalidArgument("one minimum return per reserve"));
        }
        if min_returns.contains(&0) {
            return Err(ConverterError::InvalidArgument("minimum return must be positive"));
        }
        self.atomically(host, "remove_liquidity", |conv, host| {
            conv.withdraw(host, provider, amount, Some(min_returns))
        })
    }

    /// Overwrite recorded reserve balances with what the host says the converter holds
    pub fn sync_reserve_balances<H: TokenHost>(&mut self, host: &mut H) -> Result<()> {
        self.ensure_not_retired()?;
        self.atomically(host, "sync_reserve_balances", |conv, host| {
            let assets = conv.reserves.assets().to_vec();
            for asset in assets {
                let held = host.balance_of(&asset, &conv.address)?;
                conv.reserves.set_balance(&asset, held)?;
                debug!("reserve {} synced to {}", asset, held);
            }
            Ok(())
        })
    }

    /// Reorder a caller-supplied bundle into registration order
    fn order_amounts(&self, amounts: &[ReserveAmount]) -> Result<Vec<ReserveAmount>> {
        if amounts.len() != self.reserves.len() {
            return Err(ConverterError::InvalidArgument("one amount per reserve"));
        }
        let mut ordered = Vec::with_capacity(amounts.len());
        for asset in self.reserves.assets() {
            let mut matching = amounts.iter().filter(|a| a.reserve == *asset);
            let offer = match (matching.next(), matching.next()) {
                (Some(offer), None) => *offer,
                _ => return Err(ConverterError::InvalidArgument("one amount per reserve")),
            };
            if offer.amount == 0 {
                return Err(ConverterError::InvalidArgument("amount must be positive"));
            }
            ordered.push(offer);
        }
        Ok(ordered)
    }

    fn deposit<H: TokenHost>(
        &mut self,
        host: &mut H,
        provider: &Address,
        supply: u128,
        minted: u128,
        deposits: Vec<ReserveAmount>,
    ) -> Result<LiquidityReceipt> {
        let new_supply = supply.checked_add(minted).ok_or(FormulaError::Overflow)?;

        for d in &deposits {
            self.reserves.credit(&d.reserve, d.amount)?;
        }

        let this = self.address;
        for d in &deposits {
            host.transfer_from(&d.reserve, &this, provider, &this, d.amount)?;
        }
        host.issue(&self.pool_token, &this, provider, minted)?;

        for d in &deposits {
            let new_balance = self.reserves.get(&d.reserve)?.balance;
            self.events.push(ConverterEvent::LiquidityAdded {
                provider: *provider,
                reserve: d.reserve,
                amount: d.amount,
                new_balance,
                new_supply,
            });
        }
        info!("{} added liquidity to {}: {} pool tokens", provider, this, minted);
        Ok(LiquidityReceipt {
            pool_amount: minted,
            reserves: deposits,
        })
    }

    fn withdraw<H: TokenHost>(
        &mut self,
        host: &mut H,
        provider: &Address,
        amount: u128,
        min_returns: Option<&[u128]>,
    ) -> Result<LiquidityReceipt> {
        let supply = host.total_supply(&self.pool_token)?;
        let payouts = self.liquidate_returns(supply, amount)?;
        if let Some(minimums) = min_returns {
            for (payout, &minimum) in payouts.iter().zip(minimums) {
                if payout.amount < minimum {
                    return Err(ConverterError::SlippageExceeded {
                        minimum,
                        actual: payout.amount,
                    });
                }
            }
        }

        for p in &payouts {
            self.reserves.debit(&p.reserve, p.amount)?;
        }

        let this = self.address;
        host.destroy(&self.pool_token, &this, provider, amount)?;
        for p in &payouts {
            host.transfer(&p.reserve, &this, provider, p.amount)?;
        }

        let new_supply = supply - amount;
        for p in &payouts {
            let new_balance = self.reserves.get(&p.reserve)?.balance;
            self.events.push(ConverterEvent::LiquidityRemoved {
                provider: *provider,
                reserve: p.reserve,
                amount: p.amount,
                new_balance,
                new_supply,
            });
        }
        info!("{} removed liquidity from {}: {} pool tokens", provider, this, amount);
        Ok(LiquidityReceipt {
            pool_amount: amount,
            reserves: payouts,
        })
    }
}
