//! Conversion engine
//!
//! Resolves the two sides of a conversion, prices it with the bonding curve,
//! takes the fee and settles through the token host.

use crate::{Address, Converter, ConverterError, ConverterEvent, FormulaError, Result, TokenHost};
use bonding_curve::{cross_reserve_return, mul_div_ceil, purchase_return, sale_return, PPM_RESOLUTION};
use log::{debug, info};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Priced conversion before settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Curve return before the fee
    pub gross: u128,
    /// Fee withheld from `gross`, rounded up
    pub fee: u128,
}

impl Quote {
    /// Amount the trader receives
    pub fn net(&self) -> u128 {
        self.gross - self.fee
    }
}

/// Source amount that makes a conversion pay out a requested target amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceQuote {
    /// Source amount to convert
    pub amount: u128,
    /// Quote for `amount`, with `net()` at or above the requested target
    pub quote: Quote,
}

/// Marginal exchange rate `numerator / denominator` (target units per source unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub numerator: U256,
    pub denominator: U256,
}

impl Rate {
    /// Lossy decimal view, for display only
    pub fn approximate(&self) -> f64 {
        lossy_f64(self.numerator) / lossy_f64(self.denominator)
    }
}

/// Top 64 bits of `x` scaled back by the dropped bit count
fn lossy_f64(x: U256) -> f64 {
    let shift = x.bits().saturating_sub(64);
    (x >> shift).low_u64() as f64 * 2f64.powi(shift as i32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Reserve in, pool token out
    Purchase { reserve: Address },
    /// Pool token in, reserve out
    Sale { reserve: Address },
    /// Reserve in, reserve out
    Cross { source: Address, target: Address },
}

impl Converter {
    fn route(&self, from: &Address, to: &Address) -> Result<Route> {
        if from == to {
            return Err(ConverterError::InvalidArgument("source and target must differ"));
        }
        let route = if *to == self.pool_token {
            Route::Purchase { reserve: *from }
        } else if *from == self.pool_token {
            Route::Sale { reserve: *to }
        } else {
            Route::Cross {
                source: *from,
                target: *to,
            }
        };

        // Unknown reserves surface as "reserve not found"
        match route {
            Route::Purchase { reserve } | Route::Sale { reserve } => {
                self.reserves.get(&reserve)?;
            }
            Route::Cross { source, target } => {
                self.reserves.get(&source)?;
                self.reserves.get(&target)?;
            }
        }
        Ok(route)
    }

    fn ensure_purchasable(&self, reserve: &Address) -> Result<()> {
        if !self.reserves.get(reserve)?.purchases_enabled {
            return Err(ConverterError::StateConflict("purchases are disabled for the reserve"));
        }
        Ok(())
    }

    /// Price converting `amount` of `from` into `to`
    ///
    /// Either side may be the pool token or a reserve. The fee is taken once,
    /// from the target side, including on reserve-to-reserve conversions.
    pub fn get_return<H: TokenHost>(
        &self,
        host: &H,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<Quote> {
        self.ensure_active()?;
        if !self.settings.conversions_enabled {
            return Err(ConverterError::StateConflict("conversions are disabled"));
        }
        if amount == 0 {
            return Err(ConverterError::InvalidArgument("amount must be positive"));
        }

        let gross = match self.route(from, to)? {
            Route::Purchase { reserve } => {
                self.ensure_purchasable(&reserve)?;
                let supply = host.total_supply(&self.pool_token)?;
                let r = self.reserves.get(&reserve)?;
                purchase_return(supply, r.effective_balance().amount(), r.weight, amount)?
            }
            Route::Sale { reserve } => {
                let supply = host.total_supply(&self.pool_token)?;
                if amount > supply {
                    return Err(ConverterError::InvalidArgument("sale amount exceeds pool supply"));
                }
                let r = self.reserves.get(&reserve)?;
                sale_return(supply, r.effective_balance().amount(), r.weight, amount)?
            }
            Route::Cross { source, target } => {
                self.ensure_purchasable(&source)?;
                let s = self.reserves.get(&source)?;
                let t = self.reserves.get(&target)?;
                cross_reserve_return(
                    s.effective_balance().amount(),
                    s.weight,
                    t.effective_balance().amount(),
                    t.weight,
                    amount,
                )?
            }
        };

        let fee = mul_div_ceil(
            gross,
            u128::from(self.settings.conversion_fee),
            u128::from(PPM_RESOLUTION),
        )?;
        Ok(Quote { gross, fee })
    }

    /// Convert `amount` of `from` held by `trader` into `to`
    ///
    /// The converter must hold an allowance from `trader` for reserve inputs.
    /// Pool-token inputs are destroyed directly. Returns the net amount sent
    /// to `trader`.
    ///
    /// # Errors
    /// `SlippageExceeded` when the net return is below `min_return`; any
    /// other failure from pricing or the host. Nothing changes on error.
    pub fn convert<H: TokenHost>(
        &mut self,
        host: &mut H,
        trader: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
        min_return: u128,
    ) -> Result<u128> {
        if trader.is_zero() {
            return Err(ConverterError::InvalidArgument("trader cannot be the zero address"));
        }
        if min_return == 0 {
            return Err(ConverterError::InvalidArgument("minimum return must be positive"));
        }

        self.atomically(host, "convert", |conv, host| {
            let quote = conv.get_return(&*host, from, to, amount)?;
            let net = quote.net();
            debug!("convert {} {} -> {}: gross {}, fee {}", amount, from, to, quote.gross, quote.fee);
            if net < min_return {
                return Err(ConverterError::SlippageExceeded {
                    minimum: min_return,
                    actual: net,
                });
            }

            let this = conv.address;
            let pool = conv.pool_token;
            match conv.route(from, to)? {
                Route::Purchase { reserve } => {
                    conv.reserves.credit(&reserve, amount)?;
                    host.transfer_from(&reserve, &this, trader, &this, amount)?;
                    host.issue(&pool, &this, trader, net)?;
                }
                Route::Sale { reserve } => {
                    conv.reserves.debit(&reserve, net)?;
                    host.destroy(&pool, &this, trader, amount)?;
                    host.transfer(&reserve, &this, trader, net)?;
                }
                Route::Cross { source, target } => {
                    conv.reserves.credit(&source, amount)?;
                    conv.reserves.debit(&target, net)?;
                    host.transfer_from(&source, &this, trader, &this, amount)?;
                    host.transfer(&target, &this, trader, net)?;
                }
            }

            conv.events.push(ConverterEvent::Conversion {
                from: *from,
                to: *to,
                trader: *trader,
                amount,
                return_amount: net,
                fee: quote.fee,
            });
            info!("{} converted {} {} into {} {} (fee {})", trader, amount, from, net, to, quote.fee);
            Ok(net)
        })
    }

    /// Smallest source amount whose net return reaches `target_amount`
    ///
    /// Inverts `get_return` by search, so the answer agrees with the curve and
    /// fee rounding exactly. Fails with `StateConflict` when no source amount
    /// reaches the target.
    pub fn get_source_amount<H: TokenHost>(
        &self,
        host: &H,
        from: &Address,
        to: &Address,
        target_amount: u128,
    ) -> Result<SourceQuote> {
        if target_amount == 0 {
            return Err(ConverterError::InvalidArgument("target amount must be positive"));
        }
        // Lifecycle, routing and switch failures surface here
        self.get_return(host, from, to, 1)?;

        // Returns grow with the amount until the curve rejects it, so search for
        // the first amount that is not short of the target
        let short = |amount: u128| {
            matches!(
                self.get_return(host, from, to, amount),
                Ok(quote) if quote.net() < target_amount
            )
        };

        let mut low = 0u128;
        let mut high = 1u128;
        while short(high) {
            low = high;
            high = high
                .checked_mul(2)
                .ok_or(ConverterError::StateConflict("target amount is unreachable"))?;
        }
        while high - low > 1 {
            let mid = low + (high - low) / 2;
            if short(mid) {
                low = mid;
            } else {
                high = mid;
            }
        }

        let quote = match self.get_return(host, from, to, high) {
            Ok(quote) if quote.net() >= target_amount => quote,
            _ => return Err(ConverterError::StateConflict("target amount is unreachable")),
        };
        debug!("{} {} needed for {} {}", high, from, target_amount, to);
        Ok(SourceQuote {
            amount: high,
            quote,
        })
    }

    /// Marginal rate of `to` per unit of `from`, before fees
    pub fn rate<H: TokenHost>(&self, host: &H, from: &Address, to: &Address) -> Result<Rate> {
        let ppm = U256::from(PPM_RESOLUTION);
        let (numerator, denominator) = match self.route(from, to)? {
            Route::Purchase { reserve } => {
                let r = self.reserves.get(&reserve)?;
                let supply = U256::from(host.total_supply(&self.pool_token)?);
                (
                    supply * U256::from(r.weight),
                    U256::from(r.effective_balance().amount()) * ppm,
                )
            }
            Route::Sale { reserve } => {
                let r = self.reserves.get(&reserve)?;
                let supply = U256::from(host.total_supply(&self.pool_token)?);
                (
                    U256::from(r.effective_balance().amount()) * ppm,
                    supply * U256::from(r.weight),
                )
            }
            Route::Cross { source, target } => {
                let s = self.reserves.get(&source)?;
                let t = self.reserves.get(&target)?;
                (
                    U256::from(t.effective_balance().amount()) * U256::from(s.weight),
                    U256::from(s.effective_balance().amount()) * U256::from(t.weight),
                )
            }
        };
        if denominator.is_zero() {
            return Err(FormulaError::DivisionByZero.into());
        }
        Ok(Rate {
            numerator,
            denominator,
        })
    }
}
