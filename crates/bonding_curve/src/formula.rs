//! Weighted bonding-curve returns
//!
//! A reserve with weight `w` (ppm) prices the pool token so that
//! `balance = supply^(1/w) * constant`. Every return here is rounded in the
//! pool's favour: what leaves the pool is floored, what the pool charges is
//! ceiled.

use crate::math::{mul_div, mul_div_ceil, mul_div_wide, narrow};
use crate::power::power;
use crate::{FormulaError, MAX_WEIGHT};
use primitive_types::{U256, U512};

#[inline]
fn validate_weight(weight: u32) -> Result<(), FormulaError> {
    if weight == 0 || weight > MAX_WEIGHT {
        return Err(FormulaError::InvalidWeight);
    }
    Ok(())
}

#[inline]
fn validate_pool(supply: u128, reserve_balance: u128) -> Result<(), FormulaError> {
    if supply == 0 {
        return Err(FormulaError::InvalidSupply);
    }
    if reserve_balance == 0 {
        return Err(FormulaError::InvalidReserveBalance);
    }
    Ok(())
}

/// `balance * (r - 2^p) / r`, i.e. `balance * (1 - 1 / (r / 2^p))`
fn scale_by_complement(balance: u128, result: U256, precision: u8) -> Result<u128, FormulaError> {
    let scaled = U256::from(balance).full_mul(result);
    let offset = U512::from(balance) << precision as usize;
    let numerator = scaled.checked_sub(offset).ok_or(FormulaError::Overflow)?;
    narrow(numerator / U512::from(result))
}

/// Pool tokens minted for depositing `amount` of a reserve
///
/// `supply * ((1 + amount / balance)^(weight / 1e6) - 1)`, rounded down.
/// A 100% weight reserve takes the exact linear path.
///
/// # Arguments
/// * `supply` - Pool-token supply
/// * `reserve_balance` - Reserve balance used for pricing
/// * `reserve_weight` - Reserve weight in ppm (1..=1,000,000)
/// * `amount` - Deposit amount
pub fn purchase_return(
    supply: u128,
    reserve_balance: u128,
    reserve_weight: u32,
    amount: u128,
) -> Result<u128, FormulaError> {
    validate_pool(supply, reserve_balance)?;
    validate_weight(reserve_weight)?;
    if amount == 0 {
        return Err(FormulaError::InvalidAmount);
    }

    if reserve_weight == MAX_WEIGHT {
        return mul_div(supply, amount, reserve_balance);
    }

    let base_n = U256::from(amount) + U256::from(reserve_balance);
    let p = power(base_n, U256::from(reserve_balance), reserve_weight, MAX_WEIGHT)?;

    // supply * r / 2^p - supply
    let minted = U256::from(supply).full_mul(p.result) >> p.precision as usize;
    let minted = minted
        .checked_sub(U512::from(supply))
        .ok_or(FormulaError::Overflow)?;
    narrow(minted)
}

/// Reserve tokens returned for selling `amount` pool tokens
///
/// `balance * (1 - (1 - amount / supply)^(1e6 / weight))`, rounded down.
/// Selling the whole supply returns the whole balance.
pub fn sale_return(
    supply: u128,
    reserve_balance: u128,
    reserve_weight: u32,
    amount: u128,
) -> Result<u128, FormulaError> {
    validate_pool(supply, reserve_balance)?;
    validate_weight(reserve_weight)?;
    if amount > supply {
        return Err(FormulaError::InvalidAmount);
    }

    if amount == 0 {
        return Ok(0);
    }
    if amount == supply {
        return Ok(reserve_balance);
    }
    if reserve_weight == MAX_WEIGHT {
        return mul_div(reserve_balance, amount, supply);
    }

    let p = power(
        U256::from(supply),
        U256::from(supply - amount),
        MAX_WEIGHT,
        reserve_weight,
    )?;
    scale_by_complement(reserve_balance, p.result, p.precision)
}

/// Target reserve tokens returned for depositing `amount` of the source reserve
///
/// Buying pool tokens with the source reserve and selling them for the
/// target reserve collapses to one power evaluation:
/// `target * (1 - (source / (source + amount))^(source_weight / target_weight))`.
pub fn cross_reserve_return(
    source_balance: u128,
    source_weight: u32,
    target_balance: u128,
    target_weight: u32,
    amount: u128,
) -> Result<u128, FormulaError> {
    if source_balance == 0 || target_balance == 0 {
        return Err(FormulaError::InvalidReserveBalance);
    }
    validate_weight(source_weight)?;
    validate_weight(target_weight)?;
    if amount == 0 {
        return Err(FormulaError::InvalidAmount);
    }

    let source = U256::from(source_balance);
    let deposit = U256::from(amount);

    if source_weight == target_weight {
        return mul_div_wide(U256::from(target_balance), deposit, source + deposit);
    }

    let p = power(source + deposit, source, source_weight, target_weight)?;
    scale_by_complement(target_balance, p.result, p.precision)
}

/// Reserve amount needed to mint `amount` pool tokens proportionally, rounded up
pub fn fund_cost(supply: u128, reserve_balance: u128, amount: u128) -> Result<u128, FormulaError> {
    validate_pool(supply, reserve_balance)?;
    mul_div_ceil(reserve_balance, amount, supply)
}

/// Reserve amount returned for burning `amount` pool tokens proportionally, rounded down
pub fn liquidate_return(
    supply: u128,
    reserve_balance: u128,
    amount: u128,
) -> Result<u128, FormulaError> {
    validate_pool(supply, reserve_balance)?;
    if amount > supply {
        return Err(FormulaError::InvalidAmount);
    }
    if amount == supply {
        return Ok(reserve_balance);
    }
    mul_div(reserve_balance, amount, supply)
}


#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// B1: Proportional deposits never cost less than proportional withdrawals return
    ///
    /// Property: fund_cost(s, b, a) >= liquidate_return(s, b, a)
    #[kani::proof]
    #[kani::unwind(3)]
    fn b1_fund_covers_liquidate() {
        let supply: u64 = kani::any();
        let balance: u64 = kani::any();
        let amount: u64 = kani::any();
        kani::assume(supply > 0 && balance > 0 && amount <= supply);

        let cost = fund_cost(supply as u128, balance as u128, amount as u128).unwrap();
        let ret = liquidate_return(supply as u128, balance as u128, amount as u128).unwrap();
        assert!(cost >= ret, "B1: fund cheaper than liquidation");
    }

    /// B2: Full-weight purchase is exactly proportional
    #[kani::proof]
    #[kani::unwind(3)]
    fn b2_full_weight_purchase_linear() {
        let supply: u32 = kani::any();
        let balance: u32 = kani::any();
        let amount: u32 = kani::any();
        kani::assume(supply > 0 && balance > 0 && amount > 0);

        let minted = purchase_return(supply as u128, balance as u128, MAX_WEIGHT, amount as u128).unwrap();
        assert!(minted * balance as u128 <= supply as u128 * amount as u128, "B2: overminted");
    }
}
