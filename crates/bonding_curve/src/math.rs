//! Fixed-point arithmetic primitives
//!
//! Products of two `u128` values are carried in 256 bits (and products of
//! 256-bit values in 512 bits) so that `a * b / c` never overflows while the
//! final quotient fits the native width.

use crate::FormulaError;
use primitive_types::{U256, U512};

/// Narrow a 512-bit intermediate back to `u128`
#[inline]
pub(crate) fn narrow(value: U512) -> Result<u128, FormulaError> {
    if value.bits() > 128 {
        return Err(FormulaError::Overflow);
    }
    Ok(value.as_u128())
}

/// Narrow a 256-bit intermediate back to `u128`
#[inline]
pub(crate) fn narrow_256(value: U256) -> Result<u128, FormulaError> {
    if value.bits() > 128 {
        return Err(FormulaError::Overflow);
    }
    Ok(value.as_u128())
}

/// Calculate `floor(a * b / c)` with a 256-bit intermediate product
///
/// # Returns
/// * The quotient, rounded down
/// * `FormulaError::DivisionByZero` if `c == 0`
/// * `FormulaError::Overflow` if the quotient does not fit in `u128`
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128, FormulaError> {
    if c == 0 {
        return Err(FormulaError::DivisionByZero);
    }
    let product = U256::from(a) * U256::from(b);
    narrow_256(product / U256::from(c))
}

/// Calculate `ceil(a * b / c)` with a 256-bit intermediate product
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Result<u128, FormulaError> {
    if c == 0 {
        return Err(FormulaError::DivisionByZero);
    }
    let product = U256::from(a) * U256::from(b);
    let divisor = U256::from(c);
    let mut quotient = product / divisor;
    if !(product % divisor).is_zero() {
        quotient += U256::one();
    }
    narrow_256(quotient)
}

/// `floor(a * b / c)` over 256-bit operands, narrowed to `u128`
pub(crate) fn mul_div_wide(a: U256, b: U256, c: U256) -> Result<u128, FormulaError> {
    if c.is_zero() {
        return Err(FormulaError::DivisionByZero);
    }
    narrow(a.full_mul(b) / U512::from(c))
}

/// Integer square root, rounded down (Newton iteration)
pub fn floor_sqrt(n: U256) -> U256 {
    if n.is_zero() {
        return n;
    }
    let mut x = n / 2 + 1;
    let mut y = (x + n / x) / 2;
    while x > y {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Integer square root, rounded up
pub fn ceil_sqrt(n: U256) -> U256 {
    let x = floor_sqrt(n);
    if x * x == n {
        x
    } else {
        x + 1
    }
}

/// Position of the highest set bit, `None` for zero
#[inline]
pub fn floor_log2(n: U256) -> Option<u32> {
    if n.is_zero() {
        None
    } else {
        Some(n.bits() as u32 - 1)
    }
}

fn decimal_length(mut value: u128) -> u32 {
    let mut digits = 0;
    while value > 0 {
        digits += 1;
        value /= 10;
    }
    digits
}

/// `n / d` rounded half up
fn round_div(n: u32, d: u32) -> u32 {
    n / d + (n % d) / (d - d / 2)
}

/// Decimal-order geometric mean: `10^(round(average digit count) - 1)`
///
/// Used to size the initial supply of an empty pool. Only the order of
/// magnitude matters there, so digit counts stand in for logarithms.
///
/// # Returns
/// * `FormulaError::InvalidAmount` if `values` is empty or averages to zero digits
pub fn geometric_mean(values: &[u128]) -> Result<u128, FormulaError> {
    if values.is_empty() {
        return Err(FormulaError::InvalidAmount);
    }
    let digits: u32 = values.iter().map(|&v| decimal_length(v)).sum();
    let exponent = round_div(digits, values.len() as u32);
    if exponent == 0 {
        return Err(FormulaError::InvalidAmount);
    }
    10u128
        .checked_pow(exponent - 1)
        .ok_or(FormulaError::Overflow)
}


#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// F1: Ceil and floor division differ by at most one
    ///
    /// Property: mul_div(a, b, c) <= mul_div_ceil(a, b, c) <= mul_div(a, b, c) + 1
    #[kani::proof]
    #[kani::unwind(3)]
    fn f1_ceil_floor_adjacent() {
        let a: u64 = kani::any();
        let b: u64 = kani::any();
        let c: u64 = kani::any();
        kani::assume(c > 0);

        let floor = mul_div(a as u128, b as u128, c as u128).unwrap();
        let ceil = mul_div_ceil(a as u128, b as u128, c as u128).unwrap();

        assert!(floor <= ceil, "F1: ceil below floor");
        assert!(ceil - floor <= 1, "F1: ceil more than one above floor");
    }

    /// F2: Floor division never overstates the exact quotient
    ///
    /// Property: mul_div(a, b, c) * c <= a * b
    #[kani::proof]
    #[kani::unwind(3)]
    fn f2_floor_never_overstates() {
        let a: u32 = kani::any();
        let b: u32 = kani::any();
        let c: u32 = kani::any();
        kani::assume(c > 0);

        let q = mul_div(a as u128, b as u128, c as u128).unwrap();
        assert!(q * (c as u128) <= (a as u128) * (b as u128), "F2: floor overstated");
    }
}
