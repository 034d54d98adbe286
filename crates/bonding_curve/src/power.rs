//! Fixed-point power function
//!
//! `power(baseN, baseD, expN, expD)` approximates `(baseN / baseD)^(expN / expD)`
//! in three steps:
//!
//! 1. `base = baseN / baseD` as a fixed-point value with 127 fractional bits
//! 2. `ln(base)`: table-driven range reduction plus an atanh series when the
//!    base is below `e`, integer log2 plus 127 squaring steps otherwise
//! 3. `e^(ln(base) * expN / expD)`: table-driven reduction plus a 20-term
//!    series when the exponent is below 16; larger exponents are split into
//!    `n * ln(2) + r`, `e^r` is evaluated the same way and `2^n` moves the
//!    binary point (precision drops from 127 to `127 - n`)
//!
//! The result is returned as `result / 2^precision`. Every intermediate
//! product is checked, so the function either succeeds with a relative error
//! far below `2^-32` or reports why it cannot.

use crate::math::floor_log2;
use crate::FormulaError;
use primitive_types::U256;

/// Highest precision, also the fixed-point position of `FIXED_1`
pub const MAX_PRECISION: u8 = 127;

const fn word(low: u128) -> U256 {
    U256([low as u64, (low >> 64) as u64, 0, 0])
}

const fn wide(high: u128, low: u128) -> U256 {
    U256([low as u64, (low >> 64) as u64, high as u64, (high >> 64) as u64])
}

/// 1.0 with 127 fractional bits
pub const FIXED_1: U256 = word(1 << 127);

/// 2.0 with 127 fractional bits
pub const FIXED_2: U256 = wide(1, 0);

/// Exclusive upper bound of a power base numerator
pub const MAX_NUM: U256 = wide(2, 0);

// ln(2) = LN2_NUMERATOR / LN2_DENOMINATOR
const LN2_NUMERATOR: U256 = word(0x3f80fe03f80fe03f80fe03f80fe03f8);
const LN2_DENOMINATOR: U256 = word(0x5b9de1d10bf4103d647b0955897ba80);

/// `e * FIXED_1`, the exclusive bound for `optimal_log`
const OPT_LOG_MAX_VAL: U256 = wide(0x1, 0x5bf0a8b1457695355fb8ac404e7a79e3);

/// `16 * FIXED_1`, the exclusive bound for `optimal_exp`
const OPT_EXP_MAX_VAL: U256 = wide(0x8, 0);

/// `ln(2) * FIXED_1`, the reduction step of `general_exp`
const LN2_FIXED: U256 = word(0x58b90bfbe8e7bcd5e4f1d9cc01f97b57);

/// `20!`, the scale of `EXP_SERIES`
const EXP_SERIES_SCALE: u128 = 0x21c3677c82b40000;

/// Fractional part mask for `optimal_exp` (exponent modulo `2^-3`)
const EXP_FRACTION_MASK: U256 = word((1 << 124) - 1);

/// `(e^(2^-n) * FIXED_1, 2^-n * FIXED_1)` for n = 1..=8
const LOG_REDUCTIONS: [(U256, U256); 8] = [
    (word(0xd3094c70f034de4b96ff7d5b6f99fcd8), word(0x40000000000000000000000000000000)),
    (word(0xa45af1e1f40c333b3de1db4dd55f29a7), word(0x20000000000000000000000000000000)),
    (word(0x910b022db7ae67ce76b441c27035c6a1), word(0x10000000000000000000000000000000)),
    (word(0x88415abbe9a76bead8d00cf112e4d4a8), word(0x8000000000000000000000000000000)),
    (word(0x84102b00893f64c705e841d5d4064bd3), word(0x4000000000000000000000000000000)),
    (word(0x8204055aaef1c8bd5c3259f4822735a2), word(0x2000000000000000000000000000000)),
    (word(0x810100ab00222d861931c15e39b44e99), word(0x1000000000000000000000000000000)),
    (word(0x808040155aabbbe9451521693554f733), word(0x800000000000000000000000000000)),
];

/// Numerators and denominators of the atanh series `2 * (z + z^3/3 + ...)`
const LOG_SERIES: [(U256, U256); 8] = [
    (wide(0x1, 0x00000000000000000000000000000000), wide(0x1, 0x00000000000000000000000000000000)),
    (word(0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa), wide(0x2, 0x00000000000000000000000000000000)),
    (word(0x99999999999999999999999999999999), wide(0x3, 0x00000000000000000000000000000000)),
    (word(0x92492492492492492492492492492492), wide(0x4, 0x00000000000000000000000000000000)),
    (word(0x8e38e38e38e38e38e38e38e38e38e38e), wide(0x5, 0x00000000000000000000000000000000)),
    (word(0x8ba2e8ba2e8ba2e8ba2e8ba2e8ba2e8b), wide(0x6, 0x00000000000000000000000000000000)),
    (word(0x89d89d89d89d89d89d89d89d89d89d89), wide(0x7, 0x00000000000000000000000000000000)),
    (word(0x88888888888888888888888888888888), wide(0x8, 0x00000000000000000000000000000000)),
];

/// Maclaurin coefficients of `e^y` scaled by `20!`, for terms 2..=20
const EXP_SERIES: [u128; 19] = [
    0x10e1b3be415a0000,
    0x05a0913f6b1e0000,
    0x0168244fdac78000,
    0x004807432bc18000,
    0x000c0135dca04000,
    0x0001b707b1cdc000,
    0x000036e0f639b800,
    0x00000618fee9f800,
    0x0000009c197dcc00,
    0x0000000e30dce400,
    0x000000012ebd1300,
    0x0000000017499f00,
    0x0000000001a9d480,
    0x00000000001c6380,
    0x000000000001c638,
    0x0000000000001ab8,
    0x000000000000017c,
    0x0000000000000014,
    0x0000000000000001,
];

/// `(bit, e^bit numerator, e^bit denominator)` for the integral part of the exponent
const EXP_REDUCTIONS: [(U256, U256, U256); 7] = [
    (word(0x10000000000000000000000000000000), wide(0x1, 0xc3d6a24ed82218787d624d3e5eba95f9), wide(0x1, 0x8ebef9eac820ae8682b9793ac6d1e776)),
    (word(0x20000000000000000000000000000000), wide(0x1, 0x8ebef9eac820ae8682b9793ac6d1e778), wide(0x1, 0x368b2fc6f9609fe7aceb46aa619baed4)),
    (word(0x40000000000000000000000000000000), wide(0x1, 0x368b2fc6f9609fe7aceb46aa619baed5), word(0xbc5ab1b16779be3575bd8f0520a9f21f)),
    (word(0x80000000000000000000000000000000), word(0xbc5ab1b16779be3575bd8f0520a9f21e), word(0x454aaa8efe072e7f6ddbab84b40a55c9)),
    (wide(0x1, 0x00000000000000000000000000000000), word(0x454aaa8efe072e7f6ddbab84b40a55c5), word(0x960aadc109e7a3bf4578099615711ea)),
    (wide(0x2, 0x00000000000000000000000000000000), word(0x960aadc109e7a3bf4578099615711d7), word(0x2bf84208204f5977f9a8cf01fdce3d)),
    (wide(0x4, 0x00000000000000000000000000000000), word(0x2bf84208204f5977f9a8cf01fdc307), word(0x3c6ab775dd0b95b4cbee7e65d11)),
];

/// `result / 2^precision`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Power {
    /// Numerator of the approximation
    pub result: U256,

    /// Number of fractional bits in `result`
    pub precision: u8,
}

impl Power {
    /// `2^precision`
    pub fn denominator(&self) -> U256 {
        U256::one() << self.precision as usize
    }
}

#[inline]
fn mul(a: U256, b: U256) -> Result<U256, FormulaError> {
    a.checked_mul(b).ok_or(FormulaError::Overflow)
}

#[inline]
fn add(a: U256, b: U256) -> Result<U256, FormulaError> {
    a.checked_add(b).ok_or(FormulaError::Overflow)
}

/// Approximate `(base_n / base_d)^(exp_n / exp_d)`
///
/// # Arguments
/// * `base_n`, `base_d` - Base ratio, must satisfy `base_d <= base_n < 2^129`
/// * `exp_n`, `exp_d` - Exponent ratio (weights in ppm in practice)
///
/// # Returns
/// * `Power` such that `result / 2^precision` approximates the power
/// * `FormulaError` if an argument is out of range or the result does not fit
pub fn power(base_n: U256, base_d: U256, exp_n: u32, exp_d: u32) -> Result<Power, FormulaError> {
    if base_d.is_zero() || exp_d == 0 {
        return Err(FormulaError::DivisionByZero);
    }
    if base_n >= MAX_NUM {
        return Err(FormulaError::InputTooLarge);
    }
    if base_n < base_d {
        return Err(FormulaError::BaseBelowOne);
    }

    // base_n < 2^129, so the scaled base fits in 256 bits
    let base = mul(base_n, FIXED_1)? / base_d;
    let base_log = if base < OPT_LOG_MAX_VAL {
        optimal_log(base)?
    } else {
        general_log(base)?
    };
    let exponent = mul(base_log, U256::from(exp_n))? / U256::from(exp_d);

    if exponent < OPT_EXP_MAX_VAL {
        Ok(Power {
            result: optimal_exp(exponent)?,
            precision: MAX_PRECISION,
        })
    } else {
        general_exp(exponent)
    }
}

/// `ln(x)` for `x >= FIXED_1`, valid for any input
fn general_log(x: U256) -> Result<U256, FormulaError> {
    let mut x = x;
    let mut res = U256::zero();

    // Integral part: x = 2^count * y with 1 <= y < 2
    if x >= FIXED_2 {
        let count = floor_log2(x / FIXED_1).unwrap_or(0);
        x = x >> count as usize;
        res = mul(U256::from(count), FIXED_1)?;
    }

    // Fractional part, one bit per squaring
    if x > FIXED_1 {
        for i in (1..=MAX_PRECISION as usize).rev() {
            x = mul(x, x)? / FIXED_1;
            if x >= FIXED_2 {
                x = x >> 1;
                res = add(res, U256::one() << (i - 1))?;
            }
        }
    }

    Ok(mul(res, LN2_NUMERATOR)? / LN2_DENOMINATOR)
}

/// `ln(x)` for `FIXED_1 <= x < e * FIXED_1`
fn optimal_log(x: U256) -> Result<U256, FormulaError> {
    let mut x = x;
    let mut res = U256::zero();

    for (threshold, term) in LOG_REDUCTIONS {
        if x >= threshold {
            res = add(res, term)?;
            x = mul(x, FIXED_1)? / threshold;
        }
    }

    // x is now within e^(1/256) of one
    let y = x - FIXED_1;
    let w = mul(y, y)? / FIXED_1;
    let mut z = y;
    for (i, (numerator, denominator)) in LOG_SERIES.into_iter().enumerate() {
        res = add(res, mul(z, numerator - y)? / denominator)?;
        if i + 1 < LOG_SERIES.len() {
            z = mul(z, w)? / FIXED_1;
        }
    }

    Ok(res)
}

/// `e^x` for `x < 16 * FIXED_1`, at full precision
fn optimal_exp(x: U256) -> Result<U256, FormulaError> {
    let y = x & EXP_FRACTION_MASK;
    let mut z = y;
    let mut res = U256::zero();

    for coefficient in EXP_SERIES {
        z = mul(z, y)? / FIXED_1;
        res = add(res, mul(z, U256::from(coefficient))?)?;
    }
    res = add(add(res / U256::from(EXP_SERIES_SCALE), y)?, FIXED_1)?;

    for (bit, numerator, denominator) in EXP_REDUCTIONS {
        if !(x & bit).is_zero() {
            res = mul(res, numerator)? / denominator;
        }
    }

    Ok(res)
}

/// `e^x` for `x >= 16 * FIXED_1`, as `e^r * 2^n` with `x = n * ln(2) + r`
fn general_exp(x: U256) -> Result<Power, FormulaError> {
    let n = x / LN2_FIXED;
    if n > U256::from(MAX_PRECISION) {
        return Err(FormulaError::ExponentOutOfRange);
    }
    let n = n.low_u32() as u8;
    let remainder = x - mul(LN2_FIXED, U256::from(n))?;

    Ok(Power {
        result: optimal_exp(remainder)?,
        precision: MAX_PRECISION - n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Relative error of `p` against `numerator / denominator`, times 2^32, is below one
    fn assert_close(p: Power, numerator: u128, denominator: u128) {
        let expected = U256::from(numerator) * p.denominator();
        let actual = p.result * U256::from(denominator);
        let diff = if expected > actual { expected - actual } else { actual - expected };
        assert!(
            diff << 32usize < expected,
            "relative error too large: {:?} vs {}/{}",
            p,
            numerator,
            denominator
        );
    }

    #[test]
    fn test_power_square_root() {
        let p = power(U256::from(2), U256::from(1), 1, 2).unwrap();
        assert_eq!(p.precision, 127);
        assert_eq!(
            p.result,
            U256::from(240615969168004511545033772477625056923u128)
        );

        let p = power(U256::from(4), U256::from(1), 1, 2).unwrap();
        assert_close(p, 2, 1);
    }

    #[test]
    fn test_power_unit_base() {
        let p = power(U256::from(5), U256::from(5), 7, 3).unwrap();
        assert_eq!(p.result, FIXED_1);
        assert_eq!(p.precision, MAX_PRECISION);
    }

    #[test]
    fn test_power_large_exponent() {
        // ln(1000) * 5 is above 16, so the binary point moves
        let p = power(U256::from(1000), U256::from(1), 5, 1).unwrap();
        assert_eq!(p.precision, 78);
        assert_close(p, 1_000_000_000_000_000, 1);

        let p = power(U256::from(10u128.pow(20)), U256::from(1), 1, 1).unwrap();
        assert_eq!(p.precision, 61);
        assert_close(p, 10u128.pow(20), 1);

        let p = power(U256::from(1000), U256::from(1), 1_000_000, 100_000).unwrap();
        assert_eq!(p.precision, 28);
        assert_close(p, 10u128.pow(30), 1);
    }

    #[test]
    fn test_power_fractional_exponent() {
        // (3/2)^(10/3)
        let p = power(U256::from(3), U256::from(2), 1_000_000, 300_000).unwrap();
        assert_eq!(
            p.result,
            U256::from_dec_str("657325246338264979354431368822852870085").unwrap()
        );
    }

    #[test]
    fn test_power_general_log_path() {
        // Bases above e take the log2 reduction
        let p = power(U256::from(1u128 << 100), U256::from(3u128 << 90), 1, 2).unwrap();
        // sqrt(1024 / 3) = 18.4752...
        assert_close(p, 1_847_520_861_407, 100_000_000_000);
    }

    #[test]
    fn test_power_errors() {
        let one = U256::one();
        assert_eq!(
            power(one, U256::zero(), 1, 1),
            Err(FormulaError::DivisionByZero)
        );
        assert_eq!(power(one, one, 1, 0), Err(FormulaError::DivisionByZero));
        assert_eq!(
            power(U256::from(1), U256::from(2), 1, 1),
            Err(FormulaError::BaseBelowOne)
        );
        assert_eq!(power(MAX_NUM, one, 1, 1), Err(FormulaError::InputTooLarge));
        assert_eq!(
            power(MAX_NUM - 1, one, 1, 1),
            Err(FormulaError::ExponentOutOfRange)
        );
        assert_eq!(
            power(U256::one() << 128usize, one, 1_000_000, 1),
            Err(FormulaError::ExponentOutOfRange)
        );
    }

    #[test]
    fn test_log_paths_agree_at_boundary() {
        // Just below and just above e, the two log implementations meet
        let below = optimal_log(OPT_LOG_MAX_VAL - 1).unwrap();
        let above = general_log(OPT_LOG_MAX_VAL).unwrap();
        let diff = if above > below { above - below } else { below - above };
        assert!(diff < U256::one() << 64usize);
    }

    #[test]
    fn test_exp_paths_agree_at_boundary() {
        let below = optimal_exp(OPT_EXP_MAX_VAL - 1).unwrap();
        let above = general_exp(OPT_EXP_MAX_VAL).unwrap();
        // Compare at the lower precision of the two
        let shift = (MAX_PRECISION - above.precision) as usize;
        let below = below >> shift;
        let diff = if above.result > below { above.result - below } else { below - above.result };
        assert!(diff << 32usize < below);
    }
}
