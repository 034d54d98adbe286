//! Bonding Curve - Weighted reserve pricing in pure fixed-point integer math
//!
//! This crate holds everything a converter needs to price a conversion
//! without touching any state:
//!
//! - [`math`]: 256-bit multiply/divide, integer roots and logs
//! - [`power`]: `(a/b)^(c/d)` with 127 fractional bits of precision
//! - [`formula`]: purchase, sale, cross-reserve and proportional liquidity returns
//!
//! All weights are expressed in parts per million (ppm) and all amounts as
//! `u128`. Every failure is reported as a [`FormulaError`], never clamped.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod formula;
pub mod math;
pub mod power;

pub use formula::{
    cross_reserve_return, fund_cost, liquidate_return, purchase_return, sale_return,
};
pub use math::{ceil_sqrt, floor_log2, floor_sqrt, geometric_mean, mul_div, mul_div_ceil};
pub use power::{power, Power, MAX_PRECISION};

/// Weight and fee scale (1,000,000 ppm = 100%)
pub const PPM_RESOLUTION: u32 = 1_000_000;

/// Maximum reserve weight (100%)
pub const MAX_WEIGHT: u32 = PPM_RESOLUTION;

/// Error types for formula evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaError {
    /// Pool-token supply is zero
    InvalidSupply,
    /// Reserve balance is zero
    InvalidReserveBalance,
    /// Weight is zero or above `MAX_WEIGHT`
    InvalidWeight,
    /// Amount is zero or larger than the supply it is drawn from
    InvalidAmount,
    /// Denominator is zero
    DivisionByZero,
    /// Power base is below one (`baseN < baseD`)
    BaseBelowOne,
    /// Power base numerator is at or above `2^129`
    InputTooLarge,
    /// Exponent does not fit any supported precision
    ExponentOutOfRange,
    /// Arithmetic overflow
    Overflow,
}

impl core::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            FormulaError::InvalidSupply => "invalid supply",
            FormulaError::InvalidReserveBalance => "invalid reserve balance",
            FormulaError::InvalidWeight => "invalid reserve weight",
            FormulaError::InvalidAmount => "invalid amount",
            FormulaError::DivisionByZero => "division by zero",
            FormulaError::BaseBelowOne => "power base below one",
            FormulaError::InputTooLarge => "power input too large",
            FormulaError::ExponentOutOfRange => "exponent out of range",
            FormulaError::Overflow => "arithmetic overflow",
        };
        f.write_str(msg)
    }
}

#[cfg(any(test, feature = "std"))]
impl std::error::Error for FormulaError {}
