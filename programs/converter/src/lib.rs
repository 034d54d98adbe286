//! Weighted-reserve pool converter
//!
//! A converter holds a set of reserve assets, each with a weight in ppm, and
//! prices them against a pool-share token with the bonding curve from the
//! `bonding_curve` crate. It supports:
//!
//! 1. Conversions: reserve → pool token, pool token → reserve, reserve → reserve
//! 2. Proportional liquidity: fund / liquidate, add / remove liquidity
//! 3. A one-way lifecycle: inactive → active → retired (via upgrade)
//!
//! Token bookkeeping lives behind the [`TokenHost`] trait. Every mutating
//! operation runs in a commit scope: the converter state and a host
//! checkpoint are captured first and both are restored if anything fails.

pub mod access;
pub mod address;
pub mod conversion;
pub mod converter;
pub mod error;
pub mod events;
pub mod host;
pub mod lifecycle;
pub mod liquidity;
pub mod memory;
pub mod reserve;

pub use access::AccessControl;
pub use address::{Address, AddressParseError};
pub use conversion::{Quote, Rate, SourceQuote};
pub use converter::{ConversionSettings, Converter};
pub use error::{ConverterError, Result, TokenError};
pub use events::ConverterEvent;
pub use host::{Checkpoint, TokenHost};
pub use lifecycle::Lifecycle;
pub use liquidity::{LiquidityReceipt, ReserveAmount};
pub use memory::{MemoryHost, TokenAccount};
pub use reserve::{EffectiveBalance, PricingMode, Reserve, ReserveLedger};

pub use bonding_curve::{FormulaError, MAX_WEIGHT, PPM_RESOLUTION};
