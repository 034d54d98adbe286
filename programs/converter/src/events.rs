//! Converter event log

use crate::{Address, PricingMode};
use serde::{Deserialize, Serialize};

/// Record emitted by a successful state change
///
/// Events are appended inside the commit scope, so a reverted call never
/// leaves a record behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConverterEvent {
    ReserveAdded {
        reserve: Address,
        weight: u32,
    },
    ReserveUpdated {
        reserve: Address,
        weight: u32,
        pricing: PricingMode,
    },
    PurchasesToggled {
        reserve: Address,
        enabled: bool,
    },
    ConversionFeeUpdate {
        previous: u32,
        current: u32,
    },
    ConversionsToggled {
        enabled: bool,
    },
    Activation {
        pool_token: Address,
        activated: bool,
    },
    Conversion {
        from: Address,
        to: Address,
        trader: Address,
        amount: u128,
        return_amount: u128,
        fee: u128,
    },
    LiquidityAdded {
        provider: Address,
        reserve: Address,
        amount: u128,
        new_balance: u128,
        new_supply: u128,
    },
    LiquidityRemoved {
        provider: Address,
        reserve: Address,
        amount: u128,
        new_balance: u128,
        new_supply: u128,
    },
    OwnerUpdate {
        previous: Address,
        current: Address,
    },
    ManagerUpdate {
        previous: Option<Address>,
        current: Address,
    },
    Upgraded {
        successor: Address,
    },
}
