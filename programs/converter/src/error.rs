//! Error types

use crate::Address;
use bonding_curve::FormulaError;
use thiserror::Error;

/// Rejection reported by a token host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("unknown token {0}")]
    UnknownToken(Address),

    #[error("token {0} already exists")]
    TokenExists(Address),

    #[error("{owner} holds {available} of {token}, {required} required")]
    InsufficientBalance {
        token: Address,
        owner: Address,
        available: u128,
        required: u128,
    },

    #[error("{spender} may spend {available} of {owner}'s {token}, {required} required")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        available: u128,
        required: u128,
    },

    #[error("{caller} does not own token {token}")]
    NotOwner { token: Address, caller: Address },

    #[error("{caller} has no pending ownership of token {token}")]
    NoPendingOwnership { token: Address, caller: Address },

    #[error("supply of {0} would overflow")]
    SupplyOverflow(Address),

    #[error("token {0} rejected the transfer")]
    Rejected(Address),
}

/// Converter error taxonomy
///
/// Any error aborts the whole call; the converter and the token host are left
/// exactly as they were before it started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConverterError {
    /// Zero or invalid identity, zero amount, out-of-range weight or fee
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Caller lacks the owner or manager role
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),

    /// Operation not allowed in the current state
    #[error("state conflict: {0}")]
    StateConflict(&'static str),

    /// Computed return is below the caller's minimum
    #[error("slippage exceeded: return {actual} is below minimum {minimum}")]
    SlippageExceeded { minimum: u128, actual: u128 },

    /// Formula precision or overflow bound exceeded
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] FormulaError),

    /// Token host rejected a transfer, issue or destroy
    #[error("token operation failed: {0}")]
    Token(#[from] TokenError),
}

pub type Result<T> = core::result::Result<T, ConverterError>;
