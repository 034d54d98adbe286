//! Token host interface
//!
//! The converter never stores token balances itself. Pool-token supply,
//! reserve holdings, allowances and token ownership all live in a host that
//! also provides checkpoints so a failed call can be rolled back as a whole.

use crate::{Address, TokenError};

/// Opaque rollback point handed out by [`TokenHost::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(pub usize);

/// Trait for pluggable token bookkeeping
///
/// Implementers provide ERC20-style balances plus owner-gated issue/destroy
/// for the pool token. Checkpoints nest: a rollback discards everything since
/// the matching `checkpoint` call, a release keeps it.
pub trait TokenHost {
    fn balance_of(&self, token: &Address, owner: &Address) -> Result<u128, TokenError>;

    fn total_supply(&self, token: &Address) -> Result<u128, TokenError>;

    /// Move `amount` from `sender` to `to`
    fn transfer(
        &mut self,
        token: &Address,
        sender: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    /// Move `amount` from `owner` to `to` using `spender`'s allowance
    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    /// Mint `amount` to `to`; `caller` must own the token
    fn issue(
        &mut self,
        token: &Address,
        caller: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    /// Burn `amount` from `from`; `caller` must own the token
    fn destroy(
        &mut self,
        token: &Address,
        caller: &Address,
        from: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    fn token_owner(&self, token: &Address) -> Result<Option<Address>, TokenError>;

    /// Propose `new_owner` for `token`; `caller` must own it
    fn transfer_token_ownership(
        &mut self,
        token: &Address,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<(), TokenError>;

    /// Complete a pending ownership proposal for `caller`
    fn accept_token_ownership(&mut self, token: &Address, caller: &Address) -> Result<(), TokenError>;

    fn checkpoint(&mut self) -> Checkpoint;

    fn rollback(&mut self, checkpoint: Checkpoint);

    fn release(&mut self, checkpoint: Checkpoint);
}
