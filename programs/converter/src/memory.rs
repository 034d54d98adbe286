//! In-memory token host
//!
//! Backs tests and the simulation CLI. Checkpoints are full snapshots of the
//! token table; tokens can be frozen to make every transfer fail.

use crate::{Address, Checkpoint, TokenError, TokenHost};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub symbol: String,
    pub total_supply: u128,
    pub balances: BTreeMap<Address, u128>,
    /// owner → spender → remaining allowance
    pub allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
    pub owner: Option<Address>,
    pub pending_owner: Option<Address>,
    /// Reject every movement of this token
    #[serde(default)]
    pub frozen: bool,
}

impl TokenAccount {
    fn balance(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn ensure_owner(&self, token: &Address, caller: &Address) -> Result<(), TokenError> {
        if self.owner.as_ref() != Some(caller) {
            return Err(TokenError::NotOwner {
                token: *token,
                caller: *caller,
            });
        }
        Ok(())
    }

    fn debit(&mut self, token: &Address, owner: &Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance(owner);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                token: *token,
                owner: *owner,
                available,
                required: amount,
            });
        }
        if available == amount {
            self.balances.remove(owner);
        } else {
            self.balances.insert(*owner, available - amount);
        }
        Ok(())
    }

    fn credit(&mut self, token: &Address, owner: &Address, amount: u128) -> Result<(), TokenError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self
            .balance(owner)
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow(*token))?;
        self.balances.insert(*owner, balance);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryHost {
    tokens: BTreeMap<Address, TokenAccount>,
    #[serde(skip)]
    checkpoints: Vec<BTreeMap<Address, TokenAccount>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token with zero supply
    pub fn create_token(
        &mut self,
        token: Address,
        symbol: &str,
        owner: Option<Address>,
    ) -> Result<(), TokenError> {
        if self.tokens.contains_key(&token) {
            return Err(TokenError::TokenExists(token));
        }
        self.tokens.insert(
            token,
            TokenAccount {
                symbol: symbol.to_string(),
                owner,
                ..TokenAccount::default()
            },
        );
        Ok(())
    }

    pub fn token(&self, token: &Address) -> Option<&TokenAccount> {
        self.tokens.get(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = (&Address, &TokenAccount)> {
        self.tokens.iter()
    }

    pub fn find_by_symbol(&self, symbol: &str) -> Option<Address> {
        self.tokens
            .iter()
            .find(|(_, account)| account.symbol.eq_ignore_ascii_case(symbol))
            .map(|(address, _)| *address)
    }

    fn account(&self, token: &Address) -> Result<&TokenAccount, TokenError> {
        self.tokens.get(token).ok_or(TokenError::UnknownToken(*token))
    }

    fn account_mut(&mut self, token: &Address) -> Result<&mut TokenAccount, TokenError> {
        self.tokens
            .get_mut(token)
            .ok_or(TokenError::UnknownToken(*token))
    }

    fn movable(&mut self, token: &Address) -> Result<&mut TokenAccount, TokenError> {
        let account = self.account_mut(token)?;
        if account.frozen {
            return Err(TokenError::Rejected(*token));
        }
        Ok(account)
    }

    /// Faucet: mint without an ownership check
    pub fn mint(&mut self, token: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        let account = self.account_mut(token)?;
        account.total_supply = account
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow(*token))?;
        account.credit(token, to, amount)
    }

    pub fn approve(
        &mut self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let account = self.account_mut(token)?;
        account
            .allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
        Ok(())
    }

    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> u128 {
        self.tokens
            .get(token)
            .map(|account| account.allowance(owner, spender))
            .unwrap_or(0)
    }

    pub fn set_frozen(&mut self, token: &Address, frozen: bool) -> Result<(), TokenError> {
        self.account_mut(token)?.frozen = frozen;
        Ok(())
    }
}

impl TokenHost for MemoryHost {
    fn balance_of(&self, token: &Address, owner: &Address) -> Result<u128, TokenError> {
        Ok(self.account(token)?.balance(owner))
    }

    fn total_supply(&self, token: &Address) -> Result<u128, TokenError> {
        Ok(self.account(token)?.total_supply)
    }

    fn transfer(
        &mut self,
        token: &Address,
        sender: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let account = self.movable(token)?;
        account.debit(token, sender, amount)?;
        account.credit(token, to, amount)
    }

    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let account = self.movable(token)?;
        let available = account.allowance(owner, spender);
        if available < amount {
            return Err(TokenError::InsufficientAllowance {
                token: *token,
                owner: *owner,
                spender: *spender,
                available,
                required: amount,
            });
        }
        account.debit(token, owner, amount)?;
        account.credit(token, to, amount)?;
        account
            .allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, available - amount);
        Ok(())
    }

    fn issue(
        &mut self,
        token: &Address,
        caller: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let account = self.movable(token)?;
        account.ensure_owner(token, caller)?;
        account.total_supply = account
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow(*token))?;
        account.credit(token, to, amount)
    }

    fn destroy(
        &mut self,
        token: &Address,
        caller: &Address,
        from: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let account = self.movable(token)?;
        account.ensure_owner(token, caller)?;
        account.debit(token, from, amount)?;
        // debit succeeded, so supply covers amount
        account.total_supply -= amount;
        Ok(())
    }

    fn token_owner(&self, token: &Address) -> Result<Option<Address>, TokenError> {
        Ok(self.account(token)?.owner)
    }

    fn transfer_token_ownership(
        &mut self,
        token: &Address,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<(), TokenError> {
        let account = self.account_mut(token)?;
        account.ensure_owner(token, caller)?;
        account.pending_owner = Some(*new_owner);
        Ok(())
    }

    fn accept_token_ownership(&mut self, token: &Address, caller: &Address) -> Result<(), TokenError> {
        let account = self.account_mut(token)?;
        if account.pending_owner.as_ref() != Some(caller) {
            return Err(TokenError::NoPendingOwnership {
                token: *token,
                caller: *caller,
            });
        }
        account.owner = Some(*caller);
        account.pending_owner = None;
        Ok(())
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.checkpoints.push(self.tokens.clone());
        Checkpoint(self.checkpoints.len() - 1)
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.truncate(checkpoint.0 + 1);
        if let Some(saved) = self.checkpoints.pop() {
            self.tokens = saved;
        }
    }

    fn release(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.truncate(checkpoint.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TKN: Address = Address::repeat_byte(0x70);
    const OWNER: Address = Address::repeat_byte(1);
    const ALICE: Address = Address::repeat_byte(2);
    const BOB: Address = Address::repeat_byte(3);

    fn host() -> MemoryHost {
        let mut host = MemoryHost::new();
        host.create_token(TKN, "TKN", Some(OWNER)).unwrap();
        host.mint(&TKN, &ALICE, 1000).unwrap();
        host
    }

    #[test]
    fn test_transfer_and_balance() {
        let mut host = host();
        host.transfer(&TKN, &ALICE, &BOB, 400).unwrap();
        assert_eq!(host.balance_of(&TKN, &ALICE), Ok(600));
        assert_eq!(host.balance_of(&TKN, &BOB), Ok(400));
        assert!(matches!(
            host.transfer(&TKN, &BOB, &ALICE, 401),
            Err(TokenError::InsufficientBalance { available: 400, .. })
        ));
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut host = host();
        host.approve(&TKN, &ALICE, &BOB, 300).unwrap();
        host.transfer_from(&TKN, &BOB, &ALICE, &BOB, 200).unwrap();
        assert_eq!(host.allowance(&TKN, &ALICE, &BOB), 100);
        assert!(matches!(
            host.transfer_from(&TKN, &BOB, &ALICE, &BOB, 101),
            Err(TokenError::InsufficientAllowance { .. })
        ));
    }

    #[test]
    fn test_issue_destroy_require_owner() {
        let mut host = host();
        assert!(host.issue(&TKN, &ALICE, &ALICE, 1).is_err());
        host.issue(&TKN, &OWNER, &BOB, 50).unwrap();
        assert_eq!(host.total_supply(&TKN), Ok(1050));
        host.destroy(&TKN, &OWNER, &ALICE, 1000).unwrap();
        assert_eq!(host.total_supply(&TKN), Ok(50));
        assert!(host.destroy(&TKN, &BOB, &BOB, 50).is_err());
    }

    #[test]
    fn test_ownership_two_phase() {
        let mut host = host();
        assert!(host.transfer_token_ownership(&TKN, &ALICE, &BOB).is_err());
        host.transfer_token_ownership(&TKN, &OWNER, &BOB).unwrap();
        assert_eq!(host.token_owner(&TKN), Ok(Some(OWNER)));
        assert!(host.accept_token_ownership(&TKN, &ALICE).is_err());
        host.accept_token_ownership(&TKN, &BOB).unwrap();
        assert_eq!(host.token_owner(&TKN), Ok(Some(BOB)));
    }

    #[test]
    fn test_checkpoint_rollback_and_release() {
        let mut host = host();
        let outer = host.checkpoint();
        host.transfer(&TKN, &ALICE, &BOB, 100).unwrap();

        let inner = host.checkpoint();
        host.transfer(&TKN, &ALICE, &BOB, 100).unwrap();
        host.rollback(inner);
        assert_eq!(host.balance_of(&TKN, &BOB), Ok(100));

        host.rollback(outer);
        assert_eq!(host.balance_of(&TKN, &BOB), Ok(0));
        assert_eq!(host.balance_of(&TKN, &ALICE), Ok(1000));

        let cp = host.checkpoint();
        host.transfer(&TKN, &ALICE, &BOB, 1).unwrap();
        host.release(cp);
        assert_eq!(host.balance_of(&TKN, &BOB), Ok(1));
    }

    #[test]
    fn test_frozen_token_rejects_movement() {
        let mut host = host();
        host.set_frozen(&TKN, true).unwrap();
        assert_eq!(
            host.transfer(&TKN, &ALICE, &BOB, 1),
            Err(TokenError::Rejected(TKN))
        );
        assert_eq!(host.balance_of(&TKN, &ALICE), Ok(1000));
    }

    #[test]
    fn test_symbol_lookup() {
        let host = host();
        assert_eq!(host.find_by_symbol("tkn"), Some(TKN));
        assert_eq!(host.find_by_symbol("XYZ"), None);
    }
}
