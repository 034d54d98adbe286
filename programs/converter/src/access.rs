//! Owner and manager roles with two-phase hand-over
//!
//! A role moves in two steps: the current holder proposes a successor, and
//! the successor accepts. Until acceptance the old holder keeps full rights.

use crate::{Address, ConverterError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Address,
    pending_owner: Option<Address>,
    manager: Option<Address>,
    pending_manager: Option<Address>,
}

impl AccessControl {
    pub fn new(owner: Address) -> Result<Self> {
        if owner.is_zero() {
            return Err(ConverterError::InvalidArgument("owner cannot be the zero address"));
        }
        Ok(Self {
            owner,
            pending_owner: None,
            manager: None,
            pending_manager: None,
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn manager(&self) -> Option<Address> {
        self.manager
    }

    pub fn pending_owner(&self) -> Option<Address> {
        self.pending_owner
    }

    pub fn pending_manager(&self) -> Option<Address> {
        self.pending_manager
    }

    pub fn is_owner(&self, caller: &Address) -> bool {
        self.owner == *caller
    }

    pub fn is_manager(&self, caller: &Address) -> bool {
        self.manager.as_ref() == Some(caller)
    }

    pub fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if !self.is_owner(caller) {
            return Err(ConverterError::PermissionDenied("caller is not the owner"));
        }
        Ok(())
    }

    pub fn ensure_owner_or_manager(&self, caller: &Address) -> Result<()> {
        if !self.is_owner(caller) && !self.is_manager(caller) {
            return Err(ConverterError::PermissionDenied(
                "caller is neither the owner nor the manager",
            ));
        }
        Ok(())
    }

    /// Propose a new owner (owner only)
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() || new_owner == self.owner {
            return Err(ConverterError::InvalidArgument("invalid new owner"));
        }
        self.pending_owner = Some(new_owner);
        Ok(())
    }

    /// Complete an ownership hand-over, returning the previous owner
    pub fn accept_ownership(&mut self, caller: &Address) -> Result<Address> {
        if self.pending_owner.as_ref() != Some(caller) {
            return Err(ConverterError::PermissionDenied("caller is not the pending owner"));
        }
        let previous = self.owner;
        self.owner = *caller;
        self.pending_owner = None;
        Ok(previous)
    }

    /// Propose a new manager (owner or current manager)
    pub fn transfer_management(&mut self, caller: &Address, new_manager: Address) -> Result<()> {
        self.ensure_owner_or_manager(caller)?;
        if new_manager.is_zero() || self.manager == Some(new_manager) {
            return Err(ConverterError::InvalidArgument("invalid new manager"));
        }
        self.pending_manager = Some(new_manager);
        Ok(())
    }

    /// Complete a management hand-over, returning the previous manager
    pub fn accept_management(&mut self, caller: &Address) -> Result<Option<Address>> {
        if self.pending_manager.as_ref() != Some(caller) {
            return Err(ConverterError::PermissionDenied("caller is not the pending manager"));
        }
        let previous = self.manager;
        self.manager = Some(*caller);
        self.pending_manager = None;
        Ok(previous)
    }

    /// Same roles, no open proposals
    pub(crate) fn settled(&self) -> Self {
        Self {
            owner: self.owner,
            pending_owner: None,
            manager: self.manager,
            pending_manager: None,
        }
    }
}
