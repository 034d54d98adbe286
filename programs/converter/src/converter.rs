//! Converter state, configuration and the commit scope

use crate::{
    AccessControl, Address, ConverterError, ConverterEvent, Lifecycle, PricingMode, Result,
    ReserveLedger, TokenHost,
};
use bonding_curve::PPM_RESOLUTION;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Fee and conversion switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Current fee in ppm
    pub conversion_fee: u32,

    /// Upper bound for `conversion_fee`, fixed at construction
    pub max_conversion_fee: u32,

    pub conversions_enabled: bool,
}

/// A weighted-reserve converter instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Converter {
    pub(crate) address: Address,
    pub(crate) pool_token: Address,
    pub(crate) access: AccessControl,
    pub(crate) settings: ConversionSettings,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) reserves: ReserveLedger,
    pub(crate) events: Vec<ConverterEvent>,
}

impl Converter {
    /// Construct an inactive converter with zero or one reserve
    ///
    /// # Arguments
    /// * `address` - Identity of the converter itself (holds reserve balances)
    /// * `pool_token` - Pool-share token the converter will issue and destroy
    /// * `owner` - Initial owner
    /// * `max_conversion_fee` - Fee ceiling in ppm, immutable afterwards
    /// * `initial_reserve` - Optional `(asset, weight)` registered up front
    pub fn new(
        address: Address,
        pool_token: Address,
        owner: Address,
        max_conversion_fee: u32,
        initial_reserve: Option<(Address, u32)>,
    ) -> Result<Self> {
        if address.is_zero() || pool_token.is_zero() {
            return Err(ConverterError::InvalidArgument("zero address"));
        }
        if address == pool_token {
            return Err(ConverterError::InvalidArgument(
                "converter and pool token must differ",
            ));
        }
        if max_conversion_fee > PPM_RESOLUTION {
            return Err(ConverterError::InvalidArgument("max conversion fee above 100%"));
        }

        let mut converter = Self {
            address,
            pool_token,
            access: AccessControl::new(owner)?,
            settings: ConversionSettings {
                conversion_fee: 0,
                max_conversion_fee,
                conversions_enabled: true,
            },
            lifecycle: Lifecycle::Inactive,
            reserves: ReserveLedger::new(),
            events: Vec::new(),
        };

        if let Some((asset, weight)) = initial_reserve {
            converter.register_reserve(asset, weight)?;
        }
        Ok(converter)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn pool_token(&self) -> Address {
        self.pool_token
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    pub fn conversion_fee(&self) -> u32 {
        self.settings.conversion_fee
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn reserves(&self) -> &ReserveLedger {
        &self.reserves
    }

    pub fn events(&self) -> &[ConverterEvent] {
        &self.events
    }

    /// Hand the accumulated events to the caller and clear the log
    pub fn drain_events(&mut self) -> Vec<ConverterEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Guards
    // ========================================================================

    pub(crate) fn ensure_inactive(&self) -> Result<()> {
        if self.lifecycle != Lifecycle::Inactive {
            return Err(ConverterError::StateConflict("converter is not inactive"));
        }
        Ok(())
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.lifecycle != Lifecycle::Active {
            return Err(ConverterError::StateConflict("converter is not active"));
        }
        Ok(())
    }

    pub(crate) fn ensure_not_retired(&self) -> Result<()> {
        if let Lifecycle::Retired { .. } = self.lifecycle {
            return Err(ConverterError::StateConflict("converter is retired"));
        }
        Ok(())
    }

    /// Run `op` so that any error restores both the converter and the host
    pub(crate) fn atomically<H, T, F>(&mut self, host: &mut H, name: &str, op: F) -> Result<T>
    where
        H: TokenHost,
        F: FnOnce(&mut Self, &mut H) -> Result<T>,
    {
        let saved = self.clone();
        let checkpoint = host.checkpoint();
        match op(self, host) {
            Ok(value) => {
                host.release(checkpoint);
                Ok(value)
            }
            Err(err) => {
                host.rollback(checkpoint);
                *self = saved;
                warn!("{} on {} reverted: {}", name, self.address, err);
                Err(err)
            }
        }
    }

    // ========================================================================
    // Reserve configuration
    // ========================================================================

    fn register_reserve(&mut self, asset: Address, weight: u32) -> Result<()> {
        if asset.is_zero() {
            return Err(ConverterError::InvalidArgument("reserve cannot be the zero address"));
        }
        if asset == self.pool_token {
            return Err(ConverterError::InvalidArgument("reserve cannot be the pool token"));
        }
        if asset == self.address {
            return Err(ConverterError::InvalidArgument("reserve cannot be the converter"));
        }
        self.reserves.add(asset, weight)?;
        self.events.push(ConverterEvent::ReserveAdded {
            reserve: asset,
            weight,
        });
        info!("reserve {} added to {} with weight {}", asset, self.address, weight);
        Ok(())
    }

    /// Register a reserve (owner only, inactive only)
    pub fn add_reserve(&mut self, caller: &Address, asset: Address, weight: u32) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.ensure_inactive()?;
        self.register_reserve(asset, weight)
    }

    /// Reconfigure a reserve's weight and pricing mode (owner only, inactive only)
    pub fn update_reserve(
        &mut self,
        caller: &Address,
        asset: &Address,
        weight: u32,
        pricing: PricingMode,
    ) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.ensure_inactive()?;
        self.reserves.update(asset, weight, pricing)?;
        self.events.push(ConverterEvent::ReserveUpdated {
            reserve: *asset,
            weight,
            pricing,
        });
        info!("reserve {} updated: weight {}, pricing {:?}", asset, weight, pricing);
        Ok(())
    }

    /// Stop (or resume) deposits against a reserve (owner only)
    pub fn disable_reserve_purchases(
        &mut self,
        caller: &Address,
        asset: &Address,
        disabled: bool,
    ) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.ensure_not_retired()?;
        self.reserves.set_purchases_enabled(asset, !disabled)?;
        self.events.push(ConverterEvent::PurchasesToggled {
            reserve: *asset,
            enabled: !disabled,
        });
        Ok(())
    }

    // ========================================================================
    // Fee and switches
    // ========================================================================

    /// Set the conversion fee in ppm (owner or manager)
    pub fn set_conversion_fee(&mut self, caller: &Address, fee: u32) -> Result<()> {
        self.access.ensure_owner_or_manager(caller)?;
        self.ensure_not_retired()?;
        if fee > self.settings.max_conversion_fee {
            return Err(ConverterError::InvalidArgument("conversion fee above maximum"));
        }
        let previous = self.settings.conversion_fee;
        self.settings.conversion_fee = fee;
        self.events.push(ConverterEvent::ConversionFeeUpdate {
            previous,
            current: fee,
        });
        info!("conversion fee on {}: {} -> {} ppm", self.address, previous, fee);
        Ok(())
    }

    /// Toggle conversions (owner or manager)
    pub fn enable_conversions(&mut self, caller: &Address, enabled: bool) -> Result<()> {
        self.access.ensure_owner_or_manager(caller)?;
        self.ensure_not_retired()?;
        if self.settings.conversions_enabled != enabled {
            self.settings.conversions_enabled = enabled;
            self.events.push(ConverterEvent::ConversionsToggled { enabled });
        }
        Ok(())
    }

    // ========================================================================
    // Roles
    // ========================================================================

    // Roles freeze once the converter is retired

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.ensure_not_retired()?;
        self.access.transfer_ownership(caller, new_owner)
    }

    pub fn accept_ownership(&mut self, caller: &Address) -> Result<()> {
        self.ensure_not_retired()?;
        let previous = self.access.accept_ownership(caller)?;
        self.events.push(ConverterEvent::OwnerUpdate {
            previous,
            current: *caller,
        });
        Ok(())
    }

    pub fn transfer_management(&mut self, caller: &Address, new_manager: Address) -> Result<()> {
        self.ensure_not_retired()?;
        self.access.transfer_management(caller, new_manager)
    }

    pub fn accept_management(&mut self, caller: &Address) -> Result<()> {
        self.ensure_not_retired()?;
        let previous = self.access.accept_management(caller)?;
        self.events.push(ConverterEvent::ManagerUpdate {
            previous,
            current: *caller,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_WEIGHT;

    const CONVERTER: Address = Address::repeat_byte(0xc0);
    const POOL: Address = Address::repeat_byte(0x90);
    const OWNER: Address = Address::repeat_byte(1);
    const MANAGER: Address = Address::repeat_byte(2);
    const STRANGER: Address = Address::repeat_byte(3);
    const ETH: Address = Address::repeat_byte(0xe1);
    const DAI: Address = Address::repeat_byte(0xda);

    fn converter() -> Converter {
        Converter::new(CONVERTER, POOL, OWNER, 30_000, Some((ETH, 500_000))).unwrap()
    }

    #[test]
    fn test_new_validates_arguments() {
        assert!(Converter::new(Address::ZERO, POOL, OWNER, 0, None).is_err());
        assert!(Converter::new(CONVERTER, CONVERTER, OWNER, 0, None).is_err());
        assert!(Converter::new(CONVERTER, POOL, OWNER, PPM_RESOLUTION + 1, None).is_err());
        assert!(Converter::new(CONVERTER, POOL, OWNER, 0, Some((POOL, 1))).is_err());

        let conv = converter();
        assert_eq!(conv.lifecycle(), Lifecycle::Inactive);
        assert_eq!(conv.reserves().assets(), &[ETH]);
        assert_eq!(
            conv.events(),
            &[ConverterEvent::ReserveAdded { reserve: ETH, weight: 500_000 }]
        );
    }

    #[test]
    fn test_add_reserve_identity_checks() {
        let mut conv = converter();
        for bad in [Address::ZERO, POOL, CONVERTER] {
            assert!(matches!(
                conv.add_reserve(&OWNER, bad, 1),
                Err(ConverterError::InvalidArgument(_))
            ));
        }
        assert!(matches!(
            conv.add_reserve(&STRANGER, DAI, 1),
            Err(ConverterError::PermissionDenied(_))
        ));
        assert!(matches!(
            conv.add_reserve(&OWNER, DAI, MAX_WEIGHT),
            Err(ConverterError::StateConflict(_))
        ));
        conv.add_reserve(&OWNER, DAI, 500_000).unwrap();
        assert!(conv.reserves().is_fully_weighted());
    }

    #[test]
    fn test_reserves_frozen_after_activation() {
        let mut conv = converter();
        conv.lifecycle = Lifecycle::Active;
        assert!(matches!(
            conv.add_reserve(&OWNER, DAI, 1),
            Err(ConverterError::StateConflict(_))
        ));
        assert!(matches!(
            conv.update_reserve(&OWNER, &ETH, 1, PricingMode::Real),
            Err(ConverterError::StateConflict(_))
        ));
        // Purchases can still be toggled
        conv.disable_reserve_purchases(&OWNER, &ETH, true).unwrap();
        assert!(!conv.reserves().get(&ETH).unwrap().purchases_enabled);
    }

    #[test]
    fn test_set_conversion_fee() {
        let mut conv = converter();
        conv.drain_events();

        assert!(matches!(
            conv.set_conversion_fee(&OWNER, 30_001),
            Err(ConverterError::InvalidArgument(_))
        ));
        assert!(conv.events().is_empty());

        assert!(matches!(
            conv.set_conversion_fee(&MANAGER, 1000),
            Err(ConverterError::PermissionDenied(_))
        ));

        conv.transfer_management(&OWNER, MANAGER).unwrap();
        conv.accept_management(&MANAGER).unwrap();
        conv.set_conversion_fee(&MANAGER, 1000).unwrap();
        assert_eq!(conv.conversion_fee(), 1000);
        assert_eq!(
            conv.events().last(),
            Some(&ConverterEvent::ConversionFeeUpdate { previous: 0, current: 1000 })
        );
    }

    #[test]
    fn test_enable_conversions_emits_on_change() {
        let mut conv = converter();
        conv.drain_events();
        conv.enable_conversions(&OWNER, true).unwrap();
        assert!(conv.events().is_empty());
        conv.enable_conversions(&OWNER, false).unwrap();
        assert!(!conv.settings().conversions_enabled);
        assert_eq!(conv.drain_events(), vec![ConverterEvent::ConversionsToggled { enabled: false }]);
    }

    #[test]
    fn test_ownership_hand_over_emits_event() {
        let mut conv = converter();
        conv.drain_events();
        conv.transfer_ownership(&OWNER, STRANGER).unwrap();
        conv.accept_ownership(&STRANGER).unwrap();
        assert_eq!(conv.owner(), STRANGER);
        assert_eq!(
            conv.drain_events(),
            vec![ConverterEvent::OwnerUpdate { previous: OWNER, current: STRANGER }]
        );
    }
}
