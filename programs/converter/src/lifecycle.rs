//! Activation and upgrade
//!
//! A converter starts inactive, becomes active once it owns its pool token
//! and is retired only by handing everything to a successor.

use crate::{Address, Converter, ConverterError, ConverterEvent, Result, TokenHost};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Reserves may be added and reconfigured; no conversions
    Inactive,
    /// Owns the pool token; reserves are frozen
    Active,
    /// Upgraded; all balances and the pool token moved to `successor`
    Retired { successor: Address },
}

impl Converter {
    /// Accept the pending pool-token ownership and activate (owner only)
    pub fn accept_token_ownership<H: TokenHost>(
        &mut self,
        host: &mut H,
        caller: &Address,
    ) -> Result<()> {
        self.access.ensure_owner(caller)?;
        self.ensure_inactive()?;
        if self.reserves.is_empty() {
            return Err(ConverterError::StateConflict("converter has no reserves"));
        }

        self.atomically(host, "accept_token_ownership", |conv, host| {
            host.accept_token_ownership(&conv.pool_token, &conv.address)?;
            conv.lifecycle = Lifecycle::Active;
            conv.events.push(ConverterEvent::Activation {
                pool_token: conv.pool_token,
                activated: true,
            });
            info!("converter {} activated for pool token {}", conv.address, conv.pool_token);
            Ok(())
        })
    }

    /// Migrate this converter into a fresh instance at `successor` (owner only)
    ///
    /// The successor receives every reserve with its weight, pricing mode and
    /// purchase flag, the fee settings, the roles, all reserve balances and the
    /// pool token. It comes back active; this instance is left retired with
    /// empty reserves.
    pub fn upgrade<H: TokenHost>(
        &mut self,
        host: &mut H,
        caller: &Address,
        successor: Address,
    ) -> Result<Converter> {
        self.access.ensure_owner(caller)?;
        self.ensure_active()?;
        if successor.is_zero()
            || successor == self.address
            || successor == self.pool_token
            || self.reserves.contains(&successor)
        {
            return Err(ConverterError::InvalidArgument("invalid successor address"));
        }

        self.atomically(host, "upgrade", |conv, host| {
            let mut next = Converter::new(
                successor,
                conv.pool_token,
                conv.access.owner(),
                conv.settings.max_conversion_fee,
                None,
            )?;
            next.settings = conv.settings;
            next.access = conv.access.settled();

            let assets = conv.reserves.assets().to_vec();
            for asset in &assets {
                let held = host.balance_of(asset, &conv.address)?;
                conv.reserves.set_balance(asset, held)?;
                next.reserves.replicate(*asset, conv.reserves.get(asset)?)?;
            }

            for asset in &assets {
                let held = conv.reserves.get(asset)?.balance;
                conv.reserves.debit(asset, held)?;
                host.transfer(asset, &conv.address, &successor, held)?;
            }

            host.transfer_token_ownership(&conv.pool_token, &conv.address, &successor)?;
            host.accept_token_ownership(&conv.pool_token, &successor)?;
            next.lifecycle = Lifecycle::Active;
            next.events.push(ConverterEvent::Activation {
                pool_token: conv.pool_token,
                activated: true,
            });

            conv.lifecycle = Lifecycle::Retired { successor };
            conv.events.push(ConverterEvent::Activation {
                pool_token: conv.pool_token,
                activated: false,
            });
            conv.events.push(ConverterEvent::Upgraded { successor });
            info!("converter {} upgraded to {}", conv.address, successor);
            Ok(next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryHost, PricingMode};

    const CONVERTER: Address = Address::repeat_byte(0xc0);
    const SUCCESSOR: Address = Address::repeat_byte(0xc1);
    const POOL: Address = Address::repeat_byte(0x90);
    const OWNER: Address = Address::repeat_byte(1);
    const MANAGER: Address = Address::repeat_byte(2);
    const ETH: Address = Address::repeat_byte(0xe1);
    const DAI: Address = Address::repeat_byte(0xda);

    fn inactive() -> (Converter, MemoryHost) {
        let mut host = MemoryHost::new();
        host.create_token(POOL, "POOL", Some(OWNER)).unwrap();
        host.create_token(ETH, "ETH", None).unwrap();
        host.create_token(DAI, "DAI", None).unwrap();
        let conv = Converter::new(CONVERTER, POOL, OWNER, 50_000, None).unwrap();
        (conv, host)
    }

    fn active() -> (Converter, MemoryHost) {
        let (mut conv, mut host) = inactive();
        conv.add_reserve(&OWNER, ETH, 400_000).unwrap();
        conv.add_reserve(&OWNER, DAI, 600_000).unwrap();
        conv.update_reserve(&OWNER, &DAI, 600_000, PricingMode::Virtual(9000))
            .unwrap();
        host.transfer_token_ownership(&POOL, &OWNER, &CONVERTER).unwrap();
        conv.accept_token_ownership(&mut host, &OWNER).unwrap();

        host.mint(&ETH, &CONVERTER, 1000).unwrap();
        host.mint(&DAI, &CONVERTER, 3000).unwrap();
        conv.sync_reserve_balances(&mut host).unwrap();
        conv.set_conversion_fee(&OWNER, 2500).unwrap();
        conv.transfer_management(&OWNER, MANAGER).unwrap();
        conv.accept_management(&MANAGER).unwrap();
        conv.drain_events();
        (conv, host)
    }

    #[test]
    fn test_activation_requires_reserve_and_pending_ownership() {
        let (mut conv, mut host) = inactive();
        assert!(matches!(
            conv.accept_token_ownership(&mut host, &OWNER),
            Err(ConverterError::StateConflict(_))
        ));

        conv.add_reserve(&OWNER, ETH, 500_000).unwrap();
        assert!(matches!(
            conv.accept_token_ownership(&mut host, &MANAGER),
            Err(ConverterError::PermissionDenied(_))
        ));
        // Ownership was never proposed
        assert!(matches!(
            conv.accept_token_ownership(&mut host, &OWNER),
            Err(ConverterError::Token(_))
        ));
        assert_eq!(conv.lifecycle(), Lifecycle::Inactive);

        host.transfer_token_ownership(&POOL, &OWNER, &CONVERTER).unwrap();
        conv.accept_token_ownership(&mut host, &OWNER).unwrap();
        assert!(conv.is_active());
        assert_eq!(host.token_owner(&POOL), Ok(Some(CONVERTER)));
        assert!(conv.add_reserve(&OWNER, DAI, 1).is_err());
    }

    #[test]
    fn test_upgrade_moves_everything() {
        let (mut conv, mut host) = active();
        conv.disable_reserve_purchases(&OWNER, &ETH, true).unwrap();

        let next = conv.upgrade(&mut host, &OWNER, SUCCESSOR).unwrap();

        assert_eq!(conv.lifecycle(), Lifecycle::Retired { successor: SUCCESSOR });
        assert!(conv.reserves().iter().all(|(_, r)| r.balance == 0));
        assert_eq!(host.balance_of(&ETH, &CONVERTER), Ok(0));
        assert_eq!(host.balance_of(&ETH, &SUCCESSOR), Ok(1000));
        assert_eq!(host.balance_of(&DAI, &SUCCESSOR), Ok(3000));
        assert_eq!(host.token_owner(&POOL), Ok(Some(SUCCESSOR)));

        assert!(next.is_active());
        assert_eq!(next.address(), SUCCESSOR);
        assert_eq!(next.conversion_fee(), 2500);
        assert_eq!(next.settings().max_conversion_fee, 50_000);
        assert_eq!(next.access().manager(), Some(MANAGER));
        assert_eq!(next.reserves().assets(), &[ETH, DAI]);

        let eth = next.reserves().get(&ETH).unwrap();
        assert_eq!(eth.balance, 1000);
        assert!(!eth.purchases_enabled);
        // Virtual 9000 moved up with the 3000 synced in
        let dai = next.reserves().get(&DAI).unwrap();
        assert_eq!(dai.pricing, PricingMode::Virtual(12_000));
        assert_eq!(dai.weight, 600_000);

        assert_eq!(
            conv.drain_events(),
            vec![
                ConverterEvent::PurchasesToggled { reserve: ETH, enabled: false },
                ConverterEvent::Activation { pool_token: POOL, activated: false },
                ConverterEvent::Upgraded { successor: SUCCESSOR },
            ]
        );
    }

    #[test]
    fn test_upgrade_rejections_leave_state() {
        let (mut conv, mut host) = active();
        assert!(matches!(
            conv.upgrade(&mut host, &MANAGER, SUCCESSOR),
            Err(ConverterError::PermissionDenied(_))
        ));
        for bad in [Address::ZERO, CONVERTER, POOL, ETH] {
            assert!(matches!(
                conv.upgrade(&mut host, &OWNER, bad),
                Err(ConverterError::InvalidArgument(_))
            ));
        }

        let before = conv.clone();
        host.set_frozen(&DAI, true).unwrap();
        assert!(matches!(
            conv.upgrade(&mut host, &OWNER, SUCCESSOR),
            Err(ConverterError::Token(_))
        ));
        assert_eq!(conv, before);
        assert_eq!(host.balance_of(&ETH, &CONVERTER), Ok(1000));
        assert_eq!(host.token_owner(&POOL), Ok(Some(CONVERTER)));
    }

    #[test]
    fn test_retired_converter_is_inert() {
        let (mut conv, mut host) = active();
        conv.upgrade(&mut host, &OWNER, SUCCESSOR).unwrap();
        assert!(conv.upgrade(&mut host, &OWNER, Address::repeat_byte(0xc2)).is_err());
        assert!(conv.get_return(&host, &ETH, &POOL, 1).is_err());
        assert!(conv.sync_reserve_balances(&mut host).is_err());
        assert!(conv.disable_reserve_purchases(&OWNER, &ETH, false).is_err());

        let events = conv.events().len();
        let settings = *conv.settings();
        let access = conv.access().clone();
        assert!(conv.set_conversion_fee(&OWNER, 1000).is_err());
        assert!(conv.enable_conversions(&OWNER, false).is_err());
        assert!(conv.transfer_ownership(&OWNER, MANAGER).is_err());
        assert!(conv.transfer_management(&OWNER, MANAGER).is_err());
        assert!(conv.accept_management(&MANAGER).is_err());
        assert_eq!(conv.events().len(), events);
        assert_eq!(*conv.settings(), settings);
        assert_eq!(*conv.access(), access);
    }
}
