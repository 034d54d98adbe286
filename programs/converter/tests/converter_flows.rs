//! End-to-end converter flows against the in-memory host
//!
//! Each test drives a converter through its public surface only: configure,
//! activate, provide liquidity, convert, reconfigure, upgrade.

use pool_converter::*;

const CONVERTER: Address = Address::repeat_byte(0xc0);
const SUCCESSOR: Address = Address::repeat_byte(0xc1);
const POOL: Address = Address::repeat_byte(0x90);
const OWNER: Address = Address::repeat_byte(0x01);
const MANAGER: Address = Address::repeat_byte(0x02);
const ALICE: Address = Address::repeat_byte(0xa1);
const BOB: Address = Address::repeat_byte(0xb0);
const ETH: Address = Address::repeat_byte(0xe1);
const DAI: Address = Address::repeat_byte(0xda);
const BNT: Address = Address::repeat_byte(0xbb);

const ONE: u128 = 1_000_000_000_000_000_000;

// ============================================================================
// FIXTURES
// ============================================================================

fn funded_host() -> MemoryHost {
    let mut host = MemoryHost::new();
    host.create_token(POOL, "POOL", Some(OWNER)).unwrap();
    for (token, symbol) in [(ETH, "ETH"), (DAI, "DAI"), (BNT, "BNT")] {
        host.create_token(token, symbol, None).unwrap();
        for user in [OWNER, ALICE, BOB] {
            host.mint(&token, &user, 1_000_000 * ONE).unwrap();
            host.approve(&token, &user, &CONVERTER, u128::MAX).unwrap();
        }
    }
    host
}

/// Three-reserve pool (20/30/50) seeded by OWNER
fn live_pool() -> (Converter, MemoryHost) {
    let mut host = funded_host();
    let mut conv = Converter::new(CONVERTER, POOL, OWNER, 30_000, Some((ETH, 200_000))).unwrap();
    conv.add_reserve(&OWNER, DAI, 300_000).unwrap();
    conv.add_reserve(&OWNER, BNT, 500_000).unwrap();
    host.transfer_token_ownership(&POOL, &OWNER, &CONVERTER).unwrap();
    conv.accept_token_ownership(&mut host, &OWNER).unwrap();

    let seed = [
        ReserveAmount { reserve: ETH, amount: 1_000 * ONE },
        ReserveAmount { reserve: DAI, amount: 2_000 * ONE },
        ReserveAmount { reserve: BNT, amount: 5_000 * ONE },
    ];
    conv.add_liquidity(&mut host, &OWNER, &seed, 1).unwrap();
    conv.drain_events();
    (conv, host)
}

fn assert_ledger_matches_host(conv: &Converter, host: &MemoryHost) {
    for (asset, reserve) in conv.reserves().iter() {
        assert_eq!(
            host.balance_of(asset, &conv.address()).unwrap(),
            reserve.balance,
            "ledger and host disagree on {}",
            asset
        );
    }
}

// ============================================================================
// ACTIVATION AND LIQUIDITY
// ============================================================================

#[test]
fn test_bootstrap_sets_initial_supply() {
    let (conv, host) = live_pool();
    assert!(conv.is_active());
    // Three 22-digit deposits -> 10^21
    assert_eq!(host.total_supply(&POOL), Ok(1_000 * ONE));
    assert_eq!(host.balance_of(&POOL, &OWNER), Ok(1_000 * ONE));
    assert_ledger_matches_host(&conv, &host);
}

#[test]
fn test_fund_then_liquidate_never_profits() {
    let (mut conv, mut host) = live_pool();
    let before: Vec<u128> = [ETH, DAI, BNT]
        .iter()
        .map(|t| host.balance_of(t, &ALICE).unwrap())
        .collect();

    conv.fund(&mut host, &ALICE, 7 * ONE + 13).unwrap();
    conv.liquidate(&mut host, &ALICE, 7 * ONE + 13).unwrap();

    for (token, start) in [ETH, DAI, BNT].iter().zip(before) {
        let end = host.balance_of(token, &ALICE).unwrap();
        assert!(end <= start, "{} grew from {} to {}", token, start, end);
        assert!(start - end <= 1, "{} lost more than rounding", token);
    }
    assert_eq!(host.balance_of(&POOL, &ALICE), Ok(0));
    assert_ledger_matches_host(&conv, &host);
}

#[test]
fn test_liquidity_events_track_supply() {
    let (mut conv, mut host) = live_pool();
    conv.fund(&mut host, &BOB, 10 * ONE).unwrap();

    let events = conv.drain_events();
    assert_eq!(events.len(), 3);
    for event in events {
        match event {
            ConverterEvent::LiquidityAdded { provider, new_supply, .. } => {
                assert_eq!(provider, BOB);
                assert_eq!(new_supply, 1_010 * ONE);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

#[test]
fn test_buy_then_sell_returns_at_most_input() {
    let (mut conv, mut host) = live_pool();
    let start = host.balance_of(&DAI, &ALICE).unwrap();

    let minted = conv.convert(&mut host, &ALICE, &DAI, &POOL, 50 * ONE, 1).unwrap();
    let back = conv.convert(&mut host, &ALICE, &POOL, &DAI, minted, 1).unwrap();

    assert!(back <= 50 * ONE);
    assert_eq!(host.balance_of(&DAI, &ALICE), Ok(start - 50 * ONE + back));
    assert_ledger_matches_host(&conv, &host);
}

#[test]
fn test_cross_conversion_matches_two_step_quote() {
    let (conv, host) = live_pool();
    let amount = 3 * ONE;

    let direct = conv.get_return(&host, &ETH, &BNT, amount).unwrap().net();

    // Price the two legs by hand on a scratch copy
    let mut scratch_conv = conv.clone();
    let mut scratch_host = host.clone();
    let minted = scratch_conv
        .convert(&mut scratch_host, &ALICE, &ETH, &POOL, amount, 1)
        .unwrap();
    let two_step = scratch_conv
        .convert(&mut scratch_host, &ALICE, &POOL, &BNT, minted, 1)
        .unwrap();

    let gap = direct.max(two_step) - direct.min(two_step);
    // The two-step path rounds down twice on a 1e21 supply
    assert!(gap * 1_000_000 <= direct, "direct {} vs two-step {}", direct, two_step);
}

#[test]
fn test_higher_fee_never_returns_more() {
    let (mut conv, host) = live_pool();
    let mut last = u128::MAX;
    for fee in [0, 1_000, 5_000, 30_000] {
        conv.set_conversion_fee(&OWNER, fee).unwrap();
        let net = conv.get_return(&host, &ETH, &DAI, 10 * ONE).unwrap().net();
        assert!(net <= last);
        last = net;
    }
}

#[test]
fn test_fee_stays_in_reserve() {
    let (mut conv, mut host) = live_pool();
    let mut free = conv.clone();
    let mut free_host = host.clone();
    host.transfer(&POOL, &OWNER, &ALICE, ONE).unwrap();
    free_host.transfer(&POOL, &OWNER, &ALICE, ONE).unwrap();

    conv.set_conversion_fee(&OWNER, 10_000).unwrap();
    let quote = conv.get_return(&host, &POOL, &BNT, ONE).unwrap();
    assert!(quote.fee > 0);

    let paid = conv.convert(&mut host, &ALICE, &POOL, &BNT, ONE, 1).unwrap();
    let unpaid = free.convert(&mut free_host, &ALICE, &POOL, &BNT, ONE, 1).unwrap();
    assert_eq!(paid, quote.net());
    assert_eq!(unpaid, quote.gross);

    let kept = conv.reserves().get(&BNT).unwrap().balance;
    let drained = free.reserves().get(&BNT).unwrap().balance;
    assert_eq!(kept, drained + quote.fee);
}

#[test]
fn test_fee_above_max_emits_nothing() {
    let (mut conv, _host) = live_pool();
    assert!(matches!(
        conv.set_conversion_fee(&OWNER, 30_001),
        Err(ConverterError::InvalidArgument(_))
    ));
    assert!(conv.drain_events().is_empty());
    assert_eq!(conv.conversion_fee(), 0);
}

// ============================================================================
// ROLES
// ============================================================================

#[test]
fn test_manager_runs_fee_but_not_reserves() {
    let (mut conv, mut host) = live_pool();
    conv.transfer_management(&OWNER, MANAGER).unwrap();
    assert!(conv.set_conversion_fee(&MANAGER, 100).is_err());
    conv.accept_management(&MANAGER).unwrap();

    conv.set_conversion_fee(&MANAGER, 100).unwrap();
    conv.enable_conversions(&MANAGER, false).unwrap();
    assert!(matches!(
        conv.convert(&mut host, &ALICE, &ETH, &DAI, ONE, 1),
        Err(ConverterError::StateConflict(_))
    ));
    assert!(matches!(
        conv.disable_reserve_purchases(&MANAGER, &ETH, true),
        Err(ConverterError::PermissionDenied(_))
    ));
    assert!(matches!(
        conv.upgrade(&mut host, &MANAGER, SUCCESSOR),
        Err(ConverterError::PermissionDenied(_))
    ));
}

// ============================================================================
// UPGRADE
// ============================================================================

#[test]
fn test_upgrade_preserves_pricing() {
    let (mut conv, mut host) = live_pool();
    conv.set_conversion_fee(&OWNER, 2_000).unwrap();
    let quote = conv.get_return(&host, &DAI, &ETH, 25 * ONE).unwrap();

    let mut next = conv.upgrade(&mut host, &OWNER, SUCCESSOR).unwrap();
    assert_eq!(next.get_return(&host, &DAI, &ETH, 25 * ONE), Ok(quote));
    assert!(conv.get_return(&host, &DAI, &ETH, 25 * ONE).is_err());
    assert_ledger_matches_host(&next, &host);

    // The successor owns the pool token and can issue
    host.approve(&BNT, &BOB, &SUCCESSOR, u128::MAX).unwrap();
    let minted = next.convert(&mut host, &BOB, &BNT, &POOL, ONE, 1).unwrap();
    assert_eq!(host.balance_of(&POOL, &BOB), Ok(minted));
}

#[test]
fn test_state_round_trips_through_json() {
    let (mut conv, mut host) = live_pool();
    conv.convert(&mut host, &ALICE, &ETH, &DAI, ONE, 1).unwrap();

    let json = serde_json::to_string(&conv).unwrap();
    let restored: Converter = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, conv);

    let json = serde_json::to_string(&host).unwrap();
    let restored: MemoryHost = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.balance_of(&DAI, &ALICE), host.balance_of(&DAI, &ALICE));
}
