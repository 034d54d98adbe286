//! Quotes, conversions and allowances

use anyhow::{Context, Result};
use colored::Colorize;
use pool_converter::TokenHost;

use crate::pool::print_events;
use crate::state::SimulationState;

pub fn quote(state: &SimulationState, from: &str, to: &str, amount: u128) -> Result<()> {
    let from_addr = state.resolve(from)?;
    let to_addr = state.resolve(to)?;
    let conv = &state.converter;

    let quote = conv
        .get_return(&state.host, &from_addr, &to_addr, amount)
        .with_context(|| format!("Failed to price {} {} -> {}", amount, from, to))?;
    let rate = conv.rate(&state.host, &from_addr, &to_addr)?;

    println!("{}", "=== Quote ===".bright_green().bold());
    println!(
        "{} {} {} -> {}",
        "Convert:".bright_cyan(),
        amount,
        state.name_of(&from_addr),
        state.name_of(&to_addr)
    );
    println!("{} {}", "Gross:".bright_cyan(), quote.gross);
    println!("{} {}", "Fee:".bright_cyan(), quote.fee);
    println!("{} {}", "Net:".bright_cyan(), quote.net().to_string().bold());
    println!("{} {:.8}", "Spot rate:".bright_cyan(), rate.approximate());
    if amount > 0 {
        let effective = quote.net() as f64 / amount as f64;
        println!("{} {:.8}", "Effective rate:".bright_cyan(), effective);
    }
    Ok(())
}

pub fn convert(
    state: &mut SimulationState,
    trader: &str,
    from: &str,
    to: &str,
    amount: u128,
    min_return: u128,
) -> Result<()> {
    let trader_addr = state.resolve(trader)?;
    let from_addr = state.resolve(from)?;
    let to_addr = state.resolve(to)?;

    println!("{}", "=== Convert ===".bright_green().bold());
    let net = state
        .converter
        .convert(&mut state.host, &trader_addr, &from_addr, &to_addr, amount, min_return)
        .with_context(|| format!("Conversion of {} {} -> {} failed", amount, from, to))?;

    println!(
        "{} {} {} -> {} {}",
        "Converted:".bright_cyan(),
        amount,
        state.name_of(&from_addr),
        net.to_string().bold(),
        state.name_of(&to_addr)
    );
    let balance = state.host.balance_of(&to_addr, &trader_addr)?;
    println!(
        "{} {} {}",
        "Trader balance:".bright_cyan(),
        balance,
        state.name_of(&to_addr)
    );
    let events = state.record_events();
    print_events(state, &events);
    Ok(())
}

/// Let the converter spend `owner`'s `token` (unlimited when `amount` is `None`)
pub fn approve(
    state: &mut SimulationState,
    owner: &str,
    token: &str,
    amount: Option<u128>,
) -> Result<()> {
    let owner_addr = state.resolve(owner)?;
    let token_addr = state.resolve(token)?;
    let spender = state.converter.address();
    let amount = amount.unwrap_or(u128::MAX);

    state
        .host
        .approve(&token_addr, &owner_addr, &spender, amount)
        .with_context(|| format!("Failed to approve {} for {}", token, owner))?;

    println!("{}", "=== Approve ===".bright_green().bold());
    println!(
        "{} {} may spend {} of {}'s {}",
        "Allowance:".bright_cyan(),
        state.name_of(&spender),
        if amount == u128::MAX { "all".to_string() } else { amount.to_string() },
        state.name_of(&owner_addr),
        state.name_of(&token_addr)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;

    fn state() -> SimulationState {
        let config = PoolConfig::parse(include_str!("../pool.example.toml")).unwrap();
        SimulationState::from_config(&config).unwrap()
    }

    #[test]
    fn test_convert_requires_allowance() {
        let mut state = state();
        let alice = state.resolve("alice").unwrap();
        let eth = state.resolve("eth").unwrap();
        let pool = state.converter.pool_token();
        let amount = 100_000_000_000_000_000_000;
        state.host.mint(&eth, &alice, amount).unwrap();

        assert!(convert(&mut state, "alice", "ETH", "POOL", amount, 1).is_err());
        assert!(state.converter.events().is_empty());

        approve(&mut state, "alice", "ETH", None).unwrap();
        let supply = state.supply().unwrap();
        let recorded = state.history.len();
        convert(&mut state, "alice", "ETH", "POOL", amount, 1).unwrap();

        let minted = state.host.balance_of(&pool, &alice).unwrap();
        assert!(minted > 0);
        assert_eq!(state.supply().unwrap(), supply + minted);
        assert_eq!(state.host.balance_of(&eth, &alice), Ok(5000));
        assert_eq!(state.history.len(), recorded + 1);
    }

    #[test]
    fn test_quote_rejects_unknown_token() {
        let state = state();
        assert!(quote(&state, "ETH", "XYZ", 10).is_err());
        assert!(quote(&state, "ETH", "DAI", 10).is_ok());
    }
}
