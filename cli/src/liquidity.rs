//! Liquidity provider operations

use anyhow::{Context, Result};
use colored::Colorize;
use pool_converter::LiquidityReceipt;

use crate::pool::print_events;
use crate::state::SimulationState;

fn print_receipt(state: &SimulationState, receipt: &LiquidityReceipt, verb: &str) {
    println!("{} {}", "Pool tokens:".bright_cyan(), receipt.pool_amount);
    for entry in &receipt.reserves {
        println!(
            "  {} {} {}",
            verb,
            entry.amount,
            state.name_of(&entry.reserve)
        );
    }
}

pub fn fund(state: &mut SimulationState, provider: &str, amount: u128) -> Result<()> {
    let provider_addr = state.resolve(provider)?;

    println!("{}", "=== Fund ===".bright_green().bold());
    let receipt = state
        .converter
        .fund(&mut state.host, &provider_addr, amount)
        .with_context(|| format!("Failed to fund {} pool tokens", amount))?;

    print_receipt(state, &receipt, "deposited");
    println!("{} {}", "New supply:".bright_cyan(), state.supply()?);
    let events = state.record_events();
    print_events(state, &events);
    Ok(())
}

pub fn liquidate(state: &mut SimulationState, provider: &str, amount: u128) -> Result<()> {
    let provider_addr = state.resolve(provider)?;

    println!("{}", "=== Liquidate ===".bright_green().bold());
    let receipt = state
        .converter
        .liquidate(&mut state.host, &provider_addr, amount)
        .with_context(|| format!("Failed to liquidate {} pool tokens", amount))?;

    print_receipt(state, &receipt, "withdrew");
    println!("{} {}", "New supply:".bright_cyan(), state.supply()?);
    let events = state.record_events();
    print_events(state, &events);
    Ok(())
}
