//! Owner and manager operations

use anyhow::{Context, Result};
use colored::Colorize;

use crate::pool::print_events;
use crate::state::SimulationState;

pub fn set_fee(state: &mut SimulationState, caller: &str, fee: u32) -> Result<()> {
    let caller_addr = state.resolve(caller)?;

    println!("{}", "=== Set Conversion Fee ===".bright_green().bold());
    state
        .converter
        .set_conversion_fee(&caller_addr, fee)
        .with_context(|| format!("Failed to set fee to {} ppm", fee))?;

    println!("{} {} ppm", "Fee:".bright_cyan(), fee);
    let events = state.record_events();
    print_events(state, &events);
    Ok(())
}

/// Replace the converter with a fresh instance at `successor`
///
/// The successor address gets the label `converter`; the retired instance
/// stays in the state file for inspection.
pub fn upgrade(state: &mut SimulationState, caller: &str, successor: &str) -> Result<()> {
    let caller_addr = state.resolve(caller)?;
    let successor_addr = state.resolve(successor)?;
    let previous = state.converter.address();

    println!("{}", "=== Upgrade ===".bright_green().bold());
    let next = state
        .converter
        .upgrade(&mut state.host, &caller_addr, successor_addr)
        .with_context(|| format!("Failed to upgrade to {}", successor))?;

    let events = state.record_events();
    let retired = std::mem::replace(&mut state.converter, next);
    state.retired.push(retired);
    state.labels.insert("converter".to_string(), successor_addr);
    state
        .labels
        .insert(format!("converter-{}", state.retired.len()), previous);
    let successor_events = state.record_events();

    println!("{} {}", "Retired:".bright_cyan(), previous);
    println!("{} {}", "Active:".bright_cyan(), successor_addr);
    println!(
        "{}",
        "Allowances were granted to the old converter; approve the new one before converting"
            .yellow()
    );
    print_events(state, &events);
    print_events(state, &successor_events);
    Ok(())
}
