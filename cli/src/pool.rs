//! Pool creation and inspection

use anyhow::{Context, Result};
use colored::Colorize;
use pool_converter::{ConverterEvent, Lifecycle, PricingMode, TokenHost, PPM_RESOLUTION};
use std::path::Path;

use crate::config::{expand_path, PoolConfig};
use crate::state::SimulationState;

pub fn init(state_path: &Path, config_path: &Path, force: bool) -> Result<()> {
    println!("{}", "=== Initialize Pool ===".bright_green().bold());

    let target = expand_path(state_path)?;
    if target.exists() && !force {
        anyhow::bail!(
            "State file already exists: {}\nPass --force to overwrite it",
            target.display()
        );
    }

    let config = PoolConfig::load(config_path)?;
    let state = SimulationState::from_config(&config)
        .with_context(|| format!("Failed to build pool from {}", config_path.display()))?;
    state.save(state_path)?;

    println!("{} {}", "Converter:".bright_cyan(), state.converter.address());
    println!("{} {}", "Pool token:".bright_cyan(), config.pool_token.symbol);
    println!("{} {}", "Reserves:".bright_cyan(), config.reserves.len());
    println!("{} {}", "Supply:".bright_cyan(), state.supply()?);
    println!("{} {}", "State:".bright_cyan(), target.display());
    println!("\n{}", "Pool is live".green());
    Ok(())
}

fn percent(ppm: u32) -> String {
    format!("{:.4}%", f64::from(ppm) * 100.0 / f64::from(PPM_RESOLUTION))
}

pub fn show(state: &SimulationState, events: bool) -> Result<()> {
    let conv = &state.converter;
    println!("{}", "=== Pool Status ===".bright_green().bold());
    println!("{} {}", "Converter:".bright_cyan(), conv.address());

    let lifecycle = match conv.lifecycle() {
        Lifecycle::Inactive => "inactive".yellow().to_string(),
        Lifecycle::Active => "active".green().to_string(),
        Lifecycle::Retired { successor } => {
            let text = format!("retired -> {}", state.name_of(&successor));
            text.as_str().red().to_string()
        }
    };
    println!("{} {}", "Lifecycle:".bright_cyan(), lifecycle);
    println!("{} {}", "Owner:".bright_cyan(), state.name_of(&conv.owner()));
    if let Some(manager) = conv.access().manager() {
        println!("{} {}", "Manager:".bright_cyan(), state.name_of(&manager));
    }

    let settings = conv.settings();
    println!(
        "{} {} (max {})",
        "Fee:".bright_cyan(),
        percent(settings.conversion_fee),
        percent(settings.max_conversion_fee)
    );
    println!(
        "{} {}",
        "Conversions:".bright_cyan(),
        if settings.conversions_enabled { "enabled".green() } else { "disabled".red() }
    );
    println!(
        "{} {} {}",
        "Supply:".bright_cyan(),
        state.supply()?,
        state.name_of(&conv.pool_token())
    );

    println!("\n{}", "Reserves".bright_yellow().bold());
    for (asset, reserve) in conv.reserves().iter() {
        let pricing = match reserve.pricing {
            PricingMode::Real => String::new(),
            PricingMode::Virtual(amount) => format!(" (priced at {})", amount),
        };
        let purchases = if reserve.purchases_enabled { "" } else { " [purchases disabled]" };
        println!(
            "  {:<8} weight {:>10}  balance {}{}{}",
            state.name_of(asset),
            percent(reserve.weight),
            reserve.balance,
            pricing,
            purchases.red()
        );
    }

    println!("\n{}", "Holders".bright_yellow().bold());
    for (token, account) in state.host.tokens() {
        for (holder, balance) in &account.balances {
            println!(
                "  {:<8} {:<12} {}",
                account.symbol,
                state.name_of(holder),
                balance
            );
        }
        if account.balances.is_empty() {
            println!("  {:<8} {}", state.name_of(token), "(no holders)".dimmed());
        }
    }

    if events {
        println!("\n{}", "Events".bright_yellow().bold());
        if state.history.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for (i, event) in state.history.iter().enumerate() {
            println!("  {:>4} {}", i, describe(state, event));
        }
    }
    Ok(())
}

/// One-line rendering of an event with labels substituted
pub fn describe(state: &SimulationState, event: &ConverterEvent) -> String {
    let n = |a: &pool_converter::Address| state.name_of(a);
    match event {
        ConverterEvent::ReserveAdded { reserve, weight } => {
            format!("reserve {} added at {}", n(reserve), percent(*weight))
        }
        ConverterEvent::ReserveUpdated { reserve, weight, pricing } => {
            format!("reserve {} set to {} ({:?})", n(reserve), percent(*weight), pricing)
        }
        ConverterEvent::PurchasesToggled { reserve, enabled } => {
            format!("purchases of {} {}", n(reserve), if *enabled { "enabled" } else { "disabled" })
        }
        ConverterEvent::ConversionFeeUpdate { previous, current } => {
            format!("fee {} -> {}", percent(*previous), percent(*current))
        }
        ConverterEvent::ConversionsToggled { enabled } => {
            format!("conversions {}", if *enabled { "enabled" } else { "disabled" })
        }
        ConverterEvent::Activation { pool_token, activated } => format!(
            "{} for {}",
            if *activated { "activated" } else { "deactivated" },
            n(pool_token)
        ),
        ConverterEvent::Conversion { from, to, trader, amount, return_amount, fee } => format!(
            "{} converted {} {} into {} {} (fee {})",
            n(trader),
            amount,
            n(from),
            return_amount,
            n(to),
            fee
        ),
        ConverterEvent::LiquidityAdded { provider, reserve, amount, new_balance, new_supply } => {
            format!(
                "{} deposited {} {} (balance {}, supply {})",
                n(provider),
                amount,
                n(reserve),
                new_balance,
                new_supply
            )
        }
        ConverterEvent::LiquidityRemoved { provider, reserve, amount, new_balance, new_supply } => {
            format!(
                "{} withdrew {} {} (balance {}, supply {})",
                n(provider),
                amount,
                n(reserve),
                new_balance,
                new_supply
            )
        }
        ConverterEvent::OwnerUpdate { previous, current } => {
            format!("owner {} -> {}", n(previous), n(current))
        }
        ConverterEvent::ManagerUpdate { previous, current } => format!(
            "manager {} -> {}",
            previous.as_ref().map(n).unwrap_or_else(|| "none".to_string()),
            n(current)
        ),
        ConverterEvent::Upgraded { successor } => format!("upgraded to {}", n(successor)),
    }
}

/// Print events produced by the last command
pub fn print_events(state: &SimulationState, events: &[ConverterEvent]) {
    for event in events {
        println!("  {} {}", "event:".dimmed(), describe(state, event));
    }
}
