//! Stateless bonding-curve calculator

use anyhow::{Context, Result};
use bonding_curve::{cross_reserve_return, power, purchase_return, sale_return};
use colored::Colorize;
use primitive_types::U256;

pub fn purchase(supply: u128, balance: u128, weight: u32, amount: u128) -> Result<()> {
    let minted = purchase_return(supply, balance, weight, amount)
        .context("Purchase return could not be computed")?;

    println!("{}", "=== Purchase Return ===".bright_green().bold());
    println!("{} {}", "Supply:".bright_cyan(), supply);
    println!("{} {} (weight {} ppm)", "Reserve:".bright_cyan(), balance, weight);
    println!("{} {}", "Deposit:".bright_cyan(), amount);
    println!("{} {}", "Minted:".bright_cyan(), minted.to_string().bold());
    Ok(())
}

pub fn sale(supply: u128, balance: u128, weight: u32, amount: u128) -> Result<()> {
    let returned = sale_return(supply, balance, weight, amount)
        .context("Sale return could not be computed")?;

    println!("{}", "=== Sale Return ===".bright_green().bold());
    println!("{} {}", "Supply:".bright_cyan(), supply);
    println!("{} {} (weight {} ppm)", "Reserve:".bright_cyan(), balance, weight);
    println!("{} {}", "Burned:".bright_cyan(), amount);
    println!("{} {}", "Returned:".bright_cyan(), returned.to_string().bold());
    Ok(())
}

pub fn cross(
    source_balance: u128,
    source_weight: u32,
    target_balance: u128,
    target_weight: u32,
    amount: u128,
) -> Result<()> {
    let returned = cross_reserve_return(
        source_balance,
        source_weight,
        target_balance,
        target_weight,
        amount,
    )
    .context("Cross-reserve return could not be computed")?;

    println!("{}", "=== Cross-Reserve Return ===".bright_green().bold());
    println!(
        "{} {} (weight {} ppm)",
        "Source:".bright_cyan(),
        source_balance,
        source_weight
    );
    println!(
        "{} {} (weight {} ppm)",
        "Target:".bright_cyan(),
        target_balance,
        target_weight
    );
    println!("{} {}", "Deposit:".bright_cyan(), amount);
    println!("{} {}", "Returned:".bright_cyan(), returned.to_string().bold());
    Ok(())
}

/// Evaluate `(base_n / base_d)^(exp_n / exp_d)`
pub fn evaluate_power(base_n: u128, base_d: u128, exp_n: u32, exp_d: u32) -> Result<()> {
    let p = power(U256::from(base_n), U256::from(base_d), exp_n, exp_d)
        .context("Power could not be computed")?;

    println!("{}", "=== Power ===".bright_green().bold());
    println!(
        "{} ({} / {})^({} / {})",
        "Input:".bright_cyan(),
        base_n,
        base_d,
        exp_n,
        exp_d
    );
    println!("{} {}", "Result:".bright_cyan(), p.result);
    println!("{} {} bits", "Precision:".bright_cyan(), p.precision);
    println!("{} {:.12}", "Approx:".bright_cyan(), approximate(p.result, p.precision));
    Ok(())
}

/// `result / 2^precision` as a float, keeping the top 64 bits of `result`
fn approximate(result: U256, precision: u8) -> f64 {
    let shift = result.bits().saturating_sub(64);
    let mantissa = (result >> shift).low_u64() as f64;
    mantissa * 2f64.powi(shift as i32 - i32::from(precision))
}
