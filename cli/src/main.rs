//! Converter CLI - Simulate a weighted-reserve liquidity pool
//!
//! Every stateful command loads the pool from a JSON state file, applies one
//! operation through the converter, and writes the state back. A failed
//! operation leaves the file untouched.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod admin;
mod config;
mod formula;
mod liquidity;
mod pool;
mod state;
mod trade;

use state::SimulationState;

#[derive(Parser)]
#[command(name = "converter")]
#[command(about = "Weighted-reserve converter CLI - Price, trade and manage a simulated pool", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the simulation state file
    #[arg(short, long, default_value = "converter-state.json")]
    state: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a live pool from a TOML definition
    Init {
        /// Pool definition file
        #[arg(short, long)]
        config: PathBuf,

        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Show converter status, reserves and token holders
    Show {
        /// Also list every event emitted so far
        #[arg(long)]
        events: bool,
    },

    /// Price a conversion without executing it
    Quote {
        /// Source token (label, symbol or address)
        from: String,
        /// Target token
        to: String,
        /// Amount of the source token
        amount: u128,
    },

    /// Convert between a reserve and the pool token, or between two reserves
    Convert {
        /// Trading account
        #[arg(long)]
        trader: String,
        /// Source token
        from: String,
        /// Target token
        to: String,
        /// Amount of the source token
        amount: u128,
        /// Minimum acceptable return
        #[arg(long, default_value = "1")]
        min_return: u128,
    },

    /// Allow the converter to spend an account's tokens
    Approve {
        /// Token owner
        #[arg(long)]
        owner: String,
        /// Token to approve
        token: String,
        /// Allowance (unlimited if omitted)
        amount: Option<u128>,
    },

    /// Deposit every reserve proportionally for an exact amount of pool tokens
    Fund {
        /// Liquidity provider
        #[arg(long)]
        provider: String,
        /// Pool tokens to mint
        amount: u128,
    },

    /// Burn pool tokens for a proportional share of every reserve
    Liquidate {
        /// Liquidity provider
        #[arg(long)]
        provider: String,
        /// Pool tokens to burn
        amount: u128,
    },

    /// Set the conversion fee (owner or manager)
    SetFee {
        /// Calling account
        #[arg(long)]
        caller: String,
        /// Fee in ppm
        fee: u32,
    },

    /// Move all reserves and pool-token ownership to a new converter
    Upgrade {
        /// Calling account (must be the owner)
        #[arg(long)]
        caller: String,
        /// Address of the new converter
        successor: String,
    },

    /// Evaluate bonding-curve formulas directly
    Formula {
        #[command(subcommand)]
        command: FormulaCommands,
    },
}

#[derive(Subcommand)]
enum FormulaCommands {
    /// Pool tokens minted for a reserve deposit
    Purchase {
        supply: u128,
        balance: u128,
        /// Reserve weight in ppm
        weight: u32,
        amount: u128,
    },

    /// Reserve tokens returned for burning pool tokens
    Sale {
        supply: u128,
        balance: u128,
        /// Reserve weight in ppm
        weight: u32,
        amount: u128,
    },

    /// Target reserve tokens returned for a source reserve deposit
    Cross {
        source_balance: u128,
        source_weight: u32,
        target_balance: u128,
        target_weight: u32,
        amount: u128,
    },

    /// Fixed-point (base_n / base_d)^(exp_n / exp_d)
    Power {
        base_n: u128,
        base_d: u128,
        exp_n: u32,
        exp_d: u32,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if cli.verbose {
        println!("{} {}", "State file:".bright_cyan(), cli.state.display());
    }

    match cli.command {
        Commands::Init { config, force } => {
            pool::init(&cli.state, &config, force)?;
        }
        Commands::Show { events } => {
            let state = SimulationState::load(&cli.state)?;
            pool::show(&state, events)?;
        }
        Commands::Quote { from, to, amount } => {
            let state = SimulationState::load(&cli.state)?;
            trade::quote(&state, &from, &to, amount)?;
        }
        Commands::Convert { trader, from, to, amount, min_return } => {
            let mut state = SimulationState::load(&cli.state)?;
            trade::convert(&mut state, &trader, &from, &to, amount, min_return)?;
            state.save(&cli.state)?;
        }
        Commands::Approve { owner, token, amount } => {
            let mut state = SimulationState::load(&cli.state)?;
            trade::approve(&mut state, &owner, &token, amount)?;
            state.save(&cli.state)?;
        }
        Commands::Fund { provider, amount } => {
            let mut state = SimulationState::load(&cli.state)?;
            liquidity::fund(&mut state, &provider, amount)?;
            state.save(&cli.state)?;
        }
        Commands::Liquidate { provider, amount } => {
            let mut state = SimulationState::load(&cli.state)?;
            liquidity::liquidate(&mut state, &provider, amount)?;
            state.save(&cli.state)?;
        }
        Commands::SetFee { caller, fee } => {
            let mut state = SimulationState::load(&cli.state)?;
            admin::set_fee(&mut state, &caller, fee)?;
            state.save(&cli.state)?;
        }
        Commands::Upgrade { caller, successor } => {
            let mut state = SimulationState::load(&cli.state)?;
            admin::upgrade(&mut state, &caller, &successor)?;
            state.save(&cli.state)?;
        }
        Commands::Formula { command } => match command {
            FormulaCommands::Purchase { supply, balance, weight, amount } => {
                formula::purchase(supply, balance, weight, amount)?;
            }
            FormulaCommands::Sale { supply, balance, weight, amount } => {
                formula::sale(supply, balance, weight, amount)?;
            }
            FormulaCommands::Cross {
                source_balance,
                source_weight,
                target_balance,
                target_weight,
                amount,
            } => {
                formula::cross(source_balance, source_weight, target_balance, target_weight, amount)?;
            }
            FormulaCommands::Power { base_n, base_d, exp_n, exp_d } => {
                formula::evaluate_power(base_n, base_d, exp_n, exp_d)?;
            }
        },
    }

    Ok(())
}
