//! Command-line entry point for tally.
//!
//! # Responsibility
//! - Map one-shot subcommands onto `tally_core` item and sequence services.
//! - Print data errors and exit non-zero instead of panicking.

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tally_core::{init_logging, StoreConfig, ITEM_SEQUENCE};

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Track expenses in a CSV file")]
struct Cli {
    /// Directory holding the record files
    #[arg(long, value_name = "DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Single-character field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Write rotating logs into this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a new expense dated today
    Add {
        #[arg(long)]
        description: String,
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,
    },
    /// List every expense
    List,
    /// Show one expense by id
    Show {
        #[arg(long)]
        id: String,
    },
    /// Delete one expense by id
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Print the id the next added record will receive
    NextId {
        #[arg(long, default_value = ITEM_SEQUENCE)]
        name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = StoreConfig {
        data_dir: cli.data_dir,
        delimiter: cli.delimiter,
        ..StoreConfig::default()
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.validate()?;

    if let Some(log_dir) = cli.log_dir {
        let log_dir = if log_dir.is_absolute() {
            log_dir
        } else {
            std::env::current_dir()
                .map_err(|err| err.to_string())?
                .join(log_dir)
        };
        init_logging(&config.log_level, log_dir).map_err(|err| err.to_string())?;
    }

    execute(&config, cli.command).map_err(|err| err.to_string())
}

fn execute(config: &StoreConfig, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Add {
            description,
            amount,
        } => {
            let item = config.open_item_service()?.add(&description, amount)?;
            println!("Expense added successfully (ID: {})", item.id);
        }
        Command::List => {
            let listed = config.open_item_service()?.list()?;
            for item in &listed.items {
                println!(
                    "{}\t{}\t{}\t{}",
                    item.id, item.created_at, item.description, item.amount
                );
            }
            println!("{} expense(s)", listed.total);
        }
        Command::Show { id } => match config.open_item_service()?.get(&id)? {
            Some(item) => println!(
                "{}\t{}\t{}\t{}",
                item.id, item.created_at, item.description, item.amount
            ),
            None => println!("item not found"),
        },
        Command::Delete { id } => {
            config.open_item_service()?.delete(&id)?;
            println!("Expense deleted successfully");
        }
        Command::NextId { name } => {
            let next = config.open_sequence_service()?.peek_next(&name)?;
            println!("{next}");
        }
    }
    Ok(())
}
