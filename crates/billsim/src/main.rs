use std::path::PathBuf;

use billsim::app::{App, AppConfig};
use billsim::jobs::{JobRequest, JobState};
use billsim::loader;
use billsim::init_logging;
use billsim_core::montecarlo::{DEFAULT_PERCENTILES, StochasticConfig};
use billsim_core::timeline::Window;
use clap::{Parser, Subcommand};
use jiff::civil::Date;

#[derive(Parser, Debug)]
#[command(name = "billsim")]
#[command(about = "Personal-finance projection engine")]
struct Args {
    /// Root data directory (default: ~/.billsim/)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Port the (externally wired) HTTP front should bind
    #[arg(short, long, env = "PORT", default_value_t = 5002)]
    port: u16,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute a scenario over a window and print ending balances
    Run {
        #[arg(long, default_value = "Default")]
        simulation: String,
        #[arg(long)]
        start_date: Date,
        #[arg(long)]
        end_date: Date,
    },
    /// Run a Monte Carlo job to completion and print the summary graph path
    MonteCarlo {
        #[arg(long, default_value = "Default")]
        simulation: String,
        #[arg(long)]
        start_date: Date,
        #[arg(long)]
        end_date: Date,
        #[arg(long, default_value_t = 1000)]
        simulations: usize,
        #[arg(long, default_value_t = 25)]
        batch_size: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// List account names
    Names,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".billsim")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let root = args.data_dir.unwrap_or_else(default_data_dir);

    init_logging(&root, &args.log_level)?;

    let app = App::open(AppConfig::under_root(&root, args.port))?;

    match args.command {
        Command::Run {
            simulation,
            start_date,
            end_date,
        } => {
            let result = app.compute(&simulation, Window::new(start_date, end_date))?;
            for account in &result.accounts {
                println!(
                    "{:<30} {:>14.2}  ({} entries)",
                    account.name,
                    account.balance,
                    account.consolidated_activity.len()
                );
            }
        }
        Command::MonteCarlo {
            simulation,
            start_date,
            end_date,
            simulations,
            batch_size,
            seed,
        } => {
            // The stochastic variable set is part of the catalog's scenario
            // table; with none configured the job is a determinism check.
            let request = JobRequest {
                scenario: simulation,
                start_date,
                end_date,
                simulations,
                batch_size,
                percentiles: DEFAULT_PERCENTILES.to_vec(),
                stochastic: StochasticConfig::default(),
                seed,
            };
            let id = app.start_monte_carlo(request)?;
            println!("started job {id}");
            loop {
                std::thread::sleep(std::time::Duration::from_millis(250));
                let Some(status) = app.runner.status(&id) else {
                    break;
                };
                match status.state {
                    JobState::Completed => {
                        println!("completed {} simulations", status.total_simulations);
                        break;
                    }
                    JobState::Failed => {
                        eprintln!(
                            "job failed: {}",
                            status.error.unwrap_or_else(|| "unknown".into())
                        );
                        std::process::exit(1);
                    }
                    _ => {
                        println!(
                            "progress: {}/{}",
                            status.completed_simulations, status.total_simulations
                        );
                    }
                }
            }
        }
        Command::Names => {
            for name in loader::names_payload(&app) {
                println!("{name}");
            }
        }
    }

    tracing::info!("billsim shutting down");
    Ok(())
}
