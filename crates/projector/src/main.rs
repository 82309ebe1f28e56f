use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use projector::{ProjectionReport, RebalancingSummary, Scenario, init_logging};
use projector_core::estimate::estimate_statistics;
use projector_core::{analyze_rebalancing, estimate_and_simulate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Parser, Debug)]
#[command(name = "projector")]
#[command(about = "Monte Carlo portfolio projection and rebalancing analysis")]
struct Args {
    /// Path to the YAML scenario file
    #[arg(short, long)]
    scenario: PathBuf,

    /// RNG seed (overrides the scenario's seed; random when neither is set)
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project portfolio value and risk metrics
    Simulate,
    /// Analyze drift-triggered rebalancing only
    Rebalance {
        /// Annual portfolio return for the cost/benefit estimate (estimated when omitted)
        #[arg(long)]
        expected_return: Option<f64>,
        /// Annual portfolio volatility for the cost/benefit estimate (estimated when omitted)
        #[arg(long)]
        volatility: Option<f64>,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    let scenario = Scenario::load(&args.scenario)
        .wrap_err_with(|| format!("loading scenario {}", args.scenario.display()))?;
    let returns = scenario.returns.to_matrix().wrap_err("building returns matrix")?;

    let seed = args
        .seed
        .or(scenario.seed)
        .unwrap_or_else(rand::random::<u64>);
    tracing::info!(seed, "starting run");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    match args.command {
        Command::Simulate => {
            let result =
                estimate_and_simulate(&scenario.parameters, &returns, &scenario.engine, &mut rng)
                    .wrap_err("projection failed")?;
            let report =
                ProjectionReport::from_result(&result, seed, scenario.engine.trading_days_per_year);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }
        Command::Rebalance {
            expected_return,
            volatility,
        } => {
            let (expected_return, volatility) = match (expected_return, volatility) {
                (Some(mu), Some(sigma)) => (mu, sigma),
                (mu, sigma) => {
                    let stats = estimate_statistics(
                        &returns,
                        scenario.parameters.symbols(),
                        scenario.parameters.weights(),
                        scenario.parameters.method(),
                        &scenario.engine,
                    )
                    .wrap_err("estimating portfolio statistics")?;
                    (mu.unwrap_or(stats.drift), sigma.unwrap_or(stats.volatility))
                }
            };
            let request = scenario.rebalancing_request(expected_return, volatility);
            let recommendation = analyze_rebalancing(&request, &returns, &scenario.engine, &mut rng)
                .wrap_err("rebalancing analysis failed")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            } else {
                print!("{}", RebalancingSummary(&recommendation));
            }
        }
    }

    tracing::info!("run complete");
    Ok(())
}
