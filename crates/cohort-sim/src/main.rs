//! `cohort-sim` command line: simulate client traffic, inspect state tokens

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use cohort_core::{ExperimentManager, ManagerConfig};
use cohort_sim::{inspect, run_simulator, with_demo_experiment, SimulatorConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let cli = Command::new("cohort-sim")
        .version(cohort_sim::VERSION)
        .about("Simulate client traffic against Cohort experiments")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("simulate")
                .about("Run synthetic clients through start and finish")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .help("Manager config (TOML); a demo experiment is used if it declares none"),
                )
                .arg(
                    Arg::new("clients")
                        .long("clients")
                        .default_value("10000")
                        .value_parser(value_parser!(u64))
                        .help("Number of simulated clients"),
                )
                .arg(
                    Arg::new("visits")
                        .long("visits")
                        .default_value("3")
                        .value_parser(value_parser!(u32))
                        .help("Start requests per client and experiment"),
                )
                .arg(
                    Arg::new("finish-rate")
                        .long("finish-rate")
                        .default_value("0.5")
                        .value_parser(value_parser!(f64))
                        .help("Share of clients that finish"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Decode a state token")
                .arg(
                    Arg::new("token")
                        .required(true)
                        .help("Token value, as stored or as sent in the cookie"),
                )
                .arg(
                    Arg::new("escaped")
                        .long("escaped")
                        .action(ArgAction::SetTrue)
                        .help("Unescape the cookie value first"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("simulate", args)) => simulate(args),
        Some(("inspect", args)) => {
            let token = arg::<String>(args, "token")?;
            let inspection = inspect(&token, args.get_flag("escaped"))?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&inspection)?);
            } else {
                print!("{}", inspection.generate_text());
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn simulate(args: &ArgMatches) -> Result<()> {
    let config = match args.get_one::<String>("config") {
        Some(path) => ManagerConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => ManagerConfig::default(),
    };
    let seed = arg::<u64>(args, "seed")?;
    let manager = ExperimentManager::seeded(with_demo_experiment(config), seed);
    manager
        .register_configured()
        .context("registering configured experiments")?;

    let report = run_simulator(
        &manager,
        SimulatorConfig {
            seed,
            clients: arg(args, "clients")?,
            visits: arg(args, "visits")?,
            finish_rate: arg(args, "finish-rate")?,
        },
    )?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.generate_text());
    }

    if !report.passed() {
        anyhow::bail!("{} lifecycle violations", report.violations.len());
    }
    Ok(())
}

fn arg<T: Clone + Send + Sync + 'static>(args: &ArgMatches, name: &str) -> Result<T> {
    args.get_one::<T>(name)
        .cloned()
        .with_context(|| format!("missing --{name}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cohort_persistence=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
