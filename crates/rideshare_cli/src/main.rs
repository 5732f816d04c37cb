//! Command-line front-end: parse and validate arguments, load the map,
//! start the actor threads, then serve as the read-only status reader.

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use rideshare_core::config::SimulationConfig;
use rideshare_core::console::Console;
use rideshare_core::map::RouteModel;
use rideshare_core::matching::MatchPolicyKind;
use rideshare_core::runner::Simulation;

/// Rideshare simulation over an OpenStreetMap road network.
#[derive(Debug, Parser)]
#[command(name = "rideshare-sim")]
struct Args {
    /// Map data file name, in the data dir
    #[arg(short = 'm', value_name = "NAME", default_value = "downtown-kc")]
    map: String,

    /// Maximum passengers in the waiting queue, 0 to 100
    #[arg(short = 'p', value_name = "INT", default_value_t = 10)]
    passengers: i64,

    /// Maximum vehicles on the map, 0 to 100
    #[arg(short = 'v', value_name = "INT", default_value_t = 10)]
    vehicles: i64,

    /// Match type, either 'closest' or 'simple'
    #[arg(short = 't', value_name = "TYPE", default_value = "closest")]
    match_type: String,

    /// Minimum seconds between passenger generation attempts, at least 1
    #[arg(short = 'w', value_name = "INT", default_value_t = 3)]
    min_wait: i64,

    /// Additional random seconds on top of the minimum wait, at least 0
    #[arg(short = 'r', value_name = "INT", default_value_t = 2)]
    wait_range: i64,

    /// RNG seed, for reproducing a run's decisions
    #[arg(long, value_name = "INT")]
    seed: Option<u64>,
}

/// Turn validated arguments into a simulation config, or say what is wrong.
fn try_config(args: &Args) -> Result<SimulationConfig, String> {
    if !(0..=100).contains(&args.passengers) {
        return Err(format!("max passengers out of range: {}", args.passengers));
    }
    if !(0..=100).contains(&args.vehicles) {
        return Err(format!("max vehicles out of range: {}", args.vehicles));
    }
    if args.min_wait < 1 {
        return Err(format!("minimum wait must be at least 1: {}", args.min_wait));
    }
    if args.wait_range < 0 {
        return Err(format!("wait range must be at least 0: {}", args.wait_range));
    }
    let match_policy = args
        .match_type
        .parse::<MatchPolicyKind>()
        .map_err(|_| "invalid match type given".to_string())?;

    let defaults = SimulationConfig::default();
    Ok(SimulationConfig {
        map_name: args.map.clone(),
        max_passengers: args.passengers as usize,
        max_vehicles: args.vehicles as usize,
        match_policy,
        min_wait_secs: args.min_wait as u64,
        wait_jitter_secs: args.wait_range as u64,
        seed: args.seed.unwrap_or(defaults.seed),
        ..defaults
    })
}

/// Bad or unknown arguments show the helper text and leave quietly.
fn print_help_and_exit() -> ! {
    let mut command = Args::command();
    let _ = command.print_help();
    std::process::exit(0);
}

fn parse_config() -> SimulationConfig {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if err.kind() == clap::error::ErrorKind::DisplayHelp => {
            let _ = err.print();
            std::process::exit(0);
        }
        Err(err) => {
            println!("{err}");
            print_help_and_exit();
        }
    };
    match try_config(&args) {
        Ok(config) => config,
        Err(reason) => {
            println!("{reason}");
            print_help_and_exit();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let config = parse_config();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = format!("data/{}.osm", config.map_name);
    let xml = fs::read(&path).with_context(|| format!("failed to read map data from {path}"))?;
    let model = Arc::new(
        RouteModel::from_xml(&xml[..])
            .with_context(|| format!("failed to build the road graph from {path}"))?,
    );
    log::info!(
        "loaded {path}: {} nodes, {} ways, {} roads",
        model.node_count(),
        model.way_count(),
        model.road_count()
    );

    let simulation = Simulation::new(&config, model, Console::stdout());
    let views = simulation.views();
    let _threads = simulation
        .start()
        .context("failed to start the actor threads")?;

    // The main thread is the read-only consumer of actor positions; with no
    // tile layer attached it just surfaces counts. Runs until interrupted.
    loop {
        thread::sleep(Duration::from_secs(5));
        log::debug!(
            "{} waiting, {} walking, {} vehicles",
            views.waiting_passengers.len(),
            views.walking_passengers.len(),
            views.vehicles.len()
        );
    }
}
