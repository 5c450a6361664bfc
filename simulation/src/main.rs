//! hopveil - random hop injection experiments
//!
//! Builds channel networks, obfuscates payments on them and measures what an
//! adversary at each route position can infer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use hopveil_simulation::{NetworkSnapshot, SimulationConfig, TopologyKind, scenarios, topology};

#[derive(Parser)]
#[command(
    name = "hopveil",
    about = "Random hop injection and adversarial source attribution",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the A-E letter scenario with both attribution strategies
    Demo,

    /// Obfuscate one payment and attack it from every position
    Sweep {
        /// JSON simulation config (defaults apply to missing fields)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use a saved network instead of generating one
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Paying node
        #[arg(short, long, default_value = "0")]
        source: u32,

        /// Receiving node
        #[arg(short, long, default_value = "1")]
        destination: u32,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Pick injected hops with the thread-local CSPRNG instead of the seed
        #[arg(long)]
        unseeded: bool,
    },

    /// Create and visualize a topology
    Topology {
        /// Type of topology
        #[arg(short, long, value_enum, default_value = "ring")]
        kind: TopologyKind,

        /// Number of nodes
        #[arg(short, long, default_value = "8")]
        nodes: u32,

        /// Seed for random topologies
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Save the network as a JSON snapshot
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Demo => {
            scenarios::run_demo()?;
        }
        Commands::Sweep {
            config,
            snapshot,
            source,
            destination,
            json,
            unseeded,
        } => {
            let mut config = match config {
                Some(path) => SimulationConfig::from_file(path)?,
                None => SimulationConfig::default(),
            };
            if unseeded {
                config.seeded_hops = false;
            }
            let report = match snapshot {
                Some(path) => {
                    let network = NetworkSnapshot::<u32>::load(path)?.to_network()?;
                    scenarios::run_config_sweep(&network, &config, source, destination)?
                }
                None => scenarios::run_random_sweep(&config, source, destination)?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
        Commands::Topology {
            kind,
            nodes,
            seed,
            output,
        } => {
            let config = SimulationConfig {
                seed,
                ..SimulationConfig::default()
            };
            let network = topology::build(kind, nodes, &config)?;
            println!("{}", network.visualize());
            if let Some(path) = output {
                NetworkSnapshot::from_network(&network).save(&path)?;
                info!(path = %path.display(), "Saved network snapshot");
            }
        }
    }

    Ok(())
}
