//! # Hopveil Simulation
//!
//! Experiment harness for random hop injection.
//!
//! ## Overview
//!
//! The routing crate answers two per-query questions: how to obfuscate one
//! payment, and what one compromised intermediary learns from it. This
//! crate wraps them into experiments:
//!
//! - **Topology** (`topology.rs`): Line, ring and seeded random networks
//! - **Snapshots** (`snapshot.rs`): JSON load/save of channel networks
//! - **Config** (`config.rs`): JSON-loadable experiment parameters
//! - **Scenarios** (`scenarios.rs`): Position sweeps and the letter demo
//!
//! ## Example
//!
//! ```rust,ignore
//! use hopveil_simulation::*;
//!
//! let config = SimulationConfig::small();
//! let report = run_random_sweep(&config, 0, 9)?;
//! println!("{report}");
//! ```

pub mod config;
pub mod error;
pub mod scenarios;
pub mod snapshot;
pub mod topology;

// Re-export main types
pub use config::SimulationConfig;
pub use error::{SimulationError, SimulationResult};
pub use scenarios::{
    PositionReport, SweepReport, run_config_sweep, run_demo, run_position_sweep, run_random_sweep,
};
pub use snapshot::{LinkRecord, NetworkSnapshot};
pub use topology::{TopologyBuilder, TopologyKind};
