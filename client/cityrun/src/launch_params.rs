//! Launch parameter parsing for the city.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use std::path::PathBuf;

use bevy::prelude::*;

/// Default number of parked vehicles scattered around the city.
const DEFAULT_PARKED: usize = 10;

/// Launch parameters for the city.
#[derive(Resource, Debug)]
pub struct LaunchParams {
    /// RON file overriding simulation tuning.
    pub tuning: Option<PathBuf>,
    /// Number of parked vehicles.
    pub parked: usize,
    /// Seed for the city layout. Random when absent.
    pub seed: Option<u64>,
    /// glTF model for the player's vehicle. A plain box when absent.
    pub player_model: Option<String>,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            tuning: None,
            parked: DEFAULT_PARKED,
            seed: None,
            player_model: None,
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(about = "Walk and drive around a small physically simulated city")]
    struct CliArgs {
        /// RON file with simulation tuning overrides.
        #[arg(long)]
        tuning: Option<PathBuf>,

        /// Number of parked vehicles.
        #[arg(long, default_value_t = DEFAULT_PARKED)]
        parked: usize,

        /// Seed for the city layout.
        #[arg(long)]
        seed: Option<u64>,

        /// glTF model (asset path) for the player's vehicle.
        #[arg(long)]
        player_model: Option<String>,
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        LaunchParams {
            tuning: args.tuning,
            parked: args.parked,
            seed: args.seed,
            player_model: args.player_model,
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}
