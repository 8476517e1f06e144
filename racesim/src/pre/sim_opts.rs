use clap::{AppSettings, Clap};
use std::path::PathBuf;

#[derive(Debug, Clap, Clone)]
#[clap(
    version = "0.1.0",
    name = "RS-MT",
    about = "A multi-threaded live race simulator written in Rust"
)]
#[clap(setting = AppSettings::ColoredHelp)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing of the low-level synchronization traces
    #[clap(short, long)]
    pub debug: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of simulation runs (headless batch mode if greater than one)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the simulation parameter file
    #[clap(parse(from_os_str), short, long)]
    pub parfile_path: PathBuf,

    /// Set simulation speed factor (1, 2, 5 or 10)
    #[clap(short, long, default_value = "1")]
    pub sim_speed: u32,

    /// Override the total number of laps from the parameter file
    #[clap(short, long)]
    pub tot_no_laps: Option<u32>,

    /// Set the RNG seed for a reproducible grid and deterministic worker randomness
    #[clap(long)]
    pub seed: Option<u64>,
}
