//! Runtime settings for the binaries.
//!
//! Values come from built-in defaults, then `BETTERBITES_*` environment
//! variables, then command-line flags, each layer overriding the last.

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_DATA: &str = "data/data.json";
pub const DEFAULT_SNAPSHOT: &str = "data/snapshot.bin.gz";

#[derive(Clone, Debug, PartialEq, Eq, Parser)]
#[command(name = "betterbites")]
#[command(about = "Food donation tracking dashboard", long_about = None)]
#[command(version)]
pub struct Config {
    /// Address the web server binds to
    #[arg(long, env = "BETTERBITES_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Seed records loaded at startup (.json or .csv)
    #[arg(long = "data", env = "BETTERBITES_DATA", default_value = DEFAULT_DATA)]
    pub data_path: PathBuf,

    /// Where snapshots are saved and restored
    #[arg(long = "snapshot", env = "BETTERBITES_SNAPSHOT", default_value = DEFAULT_SNAPSHOT)]
    pub snapshot_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            data_path: PathBuf::from(DEFAULT_DATA),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT),
        }
    }
}
