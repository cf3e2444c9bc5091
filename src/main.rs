use betterbites::app;
use betterbites::config::Config;
use clap::Parser;

/// Start the BetterBites web dashboard.
///
/// Settings come from `--addr`, `--data` and `--snapshot` flags or the
/// matching `BETTERBITES_*` environment variables. `RUST_LOG` sets the log
/// level (default `info`).
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    app::run(config).await
}
