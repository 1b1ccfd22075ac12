//! CLI entry point for the market-making engine.
//!
//! Reads the refresh token from `BKS_TOKEN` and the engine configuration
//! from the path named by `CONFIG_PATH` (default `config.yaml`), then runs
//! the supervisor until shutdown. Exit codes: 0 clean shutdown, 1 auth
//! failure, 2 any other fatal error.

use bks_mm::error::FatalError;
use bks_mm::{EngineConfig, Supervisor};
use bks_mm_bot::bin_common::{load_config_from_env, ConfigType};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    bks_mm::infrastructure::init_tracing();

    info!("starting bks-mm");
    let exit_code = match run().await {
        Ok(()) => {
            info!("bks-mm stopped gracefully");
            0
        }
        Err(e) => {
            error!(error = %e, "bks-mm exited with a fatal error");
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<(), FatalError> {
    let config_path = load_config_from_env(ConfigType::Engine);
    let config = EngineConfig::load(config_path)?;
    Supervisor::new(config).run().await
}
