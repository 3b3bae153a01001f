use anyhow::{Context, Result};
use log::info;

use skintrinsic::core::config::{Config, CONFIG_FILE};
use skintrinsic::core::io::NativeStorage;
use skintrinsic::services::api::SkinstricClient;
use skintrinsic::services::walkthrough::Walkthrough;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            eprintln!("Please check 'config.yml' or remove it to use the defaults.");
            return Err(e);
        }
    };
    if !std::path::Path::new(CONFIG_FILE).exists() {
        config.save().context("Failed to write default config")?;
        info!("Wrote default {}", CONFIG_FILE);
    }
    config.ensure_directories()?;

    let storage = NativeStorage::new(&config.storage_folder);
    let api = SkinstricClient::new(&config).context("Failed to build HTTP client")?;

    info!("Analysis endpoints: {} / {}", config.phase_one_url, config.phase_two_url);
    Walkthrough::new(&config, &api, &storage).run().await
}
