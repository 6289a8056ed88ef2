use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info};

use chatrelay::{ChatServer, Config};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let mut config = if Path::new(CONFIG_PATH).exists() {
        match Config::load(CONFIG_PATH) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {CONFIG_PATH}: {e}");
                eprintln!("Using default configuration.");
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = chatrelay::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        chatrelay::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        "Chat relay configured on {}:{} (user count: {:?})",
        config.server.host, config.server.port, config.chat.user_count
    );

    match ChatServer::new(&config).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Chat server failed: {e}");
            ExitCode::FAILURE
        }
    }
}
