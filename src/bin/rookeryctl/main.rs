// Rookery Replay Tool
// "The keeper walks the roosts, counting what failed to fly"

mod cli;
mod ops;

use clap::Parser;
use cli::{Cli, Commands};
use rookery::config::{ConfigLoader, DlqConfig};
use rookery::logging::{init_logging, LoggingConfig};
use rookery::manager::DlqManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_file(path.clone()),
        None => ConfigLoader::new(),
    };

    // Default to warnings only so command output stays readable
    let mut logging: LoggingConfig = loader.load_section()?;
    logging.level = cli.log_level.clone().unwrap_or_else(|| "warn".to_string());
    init_logging(&logging)?;

    let mut config: DlqConfig = loader.load_section()?;

    if let Some(storage_path) = &cli.storage_path {
        config.storage_path = storage_path.clone();
    }

    let manager = DlqManager::with_file_store(config).await?;
    manager.start().await?;

    let output = match &cli.command {
        Commands::List { channel } => ops::handle_list(&manager, channel.as_deref()).await,
        Commands::Stats => ops::handle_stats(&manager).await,
        Commands::Replay { message_id } => ops::handle_replay(&manager, message_id).await,
        Commands::ReplayChannel { channel } => {
            ops::handle_replay_channel(&manager, channel).await
        }
        Commands::Clear => ops::handle_clear(&manager).await,
    };
    print!("{output}");

    // Exactly one subcommand per invocation; stop flushes state first
    manager.stop().await;

    Ok(())
}
