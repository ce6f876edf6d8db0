use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use foliosync::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for foliosync::AppCommand {
    fn from(cmd: Commands) -> foliosync::AppCommand {
        match cmd {
            Commands::Summary => foliosync::AppCommand::Summary,
            Commands::Push => foliosync::AppCommand::Push,
            Commands::Pull => foliosync::AppCommand::Pull,
            Commands::Proxy => foliosync::AppCommand::Proxy,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display portfolio, allocation drift and sync status
    Summary,
    /// Save the portfolio to the cloud drive
    Push,
    /// Replace the portfolio with the cloud drive copy
    Pull,
    /// Run the development API proxy
    Proxy,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => foliosync::cli::setup::setup(),
        Some(cmd) => foliosync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
