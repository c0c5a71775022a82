//! CLI entry point - the composition root.
//!
//! Command dispatch routes to handlers which delegate to the launcher built
//! by bootstrap.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use arcade_cli::{Cli, CliConfig, Commands, bootstrap, exit_code_for, handlers};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_level());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(u8::try_from(exit_code_for(&e)).unwrap_or(1))
        }
    }
}

/// `RUST_LOG` wins; otherwise `-v` picks the level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig {
        data_dir: cli.data_dir,
        install_root: cli.install_root,
        manifest: cli.manifest,
    };

    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    // Paths is diagnostic and must work when nothing else does
    if matches!(command, Commands::Paths) {
        return handlers::paths::execute(&config);
    }

    let ctx = bootstrap(config.clone()).await?;

    match command {
        Commands::Paths => handlers::paths::execute(&config),
        Commands::List => handlers::list::execute(&ctx).await,
        Commands::Install { package_id } => handlers::install::execute(&ctx, &package_id).await,
        Commands::Update { package_id } => handlers::update::execute(&ctx, &package_id).await,
        Commands::CheckUpdate {
            package_id,
            current,
            json,
        } => handlers::check_update::execute(&ctx, &package_id, current.as_deref(), json).await,
        Commands::Launch { package_id } => handlers::launch::execute(&ctx, &package_id).await,
        Commands::Repair { package_id } => handlers::repair::execute(&ctx, &package_id).await,
        Commands::Backups { package_id } => handlers::backups::execute(&ctx, &package_id).await,
        Commands::Restore {
            package_id,
            version,
        } => handlers::restore::execute(&ctx, &package_id, &version).await,
    }
}
