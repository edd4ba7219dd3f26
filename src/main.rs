use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ccna_tracker::{
    cli::{Cli, Command},
    commands,
    error::ServiceResult,
    server,
};

#[tokio::main]
async fn main() -> ServiceResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Serve(args) => server::start_server(args).await,
        Command::Init(args) => commands::init(args).await,
        Command::Board(command) => commands::board(command).await,
        Command::Status(args) => commands::status(args),
        Command::Version => {
            commands::version();
            Ok(())
        }
    }
}
