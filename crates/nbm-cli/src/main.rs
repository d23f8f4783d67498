//! `nbm`, a command line harness for the NB Music session bootstrap

use clap::{CommandFactory, Parser};
use color_eyre::eyre::Result;
use tracing_subscriber::{
    EnvFilter, prelude::__tracing_subscriber_SubscriberExt as _, util::SubscriberInitExt as _,
};

use crate::{
    color::install_color_eyre,
    command::{Cli, CommandResult, Commands},
    session::SessionContext,
};

mod color;
mod command;
mod session;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // the log level hierarchy is determined by:
    //    - if RUST_LOG is detected at runtime
    //    - if RUST_LOG is provided at compile time
    //    - default to INFO
    let filter = EnvFilter::builder()
        .with_default_directive(option_env!("RUST_LOG").unwrap_or("info").parse()?)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    install_color_eyre(cli.color)?;

    let Some(command) = cli.command.clone() else {
        let mut cmd = Cli::command();
        cmd.print_help()?;
        return Ok(());
    };

    let output = process_commands(command, &cli).await?;
    println!("{output}");

    Ok(())
}

async fn process_commands(command: Commands, cli: &Cli) -> CommandResult {
    let context = SessionContext::new(cli)?;

    match command {
        Commands::Bootstrap => context.bootstrap().await,
        Commands::Fetch { url } => context.fetch(&url).await,
        Commands::Status => context.status().await,
        Commands::Clear => context.clear().await,
    }
}
