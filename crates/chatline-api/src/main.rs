//! Chatline CLI and REST API entry point.
//!
//! Binary name: `chatline`
//!
//! Parses CLI arguments, loads `config.toml`, wires the conversation store and
//! reply generator, then starts the HTTP server or runs an inspection command.

mod cli;
mod http;
mod state;

use clap::Parser;

use chatline_infra::config::{load_global_config, resolve_data_dir};
use chatline_observe::tracing_setup::{
    TracingOptions, filter_for_verbosity, init_tracing, shutdown_tracing,
};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let tracing_options = TracingOptions::new(filter_for_verbosity(cli.verbose, cli.quiet))
        .json(cli.log_json)
        .otel(cli.otel);
    if let Err(e) = init_tracing(&tracing_options) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = resolve_data_dir();
    let mut config = load_global_config(&data_dir).await;
    cli.command.apply_overrides(&mut config);

    let state = AppState::init(data_dir, config).await?;

    match cli.command {
        Commands::Serve { .. } => serve(state, cli.quiet).await?,
        Commands::Conversations { user } => {
            cli::conversation::list_conversations(&state, user, cli.json).await?;
        }
        Commands::Messages { conversation } => {
            cli::message::list_messages(&state, conversation, cli.json).await?;
        }
    }

    Ok(())
}

async fn serve(state: AppState, quiet: bool) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        storage = ?state.chat_service.repo().backend(),
        failure_policy = %state.chat_service.settings().failure_policy,
        data_dir = %state.data_dir.display(),
        "Chatline API listening"
    );
    if !quiet {
        println!(
            "  {} Chatline API listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{addr}")).cyan()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
