use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use mx_http_gateway::{
    http::{router, App},
    sessions::Sessions,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address the HTTP server listens on.
    #[arg(long, default_value = "localhost:8000")]
    listen: String,
    /// MX server host, with an optional port.
    #[arg(long, default_value = "631hc.connector73.net")]
    mx: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "gateway failed");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let app = App {
        sessions: Arc::new(Sessions::default()),
        mx_host: Arc::from(args.mx.as_str()),
    };
    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("cannot bind http server on {}", args.listen))?;
    tracing::info!(listen = %args.listen, mx = %args.mx, "gateway started");

    let sessions = app.sessions.clone();
    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    // drop every upstream connection before exiting
    sessions.close_all();
    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
    }
}
