//! voltdoor - front door for VoltLink

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voltdoor::{App, Args, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("voltdoor={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Listen: {}", args.listen);
    info!("Static dir: {}", args.static_dir().display());
    info!("Content graph: {}", args.graphql_url());

    let app = Arc::new(App::from_args(&args)?);

    // Classification is meaningless without the directory listing.
    if let Err(e) = app.assets().warm().await {
        error!("{}", e);
        std::process::exit(1);
    }

    Server::bind(args.listen).serve(app.router()).await?;
    Ok(())
}
