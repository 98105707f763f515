//! coto - HTTP query broker for MongoDB.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use coto_axum::cli::Cli;
use coto_axum::{drain_on, router, shutdown_signal};
use coto_mongodb::MongoClient;
use coto_query::{Broker, BrokerConfig, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init();

    if let Err(e) = run(cli).await {
        error!(error = %e, "coto terminated");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = BrokerConfig::from_env()?;
    let verbose = config.diagnostics.verbose;
    let broker = Arc::new(Broker::init(MongoClient::new(), config)?);

    let addr = cli.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        debug = verbose,
        "coto listening"
    );

    let served = axum::serve(listener, router(Arc::clone(&broker)))
        .with_graceful_shutdown(drain_on(Arc::clone(&broker), shutdown_signal()))
        .await;

    // Requests still running at the signal may have opened new connections.
    broker.shutdown().await;
    info!("coto stopped");

    served.map_err(Into::into)
}
