//! Webserver binary.
//!
//! Loads the configuration, serves an example outlet and stops on
//! SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use app_webserver::config::{load_config, AppConfig, PortSetting};
use app_webserver::http::ScopedOutlet;
use app_webserver::lifecycle::signals;
use app_webserver::observability::{logging, metrics};
use app_webserver::pipeline::PathFilter;
use app_webserver::{SharedOutlet, WebServer};
use axum::{extract::Path, routing::get, Json, Router};
use clap::Parser;
use serde_json::{json, Value};

#[derive(Debug, Parser)]
#[command(name = "app-webserver", version, about = "Pluggable HTTP(S) webserver")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `webserver.host`.
    #[arg(long)]
    host: Option<String>,

    /// Override `webserver.port`.
    #[arg(long)]
    port: Option<u16>,
}

async fn example(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "message": format!("example [{}] request successfully", id) }))
}

fn example_outlet() -> Result<SharedOutlet, Box<dyn std::error::Error>> {
    let routes = Router::new().route("/example/{id}", get(example));
    Ok(Arc::new(ScopedOutlet::new(
        PathFilter::parse(&["/example"])?,
        Arc::new(routes),
    )))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(host) = cli.host {
        config.webserver.host = Some(host);
    }
    if let Some(port) = cli.port {
        config.webserver.port = Some(PortSetting::from(port));
    }

    logging::init(&config.logging)?;
    metrics::describe();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "app-webserver starting");

    let server = WebServer::new(config.webserver);
    server.attach(&example_outlet()?);

    if let Some(addr) = server.start().await? {
        tracing::info!(address = %addr, protocol = server.protocol(), "Serving");
    }

    signals::wait_for_termination().await;

    server.stop().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
