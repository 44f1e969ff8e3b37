//! Metasearch session core — HTTP server entry point.

use std::sync::Arc;

use clap::{Arg, Command};
use tokio::signal;
use tracing::{info, warn};

use pz_session::config::ServiceConfig;
use pz_session::session::SessionRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("pz-session")
        .version(pz_session::VERSION)
        .about("Session core for a metasearch aggregator")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Service configuration file path (TOML)"),
        )
        .arg(
            Arg::new("addr")
                .short('a')
                .long("addr")
                .value_name("ADDR")
                .default_value("0.0.0.0:8080")
                .help("Address to bind the HTTP server on"),
        )
        .get_matches();

    pz_session::init_tracing();
    info!("starting {} v{}", pz_session::NAME, pz_session::VERSION);

    let service = match matches.get_one::<String>("config") {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };

    let registry = Arc::new(SessionRegistry::new(Arc::new(service)));

    let addr = matches.get_one::<String>("addr").expect("has default").parse()?;
    let registry_for_server = registry.clone();
    let server_handle = tokio::spawn(async move {
        pz_session::api::start_server(addr, registry_for_server)
            .await
            .expect("HTTP server failed")
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            warn!("received shutdown signal");
        }
        _ = server_handle => {
            warn!("server terminated unexpectedly");
        }
    }

    info!("shutdown complete");
    Ok(())
}
