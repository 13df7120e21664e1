use std::{net::SocketAddr, sync::Arc};

use axum::{routing::get, Router};
use lib::api::server::Server;
use tracing::Level;

use crate::{
    db::{DB, INPUTS_TREE},
    services::ledger::LedgerService,
    websocket::ws_handler,
};

pub mod connection;
pub mod connection_handler;
pub mod db;
pub mod error;
pub mod services;
pub mod websocket;

/// jemalloc is an allocator that is more efficient for the server.
#[cfg(feature = "jemalloc")]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Usage: `server [host[:port]]`. Listens on localhost by default.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise the logger
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .pretty()
        .init();

    let server = match std::env::args().nth(1) {
        Some(address) => Server::parse(&address)?,
        None => Server::localhost(),
    };

    start(&server).await
}

pub async fn start(server: &Server) -> Result<(), Box<dyn std::error::Error>> {
    let service = Arc::new(LedgerService::open(DB.open_tree(INPUTS_TREE)?)?);
    tracing::info!("Replayed {} accepted inputs", service.height());

    let app = Router::new()
        .route("/", get(ws_handler))
        .with_state(service);

    let listener = tokio::net::TcpListener::bind(server.url()).await?;
    tracing::info!("Listening on {}", server.ws_url());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
