mod entity;
mod net;
mod server;
mod side;
mod world;

use std::net::SocketAddr;
use std::sync::Arc;

use ember_config::CONFIG;
use simple_logger::SimpleLogger;

use crate::net::poll::PollGateway;
use crate::server::Server;

#[tokio::main]
async fn main() {
    SimpleLogger::new()
        .with_level(CONFIG.log_level())
        .init()
        .expect("logger init");

    let server = Server::new();
    let poll = Arc::new(PollGateway::new(server.clone()));

    tokio::spawn(world::simulator::run(server.clone()));
    tokio::spawn(world::presence::run_inactivity_sweep(server.clone()));
    tokio::spawn(world::elite::run_promoter(server.clone()));
    tokio::spawn(net::poll::run_sweep(poll.clone()));
    if let Some(url) = CONFIG.external_url.clone() {
        log::info!("self-ping enabled against {url}");
        tokio::spawn(net::keepalive::run(url));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], CONFIG.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|err| panic!("cannot bind {addr}: {err}"));
    log::info!(
        "ember listening on {addr} (tick {} Hz, player timeout {:?})",
        CONFIG.tick_hz,
        CONFIG.player_timeout
    );

    axum::serve(listener, net::http::router(server, poll))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    log::info!("shutdown signal received");
}
