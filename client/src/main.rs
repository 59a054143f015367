use std::net::TcpListener;

use client::{ReplicaWorld, serve};
use shared::PEER_PORT_B;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = match std::env::var("NET_SERVER_LISTEN_PORT") {
        Ok(raw) => raw.trim().parse::<u16>()?,
        Err(_) => PEER_PORT_B,
    };
    let listener = TcpListener::bind(("127.0.0.1", port))?;
    log::info!("observer listening on {}", listener.local_addr()?);

    let mut replica = ReplicaWorld::new();
    serve(&listener, &mut replica);
    Ok(())
}
