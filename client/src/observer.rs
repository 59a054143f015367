//! TCP listener side: accepts the bridge's connection and feeds frames into a replica.

use std::io::BufReader;
use std::net::{TcpListener, TcpStream};

use shared::{WireError, read_frame};

use crate::replica::ReplicaWorld;

/// What one peer connection delivered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub applied: u64,
    pub rejected: u64,
}

/// Apply every frame from `stream` until the peer closes it.
///
/// Each session starts from an empty replica, since a reconnecting peer replays its objects
/// from id 0. Messages the replica rejects are logged and skipped. A broken or malformed
/// stream ends the session with an error.
pub fn serve_peer(
    stream: TcpStream,
    replica: &mut ReplicaWorld,
) -> Result<SessionStats, WireError> {
    replica.clear();
    let mut reader = BufReader::new(stream);
    let mut stats = SessionStats::default();

    while let Some(msg) = read_frame(&mut reader)? {
        let kind = msg.kind();
        match replica.apply(msg) {
            Ok(()) => stats.applied += 1,
            Err(err) => {
                stats.rejected += 1;
                log::warn!("ignoring {kind}: {err}");
            }
        }
    }
    Ok(stats)
}

/// Accept peers one at a time, forever. A failed accept is logged and skipped.
pub fn serve(listener: &TcpListener, replica: &mut ReplicaWorld) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!("accept failed: {err}");
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".into());
        log::info!("peer {peer} connected");

        match serve_peer(stream, replica) {
            Ok(stats) => log::info!(
                "peer {peer} disconnected: {} applied, {} rejected, {} objects live",
                stats.applied,
                stats.rejected,
                replica.len()
            ),
            Err(err) => log::warn!("peer {peer} dropped: {err}"),
        }
    }
}
