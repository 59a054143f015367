//! Outbound message transport to the paired peer.
//!
//! [`NetChannel`] is the only thing the bridge knows about the network: hand over one
//! message, block until it is written, get success or failure back. Retries and backoff
//! are not this layer's job.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use shared::{write_frame, NetMessage, WireError};

#[derive(thiserror::Error, Debug)]
pub enum SendError {
    #[error("peer {0} unreachable: {1}")]
    Unreachable(String, io::Error),

    #[error("failed to write {kind} to peer: {source}")]
    Write {
        kind: &'static str,
        #[source]
        source: WireError,
    },

    #[error("channel closed")]
    Closed,
}

pub trait NetChannel {
    /// Blocking, reliable, ordered send of a single message.
    fn send_synchronous(&mut self, msg: &NetMessage) -> Result<(), SendError>;

    /// Stop sending. Every later send fails with [`SendError::Closed`].
    fn close(&mut self) {}
}

/// [`NetChannel`] over a TCP stream to `peer`.
///
/// Connects lazily on the first send. Any write error drops the connection; the next send
/// tries to reconnect once.
pub struct TcpNetChannel {
    peer: String,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
    closed: bool,
}

impl TcpNetChannel {
    pub fn new(peer: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            peer: peer.into(),
            connect_timeout,
            stream: None,
            closed: false,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn resolve(&self) -> Result<SocketAddr, SendError> {
        self.peer
            .to_socket_addrs()
            .map_err(|e| SendError::Unreachable(self.peer.clone(), e))?
            .next()
            .ok_or_else(|| {
                SendError::Unreachable(
                    self.peer.clone(),
                    io::Error::new(io::ErrorKind::NotFound, "no address resolved"),
                )
            })
    }

    fn connect(&mut self) -> Result<&mut TcpStream, SendError> {
        if self.stream.is_none() {
            let addr = self.resolve()?;
            let stream = TcpStream::connect_timeout(&addr, self.connect_timeout)
                .map_err(|e| SendError::Unreachable(self.peer.clone(), e))?;
            // Messages are small and latency matters more than batching.
            stream
                .set_nodelay(true)
                .map_err(|e| SendError::Unreachable(self.peer.clone(), e))?;
            log::info!("connected to peer {}", self.peer);
            self.stream = Some(stream);
        }

        self.stream.as_mut().ok_or(SendError::Closed)
    }
}

impl NetChannel for TcpNetChannel {
    fn send_synchronous(&mut self, msg: &NetMessage) -> Result<(), SendError> {
        if self.closed {
            return Err(SendError::Closed);
        }

        let stream = self.connect()?;
        if let Err(source) = write_frame(stream, msg) {
            log::debug!("dropping connection to {} after write error", self.peer);
            self.stream = None;
            return Err(SendError::Write {
                kind: msg.kind(),
                source,
            });
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::info!("closed connection to peer {}", self.peer);
        }
        self.closed = true;
    }
}
