pub mod observer;
pub mod replica;

pub use observer::{SessionStats, serve, serve_peer};
pub use replica::{ReplicaError, ReplicaObject, ReplicaWorld};
