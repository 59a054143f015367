pub mod clock;
pub mod config;
pub mod host;
pub mod net_channel;
pub mod registry;
pub mod scene;
pub mod spawn;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, FixedClock, FrameClock};
pub use config::{BridgeConfig, ConfigError};
pub use host::{MapHandles, PhysicsModule, SimulationHost};
pub use net_channel::{NetChannel, SendError, TcpNetChannel};
pub use registry::{ActorBindingRegistry, Binding, BindingError};
pub use scene::{RenderWorld, SceneError, SceneGraph, SceneObject, SceneObjectId};
pub use spawn::{SpawnCoordinator, SpawnError, SpawnRequest};
pub use sync::{BridgePhase, FrameReport, SendFailure, SyncBridge, TickError};
