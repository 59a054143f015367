use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::pose::SceneMatrix;

/// Stable identifier of a replicated object.
///
/// Assigned once, in increasing order starting at 0, and never reused. This is the only
/// object identity that crosses the wire; engine handles and scene keys stay local.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkId(pub u32);

impl NetworkId {
    pub const FIRST: NetworkId = NetworkId(0);

    #[inline]
    pub fn next(self) -> NetworkId {
        NetworkId(self.0 + 1)
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Messages exchanged between peers.
///
/// Transforms are always in the scene graph's layout (post-conversion).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NetMessage {
    /// New pose of a replicated object.
    OrientationUpdate {
        network_id: NetworkId,
        position: Vector3<f32>,
        transform: SceneMatrix,
    },
    /// A replicated object was created. Carries everything an observer needs to build its
    /// own copy without knowing any physics parameters.
    SpawnObject {
        network_id: NetworkId,
        position: Vector3<f32>,
        /// Initial display transform, rotation included.
        transform: SceneMatrix,
        scale: Vector3<f32>,
        model_ref: String,
    },
    /// The drop zone marker moved.
    MoveMarker { position: Vector3<f32> },
    /// A replicated object was destroyed.
    DespawnObject { network_id: NetworkId },
}

impl NetMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            NetMessage::OrientationUpdate { .. } => "OrientationUpdate",
            NetMessage::SpawnObject { .. } => "SpawnObject",
            NetMessage::MoveMarker { .. } => "MoveMarker",
            NetMessage::DespawnObject { .. } => "DespawnObject",
        }
    }

    /// Object this message is about, if any.
    pub fn network_id(&self) -> Option<NetworkId> {
        match self {
            NetMessage::OrientationUpdate { network_id, .. }
            | NetMessage::SpawnObject { network_id, .. }
            | NetMessage::DespawnObject { network_id } => Some(*network_id),
            NetMessage::MoveMarker { .. } => None,
        }
    }
}
