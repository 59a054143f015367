//! Observer-side mirror of the replicated objects.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use shared::{NetMessage, NetworkId, SceneMatrix};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicaError {
    #[error("{kind} for unknown object {network_id}")]
    UnknownObject {
        kind: &'static str,
        network_id: NetworkId,
    },

    #[error("object {0} spawned twice")]
    DuplicateSpawn(NetworkId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReplicaObject {
    pub model_ref: String,
    pub scale: Vector3<f32>,
    pub position: Vector3<f32>,
    pub transform: SceneMatrix,
    /// Number of orientation updates applied so far.
    pub updates: u64,
}

#[derive(Default, Debug)]
pub struct ReplicaWorld {
    objects: BTreeMap<NetworkId, ReplicaObject>,
    marker: Option<Vector3<f32>>,
}

impl ReplicaWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, msg: NetMessage) -> Result<(), ReplicaError> {
        match msg {
            NetMessage::SpawnObject {
                network_id,
                position,
                transform,
                scale,
                model_ref,
            } => {
                if self.objects.contains_key(&network_id) {
                    return Err(ReplicaError::DuplicateSpawn(network_id));
                }
                log::info!("replicating {network_id} `{model_ref}`");
                self.objects.insert(
                    network_id,
                    ReplicaObject {
                        model_ref,
                        scale,
                        position,
                        transform,
                        updates: 0,
                    },
                );
            }
            NetMessage::OrientationUpdate {
                network_id,
                position,
                transform,
            } => {
                let Some(object) = self.objects.get_mut(&network_id) else {
                    return Err(ReplicaError::UnknownObject {
                        kind: "OrientationUpdate",
                        network_id,
                    });
                };
                object.position = position;
                object.transform = transform;
                object.updates += 1;
            }
            NetMessage::MoveMarker { position } => {
                self.marker = Some(position);
            }
            NetMessage::DespawnObject { network_id } => {
                if self.objects.remove(&network_id).is_none() {
                    return Err(ReplicaError::UnknownObject {
                        kind: "DespawnObject",
                        network_id,
                    });
                }
                log::info!("dropped {network_id}");
            }
        }
        Ok(())
    }

    /// Forget every object and the marker.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.marker = None;
    }

    pub fn get(&self, network_id: NetworkId) -> Option<&ReplicaObject> {
        self.objects.get(&network_id)
    }

    pub fn marker(&self) -> Option<Vector3<f32>> {
        self.marker
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NetworkId, &ReplicaObject)> {
        self.objects.iter().map(|(id, obj)| (*id, obj))
    }
}
