//! Creation and destruction of network-visible (body, scene object) pairs.
//!
//! Spawn order: scene object, then body, then binding, then the `SpawnObject` broadcast.
//! If any step after the scene object fails, everything created so far is removed again, so
//! the registry never holds half a pair.

use nalgebra::{Isometry3, Vector3};
use shared::{
    engine_pose, to_scene_transform, BodyDesc, BodyHandle, BodyShape, NetMessage, NetworkId,
    PhysicsError, PhysicsMaterial, SceneMatrix, Simulation, CUBE_HALF_EXTENT, CUBE_MASS_KG,
    CUBE_MODEL_REF,
};

use crate::net_channel::NetChannel;
use crate::registry::{ActorBindingRegistry, BindingError};
use crate::scene::{RenderWorld, SceneError, SceneObject};

/// Everything needed to spawn one replicated object.
#[derive(Clone, Debug)]
pub struct SpawnRequest {
    pub shape: BodyShape,
    pub pose: Isometry3<f32>,
    pub mass: f32,
    pub material: PhysicsMaterial,
    pub model_ref: String,
    pub scale: Vector3<f32>,
}

impl SpawnRequest {
    /// The default 4m cube dropped at `position`.
    pub fn cube_at(position: Vector3<f32>) -> Self {
        Self {
            shape: BodyShape::Cuboid {
                half_extents: Vector3::new(CUBE_HALF_EXTENT, CUBE_HALF_EXTENT, CUBE_HALF_EXTENT),
            },
            pose: Isometry3::translation(position.x, position.y, position.z),
            mass: CUBE_MASS_KG,
            material: PhysicsMaterial::default(),
            model_ref: CUBE_MODEL_REF.to_string(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.pose.translation.vector
    }

    /// Initial display transform, rotation included.
    pub fn scene_transform(&self) -> SceneMatrix {
        to_scene_transform(&engine_pose(&self.pose))
    }

    fn body_desc(&self) -> BodyDesc {
        BodyDesc::dynamic(self.shape.clone(), self.pose, self.mass).with_material(self.material)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SpawnError {
    #[error("spawn rejected: scene object creation failed: {0}")]
    SceneRejected(#[from] SceneError),

    #[error("spawn rejected: body creation failed: {0}")]
    BodyRejected(#[from] PhysicsError),

    /// Indicates a bookkeeping bug: freshly created objects were already bound.
    #[error("spawn aborted: {0}")]
    DuplicateBinding(#[from] BindingError),

    #[error("no replicated object with id {0}")]
    UnknownObject(NetworkId),
}

/// Creates and destroys replicated objects.
#[derive(Default)]
pub struct SpawnCoordinator {
    spawned: u64,
    rejected: u64,
}

impl SpawnCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Create a replicated object and announce it.
    ///
    /// A failed broadcast is logged but does not fail the spawn: local state is
    /// authoritative.
    pub fn spawn<S, R, N>(
        &mut self,
        request: &SpawnRequest,
        world: &mut S,
        registry: &mut ActorBindingRegistry,
        scene: &mut R,
        net: &mut N,
    ) -> Result<NetworkId, SpawnError>
    where
        S: Simulation + ?Sized,
        R: RenderWorld + ?Sized,
        N: NetChannel + ?Sized,
    {
        let result = Self::create(request, world, registry, scene);
        let network_id = match result {
            Ok(id) => id,
            Err(err) => {
                self.rejected += 1;
                log::warn!("{err}");
                return Err(err);
            }
        };
        self.spawned += 1;

        let position = request.position();
        log::info!(
            "spawned {} `{}` at ({:.2}, {:.2}, {:.2})",
            network_id,
            request.model_ref,
            position.x,
            position.y,
            position.z
        );

        let msg = NetMessage::SpawnObject {
            network_id,
            position,
            transform: request.scene_transform(),
            scale: request.scale,
            model_ref: request.model_ref.clone(),
        };
        if let Err(err) = net.send_synchronous(&msg) {
            log::warn!("spawn broadcast for {network_id} failed: {err}");
        }

        Ok(network_id)
    }

    fn create<S, R>(
        request: &SpawnRequest,
        world: &mut S,
        registry: &mut ActorBindingRegistry,
        scene: &mut R,
    ) -> Result<NetworkId, SpawnError>
    where
        S: Simulation + ?Sized,
        R: RenderWorld + ?Sized,
    {
        let object = SceneObject::new("replicated", request.model_ref.clone())
            .with_scale(request.scale)
            .with_transform(request.scene_transform());
        let scene_object = scene.add_object(object)?;

        let body = match world.add_body(&request.body_desc()) {
            Ok(body) => body,
            Err(err) => {
                log::debug!("rolling back scene object {scene_object:?}");
                scene.remove_object(scene_object);
                return Err(err.into());
            }
        };

        match registry.bind(body, scene_object) {
            Ok(id) => Ok(id),
            Err(err) => {
                log::error!("{err}");
                world.remove_body(body);
                scene.remove_object(scene_object);
                Err(err.into())
            }
        }
    }

    /// Destroy a replicated object: unbind it, retire its body, remove its scene object and
    /// announce the removal.
    pub fn despawn<S, R, N>(
        &mut self,
        network_id: NetworkId,
        world: &mut S,
        registry: &mut ActorBindingRegistry,
        scene: &mut R,
        net: &mut N,
    ) -> Result<(), SpawnError>
    where
        S: Simulation + ?Sized,
        R: RenderWorld + ?Sized,
        N: NetChannel + ?Sized,
    {
        let body: BodyHandle = registry
            .by_network_id(network_id)
            .map(|b| b.body)
            .ok_or(SpawnError::UnknownObject(network_id))?;

        let Some(binding) = registry.unbind(body) else {
            return Err(SpawnError::UnknownObject(network_id));
        };
        world.remove_body(binding.body);
        scene.remove_object(binding.scene_object);
        log::info!("despawned {network_id}");

        if let Err(err) = net.send_synchronous(&NetMessage::DespawnObject { network_id }) {
            log::warn!("despawn broadcast for {network_id} failed: {err}");
        }
        Ok(())
    }
}
