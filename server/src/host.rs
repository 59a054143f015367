//! The simulation host: the object the outer update loop drives.
//!
//! [`PhysicsModule`] owns the physics world, the binding registry, the render world, the
//! network channel and the clock, and wires them together through [`SyncBridge`] and
//! [`SpawnCoordinator`]. Everything runs on the caller's thread; spawns and despawns happen
//! between ticks, never during one.

use nalgebra::{Isometry3, Vector3};
use shared::{
    constants::{GROUND_MODEL_REF, MARKER_MODEL_REF},
    BodyDesc, BodyHandle, BodyShape, NetMessage, NetworkId, Simulation,
};

use crate::clock::Clock;
use crate::net_channel::{NetChannel, SendError};
use crate::registry::ActorBindingRegistry;
use crate::scene::{RenderWorld, SceneObject, SceneObjectId};
use crate::spawn::{SpawnCoordinator, SpawnError, SpawnRequest};
use crate::sync::{FrameReport, SyncBridge, TickError};

/// Lifecycle hooks an update loop calls on a simulation.
pub trait SimulationHost {
    /// Advance one frame and publish the result.
    fn on_tick(&mut self) -> Result<FrameReport, TickError>;

    /// Create a replicated object.
    fn on_spawn_request(&mut self, request: SpawnRequest) -> Result<NetworkId, SpawnError>;

    /// Tear down. The host does nothing useful afterwards.
    fn on_shutdown(&mut self);
}

/// Static scene content the module builds at startup.
#[derive(Debug, Clone, Copy)]
pub struct MapHandles {
    /// Fixed ground body. Never bound, so never replicated.
    pub ground_body: BodyHandle,
    pub ground_object: SceneObjectId,
    /// Drop zone marker. Render-only.
    pub marker_object: SceneObjectId,
}

pub struct PhysicsModule<S, R, N, C> {
    world: S,
    registry: ActorBindingRegistry,
    scene: R,
    net: N,
    clock: C,
    bridge: SyncBridge,
    spawner: SpawnCoordinator,
    drop_position: Vector3<f32>,
    map: MapHandles,
}

impl<S, R, N, C> PhysicsModule<S, R, N, C>
where
    S: Simulation,
    R: RenderWorld,
    N: NetChannel,
    C: Clock,
{
    /// Build the module and its map: a ground plane at z = 0 and the drop zone marker.
    pub fn new(
        mut world: S,
        mut scene: R,
        net: N,
        clock: C,
        drop_position: Vector3<f32>,
    ) -> Result<Self, SpawnError> {
        let ground_object = scene.add_object(
            SceneObject::new("ground", GROUND_MODEL_REF).with_scale(Vector3::new(5.0, 5.0, 1.0)),
        )?;
        let ground_body = match world.add_body(&BodyDesc::fixed(
            BodyShape::Plane {
                normal: Vector3::z(),
            },
            Isometry3::identity(),
        )) {
            Ok(body) => body,
            Err(err) => {
                scene.remove_object(ground_object);
                return Err(err.into());
            }
        };

        let marker_object = scene.add_object(
            SceneObject::new("drop zone", MARKER_MODEL_REF)
                .with_scale(Vector3::new(0.25, 0.25, 0.25))
                .at(drop_position),
        )?;

        Ok(Self {
            world,
            registry: ActorBindingRegistry::new(),
            scene,
            net,
            clock,
            bridge: SyncBridge::new(),
            spawner: SpawnCoordinator::new(),
            drop_position,
            map: MapHandles {
                ground_body,
                ground_object,
                marker_object,
            },
        })
    }

    pub fn world(&self) -> &S {
        &self.world
    }

    pub fn registry(&self) -> &ActorBindingRegistry {
        &self.registry
    }

    pub fn scene(&self) -> &R {
        &self.scene
    }

    pub fn net(&self) -> &N {
        &self.net
    }

    pub fn bridge(&self) -> &SyncBridge {
        &self.bridge
    }

    pub fn map(&self) -> MapHandles {
        self.map
    }

    pub fn drop_position(&self) -> Vector3<f32> {
        self.drop_position
    }

    /// Move the drop zone, its marker, and tell the peer.
    pub fn move_marker(&mut self, position: Vector3<f32>) -> Result<(), SendError> {
        self.drop_position = position;
        self.scene.set_position(self.map.marker_object, position);
        self.scene.set_transform(
            self.map.marker_object,
            shared::SceneMatrix::from_position(position),
        );
        self.net
            .send_synchronous(&NetMessage::MoveMarker { position })
            .inspect_err(|err| log::warn!("marker broadcast failed: {err}"))
    }

    /// Drop the default cube at the drop zone.
    pub fn spawn_at_marker(&mut self) -> Result<NetworkId, SpawnError> {
        self.on_spawn_request(SpawnRequest::cube_at(self.drop_position))
    }

    pub fn despawn(&mut self, network_id: NetworkId) -> Result<(), SpawnError> {
        self.spawner.despawn(
            network_id,
            &mut self.world,
            &mut self.registry,
            &mut self.scene,
            &mut self.net,
        )
    }
}

impl<S, R, N, C> SimulationHost for PhysicsModule<S, R, N, C>
where
    S: Simulation,
    R: RenderWorld,
    N: NetChannel,
    C: Clock,
{
    fn on_tick(&mut self) -> Result<FrameReport, TickError> {
        let elapsed_ms = self.clock.elapsed_since_previous_physics_tick();
        self.bridge.tick(
            elapsed_ms,
            &mut self.world,
            &self.registry,
            &mut self.scene,
            &mut self.net,
        )
    }

    fn on_spawn_request(&mut self, request: SpawnRequest) -> Result<NetworkId, SpawnError> {
        self.spawner.spawn(
            &request,
            &mut self.world,
            &mut self.registry,
            &mut self.scene,
            &mut self.net,
        )
    }

    fn on_shutdown(&mut self) {
        log::info!(
            "shutting down after {} frames, {} live objects",
            self.bridge.frames(),
            self.registry.len()
        );
        self.registry.clear();
        self.world.shutdown();
        self.net.close();
    }
}
