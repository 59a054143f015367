//! Per-frame synchronization from the physics world to the scene and the network.
//!
//! One tick:
//! 1. Step the simulation by the elapsed time.
//! 2. Walk the active set in engine order (never re-sorted).
//! 3. For each active body with a binding: convert its pose, write transform and position to
//!    its scene object, and send an `OrientationUpdate` keyed by its network id.
//!    Bodies without a binding are skipped silently.
//!
//! Poses are applied only after the step has succeeded, so a failed step leaves the scene and
//! the registry exactly as they were. A failed step is terminal: the bridge moves to
//! [`BridgePhase::Halted`] and refuses every later tick.
//!
//! A failed send does not stop the frame. Failures are collected in the [`FrameReport`] and
//! logged once per frame.

use shared::{to_scene_transform, NetMessage, NetworkId, PhysicsError, Simulation};

use crate::clock::millis_to_seconds;
use crate::net_channel::{NetChannel, SendError};
use crate::registry::ActorBindingRegistry;
use crate::scene::RenderWorld;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgePhase {
    Idle,
    Stepping,
    /// A step failed; the simulation state cannot be trusted any more.
    Halted,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TickError {
    #[error("tick requested while another tick is in progress")]
    Reentrant,

    #[error("bridge halted after a physics failure")]
    Halted,

    #[error("physics step failed: {0}")]
    Step(#[from] PhysicsError),
}

/// One send that did not make it to the transport.
#[derive(Debug)]
pub struct SendFailure {
    pub network_id: NetworkId,
    pub error: SendError,
}

/// What one tick did.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub frame: u64,
    pub dt_seconds: f32,
    /// Bodies the engine reported as active.
    pub active: usize,
    /// Bodies whose pose was applied and broadcast (sent or failed).
    pub synced: usize,
    /// Active bodies with no binding.
    pub skipped: usize,
    pub send_failures: Vec<SendFailure>,
}

impl FrameReport {
    pub fn all_sent(&self) -> bool {
        self.send_failures.is_empty()
    }
}

pub struct SyncBridge {
    phase: BridgePhase,
    frame: u64,
}

impl Default for SyncBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncBridge {
    pub fn new() -> Self {
        Self {
            phase: BridgePhase::Idle,
            frame: 0,
        }
    }

    pub fn phase(&self) -> BridgePhase {
        self.phase
    }

    /// Number of completed ticks.
    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Run one frame. Blocks until the step is done and every message is handed over.
    pub fn tick<S, R, N>(
        &mut self,
        elapsed_ms: u32,
        world: &mut S,
        registry: &ActorBindingRegistry,
        scene: &mut R,
        net: &mut N,
    ) -> Result<FrameReport, TickError>
    where
        S: Simulation + ?Sized,
        R: RenderWorld + ?Sized,
        N: NetChannel + ?Sized,
    {
        match self.phase {
            BridgePhase::Idle => {}
            BridgePhase::Stepping => return Err(TickError::Reentrant),
            BridgePhase::Halted => return Err(TickError::Halted),
        }
        self.phase = BridgePhase::Stepping;

        let dt_seconds = millis_to_seconds(elapsed_ms);

        // ---------------------------------------------------------------------------------
        // Advance the simulation. Nothing below runs unless this succeeds.
        // ---------------------------------------------------------------------------------
        if let Err(err) = world.step(dt_seconds) {
            log::error!("frame {}: physics step failed, halting sync: {err}", self.frame);
            self.phase = BridgePhase::Halted;
            return Err(TickError::Step(err));
        }

        let mut report = FrameReport {
            frame: self.frame,
            dt_seconds,
            ..FrameReport::default()
        };

        // ---------------------------------------------------------------------------------
        // Apply and broadcast each active, bound body
        // ---------------------------------------------------------------------------------
        let active = world.active_objects();
        report.active = active.len();

        for &body in active {
            let Some(binding) = registry.resolve(body) else {
                report.skipped += 1;
                continue;
            };
            let Some(pose) = world.engine_pose(body) else {
                log::warn!(
                    "active body {:?} ({}) has no pose, skipping",
                    body,
                    binding.network_id
                );
                report.skipped += 1;
                continue;
            };

            let transform = to_scene_transform(&pose);
            let position = transform.translation();

            scene.set_transform(binding.scene_object, transform);
            scene.set_position(binding.scene_object, position);

            let msg = NetMessage::OrientationUpdate {
                network_id: binding.network_id,
                position,
                transform,
            };
            if let Err(error) = net.send_synchronous(&msg) {
                report.send_failures.push(SendFailure {
                    network_id: binding.network_id,
                    error,
                });
            }
            report.synced += 1;
        }

        if let Some(first) = report.send_failures.first() {
            log::warn!(
                "frame {}: {} of {} orientation updates failed to send (first: {} {})",
                report.frame,
                report.send_failures.len(),
                report.synced,
                first.network_id,
                first.error
            );
        }

        self.frame += 1;
        self.phase = BridgePhase::Idle;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneGraph, SceneObject, SceneObjectId};
    use crate::test_support::{cube_desc, physics_world, FaultyWorld, RecordingChannel};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use shared::{BodyHandle, SceneMatrix};

    fn bound_cube(
        world: &mut impl Simulation,
        registry: &mut ActorBindingRegistry,
        scene: &mut SceneGraph,
        position: Vector3<f32>,
    ) -> (BodyHandle, SceneObjectId, NetworkId) {
        let object = scene
            .add_object(SceneObject::new("cube", "models/cube.wrl").at(position))
            .unwrap();
        let body = world.add_body(&cube_desc(position)).unwrap();
        let id = registry.bind(body, object).unwrap();
        (body, object, id)
    }

    #[test]
    fn active_bound_body_is_applied_and_broadcast() {
        let mut world = physics_world();
        let mut registry = ActorBindingRegistry::new();
        let mut scene = SceneGraph::new();
        let mut net = RecordingChannel::default();
        let start = Vector3::new(20.0, 20.0, 100.0);
        let (_, object, id) = bound_cube(&mut world, &mut registry, &mut scene, start);

        let mut bridge = SyncBridge::new();
        let report = bridge
            .tick(16, &mut world, &registry, &mut scene, &mut net)
            .unwrap();

        assert_eq!(report.active, 1);
        assert_eq!(report.synced, 1);
        assert!(report.all_sent());
        assert_eq!(bridge.phase(), BridgePhase::Idle);

        let NetMessage::OrientationUpdate {
            network_id,
            position,
            transform,
        } = &net.sent[0]
        else {
            panic!("expected an orientation update, got {:?}", net.sent[0]);
        };
        assert_eq!(*network_id, id);
        assert_eq!(transform.translation(), *position);

        let applied = scene.get(object).unwrap();
        assert_eq!(applied.position, *position);
        assert_eq!(applied.transform, *transform);
        assert!(position.z < start.z);
    }

    #[test]
    fn active_body_without_binding_is_skipped_silently() {
        let mut world = physics_world();
        let registry = ActorBindingRegistry::new();
        let mut scene = SceneGraph::new();
        let mut net = RecordingChannel::default();
        world.add_body(&cube_desc(Vector3::new(0.0, 0.0, 50.0))).unwrap();

        let mut bridge = SyncBridge::new();
        let report = bridge
            .tick(16, &mut world, &registry, &mut scene, &mut net)
            .unwrap();

        assert_eq!(report.active, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.synced, 0);
        assert!(net.sent.is_empty());
        assert!(report.all_sent());
    }

    #[test]
    fn one_failed_send_does_not_abort_the_rest_of_the_frame() {
        let mut world = physics_world();
        let mut registry = ActorBindingRegistry::new();
        let mut scene = SceneGraph::new();
        for x in [0.0, 10.0, 20.0] {
            bound_cube(&mut world, &mut registry, &mut scene, Vector3::new(x, 0.0, 50.0));
        }
        let mut net = RecordingChannel::failing_at(&[0]);

        let mut bridge = SyncBridge::new();
        let report = bridge
            .tick(16, &mut world, &registry, &mut scene, &mut net)
            .unwrap();

        assert_eq!(report.synced, 3);
        assert_eq!(report.send_failures.len(), 1);
        assert_eq!(net.sent.len(), 2);

        // The body whose send failed still had its pose applied locally.
        let failed = registry
            .by_network_id(report.send_failures[0].network_id)
            .unwrap();
        let object = scene.get(failed.scene_object).unwrap();
        assert!(object.position.z < 50.0);
    }

    #[test]
    fn failed_step_applies_nothing_and_halts() {
        let mut world = FaultyWorld::new();
        let mut registry = ActorBindingRegistry::new();
        let mut scene = SceneGraph::new();
        let mut net = RecordingChannel::default();
        let start = Vector3::new(20.0, 20.0, 100.0);
        let (_, object, _) = bound_cube(&mut world, &mut registry, &mut scene, start);
        let before = scene.get(object).unwrap().clone();
        let bindings_before: Vec<_> = registry.iter().copied().collect();

        world.fail_next_step = true;
        let mut bridge = SyncBridge::new();
        let result = bridge.tick(16, &mut world, &registry, &mut scene, &mut net);

        assert!(matches!(
            result,
            Err(TickError::Step(PhysicsError::SolverFault { .. }))
        ));
        assert_eq!(scene.get(object).unwrap(), &before);
        assert_eq!(registry.iter().copied().collect::<Vec<_>>(), bindings_before);
        assert!(net.sent.is_empty());
        assert_eq!(bridge.phase(), BridgePhase::Halted);

        // Stepping failures are terminal.
        assert_eq!(
            bridge.tick(16, &mut world, &registry, &mut scene, &mut net).unwrap_err(),
            TickError::Halted
        );
        assert_eq!(bridge.frames(), 0);
    }

    #[test]
    fn tick_while_stepping_is_rejected() {
        let mut world = physics_world();
        let registry = ActorBindingRegistry::new();
        let mut scene = SceneGraph::new();
        let mut net = RecordingChannel::default();

        // A tick that unwound mid-frame leaves the bridge in `Stepping`.
        let mut bridge = SyncBridge::new();
        bridge.phase = BridgePhase::Stepping;

        assert_eq!(
            bridge.tick(16, &mut world, &registry, &mut scene, &mut net).unwrap_err(),
            TickError::Reentrant
        );
    }

    #[test]
    fn zero_elapsed_time_sends_nothing() {
        let mut world = physics_world();
        let mut registry = ActorBindingRegistry::new();
        let mut scene = SceneGraph::new();
        let mut net = RecordingChannel::default();
        let (_, object, _) = bound_cube(
            &mut world,
            &mut registry,
            &mut scene,
            Vector3::new(0.0, 0.0, 50.0),
        );

        let mut bridge = SyncBridge::new();
        let report = bridge
            .tick(0, &mut world, &registry, &mut scene, &mut net)
            .unwrap();

        assert_eq!(report.active, 0);
        assert!(net.sent.is_empty());
        assert_eq!(
            scene.get(object).unwrap().transform,
            SceneMatrix::from_position(Vector3::new(0.0, 0.0, 50.0))
        );
        assert_eq!(bridge.frames(), 1);
    }

    #[test]
    fn updates_follow_engine_order() {
        let mut world = physics_world();
        let mut registry = ActorBindingRegistry::new();
        let mut scene = SceneGraph::new();
        let mut net = RecordingChannel::default();
        for x in [0.0, 10.0, 20.0, 30.0] {
            bound_cube(&mut world, &mut registry, &mut scene, Vector3::new(x, 0.0, 50.0));
        }

        let mut bridge = SyncBridge::new();
        bridge
            .tick(16, &mut world, &registry, &mut scene, &mut net)
            .unwrap();

        let expected: Vec<_> = world
            .active_objects()
            .iter()
            .map(|&b| registry.resolve(b).unwrap().network_id)
            .collect();
        let sent: Vec<_> = net.sent.iter().filter_map(NetMessage::network_id).collect();
        assert_eq!(sent, expected);
    }

    #[test]
    fn sent_transform_is_the_converted_engine_pose() {
        let mut world = physics_world();
        let mut registry = ActorBindingRegistry::new();
        let mut scene = SceneGraph::new();
        let mut net = RecordingChannel::default();
        let (body, _, _) = bound_cube(
            &mut world,
            &mut registry,
            &mut scene,
            Vector3::new(1.0, 2.0, 30.0),
        );

        let mut bridge = SyncBridge::new();
        bridge
            .tick(16, &mut world, &registry, &mut scene, &mut net)
            .unwrap();

        let expected = to_scene_transform(&world.engine_pose(body).unwrap());
        let NetMessage::OrientationUpdate { transform, .. } = &net.sent[0] else {
            panic!("expected an orientation update");
        };
        for (a, e) in transform.as_array().iter().zip(expected.as_array()) {
            assert_relative_eq!(*a, *e, epsilon = 1.0e-5);
        }
    }
}
