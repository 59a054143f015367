//! Collaborator doubles shared by the unit tests.

use nalgebra::{Isometry3, Matrix4, Vector3};
use shared::{
    BodyDesc, BodyHandle, BodyShape, NetMessage, PhysicsError, PhysicsSettings, PhysicsWorld,
    Simulation, CUBE_HALF_EXTENT, CUBE_MASS_KG,
};

use crate::net_channel::{NetChannel, SendError};

/// Channel that records every message and can be told to fail specific sends.
#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Vec<NetMessage>,
    /// Zero-based send attempts that should fail.
    pub fail_attempts: Vec<usize>,
    pub fail_all: bool,
    pub closed: bool,
    attempts: usize,
}

impl RecordingChannel {
    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn failing_at(attempts: &[usize]) -> Self {
        Self {
            fail_attempts: attempts.to_vec(),
            ..Self::default()
        }
    }

    pub fn orientation_updates(&self) -> Vec<&NetMessage> {
        self.sent
            .iter()
            .filter(|m| matches!(m, NetMessage::OrientationUpdate { .. }))
            .collect()
    }
}

impl NetChannel for RecordingChannel {
    fn send_synchronous(&mut self, msg: &NetMessage) -> Result<(), SendError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.closed || self.fail_all || self.fail_attempts.contains(&attempt) {
            return Err(SendError::Closed);
        }
        self.sent.push(msg.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Real physics world whose next step can be made to fail.
pub struct FaultyWorld {
    pub inner: PhysicsWorld,
    pub fail_next_step: bool,
}

impl FaultyWorld {
    pub fn new() -> Self {
        Self {
            inner: physics_world(),
            fail_next_step: false,
        }
    }
}

impl Simulation for FaultyWorld {
    fn step(&mut self, dt_seconds: f32) -> Result<(), PhysicsError> {
        if std::mem::take(&mut self.fail_next_step) {
            let body = self
                .inner
                .active_objects()
                .first()
                .copied()
                .unwrap_or_else(BodyHandle::invalid);
            return Err(PhysicsError::SolverFault {
                body,
                reason: "injected fault".into(),
            });
        }
        self.inner.step(dt_seconds)
    }

    fn active_objects(&self) -> &[BodyHandle] {
        self.inner.active_objects()
    }

    fn engine_pose(&self, body: BodyHandle) -> Option<Matrix4<f32>> {
        self.inner.engine_pose(body)
    }

    fn add_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, PhysicsError> {
        self.inner.add_body(desc)
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        self.inner.remove_body(body)
    }

    fn shutdown(&mut self) {
        self.inner.shutdown()
    }
}

pub fn physics_world() -> PhysicsWorld {
    PhysicsWorld::init(PhysicsSettings::default()).unwrap()
}

pub fn cube_desc(position: Vector3<f32>) -> BodyDesc {
    BodyDesc::dynamic(
        BodyShape::Cuboid {
            half_extents: Vector3::new(CUBE_HALF_EXTENT, CUBE_HALF_EXTENT, CUBE_HALF_EXTENT),
        },
        Isometry3::translation(position.x, position.y, position.z),
        CUBE_MASS_KG,
    )
}
