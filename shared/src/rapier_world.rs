//! Rapier-backed simulation world for authoritative rigid-body physics.
//!
//! Design
//! - One [`PhysicsContext`] value holds every piece of engine state (pipeline, islands,
//!   broad/narrow phase, body/collider/joint sets, CCD solver). There is no global engine
//!   state; independent worlds can coexist, which tests rely on.
//! - [`PhysicsWorld`] owns at most one context for its whole lifetime. `init` creates it,
//!   `shutdown` releases it, and nothing re-creates it afterwards: every later call fails
//!   with [`PhysicsError::EngineUnavailable`]. Build a new world instead.
//! - After each step the world records the active set: the non-fixed bodies of the island
//!   manager's awake set, in the order the engine reports them.

// Re-export Rapier so downstream crates can use Rapier macros/types
// without needing to depend on `rapier3d` directly.
pub use rapier3d;

use rapier3d::na::{Isometry3, Matrix4, Vector3};
use rapier3d::prelude::*;

use crate::constants::MAX_STEP_SECONDS;
use crate::rapier::{BodyDesc, collider_from_desc, rigid_body_from_desc};

/// Opaque handle to a body inside the physics engine.
pub use rapier3d::dynamics::RigidBodyHandle as BodyHandle;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// The simulation context is missing: it failed to construct or was shut down.
    #[error("physics engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A body description was rejected before reaching the engine.
    #[error("invalid body: {0}")]
    InvalidBody(&'static str),

    /// The solver produced a state that cannot be continued.
    #[error("solver fault on body {body:?}: {reason}")]
    SolverFault { body: BodyHandle, reason: String },
}

/// Capability interface over a stepped rigid-body simulation.
///
/// This is what the sync bridge and the spawn flow depend on; [`PhysicsWorld`] is the
/// Rapier implementation.
pub trait Simulation {
    /// Advance the simulation by `dt_seconds`. Blocks until the solver is done.
    fn step(&mut self, dt_seconds: f32) -> Result<(), PhysicsError>;

    /// Bodies whose pose may have changed during the last step, in engine order.
    fn active_objects(&self) -> &[BodyHandle];

    /// Engine-native homogeneous transform of `body`, or `None` for unknown handles.
    fn engine_pose(&self, body: BodyHandle) -> Option<Matrix4<f32>>;

    fn add_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, PhysicsError>;

    /// Retire `body` and its colliders. Returns `false` if the handle was unknown.
    fn remove_body(&mut self, body: BodyHandle) -> bool;

    /// Release the engine. Outstanding handles become meaningless.
    fn shutdown(&mut self);
}

/// Startup parameters for a [`PhysicsWorld`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsSettings {
    /// Gravity acceleration vector (m/s^2).
    pub gravity: Vector3<f32>,
    /// Largest `dt` a single step may integrate (seconds).
    pub max_step_seconds: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: crate::constants::default_gravity(),
            max_step_seconds: MAX_STEP_SECONDS,
        }
    }
}

/// All engine state for one simulation.
pub struct PhysicsContext {
    pub gravity: Vector3<f32>,
    pub integration_parameters: IntegrationParameters,
    pub pipeline: PhysicsPipeline,
    pub islands: IslandManager,
    pub broad_phase: BroadPhaseBvh,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
}

impl PhysicsContext {
    pub fn create(gravity: Vector3<f32>) -> Result<Self, PhysicsError> {
        if gravity.iter().any(|c| !c.is_finite()) {
            return Err(PhysicsError::EngineUnavailable(format!(
                "gravity must be finite, got {gravity:?}"
            )));
        }

        Ok(Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        })
    }

    /// Run one solver step of `dt` seconds. `dt` must already be clamped.
    fn advance(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        // Using default hooks/events (none).
        let hooks = ();
        let events = ();

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &hooks,
            &events,
        );
    }

    fn isometry(&self, body: BodyHandle) -> Option<Isometry3<f32>> {
        let rb = self.bodies.get(body)?;
        Some(Isometry3::from_parts((*rb.translation()).into(), *rb.rotation()))
    }
}

/// Rapier implementation of [`Simulation`].
pub struct PhysicsWorld {
    context: Option<PhysicsContext>,
    active: Vec<BodyHandle>,
    max_step_seconds: f32,
}

impl PhysicsWorld {
    /// Create the simulation context.
    ///
    /// Each call produces an independent world; there is no process-wide engine to
    /// double-initialize.
    pub fn init(settings: PhysicsSettings) -> Result<Self, PhysicsError> {
        let context = PhysicsContext::create(settings.gravity)?;
        let max_step_seconds = if settings.max_step_seconds.is_finite() {
            settings.max_step_seconds.max(0.0)
        } else {
            MAX_STEP_SECONDS
        };

        log::info!(
            "physics world initialized, gravity {:?}, max step {}s",
            settings.gravity,
            max_step_seconds
        );

        Ok(Self {
            context: Some(context),
            active: Vec::new(),
            max_step_seconds,
        })
    }

    pub fn is_running(&self) -> bool {
        self.context.is_some()
    }

    pub fn gravity(&self) -> Option<Vector3<f32>> {
        self.context.as_ref().map(|c| c.gravity)
    }

    pub fn body_count(&self) -> usize {
        self.context.as_ref().map_or(0, |c| c.bodies.len())
    }

    pub fn contains(&self, body: BodyHandle) -> bool {
        self.context
            .as_ref()
            .is_some_and(|c| c.bodies.contains(body))
    }

    /// World-space pose of `body` as an isometry.
    pub fn isometry(&self, body: BodyHandle) -> Option<Isometry3<f32>> {
        self.context.as_ref()?.isometry(body)
    }

    /// Mutable access to a body, e.g. to push it with an impulse.
    pub fn body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        self.context.as_mut()?.bodies.get_mut(body)
    }

    /// Clamp a requested step to `[0, max_step_seconds]`; NaN becomes 0.
    pub fn clamp_dt(&self, dt_seconds: f32) -> f32 {
        if dt_seconds.is_finite() {
            dt_seconds.clamp(0.0, self.max_step_seconds)
        } else {
            0.0
        }
    }

    fn context_mut(&mut self) -> Result<&mut PhysicsContext, PhysicsError> {
        self.context
            .as_mut()
            .ok_or_else(|| PhysicsError::EngineUnavailable("physics world is shut down".into()))
    }

    fn collect_active(&mut self) -> Result<(), PhysicsError> {
        self.active.clear();
        let Some(context) = self.context.as_ref() else {
            return Ok(());
        };

        // Awake bodies only; sleeping islands are never visited.
        for &handle in context.islands.active_bodies() {
            let Some(rb) = context.bodies.get(handle) else {
                continue;
            };
            if rb.is_fixed() {
                continue;
            }

            let finite = rb.translation().iter().all(|c| c.is_finite())
                && rb.rotation().coords.iter().all(|c| c.is_finite());
            if !finite {
                return Err(PhysicsError::SolverFault {
                    body: handle,
                    reason: "non-finite pose after step".into(),
                });
            }

            self.active.push(handle);
        }
        Ok(())
    }
}

impl Simulation for PhysicsWorld {
    fn step(&mut self, dt_seconds: f32) -> Result<(), PhysicsError> {
        let dt = self.clamp_dt(dt_seconds);
        if self.context.is_none() {
            return Err(PhysicsError::EngineUnavailable(
                "physics world is shut down".into(),
            ));
        }

        if dt <= 0.0 {
            // Nothing advanced, so nothing moved.
            self.active.clear();
            return Ok(());
        }

        self.context_mut()?.advance(dt);

        if let Err(err) = self.collect_active() {
            self.active.clear();
            log::error!("physics step failed: {err}");
            return Err(err);
        }
        Ok(())
    }

    fn active_objects(&self) -> &[BodyHandle] {
        &self.active
    }

    fn engine_pose(&self, body: BodyHandle) -> Option<Matrix4<f32>> {
        self.isometry(body).map(|iso| iso.to_homogeneous())
    }

    fn add_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, PhysicsError> {
        let context = self.context_mut()?;
        desc.validate().map_err(PhysicsError::InvalidBody)?;

        let handle = context.bodies.insert(rigid_body_from_desc(desc));
        context
            .colliders
            .insert_with_parent(collider_from_desc(desc), handle, &mut context.bodies);
        Ok(handle)
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        let Some(context) = self.context.as_mut() else {
            return false;
        };

        let removed = context
            .bodies
            .remove(
                body,
                &mut context.islands,
                &mut context.colliders,
                &mut context.impulse_joints,
                &mut context.multibody_joints,
                true,
            )
            .is_some();

        if removed {
            self.active.retain(|&h| h != body);
        }
        removed
    }

    fn shutdown(&mut self) {
        if let Some(context) = self.context.take() {
            log::info!(
                "physics world shut down, releasing {} bodies",
                context.bodies.len()
            );
        }
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rapier::BodyShape;
    use rapier3d::na::{Translation3, UnitQuaternion};

    fn cube_at(x: f32, y: f32, z: f32) -> BodyDesc {
        BodyDesc::dynamic(
            BodyShape::Cuboid {
                half_extents: vector![2.0, 2.0, 2.0],
            },
            Isometry3::from_parts(Translation3::new(x, y, z), UnitQuaternion::identity()),
            640.0,
        )
    }

    fn ground() -> BodyDesc {
        BodyDesc::fixed(
            BodyShape::Plane {
                normal: vector![0.0, 0.0, 1.0],
            },
            Isometry3::identity(),
        )
    }

    fn world() -> PhysicsWorld {
        PhysicsWorld::init(PhysicsSettings::default()).expect("world")
    }

    #[test]
    fn non_finite_gravity_makes_engine_unavailable() {
        let settings = PhysicsSettings {
            gravity: Vector3::new(0.0, f32::NAN, 0.0),
            ..PhysicsSettings::default()
        };
        assert!(matches!(
            PhysicsWorld::init(settings),
            Err(PhysicsError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn dynamic_body_falls_along_gravity() {
        let mut world = world();
        let body = world.add_body(&cube_at(20.0, 20.0, 100.0)).unwrap();

        world.step(0.016).unwrap();

        let iso = world.isometry(body).unwrap();
        assert!(iso.translation.z < 100.0);
        assert!((iso.translation.x - 20.0).abs() < 1.0e-5);
        assert!((iso.translation.y - 20.0).abs() < 1.0e-5);
        assert_eq!(world.active_objects(), &[body]);
    }

    #[test]
    fn fixed_bodies_are_never_active() {
        let mut world = world();
        let plane = world.add_body(&ground()).unwrap();
        let cube = world.add_body(&cube_at(0.0, 0.0, 50.0)).unwrap();

        world.step(0.016).unwrap();

        assert!(!world.active_objects().contains(&plane));
        assert!(world.active_objects().contains(&cube));
    }

    #[test]
    fn active_set_keeps_engine_order() {
        let mut world = world();
        let a = world.add_body(&cube_at(0.0, 0.0, 50.0)).unwrap();
        let b = world.add_body(&cube_at(10.0, 0.0, 50.0)).unwrap();
        let c = world.add_body(&cube_at(20.0, 0.0, 50.0)).unwrap();

        world.step(0.016).unwrap();

        let expected: Vec<_> = world
            .context
            .as_ref()
            .unwrap()
            .islands
            .active_bodies()
            .to_vec();
        assert_eq!(world.active_objects(), expected.as_slice());
        assert_eq!(world.active_objects().len(), 3);
        for h in [a, b, c] {
            assert!(world.active_objects().contains(&h));
        }
    }

    #[test]
    fn step_dt_is_clamped() {
        let world = world();
        assert_eq!(world.clamp_dt(-1.0), 0.0);
        assert_eq!(world.clamp_dt(f32::NAN), 0.0);
        assert_eq!(world.clamp_dt(5.0), MAX_STEP_SECONDS);
        assert_eq!(world.clamp_dt(0.016), 0.016);
    }

    #[test]
    fn zero_step_does_not_move_anything() {
        let mut world = world();
        let body = world.add_body(&cube_at(0.0, 0.0, 50.0)).unwrap();
        world.step(0.016).unwrap();
        let before = world.isometry(body).unwrap();

        world.step(0.0).unwrap();

        assert!(world.active_objects().is_empty());
        assert_eq!(world.isometry(body).unwrap(), before);
    }

    #[test]
    fn invalid_bodies_are_rejected() {
        let mut world = world();
        let mut desc = cube_at(0.0, 0.0, 0.0);
        desc.mass = -1.0;
        assert!(matches!(
            world.add_body(&desc),
            Err(PhysicsError::InvalidBody(_))
        ));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn removed_bodies_leave_the_active_set() {
        let mut world = world();
        let body = world.add_body(&cube_at(0.0, 0.0, 50.0)).unwrap();
        world.step(0.016).unwrap();

        assert!(world.remove_body(body));
        assert!(!world.contains(body));
        assert!(world.active_objects().is_empty());
        assert!(!world.remove_body(body));
    }

    #[test]
    fn shutdown_invalidates_every_operation() {
        let mut world = world();
        let body = world.add_body(&cube_at(0.0, 0.0, 50.0)).unwrap();

        world.shutdown();

        assert!(!world.is_running());
        assert!(world.engine_pose(body).is_none());
        assert!(matches!(
            world.step(0.016),
            Err(PhysicsError::EngineUnavailable(_))
        ));
        assert!(matches!(
            world.add_body(&cube_at(0.0, 0.0, 0.0)),
            Err(PhysicsError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn non_finite_state_after_a_step_is_a_solver_fault() {
        let mut world = world();
        let healthy = world.add_body(&cube_at(50.0, 0.0, 50.0)).unwrap();
        let body = world
            .context
            .as_mut()
            .unwrap()
            .bodies
            .insert(RigidBodyBuilder::dynamic().pose(Isometry3::translation(0.0, 0.0, 10.0)));
        world
            .body_mut(body)
            .unwrap()
            .set_linvel(vector![f32::NAN, 0.0, 0.0], true);

        let err = world.step(0.016).unwrap_err();

        assert_eq!(
            err,
            PhysicsError::SolverFault {
                body,
                reason: "non-finite pose after step".into(),
            }
        );
        assert!(world.active_objects().is_empty());
        assert!(world.contains(healthy));
    }

    #[test]
    fn independent_worlds_do_not_share_bodies() {
        let mut a = world();
        let b = world();
        a.add_body(&cube_at(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(a.body_count(), 1);
        assert_eq!(b.body_count(), 0);
    }
}
