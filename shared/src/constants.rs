use nalgebra::Vector3;

/// Magnitude of gravitational acceleration (m/s^2).
pub const GRAVITY_MPS2: f32 = 9.81;

/// Default gravity vector. The world is Z-up, so gravity pulls along -Z.
///
/// This is the only place the gravity axis is written down. Everything else reads the
/// configured value handed to `PhysicsWorld::init`.
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, 0.0, -GRAVITY_MPS2];

/// Upper bound for a single physics step (seconds).
///
/// Frame hitches longer than this are clamped so the solver never integrates a huge `dt`.
pub const MAX_STEP_SECONDS: f32 = 0.1;

/// The two fixed local ports used by the 2-node pairing scheme.
pub const PEER_PORT_A: u16 = 12682;
pub const PEER_PORT_B: u16 = 12683;

/// Default host for the paired peer.
pub const DEFAULT_PEER_HOST: &str = "127.0.0.1";

/// Largest accepted wire frame payload (bytes).
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Default drop zone for newly spawned objects (meters, Z-up).
pub const DEFAULT_DROP_POSITION: [f32; 3] = [20.0, 20.0, 100.0];

/// Model reference for the default spawned cube.
pub const CUBE_MODEL_REF: &str = "models/cube4x4x4redShinyPlastic_pp.wrl";

/// Model reference for the drop zone marker.
pub const MARKER_MODEL_REF: &str = "models/sphereYellow.wrl";

/// Model reference for the ground plane.
pub const GROUND_MODEL_REF: &str = "models/grassFloor400x400_pp.wrl";

/// Half extent of the default spawned cube (meters). The cube is 4m on a side.
pub const CUBE_HALF_EXTENT: f32 = 2.0;

/// Mass of the default spawned cube (kg): density 10 over a 4m cube.
pub const CUBE_MASS_KG: f32 = 10.0 * 4.0 * 4.0 * 4.0;

/// Default surface friction coefficient.
pub const DEFAULT_FRICTION: f32 = 0.5;

/// Default surface restitution (bounciness).
pub const DEFAULT_RESTITUTION: f32 = 0.2;

#[inline]
pub fn default_gravity() -> Vector3<f32> {
    Vector3::from(DEFAULT_GRAVITY)
}

/// Port the peer listening on `listen_port` should connect to.
///
/// A peer listening on [`PEER_PORT_B`] talks to [`PEER_PORT_A`]; every other peer talks
/// to [`PEER_PORT_B`].
#[inline]
pub fn paired_port(listen_port: u16) -> u16 {
    if listen_port == PEER_PORT_B {
        PEER_PORT_A
    } else {
        PEER_PORT_B
    }
}
