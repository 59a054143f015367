pub mod constants;
pub mod net;
pub mod pose;
pub mod rapier;
pub mod rapier_world;
pub mod wire;

pub use constants::{
    CUBE_HALF_EXTENT, CUBE_MASS_KG, CUBE_MODEL_REF, DEFAULT_DROP_POSITION, DEFAULT_GRAVITY,
    DEFAULT_PEER_HOST, GRAVITY_MPS2, MAX_FRAME_LEN, MAX_STEP_SECONDS, PEER_PORT_A, PEER_PORT_B,
    paired_port,
};
pub use net::{NetMessage, NetworkId};
pub use pose::{EnginePose, SceneMatrix, engine_pose, to_scene_transform};
pub use rapier::{BodyDesc, BodyKind, BodyShape, PhysicsMaterial};
pub use rapier_world::{
    BodyHandle, PhysicsContext, PhysicsError, PhysicsSettings, PhysicsWorld, Simulation,
};
pub use wire::{WireError, encode_frame, read_frame, write_frame};
