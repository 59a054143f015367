//! Conversion from the physics engine's pose matrix to the scene graph's display matrix.
//!
//! # Engine convention
//! A pose is a homogeneous `Matrix4<f32>` (see [`engine_pose`]). `m[(r, c)]` is row `r`,
//! column `c`; the rotation block is `m[(0..3, 0..3)]` and the translation is column 3.
//!
//! # Scene convention
//! A [`SceneMatrix`] is 16 floats laid out as four quadruples:
//!
//! ```text
//! [ m00 m01 m02 m30 | m10 m11 m12 m31 | m20 m21 m22 m32 | m03 m13 m23 m33 ]
//! ```
//!
//! Quadruple `k < 3` is engine row `k` of the rotation block followed by `m(3, k)`; the last
//! quadruple is the translation followed by `m(3, 3)`. The position of an object is
//! elements 12..15.
//!
//! The conversion is a pure permutation. Nothing is normalized or re-orthogonalized, so a
//! scaled or sheared rotation block survives unchanged.

use nalgebra::{Isometry3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// Engine-native homogeneous transform.
pub type EnginePose = Matrix4<f32>;

/// Display transform in the scene graph's layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneMatrix(pub [f32; 16]);

impl SceneMatrix {
    pub const IDENTITY: SceneMatrix = SceneMatrix([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Identity rotation placed at `position`.
    pub fn from_position(position: Vector3<f32>) -> Self {
        let mut m = Self::IDENTITY;
        m.0[12] = position.x;
        m.0[13] = position.y;
        m.0[14] = position.z;
        m
    }

    /// Translation sub-vector, for use as the object's world position.
    #[inline]
    pub fn translation(&self) -> Vector3<f32> {
        Vector3::new(self.0[12], self.0[13], self.0[14])
    }

    #[inline]
    pub fn as_array(&self) -> &[f32; 16] {
        &self.0
    }
}

impl Default for SceneMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Homogeneous engine pose of a rigid-body isometry.
#[inline]
pub fn engine_pose(iso: &Isometry3<f32>) -> EnginePose {
    iso.to_homogeneous()
}

/// Remap an engine pose into the scene layout. Total and pure.
pub fn to_scene_transform(m: &EnginePose) -> SceneMatrix {
    SceneMatrix([
        m[(0, 0)],
        m[(0, 1)],
        m[(0, 2)],
        m[(3, 0)],
        m[(1, 0)],
        m[(1, 1)],
        m[(1, 2)],
        m[(3, 1)],
        m[(2, 0)],
        m[(2, 1)],
        m[(2, 2)],
        m[(3, 2)],
        m[(0, 3)],
        m[(1, 3)],
        m[(2, 3)],
        m[(3, 3)],
    ])
}
