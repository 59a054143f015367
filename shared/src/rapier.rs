use rapier3d::{na::Isometry3, prelude::*};

use crate::constants::{DEFAULT_FRICTION, DEFAULT_RESTITUTION};

/// Collision shape of a simulated body.
///
/// Units are meters. Shapes are expressed in the body's local frame; the body pose places
/// them in the world.
#[derive(Clone, Debug, PartialEq)]
pub enum BodyShape {
    /// Infinite plane (half-space) through the body origin.
    ///
    /// Infinite planes are only valid on fixed bodies.
    Plane {
        /// Outward normal in the body's local frame. Need not be unit length.
        normal: Vector<f32>,
    },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vector<f32> },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },

    /// Z-aligned capsule (meters).
    CapsuleZ { radius: f32, half_height: f32 },

    /// Y-aligned cylinder (meters).
    CylinderY { radius: f32, half_height: f32 },
}

impl BodyShape {
    /// Returns `true` when every dimension is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        match self {
            BodyShape::Plane { normal } => {
                normal.iter().all(|c| c.is_finite()) && normal.norm_squared() > 1.0e-12
            }
            BodyShape::Cuboid { half_extents } => half_extents.iter().all(|&c| positive(c)),
            BodyShape::Sphere { radius } => positive(*radius),
            BodyShape::CapsuleZ {
                radius,
                half_height,
            }
            | BodyShape::CylinderY {
                radius,
                half_height,
            } => positive(*radius) && positive(*half_height),
        }
    }

    /// Infinite shapes cannot carry mass.
    pub fn is_infinite(&self) -> bool {
        matches!(self, BodyShape::Plane { .. })
    }
}

/// Surface material of a collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            friction: DEFAULT_FRICTION,
            restitution: DEFAULT_RESTITUTION,
        }
    }
}

/// Whether a body is simulated or pinned in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Fixed,
}

/// Everything needed to create one rigid body.
#[derive(Clone, Debug)]
pub struct BodyDesc {
    pub shape: BodyShape,
    /// World-space pose of the body origin.
    pub pose: Isometry3<f32>,
    /// Total mass (kg). Ignored for fixed bodies.
    pub mass: f32,
    pub material: PhysicsMaterial,
    pub kind: BodyKind,
}

impl BodyDesc {
    pub fn dynamic(shape: BodyShape, pose: Isometry3<f32>, mass: f32) -> Self {
        Self {
            shape,
            pose,
            mass,
            material: PhysicsMaterial::default(),
            kind: BodyKind::Dynamic,
        }
    }

    pub fn fixed(shape: BodyShape, pose: Isometry3<f32>) -> Self {
        Self {
            shape,
            pose,
            mass: 0.0,
            material: PhysicsMaterial::default(),
            kind: BodyKind::Fixed,
        }
    }

    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    /// Why this description cannot become a body, if anything.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.shape.is_valid() {
            return Err("shape dimensions must be finite and positive");
        }
        if self.pose.translation.vector.iter().any(|c| !c.is_finite())
            || self.pose.rotation.coords.iter().any(|c| !c.is_finite())
        {
            return Err("pose must be finite");
        }
        if self.kind == BodyKind::Dynamic {
            if self.shape.is_infinite() {
                return Err("infinite shapes must be fixed");
            }
            if !self.mass.is_finite() || self.mass <= 0.0 {
                return Err("dynamic bodies need a finite positive mass");
            }
        }
        Ok(())
    }
}

/// Build the rigid body half of a [`BodyDesc`].
pub fn rigid_body_from_desc(desc: &BodyDesc) -> RigidBody {
    let builder = match desc.kind {
        BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        BodyKind::Fixed => RigidBodyBuilder::fixed(),
    };
    builder.pose(desc.pose).build()
}

/// Build a Rapier collider from a [`BodyDesc`].
///
/// The collider is attached with identity local transform, so the body pose is the
/// collider pose.
pub fn collider_from_desc(desc: &BodyDesc) -> Collider {
    let builder = match &desc.shape {
        BodyShape::Plane { normal } => {
            // Rapier's half-space expects a `UnitVector<Real>`; `validate` rejected zero normals.
            let unit_n = UnitVector::new_normalize(*normal);
            ColliderBuilder::new(SharedShape::new(HalfSpace::new(unit_n)))
        }

        BodyShape::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }

        BodyShape::Sphere { radius } => ColliderBuilder::ball(*radius),

        BodyShape::CapsuleZ {
            radius,
            half_height,
        } => ColliderBuilder::capsule_z(*half_height, *radius),

        BodyShape::CylinderY {
            radius,
            half_height,
        } => ColliderBuilder::cylinder(*half_height, *radius),
    };

    let builder = builder
        .friction(desc.material.friction)
        .restitution(desc.material.restitution);

    match desc.kind {
        BodyKind::Dynamic => builder.mass(desc.mass).build(),
        BodyKind::Fixed => builder.build(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::na::{Translation3, UnitQuaternion};

    fn at(x: f32, y: f32, z: f32) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::new(x, y, z), UnitQuaternion::identity())
    }

    fn cube() -> BodyShape {
        BodyShape::Cuboid {
            half_extents: vector![2.0, 2.0, 2.0],
        }
    }

    #[test]
    fn dynamic_body_requires_positive_mass() {
        assert!(BodyDesc::dynamic(cube(), at(0.0, 0.0, 0.0), 640.0).validate().is_ok());
        assert!(BodyDesc::dynamic(cube(), at(0.0, 0.0, 0.0), 0.0).validate().is_err());
        assert!(BodyDesc::dynamic(cube(), at(0.0, 0.0, 0.0), -1.0).validate().is_err());
        assert!(
            BodyDesc::dynamic(cube(), at(0.0, 0.0, 0.0), f32::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn planes_must_be_fixed() {
        let plane = BodyShape::Plane {
            normal: vector![0.0, 0.0, 1.0],
        };
        assert!(BodyDesc::fixed(plane.clone(), at(0.0, 0.0, 0.0)).validate().is_ok());
        assert!(BodyDesc::dynamic(plane, at(0.0, 0.0, 0.0), 1.0).validate().is_err());
    }

    #[test]
    fn degenerate_shapes_are_rejected() {
        let zero_normal = BodyShape::Plane {
            normal: vector![0.0, 0.0, 0.0],
        };
        assert!(!zero_normal.is_valid());
        assert!(!BodyShape::Sphere { radius: 0.0 }.is_valid());
        assert!(
            !BodyShape::Cuboid {
                half_extents: vector![1.0, f32::INFINITY, 1.0]
            }
            .is_valid()
        );
        assert!(
            BodyShape::CapsuleZ {
                radius: 0.5,
                half_height: 1.0
            }
            .is_valid()
        );
    }

    #[test]
    fn collider_carries_requested_mass_and_material() {
        let material = PhysicsMaterial {
            friction: 0.7,
            restitution: 0.1,
        };
        let desc = BodyDesc::dynamic(cube(), at(1.0, 2.0, 3.0), 640.0).with_material(material);
        let collider = collider_from_desc(&desc);

        assert!((collider.mass() - 640.0).abs() < 1.0e-3);
        assert_eq!(collider.friction(), 0.7);
        assert_eq!(collider.restitution(), 0.1);
    }
}
