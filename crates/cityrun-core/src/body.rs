//! Rigid body handles, snapshots and shape descriptions.

use glam::{Quat, Vec3};

/// Opaque handle to a rigid body owned by a [`PhysicsWorld`](crate::PhysicsWorld).
///
/// Controllers hold handles, never the bodies themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

/// Snapshot of a rigid body's state, read through the physics world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    /// Centre of mass in world space.
    pub position: Vec3,
    /// Orientation in world space.
    pub rotation: Quat,
    /// Linear velocity in world space (m/s).
    pub linear_velocity: Vec3,
    /// Angular velocity in world space (rad/s).
    pub angular_velocity: Vec3,
    /// Mass in kg.
    pub mass: f32,
    /// Whether the body is excluded from integration.
    pub sleeping: bool,
}

impl BodyState {
    /// Create a resting body state at a position.
    pub fn at(position: Vec3, mass: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass,
            sleeping: false,
        }
    }

    /// Local forward axis in world space. Bodies face local -Z.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Linear velocity expressed in the body's own frame.
    pub fn local_velocity(&self) -> Vec3 {
        self.rotation.inverse() * self.linear_velocity
    }

    /// Signed speed along the local forward axis (positive = moving forward).
    pub fn forward_speed(&self) -> f32 {
        -self.local_velocity().z
    }

    /// Rotation about the vertical axis only, discarding pitch and roll.
    pub fn yaw_rotation(&self) -> Quat {
        let forward = self.forward();
        let flat = Vec3::new(forward.x, 0.0, forward.z);
        if flat.length_squared() < 1e-6 {
            return Quat::IDENTITY;
        }
        Quat::from_rotation_y(f32::atan2(-flat.x, -flat.z))
    }
}

/// Collision shape attached to a body, relative to its centre of mass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Sphere of `radius` centred at `offset`.
    Sphere { radius: f32, offset: Vec3 },
    /// Box with `half_extents` centred at `offset`.
    Cuboid { half_extents: Vec3, offset: Vec3 },
}

impl Shape {
    /// Distance from the body centre down to the lowest point of this shape.
    pub fn extent_below(&self, rotation: Quat) -> f32 {
        match *self {
            Shape::Sphere { radius, offset } => radius - (rotation * offset).y,
            Shape::Cuboid {
                half_extents,
                offset,
            } => {
                let centre = (rotation * offset).y;
                // Vertical half-extent of the rotated box.
                let col_x = (rotation * Vec3::X).y.abs() * half_extents.x;
                let col_y = (rotation * Vec3::Y).y.abs() * half_extents.y;
                let col_z = (rotation * Vec3::Z).y.abs() * half_extents.z;
                col_x + col_y + col_z - centre
            }
        }
    }

    /// World-space axis-aligned bounds of this shape.
    pub fn aabb(&self, position: Vec3, rotation: Quat) -> (Vec3, Vec3) {
        match *self {
            Shape::Sphere { radius, offset } => {
                let centre = position + rotation * offset;
                (centre - Vec3::splat(radius), centre + Vec3::splat(radius))
            }
            Shape::Cuboid {
                half_extents,
                offset,
            } => {
                let centre = position + rotation * offset;
                let axes = [rotation * Vec3::X, rotation * Vec3::Y, rotation * Vec3::Z];
                let extent = axes[0].abs() * half_extents.x
                    + axes[1].abs() * half_extents.y
                    + axes[2].abs() * half_extents.z;
                (centre - extent, centre + extent)
            }
        }
    }
}

/// Everything a host needs to create a dynamic body.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyDesc {
    pub position: Vec3,
    pub rotation: Quat,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub shapes: Vec<Shape>,
    /// Keep the body upright (no angular integration).
    pub lock_rotation: bool,
}

/// Cosmetic transform of a rendered entity.
///
/// Kept in sync with the owning body every tick; cosmetic offsets (walk bob,
/// lean) live here and never feed back into physics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub visible: bool,
}

impl Default for VisualTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            visible: true,
        }
    }
}

impl VisualTransform {
    /// Visual transform that coincides with a body.
    pub fn from_body(state: &BodyState) -> Self {
        Self {
            translation: state.position,
            rotation: state.rotation,
            visible: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn test_forward_speed_follows_rotation() {
        let mut state = BodyState::at(Vec3::ZERO, 1.0);
        state.linear_velocity = Vec3::new(0.0, 0.0, -4.0);
        assert!((state.forward_speed() - 4.0).abs() < 1e-5);

        // Turned 90 degrees left, forward is now -X.
        state.rotation = Quat::from_rotation_y(FRAC_PI_2);
        state.linear_velocity = Vec3::new(-3.0, 0.0, 0.0);
        assert!((state.forward_speed() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_yaw_rotation_discards_pitch() {
        let mut state = BodyState::at(Vec3::ZERO, 1.0);
        state.rotation = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(0.3);
        let yaw = state.yaw_rotation();
        let forward = yaw * Vec3::NEG_Z;
        assert!(forward.y.abs() < 1e-5);
        assert!((yaw.angle_between(Quat::from_rotation_y(0.7))).abs() < 1e-4);
    }

    #[test]
    fn test_extent_below_capsule_spheres() {
        let upper = Shape::Sphere {
            radius: 0.5,
            offset: Vec3::new(0.0, 0.75, 0.0),
        };
        let lower = Shape::Sphere {
            radius: 0.5,
            offset: Vec3::new(0.0, -0.75, 0.0),
        };
        assert!((lower.extent_below(Quat::IDENTITY) - 1.25).abs() < 1e-6);
        assert!((upper.extent_below(Quat::IDENTITY) + 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_extent_below_rotated_box() {
        let chassis = Shape::Cuboid {
            half_extents: Vec3::new(1.25, 0.6, 2.25),
            offset: Vec3::ZERO,
        };
        assert!((chassis.extent_below(Quat::IDENTITY) - 0.6).abs() < 1e-6);
        // Rolled onto its side, the half-width becomes the vertical extent.
        let rolled = Quat::from_rotation_z(FRAC_PI_2);
        assert!((chassis.extent_below(rolled) - 1.25).abs() < 1e-4);
    }
}
