//! The seam between the core and a rigid-body physics engine.

use glam::Vec3;

use crate::body::{BodyHandle, BodyState};

/// Result of a closest-hit raycast.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RaycastHit {
    pub has_hit: bool,
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// The body that was hit, if it was a dynamic body.
    pub body: Option<BodyHandle>,
}

impl RaycastHit {
    /// A ray that hit nothing.
    pub const MISS: Self = Self {
        has_hit: false,
        distance: 0.0,
        body: None,
    };
}

/// A physics world the controllers can read from and write to.
///
/// Implementations own every body. Controllers refer to bodies by
/// [`BodyHandle`] and go through this trait for all reads and writes, so the
/// same controller code runs against avian3d in the client and against
/// [`FlatWorld`](crate::FlatWorld) headlessly.
pub trait PhysicsWorld {
    /// Advance the simulation by `dt` seconds using fixed steps of
    /// `fixed_rate` seconds, taking at most `max_substeps` steps.
    fn step(&mut self, fixed_rate: f32, dt: f32, max_substeps: u32);

    /// Closest hit along the segment `from → to`, ignoring `exclude`.
    fn raycast_closest(&self, from: Vec3, to: Vec3, exclude: Option<BodyHandle>) -> RaycastHit;

    /// Snapshot of a body, or `None` if the handle is unknown.
    fn body(&self, handle: BodyHandle) -> Option<BodyState>;

    /// Accumulate a force (N) at the body's centre of mass for the next step.
    fn apply_force(&mut self, handle: BodyHandle, force: Vec3);

    /// Teleport a body.
    fn set_position(&mut self, handle: BodyHandle, position: Vec3);

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3);

    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3);

    /// Exclude a body from (or return it to) integration and collision.
    fn set_sleeping(&mut self, handle: BodyHandle, sleeping: bool);
}
