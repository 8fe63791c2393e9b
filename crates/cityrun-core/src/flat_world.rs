//! Headless physics world: a flat ground plane plus static boxes.
//!
//! Good enough to exercise the controllers without an engine. Bodies fall
//! under gravity, are damped the same way the client's engine damps them, and
//! rest on the ground plane or on top of static boxes. Body-body contacts are
//! not resolved and the ground is frictionless.

use glam::{Quat, Vec3};

use crate::body::{BodyDesc, BodyHandle, BodyState, Shape};
use crate::world::{PhysicsWorld, RaycastHit};

/// Standard gravity used by the city scene.
pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.82, 0.0);

#[derive(Clone, Debug)]
struct FlatBody {
    state: BodyState,
    linear_damping: f32,
    angular_damping: f32,
    shapes: Vec<Shape>,
    lock_rotation: bool,
    force: Vec3,
}

impl FlatBody {
    fn extent_below(&self) -> f32 {
        self.shapes
            .iter()
            .map(|shape| shape.extent_below(self.state.rotation))
            .fold(0.0, f32::max)
    }
}

/// Axis-aligned static obstacle.
#[derive(Clone, Copy, Debug, PartialEq)]
struct StaticBox {
    min: Vec3,
    max: Vec3,
}

/// A flat-plane physics world.
#[derive(Clone, Debug)]
pub struct FlatWorld {
    bodies: Vec<FlatBody>,
    statics: Vec<StaticBox>,
    /// Height of the ground plane.
    pub ground_height: f32,
    pub gravity: Vec3,
}

impl Default for FlatWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatWorld {
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            statics: Vec::new(),
            ground_height: 0.0,
            gravity: GRAVITY,
        }
    }

    /// Add a dynamic body and return its handle.
    pub fn add_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let handle = BodyHandle(u32::try_from(self.bodies.len()).unwrap_or(u32::MAX));
        let mut state = BodyState::at(desc.position, desc.mass);
        state.rotation = desc.rotation;
        self.bodies.push(FlatBody {
            state,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            shapes: desc.shapes.clone(),
            lock_rotation: desc.lock_rotation,
            force: Vec3::ZERO,
        });
        handle
    }

    /// Add an immovable axis-aligned box.
    pub fn add_static_box(&mut self, centre: Vec3, half_extents: Vec3) {
        self.statics.push(StaticBox {
            min: centre - half_extents,
            max: centre + half_extents,
        });
    }

    /// Force accumulated on a body since the last step.
    pub fn accumulated_force(&self, handle: BodyHandle) -> Vec3 {
        self.get(handle).map_or(Vec3::ZERO, |body| body.force)
    }

    fn get(&self, handle: BodyHandle) -> Option<&FlatBody> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|index| self.bodies.get(index))
    }

    fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut FlatBody> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|index| self.bodies.get_mut(index))
    }

    /// Highest supporting surface under a point whose bottom is at `bottom`.
    fn support_height(&self, position: Vec3, bottom: f32) -> f32 {
        self.statics
            .iter()
            .filter(|b| {
                position.x >= b.min.x
                    && position.x <= b.max.x
                    && position.z >= b.min.z
                    && position.z <= b.max.z
                    && bottom >= b.min.y
            })
            .map(|b| b.max.y)
            .fold(self.ground_height, f32::max)
    }

    fn integrate(&mut self, h: f32) {
        let gravity = self.gravity;
        for index in 0..self.bodies.len() {
            let body = &mut self.bodies[index];
            if body.state.sleeping {
                continue;
            }
            let state = &mut body.state;
            let acceleration = body.force / state.mass + gravity;
            state.linear_velocity += acceleration * h;
            state.linear_velocity *= (1.0 - body.linear_damping).powf(h);

            if body.lock_rotation {
                state.angular_velocity = Vec3::ZERO;
            } else {
                state.angular_velocity *= (1.0 - body.angular_damping).powf(h);
                let spin = state.angular_velocity * h;
                if spin.length_squared() > 0.0 {
                    state.rotation = (Quat::from_scaled_axis(spin) * state.rotation).normalize();
                }
            }
            state.position += state.linear_velocity * h;

            let below = body.extent_below();
            let position = body.state.position;
            let floor = self.support_height(position, position.y - below - 0.25);
            let body = &mut self.bodies[index];
            if body.state.position.y - below < floor {
                body.state.position.y = floor + below;
                body.state.linear_velocity.y = body.state.linear_velocity.y.max(0.0);
            }
        }
    }
}

/// Entry distance along `dir` (as a fraction of it) into an AABB, if the
/// segment `origin → origin + dir` crosses it.
fn segment_aabb(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_min = 0.0_f32;
    let mut t_max = 1.0_f32;
    for axis in 0..3 {
        let (o, d) = (origin[axis], dir[axis]);
        if d.abs() < f32::EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let (mut t0, mut t1) = ((min[axis] - o) / d, (max[axis] - o) / d);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }
    Some(t_min)
}

impl PhysicsWorld for FlatWorld {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn step(&mut self, fixed_rate: f32, dt: f32, max_substeps: u32) {
        if dt <= 0.0 || fixed_rate <= 0.0 {
            return;
        }
        let wanted = (dt / fixed_rate).ceil();
        let substeps = if wanted >= max_substeps as f32 {
            max_substeps.max(1)
        } else {
            (wanted as u32).max(1)
        };
        let h = dt / substeps as f32;
        for _ in 0..substeps {
            self.integrate(h);
        }
        for body in &mut self.bodies {
            body.force = Vec3::ZERO;
        }
    }

    fn raycast_closest(&self, from: Vec3, to: Vec3, exclude: Option<BodyHandle>) -> RaycastHit {
        let dir = to - from;
        let length = dir.length();
        let mut best: Option<(f32, Option<BodyHandle>)> = None;
        let mut consider = |t: f32, body: Option<BodyHandle>| {
            if best.is_none_or(|(current, _)| t < current) {
                best = Some((t, body));
            }
        };

        // Ground plane, hit from above.
        if from.y >= self.ground_height && to.y <= self.ground_height && from.y > to.y {
            consider((from.y - self.ground_height) / (from.y - to.y), None);
        }

        for b in &self.statics {
            if let Some(t) = segment_aabb(from, dir, b.min, b.max) {
                consider(t, None);
            }
        }

        for (index, body) in self.bodies.iter().enumerate() {
            let handle = BodyHandle(u32::try_from(index).unwrap_or(u32::MAX));
            if body.state.sleeping || exclude == Some(handle) {
                continue;
            }
            for shape in &body.shapes {
                let (min, max) = shape.aabb(body.state.position, body.state.rotation);
                if let Some(t) = segment_aabb(from, dir, min, max) {
                    consider(t, Some(handle));
                }
            }
        }

        best.map_or(RaycastHit::MISS, |(t, body)| RaycastHit {
            has_hit: true,
            distance: t * length,
            body,
        })
    }

    fn body(&self, handle: BodyHandle) -> Option<BodyState> {
        self.get(handle).map(|body| body.state)
    }

    fn apply_force(&mut self, handle: BodyHandle, force: Vec3) {
        if let Some(body) = self.get_mut(handle) {
            body.force += force;
        }
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec3) {
        if let Some(body) = self.get_mut(handle) {
            body.state.position = position;
        }
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.get_mut(handle) {
            body.state.linear_velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.get_mut(handle) {
            body.state.angular_velocity = velocity;
        }
    }

    fn set_sleeping(&mut self, handle: BodyHandle, sleeping: bool) {
        if let Some(body) = self.get_mut(handle) {
            body.state.sleeping = sleeping;
            body.force = Vec3::ZERO;
        }
    }
}
