//! Driving: steering, engine and drag for the driven vehicle.
//!
//! The steering model is arcade style. The steering angle drives the body's
//! yaw rate directly instead of turning wheels, and the engine pushes along
//! the chassis' forward axis.

use glam::Vec3;

use crate::body::{BodyHandle, BodyState, VisualTransform};
use crate::config::VehicleTuning;
use crate::input::{InputState, Key};
use crate::world::PhysicsWorld;

/// How a vehicle should be drawn. Only the host renderer interprets this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VehicleAppearance {
    /// Plain box in a `0xRRGGBB` colour.
    Colored(u32),
    /// Model asset path.
    Model(String),
}

/// A drivable vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    pub body: BodyHandle,
    /// Only the mode switch sets this.
    pub is_driven: bool,
    /// Current steering angle in radians; positive steers left.
    pub steering_angle: f32,
    /// Horizontal speed in km/h, refreshed while driven.
    pub speed_kmh: f32,
    pub appearance: VehicleAppearance,
    pub visual: VisualTransform,
}

impl Vehicle {
    pub fn new(body: BodyHandle, appearance: VehicleAppearance) -> Self {
        Self {
            body,
            is_driven: false,
            steering_angle: 0.0,
            speed_kmh: 0.0,
            appearance,
            visual: VisualTransform::default(),
        }
    }
}

/// Applies driver input to a vehicle body.
#[derive(Clone, Debug)]
pub struct VehicleController {
    pub tuning: VehicleTuning,
}

impl VehicleController {
    pub fn new(tuning: VehicleTuning) -> Self {
        Self { tuning }
    }

    /// Decay, then add input, then clamp.
    pub fn steer(&self, angle: f32, input: &InputState, dt: f32) -> f32 {
        let decayed = angle * self.tuning.steer_decay;
        let steered = decayed + input.axis(Key::Left, Key::Right) * self.tuning.steer_rate * dt;
        steered.clamp(-self.tuning.max_steer, self.tuning.max_steer)
    }

    /// Self-centering for vehicles nobody is steering.
    pub fn relax_steering(&self, vehicle: &mut Vehicle) {
        vehicle.steering_angle *= self.tuning.steer_decay;
    }

    /// Yaw rate for a steering angle at a signed forward speed.
    ///
    /// Authority grows linearly up to the reference speed and flips sign in
    /// reverse.
    pub fn yaw_rate(&self, angle: f32, forward_speed: f32) -> f32 {
        let authority = (forward_speed / self.tuning.steer_reference_speed).clamp(-1.0, 1.0);
        angle * self.tuning.steer_gain * authority
    }

    /// Engine force along the forward axis. The brake key wins over the
    /// accelerator.
    pub fn engine_force(&self, input: &InputState, forward_speed: f32) -> f32 {
        if input.pressed(Key::Back) {
            if forward_speed > self.tuning.brake_threshold {
                -self.tuning.brake_force
            } else {
                -self.tuning.acceleration_force * self.tuning.reverse_factor
            }
        } else if input.pressed(Key::Forward) {
            self.tuning.acceleration_force
        } else {
            0.0
        }
    }

    /// Horizontal speed in km/h.
    pub fn speed_kmh(velocity: Vec3) -> f32 {
        velocity.x.hypot(velocity.z) * 3.6
    }

    /// Run one tick for the driven vehicle.
    ///
    /// Returns the total force applied, or `None` if the body is missing.
    pub fn update(
        &self,
        vehicle: &mut Vehicle,
        world: &mut dyn PhysicsWorld,
        input: &InputState,
        dt: f32,
    ) -> Option<Vec3> {
        let Some(state) = world.body(vehicle.body) else {
            tracing::warn!("Vehicle body {:?} is missing; skipping drive", vehicle.body);
            return None;
        };

        let forward_speed = state.forward_speed();
        vehicle.steering_angle = self.steer(vehicle.steering_angle, input, dt);
        let mut angular = state.angular_velocity;
        angular.y = self.yaw_rate(vehicle.steering_angle, forward_speed);
        world.set_angular_velocity(vehicle.body, angular);

        let engine = state.forward() * self.engine_force(input, forward_speed);
        let drag = -state.linear_velocity * self.tuning.drag;
        let force = engine + drag;
        world.apply_force(vehicle.body, force);

        vehicle.speed_kmh = Self::speed_kmh(state.linear_velocity);
        Some(force)
    }

    /// Copy a vehicle's body transform to its visual.
    pub fn sync_visual(vehicle: &mut Vehicle, state: &BodyState) {
        vehicle.visual = VisualTransform::from_body(state);
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::flat_world::FlatWorld;

    fn controller() -> VehicleController {
        VehicleController::new(VehicleTuning::default())
    }

    fn spawn(world: &mut FlatWorld) -> Vehicle {
        let body = world.add_body(&VehicleTuning::default().body_desc(Vec3::ZERO, 0.0));
        let mut vehicle = Vehicle::new(body, VehicleAppearance::Colored(0xff0000));
        vehicle.is_driven = true;
        vehicle
    }

    #[test]
    fn test_steering_is_clamped() {
        let c = controller();
        let left = InputState::default().with_key(Key::Left);
        let mut angle = 0.0;
        for _ in 0..100 {
            angle = c.steer(angle, &left, 0.1);
            assert!(angle.abs() <= 0.5);
        }
        assert!((angle - 0.5).abs() < 1e-6);

        let right = InputState::default().with_key(Key::Right);
        for _ in 0..100 {
            angle = c.steer(angle, &right, 0.1);
        }
        assert!((angle + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_steering_decays_without_input() {
        let c = controller();
        let idle = InputState::default();
        let initial = 0.4_f32;
        let mut angle = initial;
        for n in 1..=10 {
            angle = c.steer(angle, &idle, 0.016);
            assert!(angle.abs() <= initial * 0.85_f32.powi(n) + 1e-6);
        }
    }

    #[test]
    fn test_yaw_rate_scales_with_forward_speed() {
        let c = controller();
        assert_eq!(c.yaw_rate(0.5, 0.0), 0.0);
        assert!((c.yaw_rate(0.5, 2.5) - 1.25).abs() < 1e-6);
        assert!((c.yaw_rate(0.5, 50.0) - 2.5).abs() < 1e-6);
        // Reversing turns the other way.
        assert!((c.yaw_rate(0.5, -5.0) + 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_engine_force_brake_then_reverse() {
        let c = controller();
        let accel = InputState::default().with_key(Key::Forward);
        let brake = InputState::default().with_key(Key::Back);
        let both = accel.clone().with_key(Key::Back);

        assert_eq!(c.engine_force(&accel, 0.0), 800.0);
        assert_eq!(c.engine_force(&brake, 3.0), -1200.0);
        assert!((c.engine_force(&brake, 0.05) + 560.0).abs() < 1e-3);
        assert_eq!(c.engine_force(&both, 3.0), -1200.0);
        assert_eq!(c.engine_force(&InputState::default(), 3.0), 0.0);
    }

    #[test]
    fn test_speed_kmh_ignores_vertical() {
        let speed = VehicleController::speed_kmh(Vec3::new(3.0, -20.0, 4.0));
        assert!((speed - 18.0).abs() < 1e-5);
    }

    #[test]
    fn test_update_pushes_along_chassis_forward() {
        let mut world = FlatWorld::new();
        let mut vehicle = spawn(&mut world);
        let accel = InputState::default().with_key(Key::Forward);

        let force = controller()
            .update(&mut vehicle, &mut world, &accel, 0.016)
            .unwrap();
        assert!((force - Vec3::new(0.0, 0.0, -800.0)).length() < 1e-3);

        // Turned half a circle, the same key pushes towards +Z.
        let mut rotated = FlatWorld::new();
        let mut desc = VehicleTuning::default().body_desc(Vec3::ZERO, 0.0);
        desc.rotation = Quat::from_rotation_y(std::f32::consts::PI);
        let body = rotated.add_body(&desc);
        let mut vehicle = Vehicle::new(body, VehicleAppearance::Colored(0));
        vehicle.is_driven = true;
        let force = controller()
            .update(&mut vehicle, &mut rotated, &accel, 0.016)
            .unwrap();
        assert!((force - Vec3::new(0.0, 0.0, 800.0)).length() < 1e-2);
    }

    #[test]
    fn test_drag_opposes_velocity() {
        let mut world = FlatWorld::new();
        let mut vehicle = spawn(&mut world);
        world.set_linear_velocity(vehicle.body, Vec3::new(4.0, 0.0, -2.0));

        let force = controller()
            .update(&mut vehicle, &mut world, &InputState::default(), 0.016)
            .unwrap();
        assert!((force - Vec3::new(-2.0, 0.0, 1.0)).length() < 1e-5);
        assert!((vehicle.speed_kmh - 20.0_f32.sqrt() * 3.6).abs() < 1e-4);
    }

    #[test]
    fn test_update_sets_only_vertical_spin() {
        let mut world = FlatWorld::new();
        let mut vehicle = spawn(&mut world);
        world.set_linear_velocity(vehicle.body, Vec3::new(0.0, 0.0, -10.0));
        world.set_angular_velocity(vehicle.body, Vec3::new(0.3, 0.0, -0.2));

        let left = InputState::default().with_key(Key::Left);
        controller().update(&mut vehicle, &mut world, &left, 0.05);

        let spin = world.body(vehicle.body).unwrap().angular_velocity;
        assert!((spin.x - 0.3).abs() < 1e-6);
        assert!((spin.z + 0.2).abs() < 1e-6);
        // 0.3 rad of steering at full authority.
        assert!((spin.y - 1.5).abs() < 1e-5);
    }
}
