//! Tuning parameters for the simulation.
//!
//! Every constant the controllers use lives here. [`SimulationConfig::default`]
//! reproduces the stock feel; hosts can override any subset from a RON file,
//! since every struct is `#[serde(default)]`.

use std::path::Path;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::body::{BodyDesc, Shape};
use crate::error::{Error, Result};

/// All simulation tuning, grouped by subsystem.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub step: StepTuning,
    pub agent: AgentTuning,
    pub locomotion: LocomotionTuning,
    pub vehicle: VehicleTuning,
    pub proximity: ProximityTuning,
    pub camera: CameraTuning,
}

/// Frame timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepTuning {
    /// Fixed physics step (seconds).
    pub fixed_rate: f32,
    /// Maximum physics substeps per frame.
    pub max_substeps: u32,
    /// Upper bound on a frame's delta-time (seconds).
    pub max_delta: f32,
}

impl Default for StepTuning {
    fn default() -> Self {
        Self {
            fixed_rate: 1.0 / 60.0,
            max_substeps: 3,
            max_delta: 0.1,
        }
    }
}

/// The pedestrian's body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTuning {
    /// Mass in kg.
    pub mass: f32,
    /// Radius of each of the two capsule spheres.
    pub radius: f32,
    /// Vertical offset of each sphere from the body centre.
    pub sphere_offset: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Where the agent starts and where respawn puts it.
    pub spawn_point: Vec3,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            mass: 70.0,
            radius: 0.5,
            sphere_offset: 0.75,
            linear_damping: 0.1,
            angular_damping: 1.0,
            spawn_point: Vec3::new(0.0, 5.0, 10.0),
        }
    }
}

impl AgentTuning {
    /// Half of the capsule's vertical extent.
    pub fn half_height(&self) -> f32 {
        self.sphere_offset + self.radius
    }

    /// Two stacked spheres approximating a capsule.
    pub fn shapes(&self) -> Vec<Shape> {
        [self.sphere_offset, -self.sphere_offset]
            .into_iter()
            .map(|y| Shape::Sphere {
                radius: self.radius,
                offset: Vec3::new(0.0, y, 0.0),
            })
            .collect()
    }

    /// Body description for the agent at its spawn point.
    pub fn body_desc(&self) -> BodyDesc {
        BodyDesc {
            position: self.spawn_point,
            rotation: Quat::IDENTITY,
            mass: self.mass,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
            shapes: self.shapes(),
            lock_rotation: true,
        }
    }
}

/// Whether the jump key re-triggers while held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpPolicy {
    /// One jump per key press.
    #[default]
    EdgeTriggered,
    /// Jump again whenever grounded while the key is held.
    WhileHeld,
}

/// Walking, sprinting and jumping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionTuning {
    /// Base move force, scaled by delta-time before application.
    pub move_force: f32,
    /// Force multiplier while sprinting.
    pub sprint_multiplier: f32,
    /// Vertical velocity set on jump (m/s).
    pub jump_speed: f32,
    pub jump_policy: JumpPolicy,
    /// Probe length as a multiple of the agent's half-height.
    pub probe_factor: f32,
    /// Walk-cycle phase advance per second while moving.
    pub walk_cycle_rate: f32,
    /// Roll amplitude of the cosmetic lean (radians).
    pub lean_amplitude: f32,
    /// Vertical amplitude of the cosmetic bob.
    pub bob_amplitude: f32,
}

impl Default for LocomotionTuning {
    fn default() -> Self {
        Self {
            move_force: 40_000.0,
            sprint_multiplier: 2.0,
            jump_speed: 12.0,
            jump_policy: JumpPolicy::EdgeTriggered,
            probe_factor: 1.1,
            walk_cycle_rate: 10.0,
            lean_amplitude: 0.05,
            bob_amplitude: 0.02,
        }
    }
}

/// Vehicle bodies, engine and steering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    /// Mass in kg.
    pub mass: f32,
    /// Chassis box size (full extents).
    pub chassis_size: Vec3,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Forward engine force.
    pub acceleration_force: f32,
    /// Force opposing forward motion while braking.
    pub brake_force: f32,
    /// Reverse force as a fraction of the engine force.
    pub reverse_factor: f32,
    /// Forward speed above which the brake key brakes instead of reversing.
    pub brake_threshold: f32,
    /// Coefficient of the drag force `-velocity * drag`.
    pub drag: f32,
    /// Steering change per second while a steer key is held (rad/s).
    pub steer_rate: f32,
    /// Steering angle limit (radians).
    pub max_steer: f32,
    /// Per-tick multiplicative steering decay.
    pub steer_decay: f32,
    /// Yaw rate per radian of steering at full authority.
    pub steer_gain: f32,
    /// Forward speed at which steering reaches full authority (m/s).
    pub steer_reference_speed: f32,
    /// Rider placement on exit, in the vehicle's yaw frame.
    pub exit_offset: Vec3,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            mass: 400.0,
            chassis_size: Vec3::new(2.5, 1.2, 4.5),
            linear_damping: 0.1,
            angular_damping: 0.5,
            acceleration_force: 800.0,
            brake_force: 1200.0,
            reverse_factor: 0.7,
            brake_threshold: 0.1,
            drag: 0.5,
            steer_rate: 6.0,
            max_steer: 0.5,
            steer_decay: 0.85,
            steer_gain: 5.0,
            steer_reference_speed: 5.0,
            exit_offset: Vec3::new(3.0, 0.5, 0.0),
        }
    }
}

impl VehicleTuning {
    /// Half the chassis extents.
    pub fn half_extents(&self) -> Vec3 {
        self.chassis_size * 0.5
    }

    /// Body description for a vehicle resting on the ground at `ground_point`.
    pub fn body_desc(&self, ground_point: Vec3, yaw: f32) -> BodyDesc {
        let half = self.half_extents();
        BodyDesc {
            position: ground_point + Vec3::new(0.0, half.y, 0.0),
            rotation: Quat::from_rotation_y(yaw),
            mass: self.mass,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
            shapes: vec![Shape::Cuboid {
                half_extents: half,
                offset: Vec3::ZERO,
            }],
            lock_rotation: false,
        }
    }
}

/// Vehicle interaction range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityTuning {
    /// Vehicles strictly closer than this can be entered.
    pub radius: f32,
}

impl Default for ProximityTuning {
    fn default() -> Self {
        Self { radius: 5.0 }
    }
}

/// Follow camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraTuning {
    /// Radians per pixel of mouse movement.
    pub sensitivity: f32,
    /// Pitch limit (radians, symmetric).
    pub pitch_limit: f32,
    /// Fraction of the remaining distance covered each tick.
    pub smoothing: f32,
    /// Offset from the agent, rotated by the camera yaw.
    pub pedestrian_offset: Vec3,
    /// Offset from the vehicle, rotated by the vehicle.
    pub vehicle_offset: Vec3,
    /// Height above the vehicle centre the camera looks at.
    pub vehicle_look_height: f32,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            sensitivity: 0.002,
            pitch_limit: std::f32::consts::FRAC_PI_2,
            smoothing: 0.1,
            pedestrian_offset: Vec3::new(0.0, 2.5, 5.0),
            vehicle_offset: Vec3::new(0.0, 4.0, 8.0),
            vehicle_look_height: 0.6,
        }
    }
}

impl SimulationConfig {
    /// Parse a config from RON text. Missing fields take default values.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| Error::Parse {
            origin: "inline RON".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = ron::from_str(&text).map_err(|e| Error::Parse {
            origin: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::info!("Loaded simulation tuning from {}", path.display());
        Ok(config)
    }

    /// Serialize to pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            Error::Serialize {
                message: e.to_string(),
            }
        })
    }

    /// Reject values that would make the controllers misbehave.
    pub fn validate(&self) -> Result<()> {
        fn positive(field: &'static str, value: f32) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::invalid(field, format!("must be positive, got {value}")))
            }
        }

        positive("step.fixed_rate", self.step.fixed_rate)?;
        positive("step.max_delta", self.step.max_delta)?;
        if self.step.max_substeps == 0 {
            return Err(Error::invalid("step.max_substeps", "must be at least 1"));
        }

        positive("agent.mass", self.agent.mass)?;
        positive("agent.radius", self.agent.radius)?;
        positive("locomotion.probe_factor", self.locomotion.probe_factor)?;
        if self.locomotion.probe_factor <= 1.0 {
            return Err(Error::invalid(
                "locomotion.probe_factor",
                "probe must reach past the bottom of the agent",
            ));
        }

        positive("vehicle.mass", self.vehicle.mass)?;
        positive("vehicle.max_steer", self.vehicle.max_steer)?;
        positive("vehicle.steer_reference_speed", self.vehicle.steer_reference_speed)?;
        if !(0.0..=1.0).contains(&self.vehicle.steer_decay) {
            return Err(Error::invalid(
                "vehicle.steer_decay",
                format!("must be within [0, 1], got {}", self.vehicle.steer_decay),
            ));
        }
        if self.vehicle.chassis_size.min_element() <= 0.0 {
            return Err(Error::invalid("vehicle.chassis_size", "extents must be positive"));
        }

        positive("proximity.radius", self.proximity.radius)?;
        if !(0.0..=1.0).contains(&self.camera.smoothing) {
            return Err(Error::invalid(
                "camera.smoothing",
                format!("must be within [0, 1], got {}", self.camera.smoothing),
            ));
        }
        Ok(())
    }
}
