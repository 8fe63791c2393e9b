//! Third-person follow camera.
//!
//! On foot the user aims with the mouse and the camera trails behind the
//! agent along the view direction. While driving the camera sits behind the
//! vehicle in its own frame and looks at the roof; mouse look is ignored.

use glam::{EulerRot, Mat3, Quat, Vec2, Vec3};

use crate::body::BodyState;
use crate::config::CameraTuning;
use crate::mode::ControlMode;

/// Where the camera is and where it looks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Follow camera state.
#[derive(Clone, Debug)]
pub struct CameraRig {
    pub tuning: CameraTuning,
    /// Rotation about world Y (radians).
    pub yaw: f32,
    /// Rotation about the camera's X axis (radians), clamped.
    pub pitch: f32,
    position: Vec3,
    rotation: Quat,
    mode: ControlMode,
}

/// Rotation whose local -Z points from `eye` at `target`, keeping Y up.
fn look_rotation(eye: Vec3, target: Vec3) -> Option<Quat> {
    let forward = (target - eye).try_normalize()?;
    let right = forward.cross(Vec3::Y).try_normalize()?;
    let up = right.cross(forward);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, -forward)))
}

impl CameraRig {
    /// Camera already settled behind `target` on foot.
    pub fn new(tuning: CameraTuning, target: Vec3) -> Self {
        let position = target + tuning.pedestrian_offset;
        Self {
            tuning,
            yaw: 0.0,
            pitch: 0.0,
            position,
            rotation: Quat::IDENTITY,
            mode: ControlMode::Pedestrian,
        }
    }

    /// Yaw-only rotation used for camera-relative movement.
    pub fn heading(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    pub fn view(&self) -> CameraView {
        CameraView {
            position: self.position,
            rotation: self.rotation,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Switch framing. Returning to foot keeps the current view direction.
    pub fn set_mode(&mut self, mode: ControlMode) {
        if mode == self.mode {
            return;
        }
        if mode == ControlMode::Pedestrian {
            let (yaw, pitch, _) = self.rotation.to_euler(EulerRot::YXZ);
            self.yaw = yaw;
            self.pitch = pitch.clamp(-self.tuning.pitch_limit, self.tuning.pitch_limit);
        }
        self.mode = mode;
    }

    /// Apply mouse look and trail the agent.
    pub fn follow_agent(&mut self, target: Vec3, look_delta: Vec2) {
        let limit = self.tuning.pitch_limit;
        self.yaw -= look_delta.x * self.tuning.sensitivity;
        self.pitch = (self.pitch - look_delta.y * self.tuning.sensitivity).clamp(-limit, limit);
        self.rotation = Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0);

        let desired = target + self.heading() * self.tuning.pedestrian_offset;
        self.position = self.position.lerp(desired, self.tuning.smoothing);
    }

    /// Trail a vehicle in its own frame and look at it.
    pub fn follow_vehicle(&mut self, vehicle: &BodyState) {
        let desired = vehicle.position + vehicle.rotation * self.tuning.vehicle_offset;
        self.position = self.position.lerp(desired, self.tuning.smoothing);

        let target = vehicle.position + Vec3::Y * self.tuning.vehicle_look_height;
        if let Some(rotation) = look_rotation(self.position, target) {
            self.rotation = rotation;
        }
    }
}
