//! Pedestrian walking, sprinting and jumping.
//!
//! Movement is force based: the controller accumulates a horizontal force on
//! the agent's body each tick and lets the physics world integrate it. Jumps
//! set the vertical velocity directly. The walk cycle only ever touches the
//! visual transform.

use glam::{Quat, Vec3};

use crate::body::{BodyHandle, VisualTransform};
use crate::config::{AgentTuning, JumpPolicy, LocomotionTuning};
use crate::ground_probe::GroundProbe;
use crate::input::{InputState, Key};
use crate::world::PhysicsWorld;

/// The user-controlled pedestrian.
#[derive(Clone, Debug)]
pub struct Agent {
    pub body: BodyHandle,
    /// Result of this tick's ground probe.
    pub is_on_ground: bool,
    /// Set by the mode switch while the agent rides a vehicle.
    pub is_in_vehicle: bool,
    pub is_sprinting: bool,
    /// Phase of the cosmetic walk cycle (radians, unbounded).
    pub walk_cycle_phase: f32,
    pub visual: VisualTransform,
}

impl Agent {
    pub fn new(body: BodyHandle) -> Self {
        Self {
            body,
            is_on_ground: false,
            is_in_vehicle: false,
            is_sprinting: false,
            walk_cycle_phase: 0.0,
            visual: VisualTransform::default(),
        }
    }
}

/// What a locomotion tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LocomotionOutcome {
    /// Force accumulated on the body this tick.
    pub force: Vec3,
    pub jumped: bool,
}

/// Turns input into forces on the agent's body.
#[derive(Clone, Debug)]
pub struct LocomotionController {
    pub tuning: LocomotionTuning,
    pub probe: GroundProbe,
}

impl LocomotionController {
    pub fn new(agent: &AgentTuning, tuning: LocomotionTuning) -> Self {
        let probe = GroundProbe::for_agent(agent, &tuning);
        Self { tuning, probe }
    }

    /// Camera-relative move direction on the ground plane, unit length or zero.
    ///
    /// `heading` is the camera's yaw-only rotation; its forward axis is local -Z.
    pub fn move_intent(input: &InputState, heading: Quat) -> Vec3 {
        let forward = heading * Vec3::NEG_Z;
        let forward = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
        let left = Vec3::Y.cross(forward);

        let intent = forward * input.axis(Key::Forward, Key::Back)
            + left * input.axis(Key::Left, Key::Right);
        intent.normalize_or_zero()
    }

    /// Run one tick for the agent.
    ///
    /// `jump_edge` is whether the jump key went down this tick; it only
    /// matters under [`JumpPolicy::EdgeTriggered`].
    pub fn update(
        &self,
        agent: &mut Agent,
        world: &mut dyn PhysicsWorld,
        input: &InputState,
        jump_edge: bool,
        heading: Quat,
        dt: f32,
    ) -> LocomotionOutcome {
        if agent.is_in_vehicle {
            return LocomotionOutcome::default();
        }
        let Some(state) = world.body(agent.body) else {
            tracing::warn!("Agent body {:?} is missing; skipping locomotion", agent.body);
            return LocomotionOutcome::default();
        };

        agent.is_sprinting = input.pressed(Key::Sprint);

        let intent = Self::move_intent(input, heading);
        let mut magnitude = self.tuning.move_force;
        if agent.is_sprinting {
            magnitude *= self.tuning.sprint_multiplier;
        }
        let force = intent * magnitude * dt;
        if intent != Vec3::ZERO {
            world.apply_force(agent.body, force);
        }

        agent.is_on_ground = self.probe.probe(world, agent.body, state.position);
        let wants_jump = match self.tuning.jump_policy {
            JumpPolicy::EdgeTriggered => jump_edge,
            JumpPolicy::WhileHeld => input.pressed(Key::Jump),
        };
        let jumped = agent.is_on_ground && wants_jump;
        if jumped {
            let mut velocity = state.linear_velocity;
            velocity.y = self.tuning.jump_speed;
            world.set_linear_velocity(agent.body, velocity);
            agent.is_on_ground = false;
            tracing::debug!("Agent jumped at {:?}", state.position);
        }

        let walking = intent != Vec3::ZERO && agent.is_on_ground;
        if walking {
            agent.walk_cycle_phase += dt * self.tuning.walk_cycle_rate;
        }

        // Visual follows the body, plus the walk-cycle lean and bob.
        let (lean, bob) = if walking {
            let phase = agent.walk_cycle_phase;
            (
                phase.sin() * self.tuning.lean_amplitude,
                (2.0 * phase).sin() * self.tuning.bob_amplitude,
            )
        } else {
            (0.0, 0.0)
        };
        agent.visual = VisualTransform {
            translation: state.position + Vec3::Y * bob,
            rotation: heading * Quat::from_rotation_z(lean),
            visible: true,
        };

        LocomotionOutcome { force, jumped }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::config::SimulationConfig;
    use crate::flat_world::FlatWorld;

    struct Fixture {
        world: FlatWorld,
        agent: Agent,
        controller: LocomotionController,
    }

    fn fixture(position: Vec3, policy: JumpPolicy) -> Fixture {
        let mut config = SimulationConfig::default();
        config.locomotion.jump_policy = policy;
        let mut world = FlatWorld::new();
        let mut desc = config.agent.body_desc();
        desc.position = position;
        let body = world.add_body(&desc);
        Fixture {
            world,
            agent: Agent::new(body),
            controller: LocomotionController::new(&config.agent, config.locomotion),
        }
    }

    #[test]
    fn test_move_intent_is_camera_relative() {
        let forward = InputState::default().with_key(Key::Forward);
        let intent = LocomotionController::move_intent(&forward, Quat::IDENTITY);
        assert!((intent - Vec3::NEG_Z).length() < 1e-6);

        // Camera turned left by 90 degrees looks down -X.
        let turned = Quat::from_rotation_y(FRAC_PI_2);
        let intent = LocomotionController::move_intent(&forward, turned);
        assert!((intent - Vec3::NEG_X).length() < 1e-5);

        let left = InputState::default().with_key(Key::Left);
        let intent = LocomotionController::move_intent(&left, Quat::IDENTITY);
        assert!((intent - Vec3::NEG_X).length() < 1e-6);
    }

    #[test]
    fn test_diagonal_intent_is_normalized() {
        let input = InputState::default()
            .with_key(Key::Forward)
            .with_key(Key::Right);
        let intent = LocomotionController::move_intent(&input, Quat::IDENTITY);
        assert!((intent.length() - 1.0).abs() < 1e-6);
        assert!(intent.x > 0.0 && intent.z < 0.0);
    }

    #[test]
    fn test_forward_force_scales_with_dt() {
        let mut f = fixture(Vec3::new(0.0, 1.25, 0.0), JumpPolicy::EdgeTriggered);
        let input = InputState::default().with_key(Key::Forward);
        let outcome =
            f.controller
                .update(&mut f.agent, &mut f.world, &input, false, Quat::IDENTITY, 0.1);

        let expected = Vec3::new(0.0, 0.0, -4_000.0);
        assert!((outcome.force - expected).length() < 1e-3);
        assert!((f.world.accumulated_force(f.agent.body) - expected).length() < 1e-3);
    }

    #[test]
    fn test_sprint_doubles_force() {
        let mut f = fixture(Vec3::new(0.0, 1.25, 0.0), JumpPolicy::EdgeTriggered);
        let input = InputState::default()
            .with_key(Key::Forward)
            .with_key(Key::Sprint);
        let outcome =
            f.controller
                .update(&mut f.agent, &mut f.world, &input, false, Quat::IDENTITY, 0.1);
        assert!(f.agent.is_sprinting);
        assert!((outcome.force.length() - 8_000.0).abs() < 1e-2);
    }

    #[test]
    fn test_no_input_applies_no_force() {
        let mut f = fixture(Vec3::new(0.0, 1.25, 0.0), JumpPolicy::EdgeTriggered);
        let outcome = f.controller.update(
            &mut f.agent,
            &mut f.world,
            &InputState::default(),
            false,
            Quat::IDENTITY,
            0.016,
        );
        assert_eq!(outcome.force, Vec3::ZERO);
        assert_eq!(f.world.accumulated_force(f.agent.body), Vec3::ZERO);
        assert_eq!(f.agent.walk_cycle_phase, 0.0);
    }

    #[test]
    fn test_edge_triggered_jump_fires_once() {
        let mut f = fixture(Vec3::new(0.0, 1.25, 0.0), JumpPolicy::EdgeTriggered);
        let input = InputState::default().with_key(Key::Jump);

        let outcome =
            f.controller
                .update(&mut f.agent, &mut f.world, &input, true, Quat::IDENTITY, 0.016);
        assert!(outcome.jumped);
        assert!(!f.agent.is_on_ground);
        assert_eq!(f.world.body(f.agent.body).unwrap().linear_velocity.y, 12.0);

        // Still grounded, key still held, but no new edge.
        f.world.set_linear_velocity(f.agent.body, Vec3::ZERO);
        let outcome =
            f.controller
                .update(&mut f.agent, &mut f.world, &input, false, Quat::IDENTITY, 0.016);
        assert!(!outcome.jumped);
        assert!(f.agent.is_on_ground);
    }

    #[test]
    fn test_held_jump_retriggers_when_grounded() {
        let mut f = fixture(Vec3::new(0.0, 1.25, 0.0), JumpPolicy::WhileHeld);
        let input = InputState::default().with_key(Key::Jump);
        for _ in 0..2 {
            f.world.set_linear_velocity(f.agent.body, Vec3::ZERO);
            let outcome =
                f.controller
                    .update(&mut f.agent, &mut f.world, &input, false, Quat::IDENTITY, 0.016);
            assert!(outcome.jumped);
        }
    }

    #[test]
    fn test_no_jump_while_airborne() {
        let mut f = fixture(Vec3::new(0.0, 5.0, 0.0), JumpPolicy::WhileHeld);
        let input = InputState::default().with_key(Key::Jump);
        let outcome =
            f.controller
                .update(&mut f.agent, &mut f.world, &input, true, Quat::IDENTITY, 0.016);
        assert!(!outcome.jumped);
        assert_eq!(f.world.body(f.agent.body).unwrap().linear_velocity.y, 0.0);
    }

    #[test]
    fn test_walk_cycle_advances_only_when_grounded() {
        let input = InputState::default().with_key(Key::Forward);

        let mut grounded = fixture(Vec3::new(0.0, 1.25, 0.0), JumpPolicy::EdgeTriggered);
        grounded.controller.update(
            &mut grounded.agent,
            &mut grounded.world,
            &input,
            false,
            Quat::IDENTITY,
            0.05,
        );
        assert!((grounded.agent.walk_cycle_phase - 0.5).abs() < 1e-6);
        let bob = grounded.agent.visual.translation.y - 1.25;
        assert!((bob - 0.02 * 1.0_f32.sin()).abs() < 1e-5);

        let mut airborne = fixture(Vec3::new(0.0, 5.0, 0.0), JumpPolicy::EdgeTriggered);
        airborne.controller.update(
            &mut airborne.agent,
            &mut airborne.world,
            &input,
            false,
            Quat::IDENTITY,
            0.05,
        );
        assert_eq!(airborne.agent.walk_cycle_phase, 0.0);
    }

    #[test]
    fn test_airborne_visual_has_no_lean_or_bob() {
        let mut f = fixture(Vec3::new(0.0, 5.0, 0.0), JumpPolicy::EdgeTriggered);
        // Phase left over from walking before leaving the ground.
        f.agent.walk_cycle_phase = 1.0;
        let input = InputState::default().with_key(Key::Forward);
        f.controller
            .update(&mut f.agent, &mut f.world, &input, false, Quat::IDENTITY, 0.05);

        assert!(!f.agent.is_on_ground);
        assert_eq!(f.agent.walk_cycle_phase, 1.0);
        assert_eq!(f.agent.visual.translation, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(f.agent.visual.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_rider_is_not_driven() {
        let mut f = fixture(Vec3::new(0.0, 1.25, 0.0), JumpPolicy::EdgeTriggered);
        f.agent.is_in_vehicle = true;
        let input = InputState::default().with_key(Key::Forward);
        let outcome =
            f.controller
                .update(&mut f.agent, &mut f.world, &input, false, Quat::IDENTITY, 0.1);
        assert_eq!(outcome, LocomotionOutcome::default());
        assert_eq!(f.world.accumulated_force(f.agent.body), Vec3::ZERO);
    }
}
