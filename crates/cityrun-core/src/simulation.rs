//! The per-frame tick tying every controller together.
//!
//! Order within a tick:
//!
//! 1. step physics (only in [`Simulation::tick`])
//! 2. respawn on its key edge, on foot only
//! 3. the controller holding authority reads input and applies forces
//! 4. the mode switch reacts to the interact edge
//! 5. a riding agent is moved onto its vehicle
//! 6. the proximity scan refreshes the enter candidate
//! 7. the camera follows whatever is controlled

use glam::Vec3;

use crate::body::{BodyHandle, VisualTransform};
use crate::camera::{CameraRig, CameraView};
use crate::config::SimulationConfig;
use crate::input::{InputState, Key, KeyEdges};
use crate::locomotion::{Agent, LocomotionController};
use crate::mode::{ControlAuthority, ControlMode, ModeSwitch, ModeTransition};
use crate::proximity::{ProximityResult, ProximityScanner};
use crate::vehicle::{Vehicle, VehicleAppearance, VehicleController};
use crate::world::PhysicsWorld;

/// Snapshot of what the HUD shows.
#[derive(Clone, Debug, PartialEq)]
pub struct HudStatus {
    pub mode: ControlMode,
    pub mode_label: &'static str,
    /// Whether the "press F" prompt is visible.
    pub can_interact: bool,
    /// Driven vehicle speed rounded to whole km/h; zero on foot.
    pub speed_kmh: i32,
    pub held_keys: Vec<Key>,
}

impl HudStatus {
    /// Debug line such as `W:1 A:0 S:0 D:0 SPACE:0`.
    pub fn key_readout(&self) -> String {
        [Key::Forward, Key::Left, Key::Back, Key::Right, Key::Jump]
            .into_iter()
            .map(|key| format!("{}:{}", key.label(), u8::from(self.held_keys.contains(&key))))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Owns all controller state. Bodies stay in the physics world.
#[derive(Clone, Debug)]
pub struct Simulation {
    config: SimulationConfig,
    agent: Agent,
    vehicles: Vec<Vehicle>,
    locomotion: LocomotionController,
    driving: VehicleController,
    mode_switch: ModeSwitch,
    scanner: ProximityScanner,
    proximity: ProximityResult,
    camera: CameraRig,
    edges: KeyEdges,
    held_keys: Vec<Key>,
}

impl Simulation {
    /// Create a simulation controlling the agent body `agent_body`.
    pub fn new(config: SimulationConfig, agent_body: BodyHandle) -> Self {
        let locomotion = LocomotionController::new(&config.agent, config.locomotion.clone());
        let driving = VehicleController::new(config.vehicle.clone());
        let mode_switch = ModeSwitch::for_bodies(
            config.vehicle.exit_offset,
            config.agent.half_height(),
            config.vehicle.half_extents().y,
        );
        let scanner = ProximityScanner::new(config.proximity.radius);
        let camera = CameraRig::new(config.camera.clone(), config.agent.spawn_point);
        let mut agent = Agent::new(agent_body);
        agent.visual.translation = config.agent.spawn_point;

        Self {
            config,
            agent,
            vehicles: Vec::new(),
            locomotion,
            driving,
            mode_switch,
            scanner,
            proximity: ProximityResult::default(),
            camera,
            edges: KeyEdges::default(),
            held_keys: Vec::new(),
        }
    }

    /// Register a vehicle. Returns its index.
    pub fn add_vehicle(&mut self, body: BodyHandle, appearance: VehicleAppearance) -> usize {
        let index = self.vehicles.len();
        tracing::debug!("Registered vehicle {index} ({appearance:?})");
        self.vehicles.push(Vehicle::new(body, appearance));
        index
    }

    /// Clamp a frame delta to `[0, max_delta]`; non-finite deltas become zero.
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if dt.is_finite() {
            dt.clamp(0.0, self.config.step.max_delta)
        } else {
            0.0
        }
    }

    /// Step physics, then run every controller.
    pub fn tick(&mut self, world: &mut dyn PhysicsWorld, input: &InputState, dt: f32) {
        let dt = self.clamp_dt(dt);
        let step = &self.config.step;
        world.step(step.fixed_rate, dt, step.max_substeps);
        self.advance(world, input, dt);
    }

    /// Run every controller for a world that has already been stepped.
    pub fn advance(&mut self, world: &mut dyn PhysicsWorld, input: &InputState, dt: f32) {
        let dt = self.clamp_dt(dt);

        if self.edges.just_pressed(input, Key::Respawn) {
            self.respawn(world);
        }

        self.drive(world, input, dt);

        if self.edges.just_pressed(input, Key::Interact) {
            let transition = self.mode_switch.toggle(
                &mut self.agent,
                &mut self.vehicles,
                self.proximity.nearest,
                world,
            );
            if transition != ModeTransition::Rejected {
                self.camera.set_mode(self.mode_switch.mode());
            }
        }

        self.mode_switch
            .slave_rider(&mut self.agent, &self.vehicles, world);

        self.proximity = match self.mode_switch.mode() {
            ControlMode::Pedestrian => self.scan(world),
            ControlMode::Driving => ProximityResult::default(),
        };

        self.follow(world, input);

        self.held_keys = input.pressed_keys().collect();
        self.edges.latch(input);
    }

    fn respawn(&mut self, world: &mut dyn PhysicsWorld) {
        if self.mode_switch.mode() != ControlMode::Pedestrian {
            return;
        }
        let spawn = self.config.agent.spawn_point;
        world.set_position(self.agent.body, spawn);
        world.set_linear_velocity(self.agent.body, Vec3::ZERO);
        world.set_angular_velocity(self.agent.body, Vec3::ZERO);
        tracing::debug!("Respawned agent at {spawn:?}");
    }

    fn drive(&mut self, world: &mut dyn PhysicsWorld, input: &InputState, dt: f32) {
        let jump_edge = self.edges.just_pressed(input, Key::Jump);
        let driven = self.mode_switch.driven();

        if driven.is_none() {
            self.locomotion.update(
                &mut self.agent,
                world,
                input,
                jump_edge,
                self.camera.heading(),
                dt,
            );
        }

        for (index, vehicle) in self.vehicles.iter_mut().enumerate() {
            if Some(index) == driven {
                self.driving.update(vehicle, world, input, dt);
            } else {
                self.driving.relax_steering(vehicle);
            }
            if let Some(state) = world.body(vehicle.body) {
                VehicleController::sync_visual(vehicle, &state);
            }
        }
    }

    fn scan(&self, world: &dyn PhysicsWorld) -> ProximityResult {
        let Some(agent) = world.body(self.agent.body) else {
            return ProximityResult::default();
        };
        let positions = self.vehicles.iter().map(|vehicle| {
            world
                .body(vehicle.body)
                .map_or(Vec3::splat(f32::INFINITY), |state| state.position)
        });
        self.scanner.scan(agent.position, positions)
    }

    fn follow(&mut self, world: &dyn PhysicsWorld, input: &InputState) {
        match self.mode_switch.authority() {
            ControlAuthority::Agent => {
                if let Some(state) = world.body(self.agent.body) {
                    self.camera.follow_agent(state.position, input.look_delta);
                }
            }
            ControlAuthority::Vehicle(index) => {
                let state = self.vehicles.get(index).and_then(|v| world.body(v.body));
                if let Some(state) = state {
                    self.camera.follow_vehicle(&state);
                }
            }
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn mode(&self) -> ControlMode {
        self.mode_switch.mode()
    }

    pub fn authority(&self) -> ControlAuthority {
        self.mode_switch.authority()
    }

    pub fn driven_vehicle(&self) -> Option<&Vehicle> {
        self.mode_switch
            .driven()
            .and_then(|index| self.vehicles.get(index))
    }

    pub fn proximity(&self) -> ProximityResult {
        self.proximity
    }

    pub fn can_interact(&self) -> bool {
        self.proximity.can_interact()
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn camera_view(&self) -> CameraView {
        self.camera.view()
    }

    /// Visual transform of the agent.
    pub fn agent_visual(&self) -> VisualTransform {
        self.agent.visual
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn hud(&self) -> HudStatus {
        let mode = self.mode();
        let speed = self.driven_vehicle().map_or(0.0, |v| v.speed_kmh);
        HudStatus {
            mode,
            mode_label: mode.label(),
            can_interact: self.can_interact(),
            speed_kmh: speed.abs().round() as i32,
            held_keys: self.held_keys.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat_world::FlatWorld;

    const DT: f32 = 0.016;

    struct Fixture {
        world: FlatWorld,
        sim: Simulation,
    }

    /// Agent at the spawn point, one vehicle per ground point.
    fn fixture(vehicles: &[Vec3]) -> Fixture {
        let config = SimulationConfig::default();
        let mut world = FlatWorld::new();
        let agent = world.add_body(&config.agent.body_desc());
        let bodies: Vec<_> = vehicles
            .iter()
            .map(|&p| world.add_body(&config.vehicle.body_desc(p, 0.0)))
            .collect();
        let mut sim = Simulation::new(config, agent);
        for body in bodies {
            sim.add_vehicle(body, VehicleAppearance::Colored(0xcc2222));
        }
        Fixture { world, sim }
    }

    /// Agent standing on the ground at `position`.
    fn place_agent(f: &mut Fixture, position: Vec3) {
        let body = f.sim.agent().body;
        f.world.set_position(body, position);
        f.world.set_linear_velocity(body, Vec3::ZERO);
    }

    fn press(key: Key) -> InputState {
        InputState::default().with_key(key)
    }

    #[test]
    fn test_idle_tick_only_falls() {
        let mut f = fixture(&[]);
        f.sim.tick(&mut f.world, &InputState::default(), DT);

        let body = f.sim.agent().body;
        assert_eq!(f.world.accumulated_force(body), Vec3::ZERO);
        let state = f.world.body(body).unwrap();
        assert_eq!(state.linear_velocity.x, 0.0);
        assert_eq!(state.linear_velocity.z, 0.0);
        assert!(state.linear_velocity.y < 0.0);
        assert!(state.linear_velocity.y > -9.82 * DT - 1e-4);
        assert_eq!(state.position.x, 0.0);
        assert_eq!(state.position.z, 10.0);
        assert!(!f.sim.agent().is_on_ground);
        assert_eq!(f.sim.mode(), ControlMode::Pedestrian);
    }

    #[test]
    fn test_forward_force_scenario() {
        let mut f = fixture(&[]);
        place_agent(&mut f, Vec3::new(0.0, 1.25, 10.0));
        f.sim.advance(&mut f.world, &press(Key::Forward), 0.1);

        let force = f.world.accumulated_force(f.sim.agent().body);
        assert!((force - Vec3::new(0.0, 0.0, -4_000.0)).length() < 1e-3);
        assert_eq!(force.x, 0.0);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut f = fixture(&[]);
        place_agent(&mut f, Vec3::new(0.0, 1.25, 10.0));
        f.sim.advance(&mut f.world, &press(Key::Forward), 2.0);
        let force = f.world.accumulated_force(f.sim.agent().body);
        assert!((force.length() - 4_000.0).abs() < 1e-2);

        assert_eq!(f.sim.clamp_dt(f32::NAN), 0.0);
        assert_eq!(f.sim.clamp_dt(-1.0), 0.0);
    }

    #[test]
    fn test_enter_drive_exit() {
        let mut f = fixture(&[Vec3::new(3.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -30.0)]);
        place_agent(&mut f, Vec3::new(0.0, 1.25, 10.0));

        // First tick finds the candidate, the next press enters it.
        f.sim.advance(&mut f.world, &InputState::default(), DT);
        assert!(f.sim.can_interact());
        assert_eq!(f.sim.proximity().nearest, Some(0));
        assert!(f.sim.hud().can_interact);

        f.sim.advance(&mut f.world, &press(Key::Interact), DT);
        assert_eq!(f.sim.mode(), ControlMode::Driving);
        assert_eq!(f.sim.authority(), ControlAuthority::Vehicle(0));
        assert!(!f.sim.can_interact());
        assert_eq!(f.sim.hud().mode_label, "VEHICLE MODE");

        // Holding the key does not toggle again.
        f.sim.advance(&mut f.world, &press(Key::Interact), DT);
        assert_eq!(f.sim.mode(), ControlMode::Driving);

        // Rider tracks the vehicle after it moves.
        let vehicle_body = f.sim.vehicles()[0].body;
        f.world.set_position(vehicle_body, Vec3::new(40.0, 0.6, 10.0));
        f.sim.advance(&mut f.world, &InputState::default(), DT);
        let agent = f.world.body(f.sim.agent().body).unwrap();
        assert_eq!(agent.position, Vec3::new(40.0, 0.6, 10.0));
        assert!(agent.sleeping);
        assert!(!f.sim.agent_visual().visible);

        f.sim.advance(&mut f.world, &press(Key::Interact), DT);
        assert_eq!(f.sim.mode(), ControlMode::Pedestrian);
        assert!(f.sim.vehicles().iter().all(|v| !v.is_driven));
        let agent = f.world.body(f.sim.agent().body).unwrap();
        assert!(!agent.sleeping);
        assert!((agent.position - Vec3::new(43.0, 1.25, 10.0)).length() < 1e-4);
    }

    #[test]
    fn test_interact_without_candidate_stays_on_foot() {
        let mut f = fixture(&[Vec3::new(0.0, 0.0, -30.0)]);
        place_agent(&mut f, Vec3::new(0.0, 1.25, 10.0));
        f.sim.advance(&mut f.world, &InputState::default(), DT);
        f.sim.advance(&mut f.world, &press(Key::Interact), DT);
        assert_eq!(f.sim.mode(), ControlMode::Pedestrian);
        assert!(!f.sim.agent().is_in_vehicle);
    }

    #[test]
    fn test_driving_moves_only_the_driven_vehicle() {
        let mut f = fixture(&[Vec3::new(2.0, 0.0, 10.0), Vec3::new(-2.0, 0.0, 12.0)]);
        place_agent(&mut f, Vec3::new(0.0, 1.25, 10.0));
        f.sim.advance(&mut f.world, &InputState::default(), DT);
        f.sim.advance(&mut f.world, &press(Key::Interact), DT);
        let driven = f.sim.authority();
        assert_eq!(driven, ControlAuthority::Vehicle(0));

        let throttle = press(Key::Forward).with_key(Key::Left);
        f.sim.advance(&mut f.world, &throttle, DT);
        let vehicles = f.sim.vehicles();
        assert!(f.world.accumulated_force(vehicles[0].body).z < 0.0);
        assert_eq!(f.world.accumulated_force(vehicles[1].body), Vec3::ZERO);
        assert!(vehicles[0].steering_angle > 0.0);
        assert_eq!(vehicles[1].steering_angle, 0.0);
        assert_eq!(f.world.accumulated_force(f.sim.agent().body), Vec3::ZERO);
    }

    #[test]
    fn test_steering_decays_after_release() {
        let mut f = fixture(&[Vec3::new(2.0, 0.0, 10.0)]);
        place_agent(&mut f, Vec3::new(0.0, 1.25, 10.0));
        f.sim.advance(&mut f.world, &InputState::default(), DT);
        f.sim.advance(&mut f.world, &press(Key::Interact), DT);
        for _ in 0..10 {
            f.sim.advance(&mut f.world, &press(Key::Left), DT);
        }
        let initial = f.sim.vehicles()[0].steering_angle;
        assert!(initial > 0.0);

        for n in 1..=20 {
            f.sim.tick(&mut f.world, &InputState::default(), DT);
            let angle = f.sim.vehicles()[0].steering_angle;
            assert!(angle.abs() <= initial * 0.85_f32.powi(n) + 1e-6);
        }
    }

    #[test]
    fn test_abandoned_vehicle_steering_relaxes() {
        let mut f = fixture(&[Vec3::new(2.0, 0.0, 10.0)]);
        place_agent(&mut f, Vec3::new(0.0, 1.25, 10.0));
        f.sim.advance(&mut f.world, &InputState::default(), DT);
        f.sim.advance(&mut f.world, &press(Key::Interact), DT);
        for _ in 0..10 {
            f.sim.advance(&mut f.world, &press(Key::Left), DT);
        }
        f.sim.advance(&mut f.world, &press(Key::Interact), DT);
        assert_eq!(f.sim.mode(), ControlMode::Pedestrian);
        assert!(!f.sim.vehicles()[0].is_driven);

        let initial = f.sim.vehicles()[0].steering_angle;
        assert!(initial > 0.0);
        for n in 1..=10 {
            f.sim.tick(&mut f.world, &InputState::default(), DT);
            let angle = f.sim.vehicles()[0].steering_angle;
            assert!(angle.abs() <= initial * 0.85_f32.powi(n) + 1e-6);
        }
        assert!(f.sim.vehicles()[0].steering_angle < initial * 0.25);
    }

    #[test]
    fn test_respawn_only_on_foot() {
        let mut f = fixture(&[Vec3::new(52.0, 0.0, 50.0)]);
        place_agent(&mut f, Vec3::new(50.0, 1.25, 50.0));
        f.world
            .set_linear_velocity(f.sim.agent().body, Vec3::new(3.0, 0.0, 0.0));
        f.sim.advance(&mut f.world, &press(Key::Respawn), DT);
        let state = f.world.body(f.sim.agent().body).unwrap();
        assert_eq!(state.position, Vec3::new(0.0, 5.0, 10.0));
        assert_eq!(state.linear_velocity, Vec3::ZERO);

        // While driving the rider stays with the vehicle.
        place_agent(&mut f, Vec3::new(50.0, 1.25, 50.0));
        f.sim.advance(&mut f.world, &InputState::default(), DT);
        f.sim.advance(&mut f.world, &press(Key::Interact), DT);
        f.sim.advance(&mut f.world, &press(Key::Respawn), DT);
        let state = f.world.body(f.sim.agent().body).unwrap();
        assert_eq!(state.position, Vec3::new(52.0, 0.6, 50.0));
    }

    #[test]
    fn test_hud_reports_speed_and_keys() {
        let mut f = fixture(&[Vec3::new(2.0, 0.0, 10.0)]);
        place_agent(&mut f, Vec3::new(0.0, 1.25, 10.0));
        let hud = f.sim.hud();
        assert_eq!(hud.mode_label, "PEDESTRIAN MODE");
        assert_eq!(hud.speed_kmh, 0);

        f.sim.advance(&mut f.world, &InputState::default(), DT);
        f.sim.advance(&mut f.world, &press(Key::Interact), DT);
        f.world
            .set_linear_velocity(f.sim.vehicles()[0].body, Vec3::new(3.0, 0.0, -4.0));
        f.sim.advance(&mut f.world, &press(Key::Forward), DT);

        let hud = f.sim.hud();
        assert_eq!(hud.speed_kmh, 18);
        assert_eq!(hud.held_keys, vec![Key::Forward]);
        assert_eq!(hud.key_readout(), "W:1 A:0 S:0 D:0 SPACE:0");
    }

    #[test]
    fn test_agent_lands_and_walks() {
        let mut f = fixture(&[]);
        for _ in 0..120 {
            f.sim.tick(&mut f.world, &InputState::default(), DT);
        }
        assert!(f.sim.agent().is_on_ground);

        let start = f.world.body(f.sim.agent().body).unwrap().position;
        for _ in 0..30 {
            f.sim.tick(&mut f.world, &press(Key::Forward), DT);
        }
        let end = f.world.body(f.sim.agent().body).unwrap().position;
        assert!(end.z < start.z - 0.5);
        assert!((end.x - start.x).abs() < 1e-4);
        assert!(f.sim.agent().walk_cycle_phase > 0.0);
    }
}
