//! Runs the simulation core once per frame against the avian world.
//!
//! The core tick runs in `PostUpdate` after avian has stepped and before
//! transforms propagate, so what is rendered always matches the state the
//! controllers just produced.

use std::time::Duration;

use avian3d::prelude::*;
use bevy::{prelude::*, transform::TransformSystems};
use cityrun_core::{Simulation, SimulationConfig};

use crate::input::FrameInput;
use crate::physics::AvianWorld;

/// Simulation tuning loaded at startup.
#[derive(Resource, Debug, Clone, Default)]
pub struct SimulationSettings(pub SimulationConfig);

/// The running simulation. Inserted once the city is populated.
#[derive(Resource, Debug)]
pub struct CitySimulation(pub Simulation);

/// Marker for the agent's physics body.
#[derive(Component, Debug)]
pub struct AgentBody;

/// Marker for the agent's rendered capsule.
#[derive(Component, Debug)]
pub struct AgentVisual;

/// A vehicle's physics body and its index in the simulation.
#[derive(Component, Debug)]
pub struct VehicleBody {
    pub index: usize,
}

/// Marker for the camera driven by the simulation's camera rig.
#[derive(Component, Debug)]
pub struct FollowCamera;

/// Plugin that advances the simulation and applies its output.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, configure_frame_delta).add_systems(
            PostUpdate,
            (advance_simulation, (sync_agent_visual, sync_follow_camera))
                .chain()
                .after(PhysicsSystems::Last)
                .before(TransformSystems::Propagate),
        );
    }
}

/// Cap the virtual frame delta so physics and controllers see the same
/// clamped step.
fn configure_frame_delta(settings: Res<SimulationSettings>, mut time: ResMut<Time<Virtual>>) {
    time.set_max_delta(Duration::from_secs_f32(settings.0.step.max_delta));
}

fn advance_simulation(
    time: Res<Time>,
    input: Res<FrameInput>,
    simulation: Option<ResMut<CitySimulation>>,
    mut world: AvianWorld,
) {
    let Some(mut simulation) = simulation else {
        return;
    };
    simulation.0.advance(&mut world, &input.0, time.delta_secs());
}

fn sync_agent_visual(
    simulation: Option<Res<CitySimulation>>,
    mut query: Query<(&mut Transform, &mut Visibility), With<AgentVisual>>,
) {
    let Some(simulation) = simulation else {
        return;
    };
    let visual = simulation.0.agent_visual();
    for (mut transform, mut visibility) in &mut query {
        transform.translation = visual.translation;
        transform.rotation = visual.rotation;
        *visibility = if visual.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
}

fn sync_follow_camera(
    simulation: Option<Res<CitySimulation>>,
    mut query: Query<&mut Transform, With<FollowCamera>>,
) {
    let Some(simulation) = simulation else {
        return;
    };
    let view = simulation.0.camera_view();
    for mut transform in &mut query {
        transform.translation = view.position;
        transform.rotation = view.rotation;
    }
}
