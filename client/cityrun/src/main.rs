//! Walk and drive around a small physically simulated city using Bevy.
//!
//! The player walks with WASD, sprints with Shift and jumps with Space.
//! Walking up to a vehicle and pressing F takes the wheel; F again gets out.

mod input;
mod launch_params;
mod physics;
mod population;
mod simulation;
mod ui;

use bevy::light::light_consts::lux;
use bevy::prelude::*;
use cityrun_core::SimulationConfig;
use input::InputPlugin;
use physics::PhysicsIntegrationPlugin;
use population::PopulationPlugin;
use simulation::{FollowCamera, SimulationPlugin, SimulationSettings};
use ui::HudPlugin;

/// Plugin for the main application.
pub struct AppPlugin {
    pub settings: SimulationSettings,
}

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings.clone())
            .insert_resource(ClearColor(Color::srgb(0.53, 0.81, 0.92)))
            .add_plugins((
                InputPlugin,
                PhysicsIntegrationPlugin {
                    substeps: self.settings.0.step.max_substeps,
                },
                PopulationPlugin,
                SimulationPlugin,
                HudPlugin,
            ))
            .add_systems(Startup, setup_scene);
    }
}

/// Spawn the camera and lighting.
fn setup_scene(mut commands: Commands, settings: Res<SimulationSettings>) {
    let spawn = settings.0.agent.spawn_point;
    let eye = spawn + settings.0.camera.pedestrian_offset;

    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(eye).looking_at(spawn, Vec3::Y),
        Projection::Perspective(PerspectiveProjection {
            fov: 75.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            ..Default::default()
        }),
        FollowCamera,
    ));

    commands.insert_resource(GlobalAmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    });
    commands.spawn((
        DirectionalLight {
            illuminance: lux::AMBIENT_DAYLIGHT,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(50.0, 100.0, 50.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    tracing::info!("Scene setup complete - click to grab the cursor, WASD to move, F to enter a vehicle");
}

/// Load tuning from `--tuning`, falling back to defaults when it is absent or broken.
fn load_settings(params: &launch_params::LaunchParams) -> SimulationSettings {
    let Some(path) = &params.tuning else {
        return SimulationSettings::default();
    };
    match SimulationConfig::load(path) {
        Ok(config) => SimulationSettings(config),
        Err(e) => {
            tracing::error!("Using default tuning: {e}");
            SimulationSettings::default()
        }
    }
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();
    let settings = load_settings(&params);

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "cityrun".to_string(),
        resolution: (1920, 1080).into(),
        position: WindowPosition::Centered(MonitorSelection::Primary),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }));

    app.insert_resource(params)
        .add_plugins(AppPlugin { settings })
        .run();
}
