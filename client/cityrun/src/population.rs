//! City layout and entity spawning.
//!
//! The layout is generated from a seed so a city can be reproduced with
//! `--seed`. A fixed grid of roads crosses the map. Buildings are static
//! boxes kept out of the central block; the player's vehicle waits near the
//! spawn point and parked vehicles are scattered over the rest of the map.

use std::f32::consts::TAU;

use avian3d::prelude::*;
use bevy::prelude::*;
use cityrun_core::{Simulation, VehicleAppearance};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::launch_params::LaunchParams;
use crate::physics::{BodyRegistry, body_bundle};
use crate::simulation::{AgentBody, AgentVisual, CitySimulation, SimulationSettings, VehicleBody};

/// Side length of the square ground plane.
const GROUND_SIZE: f32 = 500.0;
/// Buildings and parked vehicles stay within this distance of the origin.
const CITY_HALF_EXTENT: f32 = 200.0;
/// No buildings inside this square around the origin.
const CLEAR_HALF_EXTENT: f32 = 100.0;
/// Building placement attempts.
const BUILDING_ATTEMPTS: usize = 50;
/// Ground point of the player's vehicle.
const PLAYER_VEHICLE_POINT: Vec3 = Vec3::new(15.0, 0.0, 15.0);
/// Colour of the player's vehicle when no model is given.
const PLAYER_VEHICLE_COLOR: u32 = 0x44_aa_ff;

/// Spacing between parallel roads.
const ROAD_SPACING: f32 = 100.0;
/// Width of a road strip.
const ROAD_WIDTH: f32 = 15.0;
/// Roads sit just above the ground to avoid z-fighting.
const ROAD_HEIGHT: f32 = 0.1;
const ROAD_COLOR: u32 = 0x44_44_44;

const BUILDING_COLORS: [u32; 4] = [0x8c_7b_6b, 0x7d_8a_8a, 0x9d_7a_7a, 0x6b_8c_7b];
const PARKED_COLORS: [u32; 5] = [0xff_55_55, 0x55_ff_55, 0x55_55_ff, 0xee_ee_ee, 0x33_33_33];

/// A flat road strip. Purely visual.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadSpec {
    pub centre: Vec3,
    /// Extent along X and Z.
    pub size: Vec2,
}

/// Road grid: an east-west strip every [`ROAD_SPACING`] across the city,
/// and north-south strips at the interior grid lines.
fn road_grid() -> Vec<RoadSpec> {
    let lines = (-2..=2_i8).map(|i| f32::from(i) * ROAD_SPACING);
    let mut roads = Vec::new();
    for offset in lines {
        roads.push(RoadSpec {
            centre: Vec3::new(0.0, ROAD_HEIGHT, offset),
            size: Vec2::new(GROUND_SIZE, ROAD_WIDTH),
        });
        if offset.abs() < CITY_HALF_EXTENT {
            roads.push(RoadSpec {
                centre: Vec3::new(offset, ROAD_HEIGHT, 0.0),
                size: Vec2::new(ROAD_WIDTH, GROUND_SIZE),
            });
        }
    }
    roads
}

/// A static building.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildingSpec {
    pub centre: Vec3,
    pub half_extents: Vec3,
    pub color: u32,
}

impl BuildingSpec {
    fn footprint_contains(&self, point: Vec3, margin: f32) -> bool {
        (point.x - self.centre.x).abs() < self.half_extents.x + margin
            && (point.z - self.centre.z).abs() < self.half_extents.z + margin
    }
}

/// A vehicle to spawn.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleSpec {
    /// Point on the ground under the chassis centre.
    pub ground_point: Vec3,
    pub yaw: f32,
    pub appearance: VehicleAppearance,
}

/// Everything placed in the city at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct CityLayout {
    pub roads: Vec<RoadSpec>,
    pub buildings: Vec<BuildingSpec>,
    /// The player's vehicle comes first.
    pub vehicles: Vec<VehicleSpec>,
}

impl CityLayout {
    /// Generate a layout with `parked` vehicles besides the player's.
    pub fn generate(seed: u64, parked: usize, player_model: Option<String>) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut buildings = Vec::new();
        for _ in 0..BUILDING_ATTEMPTS {
            let size = Vec3::new(
                rng.random_range(15.0..45.0),
                rng.random_range(30.0..110.0),
                rng.random_range(15.0..45.0),
            );
            let x = rng.random_range(-CITY_HALF_EXTENT..CITY_HALF_EXTENT);
            let z = rng.random_range(-CITY_HALF_EXTENT..CITY_HALF_EXTENT);
            let color = BUILDING_COLORS[rng.random_range(0..BUILDING_COLORS.len())];
            if x.abs() < CLEAR_HALF_EXTENT && z.abs() < CLEAR_HALF_EXTENT {
                continue;
            }
            buildings.push(BuildingSpec {
                centre: Vec3::new(x, size.y / 2.0, z),
                half_extents: size / 2.0,
                color,
            });
        }

        let player_appearance = match player_model {
            Some(path) => VehicleAppearance::Model(path),
            None => VehicleAppearance::Colored(PLAYER_VEHICLE_COLOR),
        };
        let mut vehicles = vec![VehicleSpec {
            ground_point: PLAYER_VEHICLE_POINT,
            yaw: 0.0,
            appearance: player_appearance,
        }];

        while vehicles.len() <= parked {
            let point = Vec3::new(
                rng.random_range(-CITY_HALF_EXTENT..CITY_HALF_EXTENT),
                0.0,
                rng.random_range(-CITY_HALF_EXTENT..CITY_HALF_EXTENT),
            );
            let yaw = rng.random_range(0.0..TAU);
            let color = PARKED_COLORS[rng.random_range(0..PARKED_COLORS.len())];
            if buildings.iter().any(|b| b.footprint_contains(point, 3.0)) {
                continue;
            }
            vehicles.push(VehicleSpec {
                ground_point: point,
                yaw,
                appearance: VehicleAppearance::Colored(color),
            });
        }

        Self {
            roads: road_grid(),
            buildings,
            vehicles,
        }
    }
}

/// Plugin that builds the city at startup.
pub struct PopulationPlugin;

impl Plugin for PopulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, populate_city);
    }
}

fn color_from_rgb(rgb: u32) -> Color {
    let [_, r, g, b] = rgb.to_be_bytes();
    Color::srgb_u8(r, g, b)
}

/// Spawn ground, buildings, the agent and all vehicles, then hand their
/// bodies to a new simulation.
fn populate_city(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
    mut registry: ResMut<BodyRegistry>,
    settings: Res<SimulationSettings>,
    params: Res<LaunchParams>,
) {
    let config = &settings.0;
    let seed = params.seed.unwrap_or_else(rand::random);
    let layout = CityLayout::generate(seed, params.parked, params.player_model.clone());

    // Ground.
    commands.spawn((
        RigidBody::Static,
        Collider::cuboid(GROUND_SIZE, 1.0, GROUND_SIZE),
        Mesh3d(meshes.add(Cuboid::new(GROUND_SIZE, 1.0, GROUND_SIZE))),
        MeshMaterial3d(materials.add(Color::srgb(0.2, 0.3, 0.2))),
        Transform::from_xyz(0.0, -0.5, 0.0),
    ));

    let road_material = materials.add(color_from_rgb(ROAD_COLOR));
    for road in &layout.roads {
        commands.spawn((
            Mesh3d(meshes.add(Plane3d::default().mesh().size(road.size.x, road.size.y))),
            MeshMaterial3d(road_material.clone()),
            Transform::from_translation(road.centre),
        ));
    }

    for building in &layout.buildings {
        let size = building.half_extents * 2.0;
        commands.spawn((
            RigidBody::Static,
            Collider::cuboid(size.x, size.y, size.z),
            Mesh3d(meshes.add(Cuboid::from_size(size))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: color_from_rgb(building.color),
                metallic: 0.2,
                perceptual_roughness: 0.7,
                ..default()
            })),
            Transform::from_translation(building.centre),
        ));
    }

    // Agent: the physics body and the rendered capsule are separate entities
    // so walk-cycle offsets stay cosmetic.
    let agent_desc = config.agent.body_desc();
    let agent_entity = commands.spawn((AgentBody, body_bundle(&agent_desc))).id();
    commands.spawn((
        AgentVisual,
        Mesh3d(meshes.add(Capsule3d::new(
            config.agent.radius,
            config.agent.sphere_offset * 2.0,
        ))),
        MeshMaterial3d(materials.add(Color::srgb(0.9, 0.7, 0.5))),
        Transform::from_translation(agent_desc.position),
    ));
    let agent_handle = registry.register(agent_entity);
    let mut simulation = Simulation::new(config.clone(), agent_handle);

    let chassis = meshes.add(Cuboid::from_size(config.vehicle.chassis_size));
    for spec in &layout.vehicles {
        let desc = config.vehicle.body_desc(spec.ground_point, spec.yaw);
        let entity = commands
            .spawn((body_bundle(&desc), Visibility::default()))
            .id();
        match &spec.appearance {
            VehicleAppearance::Colored(rgb) => {
                commands.entity(entity).with_child((
                    Mesh3d(chassis.clone()),
                    MeshMaterial3d(materials.add(color_from_rgb(*rgb))),
                    Transform::default(),
                ));
            }
            VehicleAppearance::Model(path) => {
                commands.entity(entity).with_child((
                    SceneRoot(asset_server.load(GltfAssetLabel::Scene(0).from_asset(path.clone()))),
                    Transform::from_xyz(0.0, -config.vehicle.half_extents().y, 0.0),
                ));
            }
        }

        let handle = registry.register(entity);
        let index = simulation.add_vehicle(handle, spec.appearance.clone());
        commands.entity(entity).insert(VehicleBody { index });
    }

    tracing::info!(
        "City populated (seed {seed}): {} roads, {} buildings, {} vehicles",
        layout.roads.len(),
        layout.buildings.len(),
        layout.vehicles.len()
    );
    commands.insert_resource(CitySimulation(simulation));
}
