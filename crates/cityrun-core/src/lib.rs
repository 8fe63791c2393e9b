//! Locomotion and control core for the cityrun city simulation.
//!
//! This crate owns the stateful part of the simulation: walking, jumping and
//! sprinting for the pedestrian agent, driving for vehicles, the hand-off of
//! control between the two, and the follow camera. It never constructs a
//! physics world or a renderer; the engine is reached through the
//! [`PhysicsWorld`] trait, so the same code drives the Bevy/avian client and the
//! headless [`FlatWorld`] used by the tuning binary and tests.
//!
//! A host creates bodies in its own engine, registers them with a
//! [`Simulation`], and calls [`Simulation::tick`] (or [`Simulation::advance`]
//! when the engine steps itself) once per rendered frame with an
//! [`InputState`] snapshot.

pub mod body;
pub mod camera;
pub mod config;
mod error;
pub mod flat_world;
pub mod ground_probe;
pub mod input;
pub mod locomotion;
pub mod mode;
pub mod proximity;
pub mod simulation;
pub mod vehicle;
pub mod world;

pub use body::{BodyDesc, BodyHandle, BodyState, Shape, VisualTransform};
pub use camera::{CameraRig, CameraView};
pub use config::{
    AgentTuning, CameraTuning, JumpPolicy, LocomotionTuning, ProximityTuning, SimulationConfig,
    StepTuning, VehicleTuning,
};
pub use error::{Error, Result};
pub use flat_world::FlatWorld;
pub use ground_probe::GroundProbe;
pub use input::{InputState, Key, KeyEdges};
pub use locomotion::{Agent, LocomotionController};
pub use mode::{ControlAuthority, ControlMode, ModeSwitch, ModeTransition};
pub use proximity::{ProximityResult, ProximityScanner};
pub use simulation::{HudStatus, Simulation};
pub use vehicle::{Vehicle, VehicleAppearance, VehicleController};
pub use world::{PhysicsWorld, RaycastHit};
