//! Switching control between walking and driving.
//!
//! [`ModeSwitch`] is the only place that flips [`Vehicle::is_driven`] and
//! [`Agent::is_in_vehicle`], which is what keeps at most one vehicle driven.

use glam::Vec3;

use crate::body::VisualTransform;
use crate::locomotion::Agent;
use crate::vehicle::Vehicle;
use crate::world::PhysicsWorld;

/// Which kind of entity the user is controlling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControlMode {
    #[default]
    Pedestrian,
    Driving,
}

impl ControlMode {
    /// Label shown in the HUD.
    pub fn label(self) -> &'static str {
        match self {
            ControlMode::Pedestrian => "PEDESTRIAN MODE",
            ControlMode::Driving => "VEHICLE MODE",
        }
    }
}

/// The body that currently receives control input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControlAuthority {
    #[default]
    Agent,
    /// Index into the simulation's vehicle list.
    Vehicle(usize),
}

/// Result of a toggle request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeTransition {
    Entered { vehicle: usize },
    Exited { vehicle: usize },
    /// No candidate, or the candidate was unusable.
    Rejected,
}

/// Owner of the control authority.
#[derive(Clone, Debug)]
pub struct ModeSwitch {
    authority: ControlAuthority,
    /// Where the rider lands on exit, in the vehicle's yaw frame.
    pub exit_offset: Vec3,
    /// Minimum height of the rider's centre above the vehicle's centre on
    /// exit, so a taller rider is not placed partly underground.
    pub exit_min_lift: f32,
}

impl ModeSwitch {
    pub fn new(exit_offset: Vec3) -> Self {
        Self {
            authority: ControlAuthority::Agent,
            exit_offset,
            exit_min_lift: f32::NEG_INFINITY,
        }
    }

    /// Mode switch whose exit point keeps a rider of `rider_half_height`
    /// standing on the ground a chassis of `chassis_half_height` rests on.
    pub fn for_bodies(
        exit_offset: Vec3,
        rider_half_height: f32,
        chassis_half_height: f32,
    ) -> Self {
        Self {
            exit_min_lift: rider_half_height - chassis_half_height,
            ..Self::new(exit_offset)
        }
    }

    pub fn authority(&self) -> ControlAuthority {
        self.authority
    }

    pub fn mode(&self) -> ControlMode {
        match self.authority {
            ControlAuthority::Agent => ControlMode::Pedestrian,
            ControlAuthority::Vehicle(_) => ControlMode::Driving,
        }
    }

    /// Index of the driven vehicle, if any.
    pub fn driven(&self) -> Option<usize> {
        match self.authority {
            ControlAuthority::Agent => None,
            ControlAuthority::Vehicle(index) => Some(index),
        }
    }

    /// Handle a toggle edge.
    ///
    /// While walking, enters `candidate` if there is one and nobody drives
    /// it. While driving, leaves the current vehicle.
    pub fn toggle(
        &mut self,
        agent: &mut Agent,
        vehicles: &mut [Vehicle],
        candidate: Option<usize>,
        world: &mut dyn PhysicsWorld,
    ) -> ModeTransition {
        match self.authority {
            ControlAuthority::Agent => self.enter(agent, vehicles, candidate, world),
            ControlAuthority::Vehicle(index) => self.exit(agent, vehicles, index, world),
        }
    }

    fn enter(
        &mut self,
        agent: &mut Agent,
        vehicles: &mut [Vehicle],
        candidate: Option<usize>,
        world: &mut dyn PhysicsWorld,
    ) -> ModeTransition {
        let Some(index) = candidate else {
            tracing::debug!("Toggle ignored: no vehicle in range");
            return ModeTransition::Rejected;
        };
        let Some(vehicle) = vehicles.get_mut(index) else {
            tracing::warn!("Toggle ignored: vehicle {index} does not exist");
            return ModeTransition::Rejected;
        };
        if vehicle.is_driven {
            tracing::debug!("Toggle ignored: vehicle {index} is already driven");
            return ModeTransition::Rejected;
        }

        vehicle.is_driven = true;
        agent.is_in_vehicle = true;
        agent.is_on_ground = false;
        agent.is_sprinting = false;
        world.set_linear_velocity(agent.body, Vec3::ZERO);
        world.set_sleeping(agent.body, true);
        self.authority = ControlAuthority::Vehicle(index);

        tracing::info!("Entered vehicle {index}");
        ModeTransition::Entered { vehicle: index }
    }

    fn exit(
        &mut self,
        agent: &mut Agent,
        vehicles: &mut [Vehicle],
        index: usize,
        world: &mut dyn PhysicsWorld,
    ) -> ModeTransition {
        let exit_point = vehicles.get_mut(index).and_then(|vehicle| {
            vehicle.is_driven = false;
            world
                .body(vehicle.body)
                .map(|state| {
                    let mut point = state.position + state.yaw_rotation() * self.exit_offset;
                    point.y = point.y.max(state.position.y + self.exit_min_lift);
                    point
                })
        });

        agent.is_in_vehicle = false;
        match exit_point {
            Some(point) => world.set_position(agent.body, point),
            None => tracing::warn!("Vehicle {index} body is missing; rider stays in place"),
        }
        world.set_linear_velocity(agent.body, Vec3::ZERO);
        world.set_angular_velocity(agent.body, Vec3::ZERO);
        world.set_sleeping(agent.body, false);
        agent.visual.visible = true;
        self.authority = ControlAuthority::Agent;

        tracing::info!("Exited vehicle {index}");
        ModeTransition::Exited { vehicle: index }
    }

    /// Keep a riding agent glued to its vehicle.
    ///
    /// Copies the vehicle's position to the agent's body and its full
    /// transform to the agent's (hidden) visual.
    pub fn slave_rider(&self, agent: &mut Agent, vehicles: &[Vehicle], world: &mut dyn PhysicsWorld) {
        let ControlAuthority::Vehicle(index) = self.authority else {
            return;
        };
        if !agent.is_in_vehicle {
            return;
        }
        let Some(state) = vehicles.get(index).and_then(|v| world.body(v.body)) else {
            return;
        };
        world.set_position(agent.body, state.position);
        agent.visual = VisualTransform {
            translation: state.position,
            rotation: state.rotation,
            visible: false,
        };
    }
}
