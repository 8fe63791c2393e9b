//! Downward raycast deciding whether the agent stands on something.

use glam::Vec3;

use crate::body::BodyHandle;
use crate::config::{AgentTuning, LocomotionTuning};
use crate::world::PhysicsWorld;

/// A fixed-length downward probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundProbe {
    /// Length of the ray below the body centre.
    pub distance: f32,
}

impl GroundProbe {
    pub fn new(distance: f32) -> Self {
        Self { distance }
    }

    /// Probe sized to reach just past the bottom of the agent's capsule.
    pub fn for_agent(agent: &AgentTuning, locomotion: &LocomotionTuning) -> Self {
        Self::new(agent.half_height() * locomotion.probe_factor)
    }

    /// Whether any collidable other than `body` lies within the probe
    /// distance straight below `position`.
    pub fn probe(&self, world: &dyn PhysicsWorld, body: BodyHandle, position: Vec3) -> bool {
        let to = position - Vec3::Y * self.distance;
        world.raycast_closest(position, to, Some(body)).has_hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::flat_world::FlatWorld;

    fn setup(height: f32) -> (FlatWorld, BodyHandle, GroundProbe) {
        let config = SimulationConfig::default();
        let mut world = FlatWorld::new();
        let mut desc = config.agent.body_desc();
        desc.position = Vec3::new(0.0, height, 0.0);
        let body = world.add_body(&desc);
        let probe = GroundProbe::for_agent(&config.agent, &config.locomotion);
        (world, body, probe)
    }

    #[test]
    fn test_probe_length_exceeds_half_height() {
        let (_, _, probe) = setup(0.0);
        assert!((probe.distance - 1.375).abs() < 1e-6);
    }

    #[test]
    fn test_standing_agent_is_grounded() {
        let (world, body, probe) = setup(1.25);
        assert!(probe.probe(&world, body, Vec3::new(0.0, 1.25, 0.0)));
    }

    #[test]
    fn test_airborne_agent_is_not_grounded() {
        let (world, body, probe) = setup(5.0);
        assert!(!probe.probe(&world, body, Vec3::new(0.0, 5.0, 0.0)));
    }

    #[test]
    fn test_probe_ignores_own_body() {
        // Ground far below; only the agent's own spheres are within reach.
        let (world, body, probe) = setup(3.0);
        assert!(!probe.probe(&world, body, Vec3::new(0.0, 3.0, 0.0)));
    }

    #[test]
    fn test_probe_hits_static_box() {
        let (mut world, body, probe) = setup(3.25);
        world.add_static_box(Vec3::new(0.0, 1.0, 0.0), Vec3::splat(1.0));
        assert!(probe.probe(&world, body, Vec3::new(0.0, 3.25, 0.0)));
    }
}
