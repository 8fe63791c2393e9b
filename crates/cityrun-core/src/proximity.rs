//! Nearest enterable vehicle.

use glam::Vec3;

/// Outcome of a proximity scan.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProximityResult {
    /// Index of the nearest vehicle within range.
    pub nearest: Option<usize>,
    /// Distance to it, or zero when there is none.
    pub distance: f32,
}

impl ProximityResult {
    /// Whether the interaction prompt should be shown.
    pub fn can_interact(&self) -> bool {
        self.nearest.is_some()
    }
}

/// Linear scan for the closest vehicle inside a radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProximityScanner {
    pub radius: f32,
}

impl ProximityScanner {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    /// Find the vehicle strictly closer than the radius and closer than every
    /// other. Ties keep the earlier vehicle.
    pub fn scan(&self, origin: Vec3, positions: impl IntoIterator<Item = Vec3>) -> ProximityResult {
        let mut result = ProximityResult::default();
        let mut ceiling = self.radius;
        for (index, position) in positions.into_iter().enumerate() {
            let distance = origin.distance(position);
            if distance < ceiling {
                ceiling = distance;
                result = ProximityResult {
                    nearest: Some(index),
                    distance,
                };
            }
        }
        result
    }
}
