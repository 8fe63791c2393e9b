//! Per-tick input snapshots.
//!
//! Hosts translate whatever device layer they use into an [`InputState`] once
//! per frame. Controllers only ever read it.

use std::collections::BTreeSet;

use glam::Vec2;

/// Logical keys the simulation reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sprint,
    /// Enter or leave a vehicle.
    Interact,
    /// Return the pedestrian to the spawn point.
    Respawn,
}

impl Key {
    pub const ALL: [Key; 8] = [
        Key::Forward,
        Key::Back,
        Key::Left,
        Key::Right,
        Key::Jump,
        Key::Sprint,
        Key::Interact,
        Key::Respawn,
    ];

    /// Short label for debug readouts.
    pub fn label(self) -> &'static str {
        match self {
            Key::Forward => "W",
            Key::Back => "S",
            Key::Left => "A",
            Key::Right => "D",
            Key::Jump => "SPACE",
            Key::Sprint => "SHIFT",
            Key::Interact => "F",
            Key::Respawn => "R",
        }
    }
}

/// Pressed keys plus mouse-look delta accumulated since the last tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputState {
    pressed: BTreeSet<Key>,
    /// Mouse movement in pixels since the previous snapshot.
    pub look_delta: Vec2,
}

impl InputState {
    /// Builder-style helper for pressing a key.
    #[must_use]
    pub fn with_key(mut self, key: Key) -> Self {
        self.pressed.insert(key);
        self
    }

    pub fn set(&mut self, key: Key, pressed: bool) {
        if pressed {
            self.pressed.insert(key);
        } else {
            self.pressed.remove(&key);
        }
    }

    pub fn pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.pressed.iter().copied()
    }

    /// `1.0` if only `positive` is held, `-1.0` if only `negative`, else `0.0`.
    pub fn axis(&self, positive: Key, negative: Key) -> f32 {
        f32::from(u8::from(self.pressed(positive))) - f32::from(u8::from(self.pressed(negative)))
    }
}

/// Edge detection across ticks.
///
/// Remembers which keys were down on the previous tick so discrete actions
/// fire once per press.
#[derive(Clone, Debug, Default)]
pub struct KeyEdges {
    previous: BTreeSet<Key>,
}

impl KeyEdges {
    /// Whether `key` went from released to pressed since the last latch.
    pub fn just_pressed(&self, input: &InputState, key: Key) -> bool {
        input.pressed(key) && !self.previous.contains(&key)
    }

    /// Record this tick's key state as the baseline for the next tick.
    pub fn latch(&mut self, input: &InputState) {
        self.previous.clone_from(&input.pressed);
    }
}
