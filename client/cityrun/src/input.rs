//! Input action definitions and the per-frame input snapshot.
//!
//! Defines all gameplay actions using `leafwing-input-manager` and converts
//! their state into the core's [`InputState`] once per frame. Gameplay
//! actions are disabled while the cursor is free or egui has keyboard focus.

use bevy::{
    prelude::*,
    window::{CursorGrabMode, CursorOptions, PrimaryWindow},
};
use bevy_egui::EguiContexts;
use cityrun_core::{InputState, Key};
use leafwing_input_manager::{plugin::InputManagerSystem, prelude::*};

// ============================================================================
// Action enum
// ============================================================================

/// Actions for walking, driving and cursor control.
#[derive(Actionlike, PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum CityAction {
    /// WASD movement (walk direction on foot, throttle/steer in a vehicle).
    #[actionlike(DualAxis)]
    Move,
    /// Mouse look (yaw/pitch).
    #[actionlike(DualAxis)]
    Look,
    /// Jump (Space).
    Jump,
    /// Sprint (Shift).
    Sprint,
    /// Enter/exit vehicle (F).
    Interact,
    /// Return to the spawn point (R).
    Respawn,
    /// Grab cursor (left click when ungrabbed).
    GrabCursor,
    /// Release cursor (ESC).
    ReleaseCursor,
}

/// Create the default input map.
pub fn default_input_map() -> InputMap<CityAction> {
    InputMap::default()
        .with_dual_axis(CityAction::Move, VirtualDPad::wasd())
        .with_dual_axis(CityAction::Look, MouseMove::default())
        .with(CityAction::Jump, KeyCode::Space)
        .with(CityAction::Sprint, KeyCode::ShiftLeft)
        .with(CityAction::Sprint, KeyCode::ShiftRight)
        .with(CityAction::Interact, KeyCode::KeyF)
        .with(CityAction::Respawn, KeyCode::KeyR)
        .with(CityAction::GrabCursor, MouseButton::Left)
        .with(CityAction::ReleaseCursor, KeyCode::Escape)
}

/// Gameplay actions disabled while the cursor is free.
const GAMEPLAY_ACTIONS: &[CityAction] = &[
    CityAction::Move,
    CityAction::Look,
    CityAction::Jump,
    CityAction::Sprint,
    CityAction::Interact,
    CityAction::Respawn,
];

/// This frame's input, in the form the simulation consumes.
#[derive(Resource, Default, Debug)]
pub struct FrameInput(pub InputState);

// ============================================================================
// Plugin
// ============================================================================

/// Plugin that registers the action type, focus management and capture.
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InputManagerPlugin::<CityAction>::default())
            .init_resource::<FrameInput>()
            .add_systems(Startup, spawn_input_entity)
            .add_systems(
                PreUpdate,
                (manage_input_focus, capture_frame_input)
                    .chain()
                    .after(InputManagerSystem::Update),
            )
            .add_systems(Update, cursor_grab_system);
    }
}

fn spawn_input_entity(mut commands: Commands) {
    commands.spawn(default_input_map());
}

// ============================================================================
// Cursor grab
// ============================================================================

/// Set cursor grab state, centering the cursor when grabbing.
pub fn set_cursor_grab(cursor: &mut CursorOptions, window: &mut Window, grabbed: bool) {
    if grabbed {
        // Native: Use Locked mode for true mouse capture.
        // WASM: Use Confined mode (Locked not supported in browsers).
        #[cfg(not(target_family = "wasm"))]
        {
            cursor.grab_mode = CursorGrabMode::Locked;
        }
        #[cfg(target_family = "wasm")]
        {
            cursor.grab_mode = CursorGrabMode::Confined;
        }
        cursor.visible = false;
        let center = Vec2::new(window.width() / 2.0, window.height() / 2.0);
        window.set_cursor_position(Some(center));
    } else {
        cursor.grab_mode = CursorGrabMode::None;
        cursor.visible = true;
    }
}

/// Handle cursor grab/ungrab with ESC and left-click.
fn cursor_grab_system(
    action_query: Query<&ActionState<CityAction>>,
    mut cursor: Single<&mut CursorOptions>,
    mut window: Single<&mut Window, With<PrimaryWindow>>,
    mut contexts: EguiContexts,
) {
    let Ok(action_state) = action_query.single() else {
        return;
    };

    if action_state.just_pressed(&CityAction::ReleaseCursor) {
        set_cursor_grab(&mut cursor, &mut window, false);
        return;
    }

    if action_state.just_pressed(&CityAction::GrabCursor) {
        // Don't grab if clicking on egui UI.
        let egui_wants_pointer = contexts
            .ctx_mut()
            .ok()
            .is_some_and(|ctx| ctx.is_pointer_over_area());

        if !egui_wants_pointer {
            set_cursor_grab(&mut cursor, &mut window, true);
        }
    }
}

// ============================================================================
// Input focus and capture
// ============================================================================

/// Disable gameplay actions when the cursor is free or egui wants the keyboard.
fn manage_input_focus(
    mut query: Query<&mut ActionState<CityAction>>,
    mut contexts: EguiContexts,
    cursor: Single<&CursorOptions>,
) {
    let egui_wants_kb = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.wants_keyboard_input());

    let is_grabbed = matches!(
        cursor.grab_mode,
        CursorGrabMode::Locked | CursorGrabMode::Confined
    );

    for mut action_state in &mut query {
        let enabled = is_grabbed && !egui_wants_kb;
        for action in GAMEPLAY_ACTIONS {
            if enabled {
                action_state.enable_action(action);
            } else {
                action_state.disable_action(action);
            }
        }
        if is_grabbed {
            action_state.disable_action(&CityAction::GrabCursor);
            action_state.enable_action(&CityAction::ReleaseCursor);
        } else {
            action_state.enable_action(&CityAction::GrabCursor);
            action_state.disable_action(&CityAction::ReleaseCursor);
        }
    }
}

/// Translate action state into the key mapping the core reads.
pub fn input_state_from_actions(action_state: &ActionState<CityAction>) -> InputState {
    let movement = action_state.axis_pair(&CityAction::Move);
    let mut input = InputState::default();
    input.set(Key::Forward, movement.y > 0.0);
    input.set(Key::Back, movement.y < 0.0);
    input.set(Key::Left, movement.x < 0.0);
    input.set(Key::Right, movement.x > 0.0);
    input.set(Key::Jump, action_state.pressed(&CityAction::Jump));
    input.set(Key::Sprint, action_state.pressed(&CityAction::Sprint));
    input.set(Key::Interact, action_state.pressed(&CityAction::Interact));
    input.set(Key::Respawn, action_state.pressed(&CityAction::Respawn));
    input.look_delta = action_state.axis_pair(&CityAction::Look);
    input
}

fn capture_frame_input(
    action_query: Query<&ActionState<CityAction>>,
    mut frame_input: ResMut<FrameInput>,
) {
    frame_input.0 = action_query
        .single()
        .map(input_state_from_actions)
        .unwrap_or_default();
}
