//! HUD overlay: control mode, interaction prompt, speed and held keys.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};
use cityrun_core::{ControlMode, HudStatus};

use crate::simulation::CitySimulation;

/// Plugin for the HUD.
pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .add_systems(EguiPrimaryContextPass, hud_system);
    }
}

/// Prompt shown while a vehicle is in reach.
const ENTER_PROMPT: &str = "Press F to enter vehicle";

/// Speed line, only shown while driving.
fn speed_line(hud: &HudStatus) -> Option<String> {
    (hud.mode == ControlMode::Driving).then(|| format!("Speed: {} km/h", hud.speed_kmh))
}

fn hud_system(mut contexts: EguiContexts, simulation: Option<Res<CitySimulation>>) -> Result {
    let Some(simulation) = simulation else {
        return Ok(());
    };
    let ctx = contexts.ctx_mut()?;
    let hud = simulation.0.hud();

    egui::Window::new("Status")
        .default_pos([10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading(hud.mode_label);
            if let Some(speed) = speed_line(&hud) {
                ui.label(speed);
            }
            ui.separator();
            ui.monospace(hud.key_readout());
            ui.small("Click to grab the cursor, ESC to release. R respawns.");
        });

    if hud.can_interact {
        egui::Area::new(egui::Id::new("enter_prompt"))
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -80.0])
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new(ENTER_PROMPT)
                        .size(22.0)
                        .color(egui::Color32::WHITE)
                        .background_color(egui::Color32::from_black_alpha(160)),
                );
            });
    }

    Ok(())
}
