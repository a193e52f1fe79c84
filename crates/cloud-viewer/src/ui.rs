//! egui overlays: the rotation sliders and a small HUD.

use crate::view::{Axis, ViewState};

/// One horizontal slider per rotation axis. Slider changes write
/// through `ViewState::set_rotation`; the next frame's transform picks
/// the new angle up.
pub fn draw_controls(ctx: &egui::Context, view: &mut ViewState) {
    egui::TopBottomPanel::bottom("rotation_controls").show(ctx, |ui| {
        for (axis, label) in [(Axis::X, "Rot X"), (Axis::Y, "Rot Y"), (Axis::Z, "Rot Z")] {
            let mut degrees = view.rotation(axis);
            let slider = egui::Slider::new(&mut degrees, 0.0..=360.0)
                .text(label)
                .suffix("°");
            if ui.add(slider).changed() {
                view.set_rotation(axis, degrees);
            }
        }
    });
}

/// Point count readout in the window corner.
pub fn draw_hud(ctx: &egui::Context, point_count: u32) {
    egui::Area::new(egui::Id::new("hud"))
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(8.0, 8.0))
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(format!("{} points", point_count))
                    .color(egui::Color32::WHITE)
                    .monospace(),
            );
        });
}
