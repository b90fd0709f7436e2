use eframe::egui::{self, Ui};

use crate::layout::LayoutMode;
use crate::papers::GroupingMode;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Map Controls");
        ui.separator();
        ui.add_space(4.0);

        let now = ui.input(|input| input.time);

        ui.label("Search (title or group)")
            .on_hover_text("Fuzzy-highlight matching nodes in the current view.");
        ui.text_edit_singleline(&mut self.search);

        ui.separator();

        ui.label("Group papers by");
        let mut grouping = self.grouping;
        ui.horizontal_wrapped(|ui| {
            for mode in GroupingMode::ALL {
                ui.selectable_value(&mut grouping.primary, mode, mode.label());
            }
        });
        egui::ComboBox::from_label("Second axis")
            .selected_text(grouping.secondary.map_or("None", GroupingMode::label))
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut grouping.secondary, None, "None");
                for mode in GroupingMode::ALL {
                    if mode != grouping.primary {
                        ui.selectable_value(&mut grouping.secondary, Some(mode), mode.label());
                    }
                }
            });
        if grouping.secondary == Some(grouping.primary) {
            grouping.secondary = None;
        }
        if grouping != self.grouping {
            self.apply_grouping(grouping, now);
        }

        ui.separator();

        ui.label("Layout");
        let mut layout = self.engine.layout_mode();
        ui.horizontal(|ui| {
            ui.selectable_value(&mut layout, LayoutMode::Central, LayoutMode::Central.label())
                .on_hover_text("Force layout pulled toward the center.");
            ui.selectable_value(&mut layout, LayoutMode::Timeline, LayoutMode::Timeline.label())
                .on_hover_text("Years along x, category lanes along y.");
        });
        self.apply_layout_mode(layout, now);

        let gain_slider = ui
            .add(
                egui::Slider::new(&mut self.separation_gain, 0.0..=1.0)
                    .text("Separation gain")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("How much the lane axis follows zoom, and how fast spread nodes relax.");
        if gain_slider.changed() {
            self.engine.set_separation_gain(self.separation_gain);
        }

        ui.horizontal(|ui| {
            if ui.button("Reset view").clicked() {
                self.engine.reset_view();
            }
            let has_lock = self.engine.locked().is_some();
            if ui
                .add_enabled(has_lock, egui::Button::new("Release anchor"))
                .clicked()
            {
                self.engine.unlock();
            }
        });

        ui.collapsing("Engine state", |ui| {
            let transform = self.engine.rendered_transform();
            ui.label(format!(
                "transform: k {:.3}, x {:.1}, y {:.1}",
                transform.k, transform.x, transform.y
            ));
            ui.label(format!(
                "separated nodes: {} (max {:.2})",
                self.engine.separation().len(),
                self.engine.separation().max_magnitude()
            ));
            let raw = self.engine.raw_transform();
            if raw != transform {
                ui.label(format!(
                    "raw: k {:.3}, x {:.1}, y {:.1}",
                    raw.k, raw.x, raw.y
                ));
            }
            let gesture = match self.engine.controller().session() {
                Some(session) => format!(
                    "{:?} ({:+.3} ln zoom)",
                    session.kind,
                    session.delta_since_start()
                ),
                None if self.engine.controller().is_committing() => "committing".to_owned(),
                None => "idle".to_owned(),
            };
            ui.label(format!("gesture: {gesture}"));
            ui.label(format!(
                "cached layouts: {} positions",
                self.engine.transitions().cache().len()
            ));
            ui.label(format!(
                "simulation: {}",
                if self.engine.transitions().is_live() {
                    "live"
                } else {
                    "settled"
                }
            ));
        });
    }
}
