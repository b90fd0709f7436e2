use eframe::egui::{self, Align, Context, Layout, vec2};

use crate::config::EngineConfig;
use crate::engine::MapEngine;
use crate::layout::LayoutMode;
use crate::papers::GroupAxes;
use crate::scene::ActiveView;
use crate::util::{format_count, short_title};

use super::super::{DataSource, LoadedData, ViewModel};

impl ViewModel {
    pub(in crate::app) const INITIAL_RANKING_ROWS: usize = 20;
    pub(in crate::app) const RANKING_PAGE_ROWS: usize = 20;

    pub(in crate::app) fn new(loaded: LoadedData, config: EngineConfig) -> Self {
        let separation_gain = config.separation_gain;
        let engine = MapEngine::new(loaded.dataset, config, vec2(1000.0, 800.0));

        Self {
            engine,
            load_error: loaded.error,
            search: String::new(),
            search_match_cache: None,
            hovered: None,
            grouping: GroupAxes::default(),
            separation_gain,
            pinching: false,
            ranking_rows_visible: Self::INITIAL_RANKING_ROWS,
        }
    }

    pub(in crate::app) fn replace_data(&mut self, loaded: LoadedData, now: f64) {
        self.load_error = loaded.error;
        self.engine.set_dataset(loaded.dataset, now);
        self.search_match_cache = None;
        self.hovered = None;
        self.pinching = false;
        self.ranking_rows_visible = Self::INITIAL_RANKING_ROWS;
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        source: &DataSource,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("citemap");
                    ui.separator();
                    ui.label(format!("papers: {}", self.engine.dataset().papers.len()));
                    ui.label(format!("citations: {}", self.engine.dataset().edges.len()));
                    ui.label(format!("fields: {}", self.engine.dataset().fields.len()));
                    if !self.engine.dataset().is_empty() {
                        let (first, last) = self.engine.dataset().year_range();
                        ui.label(format!("years: {first}-{last}"));
                    }
                    ui.label(self.view_text());
                    let reload_button =
                        ui.add_enabled(!is_reloading, egui::Button::new("Reload data"));
                    if reload_button
                        .on_hover_text(format!(
                            "Re-read {} and {}",
                            source.nodes.display(),
                            source.edges.display()
                        ))
                        .clicked()
                    {
                        *reload_requested = true;
                    }
                    if let Some(error) = &self.load_error {
                        ui.colored_label(egui::Color32::from_rgb(236, 120, 96), "load failed")
                            .on_hover_text(error.as_str());
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let transform = self.engine.rendered_transform();
                        ui.label(format!("zoom {:.2}x", transform.k));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                self.draw_controls(ui);
                ui.separator();
                self.draw_rankings(ui);
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));
    }

    fn view_text(&self) -> String {
        match self.engine.view() {
            ActiveView::Galaxy => format!(
                "galaxy: {} groups",
                format_count(self.engine.scene().nodes.len() as u64)
            ),
            ActiveView::Detail { group } => format!(
                "detail: {} ({} papers)",
                short_title(&group_label(group), 36),
                self.engine.scene().nodes.len()
            ),
        }
    }

    pub(in crate::app) fn apply_grouping(&mut self, grouping: GroupAxes, now: f64) {
        if grouping == self.engine.grouping() {
            return;
        }
        tracing::debug!(
            primary = grouping.primary.label(),
            secondary = grouping.secondary.map(|mode| mode.label()),
            "changing grouping"
        );
        self.grouping = grouping;
        self.engine.set_grouping(grouping, now);
        self.search_match_cache = None;
        self.hovered = None;
    }

    pub(in crate::app) fn apply_layout_mode(&mut self, layout: LayoutMode, now: f64) {
        if layout == self.engine.layout_mode() {
            return;
        }
        tracing::debug!(layout = layout.label(), "changing layout mode");
        self.engine.set_layout_mode(layout, now);
    }
}

/// Display form of a group key: `field:Physics|author:Ada` becomes
/// `Physics / Ada`.
pub(in crate::app) fn group_label(key: &str) -> String {
    key.split('|')
        .map(|part| part.split_once(':').map_or(part, |(_, value)| value))
        .collect::<Vec<_>>()
        .join(" / ")
}
