use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::scene::NodeKind;
use crate::util::{format_count, short_title};

use super::super::render_utils::{
    blend_color, circle_visible, citation_color, curved_edge, dim_color, draw_background,
    edge_visible, group_color, label_offset, local_to_screen, with_opacity,
};
use super::super::{SearchMatchCache, ViewModel};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

impl ViewModel {
    /// Ids of current nodes whose label fuzzy-matches the search box.
    pub(in crate::app) fn cached_search_matches(&mut self) -> Option<Arc<HashSet<String>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.query == query
            && cached.view == *self.engine.view()
            && cached.grouping == self.engine.grouping()
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .engine
            .scene()
            .nodes
            .iter()
            .filter(|node| fuzzy_match_score(&matcher, &node.label, query).is_some())
            .map(|node| node.id.clone())
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            view: self.engine.view().clone(),
            grouping: self.engine.grouping(),
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        let now = ui.input(|input| input.time);

        self.engine.set_viewport(rect.size());
        self.handle_graph_input(ui, rect, &response, now);
        let animating = self.engine.frame(now);

        let transform = self.engine.rendered_transform();
        draw_background(&painter, rect, transform);

        if self.engine.scene().nodes.is_empty() && self.engine.transitions().exiting().is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No papers to show.",
                FontId::proportional(15.0),
                Color32::from_gray(170),
            );
            return;
        }

        self.hovered = self.hovered_id(ui, rect);
        if self.hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }
        self.apply_graph_click(&response);

        let search_matches = self.cached_search_matches();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());

        for (year, x) in self.engine.year_ticks(12) {
            let x = rect.left() + x;
            if x < rect.left() || x > rect.right() {
                continue;
            }
            painter.line_segment(
                [egui::pos2(x, rect.top() + 18.0), egui::pos2(x, rect.bottom())],
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(120, 130, 150, 36)),
            );
            painter.text(
                egui::pos2(x, rect.top() + 4.0),
                Align2::CENTER_TOP,
                year.to_string(),
                FontId::proportional(11.0),
                Color32::from_gray(160),
            );
        }

        let edge_width = (0.9 * transform.k.sqrt()).clamp(0.5, 3.0);
        for edge in self.engine.rendered_edges(now) {
            let start = local_to_screen(rect, edge.from);
            let end = local_to_screen(rect, edge.to);
            let bulge = (end - start).length() * 0.12;
            if edge.opacity <= 0.0 || !edge_visible(rect, start, end, bulge) {
                continue;
            }
            let alpha = (70.0 + 90.0 * (edge.weight / 4.0).clamp(0.0, 1.0)) as u8;
            let color = with_opacity(
                Color32::from_rgba_unmultiplied(120, 128, 140, alpha),
                edge.opacity,
            );
            painter.add(curved_edge(start, end, Stroke::new(edge_width, color)));
        }

        let locked = self.engine.locked().map(str::to_owned);
        let (min_weight, max_weight) = self
            .engine
            .scene()
            .nodes
            .iter()
            .fold((f32::MAX, 0.0_f32), |(low, high), node| {
                (low.min(node.weight), high.max(node.weight))
            });

        let mut nodes = self.engine.rendered_nodes(now);
        nodes.sort_by(|a, b| a.radius_px.total_cmp(&b.radius_px));

        let mut lock_animating = false;
        for rendered in &nodes {
            let position = local_to_screen(rect, rendered.screen);
            let radius = rendered.radius_px.max(2.0);
            if rendered.opacity <= 0.0 || !circle_visible(rect, position, radius) {
                continue;
            }

            let node = rendered.node;
            let is_hovered = !rendered.exiting && self.hovered.as_deref() == Some(node.id.as_str());
            let is_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&node.id));

            let base_color = match node.kind {
                NodeKind::Group => group_color(&node.id),
                NodeKind::Paper => citation_color(node.weight, min_weight, max_weight),
            };
            let color = if is_hovered {
                blend_color(base_color, Color32::from_rgb(255, 176, 110), 0.65)
            } else if is_match {
                blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.6)
            } else if search_active {
                dim_color(base_color, 0.4)
            } else {
                base_color
            };

            let lock_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("node-lock", node.id.as_str())),
                locked.as_deref() == Some(node.id.as_str()),
            );
            if lock_mix > 0.0 && lock_mix < 1.0 {
                lock_animating = true;
            }

            painter.circle_filled(position, radius, with_opacity(color, rendered.opacity));
            painter.circle_stroke(
                position,
                radius,
                Stroke::new(
                    1.0 + lock_mix,
                    with_opacity(Color32::from_rgba_unmultiplied(12, 12, 16, 200), rendered.opacity),
                ),
            );
            if lock_mix > 0.0 {
                painter.circle_stroke(
                    position,
                    radius + 3.0 + (1.0 - lock_mix) * 6.0,
                    Stroke::new(
                        1.6,
                        Color32::from_rgba_unmultiplied(245, 206, 93, (lock_mix * 220.0) as u8),
                    ),
                );
            }

            let should_draw_label = node.kind == NodeKind::Group
                || is_hovered
                || is_match
                || lock_mix > 0.0
                || radius > 14.0;
            if should_draw_label {
                let text = match node.kind {
                    NodeKind::Group => format!("{} ({})", short_title(&node.label, 28), node.members),
                    NodeKind::Paper => short_title(&node.label, 40),
                };
                painter.text(
                    position + label_offset(radius),
                    Align2::LEFT_CENTER,
                    text,
                    FontId::proportional(12.0),
                    with_opacity(Color32::from_gray(236), rendered.opacity),
                );
            }
        }

        let scene = self.engine.scene();
        if let Some(hovered) = &self.hovered
            && let Some(node) = scene.index_of(hovered).and_then(|index| scene.nodes.get(index))
        {
            let panel_text = match node.kind {
                NodeKind::Group => format!(
                    "{}  |  {} papers  |  {} citations",
                    node.label,
                    node.members,
                    format_count(node.weight as u64)
                ),
                NodeKind::Paper => format!(
                    "{}  |  {}  |  {} citations",
                    short_title(&node.label, 60),
                    node.year,
                    format_count(node.weight as u64)
                ),
            };
            painter.text(
                rect.left_top() + vec2(10.0, 22.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if animating || lock_animating || self.engine.controller().frame_scheduled() {
            ui.ctx().request_repaint();
        }
    }
}
