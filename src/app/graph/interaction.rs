use eframe::egui::{self, Pos2, Rect, Ui};

use super::super::ViewModel;
use super::super::render_utils::screen_to_local;

/// `ln(scale)` per scrolled point.
const WHEEL_ZOOM_RATE: f32 = 0.0018;

impl ViewModel {
    /// Feeds this frame's pointer, wheel, drag and touch input into the
    /// engine. Coordinates are local to the map rect.
    pub(in crate::app) fn handle_graph_input(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        now: f64,
    ) {
        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))
            .map(|pointer| screen_to_local(rect, pointer));
        self.engine.set_pointer(pointer);

        if let Some(touch) = ui.input(|input| input.multi_touch()) {
            let midpoint = screen_to_local(rect, touch.center_pos);
            self.engine
                .pinch(midpoint, touch.zoom_delta, touch.translation_delta, now);
            self.pinching = true;
            return;
        }
        if std::mem::take(&mut self.pinching) {
            self.engine.end_gesture(now);
        }

        if response.hovered()
            && let Some(pointer) = pointer
        {
            self.handle_graph_zoom(ui, pointer, now);
        }
        self.handle_graph_pan(rect, response, now);
    }

    fn handle_graph_zoom(&mut self, ui: &Ui, pointer: Pos2, now: f64) {
        let (scroll, pinch) =
            ui.input(|input| (input.raw_scroll_delta.y, input.zoom_delta()));

        let factor = if (pinch - 1.0).abs() > f32::EPSILON {
            pinch
        } else if scroll.abs() > f32::EPSILON {
            (scroll * WHEEL_ZOOM_RATE).exp()
        } else {
            return;
        };
        self.engine.wheel(pointer, factor, now);
    }

    fn handle_graph_pan(&mut self, rect: Rect, response: &egui::Response, now: f64) {
        if response.drag_started()
            && let Some(pointer) = response.interact_pointer_pos()
        {
            self.engine.drag_start(screen_to_local(rect, pointer), now);
        }

        if response.dragged() {
            let delta = response.drag_delta();
            if delta.length_sq() > 0.0 {
                self.engine.drag(delta, now);
            }
        }

        if response.drag_stopped() {
            self.engine.end_gesture(now);
        }
    }

    /// Node under the pointer, by id.
    pub(in crate::app) fn hovered_id(&self, ui: &Ui, rect: Rect) -> Option<String> {
        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))?;
        self.engine
            .node_at(screen_to_local(rect, pointer))
            .map(|node| node.id.clone())
    }

    /// A click on a node locks it as the zoom anchor, a second click or a
    /// click on empty space releases it.
    pub(in crate::app) fn apply_graph_click(&mut self, response: &egui::Response) {
        if !response.clicked_by(egui::PointerButton::Primary) {
            return;
        }
        match self.hovered.clone() {
            Some(id) => self.engine.toggle_lock(&id),
            None => self.engine.unlock(),
        }
    }
}
