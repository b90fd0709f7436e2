use eframe::egui::{Pos2, Vec2};

use super::controller::GestureController;
use super::semantic::{GroupTarget, SemanticAction, evaluate};
use super::separation::SeparationState;
use super::session::{Anchor, GestureKind, GestureSession, NodeSample, NodeTrack};
use super::transform::{AxisScale, Projection, ZoomTransform, node_screen_radius};
use super::transition::{LayoutSignature, TransitionKind, TransitionManager};
use super::zoom::{ZoomBehavior, ZoomEvent, ZoomEventKind};
use crate::config::{EngineConfig, SeparationConfig};
use crate::layout::LayoutMode;
use crate::papers::{GroupAxes, PaperDataset};
use crate::scene::{ActiveView, NodeKind, Scene, SceneNode};

#[derive(Clone, Copy, Debug)]
pub struct RenderedNode<'a> {
    pub node: &'a SceneNode,
    pub screen: Pos2,
    pub radius_px: f32,
    pub opacity: f32,
    pub exiting: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderedEdge {
    pub from: Pos2,
    pub to: Pos2,
    pub weight: f32,
    pub opacity: f32,
}

/// Top-level visualization controller: owns the live zoom, the gesture state
/// machine, the separation offsets and the layout transitions.
pub struct MapEngine {
    config: EngineConfig,
    dataset: PaperDataset,
    grouping: GroupAxes,
    layout: LayoutMode,
    view: ActiveView,
    viewport: Vec2,
    zoom: ZoomBehavior,
    rendered: ZoomTransform,
    controller: GestureController,
    separation: SeparationState,
    transitions: TransitionManager,
    locked: Option<String>,
    pointer: Option<Pos2>,
    last_wheel: Option<f64>,
    galaxy_transform: Option<ZoomTransform>,
}

impl MapEngine {
    pub fn new(dataset: PaperDataset, config: EngineConfig, viewport: Vec2) -> Self {
        let start = ZoomTransform::centered(viewport, 1.0);
        let zoom = ZoomBehavior::new(start, config.viewport.min_scale, config.viewport.max_scale);
        let mut engine = Self {
            config,
            dataset,
            grouping: GroupAxes::default(),
            layout: LayoutMode::Central,
            view: ActiveView::Galaxy,
            viewport,
            rendered: zoom.transform(),
            zoom,
            controller: GestureController::default(),
            separation: SeparationState::default(),
            transitions: TransitionManager::default(),
            locked: None,
            pointer: None,
            last_wheel: None,
            galaxy_transform: None,
        };
        engine.refresh_layout(0.0);
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dataset(&self) -> &PaperDataset {
        &self.dataset
    }

    pub fn view(&self) -> &ActiveView {
        &self.view
    }

    pub fn grouping(&self) -> GroupAxes {
        self.grouping
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout
    }

    pub fn scene(&self) -> &Scene {
        self.transitions.scene()
    }

    pub fn transitions(&self) -> &TransitionManager {
        &self.transitions
    }

    pub fn separation(&self) -> &SeparationState {
        &self.separation
    }

    pub fn controller(&self) -> &GestureController {
        &self.controller
    }

    /// Transform the canvas renders with this frame.
    pub fn rendered_transform(&self) -> ZoomTransform {
        self.rendered
    }

    /// Live transform driven by input, before any glue correction.
    pub fn raw_transform(&self) -> ZoomTransform {
        self.zoom.transform()
    }

    pub fn locked(&self) -> Option<&str> {
        self.locked.as_deref()
    }

    pub fn projection(&self) -> Projection {
        let (x_scale, y_scale) = match self.layout {
            LayoutMode::Central => (AxisScale::IDENTITY, AxisScale::IDENTITY),
            LayoutMode::Timeline => self.scene().timeline_scales(&self.config.viewport),
        };
        Projection::new(
            x_scale,
            y_scale,
            self.config.time_participation,
            self.config.separation_gain,
        )
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        let delta = viewport - self.viewport;
        if delta.length_sq() < 0.25 {
            return;
        }
        self.viewport = viewport;
        self.controller.cancel();
        self.zoom.replace(self.zoom.transform().translated(delta * 0.5));
        self.rendered = self.zoom.transform();
    }

    pub fn set_separation_gain(&mut self, gain: f32) {
        self.config = self.config.clone().with_separation_gain(gain);
    }

    pub fn set_dataset(&mut self, dataset: PaperDataset, now: f64) {
        self.dataset = dataset;
        self.controller.cancel();
        if let ActiveView::Detail { group } = &self.view
            && !self.dataset.papers.iter().any(|paper| self.grouping.key_of(paper) == *group)
        {
            self.view = ActiveView::Galaxy;
        }
        self.refresh_layout(now);
    }

    pub fn set_grouping(&mut self, grouping: GroupAxes, now: f64) {
        if grouping == self.grouping {
            return;
        }
        self.controller.cancel();
        self.grouping = grouping;
        // Group keys of the old grouping mean nothing now.
        if matches!(self.view, ActiveView::Detail { .. }) {
            self.view = ActiveView::Galaxy;
            self.galaxy_transform = None;
        }
        self.refresh_layout(now);
    }

    pub fn set_layout_mode(&mut self, layout: LayoutMode, now: f64) {
        if layout == self.layout {
            return;
        }
        self.controller.cancel();
        self.layout = layout;
        self.refresh_layout(now);
    }

    /// Re-enters the current signature; a no-op when nothing changed.
    pub fn refresh_layout(&mut self, now: f64) -> TransitionKind {
        let scene = Scene::build(&self.dataset, self.grouping, &self.view, &self.config.simulation);
        let signature = LayoutSignature {
            view: self.view.clone(),
            grouping: self.grouping,
            layout: self.layout,
        };
        let kind = self.transitions.enter(signature, scene, now, &self.config);

        let scene = self.transitions.scene();
        self.separation.retain_ids(&scene.ids());
        if let Some(locked) = &self.locked
            && scene.index_of(locked).is_none()
        {
            self.locked = None;
        }
        kind
    }

    pub fn lock(&mut self, id: &str) {
        if self.scene().index_of(id).is_some() {
            self.locked = Some(id.to_owned());
        }
    }

    pub fn unlock(&mut self) {
        self.locked = None;
    }

    pub fn toggle_lock(&mut self, id: &str) {
        if self.locked.as_deref() == Some(id) {
            self.unlock();
        } else {
            self.lock(id);
        }
    }

    pub fn set_pointer(&mut self, pointer: Option<Pos2>) {
        self.pointer = pointer;
    }

    pub fn reset_view(&mut self) {
        self.controller.cancel();
        self.separation.clear();
        self.apply_programmatic(ZoomTransform::centered(self.viewport, 1.0));
    }

    pub fn wheel(&mut self, pointer: Pos2, factor: f32, now: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.pointer = Some(pointer);
        self.ensure_gesture(GestureKind::Wheel, now);
        self.last_wheel = Some(now);
        let raw = self.zoom.scale_at(factor, pointer);
        self.controller.on_gesture_input(raw);
    }

    pub fn drag_start(&mut self, pointer: Pos2, now: f64) {
        self.pointer = Some(pointer);
        self.ensure_gesture(GestureKind::Drag, now);
    }

    pub fn drag(&mut self, delta: Vec2, now: f64) {
        self.ensure_gesture(GestureKind::Drag, now);
        let raw = self.zoom.translate_by(delta);
        self.controller.on_gesture_input(raw);
    }

    /// One pinch update: the touch midpoint, the zoom factor since the last
    /// update and the midpoint movement.
    pub fn pinch(&mut self, midpoint: Pos2, factor: f32, pan: Vec2, now: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.pointer = Some(midpoint);
        self.ensure_gesture(GestureKind::Pinch, now);
        self.zoom.translate_by(pan);
        let raw = self.zoom.scale_at(factor, midpoint);
        self.controller.on_gesture_input(raw);
    }

    pub fn end_gesture(&mut self, now: f64) {
        if self.controller.session().is_none() {
            return;
        }
        self.run_gesture_frame(now);
        if self.controller.session().is_none() {
            return;
        }

        let raw = self.zoom.transform();
        match self.controller.on_gesture_end(raw, &self.config) {
            Some(target) => {
                let events = self.zoom.set_transform(target);
                self.route_events(events, now);
                self.controller.finish_commit();
                self.rendered = target;
            }
            None => self.rendered = raw,
        }
        self.last_wheel = None;
    }

    /// Once-per-frame step. Returns true while something is still animating.
    pub fn frame(&mut self, now: f64) -> bool {
        if self.controller.active_kind() == Some(GestureKind::Wheel)
            && self
                .last_wheel
                .is_some_and(|last| now - last >= f64::from(self.config.glue.wheel_idle_secs))
        {
            self.end_gesture(now);
        }

        self.run_gesture_frame(now);
        if self.controller.session().is_none() && !self.controller.is_committing() {
            self.rendered = self.zoom.transform();
        }

        let relaxed = self.separation.relax_idle(
            now,
            self.rendered.log_scale(),
            self.controller.session().is_some(),
            self.locked.as_deref(),
            self.config.separation_gain,
            &self.config.separation,
        );
        let moving = self.transitions.tick(now, &self.config);
        relaxed || moving || self.controller.session().is_some()
    }

    fn ensure_gesture(&mut self, kind: GestureKind, now: f64) {
        match self.controller.active_kind() {
            Some(active) if active == kind => return,
            Some(_) => self.end_gesture(now),
            None => {}
        }
        if self.controller.is_committing() {
            return;
        }

        let session = self.build_session(kind, self.zoom.transform());
        self.controller.on_gesture_start(session);
    }

    fn build_session(&self, kind: GestureKind, transform: ZoomTransform) -> GestureSession {
        let projection = self.projection();
        let locked = self.locked.as_deref().and_then(|id| {
            let position = self.transitions.position(id)?;
            let spread = self.separation.offset(id) * self.config.separation.unit_px;
            Some((id, NodeTrack { position, spread }))
        });
        let anchor = Anchor::resolve(&projection, transform, locked, self.pointer);
        let nodes = sample_nodes(
            self.transitions.scene(),
            self.transitions.positions(),
            &self.separation,
            &projection,
            transform,
            &self.config.separation,
        );
        GestureSession::start(
            kind,
            anchor,
            transform,
            &nodes,
            self.config.separation.locality_radius_px,
        )
    }

    fn run_gesture_frame(&mut self, now: f64) {
        let projection = self.projection();
        let scene = self.transitions.scene();
        let positions = self.transitions.positions();
        let separation_config = &self.config.separation;
        let outcome = self.controller.on_gesture_frame(
            &projection,
            &mut self.separation,
            &self.config,
            |transform, separation| {
                sample_nodes(scene, positions, separation, &projection, transform, separation_config)
            },
        );
        let Some(outcome) = outcome else {
            return;
        };
        self.rendered = outcome.rendered;

        if outcome.delta_inc != 0.0 {
            self.check_semantic_zoom(now);
        }
    }

    fn check_semantic_zoom(&mut self, now: f64) {
        let projection = self.projection();
        let transform = self.rendered;
        let groups = self
            .scene()
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind == NodeKind::Group)
            .map(|(index, node)| GroupTarget {
                id: &node.id,
                center: self.screen_at(&projection, transform, index),
                radius: node.radius,
            })
            .collect::<Vec<_>>();
        let action = evaluate(&self.view, transform.k, self.pointer, &groups, &self.config.semantic);

        match action {
            Some(SemanticAction::DrillIn { group }) => {
                let galaxy = self
                    .controller
                    .session()
                    .map(|session| session.start_transform)
                    .unwrap_or(transform);
                tracing::info!(%group, scale = transform.k, "drilling into group");
                self.controller.cancel();
                self.galaxy_transform = Some(galaxy);
                self.view = ActiveView::Detail { group };
                self.refresh_layout(now);
                self.apply_programmatic(ZoomTransform::centered(
                    self.viewport,
                    self.config.semantic.detail_reset_scale,
                ));
            }
            Some(SemanticAction::DrillOut) => {
                tracing::info!(scale = transform.k, "returning to galaxy");
                self.controller.cancel();
                self.view = ActiveView::Galaxy;
                self.refresh_layout(now);
                let restore = self
                    .galaxy_transform
                    .take()
                    .unwrap_or_else(|| ZoomTransform::centered(self.viewport, 1.0));
                self.apply_programmatic(restore);
            }
            None => {}
        }
    }

    /// Sets the live transform from code. The synthetic event sequence runs
    /// while the controller is committing, so no gesture logic reacts to it.
    fn apply_programmatic(&mut self, target: ZoomTransform) {
        self.controller.begin_commit(target);
        let events = self.zoom.set_transform(target);
        self.route_events(events, 0.0);
        self.controller.finish_commit();
        self.rendered = self.zoom.transform();
    }

    fn route_events(&mut self, events: [ZoomEvent; 3], now: f64) {
        for event in events {
            if self.controller.is_committing() {
                tracing::trace!(kind = ?event.kind, "suppressed synthetic zoom event");
                continue;
            }
            match event.kind {
                ZoomEventKind::Start => {
                    let session = self.build_session(GestureKind::Wheel, event.transform);
                    self.controller.on_gesture_start(session);
                }
                ZoomEventKind::Zoom => {
                    self.controller.on_gesture_input(event.transform);
                }
                ZoomEventKind::End => self.end_gesture(now),
            }
        }
    }

    fn screen_at(&self, projection: &Projection, transform: ZoomTransform, index: usize) -> Pos2 {
        let scene = self.scene();
        let base = self
            .transitions
            .positions()
            .get(index)
            .copied()
            .unwrap_or(Vec2::ZERO);
        let displacement = scene
            .nodes
            .get(index)
            .map(|node| {
                self.separation
                    .displacement(&node.id, transform.k, self.config.separation.unit_px)
            })
            .unwrap_or(Vec2::ZERO);
        projection.base_to_screen(transform, base + displacement)
    }

    pub fn screen_position(&self, id: &str) -> Option<Pos2> {
        let index = self.scene().index_of(id)?;
        Some(self.screen_at(&self.projection(), self.rendered, index))
    }

    pub fn rendered_nodes(&self, now: f64) -> Vec<RenderedNode<'_>> {
        let projection = self.projection();
        let transform = self.rendered;
        let exponent = self.config.separation.radius_zoom_exponent;
        let transition = &self.config.transition;

        let mut rendered = self
            .transitions
            .exiting()
            .iter()
            .map(|exiting| RenderedNode {
                node: &exiting.node,
                screen: projection.base_to_screen(transform, exiting.position),
                radius_px: node_screen_radius(exiting.node.radius, transform.k, exponent),
                opacity: TransitionManager::exit_opacity(exiting, now, transition.fade_out_secs),
                exiting: true,
            })
            .collect::<Vec<_>>();

        rendered.extend(self.scene().nodes.iter().enumerate().map(|(index, node)| {
            RenderedNode {
                node,
                screen: self.screen_at(&projection, transform, index),
                radius_px: node_screen_radius(node.radius, transform.k, exponent),
                opacity: self
                    .transitions
                    .opacity(&node.id, now, transition.fade_in_secs),
                exiting: false,
            }
        }));
        rendered
    }

    pub fn rendered_edges(&self, now: f64) -> Vec<RenderedEdge> {
        let projection = self.projection();
        let transform = self.rendered;
        let scene = self.scene();
        let fade_in = self.config.transition.fade_in_secs;

        scene
            .edges
            .iter()
            .filter_map(|edge| {
                let source = scene.nodes.get(edge.source)?;
                let target = scene.nodes.get(edge.target)?;
                let opacity = self
                    .transitions
                    .opacity(&source.id, now, fade_in)
                    .min(self.transitions.opacity(&target.id, now, fade_in));
                Some(RenderedEdge {
                    from: self.screen_at(&projection, transform, edge.source),
                    to: self.screen_at(&projection, transform, edge.target),
                    weight: edge.weight,
                    opacity,
                })
            })
            .collect()
    }

    /// Closest current node whose rendered disc contains `point`.
    pub fn node_at(&self, point: Pos2) -> Option<&SceneNode> {
        let projection = self.projection();
        let transform = self.rendered;
        let exponent = self.config.separation.radius_zoom_exponent;

        self.scene()
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let distance = self.screen_at(&projection, transform, index).distance(point);
                let radius = node_screen_radius(node.radius, transform.k, exponent).max(4.0);
                (distance <= radius).then_some((distance, node))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, node)| node)
    }

    /// Screen x of each whole year tick on the timeline; empty in the
    /// central layout.
    pub fn year_ticks(&self, max_ticks: usize) -> Vec<(i32, f32)> {
        if self.layout != LayoutMode::Timeline || max_ticks == 0 {
            return Vec::new();
        }
        let (first, last) = self.scene().years;
        let span = (last - first).max(0) as usize + 1;
        let step = span.div_ceil(max_ticks).max(1);
        let projection = self.projection();
        (first..=last)
            .step_by(step)
            .map(|year| {
                let x = projection.x.forward(self.rendered.k, self.rendered.x, year as f32);
                (year, x)
            })
            .collect()
    }
}

impl Drop for MapEngine {
    fn drop(&mut self) {
        self.transitions.teardown();
    }
}

fn sample_nodes<'a>(
    scene: &'a Scene,
    positions: &[Vec2],
    separation: &SeparationState,
    projection: &Projection,
    transform: ZoomTransform,
    config: &SeparationConfig,
) -> Vec<NodeSample<'a>> {
    scene
        .nodes
        .iter()
        .zip(positions)
        .map(|(node, base)| {
            let displaced = *base + separation.displacement(&node.id, transform.k, config.unit_px);
            NodeSample {
                id: &node.id,
                screen: projection.base_to_screen(transform, displaced),
                width_px: 2.0
                    * node_screen_radius(node.radius, transform.k, config.radius_zoom_exponent),
            }
        })
        .collect()
}
