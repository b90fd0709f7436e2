use std::collections::HashMap;

use eframe::egui::Vec2;

use crate::config::EngineConfig;
use crate::layout::{LayoutMode, Simulation, seed_position};
use crate::papers::GroupAxes;
use crate::scene::{ActiveView, Scene, SceneNode};

const SEED_SPREAD: f32 = 60.0;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LayoutSignature {
    pub view: ActiveView,
    pub grouping: GroupAxes,
    pub layout: LayoutMode,
}

impl LayoutSignature {
    pub fn active_group(&self) -> Option<&str> {
        self.view.active_group()
    }

    fn same_except_layout(&self, other: &Self) -> bool {
        self.view == other.view && self.grouping == other.grouping && self.layout != other.layout
    }
}

#[derive(Clone, Debug, Default)]
pub struct PositionCache {
    scopes: HashMap<LayoutSignature, HashMap<String, Vec2>>,
}

impl PositionCache {
    pub fn get(&self, signature: &LayoutSignature, id: &str) -> Option<Vec2> {
        self.scopes.get(signature)?.get(id).copied()
    }

    pub fn scope(&self, signature: &LayoutSignature) -> Option<&HashMap<String, Vec2>> {
        self.scopes.get(signature)
    }

    pub fn store<'a>(
        &mut self,
        signature: &LayoutSignature,
        positions: impl IntoIterator<Item = (&'a str, Vec2)>,
    ) {
        let scope = self.scopes.entry(signature.clone()).or_default();
        for (id, position) in positions {
            scope.insert(id.to_owned(), position);
        }
    }

    /// Drops every scope built under `grouping`; its group keys no longer
    /// name anything once the grouping changes.
    pub fn invalidate_grouping(&mut self, grouping: GroupAxes) -> usize {
        let before = self.scopes.len();
        self.scopes
            .retain(|signature, _| signature.grouping != grouping);
        before - self.scopes.len()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    Reuse,
    Restored,
    Settled { iterations: usize },
    Live,
    Refresh { iterations: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Cooled,
    TimedOut,
    Superseded,
    Teardown,
}

#[derive(Clone, Debug)]
pub struct ExitingNode {
    pub node: SceneNode,
    pub position: Vec2,
    pub started: f64,
}

#[derive(Clone, Copy, Debug)]
struct LiveRun {
    started: f64,
}

pub struct TransitionManager {
    signature: Option<LayoutSignature>,
    scene: Scene,
    simulation: Option<Simulation>,
    index_by_id: HashMap<String, usize>,
    live: Option<LiveRun>,
    fade_started: HashMap<String, f64>,
    exiting: Vec<ExitingNode>,
    cache: PositionCache,
}

impl Default for TransitionManager {
    fn default() -> Self {
        Self {
            signature: None,
            scene: Scene::default(),
            simulation: None,
            index_by_id: HashMap::new(),
            live: None,
            fade_started: HashMap::new(),
            exiting: Vec::new(),
            cache: PositionCache::default(),
        }
    }
}

impl TransitionManager {
    pub fn signature(&self) -> Option<&LayoutSignature> {
        self.signature.as_ref()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    pub fn exiting(&self) -> &[ExitingNode] {
        &self.exiting
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn position(&self, id: &str) -> Option<Vec2> {
        let index = *self.index_by_id.get(id)?;
        self.simulation.as_ref()?.positions().get(index).copied()
    }

    pub fn positions(&self) -> &[Vec2] {
        self.simulation
            .as_ref()
            .map(Simulation::positions)
            .unwrap_or(&[])
    }

    pub fn opacity(&self, id: &str, now: f64, fade_in_secs: f32) -> f32 {
        match self.fade_started.get(id) {
            Some(started) => fade_progress(now - started, fade_in_secs),
            None => 1.0,
        }
    }

    pub fn exit_opacity(exiting: &ExitingNode, now: f64, fade_out_secs: f32) -> f32 {
        1.0 - fade_progress(now - exiting.started, fade_out_secs)
    }

    pub fn enter(
        &mut self,
        signature: LayoutSignature,
        scene: Scene,
        now: f64,
        config: &EngineConfig,
    ) -> TransitionKind {
        let previous = self.signature.clone();
        let membership_changed = !same_membership(&self.scene, &scene);

        if previous.as_ref() == Some(&signature) && !membership_changed {
            return TransitionKind::Reuse;
        }

        if let Some(previous) = previous.as_ref()
            && signature.same_except_layout(previous)
            && !membership_changed
            && self.simulation.is_some()
        {
            self.stop_live(StopReason::Superseded);
            self.remember_current();
            if let Some(simulation) = self.simulation.as_mut() {
                simulation.set_mode(signature.layout);
                simulation.reheat(config.transition.live_alpha);
            }
            self.live = Some(LiveRun { started: now });
            tracing::info!(layout = signature.layout.label(), "live layout transition");
            self.signature = Some(signature);
            return TransitionKind::Live;
        }

        self.stop_live(StopReason::Superseded);
        self.remember_current();
        if let Some(previous) = previous.as_ref()
            && previous.grouping != signature.grouping
        {
            let dropped = self.cache.invalidate_grouping(previous.grouping);
            tracing::debug!(dropped, "grouping changed, dropped cached positions");
        }

        let refresh = previous.as_ref() == Some(&signature);
        self.collect_exits(&scene, now, refresh);

        let fresh_ids = scene
            .nodes
            .iter()
            .filter(|node| self.index_by_id.get(&node.id).is_none() || !refresh)
            .map(|node| node.id.clone())
            .collect::<Vec<_>>();

        let (positions, all_cached) = self.seed_positions(&signature, &scene);
        let (nodes, links) = scene.simulation_inputs(&config.viewport);
        let mut simulation = Simulation::new(
            nodes,
            links,
            positions,
            signature.layout,
            config.simulation.clone(),
        );

        let kind = if all_cached && !refresh && !scene.nodes.is_empty() {
            simulation.reheat(0.0);
            TransitionKind::Restored
        } else {
            let iterations = simulation.run_to_convergence();
            if refresh {
                TransitionKind::Refresh { iterations }
            } else {
                TransitionKind::Settled { iterations }
            }
        };

        self.index_by_id = scene
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
        self.cache.store(
            &signature,
            scene
                .nodes
                .iter()
                .map(|node| node.id.as_str())
                .zip(simulation.positions().iter().copied()),
        );
        self.fade_started
            .retain(|id, _| scene.index_of(id).is_some());
        for id in fresh_ids {
            self.fade_started.insert(id, now);
        }

        tracing::info!(
            view = ?signature.view,
            grouping = ?signature.grouping,
            layout = signature.layout.label(),
            nodes = scene.nodes.len(),
            transition = ?kind,
            "entered layout"
        );
        self.simulation = Some(simulation);
        self.scene = scene;
        self.signature = Some(signature);
        kind
    }

    /// Advances a live transition by one tick. Returns true while the layout
    /// is still moving or nodes are still fading.
    pub fn tick(&mut self, now: f64, config: &EngineConfig) -> bool {
        self.exiting.retain(|exiting| {
            now - exiting.started < f64::from(config.transition.fade_out_secs)
        });
        let fading = !self.exiting.is_empty()
            || self.fade_started.values().any(|started| {
                now - started < f64::from(config.transition.fade_in_secs)
            });

        let Some(live) = self.live else {
            return fading;
        };
        if now - live.started > f64::from(config.transition.live_timeout_secs) {
            self.stop_live(StopReason::TimedOut);
            return fading;
        }

        let Some(simulation) = self.simulation.as_mut() else {
            self.live = None;
            return fading;
        };
        simulation.tick();
        let cooled = simulation.is_cold();
        self.remember_current();
        if cooled {
            self.stop_live(StopReason::Cooled);
        }
        true
    }

    pub fn stop_live(&mut self, reason: StopReason) {
        if self.live.take().is_some() {
            tracing::debug!(?reason, "stopped live simulation");
        }
    }

    pub fn teardown(&mut self) {
        self.stop_live(StopReason::Teardown);
        self.exiting.clear();
    }

    fn remember_current(&mut self) {
        let (Some(signature), Some(simulation)) = (self.signature.as_ref(), self.simulation.as_ref())
        else {
            return;
        };
        self.cache.store(
            signature,
            self.scene
                .nodes
                .iter()
                .map(|node| node.id.as_str())
                .zip(simulation.positions().iter().copied()),
        );
    }

    /// Nodes of a kind the new view cannot show vanish at once; the rest
    /// fade out where they stood.
    fn collect_exits(&mut self, next: &Scene, now: f64, refresh: bool) {
        let kind = next.view.node_kind();
        let positions = self.positions().to_vec();
        let leaving = self
            .scene
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| next.index_of(&node.id).is_none())
            .filter(|(_, node)| refresh || node.kind == kind)
            .map(|(index, node)| ExitingNode {
                node: node.clone(),
                position: positions.get(index).copied().unwrap_or(Vec2::ZERO),
                started: now,
            })
            .collect::<Vec<_>>();
        if !refresh {
            self.exiting.retain(|exiting| exiting.node.kind == kind);
        }
        self.exiting.extend(leaving);
    }

    fn seed_positions(&self, signature: &LayoutSignature, scene: &Scene) -> (Vec<Vec2>, bool) {
        let spread = SEED_SPREAD * (scene.nodes.len().max(1) as f32).sqrt();
        let mut all_cached = true;
        let positions = scene
            .nodes
            .iter()
            .map(|node| {
                if let Some(position) = self.cache.get(signature, &node.id) {
                    return position;
                }
                all_cached = false;
                self.position(&node.id)
                    .unwrap_or_else(|| seed_position(&node.id, spread))
            })
            .collect();
        (positions, all_cached)
    }
}

fn fade_progress(elapsed: f64, duration_secs: f32) -> f32 {
    if duration_secs <= 0.0 {
        return 1.0;
    }
    (elapsed / f64::from(duration_secs)).clamp(0.0, 1.0) as f32
}

fn same_membership(current: &Scene, next: &Scene) -> bool {
    current.nodes.len() == next.nodes.len()
        && current
            .nodes
            .iter()
            .zip(&next.nodes)
            .all(|(a, b)| a.id == b.id && a.kind == b.kind)
}
