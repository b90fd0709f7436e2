mod forces;
mod quadtree;

use eframe::egui::{Vec2, vec2};

use crate::config::SimulationConfig;
use crate::util::stable_pair;
use forces::{CollisionParams, accumulate_collision_pairs, accumulate_repulsion_for_node};
use quadtree::QuadNode;

const BARNES_HUT_THETA: f32 = 0.72;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LayoutMode {
    #[default]
    Central,
    Timeline,
}

impl LayoutMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Central => "Central",
            Self::Timeline => "Timeline",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimNode {
    pub radius: f32,
    /// Heavier nodes are pulled closer to the middle in the central layout.
    pub weight: f32,
    /// Where the timeline layout binds this node, in layout space.
    pub timeline_target: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
    pub weight: f32,
}

/// Starting position for a node with no remembered position: spread by its
/// id hash so reloads place it identically.
pub fn seed_position(id: &str, spread: f32) -> Vec2 {
    let (x, y) = stable_pair(id);
    vec2(x, y) * spread
}

#[derive(Default)]
struct Scratch {
    forces: Vec<Vec2>,
    radii: Vec<f32>,
}

/// Alpha-cooled force simulation over layout space.
pub struct Simulation {
    nodes: Vec<SimNode>,
    links: Vec<SimLink>,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    radial_targets: Vec<f32>,
    alpha: f32,
    mode: LayoutMode,
    config: SimulationConfig,
    scratch: Scratch,
}

impl Simulation {
    pub fn new(
        nodes: Vec<SimNode>,
        links: Vec<SimLink>,
        positions: Vec<Vec2>,
        mode: LayoutMode,
        config: SimulationConfig,
    ) -> Self {
        debug_assert_eq!(nodes.len(), positions.len());
        let count = nodes.len();
        let links = links
            .into_iter()
            .filter(|link| link.source < count && link.target < count && link.source != link.target)
            .collect();
        let radial_targets = radial_targets(&nodes, config.radial_spacing);

        Self {
            velocities: vec![Vec2::ZERO; count],
            nodes,
            links,
            positions,
            radial_targets,
            alpha: 1.0,
            mode,
            config,
            scratch: Scratch::default(),
        }
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LayoutMode) {
        self.mode = mode;
    }

    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn is_cold(&self) -> bool {
        self.alpha < self.config.alpha_min
    }

    /// Iterates until alpha drops below the settle threshold or the
    /// iteration cap is hit. Returns the number of ticks run.
    pub fn run_to_convergence(&mut self) -> usize {
        let mut iterations = 0;
        while self.alpha >= self.config.settle_alpha
            && iterations < self.config.max_settle_iterations
        {
            self.tick();
            iterations += 1;
        }
        iterations
    }

    pub fn tick(&mut self) {
        let count = self.nodes.len();
        self.alpha += (0.0 - self.alpha) * self.config.alpha_decay;
        if count == 0 {
            return;
        }

        let config = &self.config;
        let alpha = self.alpha;
        let scratch = &mut self.scratch;
        scratch.forces.clear();
        scratch.forces.resize(count, Vec2::ZERO);
        scratch.radii.clear();
        scratch.radii.extend(self.nodes.iter().map(|node| node.radius));
        let max_radius = scratch.radii.iter().copied().fold(0.0_f32, f32::max);

        let forces = &mut scratch.forces;
        let positions = &self.positions;

        if count > 1
            && let Some(quadtree) = QuadNode::build(positions)
        {
            for (index, force) in forces.iter_mut().enumerate() {
                let mut repulsion = Vec2::ZERO;
                accumulate_repulsion_for_node(
                    &quadtree,
                    index,
                    positions,
                    config.repulsion,
                    config.softening,
                    BARNES_HUT_THETA,
                    &mut repulsion,
                );
                *force += repulsion * alpha;
            }

            let max_distance = max_radius * 2.0 * config.collision_padding;
            if max_distance > 0.0 {
                accumulate_collision_pairs(
                    &quadtree,
                    &quadtree,
                    true,
                    positions,
                    &scratch.radii,
                    CollisionParams {
                        strength: config.collision_strength,
                        padding: config.collision_padding,
                        max_distance_sq: max_distance * max_distance,
                    },
                    forces,
                );
            }
        }

        for link in &self.links {
            let delta = positions[link.target] - positions[link.source];
            let distance = delta.length();
            if distance <= 0.0001 {
                continue;
            }
            let strength = config.link_strength * link.weight.max(0.0).ln_1p().clamp(0.25, 3.0);
            let pull = delta / distance * ((distance - config.link_distance) * strength * alpha);
            forces[link.source] += pull * 0.5;
            forces[link.target] -= pull * 0.5;
        }

        match self.mode {
            LayoutMode::Central => {
                for (index, force) in forces.iter_mut().enumerate() {
                    let position = positions[index];
                    *force -= position * (config.center_strength * alpha);

                    let radius = position.length();
                    if radius > 0.0001 {
                        let error = radius - self.radial_targets[index];
                        *force -= position / radius * (error * config.radial_strength * alpha);
                    }
                }
            }
            LayoutMode::Timeline => {
                for (index, force) in forces.iter_mut().enumerate() {
                    let error = self.nodes[index].timeline_target - positions[index];
                    *force += error * (config.timeline_strength * alpha);
                }
            }
        }

        let keep = 1.0 - config.velocity_decay;
        for index in 0..count {
            let mut velocity = (self.velocities[index] + forces[index]) * keep;
            let speed = velocity.length();
            if speed > config.max_speed {
                velocity *= config.max_speed / speed;
            }
            if !velocity.is_finite() {
                velocity = Vec2::ZERO;
            }
            self.velocities[index] = velocity;
            self.positions[index] += velocity;
        }
    }
}

fn radial_targets(nodes: &[SimNode], spacing: f32) -> Vec<f32> {
    let max_weight = nodes
        .iter()
        .map(|node| node.weight)
        .fold(0.0_f32, f32::max);
    let ring = spacing * (nodes.len() as f32).sqrt();
    nodes
        .iter()
        .map(|node| {
            let share = if max_weight > 0.0 {
                (node.weight / max_weight).sqrt()
            } else {
                0.0
            };
            ring * (1.0 - share)
        })
        .collect()
}
