use std::collections::{HashMap, HashSet};

use crate::config::{SimulationConfig, ViewportConfig};
use crate::engine::transform::AxisScale;
use crate::layout::{SimLink, SimNode};
use crate::papers::{GroupAxes, PaperDataset, aggregate};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ActiveView {
    #[default]
    Galaxy,
    Detail {
        group: String,
    },
}

impl ActiveView {
    pub fn node_kind(&self) -> NodeKind {
        match self {
            Self::Galaxy => NodeKind::Group,
            Self::Detail { .. } => NodeKind::Paper,
        }
    }

    pub fn active_group(&self) -> Option<&str> {
        match self {
            Self::Galaxy => None,
            Self::Detail { group } => Some(group),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Group,
    Paper,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    /// Layout radius at scale 1.
    pub radius: f32,
    pub year: i32,
    pub lane: f32,
    pub weight: f32,
    pub members: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneEdge {
    pub source: usize,
    pub target: usize,
    pub weight: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub view: ActiveView,
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub years: (i32, i32),
    pub lane_count: usize,
}

pub fn group_radius(members: usize) -> f32 {
    (10.0 + 0.3 * (members as f32).sqrt()).min(60.0)
}

impl Scene {
    pub fn build(
        dataset: &PaperDataset,
        axes: GroupAxes,
        view: &ActiveView,
        simulation: &SimulationConfig,
    ) -> Self {
        match view {
            ActiveView::Galaxy => Self::galaxy(dataset, axes),
            ActiveView::Detail { group } => Self::detail(dataset, axes, group, simulation),
        }
    }

    pub fn galaxy(dataset: &PaperDataset, axes: GroupAxes) -> Self {
        let (groups, aggregate_edges) = aggregate(dataset, axes);

        let nodes = groups
            .into_iter()
            .map(|group| SceneNode {
                radius: group_radius(group.member_count),
                id: group.key,
                kind: NodeKind::Group,
                label: group.label,
                year: group.earliest_year,
                lane: group.lane as f32,
                weight: group.citation_sum as f32,
                members: group.member_count,
            })
            .collect::<Vec<_>>();

        let lane_count = nodes
            .iter()
            .map(|node| node.lane as usize + 1)
            .max()
            .unwrap_or(1);
        let index = index_by_id(&nodes);
        let edges = aggregate_edges
            .into_iter()
            .filter_map(|edge| {
                Some(SceneEdge {
                    source: *index.get(edge.source.as_str())?,
                    target: *index.get(edge.target.as_str())?,
                    weight: edge.weight,
                })
            })
            .collect();

        Self::finish(ActiveView::Galaxy, nodes, edges, lane_count)
    }

    pub fn detail(
        dataset: &PaperDataset,
        axes: GroupAxes,
        group: &str,
        simulation: &SimulationConfig,
    ) -> Self {
        let nodes = dataset
            .papers
            .iter()
            .filter(|paper| axes.key_of(paper) == group)
            .map(|paper| SceneNode {
                id: paper.id.clone(),
                kind: NodeKind::Paper,
                label: paper.title.clone(),
                radius: paper.size() * simulation.paper_radius_unit,
                year: paper.year,
                lane: paper.lane_position(),
                weight: paper.citations as f32,
                members: 1,
            })
            .collect::<Vec<_>>();

        let index = index_by_id(&nodes);
        let edges = dataset
            .edges
            .iter()
            .filter_map(|edge| {
                Some(SceneEdge {
                    source: *index.get(edge.source.as_str())?,
                    target: *index.get(edge.target.as_str())?,
                    weight: edge.weight,
                })
            })
            .collect();

        let view = ActiveView::Detail {
            group: group.to_owned(),
        };
        Self::finish(view, nodes, edges, dataset.fields.len().max(1))
    }

    fn finish(
        view: ActiveView,
        nodes: Vec<SceneNode>,
        edges: Vec<SceneEdge>,
        lane_count: usize,
    ) -> Self {
        let years = nodes
            .iter()
            .map(|node| node.year)
            .fold(None, |range: Option<(i32, i32)>, year| {
                Some(match range {
                    Some((low, high)) => (low.min(year), high.max(year)),
                    None => (year, year),
                })
            })
            .unwrap_or((crate::papers::DEFAULT_YEAR, crate::papers::DEFAULT_YEAR));

        Self {
            view,
            nodes,
            edges,
            years,
            lane_count,
        }
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes
            .binary_search_by(|node| node.id.as_str().cmp(id))
            .ok()
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(|node| node.id.as_str()).collect()
    }

    pub fn timeline_scales(&self, viewport: &ViewportConfig) -> (AxisScale, AxisScale) {
        let half_width = viewport.timeline_width * 0.5;
        let last_lane = self.lane_count.saturating_sub(1) as f32;
        let half_height = last_lane * viewport.lane_spacing * 0.5;
        (
            AxisScale::linear(
                (self.years.0 as f32, self.years.1 as f32),
                (-half_width, half_width),
            ),
            AxisScale::linear((0.0, last_lane), (-half_height, half_height)),
        )
    }

    pub fn simulation_inputs(&self, viewport: &ViewportConfig) -> (Vec<SimNode>, Vec<SimLink>) {
        let (x_scale, y_scale) = self.timeline_scales(viewport);
        let nodes = self
            .nodes
            .iter()
            .map(|node| SimNode {
                radius: node.radius,
                weight: node.weight,
                timeline_target: eframe::egui::vec2(
                    x_scale.apply(node.year as f32),
                    y_scale.apply(node.lane),
                ),
            })
            .collect();
        let links = self
            .edges
            .iter()
            .map(|edge| SimLink {
                source: edge.source,
                target: edge.target,
                weight: edge.weight,
            })
            .collect();
        (nodes, links)
    }
}

fn index_by_id(nodes: &[SceneNode]) -> HashMap<&str, usize> {
    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::papers::{PaperEdge, test_paper};

    fn dataset() -> PaperDataset {
        let edge = |source: &str, target: &str| PaperEdge {
            source: source.to_owned(),
            target: target.to_owned(),
            weight: 1.0,
        };
        PaperDataset::new(
            vec![
                test_paper("p1", "NLP", 2001, 10),
                test_paper("p2", "NLP", 2011, 3),
                test_paper("p3", "Vision", 2015, 0),
            ],
            vec![edge("p1", "p2"), edge("p2", "p3")],
        )
    }

    #[test]
    fn galaxy_has_one_node_per_group() {
        let scene = Scene::galaxy(&dataset(), GroupAxes::default());
        let ids = scene.nodes.iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["field:NLP", "field:Vision"]);
        assert!(scene.nodes.iter().all(|node| node.kind == NodeKind::Group));
        assert_eq!(scene.nodes[0].members, 2);
        assert_eq!(scene.nodes[0].year, 2001);
        assert_eq!(scene.edges.len(), 1);
        assert_eq!(scene.lane_count, 2);
        assert_eq!(scene.index_of("field:Vision"), Some(1));
    }

    #[test]
    fn detail_keeps_members_and_their_citations() {
        let scene = Scene::detail(
            &dataset(),
            GroupAxes::default(),
            "field:NLP",
            &SimulationConfig::default(),
        );
        assert_eq!(scene.nodes.len(), 2);
        assert!(scene.nodes.iter().all(|node| node.kind == NodeKind::Paper));
        assert_eq!(
            scene.edges,
            vec![SceneEdge {
                source: 0,
                target: 1,
                weight: 1.0
            }]
        );
        assert_eq!(scene.years, (2001, 2011));
        assert_eq!(scene.view.active_group(), Some("field:NLP"));
    }

    #[test]
    fn unknown_group_gives_empty_detail() {
        let scene = Scene::detail(
            &dataset(),
            GroupAxes::default(),
            "field:Nothing",
            &SimulationConfig::default(),
        );
        assert!(scene.nodes.is_empty());
        assert!(scene.edges.is_empty());
    }

    #[test]
    fn timeline_scales_span_configured_width() {
        let scene = Scene::galaxy(&dataset(), GroupAxes::default());
        let viewport = ViewportConfig::default();
        let (years, lanes) = scene.timeline_scales(&viewport);
        assert_eq!(years.apply(2001.0), -viewport.timeline_width * 0.5);
        assert_eq!(years.apply(2015.0), viewport.timeline_width * 0.5);
        assert_eq!(lanes.apply(0.0), -viewport.lane_spacing * 0.5);
        assert_eq!(lanes.apply(1.0), viewport.lane_spacing * 0.5);
    }

    #[test]
    fn group_radius_is_capped() {
        assert_eq!(group_radius(0), 10.0);
        assert_eq!(group_radius(1_000_000), 60.0);
    }
}
