use std::collections::{BTreeSet, HashMap};

use crate::util::lane_jitter;

pub const DEFAULT_YEAR: i32 = 2000;
pub const UNKNOWN_LABEL: &str = "Unknown";
pub const LANE_JITTER: f32 = 0.35;

#[derive(Clone, Debug)]
pub struct PaperNode {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub field: String,
    pub citations: u64,
    pub first_author: String,
    pub authors: String,
    pub institutions: String,
    pub summary: String,
    pub z_score: f32,
    pub lane: usize,
    pub lane_jitter: f32,
}

impl PaperNode {
    pub fn lane_position(&self) -> f32 {
        self.lane as f32 + self.lane_jitter
    }

    /// Relative size from citations, `0.5..=2.0`.
    pub fn size(&self) -> f32 {
        if self.citations == 0 {
            return 0.5;
        }
        (0.5 + 0.5 * (self.citations as f32).powf(0.4)).min(2.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaperEdge {
    pub source: String,
    pub target: String,
    pub weight: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PaperDataset {
    pub papers: Vec<PaperNode>,
    pub edges: Vec<PaperEdge>,
    pub index_by_id: HashMap<String, usize>,
    pub fields: Vec<String>,
}

impl PaperDataset {
    /// Builds the dataset and attaches the computed presentation fields
    /// (category lanes, lane jitter, citation z-scores).
    pub fn new(mut papers: Vec<PaperNode>, edges: Vec<PaperEdge>) -> Self {
        papers.sort_by(|a, b| a.id.cmp(&b.id));
        papers.dedup_by(|a, b| a.id == b.id);

        let fields = papers
            .iter()
            .map(|paper| paper.field.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let lane_by_field = fields
            .iter()
            .enumerate()
            .map(|(lane, field)| (field.as_str(), lane))
            .collect::<HashMap<_, _>>();

        let log_citations = papers
            .iter()
            .map(|paper| (paper.citations as f64).ln_1p())
            .collect::<Vec<_>>();
        let count = log_citations.len().max(1) as f64;
        let mean = log_citations.iter().sum::<f64>() / count;
        let variance = log_citations
            .iter()
            .map(|value| (value - mean) * (value - mean))
            .sum::<f64>()
            / count;
        let deviation = variance.sqrt();

        for (paper, log_value) in papers.iter_mut().zip(log_citations) {
            paper.lane = lane_by_field
                .get(paper.field.as_str())
                .copied()
                .unwrap_or(0);
            paper.lane_jitter = lane_jitter(&paper.id, LANE_JITTER);
            paper.z_score = if deviation > f64::EPSILON {
                ((log_value - mean) / deviation) as f32
            } else {
                0.0
            };
        }

        let index_by_id = papers
            .iter()
            .enumerate()
            .map(|(index, paper)| (paper.id.clone(), index))
            .collect::<HashMap<_, _>>();

        let mut edges = edges
            .into_iter()
            .filter(|edge| {
                edge.source != edge.target
                    && index_by_id.contains_key(&edge.source)
                    && index_by_id.contains_key(&edge.target)
            })
            .collect::<Vec<_>>();
        edges.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| a.target.cmp(&b.target))
        });
        edges.dedup_by(|a, b| a.source == b.source && a.target == b.target);

        Self {
            papers,
            edges,
            index_by_id,
            fields,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn paper(&self, id: &str) -> Option<&PaperNode> {
        self.index_by_id
            .get(id)
            .and_then(|&index| self.papers.get(index))
    }

    pub fn year_range(&self) -> (i32, i32) {
        let min = self.papers.iter().map(|paper| paper.year).min();
        let max = self.papers.iter().map(|paper| paper.year).max();
        match (min, max) {
            (Some(min), Some(max)) => (min, max),
            _ => (DEFAULT_YEAR, DEFAULT_YEAR),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_paper(id: &str, field: &str, year: i32, citations: u64) -> PaperNode {
    PaperNode {
        id: id.to_owned(),
        title: format!("Paper {id}"),
        year,
        field: field.to_owned(),
        citations,
        first_author: String::new(),
        authors: String::new(),
        institutions: String::new(),
        summary: String::new(),
        z_score: 0.0,
        lane: 0,
        lane_jitter: 0.0,
    }
}
