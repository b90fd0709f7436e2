use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::DatasetError;
use super::graph::PaperDataset;
use super::parse::{parse_edges, parse_papers};

pub fn load_dataset(nodes_path: &Path, edges_path: &Path) -> Result<PaperDataset> {
    let nodes_file = nodes_path.display().to_string();
    let edges_file = edges_path.display().to_string();

    let nodes_raw = fs::read_to_string(nodes_path)
        .with_context(|| format!("failed to read paper records from {nodes_file}"))?;
    let edges_raw = fs::read_to_string(edges_path)
        .with_context(|| format!("failed to read citation records from {edges_file}"))?;

    let (papers, report) = parse_papers(&nodes_raw, &nodes_file)?;
    if papers.is_empty() && report.skipped > 0 {
        return Err(DatasetError::NoUsableRecords {
            file: nodes_file,
            skipped: report.skipped,
        }
        .into());
    }

    let (edges, skipped_edges) = parse_edges(&edges_raw, &edges_file)?;
    let edge_records = edges.len();
    let dataset = PaperDataset::new(papers, edges);

    tracing::info!(
        papers = dataset.papers.len(),
        edges = dataset.edges.len(),
        fields = dataset.fields.len(),
        "loaded citation dataset"
    );
    if report.skipped > 0 || skipped_edges > 0 {
        tracing::warn!(
            skipped_papers = report.skipped,
            skipped_edges,
            "skipped records without usable identifiers"
        );
    }
    if report.defaulted_year + report.defaulted_citations + report.defaulted_field > 0 {
        tracing::debug!(
            defaulted_year = report.defaulted_year,
            defaulted_citations = report.defaulted_citations,
            defaulted_field = report.defaulted_field,
            "defaulted missing paper fields"
        );
    }
    tracing::debug!(
        dropped_edges = edge_records - dataset.edges.len(),
        "dropped dangling, duplicate or self citations"
    );

    Ok(dataset)
}
