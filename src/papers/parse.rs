use anyhow::{Context, Result};
use serde_json::{Map, Value};

use super::DatasetError;
use super::graph::{DEFAULT_YEAR, PaperEdge, PaperNode, UNKNOWN_LABEL};

/// Counts of fields that had to be defaulted while reading paper records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct ParseReport {
    pub(super) skipped: usize,
    pub(super) defaulted_year: usize,
    pub(super) defaulted_citations: usize,
    pub(super) defaulted_field: usize,
}

fn records<'a>(parsed: &'a Value, key: &str, file: &str) -> Result<&'a Vec<Value>, DatasetError> {
    match parsed {
        Value::Array(items) => Ok(items),
        Value::Object(object) => object
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| DatasetError::NotAnArray {
                file: file.to_owned(),
            }),
        _ => Err(DatasetError::NotAnArray {
            file: file.to_owned(),
        }),
    }
}

fn first_value<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let value = first_value(object, keys)?;
    let text = match value {
        Value::String(text) => text.trim().to_owned(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn number(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    let value = match first_value(object, keys)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|value| value.is_finite())
}

fn paper_from_object(object: &Map<String, Value>, report: &mut ParseReport) -> Option<PaperNode> {
    let id = text(object, &["id", "paperId"])?;

    let year = match number(object, &["year"]) {
        Some(year) if (1000.0..=3000.0).contains(&year) => year as i32,
        _ => {
            report.defaulted_year += 1;
            DEFAULT_YEAR
        }
    };

    let citations = match number(object, &["citationCount", "cited_by_count", "citations"]) {
        Some(count) if count >= 0.0 => count as u64,
        _ => {
            report.defaulted_citations += 1;
            0
        }
    };

    let field = text(object, &["primaryField", "field", "category"]).unwrap_or_else(|| {
        report.defaulted_field += 1;
        UNKNOWN_LABEL.to_owned()
    });

    Some(PaperNode {
        title: text(object, &["title"]).unwrap_or_else(|| id.clone()),
        id,
        year,
        field,
        citations,
        first_author: text(object, &["firstAuthor"]).unwrap_or_default(),
        authors: text(object, &["allAuthors", "authors"]).unwrap_or_default(),
        institutions: text(object, &["institutions"]).unwrap_or_default(),
        summary: text(object, &["summary", "abstract"]).unwrap_or_default(),
        z_score: 0.0,
        lane: 0,
        lane_jitter: 0.0,
    })
}

pub(super) fn parse_papers(raw: &str, file: &str) -> Result<(Vec<PaperNode>, ParseReport)> {
    let parsed: Value =
        serde_json::from_str(raw).with_context(|| format!("invalid JSON in {file}"))?;
    let items = records(&parsed, "nodes", file)?;

    let mut report = ParseReport::default();
    let mut papers = Vec::with_capacity(items.len());
    for item in items {
        match item.as_object().and_then(|object| paper_from_object(object, &mut report)) {
            Some(paper) => papers.push(paper),
            None => report.skipped += 1,
        }
    }

    Ok((papers, report))
}

pub(super) fn parse_edges(raw: &str, file: &str) -> Result<(Vec<PaperEdge>, usize)> {
    let parsed: Value =
        serde_json::from_str(raw).with_context(|| format!("invalid JSON in {file}"))?;
    let items = records(&parsed, "edges", file)?;

    let mut skipped = 0usize;
    let mut edges = Vec::with_capacity(items.len());
    for item in items {
        let Some(object) = item.as_object() else {
            skipped += 1;
            continue;
        };
        let (Some(source), Some(target)) = (
            text(object, &["source", "citingPaperId"]),
            text(object, &["target", "citedPaperId"]),
        ) else {
            skipped += 1;
            continue;
        };
        let weight = number(object, &["weight", "importance"])
            .map(|weight| weight as f32)
            .filter(|weight| *weight >= 0.0)
            .unwrap_or(1.0);

        edges.push(PaperEdge {
            source,
            target,
            weight,
        });
    }

    Ok((edges, skipped))
}
