mod collect;
mod graph;
mod group;
mod parse;

use thiserror::Error;

pub use collect::load_dataset;
pub use graph::{DEFAULT_YEAR, PaperDataset, PaperEdge, PaperNode};
pub use group::{AggregateEdge, AggregateGroup, GroupAxes, GroupingMode, aggregate};

#[cfg(test)]
pub(crate) use graph::test_paper;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{file} does not contain a list of records")]
    NotAnArray { file: String },

    #[error("{file} has no records with a usable id ({skipped} skipped)")]
    NoUsableRecords { file: String, skipped: usize },
}
