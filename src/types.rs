use geo::Polygon;
use std::collections::{HashMap, HashSet};

/// One cell of the fixed spatial partition. Cells are loaded once per run
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Cell {
    pub name: String,
    pub boundary: Polygon<f64>,
}

/// Load-order index of a cell, used as the aggregate map key. Every process
/// loads the same grid file, so ids agree across the whole pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub usize);

/// One parsed input record. Transient: built from a raw line, folded into
/// an aggregate, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub latitude: f64,
    pub longitude: f64,
    pub language: String,
}

/// A bounded group of raw record lines sent as one message from the
/// dispatcher to a worker. The empty batch is the termination sentinel.
pub type Batch = Vec<String>;

/// Running statistics over classified records. Each worker owns one
/// exclusively; the coordinator folds them all into the global result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    /// Distinct languages observed per cell.
    pub cell_languages: HashMap<CellId, HashSet<String>>,
    /// Records observed per cell.
    pub cell_counts: HashMap<CellId, u64>,
    /// Records observed per language, independent of cell.
    pub language_counts: HashMap<String, u64>,
    /// Records skipped: malformed lines plus points outside every cell.
    pub dropped: u64,
}

impl Aggregate {
    /// Total number of records that landed in some cell.
    pub fn classified(&self) -> u64 {
        self.cell_counts.values().sum()
    }
}
