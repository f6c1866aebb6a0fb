//! Per-column observation counts, bucketed by atomic kind.

use std::collections::BTreeMap;

use crate::raw_type::{RawType, classify};

pub type ValueCounts = BTreeMap<String, usize>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnHistogram {
    buckets: BTreeMap<RawType, ValueCounts>,
}

impl ColumnHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `value` and counts it under its kind.
    pub fn record(&mut self, value: &str) {
        let kind = classify(value);
        *self
            .buckets
            .entry(kind)
            .or_default()
            .entry(value.to_string())
            .or_insert(0) += 1;
    }

    pub fn has_empty(&self) -> bool {
        self.buckets.contains_key(&RawType::Empty)
    }

    /// Buckets that take part in class inference (everything but empties).
    pub fn non_empty(&self) -> BTreeMap<RawType, &ValueCounts> {
        self.buckets
            .iter()
            .filter(|(kind, _)| **kind != RawType::Empty)
            .map(|(kind, counts)| (*kind, counts))
            .collect()
    }

    pub fn bucket(&self, kind: RawType) -> Option<&ValueCounts> {
        self.buckets.get(&kind)
    }

    pub fn total(&self) -> usize {
        self.buckets.values().flat_map(|counts| counts.values()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Histograms for every physical column of a table, indexed by position.
#[derive(Debug, Clone, Default)]
pub struct TableHistogram {
    columns: Vec<ColumnHistogram>,
    rows: usize,
}

impl TableHistogram {
    pub fn with_width(width: usize) -> Self {
        Self {
            columns: vec![ColumnHistogram::new(); width],
            rows: 0,
        }
    }

    pub fn record_row<I>(&mut self, row: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for (idx, value) in row.into_iter().enumerate() {
            if idx >= self.columns.len() {
                self.columns.resize_with(idx + 1, ColumnHistogram::new);
            }
            self.columns[idx].record(value.as_ref());
        }
        self.rows += 1;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnHistogram] {
        &self.columns
    }
}
