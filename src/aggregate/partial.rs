// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Partition-then-merge tallies

use rayon::prelude::*;
use std::collections::BTreeMap;

use super::view::Diagnostics;
use crate::error::{PipelineError, Result};
use crate::redaction::CancellationToken;
use crate::table::RawRecord;

/// Counts for one partition of rows. Merging is summation per key, so the
/// merged result does not depend on how rows were partitioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partial<K: Ord> {
    pub counts: BTreeMap<K, u64>,
    pub rows: u64,
    pub missing_values: u64,
    pub unparsed_timestamps: u64,
}

impl<K: Ord> Default for Partial<K> {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
            rows: 0,
            missing_values: 0,
            unparsed_timestamps: 0,
        }
    }
}

impl<K: Ord> Partial<K> {
    pub fn add(&mut self, key: K, count: u64) {
        *self.counts.entry(key).or_insert(0) += count;
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            total_rows: self.rows,
            missing_values: self.missing_values,
            unparsed_timestamps: self.unparsed_timestamps,
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        // Fold the smaller map into the larger one
        let (mut into, from) = if self.counts.len() >= other.counts.len() {
            (std::mem::take(&mut self.counts), other.counts)
        } else {
            (other.counts, std::mem::take(&mut self.counts))
        };
        for (key, count) in from {
            *into.entry(key).or_insert(0) += count;
        }
        Self {
            counts: into,
            rows: self.rows + other.rows,
            missing_values: self.missing_values + other.missing_values,
            unparsed_timestamps: self.unparsed_timestamps + other.unparsed_timestamps,
        }
    }
}

/// Split `rows` into partitions of `partition_rows`, tally each with
/// `tally_row`, and merge the partials.
///
/// `cancel` is checked between partitions.
pub fn partition_merge<K, F>(
    rows: &[RawRecord],
    partition_rows: usize,
    cancel: &CancellationToken,
    tally_row: F,
) -> Result<Partial<K>>
where
    K: Ord + Send,
    F: Fn(&RawRecord, &mut Partial<K>) + Sync,
{
    cancel.check()?;
    rows.par_chunks(partition_rows.max(1))
        .map(|chunk| {
            if cancel.is_cancelled() {
                return None;
            }
            let mut partial = Partial::default();
            for row in chunk {
                partial.rows += 1;
                tally_row(row, &mut partial);
            }
            Some(partial)
        })
        .try_reduce(Partial::default, |a, b| Some(a.merge(b)))
        .ok_or(PipelineError::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn rows(labels: &[&str]) -> Vec<RawRecord> {
        labels
            .iter()
            .map(|label| RawRecord::new(vec![CellValue::from(*label)]))
            .collect()
    }

    fn tally(row: &RawRecord, partial: &mut Partial<String>) {
        match row.cell(0).to_label() {
            Some(label) => partial.add(label, 1),
            None => partial.missing_values += 1,
        }
    }

    #[test]
    fn test_merge_sums_counts() {
        let mut a = Partial::default();
        a.add("x", 2);
        a.add("y", 1);
        a.rows = 3;
        let mut b = Partial::default();
        b.add("y", 4);
        b.rows = 4;
        b.missing_values = 1;

        let merged = a.merge(b);
        assert_eq!(merged.counts.get("x"), Some(&2));
        assert_eq!(merged.counts.get("y"), Some(&5));
        assert_eq!(merged.rows, 7);
        assert_eq!(merged.missing_values, 1);
    }

    #[test]
    fn test_partitioning_does_not_change_result() {
        let data = rows(&["a", "b", "a", " ", "c", "a", "b"]);
        let cancel = CancellationToken::new();
        let whole = partition_merge(&data, 1000, &cancel, tally).unwrap();
        for size in [1, 2, 3, 5] {
            assert_eq!(partition_merge(&data, size, &cancel, tally).unwrap(), whole);
        }
        assert_eq!(whole.counts.get("a"), Some(&3));
        assert_eq!(whole.missing_values, 1);
        assert_eq!(whole.rows, 7);
    }

    #[test]
    fn test_cancelled() {
        let data = rows(&["a"]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = partition_merge(&data, 1, &cancel, tally);
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }
}
