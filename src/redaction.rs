// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Redaction engine: applies the pattern registry to text columns of a table

use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{PipelineError, Result};
use crate::pii_filter::{MatchCounts, PatternRegistry};
use crate::schema::{CanonicalSchema, SemanticField};
use crate::table::{CellValue, RawRecord, RawTable};

/// Advisory cancellation flag shared between a caller and in-flight work
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Audit totals for one redaction run. Never contains matched text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RedactionSummary {
    pub rows: u64,
    pub rows_with_pii: u64,
    pub counts: MatchCounts,
    /// Non-null cells in text fields that were not text
    pub non_text_cells: u64,
}

impl RedactionSummary {
    fn merge(mut self, other: Self) -> Self {
        self.rows += other.rows;
        self.rows_with_pii += other.rows_with_pii;
        self.counts += other.counts;
        self.non_text_cells += other.non_text_cells;
        self
    }
}

/// A table whose designated text fields have been redacted
#[derive(Debug, Clone, PartialEq)]
pub struct RedactedTable {
    table: RawTable,
    summary: RedactionSummary,
}

impl RedactedTable {
    pub fn table(&self) -> &RawTable {
        &self.table
    }

    pub fn rows(&self) -> &[RawRecord] {
        self.table.rows()
    }

    pub fn summary(&self) -> &RedactionSummary {
        &self.summary
    }

    pub fn into_table(self) -> RawTable {
        self.table
    }
}

/// Applies a shared [`PatternRegistry`] to the text columns of a table
#[derive(Debug, Clone, Copy)]
pub struct RedactionEngine<'r> {
    registry: &'r PatternRegistry,
    min_rows_per_task: usize,
}

impl<'r> RedactionEngine<'r> {
    pub fn new(registry: &'r PatternRegistry) -> Self {
        Self {
            registry,
            min_rows_per_task: 256,
        }
    }

    pub fn with_min_rows_per_task(mut self, rows: usize) -> Self {
        self.min_rows_per_task = rows.max(1);
        self
    }

    /// Redact `text_fields` of every row into a new table.
    ///
    /// Fields absent from `schema` are skipped. The input table is untouched.
    pub fn redact(
        &self,
        table: &RawTable,
        schema: &CanonicalSchema,
        text_fields: &[SemanticField],
    ) -> RedactedTable {
        let columns = text_columns(schema, text_fields);
        let rows_and_stats: Vec<(RawRecord, RedactionSummary)> = table
            .rows()
            .par_iter()
            .with_min_len(self.min_rows_per_task)
            .map(|row| self.redact_row(row, &columns))
            .collect();
        self.finish(table, rows_and_stats)
    }

    /// Same as [`redact`](Self::redact), but stops early once `cancel` is set
    pub fn redact_with_cancel(
        &self,
        table: &RawTable,
        schema: &CanonicalSchema,
        text_fields: &[SemanticField],
        cancel: &CancellationToken,
    ) -> Result<RedactedTable> {
        cancel.check()?;
        let columns = text_columns(schema, text_fields);
        let redacted: Option<Vec<(RawRecord, RedactionSummary)>> = table
            .rows()
            .par_iter()
            .with_min_len(self.min_rows_per_task)
            .map(|row| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.redact_row(row, &columns))
            })
            .collect();

        let rows_and_stats = redacted.ok_or(PipelineError::Cancelled)?;
        Ok(self.finish(table, rows_and_stats))
    }

    fn finish(
        &self,
        table: &RawTable,
        rows_and_stats: Vec<(RawRecord, RedactionSummary)>,
    ) -> RedactedTable {
        let summary = rows_and_stats
            .iter()
            .map(|(_, stats)| *stats)
            .fold(RedactionSummary::default(), RedactionSummary::merge);
        let rows = rows_and_stats.into_iter().map(|(row, _)| row).collect();

        if self.registry.config().log_detections {
            tracing::info!(
                rows = summary.rows,
                rows_with_pii = summary.rows_with_pii,
                email = summary.counts.email,
                phone = summary.counts.phone,
                credit_card = summary.counts.credit_card,
                name = summary.counts.name,
                non_text_cells = summary.non_text_cells,
                "redaction complete"
            );
            for category in self.registry.categories() {
                tracing::debug!(
                    category = category.as_str(),
                    token = category.token(),
                    matches = summary.counts.get(category),
                    "redaction matches"
                );
            }
        }

        RedactedTable {
            table: RawTable::new(table.headers().to_vec(), rows),
            summary,
        }
    }

    fn redact_row(&self, row: &RawRecord, columns: &[usize]) -> (RawRecord, RedactionSummary) {
        let mut out = row.clone();
        let mut stats = RedactionSummary {
            rows: 1,
            ..Default::default()
        };

        for &column in columns {
            match row.cell(column) {
                CellValue::Text(_) => {
                    let (cell, counts) = self.registry.apply_cell(row.cell(column));
                    if !counts.is_empty() {
                        out.set_cell(column, cell);
                        stats.counts += counts;
                    }
                }
                CellValue::Null => {}
                _ => stats.non_text_cells += 1,
            }
        }

        if !stats.counts.is_empty() {
            stats.rows_with_pii = 1;
        }
        (out, stats)
    }
}

fn text_columns(schema: &CanonicalSchema, text_fields: &[SemanticField]) -> Vec<usize> {
    let mut columns: Vec<usize> = text_fields
        .iter()
        .filter_map(|field| schema.column(*field))
        .collect();
    columns.sort_unstable();
    columns.dedup();
    columns
}
