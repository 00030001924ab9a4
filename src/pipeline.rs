// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Pipeline: resolve -> redact -> aggregate

use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::{AggregationEngine, AggregationRequest, AggregationView};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::logging::OperationTimer;
use crate::pii_filter::PatternRegistry;
use crate::redaction::{CancellationToken, RedactedTable, RedactionEngine, RedactionSummary};
use crate::schema::{CanonicalSchema, ColumnResolver, SemanticField};
use crate::table::{RawTable, TableSummary};

/// A resolved and redacted table, ready for any number of aggregations
#[derive(Debug, Clone)]
pub struct PreparedTable {
    run_id: Uuid,
    schema: CanonicalSchema,
    redacted: RedactedTable,
    summary: TableSummary,
}

impl PreparedTable {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn schema(&self) -> &CanonicalSchema {
        &self.schema
    }

    pub fn redacted(&self) -> &RedactedTable {
        &self.redacted
    }

    pub fn redaction_summary(&self) -> &RedactionSummary {
        self.redacted.summary()
    }

    pub fn table_summary(&self) -> TableSummary {
        self.summary
    }

    /// Audit record of the run: shape and per-category counts only
    pub fn audit(&self) -> PreparedAudit {
        PreparedAudit {
            run_id: self.run_id.to_string(),
            table: self.summary,
            redaction: *self.redacted.summary(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedAudit {
    pub run_id: String,
    pub table: TableSummary,
    pub redaction: RedactionSummary,
}

/// Owns the compiled registry and engines for one configuration
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    resolver: ColumnResolver,
    registry: PatternRegistry,
    engine: AggregationEngine,
}

impl Pipeline {
    /// Compile patterns and build the engines. Fails only on invalid patterns.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let registry = PatternRegistry::new(config.redaction.clone())?;
        let resolver = ColumnResolver::new(config.aliases.clone());
        let engine = AggregationEngine::new(config.aggregation.clone());
        Ok(Self {
            config,
            resolver,
            registry,
            engine,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn resolve(&self, table: &RawTable) -> Result<CanonicalSchema> {
        Ok(self.resolver.resolve(table.headers())?)
    }

    pub fn prepare(&self, table: &RawTable) -> Result<PreparedTable> {
        self.prepare_with_cancel(table, &CancellationToken::new())
    }

    /// Resolve the schema and redact the configured text fields.
    ///
    /// Schema errors surface before any row is touched.
    pub fn prepare_with_cancel(
        &self,
        table: &RawTable,
        cancel: &CancellationToken,
    ) -> Result<PreparedTable> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("prepare", run_id = %run_id);
        let _enter = span.enter();
        let _timer = OperationTimer::new("prepare");

        let schema = self.resolve(table).map_err(|e| {
            tracing::error!(error = %e, "schema resolution failed");
            e
        })?;
        tracing::debug!(
            description = ?schema.header(SemanticField::Description),
            translation = ?schema.header(SemanticField::DescriptionTranslation),
            category = ?schema.header(SemanticField::Category),
            sub_category = ?schema.header(SemanticField::SubCategory),
            "schema resolved"
        );

        let redacted = RedactionEngine::new(&self.registry)
            .with_min_rows_per_task(self.config.min_rows_per_task)
            .redact_with_cancel(table, &schema, &self.config.text_fields, cancel)?;

        tracing::info!(
            rows = table.row_count(),
            columns = table.column_count(),
            pii_matches = redacted.summary().counts.total(),
            "table prepared"
        );

        Ok(PreparedTable {
            run_id,
            schema,
            redacted,
            summary: table.summary(),
        })
    }

    pub fn aggregate(
        &self,
        prepared: &PreparedTable,
        request: &AggregationRequest,
    ) -> Result<AggregationView> {
        self.aggregate_with_cancel(prepared, request, &CancellationToken::new())
    }

    pub fn aggregate_with_cancel(
        &self,
        prepared: &PreparedTable,
        request: &AggregationRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregationView> {
        let span = tracing::info_span!("aggregate", run_id = %prepared.run_id, view = request.name());
        let _enter = span.enter();
        self.engine
            .aggregate_with_cancel(&prepared.redacted, &prepared.schema, request, cancel)
    }

    /// Prepare `table` and compute each request, in order
    pub fn run(
        &self,
        table: &RawTable,
        requests: &[AggregationRequest],
        cancel: &CancellationToken,
    ) -> Result<(PreparedTable, Vec<AggregationView>)> {
        let prepared = self.prepare_with_cancel(table, cancel)?;
        let views = requests
            .iter()
            .map(|request| self.aggregate_with_cancel(&prepared, request, cancel))
            .collect::<Result<Vec<_>>>()?;
        Ok((prepared, views))
    }
}
