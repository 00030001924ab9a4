// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Aggregation Engine - derived views over the redacted, resolved table
//
// - Partition-then-merge tallies over ordered maps (rayon)
// - Deterministic ordering: ties break on ascending key
// - Time rollups with gap filling and trend labels

pub mod keywords;
pub mod partial;
pub mod tally;
pub mod themes;
pub mod time;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::{AggregationConfig, TimeBucket, TrendThresholds};
use crate::error::Result;
use crate::redaction::{CancellationToken, RedactedTable};
use crate::schema::{CanonicalSchema, SemanticField};

use partial::partition_merge;
use tally::{group_label, ranked_rows, PartnerFilter, Weighting};
use themes::ThemeClassifier;
use view::round_to;

pub use view::{AggregationView, Diagnostics, Metrics, SeverityLevel, ThemeStrength, Trend, ViewRow};

/// Grouping for keyword frequency tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeywordGroup {
    #[default]
    Overall,
    Category,
    SubCategory,
    Partner,
    Country,
}

impl KeywordGroup {
    fn field(&self) -> Option<SemanticField> {
        match self {
            KeywordGroup::Overall => None,
            KeywordGroup::Category => Some(SemanticField::Category),
            KeywordGroup::SubCategory => Some(SemanticField::SubCategory),
            KeywordGroup::Partner => Some(SemanticField::Partner),
            KeywordGroup::Country => Some(SemanticField::Country),
        }
    }
}

/// One view the analytics modules can ask for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationRequest {
    TimeRollup { bucket: TimeBucket },
    CategoryTally,
    PartnerBreakdown,
    RegionBreakdown,
    PartnerCategory {
        #[serde(default)]
        partner_filter: Option<String>,
    },
    KeywordFrequency {
        #[serde(default)]
        group_by: KeywordGroup,
    },
    ThemeDistribution {
        #[serde(default)]
        group_by_country: bool,
    },
}

impl AggregationRequest {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationRequest::TimeRollup { .. } => "time_rollup",
            AggregationRequest::CategoryTally => "category_tally",
            AggregationRequest::PartnerBreakdown => "partner_breakdown",
            AggregationRequest::RegionBreakdown => "region_breakdown",
            AggregationRequest::PartnerCategory { .. } => "partner_category",
            AggregationRequest::KeywordFrequency { .. } => "keyword_frequency",
            AggregationRequest::ThemeDistribution { .. } => "theme_distribution",
        }
    }

    /// The views behind the analytics modules, with `bucket` for the rollup
    pub fn standard_set(bucket: TimeBucket) -> Vec<AggregationRequest> {
        vec![
            AggregationRequest::TimeRollup { bucket },
            AggregationRequest::CategoryTally,
            AggregationRequest::PartnerBreakdown,
            AggregationRequest::RegionBreakdown,
            AggregationRequest::PartnerCategory {
                partner_filter: None,
            },
            AggregationRequest::KeywordFrequency {
                group_by: KeywordGroup::Overall,
            },
            AggregationRequest::ThemeDistribution {
                group_by_country: true,
            },
        ]
    }
}

/// Computes [`AggregationView`]s from a redacted table
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    config: AggregationConfig,
    themes: ThemeClassifier,
}

impl AggregationEngine {
    pub fn new(config: AggregationConfig) -> Self {
        let themes = ThemeClassifier::new(&config.themes);
        Self { config, themes }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn aggregate(
        &self,
        redacted: &RedactedTable,
        schema: &CanonicalSchema,
        request: &AggregationRequest,
    ) -> Result<AggregationView> {
        self.aggregate_with_cancel(redacted, schema, request, &CancellationToken::new())
    }

    /// Build the view for `request`. Returns `Cancelled` without a partial
    /// view when `cancel` fires.
    pub fn aggregate_with_cancel(
        &self,
        redacted: &RedactedTable,
        schema: &CanonicalSchema,
        request: &AggregationRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregationView> {
        let started = Instant::now();
        let view = match request {
            AggregationRequest::TimeRollup { bucket } => {
                self.time_rollup(redacted, schema, *bucket, request, cancel)?
            }
            AggregationRequest::CategoryTally => self.grouped(
                redacted,
                schema,
                request,
                &[SemanticField::Category, SemanticField::SubCategory],
                Weighting::CategoryAt(0),
                &PartnerFilter::new(None),
                cancel,
            )?,
            AggregationRequest::PartnerBreakdown => self.grouped(
                redacted,
                schema,
                request,
                &[SemanticField::Partner],
                Weighting::None,
                &PartnerFilter::new(None),
                cancel,
            )?,
            AggregationRequest::RegionBreakdown => self.grouped(
                redacted,
                schema,
                request,
                &[SemanticField::Country],
                Weighting::None,
                &PartnerFilter::new(None),
                cancel,
            )?,
            AggregationRequest::PartnerCategory { partner_filter } => self.grouped(
                redacted,
                schema,
                request,
                &[SemanticField::Partner, SemanticField::Category],
                Weighting::CategoryAt(1),
                &PartnerFilter::new(partner_filter.as_deref()),
                cancel,
            )?,
            AggregationRequest::KeywordFrequency { group_by } => {
                self.keyword_frequency(redacted, schema, *group_by, request, cancel)?
            }
            AggregationRequest::ThemeDistribution { group_by_country } => {
                self.theme_distribution(redacted, schema, *group_by_country, request, cancel)?
            }
        };

        tracing::debug!(
            view = request.name(),
            rows = view.diagnostics().total_rows,
            groups = view.rows().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation complete"
        );
        Ok(view)
    }

    fn time_rollup(
        &self,
        redacted: &RedactedTable,
        schema: &CanonicalSchema,
        bucket: TimeBucket,
        request: &AggregationRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregationView> {
        let column = schema.column(SemanticField::Timestamp);
        let partial = partition_merge(
            redacted.rows(),
            self.config.partition_rows,
            cancel,
            |row, partial| {
                let date = column.and_then(|column| time::parse_timestamp(row.cell(column)));
                match date {
                    Some(date) => partial.add(time::bucket_start(date, bucket), 1),
                    None => partial.unparsed_timestamps += 1,
                }
            },
        )?;

        let rows = rollup_rows(&partial.counts, bucket, &self.config.trend_thresholds);
        Ok(AggregationView::new(
            request.clone(),
            vec!["bucket"],
            rows,
            partial.diagnostics(),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn grouped(
        &self,
        redacted: &RedactedTable,
        schema: &CanonicalSchema,
        request: &AggregationRequest,
        fields: &[SemanticField],
        weighting: Weighting,
        partner_filter: &PartnerFilter,
        cancel: &CancellationToken,
    ) -> Result<AggregationView> {
        let partner_column = schema.column(SemanticField::Partner);
        let partial = partition_merge(
            redacted.rows(),
            self.config.partition_rows,
            cancel,
            |row, partial| {
                let partner = partner_column.and_then(|column| row.cell(column).to_label());
                if !partner_filter.matches(partner.as_deref()) {
                    return;
                }
                let key: Vec<String> = fields
                    .iter()
                    .map(|field| group_label(row, schema, *field, &mut partial.missing_values))
                    .collect();
                partial.add(key, 1);
            },
        )?;

        let diagnostics = partial.diagnostics();
        let rows = ranked_rows(partial.counts, &self.config, weighting);
        Ok(AggregationView::new(
            request.clone(),
            fields.iter().map(SemanticField::as_str).collect(),
            rows,
            diagnostics,
        ))
    }

    fn keyword_frequency(
        &self,
        redacted: &RedactedTable,
        schema: &CanonicalSchema,
        group_by: KeywordGroup,
        request: &AggregationRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregationView> {
        let group_field = group_by.field();
        let partial = partition_merge(
            redacted.rows(),
            self.config.partition_rows,
            cancel,
            |row, partial| {
                let Some(text) = keywords::source_text(row, schema, self.config.keyword_source)
                else {
                    return;
                };
                let group: Vec<String> = group_field
                    .map(|field| group_label(row, schema, field, &mut partial.missing_values))
                    .into_iter()
                    .collect();
                for token in keywords::tokenize(&text, &self.config.stopwords) {
                    partial.add((group.clone(), token), 1);
                }
            },
        )?;

        let mut dimensions: Vec<&'static str> =
            group_field.iter().map(SemanticField::as_str).collect();
        dimensions.push("token");

        let diagnostics = partial.diagnostics();
        let rows = keywords::top_tokens(partial.counts, self.config.top_n);
        Ok(AggregationView::new(
            request.clone(),
            dimensions,
            rows,
            diagnostics,
        ))
    }

    fn theme_distribution(
        &self,
        redacted: &RedactedTable,
        schema: &CanonicalSchema,
        group_by_country: bool,
        request: &AggregationRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregationView> {
        let partial = partition_merge(
            redacted.rows(),
            self.config.partition_rows,
            cancel,
            |row, partial| {
                let theme = keywords::source_text(row, schema, self.config.keyword_source)
                    .map_or(tally::UNKNOWN, |text| self.themes.classify(&text))
                    .to_string();
                let group = if group_by_country {
                    vec![group_label(
                        row,
                        schema,
                        SemanticField::Country,
                        &mut partial.missing_values,
                    )]
                } else {
                    Vec::new()
                };
                partial.add((group, theme), 1);
            },
        )?;

        let mut dimensions = Vec::new();
        if group_by_country {
            dimensions.push(SemanticField::Country.as_str());
        }
        dimensions.push("theme");

        let diagnostics = partial.diagnostics();
        Ok(AggregationView::new(
            request.clone(),
            dimensions,
            themes::theme_rows(partial.counts),
            diagnostics,
        ))
    }
}

/// Bucket rows from first to last observed bucket, zero-filling gaps, with
/// delta and trend against the preceding bucket.
fn rollup_rows(
    counts: &BTreeMap<chrono::NaiveDate, u64>,
    bucket: TimeBucket,
    thresholds: &TrendThresholds,
) -> Vec<ViewRow> {
    let (Some((&first, _)), Some((&last, _))) = (counts.first_key_value(), counts.last_key_value())
    else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    let mut previous: Option<u64> = None;
    let mut current = Some(first);
    while let Some(start) = current.filter(|start| *start <= last) {
        let count = counts.get(&start).copied().unwrap_or(0);
        let mut metrics = Metrics::with_count(count);
        if let Some(prior) = previous {
            metrics.delta = Some(count as i64 - prior as i64);
            if prior > 0 {
                let pct = (count as f64 - prior as f64) * 100.0 / prior as f64;
                metrics.delta_pct = Some(round_to(pct, 1));
                metrics.trend = Some(classify_trend(pct, thresholds));
            }
        }
        rows.push(ViewRow::new(vec![start.to_string()], metrics));
        previous = Some(count);
        current = time::next_bucket(start, bucket);
    }
    rows
}

fn classify_trend(delta_pct: f64, thresholds: &TrendThresholds) -> Trend {
    if delta_pct > thresholds.spike {
        Trend::Spike
    } else if delta_pct > thresholds.up {
        Trend::Up
    } else if delta_pct < thresholds.down {
        Trend::Down
    } else {
        Trend::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pii_filter::{PatternRegistry, RedactionConfig};
    use crate::redaction::RedactionEngine;
    use crate::schema::ColumnResolver;
    use crate::table::{CellValue, RawRecord, RawTable};

    struct Row<'a> {
        timestamp: CellValue,
        description: &'a str,
        partner: &'a str,
        country: &'a str,
        category: &'a str,
        sub_category: &'a str,
    }

    fn row<'a>(timestamp: &str, description: &'a str) -> Row<'a> {
        Row {
            timestamp: CellValue::from(timestamp),
            description,
            partner: "Sky",
            country: "UK",
            category: "Billing",
            sub_category: "Refund",
        }
    }

    fn build(rows: Vec<Row<'_>>) -> (RedactedTable, CanonicalSchema) {
        let mut headers: Vec<String> = (0..22).map(|i| format!("col{}", i)).collect();
        headers.push("Category".into());
        headers.push("Sub-Category".into());
        let records = rows
            .into_iter()
            .map(|r| {
                let mut cells = vec![CellValue::Null; 24];
                cells[9] = r.timestamp;
                cells[12] = CellValue::from(r.description);
                cells[18] = CellValue::from(r.partner);
                cells[20] = CellValue::from(r.country);
                cells[22] = CellValue::from(r.category);
                cells[23] = CellValue::from(r.sub_category);
                RawRecord::new(cells)
            })
            .collect();
        let table = RawTable::new(headers, records);
        let schema = ColumnResolver::default().resolve(table.headers()).unwrap();
        let registry = PatternRegistry::new(RedactionConfig::default()).unwrap();
        let redacted = RedactionEngine::new(&registry).redact(
            &table,
            &schema,
            &[SemanticField::Description, SemanticField::DescriptionTranslation],
        );
        (redacted, schema)
    }

    fn engine() -> AggregationEngine {
        let mut config = AggregationConfig::default();
        config.partition_rows = 2;
        AggregationEngine::new(config)
    }

    #[test]
    fn test_time_rollup_fills_gaps() {
        let (redacted, schema) = build(vec![
            row("2024-03-04", "a"),
            row("2024-03-05", "b"),
            row("2024-03-20", "c"),
            row("not a date", "d"),
        ]);
        let view = engine()
            .aggregate(
                &redacted,
                &schema,
                &AggregationRequest::TimeRollup {
                    bucket: TimeBucket::Week,
                },
            )
            .unwrap();

        let keys: Vec<&str> = view.rows().iter().map(|r| r.key[0].as_str()).collect();
        assert_eq!(keys, vec!["2024-03-04", "2024-03-11", "2024-03-18"]);
        let counts: Vec<u64> = view.rows().iter().map(|r| r.metrics.count).collect();
        assert_eq!(counts, vec![2, 0, 1]);

        assert_eq!(view.rows()[0].metrics.delta, None);
        assert_eq!(view.rows()[1].metrics.delta, Some(-2));
        assert_eq!(view.rows()[1].metrics.delta_pct, Some(-100.0));
        assert_eq!(view.rows()[1].metrics.trend, Some(Trend::Down));
        assert_eq!(view.rows()[2].metrics.delta, Some(1));
        assert_eq!(view.rows()[2].metrics.delta_pct, None);
        assert_eq!(view.diagnostics().unparsed_timestamps, 1);
        assert_eq!(view.diagnostics().total_rows, 4);
    }

    #[test]
    fn test_category_tally_defaults_blank_labels() {
        let mut blank = row("2024-03-04", "a");
        blank.category = " ";
        blank.sub_category = "";
        let (redacted, schema) = build(vec![row("2024-03-04", "a"), blank]);

        let view = engine()
            .aggregate(&redacted, &schema, &AggregationRequest::CategoryTally)
            .unwrap();
        assert!(view.get(&["Billing", "Refund"]).is_some());
        assert!(view.get(&["Uncategorized", "Unspecified"]).is_some());
        assert_eq!(view.diagnostics().missing_values, 2);
        assert_eq!(view.dimensions(), &["category", "sub_category"]);
    }

    #[test]
    fn test_partner_category_filter() {
        let mut other = row("2024-03-04", "a");
        other.partner = "Netflix";
        let (redacted, schema) = build(vec![row("2024-03-04", "a"), other]);

        let view = engine()
            .aggregate(
                &redacted,
                &schema,
                &AggregationRequest::PartnerCategory {
                    partner_filter: Some("sky".into()),
                },
            )
            .unwrap();
        assert_eq!(view.rows().len(), 1);
        assert_eq!(view.rows()[0].key, vec!["Sky", "Billing"]);
        assert!(view.rows()[0].metrics.severity_score.is_some());
    }

    #[test]
    fn test_keyword_frequency_excludes_tokens() {
        let (redacted, schema) = build(vec![
            row("2024-03-04", "Refund requested by bob@example.com"),
            row("2024-03-04", "refund again, call 555-123-4567"),
        ]);
        let view = engine()
            .aggregate(
                &redacted,
                &schema,
                &AggregationRequest::KeywordFrequency {
                    group_by: KeywordGroup::Overall,
                },
            )
            .unwrap();

        let tokens = view.token_frequencies();
        assert_eq!(tokens.first(), Some(&("refund", 2)));
        assert!(tokens
            .iter()
            .all(|(token, _)| !token.contains("redacted") && !token.contains("example")));
    }

    #[test]
    fn test_theme_distribution_by_country() {
        let mut german = row("2024-03-04", "forgot password again");
        german.country = "DE";
        let (redacted, schema) = build(vec![
            row("2024-03-04", "I want a refund"),
            row("2024-03-04", "charged twice, refund please"),
            german,
        ]);

        let view = engine()
            .aggregate(
                &redacted,
                &schema,
                &AggregationRequest::ThemeDistribution {
                    group_by_country: true,
                },
            )
            .unwrap();
        assert_eq!(view.get(&["UK", "Billing"]).map(|r| r.metrics.count), Some(2));
        assert_eq!(view.get(&["DE", "Login"]).map(|r| r.metrics.count), Some(1));
        assert_eq!(view.dimensions(), &["country", "theme"]);
    }

    #[test]
    fn test_deterministic_output() {
        let (redacted, schema) = build(vec![
            row("2024-03-04", "refund please"),
            row("2024-03-09", "login broken"),
            row("2024-03-12", "billing issue"),
        ]);
        for request in AggregationRequest::standard_set(TimeBucket::Day) {
            let a = engine().aggregate(&redacted, &schema, &request).unwrap();
            let b = AggregationEngine::new(AggregationConfig::default())
                .aggregate(&redacted, &schema, &request)
                .unwrap();
            assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
            assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        }
    }

    #[test]
    fn test_cancelled_aggregation() {
        let (redacted, schema) = build(vec![row("2024-03-04", "a")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = engine().aggregate_with_cancel(
            &redacted,
            &schema,
            &AggregationRequest::CategoryTally,
            &cancel,
        );
        assert!(matches!(result, Err(crate::error::PipelineError::Cancelled)));
    }

    #[test]
    fn test_trend_thresholds() {
        let t = TrendThresholds::default();
        assert_eq!(classify_trend(20.0, &t), Trend::Spike);
        assert_eq!(classify_trend(10.0, &t), Trend::Up);
        assert_eq!(classify_trend(0.0, &t), Trend::Flat);
        assert_eq!(classify_trend(-10.0, &t), Trend::Flat);
        assert_eq!(classify_trend(-10.5, &t), Trend::Down);
    }

    #[test]
    fn test_request_json_shape() {
        let request: AggregationRequest =
            serde_json::from_str(r#"{"kind": "keyword_frequency", "group_by": "country"}"#)
                .unwrap();
        assert_eq!(
            request,
            AggregationRequest::KeywordFrequency {
                group_by: KeywordGroup::Country
            }
        );
        let rollup: AggregationRequest =
            serde_json::from_str(r#"{"kind": "time_rollup", "bucket": "day"}"#).unwrap();
        assert_eq!(rollup.name(), "time_rollup");
    }
}
