// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Grouped tallies: category/severity, partner and region breakdowns

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::view::{round_to, Metrics, SeverityLevel, ViewRow};
use crate::config::{AggregationConfig, SeverityThresholds};
use crate::schema::{CanonicalSchema, SemanticField};
use crate::table::RawRecord;

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const UNSPECIFIED: &str = "Unspecified";
pub const UNKNOWN: &str = "Unknown";

/// Label used when `field` is absent or blank
pub fn fallback_label(field: SemanticField) -> &'static str {
    match field {
        SemanticField::Category => UNCATEGORIZED,
        SemanticField::SubCategory => UNSPECIFIED,
        _ => UNKNOWN,
    }
}

/// Grouping label of `field` for `row`.
///
/// Blank cells in a present column bump `missing`; an absent column does not.
pub fn group_label(
    row: &RawRecord,
    schema: &CanonicalSchema,
    field: SemanticField,
    missing: &mut u64,
) -> String {
    match schema.column(field) {
        Some(column) => row.cell(column).to_label().unwrap_or_else(|| {
            *missing += 1;
            fallback_label(field).to_string()
        }),
        None => fallback_label(field).to_string(),
    }
}

/// `weight × log2(1 + count)`
pub fn severity_score(weight: f64, count: u64) -> f64 {
    weight * ((count + 1) as f64).log2()
}

pub fn severity_level(share_pct: f64, thresholds: &SeverityThresholds) -> SeverityLevel {
    if share_pct > thresholds.critical {
        SeverityLevel::Critical
    } else if share_pct > thresholds.high {
        SeverityLevel::High
    } else if share_pct > thresholds.medium {
        SeverityLevel::Medium
    } else {
        SeverityLevel::Low
    }
}

pub fn share_pct(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// Which key component carries the category for weighting, if any
#[derive(Debug, Clone, Copy)]
pub enum Weighting {
    None,
    CategoryAt(usize),
}

/// Turn grouped counts into ranked rows with share, severity and,
/// when weighted, a severity score.
///
/// Rows are ordered by score (weighted) or count, descending; ties go to the
/// lexically smaller key.
pub fn ranked_rows(
    counts: BTreeMap<Vec<String>, u64>,
    config: &AggregationConfig,
    weighting: Weighting,
) -> Vec<ViewRow> {
    let total: u64 = counts.values().sum();

    let mut rows: Vec<ViewRow> = counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(key, count)| {
            let share = share_pct(count, total);
            let mut metrics = Metrics::with_count(count);
            metrics.share_pct = Some(round_to(share, 2));
            metrics.severity = Some(severity_level(share, &config.severity_thresholds));
            if let Weighting::CategoryAt(position) = weighting {
                let category = key.get(position).map(String::as_str).unwrap_or(UNCATEGORIZED);
                let score = severity_score(config.category_weight(category), count);
                metrics.severity_score = Some(round_to(score, 4));
            }
            ViewRow::new(key, metrics)
        })
        .collect();

    rows.sort_by(compare_ranked);
    for (index, row) in rows.iter_mut().enumerate() {
        row.metrics.rank = Some(index as u32 + 1);
    }
    rows
}

fn compare_ranked(a: &ViewRow, b: &ViewRow) -> Ordering {
    let score_a = a.metrics.severity_score.unwrap_or(0.0);
    let score_b = b.metrics.severity_score.unwrap_or(0.0);
    score_b
        .total_cmp(&score_a)
        .then(b.metrics.count.cmp(&a.metrics.count))
        .then_with(|| a.key.cmp(&b.key))
}

/// Case-insensitive substring filter on partner names. Blank filters match all.
#[derive(Debug, Clone)]
pub struct PartnerFilter(Option<String>);

impl PartnerFilter {
    pub fn new(filter: Option<&str>) -> Self {
        Self(
            filter
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty()),
        )
    }

    pub fn matches(&self, partner: Option<&str>) -> bool {
        match (&self.0, partner) {
            (None, _) => true,
            (Some(needle), Some(partner)) => partner.to_lowercase().contains(needle.as_str()),
            (Some(_), None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(entries: &[(&[&str], u64)]) -> BTreeMap<Vec<String>, u64> {
        entries
            .iter()
            .map(|(key, count)| (key.iter().map(|s| s.to_string()).collect(), *count))
            .collect()
    }

    #[test]
    fn test_weighted_severity_beats_volume() {
        let mut config = AggregationConfig::default();
        config.category_weights.insert("Billing".into(), 2.0);

        let rows = ranked_rows(
            counts(&[(&["Billing", "Refund"], 30), (&["General", "Other"], 70)]),
            &config,
            Weighting::CategoryAt(0),
        );

        assert_eq!(rows[0].key[0], "Billing");
        let billing = rows[0].metrics.severity_score.unwrap();
        let general = rows[1].metrics.severity_score.unwrap();
        assert!(billing > general);
        assert_eq!(rows[0].metrics.rank, Some(1));
        assert_eq!(rows[1].metrics.share_pct, Some(70.0));
        assert_eq!(rows[1].metrics.severity, Some(SeverityLevel::Critical));
    }

    #[test]
    fn test_score_monotonic() {
        assert!(severity_score(1.0, 11) > severity_score(1.0, 10));
        assert!(severity_score(1.5, 10) > severity_score(1.0, 10));
        assert_eq!(severity_score(1.0, 0), 0.0);
    }

    #[test]
    fn test_ties_broken_lexically() {
        let rows = ranked_rows(
            counts(&[(&["b"], 5), (&["a"], 5), (&["c"], 9)]),
            &AggregationConfig::default(),
            Weighting::None,
        );
        let keys: Vec<&str> = rows.iter().map(|r| r.key[0].as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
        assert!(rows.iter().all(|r| r.metrics.severity_score.is_none()));
    }

    #[test]
    fn test_severity_levels() {
        let thresholds = SeverityThresholds::default();
        assert_eq!(severity_level(15.1, &thresholds), SeverityLevel::Critical);
        assert_eq!(severity_level(15.0, &thresholds), SeverityLevel::High);
        assert_eq!(severity_level(5.0, &thresholds), SeverityLevel::Medium);
        assert_eq!(severity_level(4.0, &thresholds), SeverityLevel::Low);
    }

    #[test]
    fn test_partner_filter() {
        let filter = PartnerFilter::new(Some(" SKY "));
        assert!(filter.matches(Some("Sky UK")));
        assert!(filter.matches(Some("NOW by sky")));
        assert!(!filter.matches(Some("Netflix")));
        assert!(!filter.matches(None));
        assert!(PartnerFilter::new(Some("")).matches(None));
    }
}
