// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Read-only aggregation views and their JSON form

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::AggregationRequest;
use crate::error::Result;

/// Bucket-over-bucket movement label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Spike,
    Up,
    Down,
    Flat,
}

/// Severity label derived from share of total volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityLevel {
    Critical,
    High,
    Medium,
    Low,
}

/// Theme strength derived from share of its group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThemeStrength {
    Dominant,
    High,
    Moderate,
    Low,
}

/// Metrics attached to one view row. Only `count` is always present.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Metrics {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<SeverityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<ThemeStrength>,
}

impl Metrics {
    pub fn with_count(count: u64) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }
}

/// One keyed row of a view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewRow {
    pub key: Vec<String>,
    #[serde(flatten)]
    pub metrics: Metrics,
}

impl ViewRow {
    pub fn new(key: Vec<String>, metrics: Metrics) -> Self {
        Self { key, metrics }
    }
}

/// Non-fatal data quality counters gathered while aggregating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Diagnostics {
    pub total_rows: u64,
    /// Rows whose grouping value was blank and fell back to a default label
    pub missing_values: u64,
    pub unparsed_timestamps: u64,
}

/// Derived, read-only table produced for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationView {
    request: AggregationRequest,
    dimensions: Vec<&'static str>,
    rows: Vec<ViewRow>,
    diagnostics: Diagnostics,
}

impl AggregationView {
    pub(crate) fn new(
        request: AggregationRequest,
        dimensions: Vec<&'static str>,
        rows: Vec<ViewRow>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            request,
            dimensions,
            rows,
            diagnostics,
        }
    }

    pub fn request(&self) -> &AggregationRequest {
        &self.request
    }

    /// Names of the key columns, in key order
    pub fn dimensions(&self) -> &[&'static str] {
        &self.dimensions
    }

    pub fn rows(&self) -> &[ViewRow] {
        &self.rows
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Row with exactly this key, if present
    pub fn get(&self, key: &[&str]) -> Option<&ViewRow> {
        self.rows
            .iter()
            .find(|row| row.key.iter().map(String::as_str).eq(key.iter().copied()))
    }

    /// (token, frequency) pairs, in rank order. Meaningful for keyword views.
    pub fn token_frequencies(&self) -> Vec<(&str, u64)> {
        self.rows
            .iter()
            .filter_map(|row| row.key.last().map(|token| (token.as_str(), row.metrics.count)))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 of the compact JSON form, lowercase hex
    pub fn fingerprint(&self) -> Result<String> {
        let json = self.to_json()?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Round to `places` decimal places
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AggregationView {
        let mut metrics = Metrics::with_count(3);
        metrics.rank = Some(1);
        AggregationView::new(
            AggregationRequest::RegionBreakdown,
            vec!["country"],
            vec![ViewRow::new(vec!["UK".into()], metrics)],
            Diagnostics {
                total_rows: 3,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_json_skips_absent_metrics() {
        let json = sample().to_json().unwrap();
        assert!(json.contains(r#""key":["UK"],"count":3,"rank":1"#));
        assert!(!json.contains("delta"));
        assert!(json.contains(r#""kind":"region_breakdown""#));
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = sample().fingerprint().unwrap();
        let b = sample().fingerprint().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_get_by_key() {
        let view = sample();
        assert_eq!(view.get(&["UK"]).map(|row| row.metrics.count), Some(3));
        assert!(view.get(&["FR"]).is_none());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(33.3333, 2), 33.33);
    }
}
