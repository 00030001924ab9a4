// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Weighted phrase dictionary for theme classification

use std::collections::BTreeMap;

use super::tally::{share_pct, UNKNOWN};
use super::view::{round_to, Metrics, ThemeStrength, ViewRow};
use crate::config::ThemeDefinition;

/// Compiled theme dictionary: lowercase phrases with weights
#[derive(Debug, Clone)]
pub struct ThemeClassifier {
    themes: Vec<(String, Vec<(String, u32)>)>,
}

impl ThemeClassifier {
    pub fn new(definitions: &[ThemeDefinition]) -> Self {
        let themes = definitions
            .iter()
            .map(|theme| {
                let phrases = theme
                    .phrases
                    .iter()
                    .map(|(phrase, weight)| (phrase.trim().to_lowercase(), *weight))
                    .filter(|(phrase, _)| !phrase.is_empty())
                    .collect();
                (theme.name.clone(), phrases)
            })
            .collect();
        Self { themes }
    }

    /// Theme with the highest summed phrase weight.
    ///
    /// Ties go to the theme listed first; no hits at all is `"Unknown"`.
    pub fn classify(&self, text: &str) -> &str {
        let lowered = text.to_lowercase();
        let mut best: Option<(&str, u32)> = None;
        for (name, phrases) in &self.themes {
            let score: u32 = phrases
                .iter()
                .filter(|(phrase, _)| lowered.contains(phrase.as_str()))
                .map(|(_, weight)| *weight)
                .sum();
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((name, score));
            }
        }
        best.map_or(UNKNOWN, |(name, _)| name)
    }
}

pub fn theme_strength(share_pct: f64) -> ThemeStrength {
    if share_pct > 30.0 {
        ThemeStrength::Dominant
    } else if share_pct > 20.0 {
        ThemeStrength::High
    } else if share_pct > 10.0 {
        ThemeStrength::Moderate
    } else {
        ThemeStrength::Low
    }
}

/// Rows for theme counts keyed by `(group, theme)`. Share and rank are
/// computed within each group; an empty group vector means overall.
pub fn theme_rows(counts: BTreeMap<(Vec<String>, String), u64>) -> Vec<ViewRow> {
    let mut groups: BTreeMap<Vec<String>, Vec<(String, u64)>> = BTreeMap::new();
    for ((group, theme), count) in counts {
        if count > 0 {
            groups.entry(group).or_default().push((theme, count));
        }
    }

    let mut rows = Vec::new();
    for (group, mut themes) in groups {
        let total: u64 = themes.iter().map(|(_, count)| count).sum();
        themes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (index, (theme, count)) in themes.into_iter().enumerate() {
            let share = share_pct(count, total);
            let mut metrics = Metrics::with_count(count);
            metrics.share_pct = Some(round_to(share, 2));
            metrics.strength = Some(theme_strength(share));
            metrics.rank = Some(index as u32 + 1);

            let mut key = group.clone();
            key.push(theme);
            rows.push(ViewRow::new(key, metrics));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregationConfig;

    fn classifier() -> ThemeClassifier {
        ThemeClassifier::new(&AggregationConfig::default().themes)
    }

    #[test]
    fn test_classify_highest_weight() {
        let themes = classifier();
        assert_eq!(themes.classify("I forgot password and cannot login"), "Login");
        assert_eq!(themes.classify("Unexpected charge, I want a REFUND"), "Billing");
        assert_eq!(themes.classify("nothing relevant here"), "Unknown");
    }

    #[test]
    fn test_tie_goes_to_first_theme() {
        let themes = ThemeClassifier::new(&[
            ThemeDefinition {
                name: "First".into(),
                phrases: vec![("alpha".into(), 2)],
            },
            ThemeDefinition {
                name: "Second".into(),
                phrases: vec![("beta".into(), 2)],
            },
        ]);
        assert_eq!(themes.classify("alpha beta"), "First");
    }

    #[test]
    fn test_theme_rows_share_within_group() {
        let mut counts = BTreeMap::new();
        counts.insert((vec!["UK".to_string()], "Billing".to_string()), 3);
        counts.insert((vec!["UK".to_string()], "Login".to_string()), 1);
        counts.insert((vec!["DE".to_string()], "Login".to_string()), 2);

        let rows = theme_rows(counts);
        assert_eq!(rows[0].key, vec!["DE", "Login"]);
        assert_eq!(rows[0].metrics.share_pct, Some(100.0));
        assert_eq!(rows[1].key, vec!["UK", "Billing"]);
        assert_eq!(rows[1].metrics.share_pct, Some(75.0));
        assert_eq!(rows[1].metrics.strength, Some(ThemeStrength::Dominant));
        assert_eq!(rows[2].metrics.rank, Some(2));
    }

    #[test]
    fn test_strength_bands() {
        assert_eq!(theme_strength(30.5), ThemeStrength::Dominant);
        assert_eq!(theme_strength(25.0), ThemeStrength::High);
        assert_eq!(theme_strength(10.0), ThemeStrength::Low);
    }
}
