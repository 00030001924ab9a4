// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Keyword extraction from redacted free text

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use super::view::{Metrics, ViewRow};
use crate::config::KeywordSource;
use crate::pii_filter::masking::strip_tokens;
use crate::schema::{CanonicalSchema, SemanticField};
use crate::table::RawRecord;

/// Free text of `row` selected by `source`, with replacement tokens removed
pub fn source_text<'a>(
    row: &'a RawRecord,
    schema: &CanonicalSchema,
    source: KeywordSource,
) -> Option<Cow<'a, str>> {
    let text_of = move |field: SemanticField| {
        schema
            .column(field)
            .and_then(|column| row.cell(column).as_label())
    };
    let description = text_of(SemanticField::Description);
    let translation = text_of(SemanticField::DescriptionTranslation);

    let text: Cow<'a, str> = match source {
        KeywordSource::Description => Cow::Borrowed(description?),
        KeywordSource::Translation => Cow::Borrowed(translation?),
        KeywordSource::DescriptionWithFallback => Cow::Borrowed(description.or(translation)?),
        KeywordSource::Both => match (description, translation) {
            (Some(d), Some(t)) => Cow::Owned(format!("{} {}", d, t)),
            (Some(one), None) | (None, Some(one)) => Cow::Borrowed(one),
            (None, None) => return None,
        },
    };

    Some(match text {
        Cow::Borrowed(borrowed) => strip_tokens(borrowed),
        Cow::Owned(owned) => Cow::Owned(strip_tokens(&owned).into_owned()),
    })
}

/// Lowercase word tokens of `text`.
///
/// Punctuation separates tokens; stopwords, one-character tokens and purely
/// numeric tokens are dropped.
pub fn tokenize<'s>(
    text: &str,
    stopwords: &'s BTreeSet<String>,
) -> impl Iterator<Item = String> + 's {
    let lowered = text.to_lowercase();
    let tokens: Vec<String> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 1)
        .filter(|token| !token.chars().all(|c| c.is_numeric()))
        .map(str::to_string)
        .collect();
    tokens
        .into_iter()
        .filter(move |token| !stopwords.contains(token))
}

/// Top `top_n` tokens per group, groups in key order, tokens by frequency
/// descending then lexically.
pub fn top_tokens(counts: BTreeMap<(Vec<String>, String), u64>, top_n: usize) -> Vec<ViewRow> {
    let mut groups: BTreeMap<Vec<String>, Vec<(String, u64)>> = BTreeMap::new();
    for ((group, token), count) in counts {
        if count > 0 {
            groups.entry(group).or_default().push((token, count));
        }
    }

    let mut rows = Vec::new();
    for (group, mut tokens) in groups {
        tokens.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (index, (token, count)) in tokens.into_iter().take(top_n).enumerate() {
            let mut key = group.clone();
            key.push(token);
            let mut metrics = Metrics::with_count(count);
            metrics.rank = Some(index as u32 + 1);
            rows.push(ViewRow::new(key, metrics));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnResolver;
    use crate::table::CellValue;

    fn tokens(text: &str) -> Vec<String> {
        let stopwords: BTreeSet<String> =
            ["the", "for", "via"].iter().map(|w| w.to_string()).collect();
        tokenize(text, &stopwords).collect()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokens("The REFUND wasn't issued, 3 times! Order #12345 x"),
            vec!["refund", "wasn", "issued", "times", "order"]
        );
    }

    #[test]
    fn test_tokens_after_strip_have_no_redaction_words() {
        let stripped = strip_tokens("refund for [NAME_REDACTED] via [EMAIL_REDACTED]");
        let words = tokens(&stripped);
        assert!(words.iter().all(|w| w != "redacted" && w != "email" && w != "name"));
        assert!(words.contains(&"refund".to_string()));
    }

    fn row(description: CellValue, translation: CellValue) -> RawRecord {
        let mut cells = vec![CellValue::Null; 22];
        cells[12] = description;
        cells[21] = translation;
        RawRecord::new(cells)
    }

    #[test]
    fn test_source_text_selection() {
        let headers: Vec<String> = (0..22).map(|i| i.to_string()).collect();
        let schema = ColumnResolver::default().resolve(&headers).unwrap();
        let blank = row(CellValue::from("  "), CellValue::from("translated"));
        let both = row(CellValue::from("original"), CellValue::from("translated"));

        assert_eq!(
            source_text(&blank, &schema, KeywordSource::DescriptionWithFallback).as_deref(),
            Some("translated")
        );
        assert_eq!(source_text(&blank, &schema, KeywordSource::Description), None);
        assert_eq!(
            source_text(&both, &schema, KeywordSource::Both).as_deref(),
            Some("original translated")
        );
        assert_eq!(
            source_text(&both, &schema, KeywordSource::Translation).as_deref(),
            Some("translated")
        );
    }

    #[test]
    fn test_top_tokens_ranked_per_group() {
        let mut counts = BTreeMap::new();
        counts.insert((vec!["UK".to_string()], "refund".to_string()), 3);
        counts.insert((vec!["UK".to_string()], "login".to_string()), 3);
        counts.insert((vec!["UK".to_string()], "app".to_string()), 1);
        counts.insert((vec!["DE".to_string()], "konto".to_string()), 2);

        let rows = top_tokens(counts, 2);
        let keys: Vec<Vec<String>> = rows.iter().map(|r| r.key.clone()).collect();
        assert_eq!(
            keys,
            vec![
                vec!["DE".to_string(), "konto".to_string()],
                vec!["UK".to_string(), "login".to_string()],
                vec!["UK".to_string(), "refund".to_string()],
            ]
        );
        assert_eq!(rows[2].metrics.rank, Some(2));
    }
}
