// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Core PII detection logic: priority-ordered, non-overlapping span claiming

use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::AddAssign;

use super::config::{PiiCategory, RedactionConfig};
use super::masking;
use super::patterns::{
    compile_patterns, digit_count, has_issuer_prefix, luhn_valid, CompiledPattern,
    CompiledPatterns, MatchRule,
};
use crate::error::PatternError;
use crate::table::CellValue;

/// A single claimed PII span. The matched text is deliberately not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub category: PiiCategory,
    pub start: usize,
    pub end: usize,
}

/// Per-category redaction counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounts {
    pub email: u64,
    pub phone: u64,
    pub credit_card: u64,
    pub name: u64,
}

impl MatchCounts {
    pub fn get(&self, category: PiiCategory) -> u64 {
        match category {
            PiiCategory::Email => self.email,
            PiiCategory::Phone => self.phone,
            PiiCategory::CreditCard => self.credit_card,
            PiiCategory::Name => self.name,
        }
    }

    pub fn record(&mut self, category: PiiCategory) {
        let slot = match category {
            PiiCategory::Email => &mut self.email,
            PiiCategory::Phone => &mut self.phone,
            PiiCategory::CreditCard => &mut self.credit_card,
            PiiCategory::Name => &mut self.name,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u64 {
        self.email + self.phone + self.credit_card + self.name
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl AddAssign for MatchCounts {
    fn add_assign(&mut self, other: Self) {
        self.email += other.email;
        self.phone += other.phone;
        self.credit_card += other.credit_card;
        self.name += other.name;
    }
}

/// Result of running the registry over one value
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<'a> {
    pub text: Cow<'a, str>,
    pub counts: MatchCounts,
}

/// Claimed spans keyed by start offset; claimed spans never overlap
#[derive(Debug, Default)]
pub struct SpanTracker {
    spans: BTreeMap<usize, (usize, PiiCategory)>,
}

impl SpanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `[start, end)` intersects any claimed span
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        // Only the last span starting before `end` can reach into the range
        self.spans
            .range(..end)
            .next_back()
            .is_some_and(|(_, &(claimed_end, _))| claimed_end > start)
    }

    /// Claim `[start, end)` unless it overlaps an existing span
    pub fn claim(&mut self, category: PiiCategory, start: usize, end: usize) -> bool {
        if start >= end || self.overlaps(start, end) {
            return false;
        }
        self.spans.insert(start, (end, category));
        true
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn into_detections(self) -> Vec<Detection> {
        self.spans
            .into_iter()
            .map(|(start, (end, category))| Detection {
                category,
                start,
                end,
            })
            .collect()
    }
}

/// Ordered, immutable set of PII detectors.
///
/// Built once per process (or per configuration) and shared by reference;
/// every method takes `&self`, so concurrent use needs no locking.
#[derive(Debug)]
pub struct PatternRegistry {
    patterns: CompiledPatterns,
    config: RedactionConfig,
}

impl PatternRegistry {
    pub fn new(config: RedactionConfig) -> Result<Self, PatternError> {
        let patterns = compile_patterns(&config)?;
        tracing::debug!(
            patterns = ?patterns
                .patterns
                .iter()
                .map(|p| p.description.as_str())
                .collect::<Vec<_>>(),
            "pattern registry compiled"
        );
        Ok(Self { patterns, config })
    }

    pub fn config(&self) -> &RedactionConfig {
        &self.config
    }

    /// Categories with at least one active detector, in priority order
    pub fn categories(&self) -> Vec<PiiCategory> {
        let mut categories: Vec<PiiCategory> =
            self.patterns.patterns.iter().map(|p| p.category).collect();
        categories.dedup();
        categories
    }

    /// Detect PII spans in `text`, highest priority first, without overlaps.
    /// Returned spans are sorted by start offset.
    pub fn detect(&self, text: &str) -> Vec<Detection> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut tracker = SpanTracker::new();
        let matched = self.patterns.regex_set.matches(text);

        for (idx, pattern) in self.patterns.patterns.iter().enumerate() {
            if !matched.matched(idx) {
                continue;
            }
            self.claim_pattern(pattern, text, &mut tracker);
        }

        tracker.into_detections()
    }

    /// Replace every detected span with its category token
    pub fn apply<'a>(&self, text: &'a str) -> Applied<'a> {
        let detections = self.detect(text);
        let mut counts = MatchCounts::default();
        for detection in &detections {
            counts.record(detection.category);
        }
        Applied {
            text: masking::mask_spans(text, &detections),
            counts,
        }
    }

    /// Cell-level entry point: only text cells are inspected, everything else
    /// passes through unchanged
    pub fn apply_cell(&self, cell: &CellValue) -> (CellValue, MatchCounts) {
        match cell {
            CellValue::Text(text) => {
                let applied = self.apply(text);
                let counts = applied.counts;
                (CellValue::Text(applied.text.into_owned()), counts)
            }
            other => (other.clone(), MatchCounts::default()),
        }
    }

    fn claim_pattern(&self, pattern: &CompiledPattern, text: &str, tracker: &mut SpanTracker) {
        let category = pattern.category;
        match pattern.rule {
            MatchRule::Plain => {
                for m in pattern.regex.find_iter(text) {
                    tracker.claim(category, m.start(), m.end());
                }
            }
            MatchRule::PhoneNumber => {
                let card = self.card_regex();
                for m in pattern.regex.find_iter(text) {
                    for (start, end) in phone_spans(text, m.start(), m.end(), card) {
                        tracker.claim(category, start, end);
                    }
                }
            }
            MatchRule::CardNumber => {
                for m in pattern.regex.find_iter(text) {
                    if is_card_number(m.as_str()) {
                        tracker.claim(category, m.start(), m.end());
                    }
                }
            }
            MatchRule::SalutationCue => {
                for caps in pattern.regex.captures_iter(text) {
                    if let Some(name) = caps.get(1) {
                        if let Some((start, end)) =
                            self.cue_name_span(text, name.start(), name.end(), tracker)
                        {
                            tracker.claim(category, start, end);
                        }
                    }
                }
            }
            MatchRule::CapitalizedRun => {
                for m in pattern.regex.find_iter(text) {
                    for (start, end) in self.name_segments(text, m.start(), m.end(), tracker) {
                        tracker.claim(category, start, end);
                    }
                }
            }
        }
    }

    fn card_regex(&self) -> Option<&Regex> {
        self.patterns
            .patterns
            .iter()
            .find(|p| p.rule == MatchRule::CardNumber)
            .map(|p| &p.regex)
    }

    fn is_non_name(&self, word: &str) -> bool {
        self.patterns
            .non_name_words
            .contains(&word.to_lowercase())
    }

    /// Name span for a cue capture. Trailing non-name tokens are dropped
    /// ("Dear John Thanks"); a capture that ends on a name token runs on
    /// through the rest of the capitalized run.
    fn cue_name_span(
        &self,
        text: &str,
        start: usize,
        end: usize,
        tracker: &SpanTracker,
    ) -> Option<(usize, usize)> {
        let tokens = word_offsets(text, start, end);
        let keep = tokens
            .iter()
            .take_while(|(s, e)| !self.is_non_name(&text[*s..*e]))
            .count();
        if keep == 0 {
            return None;
        }
        let mut end = tokens[keep - 1].1;
        if keep < tokens.len() {
            return Some((tokens[0].0, end));
        }

        while let Some(caps) = self.patterns.name_tail.captures(&text[end..]) {
            let (Some(whole), Some(word)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            let claimed = tracker.overlaps(end + word.start(), end + word.end());
            if claimed || self.is_non_name(word.as_str()) {
                break;
            }
            end += whole.end();
        }
        Some((tokens[0].0, end))
    }

    /// Split a capitalized run at non-name words and already claimed tokens,
    /// keeping 2–3 token segments
    fn name_segments(
        &self,
        text: &str,
        start: usize,
        end: usize,
        tracker: &SpanTracker,
    ) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut segment: Vec<(usize, usize)> = Vec::new();

        let mut flush = |segment: &mut Vec<(usize, usize)>| {
            if (2..=3).contains(&segment.len()) {
                spans.push((segment[0].0, segment[segment.len() - 1].1));
            }
            segment.clear();
        };

        for (s, e) in word_offsets(text, start, end) {
            if tracker.overlaps(s, e) || self.is_non_name(&text[s..e]) {
                flush(&mut segment);
            } else {
                segment.push((s, e));
            }
        }
        flush(&mut segment);
        spans
    }
}

/// Byte offsets of whitespace-separated words within `text[start..end]`
fn word_offsets(text: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    split_offsets(text, start, end, char::is_whitespace)
}

/// Byte offsets of the digit groups of a phone candidate
fn digit_groups(text: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    split_offsets(text, start, end, |c| c.is_whitespace() || c == '-')
}

fn split_offsets(
    text: &str,
    start: usize,
    end: usize,
    is_separator: impl Fn(char) -> bool,
) -> Vec<(usize, usize)> {
    let slice = &text[start..end];
    let mut offsets = Vec::new();
    let mut word_start = None;
    for (i, c) in slice.char_indices() {
        match (is_separator(c), word_start) {
            (true, Some(ws)) => {
                offsets.push((start + ws, start + i));
                word_start = None;
            }
            (false, None) => word_start = Some(i),
            _ => {}
        }
    }
    if let Some(ws) = word_start {
        offsets.push((start + ws, end));
    }
    offsets
}

fn is_card_number(candidate: &str) -> bool {
    let digits = digit_count(candidate);
    (13..=19).contains(&digits) && (luhn_valid(candidate) || has_issuer_prefix(candidate))
}

fn is_date_shaped(candidate: &str) -> bool {
    let groups: Vec<usize> = candidate.split('-').map(str::len).collect();
    candidate.chars().all(|c| c.is_ascii_digit() || c == '-')
        && (groups == [4, 2, 2] || groups == [2, 2, 4])
}

fn is_phone_number(candidate: &str) -> bool {
    let digits = digit_count(candidate);
    (7..=MAX_PHONE_DIGITS).contains(&digits) && !is_date_shaped(candidate)
}

const MAX_PHONE_DIGITS: usize = 15;

fn glued(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Ranges inside `text[start..end]` the card rule will claim
fn card_ranges(
    text: &str,
    start: usize,
    end: usize,
    card: Option<&Regex>,
) -> Vec<(usize, usize)> {
    let Some(card) = card else {
        return Vec::new();
    };
    card.find_iter(&text[start..end])
        .filter(|m| is_card_number(m.as_str()))
        .map(|m| (start + m.start(), start + m.end()))
        .collect()
}

/// Validate a greedy digit-run candidate. Card claims inside the run are
/// left to the card rule; when the rest is not one phone number, the
/// longest valid phone window starting at each digit group is taken
/// instead. Windows stop at `MAX_PHONE_DIGITS`, so the walk is linear.
fn phone_spans(
    text: &str,
    start: usize,
    end: usize,
    card: Option<&Regex>,
) -> Vec<(usize, usize)> {
    if glued(text[..start].chars().next_back()) || glued(text[end..].chars().next()) {
        return Vec::new();
    }
    let cards = card_ranges(text, start, end, card);
    if cards.is_empty() && is_phone_number(&text[start..end]) {
        return vec![(start, end)];
    }

    let pieces = digit_groups(text, start, end);

    // Digits before piece k; pieces overlapping a card claim are blocked
    let mut digits_before = Vec::with_capacity(pieces.len() + 1);
    digits_before.push(0);
    let mut blocked = Vec::with_capacity(pieces.len());
    let mut next_card = 0;
    for &(s, e) in &pieces {
        let total = digits_before.last().copied().unwrap_or(0);
        digits_before.push(total + digit_count(&text[s..e]));
        while next_card < cards.len() && cards[next_card].1 <= s {
            next_card += 1;
        }
        blocked.push(next_card < cards.len() && cards[next_card].0 < e);
    }

    let mut spans = Vec::new();
    let mut i = 0;
    while i < pieces.len() {
        if blocked[i] {
            i += 1;
            continue;
        }
        let mut longest = None;
        for j in i..pieces.len() {
            if blocked[j] || digits_before[j + 1] - digits_before[i] > MAX_PHONE_DIGITS {
                break;
            }
            if is_phone_number(&text[pieces[i].0..pieces[j].1]) {
                longest = Some(j);
            }
        }
        match longest {
            Some(j) => {
                spans.push((pieces[i].0, pieces[j].1));
                i = j + 1;
            }
            None => i += 1,
        }
    }
    spans
}
