// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Regex pattern compilation for PII detection
// Uses RegexSet to skip detectors that cannot match a value at all

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use std::collections::HashSet;

use super::config::{PiiCategory, RedactionConfig};
use crate::error::PatternError;
use crate::lexicon;

/// How raw regex candidates are turned into claimed spans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Every regex match is a detection
    Plain,
    /// Digit count, boundary, date-shape and card-shape checks
    PhoneNumber,
    /// Luhn checksum or issuer prefix
    CardNumber,
    /// Capture group 1 after a salutation cue
    SalutationCue,
    /// Runs of capitalized tokens trimmed of non-name words
    CapitalizedRun,
}

/// Compiled pattern with metadata
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub category: PiiCategory,
    pub rule: MatchRule,
    pub regex: Regex,
    pub description: String,
}

/// All compiled patterns with RegexSet for pre-screening
#[derive(Debug)]
pub struct CompiledPatterns {
    pub regex_set: RegexSet,
    pub patterns: Vec<CompiledPattern>,
    /// One further name token directly after a cue capture
    pub name_tail: Regex,
    pub non_name_words: HashSet<String>,
}

/// Pattern definitions (pattern, description, rule)
type PatternDef = (&'static str, &'static str, MatchRule);

static EMAIL_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![(
        r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        "Email address",
        MatchRule::Plain,
    )]
});

// Greedy run of digits joined by at most two separator characters; the
// phone rule splits and validates it
static PHONE_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![(
        r"\+?\(?\d(?:[ ()\-]{0,2}\d)+\)?",
        "Phone number, optionally international",
        MatchRule::PhoneNumber,
    )]
});

static CARD_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![(
        r"\b(?:\d{4}[ \-]\d{6}[ \-]\d{5}|\d{4}(?:[ \-]\d{4}){2}[ \-]\d{1,4}(?:[ \-]?\d{1,3})?|\d{13,19})\b",
        "Payment card number, ungrouped or in blocks of four",
        MatchRule::CardNumber,
    )]
});

const NAME_TOKEN: &str = r"(?:[A-Z]'[A-Z][a-z]+|[A-Z][a-z]+(?:-[A-Z][a-z]+)?)";

fn salutation_pattern(extra_cues: &[String]) -> String {
    let mut cues: Vec<String> = lexicon::NAME_CUES
        .iter()
        .map(|cue| cue.to_string())
        .collect();
    cues.extend(
        extra_cues
            .iter()
            .map(|cue| cue.trim())
            .filter(|cue| !cue.is_empty())
            .map(|cue| regex::escape(cue).replace(' ', r"\s+")),
    );
    format!(
        r"\b(?i:{})[ \t]+({tok}(?:[ \t]+{tok}){{0,2}})",
        cues.join("|"),
        tok = NAME_TOKEN
    )
}

fn name_tail_pattern() -> String {
    format!(r"^[ \t]+({tok})\b", tok = NAME_TOKEN)
}

fn capitalized_run_pattern() -> String {
    format!(r"\b{tok}(?:[ \t]+{tok})+\b", tok = NAME_TOKEN)
}

/// Compile patterns based on configuration, in priority order
pub fn compile_patterns(config: &RedactionConfig) -> Result<CompiledPatterns, PatternError> {
    let mut pattern_strings = Vec::new();
    let mut patterns = Vec::new();

    let mut push = |category: PiiCategory,
                    pattern: &str,
                    description: &str,
                    rule: MatchRule|
     -> Result<(), PatternError> {
        let regex = Regex::new(pattern).map_err(|source| PatternError::Compile {
            pattern: pattern.to_string(),
            source,
        })?;
        pattern_strings.push(pattern.to_string());
        patterns.push(CompiledPattern {
            category,
            rule,
            regex,
            description: description.to_string(),
        });
        Ok(())
    };

    // Helper macro to add static pattern lists when the category is enabled
    macro_rules! add_patterns {
        ($category:expr, $pattern_list:expr) => {
            if config.is_enabled($category) {
                for (pattern, description, rule) in $pattern_list.iter() {
                    push($category, pattern, description, *rule)?;
                }
            }
        };
    }

    add_patterns!(PiiCategory::Email, &*EMAIL_PATTERNS);
    add_patterns!(PiiCategory::Phone, &*PHONE_PATTERNS);
    add_patterns!(PiiCategory::CreditCard, &*CARD_PATTERNS);

    if config.detect_name {
        push(
            PiiCategory::Name,
            &salutation_pattern(&config.extra_name_cues),
            "Capitalized name after a salutation cue",
            MatchRule::SalutationCue,
        )?;
        push(
            PiiCategory::Name,
            &capitalized_run_pattern(),
            "Capitalized two or three token name",
            MatchRule::CapitalizedRun,
        )?;
    }

    // Handle empty pattern set gracefully (all detectors disabled)
    let regex_set = if pattern_strings.is_empty() {
        RegexSet::empty()
    } else {
        RegexSet::new(&pattern_strings).map_err(PatternError::Set)?
    };

    let tail = name_tail_pattern();
    let name_tail = Regex::new(&tail).map_err(|source| PatternError::Compile {
        pattern: tail.clone(),
        source,
    })?;

    let mut non_name_words: HashSet<String> = lexicon::NON_NAME_WORDS
        .iter()
        .map(|w| w.to_string())
        .collect();
    non_name_words.extend(lexicon::DEFAULT_STOPWORDS.iter().cloned());
    non_name_words.extend(
        config
            .extra_non_name_words
            .iter()
            .map(|w| w.trim().to_lowercase()),
    );

    Ok(CompiledPatterns {
        regex_set,
        patterns,
        name_tail,
        non_name_words,
    })
}

/// Luhn checksum over the digits of `value`, ignoring separators
pub fn luhn_valid(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 2 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Amex (3), Visa (4) or Mastercard (5) leading digit
pub fn has_issuer_prefix(value: &str) -> bool {
    matches!(
        value.chars().find(|c| c.is_ascii_digit()),
        Some('3') | Some('4') | Some('5')
    )
}

pub fn digit_count(value: &str) -> usize {
    value.chars().filter(|c| c.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_patterns() {
        let config = RedactionConfig::default();
        let compiled = compile_patterns(&config).unwrap();

        // Email, phone, card, two name rules
        assert_eq!(compiled.patterns.len(), 5);
        assert_eq!(compiled.regex_set.len(), 5);
        assert!(compiled.non_name_words.contains("monday"));
    }

    #[test]
    fn test_patterns_follow_priority() {
        let compiled = compile_patterns(&RedactionConfig::default()).unwrap();
        let priorities: Vec<u8> = compiled
            .patterns
            .iter()
            .map(|p| p.category.priority())
            .collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn test_disabled_detectors() {
        let config = RedactionConfig {
            detect_email: false,
            detect_phone: false,
            detect_credit_card: false,
            detect_name: false,
            ..Default::default()
        };
        let compiled = compile_patterns(&config).unwrap();
        assert!(compiled.patterns.is_empty());
        assert!(!compiled.regex_set.is_match("john@example.com"));
    }

    #[test]
    fn test_email_pattern() {
        let compiled = compile_patterns(&RedactionConfig::default()).unwrap();
        let matches: Vec<_> = compiled
            .regex_set
            .matches("Contact me at john.doe@example.com")
            .into_iter()
            .collect();
        assert!(matches.contains(&0));
    }

    #[test]
    fn test_extra_cue_is_escaped() {
        let config = RedactionConfig {
            extra_name_cues: vec!["caller (verified)".to_string()],
            ..Default::default()
        };
        assert!(compile_patterns(&config).is_ok());
    }

    #[test]
    fn test_name_tail_takes_one_token() {
        let compiled = compile_patterns(&RedactionConfig::default()).unwrap();
        let caps = compiled.name_tail.captures(" Garcia Ruiz today").unwrap();
        assert_eq!(&caps[1], "Garcia");
        assert!(compiled.name_tail.captures("Garcia").is_none());
        assert!(compiled.name_tail.captures(" today").is_none());
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("4111-1111-1111-1111"));
        assert!(luhn_valid("378282246310005"));
        assert!(!luhn_valid("1234567890123456"));
        assert!(!luhn_valid("7"));
    }

    #[test]
    fn test_issuer_prefix() {
        assert!(has_issuer_prefix("4000"));
        assert!(has_issuer_prefix("5500"));
        assert!(has_issuer_prefix("3400"));
        assert!(!has_issuer_prefix("6011"));
        assert!(!has_issuer_prefix("1234"));
    }
}
