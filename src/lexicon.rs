// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Built-in word lists shared by the name detector and keyword extraction

use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use stop_words::{get, LANGUAGE};

/// Salutation cues that precede a personal name (regex fragments, matched
/// case-insensitively; longer alternatives first)
pub static NAME_CUES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        r"mrs\.?",
        r"mr\.?",
        r"ms\.?",
        r"miss",
        r"dr\.?",
        r"prof\.?",
        r"dear",
        r"hello",
        r"hi",
        r"spoke\s+(?:with|to)",
        r"customer\s+named",
        r"named",
    ]
});

/// Capitalized words that are never part of a personal name. Lowercase.
pub static NON_NAME_WORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        // sentence starters and contact-center vocabulary
        "contact", "customer", "client", "caller", "agent", "account", "please", "thanks",
        "thank", "hello", "dear", "regards", "kind", "best", "team", "support", "service",
        "manager", "supervisor", "called", "call", "email", "phone", "chat", "ticket", "case",
        "order", "issue", "reason", "category", "error", "code", "refund", "billing",
        "payment", "login", "password", "subscription", "cancellation", "technical",
        "general", "inquiry", "complaint", "escalation", "urgent", "note", "notes", "update",
        "status", "request", "sent", "external", "subject",
        // weekdays and months
        "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
        "january", "february", "march", "april", "may", "june", "july", "august",
        "september", "october", "november", "december",
        // places
        "new", "york", "london", "paris", "berlin", "madrid", "rome", "milan", "dublin",
        "manchester", "munich", "vienna", "amsterdam", "lisbon", "warsaw", "united",
        "kingdom", "states", "germany", "france", "spain", "italy", "ireland", "austria",
        "netherlands", "portugal", "poland", "europe", "america",
        // partners and products
        "sky", "amazon", "apple", "google", "netflix", "prime", "video", "sports", "cinema",
        "roku", "samsung", "android", "iphone", "ipad", "tv", "app", "store", "play",
        "yellowstone", "ufc", "paramount", "peacock", "plus",
    ]
});

/// Contact-center filler words dropped from keyword counts on top of the
/// standard English list
static DOMAIN_STOPWORDS: [&str; 16] = [
    "customer", "customers", "please", "thanks", "thank", "hi", "hello", "regards",
    "dear", "sent", "iphone", "android", "external", "re", "fw", "fwd",
];

/// Default keyword stopword set: English stop words plus domain filler
pub static DEFAULT_STOPWORDS: Lazy<BTreeSet<String>> = Lazy::new(|| {
    let mut words: BTreeSet<String> = get(LANGUAGE::English)
        .iter()
        .map(|w| w.to_string().to_lowercase())
        .collect();
    words.extend(DOMAIN_STOPWORDS.iter().map(|w| w.to_string()));
    words
});

/// Weighted phrase dictionary for theme classification, in tie-break order
pub static DEFAULT_THEMES: Lazy<Vec<(&'static str, Vec<(&'static str, u32)>)>> =
    Lazy::new(|| {
        vec![
            (
                "Cancellation",
                vec![
                    ("cancel", 1),
                    ("unsubscribe", 1),
                    ("terminate", 1),
                    ("how to cancel", 2),
                    ("cannot cancel", 2),
                    ("unable to cancel", 2),
                    ("stop subscription", 2),
                    ("end subscription", 2),
                    ("free trial", 1),
                ],
            ),
            (
                "Billing",
                vec![
                    ("refund", 2),
                    ("charged", 2),
                    ("unexpected charge", 3),
                    ("double bill", 3),
                    ("charge after cancel", 3),
                    ("billing", 1),
                    ("invoice", 1),
                    ("money back", 2),
                ],
            ),
            (
                "Login",
                vec![
                    ("password", 2),
                    ("forgot password", 3),
                    ("reset password", 3),
                    ("cannot login", 3),
                    ("can't log in", 3),
                    ("unable to login", 3),
                    ("locked out", 3),
                    ("reset email", 2),
                    ("email not received", 2),
                ],
            ),
            (
                "Technical",
                vec![
                    ("not working", 2),
                    ("app crash", 3),
                    ("buffering", 2),
                    ("streaming", 1),
                    ("playback", 2),
                    ("error code", 2),
                    ("video not load", 2),
                    ("app not load", 3),
                    ("frozen", 2),
                ],
            ),
            (
                "Payment",
                vec![
                    ("card declined", 3),
                    ("payment failed", 3),
                    ("payment rejected", 3),
                    ("update payment", 2),
                    ("card error", 2),
                    ("payment method", 2),
                ],
            ),
            (
                "Partner",
                vec![
                    ("amazon", 1),
                    ("apple", 1),
                    ("google", 1),
                    ("sky", 2),
                    ("partner", 1),
                ],
            ),
            (
                "Content",
                vec![
                    ("ufc", 3),
                    ("yellowstone", 3),
                    ("content missing", 2),
                    ("show missing", 2),
                    ("episode", 1),
                    ("season", 1),
                ],
            ),
        ]
    });
