// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Deterministic pattern names
//!
//! Names look like `success:summarize-article:3f2a9c1e`. The slug and hash
//! are computed from a normalised summary (the strategy's suggested label, or
//! the task text) so repeated observations of the same behaviour land on the
//! same name. The outcome prefix keeps SUCCESS and FAILURE observations of the
//! same task apart; [`counterpart_name`] flips it.
//!
//! A domain, when present, is part of the identity: the same task learned
//! under two domains yields two patterns with the same slug and different
//! hashes. Unscoped names are unchanged by this.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::classification::Outcome;

const MAX_SLUG_LEN: usize = 48;
const HASH_LEN: usize = 8;

#[allow(clippy::expect_used)]
static RE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:[a-z]:)?(?:[\\/][\w.-]+){2,}").expect("valid regex"));
#[allow(clippy::expect_used)]
static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("valid regex"));
#[allow(clippy::expect_used)]
static RE_HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[0-9a-f]{8,}\b").expect("valid regex"));
#[allow(clippy::expect_used)]
static RE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").expect("valid regex"));
#[allow(clippy::expect_used)]
static RE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'|`[^`]*`"#).expect("valid regex"));
#[allow(clippy::expect_used)]
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalise free text so cosmetic differences do not split patterns.
///
/// Lower-cases, replaces URLs, paths, hex ids, numbers and quoted literals
/// with placeholders, and collapses whitespace.
pub fn normalize_summary(text: &str) -> String {
    let text = text.to_lowercase();
    let text = RE_URL.replace_all(&text, "<url>");
    let text = RE_PATH.replace_all(&text, "<path>");
    let text = RE_QUOTED.replace_all(&text, "<str>");
    let text = RE_HEX.replace_all(&text, "<id>");
    let text = RE_NUMBER.replace_all(&text, "<n>");
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Derive the stable pattern name for an outcome and summary text
pub fn derive_pattern_name(outcome: Outcome, summary: &str) -> String {
    derive_scoped_pattern_name(outcome, None, summary)
}

/// Derive the pattern name within an optional domain
pub fn derive_scoped_pattern_name(outcome: Outcome, domain: Option<&str>, summary: &str) -> String {
    let normalized = normalize_summary(summary);
    let hash = match domain.map(str::trim).filter(|d| !d.is_empty()) {
        Some(domain) => short_hash(&format!("{}\n{}", domain, normalized)),
        None => short_hash(&normalized),
    };
    format!("{}:{}:{}", outcome.name_prefix(), slugify(&normalized), hash)
}

/// Name of the opposite-outcome pattern for the same task, if `name` was derived
pub fn counterpart_name(name: &str) -> Option<String> {
    let (prefix, rest) = name.split_once(':')?;
    let outcome = match prefix {
        "success" => Outcome::Success,
        "failure" => Outcome::Failure,
        _ => return None,
    };
    Some(format!("{}:{}", outcome.opposite().name_prefix(), rest))
}

fn slugify(normalized: &str) -> String {
    let mut slug = String::with_capacity(MAX_SLUG_LEN);
    let mut pending_dash = false;

    for c in normalized.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                if slug.len() + 1 >= MAX_SLUG_LEN {
                    break;
                }
                slug.push('-');
            }
            pending_dash = false;
            if slug.len() >= MAX_SLUG_LEN {
                break;
            }
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("task");
    }
    slug
}

fn short_hash(normalized: &str) -> String {
    let digest = Sha256::digest(normalized.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(HASH_LEN);
    encoded
}
