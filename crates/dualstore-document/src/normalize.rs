//! Field name normalization
//!
//! Legacy records carry free-form field names ("Source Airport",
//! "Price (USD)"). The target store gets a canonical `[a-z0-9_]` form.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static PARENTHESES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[()]").expect("valid regex"));
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("valid regex"));
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid regex"));

/// Canonicalize a field name into a storage-safe identifier
///
/// Steps, in order:
/// 1. lower-case
/// 2. whitespace runs become a single `_`
/// 3. parentheses are dropped
/// 4. anything outside `[a-z0-9_]` becomes `_`
/// 5. `_` runs collapse to one
/// 6. leading and trailing `_` are trimmed
///
/// Total and idempotent: the output only contains `[a-z0-9_]`, has no
/// repeated or boundary underscores, and so is a fixed point. The empty
/// string maps to itself.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    let lowered = key.to_lowercase();
    let spaced = WHITESPACE_RUNS.replace_all(&lowered, "_");
    let unbracketed = PARENTHESES.replace_all(&spaced, "");
    let restricted = DISALLOWED.replace_all(&unbracketed, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&restricted, "_");
    collapsed.trim_matches('_').to_string()
}
