//! Wildcard matching for rule condition values.
//!
//! Patterns treat `*` as "any sequence of characters"; everything else is
//! literal. Matching is case-insensitive on both operands, so
//! `kubernetes/*` matches `Kubernetes/Kubernetes`.

use regex::Regex;

/// Returns true if `value` matches `pattern`.
///
/// The common pattern shapes (bare `*`, no wildcard, `prefix*`, `*suffix`,
/// `*inner*`) are answered with plain string operations; anything else falls
/// back to a regex built from the pattern. The fast paths must agree with the
/// fallback for every input.
pub fn wildcard_match(pattern: &str, value: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let value = value.to_lowercase();

    if pattern == "*" {
        return true;
    }

    let stars = pattern.matches('*').count();
    if stars == 0 {
        return pattern == value;
    }

    if stars == 1 {
        if let Some(prefix) = pattern.strip_suffix('*') {
            return value.starts_with(prefix);
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            return value.ends_with(suffix);
        }
    } else if stars == 2 && pattern.starts_with('*') && pattern.ends_with('*') {
        let inner = &pattern[1..pattern.len() - 1];
        if !inner.contains('*') {
            return value.contains(inner);
        }
    }

    general_match(&pattern, &value)
}

/// General path: escape every non-`*` segment as a literal, splice the
/// segments together with "any sequence", and test the anchored whole.
///
/// `(?s)` keeps `.` matching newlines so that e.g. the `*inner*` fast path
/// (plain substring search) and this path cannot disagree on values
/// containing line breaks.
fn general_match(pattern: &str, value: &str) -> bool {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push_str("(?s)^");
    for (i, segment) in pattern.split('*').enumerate() {
        if i > 0 {
            regex.push_str(".*");
        }
        regex.push_str(&regex::escape(segment));
    }
    regex.push('$');
    Regex::new(&regex)
        .expect("escaped wildcard pattern is a valid regex")
        .is_match(value)
}
