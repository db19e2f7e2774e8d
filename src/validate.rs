//! Input normalization and typo recovery.
//!
//! Priorities and issue types accept common synonyms so `--priority urgent`
//! or `--type defect` do what the user meant. Resolution is three-tier:
//! exact match → synonym lookup → error with suggestion.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::NaiveDate;

use crate::model::{IssueType, Priority};

// ── Valid value sets (O(1) lookups) ──────────────────────────

pub static VALID_PRIORITIES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["high", "medium", "low"].into_iter().collect());

pub static VALID_TYPES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["bug", "story", "task"].into_iter().collect());

// ── Synonym maps ─────────────────────────────────────────────

pub static PRIORITY_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("critical", "high"),
        ("crit", "high"),
        ("urgent", "high"),
        ("highest", "high"),
        ("important", "high"),
        ("blocker", "high"),
        ("normal", "medium"),
        ("default", "medium"),
        ("med", "medium"),
        ("minor", "low"),
        ("lowest", "low"),
        ("trivial", "low"),
    ]
    .into_iter()
    .collect()
});

pub static TYPE_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("defect", "bug"),
        ("issue", "bug"),
        ("problem", "bug"),
        ("feature", "story"),
        ("enhancement", "story"),
        ("improvement", "story"),
        ("chore", "task"),
        ("ticket", "task"),
        ("todo", "task"),
        ("work", "task"),
    ]
    .into_iter()
    .collect()
});

/// Normalize a priority via exact match or synonym lookup.
///
/// Returns the priority, or an error with the original input and an
/// optional suggestion.
pub fn normalize_priority(input: &str) -> Result<Priority, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    if let Some(priority) = Priority::parse(&lower) {
        return Ok(priority);
    }

    if let Some(priority) = PRIORITY_SYNONYMS.get(lower.as_str()).and_then(|c| Priority::parse(c)) {
        return Ok(priority);
    }

    let suggestion = find_closest_match(&lower, &VALID_PRIORITIES, &PRIORITY_SYNONYMS);
    Err((input.to_string(), suggestion))
}

/// Normalize an issue type via exact match or synonym lookup.
pub fn normalize_type(input: &str) -> Result<IssueType, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    if let Some(kind) = IssueType::parse(&lower) {
        return Ok(kind);
    }

    if let Some(kind) = TYPE_SYNONYMS.get(lower.as_str()).and_then(|c| IssueType::parse(c)) {
        return Ok(kind);
    }

    let suggestion = find_closest_match(&lower, &VALID_TYPES, &TYPE_SYNONYMS);
    Err((input.to_string(), suggestion))
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(input: &str) -> Result<NaiveDate, (String, Option<String>)> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        (
            input.to_string(),
            Some("Dates look like 2025-03-31".to_string()),
        )
    })
}

/// Loose email check: one `@` with text on both sides and a dot in the domain.
#[must_use]
pub fn is_valid_email(input: &str) -> bool {
    match input.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !input.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Canonical form of a member email: trimmed and lowercased.
#[must_use]
pub fn normalize_email(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Render a byte count the way attachment lists show it ("2.3 MB").
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    format!("{size:.1} {unit}")
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
            // For synonyms, show what it maps to
            let shown = synonyms.get(v).copied().unwrap_or(v);
            best = Some((shown, dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Single-row optimization (O(min(m,n)) space)
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Find existing keys similar to the searched one.
///
/// A key is similar when its edit distance is at most 2 or when one is a
/// prefix of the other (case-insensitive). Returns up to `max`
/// suggestions sorted by distance then alphabetically.
#[must_use]
pub fn find_similar_ids(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let needle = searched.to_uppercase();
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .filter_map(|id| {
            let hay = id.to_uppercase();
            let dist = levenshtein_distance(&needle, &hay);
            let prefix = !needle.is_empty() && (hay.starts_with(&needle) || needle.starts_with(&hay));
            (dist <= 2 || prefix).then_some((dist, id.as_str()))
        })
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, id)| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_priority() {
        assert_eq!(normalize_priority("High"), Ok(Priority::High));
        assert_eq!(normalize_priority("urgent"), Ok(Priority::High));
        assert_eq!(normalize_priority("normal"), Ok(Priority::Medium));
        assert_eq!(normalize_priority("MINOR"), Ok(Priority::Low));
        assert!(normalize_priority("nonsense").is_err());
    }

    #[test]
    fn test_priority_suggestion() {
        let (input, suggestion) = normalize_priority("hgih").unwrap_err();
        assert_eq!(input, "hgih");
        assert_eq!(suggestion.as_deref(), Some("high"));
    }

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("bug"), Ok(IssueType::Bug));
        assert_eq!(normalize_type("defect"), Ok(IssueType::Bug));
        assert_eq!(normalize_type("feature"), Ok(IssueType::Story));
        assert_eq!(normalize_type("chore"), Ok(IssueType::Task));
        assert!(normalize_type("spaceship").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-03-31").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
        );
        assert!(parse_date("31/03/2025").is_err());
        assert!(parse_date("2025-02-30").is_err());
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("sam@example.com"));
        assert!(!is_valid_email("sam"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("sam@localhost"));
        assert!(!is_valid_email("sam @example.com"));
        assert_eq!(normalize_email("  Sam@Acme.IO "), "sam@acme.io");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(2_411_724), "2.3 MB");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_find_similar_ids() {
        let keys = vec!["MOB-12".to_string(), "MOB-13".to_string(), "WEB-1".to_string()];
        let result = find_similar_ids("MOB-11", &keys, 3);
        assert_eq!(result, vec!["MOB-12".to_string(), "MOB-13".to_string()]);

        let prefix = find_similar_ids("mob-1", &keys, 3);
        assert!(prefix.contains(&"MOB-12".to_string()));

        assert!(find_similar_ids("XYZ-999", &keys, 3).is_empty());
    }
}
