//! Normalization of user-typed statuses and priorities.
//!
//! Three-tier resolution: exact match → synonym lookup → error with the
//! closest suggestion.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::{IssuePriority, IssueStatus};

// ── Synonym maps ─────────────────────────────────────────────

pub static STATUS_SYNONYMS: LazyLock<HashMap<&str, IssueStatus>> = LazyLock::new(|| {
    [
        ("done", IssueStatus::Closed),
        ("complete", IssueStatus::Closed),
        ("completed", IssueStatus::Closed),
        ("finished", IssueStatus::Closed),
        ("resolved", IssueStatus::Closed),
        ("wip", IssueStatus::InProgress),
        ("doing", IssueStatus::InProgress),
        ("working", IssueStatus::InProgress),
        ("active", IssueStatus::InProgress),
        ("started", IssueStatus::InProgress),
        ("new", IssueStatus::Open),
        ("todo", IssueStatus::Open),
        ("pending", IssueStatus::Open),
        ("reopen", IssueStatus::Open),
    ]
    .into_iter()
    .collect()
});

pub static PRIORITY_SYNONYMS: LazyLock<HashMap<&str, IssuePriority>> = LazyLock::new(|| {
    [
        ("crit", IssuePriority::Critical),
        ("urgent", IssuePriority::Critical),
        ("highest", IssuePriority::Critical),
        ("important", IssuePriority::High),
        ("med", IssuePriority::Medium),
        ("normal", IssuePriority::Medium),
        ("default", IssuePriority::Medium),
        ("minor", IssuePriority::Low),
        ("lowest", IssuePriority::Low),
        ("trivial", IssuePriority::Low),
    ]
    .into_iter()
    .collect()
});

/// Lowercase and fold separators so `In Progress`, `in-progress` and
/// `IN_PROGRESS` compare equal.
fn fold(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

/// Parse a status from wire form, a label, or a synonym.
///
/// # Errors
///
/// Returns `InvalidStatus`, naming the closest valid value when one is near.
pub fn normalize_status(input: &str) -> Result<IssueStatus> {
    let folded = fold(input);

    if let Some(status) = IssueStatus::ALL
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(&folded))
    {
        return Ok(status);
    }

    if let Some(&status) = STATUS_SYNONYMS.get(folded.as_str()) {
        return Ok(status);
    }

    let candidates = IssueStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_lowercase(), s.as_str()))
        .chain(STATUS_SYNONYMS.iter().map(|(k, v)| ((*k).to_string(), v.as_str())));
    Err(Error::InvalidStatus(with_suggestion(input, &folded, candidates)))
}

/// Parse a priority from wire form, P-notation (P0 = critical) or a synonym.
///
/// # Errors
///
/// Returns `InvalidPriority`, naming the closest valid value when one is near.
pub fn normalize_priority(input: &str) -> Result<IssuePriority> {
    let folded = fold(input);

    if let Some(priority) = IssuePriority::ALL
        .into_iter()
        .find(|p| p.as_str().eq_ignore_ascii_case(&folded))
    {
        return Ok(priority);
    }

    if let Some(level) = folded.strip_prefix('p').and_then(|n| n.parse::<u8>().ok()) {
        return match level {
            0 => Ok(IssuePriority::Critical),
            1 => Ok(IssuePriority::High),
            2 => Ok(IssuePriority::Medium),
            3 => Ok(IssuePriority::Low),
            _ => Err(Error::InvalidPriority(format!("{input} (use P0-P3)"))),
        };
    }

    if let Some(&priority) = PRIORITY_SYNONYMS.get(folded.as_str()) {
        return Ok(priority);
    }

    let candidates = IssuePriority::ALL
        .iter()
        .map(|p| (p.as_str().to_lowercase(), p.as_str()))
        .chain(PRIORITY_SYNONYMS.iter().map(|(k, v)| ((*k).to_string(), v.as_str())));
    Err(Error::InvalidPriority(with_suggestion(input, &folded, candidates)))
}

/// Error text for an unknown value, with a "did you mean" when one is close.
fn with_suggestion<I>(input: &str, folded: &str, candidates: I) -> String
where
    I: Iterator<Item = (String, &'static str)>,
{
    match find_closest_match(folded, candidates) {
        Some(canonical) => format!("{input} (did you mean {canonical}?)"),
        None => input.to_string(),
    }
}

/// Closest candidate within edit distance 3, reported by its canonical value.
fn find_closest_match<I>(input: &str, candidates: I) -> Option<&'static str>
where
    I: Iterator<Item = (String, &'static str)>,
{
    let mut best: Option<(&'static str, usize)> = None;

    for (spelling, canonical) in candidates {
        let dist = levenshtein_distance(input, &spelling);
        if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
            best = Some((canonical, dist));
        }
    }

    best.map(|(v, _)| v)
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single-row optimization
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("OPEN").unwrap(), IssueStatus::Open);
        assert_eq!(normalize_status("in progress").unwrap(), IssueStatus::InProgress);
        assert_eq!(normalize_status("in-progress").unwrap(), IssueStatus::InProgress);
        assert_eq!(normalize_status("done").unwrap(), IssueStatus::Closed);
        assert_eq!(normalize_status("wip").unwrap(), IssueStatus::InProgress);
        assert!(matches!(normalize_status("nonsense"), Err(Error::InvalidStatus(_))));
    }

    #[test]
    fn test_status_suggestion() {
        let err = normalize_status("closd").unwrap_err();
        assert!(err.to_string().contains("did you mean CLOSED"));
    }

    #[test]
    fn test_normalize_priority() {
        assert_eq!(normalize_priority("high").unwrap(), IssuePriority::High);
        assert_eq!(normalize_priority("P0").unwrap(), IssuePriority::Critical);
        assert_eq!(normalize_priority("p3").unwrap(), IssuePriority::Low);
        assert_eq!(normalize_priority("urgent").unwrap(), IssuePriority::Critical);
        assert!(normalize_priority("P7").is_err());
        assert!(matches!(normalize_priority("whenever"), Err(Error::InvalidPriority(_))));
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }
}
