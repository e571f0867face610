//! Ordering for `v`-prefixed semantic version tags.

use std::cmp::Ordering;

use semver::Version;

/// Sort tags into semantic-version order. Tags that do not parse as
/// `v`-prefixed semantic versions order before all valid ones; the sort
/// is stable, so equal elements keep their input order.
pub fn sort(tags: &mut [String]) {
    tags.sort_by(|a, b| compare(a, b));
}

pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// The greatest tag by semantic-version order.
pub fn max(tags: &[String]) -> Option<&String> {
    tags.iter().max_by(|a, b| compare(a, b))
}

fn parse(tag: &str) -> Option<Version> {
    Version::parse(tag.strip_prefix('v')?).ok()
}
