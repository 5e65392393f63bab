use std::cmp::Ordering;
use std::sync::LazyLock;
use regex::Regex;
use crate::error::{GvmError, Result};

/// Accepted user input: `major.minor[.patch][rcN]`, optionally prefixed with `v`.
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(0|[1-9]\d*)\.(0|[1-9]\d*)(?:\.(0|[1-9]\d*))?(?:rc([1-9]\d*))?$")
        .expect("version grammar is a valid regex")
});

/// Loose form used for ordering identifiers that came from a remote source.
static ORDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?(?:(?:rc|beta)(\d+))?")
        .expect("ordering pattern is a valid regex")
});

/// Checks a version string against the accepted grammar.
pub fn is_valid_version(version: &str) -> bool {
    VERSION_RE.is_match(version)
}

/// Like [`is_valid_version`], but returns a [`GvmError::Validation`] for bad input.
pub fn validate_version(version: &str) -> Result<()> {
    if is_valid_version(version) {
        Ok(())
    } else {
        Err(GvmError::Validation(version.to_string()))
    }
}

/// Strips a single leading `go` token, so `go1.25.5` and `1.25.5` compare equal.
///
/// Only one token is removed: `gogo1.0` becomes `go1.0`.
pub fn normalize(identifier: &str) -> &str {
    identifier.strip_prefix("go").unwrap_or(identifier)
}

/// Normalizes a user-supplied version for lookup: drops the optional `v`
/// accepted by the grammar, then applies [`normalize`].
pub fn requested_key(requested: &str) -> &str {
    let trimmed = requested.trim();
    normalize(trimmed.strip_prefix('v').unwrap_or(trimmed))
}

/// Whether `identifier` matches `requested` after normalizing both sides.
pub fn matches_requested(identifier: &str, requested: &str) -> bool {
    normalize(identifier) == requested_key(requested)
}

pub fn is_release_candidate(identifier: &str) -> bool {
    let raw = normalize(identifier);
    raw.contains("rc") || raw.contains("beta")
}

/// Orders two identifiers numerically (`go1.9` before `go1.10`), with a
/// release candidate sorting before its final release. Identifiers that
/// don't look like versions fall back to plain string order after the
/// ones that do.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (order_key(a), order_key(b)) {
        (Some(ka), Some(kb)) => ka.cmp(&kb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn order_key(identifier: &str) -> Option<(u64, u64, u64, u64, u64)> {
    let caps = ORDER_RE.captures(normalize(identifier))?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    let major = num(1)?;
    let minor = num(2)?;
    let patch = num(3).unwrap_or(0);
    let (stage, pre) = match num(4) {
        Some(n) => (0, n),
        None => (1, 0),
    };
    Some((major, minor, patch, stage, pre))
}
