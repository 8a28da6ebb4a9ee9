//! Go-flavoured semver utilities.
//!
//! Module versions are canonical semver strings with a `v` prefix, plus
//! two ecosystem extensions: pseudo-versions derived from commit hashes
//! (`v0.0.0-20191109021931-daa7c04131f5`) and the `+incompatible` build
//! suffix for pre-module major versions. This module also produces the
//! `sort_version` column encoding, a textual form whose lexicographic
//! byte order matches semver precedence.

use crate::error::{CoreError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

/// Classification used by the unit resolver: releases are preferred over
/// prereleases, which are preferred over everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionType {
    Release,
    Prerelease,
    Pseudo,
}

impl VersionType {
    /// Classifies a version string. Pseudo-versions and anything that
    /// fails to parse land in the lowest-priority bucket.
    pub fn of(version: &str) -> Self {
        if is_pseudo_version(version) {
            return Self::Pseudo;
        }
        match parse(version) {
            Ok(v) if v.pre.is_empty() => Self::Release,
            Ok(_) => Self::Prerelease,
            Err(_) => Self::Pseudo,
        }
    }

    /// Stored in the `version_type` column of `modules`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Prerelease => "prerelease",
            Self::Pseudo => "pseudo",
        }
    }

    /// Resolver ordering rank, lower is better.
    pub fn priority(self) -> i16 {
        match self {
            Self::Release => 0,
            Self::Prerelease => 1,
            Self::Pseudo => 2,
        }
    }
}

/// Parses a `v`-prefixed version into a semver value.
pub fn parse(version: &str) -> Result<semver::Version> {
    let rest = version
        .strip_prefix('v')
        .ok_or_else(|| CoreError::InvalidVersion {
            version: version.to_string(),
            message: "missing 'v' prefix".into(),
        })?;
    semver::Version::parse(rest).map_err(|e| CoreError::InvalidVersion {
        version: version.to_string(),
        message: e.to_string(),
    })
}

/// Whether the string is a valid canonical module version.
pub fn is_valid(version: &str) -> bool {
    parse(version).is_ok()
}

/// Whether the version carries the `+incompatible` build suffix.
pub fn is_incompatible(version: &str) -> bool {
    version.ends_with("+incompatible")
}

/// Checks if a version string is a pseudo-version.
///
/// Pseudo-version format: `vX.Y.Z-yyyymmddhhmmss-abcdefabcdef`, with the
/// prerelease part anchored at `0.` when derived from a tagged base.
pub fn is_pseudo_version(version: &str) -> bool {
    static PSEUDO_REGEX: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^v[0-9]+\.(0\.0-|\d+\.\d+-([^+]*\.)?0\.)\d{14}-[A-Za-z0-9]+(\+.*)?$").unwrap()
    });

    PSEUDO_REGEX.is_match(version)
}

/// Compares two module versions by semver precedence.
///
/// The `+incompatible` suffix is build metadata and does not participate.
/// Strings that fail to parse fall back to byte comparison.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp_precedence(&vb),
        _ => a.cmp(b),
    }
}

const FIELD_WIDTH: usize = 10;
const PRERELEASE_WIDTH: usize = 20;

/// Encodes a version so that lexicographic ordering of the encodings
/// matches semver precedence.
///
/// Layout: zero-padded `major.minor.patch`, then `~` for a release or
/// `-` plus the prerelease identifiers. Numeric identifiers are prefixed
/// with `#` and zero-padded (`#` sorts below every alphanumeric, matching
/// "numeric identifiers have lower precedence"); the padding is wide
/// enough for pseudo-version timestamps. `~` sorts above `-`, so a
/// release outranks every prerelease of the same triple. Build metadata
/// is dropped; the `incompatible` flag is a separate column.
///
/// Unparseable versions are returned unchanged so they at least order
/// deterministically.
pub fn for_sorting(version: &str) -> String {
    let Ok(v) = parse(version) else {
        return version.to_string();
    };
    let mut out = format!(
        "{:0fw$}.{:0fw$}.{:0fw$}",
        v.major,
        v.minor,
        v.patch,
        fw = FIELD_WIDTH
    );
    if v.pre.is_empty() {
        out.push('~');
        return out;
    }
    out.push('-');
    let encoded: Vec<String> = v
        .pre
        .as_str()
        .split('.')
        .map(|id| match id.parse::<u64>() {
            Ok(n) if !id.starts_with('0') || id == "0" => {
                format!("#{:0pw$}", n, pw = PRERELEASE_WIDTH)
            }
            _ => id.to_string(),
        })
        .collect();
    out.push_str(&encoded.join("."));
    out
}

/// Strips a `/vN` major-version suffix, yielding the series path.
pub fn series_path(module_path: &str) -> String {
    match split_major_suffix(module_path) {
        Some((series, _)) => series.to_string(),
        None => module_path.to_string(),
    }
}

/// Splits `m.com/v2` into (`m.com`, 2). Returns None when the path has no
/// well-formed `/vN` suffix. A literal `/v0` is treated like any other
/// suffix.
pub fn split_major_suffix(module_path: &str) -> Option<(&str, i32)> {
    let idx = module_path.rfind("/v")?;
    let digits = &module_path[idx + 2..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((&module_path[..idx], digits.parse().ok()?))
}

/// The major version a module path + version pair belongs to, per the
/// grouping rules: a `/vN` suffix wins, otherwise the version's major
/// component (v0.x counts as major 0).
pub fn series_path_and_major(module_path: &str, version: &str) -> (String, i32) {
    if let Some((series, major)) = split_major_suffix(module_path) {
        return (series.to_string(), major);
    }
    let major = parse(version).map(|v| v.major as i32).unwrap_or(0);
    (module_path.to_string(), major)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid() {
        assert!(is_valid("v1.2.3"));
        assert!(is_valid("v1.2.3-beta.1"));
        assert!(is_valid("v2.0.0+incompatible"));
        assert!(!is_valid("1.2.3"));
        assert!(!is_valid("v1.2"));
        assert!(!is_valid("master"));
    }

    #[test]
    fn test_is_incompatible() {
        assert!(is_incompatible("v2.0.0+incompatible"));
        assert!(!is_incompatible("v2.0.0"));
    }

    #[test]
    fn test_is_pseudo_version() {
        assert!(is_pseudo_version("v0.0.0-20191109021931-daa7c04131f5"));
        assert!(is_pseudo_version("v1.2.4-0.20191109021931-daa7c04131f5"));
        assert!(is_pseudo_version(
            "v2.0.1-0.20191109021931-daa7c04131f5+incompatible"
        ));
        assert!(!is_pseudo_version("v1.2.3"));
        assert!(!is_pseudo_version("v1.2.3-beta.1"));
    }

    #[test]
    fn test_version_type() {
        assert_eq!(VersionType::of("v1.2.3"), VersionType::Release);
        assert_eq!(VersionType::of("v1.2.3-rc.1"), VersionType::Prerelease);
        assert_eq!(
            VersionType::of("v0.0.0-20191109021931-daa7c04131f5"),
            VersionType::Pseudo
        );
        assert!(VersionType::Release.priority() < VersionType::Prerelease.priority());
        assert!(VersionType::Prerelease.priority() < VersionType::Pseudo.priority());
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare("v1.0.0", "v2.0.0"), Ordering::Less);
        assert_eq!(compare("v1.2.3", "v1.2.3"), Ordering::Equal);
        assert_eq!(compare("v1.0.0-alpha", "v1.0.0"), Ordering::Less);
        assert_eq!(compare("v2.0.0+incompatible", "v2.0.0"), Ordering::Equal);
    }

    #[test]
    fn test_for_sorting_orders_like_semver() {
        let ordered = [
            "v0.0.0-20191109021931-daa7c04131f5",
            "v0.1.0",
            "v1.0.0-alpha",
            "v1.0.0-alpha.1",
            "v1.0.0-beta",
            "v1.0.0-rc.1",
            "v1.0.0-rc.2",
            "v1.0.0",
            "v1.0.1",
            "v1.2.0",
            "v1.10.0",
            "v2.0.0",
        ];
        for pair in ordered.windows(2) {
            let (a, b) = (for_sorting(pair[0]), for_sorting(pair[1]));
            assert!(a < b, "{} -> {a} should sort before {} -> {b}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_for_sorting_numeric_prerelease_ids() {
        // Numeric identifiers compare numerically and below alphanumerics.
        assert!(for_sorting("v1.0.0-2") < for_sorting("v1.0.0-10"));
        assert!(for_sorting("v1.0.0-11") < for_sorting("v1.0.0-alpha"));
    }

    #[test]
    fn test_for_sorting_pseudo_below_release() {
        // A pseudo-version on top of v1.2.3 sorts below the v1.2.4 tag.
        assert!(
            for_sorting("v1.2.4-0.20191109021931-daa7c04131f5") < for_sorting("v1.2.4")
        );
    }

    #[test]
    fn test_series_path() {
        assert_eq!(series_path("m.com/v2"), "m.com");
        assert_eq!(series_path("m.com/v0"), "m.com");
        assert_eq!(series_path("m.com"), "m.com");
        assert_eq!(series_path("m.com/v2x"), "m.com/v2x");
        assert_eq!(series_path("gopkg.in/yaml.v2"), "gopkg.in/yaml.v2");
    }

    #[test]
    fn test_series_path_and_major() {
        assert_eq!(
            series_path_and_major("m.com/v2", "v2.1.0"),
            ("m.com".to_string(), 2)
        );
        assert_eq!(
            series_path_and_major("m.com", "v1.5.0"),
            ("m.com".to_string(), 1)
        );
        assert_eq!(
            series_path_and_major("m.com", "v0.4.0"),
            ("m.com".to_string(), 0)
        );
    }
}
