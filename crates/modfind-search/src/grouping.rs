//! Grouping of package results by module series.
//!
//! A series (module path minus any `/vN` suffix) appears once in a
//! result page. The highest-scoring member represents the group unless a
//! later member carries a higher tagged major version; other majors are
//! recorded, and further packages of the same module chain underneath.

use crate::SearchResult;
use modfind_core::version;

/// The grouping key and major version of a result. Stdlib packages
/// group by their top-level directory with major forced to 1.
pub fn series_and_major(result: &SearchResult) -> (String, i32) {
    if result.module_path == modfind_core::types::STDLIB_MODULE_PATH {
        let top = result
            .package_path
            .split('/')
            .next()
            .unwrap_or("")
            .to_string();
        return (top, 1);
    }
    version::series_path_and_major(&result.module_path, &result.version)
}

/// Groups score-ordered results, re-sorts by score and truncates.
pub fn group_results(results: Vec<SearchResult>, max_results: usize) -> Vec<SearchResult> {
    let mut grouped: Vec<SearchResult> = Vec::new();
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for result in results {
        let (series, major) = series_and_major(&result);
        let Some(&i) = index.get(&series) else {
            index.insert(series, grouped.len());
            grouped.push(result);
            continue;
        };

        if grouped[i].module_path == result.module_path {
            grouped[i].same_module.push(result);
            continue;
        }

        let (_, current_major) = series_and_major(&grouped[i]);
        // A pseudo-version never displaces a tagged representative,
        // whatever its major.
        let replace = major > current_major
            && !(version::is_pseudo_version(&result.version)
                && !version::is_pseudo_version(&grouped[i].version));
        if replace {
            let mut winner = result;
            let loser = std::mem::replace(&mut grouped[i], SearchResult::empty(String::new()));
            winner.other_major.extend(loser.other_major);
            winner.other_major.insert(loser.module_path, current_major);
            grouped[i] = winner;
        } else {
            grouped[i].other_major.insert(result.module_path.clone(), major);
        }
    }

    grouped.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    grouped.truncate(max_results);
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(package_path: &str, module_path: &str, version: &str, score: f64) -> SearchResult {
        let mut r = SearchResult::empty(package_path.to_string());
        r.module_path = module_path.to_string();
        r.version = version.to_string();
        r.score = score;
        r
    }

    #[test]
    fn test_higher_major_replaces() {
        // S5 shape: v1 scores higher, v2 still wins the group.
        let results = vec![
            result("m.com/p", "m.com", "v1.5.0", 2.0),
            result("m.com/v2/p", "m.com/v2", "v2.1.0", 1.5),
        ];
        let grouped = group_results(results, 10);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].module_path, "m.com/v2");
        assert_eq!(grouped[0].other_major.get("m.com"), Some(&1));
    }

    #[test]
    fn test_lower_major_recorded_not_replacing() {
        let results = vec![
            result("m.com/v2/p", "m.com/v2", "v2.1.0", 2.0),
            result("m.com/p", "m.com", "v1.5.0", 1.5),
        ];
        let grouped = group_results(results, 10);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].module_path, "m.com/v2");
        assert_eq!(grouped[0].other_major.get("m.com"), Some(&1));
    }

    #[test]
    fn test_pseudo_version_never_displaces_tagged() {
        let results = vec![
            result("m.com/p", "m.com", "v1.5.0", 2.0),
            result(
                "m.com/v2/p",
                "m.com/v2",
                "v2.0.0-20191109021931-daa7c04131f5",
                1.5,
            ),
        ];
        let grouped = group_results(results, 10);
        assert_eq!(grouped[0].module_path, "m.com");
        assert_eq!(grouped[0].other_major.get("m.com/v2"), Some(&2));
    }

    #[test]
    fn test_same_module_chains() {
        let results = vec![
            result("m.com/a", "m.com", "v1.0.0", 2.0),
            result("m.com/b", "m.com", "v1.0.0", 1.0),
        ];
        let grouped = group_results(results, 10);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].package_path, "m.com/a");
        assert_eq!(grouped[0].same_module.len(), 1);
        assert_eq!(grouped[0].same_module[0].package_path, "m.com/b");
    }

    #[test]
    fn test_v0_counts_as_major_zero() {
        let results = vec![
            result("m.com/p", "m.com", "v0.4.0", 2.0),
            result("m.com/v2/p", "m.com/v2", "v2.0.0", 1.0),
        ];
        let grouped = group_results(results, 10);
        assert_eq!(grouped[0].module_path, "m.com/v2");
        assert_eq!(grouped[0].other_major.get("m.com"), Some(&0));
    }

    #[test]
    fn test_stdlib_groups_by_top_level_dir() {
        let http = result("net/http", "std", "v1.21.0", 2.0);
        let netip = result("net/netip", "std", "v1.21.0", 1.0);
        let fmt = result("fmt", "std", "v1.21.0", 0.5);
        let grouped = group_results(vec![http, netip, fmt], 10);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].package_path, "net/http");
        assert_eq!(grouped[0].same_module.len(), 1);
        assert_eq!(grouped[1].package_path, "fmt");
        assert_eq!(series_and_major(&grouped[0]), ("net".to_string(), 1));
    }

    #[test]
    fn test_resort_and_truncate() {
        // Replacement can demote a group's score below later groups.
        let results = vec![
            result("m.com/p", "m.com", "v1.0.0", 3.0),
            result("other.com/q", "other.com", "v1.0.0", 2.0),
            result("m.com/v2/p", "m.com/v2", "v2.0.0", 1.0),
        ];
        let grouped = group_results(results, 1);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].package_path, "other.com/q");
    }

    #[test]
    fn test_distinct_series_stay_separate() {
        let results = vec![
            result("a.com/x", "a.com", "v1.0.0", 2.0),
            result("b.com/y", "b.com", "v1.0.0", 1.0),
        ];
        let grouped = group_results(results, 10);
        assert_eq!(grouped.len(), 2);
    }
}
