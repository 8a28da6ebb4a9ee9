//! Path-token generation for the A-weight section of the search vector.

use std::collections::BTreeSet;

/// Hostnames so common that indexing them as standalone tokens would
/// flood the index without adding signal.
const COMMON_HOSTNAMES: [&str; 11] = [
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "gopkg.in",
    "golang.org",
    "google.golang.org",
    "go.etcd.io",
    "go.googlesource.com",
    "code.cloudfoundry.org",
    "gitee.com",
    "gitea.com",
];

/// Hostname labels dropped when splitting dotted parts.
const COMMON_HOST_PARTS: [&str; 6] = ["code", "git", "gitlab", "go", "google", "www"];

/// Returns the set of tokens indexed for a package path.
///
/// Tokens include every multi-segment sub-path, the individual segments
/// (minus common hostnames in leading position), dash pieces of hyphenated
/// segments, and the non-terminal labels of dotted segments (minus common
/// host labels). The result is sorted and de-duplicated; the full path is
/// always a member for any hostname-prefixed input.
pub fn generate_path_tokens(package_path: &str) -> Vec<String> {
    let trimmed = package_path.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    let parts: Vec<&str> = trimmed.split('/').collect();
    let mut tokens: BTreeSet<String> = BTreeSet::new();

    for (i, part) in parts.iter().enumerate() {
        let dash_pieces: Vec<&str> = part.split('-').collect();
        if dash_pieces.len() > 1 {
            for piece in &dash_pieces {
                tokens.insert((*piece).to_string());
            }
        }
        for j in (i + 2)..=parts.len() {
            tokens.insert(parts[i..j].join("/"));
        }
        if i == 0 && COMMON_HOSTNAMES.contains(part) {
            continue;
        }
        tokens.insert((*part).to_string());
        let dotted: Vec<&str> = part.split('.').collect();
        if dotted.len() > 1 {
            for label in &dotted[..dotted.len() - 1] {
                if !COMMON_HOST_PARTS.contains(label) {
                    tokens.insert((*label).to_string());
                }
            }
        }
    }

    tokens.remove("");
    tokens.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_hostname_skipped() {
        let tokens = generate_path_tokens("github.com/user/repo");
        assert!(!tokens.contains(&"github.com".to_string()));
        assert!(!tokens.contains(&"github".to_string()));
        assert!(tokens.contains(&"user".to_string()));
        assert!(tokens.contains(&"repo".to_string()));
        // The full path and its multi-segment sub-paths are indexed.
        assert!(tokens.contains(&"github.com/user/repo".to_string()));
        assert!(tokens.contains(&"github.com/user".to_string()));
        assert!(tokens.contains(&"user/repo".to_string()));
    }

    #[test]
    fn test_uncommon_hostname_labels_kept() {
        let tokens = generate_path_tokens("sigs.k8s.io/controller-runtime");
        assert!(tokens.contains(&"sigs.k8s.io".to_string()));
        assert!(tokens.contains(&"sigs".to_string()));
        assert!(tokens.contains(&"k8s".to_string()));
        // "io" is the terminal label and is not emitted on its own.
        assert!(!tokens.contains(&"io".to_string()));
    }

    #[test]
    fn test_dash_pieces() {
        let tokens = generate_path_tokens("github.com/user/go-cmp");
        assert!(tokens.contains(&"go-cmp".to_string()));
        assert!(tokens.contains(&"go".to_string()));
        assert!(tokens.contains(&"cmp".to_string()));
    }

    #[test]
    fn test_common_host_parts_dropped() {
        let tokens = generate_path_tokens("go.uber.org/zap");
        // "go" is a common host label; "uber" is not.
        assert!(!tokens.contains(&"go".to_string()));
        assert!(tokens.contains(&"uber".to_string()));
        assert!(tokens.contains(&"zap".to_string()));
        assert!(tokens.contains(&"go.uber.org".to_string()));
    }

    #[test]
    fn test_single_segment_path() {
        let tokens = generate_path_tokens("fmt");
        assert_eq!(tokens, vec!["fmt".to_string()]);
    }

    #[test]
    fn test_subpaths_skip_single_interior_segments() {
        let tokens = generate_path_tokens("a.com/b/c/d");
        assert!(tokens.contains(&"b/c".to_string()));
        assert!(tokens.contains(&"c/d".to_string()));
        assert!(tokens.contains(&"b/c/d".to_string()));
        assert!(tokens.contains(&"a.com/b/c/d".to_string()));
        // Interior segments are tokens on their own, not joined singly.
        assert!(tokens.contains(&"c".to_string()));
    }

    #[test]
    fn test_output_sorted_and_deduped() {
        let tokens = generate_path_tokens("a.com/x/x");
        let mut sorted = tokens.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(tokens, sorted);
    }

    #[test]
    fn test_trims_slashes() {
        assert_eq!(
            generate_path_tokens("/a.com/b/"),
            generate_path_tokens("a.com/b")
        );
    }
}
