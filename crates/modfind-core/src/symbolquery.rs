//! Symbol-search query classification and multi-word expansion.

use std::collections::BTreeSet;

/// The shape of a symbol query, which decides the SQL strategies run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolQuery {
    /// `Foo` — symbol name or path token.
    NoDot,
    /// `pkg.Foo` or `Type.Method` — ambiguous, both readings are tried.
    OneDot,
    /// `pkg.Type.Method` — always package-qualified.
    TwoDots,
    /// Several whitespace-separated words.
    MultiWord,
    /// Anything else; returns no results.
    Unsupported,
}

impl SymbolQuery {
    /// Classifies a raw query string.
    pub fn parse(q: &str) -> Self {
        let mut tokens = q.split_whitespace();
        let Some(first) = tokens.next() else {
            return Self::Unsupported;
        };
        if tokens.next().is_some() {
            return Self::MultiWord;
        }
        match first.matches('.').count() {
            0 => Self::NoDot,
            1 => Self::OneDot,
            2 => Self::TwoDots,
            _ => Self::Unsupported,
        }
    }
}

/// One way of reading a multi-word query: a symbol candidate plus a
/// tsquery over path tokens built from the remaining words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolCandidate {
    pub symbol: String,
    pub path_tokens: String,
}

/// Upper bound on multi-word readings; more than this is treated as an
/// unanswerable query.
const MAX_CANDIDATES: usize = 3;

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

const COMMON_HOST_PARTS: [&str; 6] = ["code", "git", "gitlab", "go", "google", "www"];

/// Expands a multi-word query into candidate (symbol, path-filter) pairs.
///
/// Every word that could plausibly be an identifier is tried as the
/// symbol, with the remaining words ANDed into a path-token filter.
/// Words containing `/` or `-`, URLs, hostnames and common host labels
/// are path material, never symbols. With more than three plausible
/// symbols the query is ambiguous beyond use and expands to nothing.
/// A `symbol_filter` pins the symbol word, bypassing the guess.
pub fn expand_multi_word(q: &str, symbol_filter: Option<&str>) -> Vec<SymbolCandidate> {
    let words: Vec<&str> = {
        let mut seen = BTreeSet::new();
        q.split_whitespace()
            .filter(|w| seen.insert(w.to_string()))
            .collect()
    };

    let mut candidates = Vec::new();
    for &word in &words {
        if let Some(filter) = symbol_filter {
            if word != filter {
                continue;
            }
        } else if !is_symbol_candidate(word) {
            continue;
        }
        let rest: Vec<&str> = words.iter().copied().filter(|w| *w != word).collect();
        if rest.is_empty() {
            continue;
        }
        candidates.push(SymbolCandidate {
            symbol: word.to_string(),
            path_tokens: rest.join(" & "),
        });
    }
    if symbol_filter.is_none() && candidates.len() > MAX_CANDIDATES {
        return Vec::new();
    }
    candidates
}

fn is_symbol_candidate(word: &str) -> bool {
    if word.contains('/') || word.contains('-') || word.contains("://") {
        return false;
    }
    let lower = word.to_lowercase();
    if COMMON_HOSTNAMES.contains(&lower.as_str()) || COMMON_HOST_PARTS.contains(&lower.as_str()) {
        return false;
    }
    // Dotted words read as hostnames, not identifiers.
    !word.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shapes() {
        assert_eq!(SymbolQuery::parse("Marshal"), SymbolQuery::NoDot);
        assert_eq!(SymbolQuery::parse("json.Marshal"), SymbolQuery::OneDot);
        assert_eq!(SymbolQuery::parse("json.Decoder.Decode"), SymbolQuery::TwoDots);
        assert_eq!(SymbolQuery::parse("a.b.c.d"), SymbolQuery::Unsupported);
        assert_eq!(SymbolQuery::parse("sql DB.Begin"), SymbolQuery::MultiWord);
        assert_eq!(SymbolQuery::parse("   "), SymbolQuery::Unsupported);
    }

    #[test]
    fn test_expand_basic() {
        let got = expand_multi_word("Begin database/sql", None);
        assert_eq!(
            got,
            vec![SymbolCandidate {
                symbol: "Begin".into(),
                path_tokens: "database/sql".into(),
            }]
        );
    }

    #[test]
    fn test_expand_multiple_candidates() {
        let got = expand_multi_word("json Decode stream", None);
        // All three words are plausible symbols.
        assert_eq!(got.len(), 3);
        assert!(got.iter().any(|c| c.symbol == "Decode" && c.path_tokens == "json & stream"));
    }

    #[test]
    fn test_expand_too_ambiguous() {
        let got = expand_multi_word("alpha beta gamma delta", None);
        assert!(got.is_empty());
    }

    #[test]
    fn test_expand_skips_hosts_and_paths() {
        let got = expand_multi_word("github.com/user/repo Marshal", None);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].symbol, "Marshal");
        assert_eq!(got[0].path_tokens, "github.com/user/repo");
    }

    #[test]
    fn test_expand_skips_hyphenated() {
        let got = expand_multi_word("go-cmp Diff", None);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].symbol, "Diff");
    }

    #[test]
    fn test_symbol_filter_pins_choice() {
        let got = expand_multi_word("alpha beta gamma delta", Some("beta"));
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].symbol, "beta");
        assert_eq!(got[0].path_tokens, "alpha & gamma & delta");
    }

    #[test]
    fn test_duplicate_words_collapse() {
        let got = expand_multi_word("Read Read io", None);
        assert_eq!(got.len(), 2);
    }
}
