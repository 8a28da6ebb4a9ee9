//! README and synopsis sectioning for the weighted search vector.
//!
//! A package's text is split into three sections: B carries the synopsis
//! (or the README's first sentence when no synopsis exists), C the first
//! sentence, D the remainder. Each section is word-processed and capped
//! so one verbose README cannot dominate the index.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Hard cap on the number of indexed words per section.
pub const MAX_SECTION_WORDS: usize = 50;

/// The B/C/D text sections fed to `setweight(to_tsvector(...))`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchSections {
    pub b: String,
    pub c: String,
    pub d: String,
}

/// Computes the weighted sections for a package.
///
/// Markdown READMEs are reduced to their text content (code blocks and
/// images dropped). Section D is additionally capped at half its
/// candidate length so long READMEs contribute tail terms only
/// proportionally.
pub fn search_sections(
    synopsis: &str,
    readme_filename: &str,
    readme_contents: &str,
) -> SearchSections {
    let text = if is_markdown(readme_filename) {
        markdown_text(readme_contents)
    } else {
        readme_contents.to_string()
    };
    let (first, rest) = split_first_sentence(&text);

    let d_words = process_words(rest);
    let d_cap = (d_words.len() / 2).min(MAX_SECTION_WORDS);
    let d = join_words(&d_words[..d_cap]);

    if synopsis.trim().is_empty() {
        // No synopsis: promote the first sentence into B.
        let b_words = process_words(first);
        return SearchSections {
            b: join_words(truncate(&b_words)),
            c: String::new(),
            d,
        };
    }

    let b_words = process_words(synopsis);
    let c_words = process_words(first);
    SearchSections {
        b: join_words(truncate(&b_words)),
        c: join_words(truncate(&c_words)),
        d,
    }
}

fn is_markdown(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.ends_with(".md") || lower.ends_with(".markdown")
}

fn truncate(words: &[String]) -> &[String] {
    &words[..words.len().min(MAX_SECTION_WORDS)]
}

fn join_words(words: &[String]) -> String {
    words.join(" ").replace('\u{0}', "")
}

/// Extracts plain text from Markdown, dropping code blocks and images
/// (including their alt text).
fn markdown_text(input: &str) -> String {
    let mut out = String::new();
    let mut skip_depth = 0usize;
    for event in Parser::new(input) {
        match event {
            Event::Start(Tag::CodeBlock(_)) | Event::Start(Tag::Image { .. }) => skip_depth += 1,
            Event::End(TagEnd::CodeBlock) | Event::End(TagEnd::Image) => {
                skip_depth = skip_depth.saturating_sub(1);
            }
            Event::Text(t) | Event::Code(t) => {
                if skip_depth == 0 {
                    out.push_str(&t);
                    out.push(' ');
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if skip_depth == 0 {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
    out
}

/// Splits text at the end of the first sentence: the first `.`, `!` or
/// `?` followed by whitespace (or end of text) that is not immediately
/// preceded by an uppercase letter (guards against "U.S." style
/// abbreviations).
fn split_first_sentence(text: &str) -> (&str, &str) {
    let mut prev: Option<char> = None;
    let mut iter = text.char_indices().peekable();
    while let Some((idx, c)) = iter.next() {
        if matches!(c, '.' | '!' | '?') {
            let next_ok = match iter.peek() {
                Some((_, next)) => next.is_whitespace(),
                None => true,
            };
            let prev_ok = !prev.is_some_and(char::is_uppercase);
            if next_ok && prev_ok {
                return (&text[..idx], &text[idx + c.len_utf8()..]);
            }
        }
        prev = Some(c);
    }
    (text, "")
}

/// Lowercases, trims punctuation and expands each whitespace-separated
/// word through the replacement table.
fn process_words(s: &str) -> Vec<String> {
    let lower = s.to_lowercase();
    let mut out = Vec::new();
    for raw in lower.split_whitespace() {
        let word = raw.trim_matches(|c: char| c.is_ascii_punctuation() && c != '-');
        let word = word.trim_matches('-');
        if word.is_empty() {
            continue;
        }
        expand_word(word, &mut out);
    }
    out
}

fn expand_word(word: &str, out: &mut Vec<String>) {
    if let Some(subs) = replacements(word) {
        out.extend(subs.iter().map(|s| (*s).to_string()));
        return;
    }
    out.push(word.to_string());
    if word.contains('-') && !is_url(word) {
        for part in word.split('-') {
            if let Some(subs) = replacements(part) {
                out.extend(subs.iter().map(|s| (*s).to_string()));
            }
        }
    }
}

fn is_url(word: &str) -> bool {
    word.contains("://")
}

/// Synonym table applied per word. Some entries keep the original
/// spelling alongside the substitute, some replace it outright.
fn replacements(word: &str) -> Option<&'static [&'static str]> {
    let subs: &'static [&'static str] = match word {
        "postgres" => &["postgres", "postgresql"],
        "postgresql" => &["postgresql", "postgres"],
        "rand" => &["random"],
        "mongo" => &["mongo", "mongodb"],
        "mongodb" => &["mongodb", "mongo"],
        "redis" => &["redis", "redisdb"],
        "redisdb" => &["redisdb", "redis"],
        "logger" => &["logger", "log"],
        "parser" => &["parser", "parse"],
        "utf-8" => &["utf-8", "utf8"],
        _ => return None,
    };
    Some(subs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> usize {
        s.split_whitespace().count()
    }

    #[test]
    fn test_plain_readme_sections() {
        let got = search_sections(
            "Package cmp provides comparisons.",
            "README",
            "Cmp compares values. It is used in tests across many repositories every day.",
        );
        assert_eq!(got.b, "package cmp provides comparisons");
        assert_eq!(got.c, "cmp compares values");
        // D takes half of its ten candidate words.
        assert_eq!(words(&got.d), 5);
        assert!(got.d.starts_with("it is used"));
    }

    #[test]
    fn test_empty_synopsis_promotes_first_sentence() {
        let got = search_sections("", "README", "Fast JSON parsing. More detail follows here.");
        assert_eq!(got.b, "fast json parsing");
        assert_eq!(got.c, "");
    }

    #[test]
    fn test_abbreviation_does_not_end_sentence() {
        let (first, rest) = split_first_sentence("Used by the U.S. government daily. More.");
        assert_eq!(first, "Used by the U.S. government daily");
        assert_eq!(rest, " More.");
    }

    #[test]
    fn test_sentence_end_requires_whitespace() {
        let (first, _) = split_first_sentence("See example.com for details. Next sentence.");
        assert_eq!(first, "See example.com for details");
    }

    #[test]
    fn test_exclamation_ends_sentence() {
        let (first, rest) = split_first_sentence("Blazing fast! Really fast.");
        assert_eq!(first, "Blazing fast");
        assert_eq!(rest, " Really fast.");
    }

    #[test]
    fn test_markdown_skips_code_and_images() {
        let md = "Intro text here\n\n```go\nfunc secret() {}\n```\n\n![logo](img.png)\n\nclosing words";
        let text = markdown_text(md);
        assert!(text.contains("Intro text here"));
        assert!(text.contains("closing words"));
        assert!(!text.contains("secret"));
        assert!(!text.contains("logo"));
    }

    #[test]
    fn test_markdown_detection_by_filename() {
        let contents = "Intro words here.\n\n```\nblocksecret\n```\n\ntail words one two three four";
        let md = search_sections("s", "README.md", contents);
        assert!(!md.d.contains("blocksecret"));
        // A non-Markdown filename passes the fence text through verbatim.
        let txt = search_sections("s", "README.txt", contents);
        assert!(txt.d.contains("blocksecret"));
    }

    #[test]
    fn test_replacements() {
        let got = process_words("Postgres rand logger");
        assert_eq!(
            got,
            vec!["postgres", "postgresql", "random", "logger", "log"]
        );
    }

    #[test]
    fn test_hyphenated_word_part_replacements() {
        let got = process_words("go-redis");
        assert_eq!(got, vec!["go-redis", "redis", "redisdb"]);
    }

    #[test]
    fn test_utf8_replacement() {
        let got = process_words("utf-8");
        assert_eq!(got, vec!["utf-8", "utf8"]);
    }

    #[test]
    fn test_punctuation_trimmed() {
        let got = process_words("(fast), [simple]; \"robust\"");
        assert_eq!(got, vec!["fast", "simple", "robust"]);
    }

    #[test]
    fn test_section_caps() {
        let long: String = (0..400).map(|i| format!("word{i} ")).collect();
        let got = search_sections(&long, "README", &format!("{long}. {long}"));
        assert!(words(&got.b) <= MAX_SECTION_WORDS);
        assert!(words(&got.c) <= MAX_SECTION_WORDS);
        assert!(words(&got.d) <= MAX_SECTION_WORDS);
    }

    #[test]
    fn test_d_half_cap() {
        // 8 candidate words -> 4 indexed.
        let got = search_sections("s", "README", "one. two three four five six seven eight nine");
        assert_eq!(words(&got.d), 4);
    }

    #[test]
    fn test_nul_stripped() {
        let got = search_sections("bad\u{0}synopsis", "README", "body\u{0} text. rest rest");
        assert!(!got.b.contains('\u{0}'));
        assert!(!got.c.contains('\u{0}'));
        assert!(!got.d.contains('\u{0}'));
    }
}
