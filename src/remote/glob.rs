//! Glob pattern compilation
//!
//! Stream configs select files with glob patterns. Patterns are compiled
//! once at stream construction into anchored regexes; a pattern that does
//! not compile is a configuration error, surfaced before any listing call.
//!
//! Supported syntax: `*` (any run of characters except `/`), `**` (any run
//! including `/`), `?` (a single character except `/`), and `[...]`
//! character classes.

use crate::error::{Error, Result};
use regex::Regex;

/// A compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: String,
    regex: Regex,
    prefix: String,
}

impl GlobMatcher {
    /// Compile a glob pattern
    pub fn compile(pattern: &str) -> Result<Self> {
        let regex_src = glob_to_regex(pattern)?;
        let regex = Regex::new(&regex_src)
            .map_err(|e| Error::malformed_glob(pattern, e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            prefix: literal_prefix(pattern),
        })
    }

    /// Compile a list of glob patterns, failing on the first malformed one
    pub fn compile_all(patterns: &[String]) -> Result<Vec<Self>> {
        patterns.iter().map(|p| Self::compile(p)).collect()
    }

    /// The original pattern text
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The longest literal path prefix before the first wildcard
    ///
    /// Used to bound listing calls to a store subtree.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether a URI matches this pattern
    pub fn matches(&self, uri: &str) -> bool {
        self.regex.is_match(uri)
    }
}

/// Translate a glob pattern into an anchored regex
fn glob_to_regex(pattern: &str) -> Result<String> {
    if pattern.is_empty() {
        return Err(Error::malformed_glob(pattern, "empty pattern"));
    }

    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // `**/` also matches the empty path segment
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        regex.push_str("(?:.*/)?");
                    } else {
                        regex.push_str(".*");
                    }
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' => regex.push_str("[^/]"),
            '[' => {
                let mut class = String::from("[");
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    if matches!(inner, '\\' | '^') {
                        class.push('\\');
                    }
                    class.push(inner);
                }
                if !closed {
                    return Err(Error::malformed_glob(pattern, "unterminated character class"));
                }
                class.push(']');
                regex.push_str(&class);
            }
            c if "\\.+()|{}^$".contains(c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
    }

    regex.push('$');
    Ok(regex)
}

/// The literal path prefix of a pattern, up to the last `/` before the
/// first wildcard character
fn literal_prefix(pattern: &str) -> String {
    let wildcard_at = pattern
        .find(|c| matches!(c, '*' | '?' | '['))
        .unwrap_or(pattern.len());
    match pattern[..wildcard_at].rfind('/') {
        Some(slash) => pattern[..slash].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_does_not_cross_directories() {
        let glob = GlobMatcher::compile("*.csv").unwrap();
        assert!(glob.matches("a.csv"));
        assert!(glob.matches("file-2.csv"));
        assert!(!glob.matches("dir/a.csv"));
        assert!(!glob.matches("a.csv.bak"));
    }

    #[test]
    fn test_double_star_crosses_directories() {
        let glob = GlobMatcher::compile("**/*.jsonl").unwrap();
        assert!(glob.matches("a.jsonl"));
        assert!(glob.matches("x/y/z/a.jsonl"));
        assert!(!glob.matches("a.json"));

        let glob = GlobMatcher::compile("data/**").unwrap();
        assert!(glob.matches("data/a.csv"));
        assert!(glob.matches("data/x/y.csv"));
        assert!(!glob.matches("other/a.csv"));
    }

    #[test]
    fn test_question_mark_and_class() {
        let glob = GlobMatcher::compile("log-?.txt").unwrap();
        assert!(glob.matches("log-1.txt"));
        assert!(!glob.matches("log-10.txt"));

        let glob = GlobMatcher::compile("report-[0-9][0-9].csv").unwrap();
        assert!(glob.matches("report-07.csv"));
        assert!(!glob.matches("report-7.csv"));
        assert!(!glob.matches("report-ab.csv"));
    }

    #[test]
    fn test_literal_dots_are_escaped() {
        let glob = GlobMatcher::compile("a.csv").unwrap();
        assert!(glob.matches("a.csv"));
        assert!(!glob.matches("aXcsv"));
    }

    #[test]
    fn test_malformed_patterns_rejected() {
        assert!(GlobMatcher::compile("").is_err());
        assert!(GlobMatcher::compile("data/[abc.csv").is_err());
    }

    #[test]
    fn test_prefix_extraction() {
        assert_eq!(GlobMatcher::compile("*.csv").unwrap().prefix(), "");
        assert_eq!(
            GlobMatcher::compile("data/2024/*.csv").unwrap().prefix(),
            "data/2024"
        );
        assert_eq!(GlobMatcher::compile("data/**/*.csv").unwrap().prefix(), "data");
        assert_eq!(GlobMatcher::compile("data/file.csv").unwrap().prefix(), "data");
    }
}
