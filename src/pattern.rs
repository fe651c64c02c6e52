//! Glob matching for sync paths.
//!
//! The dialect is deliberately small: `*` matches within one path segment,
//! `**` matches across segments (including none), `?` matches one character
//! other than `/`, and everything else is literal. There are no character
//! classes, negations or brace expansions.

use anyhow::{Context, Result};
use regex::Regex;

/// Compile a glob into an anchored regular expression.
fn compile(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() * 2 + 2);
    expr.push('^');

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    // `**/` also matches zero segments
                    expr.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    expr.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                expr.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                expr.push_str("[^/]");
                i += 1;
            }
            c => {
                let mut buf = [0u8; 4];
                expr.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }

    expr.push('$');
    Regex::new(&expr).with_context(|| format!("Invalid sync pattern: {pattern}"))
}

/// Check a single path against a single pattern.
pub fn matches(path: &str, pattern: &str) -> bool {
    if path == pattern {
        return true;
    }
    if !has_wildcard(pattern) {
        return false;
    }

    match compile(pattern) {
        Ok(re) => re.is_match(path),
        Err(e) => {
            log::warn!("{e:#}");
            false
        }
    }
}

/// Check a path against every pattern; an empty list matches nothing.
pub fn matches_any<S: AsRef<str>>(path: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| matches(path, p.as_ref()))
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// A pattern list compiled once and reused for a whole traversal.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    compiled: Vec<Regex>,
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        let compiled = patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(PatternSet { patterns, compiled })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `path` matches at least one pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.patterns
            .iter()
            .zip(&self.compiled)
            .any(|(pattern, re)| path == pattern || re.is_match(path))
    }

    /// Whether a directory could hold a file matching any pattern.
    pub fn could_contain_match(&self, dir: &str) -> bool {
        self.patterns.iter().any(|p| could_contain_match(dir, p))
    }
}

/// Decide whether descending into `dir` could produce a match for `pattern`.
///
/// Walks the directory's segments against the pattern's leading segments. A
/// segment containing `**` can swallow any depth, so it answers yes at once.
/// The test may say yes for directories that end up empty of matches, but it
/// never says no for a directory that holds one.
pub fn could_contain_match(dir: &str, pattern: &str) -> bool {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        return true;
    }

    let mut pattern_segments = pattern.split('/');
    for dir_segment in dir.split('/') {
        let Some(pattern_segment) = pattern_segments.next() else {
            return false;
        };
        if pattern_segment.contains("**") {
            return true;
        }
        if !matches(dir_segment, pattern_segment) {
            return false;
        }
    }

    // the directory is an ancestor only if the pattern has segments left for files
    pattern_segments.next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("rules/a.mdc")]
    #[case("mcp.json")]
    #[case(".cursorrules")]
    #[case("prompts/deep/nested/file.md")]
    fn test_double_star_matches_everything(#[case] path: &str) {
        assert!(matches(path, "**"));
    }

    #[test]
    fn test_directory_glob() {
        assert!(matches("rules/a.mdc", "rules/**"));
        assert!(matches("rules/sub/b.mdc", "rules/**"));
        assert!(!matches("rule/a.mdc", "rules/**"));
    }

    #[test]
    fn test_literal_pattern_is_exact() {
        assert!(matches("mcp.json", "mcp.json"));
        assert!(!matches("mcpXjson", "mcp.json"));
        assert!(!matches("sub/mcp.json", "mcp.json"));
        assert!(!matches("mcp.json.bak", "mcp.json"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        assert!(matches("rules/a.mdc", "rules/*.mdc"));
        assert!(!matches("rules/sub/a.mdc", "rules/*.mdc"));
    }

    #[test]
    fn test_double_star_slash_matches_zero_segments() {
        assert!(matches("a.mdc", "**/*.mdc"));
        assert!(matches("x/y/a.mdc", "**/*.mdc"));
    }

    #[test]
    fn test_question_mark() {
        assert!(matches("rules/a.md", "rules/?.md"));
        assert!(!matches("rules/ab.md", "rules/?.md"));
        assert!(!matches("a/b", "a?b"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(matches("prompts/(draft)+1.md", "prompts/(draft)+1.md"));
        assert!(matches("prompts/(draft)+1.md", "prompts/(draft)+*.md"));
        assert!(!matches("prompts/draft1.md", "prompts/(draft)+*.md"));
    }

    #[test]
    fn test_empty_pattern_list_matches_nothing() {
        let empty: Vec<String> = Vec::new();
        assert!(!matches_any("mcp.json", &empty));
        assert!(!PatternSet::new(&empty).unwrap().is_match("mcp.json"));
    }

    #[test]
    fn test_pattern_set_agrees_with_matches() {
        let patterns = [".cursorrules", "rules/**", "mcp.json", "prompts/**"];
        let set = PatternSet::new(&patterns).unwrap();
        for path in ["rules/a.mdc", "mcp.json", ".cursorrules", "prompts/x.md", "other.txt"] {
            assert_eq!(set.is_match(path), matches_any(path, &patterns), "{path}");
        }
    }

    #[rstest]
    #[case("rules", "rules/**", true)]
    #[case("rules/sub", "rules/**", true)]
    #[case("prompts", "rules/**", false)]
    #[case("anything/at/all", "**/*.mdc", true)]
    #[case("rules", "rules/*.mdc", true)]
    #[case("rules/sub", "rules/*.mdc", false)]
    #[case("rules", "mcp.json", false)]
    #[case("a", "*/config.json", true)]
    #[case("", "mcp.json", true)]
    fn test_could_contain_match(#[case] dir: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(could_contain_match(dir, pattern), expected);
    }

    #[test]
    fn test_descent_never_misses_a_match() {
        let patterns = ["rules/**", "prompts/*/x.md", "**/*.json", "a?c/d.txt"];
        let files = [
            "rules/a/b/c.mdc",
            "prompts/team/x.md",
            "deep/er/mcp.json",
            "abc/d.txt",
        ];
        for file in files {
            let set = PatternSet::new(&patterns).unwrap();
            assert!(set.is_match(file), "{file}");
            let segments: Vec<&str> = file.split('/').collect();
            for depth in 1..segments.len() {
                let dir = segments[..depth].join("/");
                assert!(set.could_contain_match(&dir), "{dir} for {file}");
            }
        }
    }
}
