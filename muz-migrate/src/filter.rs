//! Glob-based skip rules for migration paths.
//!
//! Patterns are matched against paths relative to the migration root, using
//! `/` as the separator:
//!
//! - `test` or `/test/**` prunes the `test` directory and everything below it
//! - `/test/*` hides only direct children of `test`
//! - `**/*.bak` hides matching files in any directory
//! - `{tmp,scratch}/**` expands to one rule per alternative
//!
//! A leading `/` is stripped before matching. A `**` that shares a segment
//! with other characters behaves like `*`.

use glob::{MatchOptions, Pattern};

use crate::error::{MigrateResult, MigrationError};

/// `*` never crosses a `/`; `**` does.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// How a skip rule applies to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// The path is kept.
    None,
    /// The entry itself is hidden; a directory is still descended into.
    Entry,
    /// The directory and its whole subtree are pruned.
    Subtree,
}

#[derive(Debug, Clone)]
struct SkipRule {
    /// Pattern text with the leading `/` removed and braces expanded.
    text: String,
    /// Directory pattern when the rule has the form `<dir>/**`.
    subtree_root: Option<Pattern>,
    pattern: Pattern,
}

/// A compiled set of skip patterns.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    rules: Vec<SkipRule>,
}

impl PathFilter {
    /// Compile a list of skip patterns.
    ///
    /// Fails with a configuration error on the first malformed glob.
    pub fn new<I, S>(patterns: I) -> MigrateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for raw in patterns {
            let raw = raw.as_ref();
            let trimmed = raw.strip_prefix('/').unwrap_or(raw);
            for text in expand_braces(trimmed) {
                let text = collapse_partial_globstars(&text);
                let compile = |p: &str| {
                    Pattern::new(p).map_err(|e| {
                        MigrationError::config(format!("invalid skip pattern '{}': {}", raw, e))
                    })
                };
                let pattern = compile(&text)?;
                let subtree_root = match text.strip_suffix("/**") {
                    Some(stem) => Some(compile(stem)?),
                    None => None,
                };
                rules.push(SkipRule {
                    text,
                    subtree_root,
                    pattern,
                });
            }
        }
        Ok(Self { rules })
    }

    /// Check if no patterns are configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over the normalized pattern texts.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.text.as_str())
    }

    /// Check whether a directory and its subtree must not be walked at all.
    pub fn prunes(&self, dir: &str) -> bool {
        self.rules.iter().any(|rule| {
            if rule.text == dir {
                return true;
            }
            match &rule.subtree_root {
                Some(root) => {
                    ancestors_or_self(dir).any(|p| root.matches_with(p, MATCH_OPTIONS))
                }
                None => false,
            }
        })
    }

    /// Check whether a single entry matches any pattern.
    pub fn excludes(&self, path: &str) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.pattern.matches_with(path, MATCH_OPTIONS))
    }

    /// Classify a directory path.
    pub fn check_dir(&self, dir: &str) -> Exclusion {
        if self.prunes(dir) {
            Exclusion::Subtree
        } else if self.excludes(dir) {
            Exclusion::Entry
        } else {
            Exclusion::None
        }
    }
}

/// `a/b/c` yields `a`, `a/b`, `a/b/c`.
fn ancestors_or_self(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/')
        .map(move |(i, _)| &path[..i])
        .chain(std::iter::once(path))
}

/// Expand `{a,b}` alternation into one pattern per alternative.
///
/// Groups may nest. An unbalanced `{` is kept as a literal.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        let i = open + i;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    let mut expanded = Vec::new();
    for pair in bounds.windows(2) {
        let alternative = &pattern[pair[0] + 1..pair[1]];
        for tail in expand_braces(&format!("{alternative}{suffix}")) {
            expanded.push(format!("{prefix}{tail}"));
        }
    }
    expanded
}

/// Rewrite segments such as `tm**` to `tm*`; `**` alone stays recursive.
fn collapse_partial_globstars(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| {
            if segment == "**" || !segment.contains("**") {
                return segment.to_string();
            }
            let mut out = String::with_capacity(segment.len());
            for c in segment.chars() {
                if c == '*' && out.ends_with('*') {
                    continue;
                }
                out.push(c);
            }
            out
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(patterns: &[&str]) -> PathFilter {
        PathFilter::new(patterns.iter().copied()).unwrap()
    }

    #[test]
    fn test_exact_directory_prunes_subtree() {
        let f = filter(&["/skip_me"]);
        assert_eq!(f.check_dir("skip_me"), Exclusion::Subtree);
        assert_eq!(f.check_dir("skip_me_not"), Exclusion::None);
        assert_eq!(f.check_dir("keep"), Exclusion::None);
    }

    #[test]
    fn test_recursive_glob_prunes_descendants() {
        let f = filter(&["/test/**"]);
        assert_eq!(f.check_dir("test"), Exclusion::Subtree);
        assert_eq!(f.check_dir("test/child"), Exclusion::Subtree);
        assert_eq!(f.check_dir("tests"), Exclusion::None);
    }

    #[test]
    fn test_single_segment_glob_hides_direct_children() {
        let f = filter(&["/test/*"]);
        assert_eq!(f.check_dir("test"), Exclusion::None);
        assert_eq!(f.check_dir("test/child"), Exclusion::Entry);
        assert_eq!(f.check_dir("test/child/grandchild"), Exclusion::None);
        assert!(f.excludes("test/001_test.sql"));
    }

    #[test]
    fn test_file_globs() {
        let f = filter(&["**/*.bak"]);
        assert!(f.excludes("migrations/002_skip.bak"));
        assert!(f.excludes("a/b/c/003.bak"));
        assert!(f.excludes("002_skip.bak"));
        assert!(!f.excludes("migrations/001_keep.sql"));

        let root_only = filter(&["*.bak"]);
        assert!(root_only.excludes("002_skip.bak"));
        assert!(!root_only.excludes("migrations/002_skip.bak"));
    }

    #[test]
    fn test_specific_file_path() {
        let f = filter(&["/migrations/002_test_skip.sql"]);
        assert!(f.excludes("migrations/002_test_skip.sql"));
        assert!(!f.excludes("migrations/003_keep.sql"));
        assert!(!f.prunes("migrations"));
    }

    #[test]
    fn test_any_pattern_excludes() {
        let f = filter(&["/skip_dir/**", "**/*.bak"]);
        assert!(f.prunes("skip_dir"));
        assert!(f.excludes("keep/002_skip.bak"));
        assert_eq!(f.patterns().collect::<Vec<_>>(), vec!["skip_dir/**", "**/*.bak"]);
    }

    #[test]
    fn test_brace_alternatives_prune_each_subtree() {
        let f = filter(&["{tmp,scratch}/**"]);
        assert_eq!(f.check_dir("tmp"), Exclusion::Subtree);
        assert_eq!(f.check_dir("scratch"), Exclusion::Subtree);
        assert_eq!(f.check_dir("scratch/deep"), Exclusion::Subtree);
        assert_eq!(f.check_dir("x"), Exclusion::None);
        assert_eq!(f.patterns().collect::<Vec<_>>(), vec!["tmp/**", "scratch/**"]);
    }

    #[test]
    fn test_nested_braces_expand() {
        let f = filter(&["/{a,b{1,2}}/*.sql"]);
        assert_eq!(
            f.patterns().collect::<Vec<_>>(),
            vec!["a/*.sql", "b1/*.sql", "b2/*.sql"]
        );
        assert!(f.excludes("b2/001.sql"));
        assert!(!f.excludes("b/001.sql"));
    }

    #[test]
    fn test_unbalanced_brace_is_literal() {
        let f = filter(&["odd{dir"]);
        assert_eq!(f.check_dir("odd{dir"), Exclusion::Subtree);
        assert_eq!(f.check_dir("odddir"), Exclusion::None);
    }

    #[test]
    fn test_globstar_subtree_prunes_the_directory_itself() {
        let f = filter(&["**/drafts/**"]);
        assert_eq!(f.check_dir("drafts"), Exclusion::Subtree);
        assert_eq!(f.check_dir("x/drafts"), Exclusion::Subtree);
        assert_eq!(f.check_dir("x/drafts/old"), Exclusion::Subtree);
        assert_eq!(f.check_dir("x/drafts_v2"), Exclusion::None);
        assert_eq!(f.check_dir("x"), Exclusion::None);
    }

    #[test]
    fn test_globstar_inside_segment_acts_like_star() {
        let f = filter(&["tm**"]);
        assert_eq!(f.patterns().collect::<Vec<_>>(), vec!["tm*"]);
        assert_eq!(f.check_dir("tmp"), Exclusion::Entry);
        assert!(f.excludes("tm"));
        assert!(!f.excludes("tmp/001.sql"));
        assert!(!f.excludes("x/tmp"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = PathFilter::new(["[unclosed"]).unwrap_err();
        assert!(matches!(err, MigrationError::Config(_)));
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let f = PathFilter::default();
        assert!(f.is_empty());
        assert_eq!(f.check_dir("."), Exclusion::None);
        assert!(!f.excludes("001_init.sql"));
    }
}
