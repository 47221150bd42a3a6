//! Shell-glob to regular-expression translation.
//!
//! Globs are used for policy arguments (matched against canonical entry
//! forms) and for check path patterns. The translation rules:
//!
//! | Glob        | Regex        |
//! |-------------|--------------|
//! | `*`         | `.*`         |
//! | `?`         | `.`          |
//! | `[abc]`     | `[abc]`      |
//! | `[!abc]`    | `[^abc]`     |
//! | `{a,b}`     | `(a\|b)`     |
//! | `\x`        | literal `x`  |
//!
//! Every other regex metacharacter is escaped. An unterminated `[` or `{`
//! is taken literally.

use regex::Regex;

use crate::{Error, Result};

/// Translate a glob into an unanchored regular-expression body.
///
/// # Examples
///
/// ```
/// use aclwarden_core::pattern::glob_to_regex;
///
/// assert_eq!(glob_to_regex("*:*:*"), ".*:.*:.*");
/// assert_eq!(glob_to_regex("ip:10.0.0.?:r"), r"ip:10\.0\.0\..:r");
/// assert_eq!(glob_to_regex("{world,ip}:*"), "(world|ip):.*");
/// ```
pub fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2);
    translate(&chars, &mut out);
    out
}

/// Compile a glob into a regex that must match the whole input.
pub fn compile_glob(glob: &str) -> Result<Regex> {
    anchored(glob, &glob_to_regex(glob))
}

/// Compile a raw regular expression, unescaped, that must match the
/// whole input.
pub fn compile_regex(raw: &str) -> Result<Regex> {
    anchored(raw, raw)
}

fn anchored(source: &str, body: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{body})$")).map_err(|e| Error::Pattern {
        pattern: source.to_string(),
        source: e,
    })
}

fn translate(chars: &[char], out: &mut String) {
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    push_literal(*next, out);
                    i += 1;
                } else {
                    push_literal('\\', out);
                }
            }
            '[' => match class_end(chars, i) {
                Some(end) => {
                    push_class(&chars[i + 1..end], out);
                    i = end;
                }
                None => push_literal('[', out),
            },
            '{' => match brace_end(chars, i) {
                Some(end) => {
                    push_braces(&chars[i + 1..end], out);
                    i = end;
                }
                None => push_literal('{', out),
            },
            c => push_literal(c, out),
        }
        i += 1;
    }
}

fn push_literal(c: char, out: &mut String) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// Index of the `]` closing the class opened at `start`.
///
/// A `]` directly after `[` or `[!` belongs to the class.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    (j..chars.len()).find(|&k| chars[k] == ']')
}

fn push_class(body: &[char], out: &mut String) {
    out.push('[');
    let body = match body.first() {
        Some('!') => {
            out.push('^');
            &body[1..]
        }
        Some('^') => {
            out.push_str(r"\^");
            &body[1..]
        }
        _ => body,
    };
    for &c in body {
        // `[`, `&&` and `~~` are set operators inside regex classes
        if matches!(c, '\\' | '[' | ']' | '&' | '~') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(']');
}

/// Index of the `}` matching the `{` at `start`, honouring nesting.
///
/// Bracket classes are skipped whole.
fn brace_end(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut j = start;
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 1,
            '[' => j = class_end(chars, j).unwrap_or(j),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

fn push_braces(body: &[char], out: &mut String) {
    let alternatives = split_top_level(body);
    if alternatives.len() < 2 {
        push_literal('{', out);
        translate(body, out);
        push_literal('}', out);
        return;
    }

    out.push('(');
    for (k, alt) in alternatives.iter().enumerate() {
        if k > 0 {
            out.push('|');
        }
        translate(alt, out);
    }
    out.push(')');
}

fn split_top_level(body: &[char]) -> Vec<&[char]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut from = 0;
    let mut j = 0;
    while j < body.len() {
        match body[j] {
            '\\' => j += 1,
            '[' => j = class_end(body, j).unwrap_or(j),
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[from..j]);
                from = j + 1;
            }
            _ => {}
        }
        j += 1;
    }
    parts.push(&body[from.min(body.len())..]);
    parts
}

// ============================================================================
// PathPattern
// ============================================================================

/// A compiled node-path pattern, from a glob or a raw regex.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile a glob path pattern.
    pub fn glob(pattern: &str) -> Result<Self> {
        Ok(Self {
            source: pattern.to_string(),
            regex: compile_glob(pattern)?,
        })
    }

    /// Compile a raw regex path pattern.
    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(Self {
            source: pattern.to_string(),
            regex: compile_regex(pattern)?,
        })
    }

    /// Compile as a regex when `raw` is set, otherwise as a glob.
    pub fn new(pattern: &str, raw: bool) -> Result<Self> {
        if raw {
            Self::regex(pattern)
        } else {
            Self::glob(pattern)
        }
    }

    /// Whether the whole path matches.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_star_star_star() {
        assert_eq!(glob_to_regex("*:*:*"), ".*:.*:.*");
        assert!(compile_glob("*:*:*").unwrap().is_match("world:anyone:r"));
    }

    #[test]
    fn test_question_mark() {
        let re = compile_glob("ip:10.0.0.?:r").unwrap();
        assert!(re.is_match("ip:10.0.0.7:r"));
        assert!(!re.is_match("ip:10.0.0.17:r"));
        assert!(!re.is_match("ip:10x0x0x7:r"));
    }

    #[test]
    fn test_class_and_negation() {
        assert_eq!(glob_to_regex("[abc]"), "[abc]");
        assert_eq!(glob_to_regex("[!abc]"), "[^abc]");

        let re = compile_glob("/node[!0-9]").unwrap();
        assert!(re.is_match("/nodex"));
        assert!(!re.is_match("/node5"));
    }

    #[test]
    fn test_class_leading_bracket_literal() {
        let re = compile_glob("[]a]").unwrap();
        assert!(re.is_match("]"));
        assert!(re.is_match("a"));
    }

    #[test]
    fn test_braces_become_alternation() {
        assert_eq!(glob_to_regex("{a,b}"), "(a|b)");
        let re = compile_glob("{world,ip}:*:r").unwrap();
        assert!(re.is_match("world:anyone:r"));
        assert!(re.is_match("ip:1.2.3.4:r"));
        assert!(!re.is_match("sasl:bob:r"));
    }

    #[test]
    fn test_nested_braces() {
        let re = compile_glob("/{app,svc{1,2}}/*").unwrap();
        assert!(re.is_match("/app/x"));
        assert!(re.is_match("/svc2/x"));
        assert!(!re.is_match("/svc3/x"));
    }

    #[test]
    fn test_class_inside_braces_stays_whole() {
        assert_eq!(glob_to_regex("{[a,b],c}"), "([a,b]|c)");
        let re = compile_glob("{[a,b],c}").unwrap();
        assert!(re.is_match("a"));
        assert!(re.is_match(","));
        assert!(re.is_match("c"));
        assert!(!re.is_match("[a"));

        assert_eq!(glob_to_regex("{a,[}]}"), "(a|[}])");
        assert!(compile_glob("{a,[}]}:*").unwrap().is_match("}:x"));
    }

    #[test]
    fn test_metacharacters_escaped() {
        let re = compile_glob("a.b+(c)|d$").unwrap();
        assert!(re.is_match("a.b+(c)|d$"));
        assert!(!re.is_match("axbb(c)|d$"));
    }

    #[test]
    fn test_unterminated_is_literal() {
        assert!(compile_glob("[abc").unwrap().is_match("[abc"));
        assert!(compile_glob("{a,b").unwrap().is_match("{a,b"));
    }

    #[test]
    fn test_backslash_escape() {
        let re = compile_glob(r"a\*b").unwrap();
        assert!(re.is_match("a*b"));
        assert!(!re.is_match("aXb"));
    }

    #[test]
    fn test_glob_is_anchored() {
        let re = compile_glob("/app").unwrap();
        assert!(re.is_match("/app"));
        assert!(!re.is_match("/app/child"));
        assert!(!re.is_match("/x/app"));
    }

    #[test]
    fn test_path_pattern_regex_unescaped() {
        let p = PathPattern::new("/app/.*", true).unwrap();
        assert!(p.is_match("/app/a/b"));
        assert!(!p.is_match("/app"));
        assert_eq!(p.as_str(), "/app/.*");
    }

    #[test]
    fn test_path_pattern_bad_regex() {
        let err = PathPattern::regex("/app/(").unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    proptest! {
        #[test]
        fn test_plain_text_matches_itself(s in "[a-zA-Z0-9:/._@+()$^|-]{0,24}") {
            let re = compile_glob(&s).unwrap();
            prop_assert!(re.is_match(&s));
        }

        #[test]
        fn test_star_suffix_matches_any_extension(prefix in "[a-z/]{0,8}", rest in "\\PC{0,8}") {
            let re = compile_glob(&format!("{prefix}*")).unwrap();
            let input = format!("{prefix}{rest}");
            prop_assert!(re.is_match(&input));
        }
    }
}
