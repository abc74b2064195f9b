//! Shell-style glob patterns compiled to regular expressions.
//!
//! Two flavours are supported:
//!
//! - [`GlobPattern::new`] follows `fnmatch` rules: `*` matches any run of
//!   characters including `/`. This is what record enumeration uses.
//! - [`GlobPattern::path_aware`] keeps `*` and `?` inside one path segment
//!   and uses `**` to cross segments. The archive tool uses it to expand
//!   patterns against the local filesystem.

use regex::Regex;

use crate::FsError;

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile an `fnmatch`-style pattern.
    ///
    /// Anchored patterns must match a whole name. Unanchored patterns match
    /// any suffix of a name that starts at a path-segment boundary, so
    /// `b.txt` matches `/a/b.txt` but not `/a/ab.txt`.
    pub fn new(pattern: &str, anchored: bool) -> Result<Self, FsError> {
        let body = translate(pattern, false);
        let full = if anchored {
            format!("^(?s:{body})$")
        } else {
            format!("(?:^|/)(?s:{body})$")
        };
        Self::compile(pattern, &full)
    }

    /// Compile a separator-aware pattern, anchored at both ends.
    pub fn path_aware(pattern: &str) -> Result<Self, FsError> {
        let full = format!("^(?s:{})$", translate(pattern, true));
        Self::compile(pattern, &full)
    }

    fn compile(pattern: &str, full: &str) -> Result<Self, FsError> {
        let regex = Regex::new(full).map_err(|_| FsError::InvalidPath {
            path: pattern.to_string(),
            reason: "malformed glob pattern",
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Test a name against the pattern.
    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Returns `true` if `s` contains glob metacharacters.
pub fn has_magic(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

fn translate(pattern: &str, separator_aware: bool) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let any = if separator_aware { "[^/]" } else { "." };
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if separator_aware && chars.get(i + 1) == Some(&'*') => {
                i += 2;
                if chars.get(i) == Some(&'/') {
                    // `**/` also matches zero directories
                    i += 1;
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
                continue;
            }
            '*' => {
                // collapse runs like `***`
                while chars.get(i + 1) == Some(&'*') && !separator_aware {
                    i += 1;
                }
                out.push_str(any);
                out.push('*');
            }
            '?' => out.push_str(any),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&translate_class(&chars[i + 1..end]));
                    i = end;
                }
                None => out.push_str("\\["),
            },
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }
    out
}

/// Index of the `]` closing the class opened at `start`, if any.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    // a `]` right after the opener is literal
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        if chars[j] == ']' {
            return Some(j);
        }
        j += 1;
    }
    None
}

fn translate_class(inner: &[char]) -> String {
    let mut out = String::from("[");
    let mut rest = inner;
    if let Some((&'!', tail)) = rest.split_first() {
        out.push('^');
        rest = tail;
    } else if let Some((&'^', tail)) = rest.split_first() {
        out.push_str("\\^");
        rest = tail;
    }
    for &c in rest {
        match c {
            '\\' | '[' | ']' | '&' | '~' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(']');
    out
}
