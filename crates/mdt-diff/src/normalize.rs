//! Ignore-option normalization: canonical comparison keys per line.
//!
//! The keys produced here are used only for equality testing inside the
//! diff engine; the original line text is always preserved for display and
//! for reconstructing edit scripts.
//!
//! Options compose independently. The application order is fixed so the
//! combined effect is deterministic: comments are stripped first, then
//! whitespace runs are collapsed, then case is folded, then blank lines map
//! to the empty sentinel key.

use crate::ops::Line;

/// A normalized equality key for one line.
pub type ComparisonKey = String;

/// Ignore options applied before comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IgnoreOptions {
    /// Collapse runs of spaces and tabs to a single space and trim both ends.
    pub whitespace: bool,
    /// Fold to lowercase.
    pub case: bool,
    /// Map any all-whitespace line to the empty sentinel key, so consecutive
    /// blank lines compare equal.
    pub blank_lines: bool,
    /// Strip comments with the given syntax before hashing. `None` for
    /// unknown languages passes lines through unchanged.
    pub comments: Option<CommentSyntax>,
}

impl IgnoreOptions {
    /// Returns `true` if normalization would leave every line unchanged.
    pub fn is_noop(&self) -> bool {
        !self.whitespace && !self.case && !self.blank_lines && self.comments.is_none()
    }
}

/// Comment delimiters for one language family.
///
/// Block comments are stripped within a single line; an unterminated block
/// start strips to the end of the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommentSyntax {
    pub line_prefix: Option<&'static str>,
    pub block: Option<(&'static str, &'static str)>,
}

impl CommentSyntax {
    /// Look up the comment syntax for a file extension.
    ///
    /// The table is fixed: C-family (`//` and `/* */`), hash-prefixed
    /// scripting and config languages (`#`), SQL/Lua (`--`), and markup
    /// (`<!-- -->`). Unknown extensions return `None`.
    pub fn for_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        match ext.as_str() {
            "rs" | "c" | "h" | "cpp" | "hpp" | "cc" | "js" | "ts" | "java" | "go" => Some(Self {
                line_prefix: Some("//"),
                block: Some(("/*", "*/")),
            }),
            "py" | "sh" | "rb" | "yaml" | "yml" | "toml" => Some(Self {
                line_prefix: Some("#"),
                block: None,
            }),
            "sql" | "lua" => Some(Self {
                line_prefix: Some("--"),
                block: None,
            }),
            "html" | "xml" => Some(Self {
                line_prefix: None,
                block: Some(("<!--", "-->")),
            }),
            _ => None,
        }
    }

    fn strip(&self, line: &str) -> String {
        let mut out = line.to_string();
        if let Some((open, close)) = self.block {
            loop {
                let Some(start) = out.find(open) else { break };
                match out[start + open.len()..].find(close) {
                    Some(rel) => {
                        let end = start + open.len() + rel + close.len();
                        out.replace_range(start..end, "");
                    }
                    None => {
                        out.truncate(start);
                        break;
                    }
                }
            }
        }
        if let Some(prefix) = self.line_prefix {
            if let Some(pos) = out.find(prefix) {
                out.truncate(pos);
            }
        }
        out
    }
}

/// Produce the comparison key for one line under the given options.
pub fn normalize(line: &str, options: &IgnoreOptions) -> ComparisonKey {
    if options.is_noop() {
        return line.to_string();
    }
    let mut key = match &options.comments {
        Some(syntax) => syntax.strip(line),
        None => line.to_string(),
    };
    if options.whitespace {
        key = collapse_whitespace(&key);
    }
    if options.case {
        key = key.to_lowercase();
    }
    if options.blank_lines && key.chars().all(char::is_whitespace) {
        key.clear();
    }
    key
}

/// Comparison keys for a whole sequence of lines.
///
/// The line terminator is folded into the key, so a final line without a
/// trailing newline never compares equal to its terminated counterpart.
pub fn keys_for(lines: &[Line<'_>], options: &IgnoreOptions) -> Vec<ComparisonKey> {
    lines
        .iter()
        .map(|line| {
            let mut key = normalize(line.text, options);
            if line.has_newline {
                key.push('\n');
            }
            key
        })
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if c == ' ' || c == '\t' {
            in_run = true;
        } else {
            if in_run && !out.is_empty() {
                out.push(' ');
            }
            in_run = false;
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_options_keep_line_verbatim() {
        let opts = IgnoreOptions::default();
        assert_eq!(normalize("  a \tB ", &opts), "  a \tB ");
    }

    #[test]
    fn whitespace_collapse_equates_spacing_variants() {
        let opts = IgnoreOptions { whitespace: true, ..Default::default() };
        assert_eq!(normalize("a b", &opts), normalize("a  b", &opts));
        assert_eq!(normalize("  a\t\tb  ", &opts), "a b");
    }

    #[test]
    fn case_folding() {
        let opts = IgnoreOptions { case: true, ..Default::default() };
        assert_eq!(normalize("Hello World", &opts), "hello world");
    }

    #[test]
    fn blank_lines_map_to_sentinel() {
        let opts = IgnoreOptions { blank_lines: true, ..Default::default() };
        assert_eq!(normalize("   \t ", &opts), "");
        assert_eq!(normalize("", &opts), "");
        assert_eq!(normalize(" x ", &opts), " x ");
    }

    #[test]
    fn line_comment_stripping() {
        let opts = IgnoreOptions {
            comments: CommentSyntax::for_extension("rs"),
            ..Default::default()
        };
        assert_eq!(normalize("let x = 1; // init", &opts), "let x = 1; ");
    }

    #[test]
    fn block_comment_stripping() {
        let syntax = CommentSyntax::for_extension("c").unwrap();
        assert_eq!(syntax.strip("a /* one */ b /* two */ c"), "a  b  c");
        // Unterminated block strips to end of line.
        assert_eq!(syntax.strip("a /* open"), "a ");
    }

    #[test]
    fn unknown_extension_passes_through() {
        assert_eq!(CommentSyntax::for_extension("txt"), None);
    }

    #[test]
    fn missing_final_terminator_changes_the_key() {
        use crate::ops::split_lines;
        let opts = IgnoreOptions::default();
        let terminated = keys_for(&split_lines("a\n"), &opts);
        let unterminated = keys_for(&split_lines("a"), &opts);
        assert_ne!(terminated, unterminated);
        // Non-final lines are always terminated and keep matching.
        let long = keys_for(&split_lines("a\nb\n"), &opts);
        assert_eq!(long[0], terminated[0]);
    }

    #[test]
    fn options_compose_in_documented_order() {
        let opts = IgnoreOptions {
            whitespace: true,
            case: true,
            blank_lines: true,
            comments: CommentSyntax::for_extension("py"),
        };
        // Comment stripped first leaves only whitespace, which the blank
        // line sentinel then maps to the empty key.
        assert_eq!(normalize("   # just a comment", &opts), "");
        assert_eq!(normalize("X  = 1  # set", &opts), "x = 1");
    }
}
