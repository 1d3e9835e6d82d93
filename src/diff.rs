//! Line diff rendering for changed captured content
//!
//! Produces two renderings of the same edit script: a plain one for logs and
//! text mail bodies, and an HTML one for rich transports. Line endings are
//! part of each line, so a file that only gains or loses its final newline,
//! or switches between LF and CRLF, still shows up as changed lines.

use similar::{ChangeTag, TextDiff};

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub tag: ChangeTag,
    /// Line text including its terminator, if it had one
    pub text: String,
}

impl DiffLine {
    /// Line text without its terminator
    pub fn content(&self) -> &str {
        let text = self.text.strip_suffix('\n').unwrap_or(&self.text);
        text.strip_suffix('\r').unwrap_or(text)
    }

    pub fn missing_newline(&self) -> bool {
        !self.text.ends_with('\n')
    }
}

/// Both renderings of one diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiff {
    pub plain: String,
    pub html: String,
}

pub fn render(old: &str, new: &str) -> RenderedDiff {
    let lines = diff_lines(old, new);
    RenderedDiff {
        plain: render_plain(&lines),
        html: render_html(&lines),
    }
}

/// Edit script turning `old` into `new`, line by line
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .map(|change| DiffLine {
            tag: change.tag(),
            text: change.value().to_string(),
        })
        .collect()
}

pub fn render_plain(lines: &[DiffLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(match line.tag {
            ChangeTag::Equal => "  ",
            ChangeTag::Delete => "- ",
            ChangeTag::Insert => "+ ",
        });
        out.push_str(&line.text);
        if line.missing_newline() {
            out.push('\n');
            out.push_str(NO_NEWLINE_MARKER);
            out.push('\n');
        }
    }
    out
}

pub fn render_html(lines: &[DiffLine]) -> String {
    let mut parts = Vec::with_capacity(lines.len());
    for line in lines {
        let text = escape_html(line.content());
        parts.push(match line.tag {
            ChangeTag::Equal => format!("<span>{}</span>", text),
            ChangeTag::Delete => format!("<del style=\"background:#ffe6e6;\">{}</del>", text),
            ChangeTag::Insert => format!("<ins style=\"background:#e6ffe6;\">{}</ins>", text),
        });
        if line.missing_newline() {
            parts.push(format!("<span>{}</span>", NO_NEWLINE_MARKER));
        }
    }
    parts.join("<br>")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
