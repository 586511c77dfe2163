//! Triage summary document rendering
//!
//! Produces the plain-text record kept in the session directory once an encounter
//! finishes.

use crate::error::Result;
use std::path::Path;

pub const DOCUMENT_TITLE: &str = "Triage Record";

/// Maximum characters per rendered line
pub const LINE_WIDTH: usize = 100;

/// Lines shorter than this never break on a space; they are cut hard instead
const MIN_BREAK_COLUMN: usize = 10;

/// Wrap one paragraph, preferring to break at the last space that fits
///
/// Widths are counted in characters; a width of zero is treated as one.
pub fn wrap_paragraph(paragraph: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut rest: &str = paragraph;

    while !rest.is_empty() {
        if rest.chars().count() <= width {
            lines.push(rest.to_string());
            break;
        }

        let cut = rest
            .char_indices()
            .nth(width)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let chunk = &rest[..cut];
        // rfind yields a byte offset; the column rule is in characters
        let end = match chunk.rfind(' ') {
            Some(space) if chunk[..space].chars().count() > MIN_BREAK_COLUMN => space,
            _ => cut,
        };

        lines.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }

    lines
}

/// Render a summary into the document body
pub fn render_summary(session_id: &str, generated_at: &str, summary: &str) -> String {
    let mut out = String::new();
    out.push_str(DOCUMENT_TITLE);
    out.push('\n');
    out.push_str(&"=".repeat(DOCUMENT_TITLE.len()));
    out.push_str("\n\n");
    out.push_str(&format!("Session: {}\n", session_id));
    out.push_str(&format!("Generated: {}\n\n", generated_at));

    for paragraph in summary.lines() {
        if paragraph.trim().is_empty() {
            out.push('\n');
            continue;
        }
        for line in wrap_paragraph(paragraph, LINE_WIDTH) {
            out.push_str(&line);
            out.push('\n');
        }
    }

    out
}

/// Render and write the summary document
pub fn write_summary<P: AsRef<Path>>(
    path: P,
    session_id: &str,
    generated_at: &str,
    summary: &str,
) -> Result<()> {
    std::fs::write(path, render_summary(session_id, generated_at, summary))?;
    Ok(())
}
