//! Markdown → plain text for model replies.
//!
//! Models answer in markdown; the chat feed renders plain text. Formatting
//! markers, list leaders, link targets and raw HTML are dropped, block
//! boundaries become line breaks.

use pulldown_cmark::{Event, Options, Parser, TagEnd};

#[must_use]
pub fn strip_markdown(input: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let mut out = String::with_capacity(input.len());
    for event in Parser::new_ext(input, options) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_)) => out.push_str("\n\n"),
            Event::End(TagEnd::Item | TagEnd::CodeBlock | TagEnd::TableHead | TagEnd::TableRow) | Event::Rule => {
                out.push('\n');
            }
            Event::End(TagEnd::TableCell) => out.push(' '),
            _ => {}
        }
    }

    collapse_blank_lines(&out)
}

/// Trim trailing spaces per line and keep at most one blank line in a row.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

#[cfg(test)]
#[path = "markdown_test.rs"]
mod tests;
