//! Markdown to HTML for assistant answers.
//!
//! Tables and fenced code are enabled, and single newlines inside a paragraph
//! become `<br />`, which is how chat-style answers are meant to read.

use pulldown_cmark::{html, Event, Options, Parser};

/// Render `markdown` to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
