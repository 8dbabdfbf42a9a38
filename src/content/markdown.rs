//! Markdown body rendering.

use pulldown_cmark::{html, Options, Parser};

/// Render a Markdown body to HTML.
///
/// GFM extensions (tables, strikethrough, task lists) are enabled and
/// single newlines are NOT turned into hard breaks. The result is
/// trimmed of leading and trailing whitespace.
pub fn render(markdown: &str) -> String {
  let mut options = Options::empty();
  options.insert(Options::ENABLE_TABLES);
  options.insert(Options::ENABLE_STRIKETHROUGH);
  options.insert(Options::ENABLE_TASKLISTS);
  options.insert(Options::ENABLE_GFM);

  let parser = Parser::new_ext(markdown, options);
  let mut out = String::new();
  html::push_html(&mut out, parser);

  out.trim().to_string()
}
