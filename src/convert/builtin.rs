use super::{ConvertError, ConvertRequest, Converter};
use crate::summary::extract_title;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};
use std::fs;

/// In-process markdown rendering, for sites without an external converter.
///
/// Leading `%` title-block lines are dropped from the body; the first one
/// becomes the page title. Per-file option text is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinConverter;

impl Converter for BuiltinConverter {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<(), ConvertError> {
        let text = fs::read_to_string(request.source)?;
        let fallback = request
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let title = extract_title(&text).unwrap_or(fallback);
        let page = render_page(&title, strip_title_block(&text));
        fs::write(request.target, page.into_string())?;
        Ok(())
    }
}

/// Everything after the leading `%` lines.
fn strip_title_block(text: &str) -> &str {
    let mut rest = text;
    while rest.starts_with('%') {
        rest = match rest.find('\n') {
            Some(i) => &rest[i + 1..],
            None => "",
        };
    }
    rest
}

fn render_page(title: &str, markdown: &str) -> Markup {
    let mut body_html = String::new();
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES);
    md_html::push_html(&mut body_html, parser);

    // The body starts on its own line after the content marker, which is
    // where description extraction begins.
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
            }
            body {
                h1.title { (title) }
                div id="content" {
                    "\n"
                    (PreEscaped(body_html))
                }
            }
        }
    }
}
