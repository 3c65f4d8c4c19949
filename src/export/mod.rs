//! Serializers for a finished [`DocumentTree`]. All of them are pure
//! functions of the tree, so the same tree always exports to the same bytes.

mod html;
mod markdown;
mod text;

pub use html::{escape_html, to_html};
pub use markdown::to_markdown;
pub use text::to_indented_text;

use crate::error::Error;
use crate::model::DocumentTree;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ExportFormat {
    #[default]
    Markdown,
    Html,
    Text,
    Json,
}

pub fn to_json(doc: &DocumentTree) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Render `doc` in `format`. `max_text_len` only applies to the indented
/// text format.
pub fn export(doc: &DocumentTree, format: ExportFormat, max_text_len: usize) -> Result<String, Error> {
    match format {
        ExportFormat::Markdown => Ok(to_markdown(doc)),
        ExportFormat::Html => Ok(to_html(doc)),
        ExportFormat::Text => Ok(to_indented_text(doc, max_text_len)),
        ExportFormat::Json => to_json(doc),
    }
}
