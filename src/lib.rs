pub mod docx;
mod error;
pub mod export;
pub mod model;
pub mod package;

pub use error::Error;
pub use export::ExportFormat;
pub use model::{Conversion, Diagnostic, DiagnosticKind, DocumentTree, Item, Node, NodeId};
pub use package::Package;

use std::path::Path;

/// Knobs for a single conversion.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Deepest recursion through cells and text boxes before content is
    /// skipped with a diagnostic.
    pub max_nesting_depth: usize,
    /// Append referenced footnote bodies after the main flow.
    pub include_footnotes: bool,
    /// Sniff MIME type and pixel size of embedded images.
    pub image_metadata: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: 16,
            include_footnotes: true,
            image_metadata: true,
        }
    }
}

pub fn convert_docx(input: &Path) -> Result<Conversion, Error> {
    convert_docx_with(input, &ConvertOptions::default())
}

pub fn convert_docx_with(input: &Path, options: &ConvertOptions) -> Result<Conversion, Error> {
    let package = Package::open(input)?;
    let name = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    docx::convert(&package, &name, options)
}

pub fn convert_docx_bytes(input: &[u8], options: &ConvertOptions) -> Result<Conversion, Error> {
    let package = Package::from_bytes(input)?;
    docx::convert(&package, "document", options)
}

/// Convert an already-unpacked package. `name` is used when the package
/// carries no title of its own.
pub fn convert_package(
    package: &Package,
    name: &str,
    options: &ConvertOptions,
) -> Result<Conversion, Error> {
    docx::convert(package, name, options)
}
