mod anchor;
mod assemble;
mod blocks;
mod classify;
mod footnotes;
mod numbering;
mod styles;
mod table;

use std::time::Instant;

use crate::ConvertOptions;
use crate::error::Error;
use crate::model::{Conversion, Diagnostic, DiagnosticKind, DocumentTree, Provenance};
use crate::package::{Package, Relationships};

use assemble::Assembler;
use blocks::BlockExtract;

pub use classify::{DirectProperties, ParagraphRole, classify};
pub use numbering::Numbering;
pub use styles::{NumberingRef, ResolvedStyle, StyleResolver, StyleSheet};

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const WPD_NS: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub(crate) const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
pub(crate) const WPS_NS: &str = "http://schemas.microsoft.com/office/word/2010/wordprocessingShape";
pub(crate) const WPG_NS: &str = "http://schemas.microsoft.com/office/word/2010/wordprocessingGroup";
pub(crate) const WPC_NS: &str =
    "http://schemas.microsoft.com/office/word/2010/wordprocessingCanvas";
pub(crate) const MC_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
pub(crate) const VML_NS: &str = "urn:schemas-microsoft-com:vml";
pub(crate) const MATH_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

pub(crate) fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

pub(crate) fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

pub(crate) fn is_elem(node: roxmltree::Node, ns: &str, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(ns)
}

pub(crate) fn child_ns<'a>(
    node: roxmltree::Node<'a, 'a>,
    ns: &str,
    name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| is_elem(*n, ns, name))
}

/// Flatten wrappers around block content: content controls, custom XML and
/// markup-compatibility blocks are transparent to reading order.
pub(crate) fn collect_block_nodes<'a>(parent: roxmltree::Node<'a, 'a>) -> Vec<roxmltree::Node<'a, 'a>> {
    let mut nodes = Vec::new();
    for child in parent.children().filter(|n| n.is_element()) {
        if is_elem(child, WML_NS, "sdt") {
            if let Some(content) = wml(child, "sdtContent") {
                nodes.extend(collect_block_nodes(content));
            }
        } else if is_elem(child, WML_NS, "customXml") {
            nodes.extend(collect_block_nodes(child));
        } else if is_elem(child, MC_NS, "AlternateContent") {
            let branch = child_ns(child, MC_NS, "Choice").or_else(|| child_ns(child, MC_NS, "Fallback"));
            if let Some(branch) = branch {
                nodes.extend(collect_block_nodes(branch));
            }
        } else {
            nodes.push(child);
        }
    }
    nodes
}

/// Everything extraction of one part needs. Read-only, so blocks can be
/// extracted independently of each other.
pub(crate) struct Context<'a> {
    pub(crate) package: &'a Package,
    pub(crate) part: &'a str,
    pub(crate) rels: &'a Relationships,
    pub(crate) styles: &'a dyn StyleResolver,
    pub(crate) options: &'a ConvertOptions,
}

impl Context<'_> {
    pub(crate) fn diagnostic(
        &self,
        kind: DiagnosticKind,
        node: roxmltree::Node,
        message: impl Into<String>,
    ) -> Diagnostic {
        let provenance = Provenance::of(self.part, node);
        let message = message.into();
        log::debug!(
            "{:?} at {}:{} <{}>: {}",
            kind,
            provenance.part,
            provenance.offset,
            provenance.element,
            message
        );
        Diagnostic {
            kind,
            message,
            provenance: Some(provenance),
        }
    }
}

fn unreadable(part: &str, diagnostics: &mut Vec<Diagnostic>) {
    log::warn!("Could not parse '{part}', ignoring it");
    diagnostics.push(Diagnostic {
        kind: DiagnosticKind::UnreadablePart,
        message: format!("could not parse {part}"),
        provenance: None,
    });
}

fn document_title(package: &Package) -> Option<String> {
    let part = package
        .relationships("")
        .target_of_type("/core-properties")
        .map(str::to_string)
        .unwrap_or_else(|| "docProps/core.xml".to_string());
    let text = package.part_text(&part)?;
    let xml = roxmltree::Document::parse(&text).ok()?;
    xml.descendants()
        .find(|n| is_elem(*n, DC_NS, "title"))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn extract_top_level(nodes: &[roxmltree::Node], ctx: &Context) -> Vec<BlockExtract> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        nodes
            .par_iter()
            .map(|node| blocks::extract_block(*node, ctx))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        nodes
            .iter()
            .map(|node| blocks::extract_block(*node, ctx))
            .collect()
    }
}

pub(crate) fn convert(
    package: &Package,
    fallback_name: &str,
    options: &ConvertOptions,
) -> Result<Conversion, Error> {
    let t0 = Instant::now();

    let main_part = package.main_document_part();
    let xml_content = package.part_text(&main_part).ok_or_else(|| {
        Error::InvalidDocx(format!("missing {main_part} (is this a DOCX file?)"))
    })?;
    let xml = roxmltree::Document::parse(&xml_content)?;
    let body = wml(xml.root_element(), "body").ok_or(Error::MissingBody)?;

    let mut diagnostics = Vec::new();
    let rels = package.relationships(&main_part);

    let styles_part = rels.target_of_type("/styles").unwrap_or("word/styles.xml");
    let styles = match package.part_text(styles_part) {
        Some(text) => {
            if roxmltree::Document::parse(&text).is_err() {
                unreadable(styles_part, &mut diagnostics);
            }
            StyleSheet::parse(&text)
        }
        None => StyleSheet::default(),
    };

    let numbering_part = rels
        .target_of_type("/numbering")
        .unwrap_or("word/numbering.xml");
    let numbering = match package.part_text(numbering_part) {
        Some(text) => {
            if roxmltree::Document::parse(&text).is_err() {
                unreadable(numbering_part, &mut diagnostics);
            }
            Numbering::parse(&text)
        }
        None => Numbering::default(),
    };

    let name = document_title(package).unwrap_or_else(|| fallback_name.to_string());
    let t_parse = t0.elapsed();

    let ctx = Context {
        package,
        part: &main_part,
        rels: &rels,
        styles: &styles,
        options,
    };

    let blocks = collect_block_nodes(body);
    let extracted = extract_top_level(&blocks, &ctx);

    let mut body_fragments = Vec::new();
    for block in extracted {
        body_fragments.extend(block.fragments);
        diagnostics.extend(block.diagnostics);
    }

    let footnote_fragments = if options.include_footnotes {
        footnotes::extract(body, &ctx, &mut diagnostics)
    } else {
        Vec::new()
    };
    let t_extract = t0.elapsed();

    let mut assembler = Assembler::new(&numbering);
    let mut children = assembler.assemble(body_fragments, None);
    children.extend(assembler.assemble(footnote_fragments, None));
    let document = DocumentTree { name, children };
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, extract={:.1}ms, assemble={:.1}ms, total={:.1}ms ({} blocks, {} nodes, {} diagnostics)",
        t_parse.as_secs_f64() * 1000.0,
        (t_extract - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_extract).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        blocks.len(),
        document.node_count(),
        diagnostics.len(),
    );

    Ok(Conversion {
        document,
        diagnostics,
    })
}
