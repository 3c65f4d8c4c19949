use crate::model::{Diagnostic, DiagnosticKind, PictureItem, Provenance};

use super::anchor::{self, Segment};
use super::classify::{DirectProperties, ParagraphRole, classify};
use super::styles::NumberingRef;
use super::table::{self, TableFragment};
use super::{Context, WML_NS, collect_block_nodes};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum FragmentRole {
    Paragraph,
    Title,
    Caption,
    Footnote,
    ListItem(NumberingRef),
}

impl FragmentRole {
    /// Role for text that follows an object inside the same paragraph. Only
    /// the first piece of a list item carries the marker.
    fn continuation(&self) -> FragmentRole {
        match self {
            FragmentRole::ListItem(_) => FragmentRole::Paragraph,
            other => other.clone(),
        }
    }
}

/// A node-to-be, produced by per-block extraction and turned into a tree
/// node (with id and parent) by the assembler.
#[derive(Debug)]
pub(crate) enum Fragment {
    Text {
        text: String,
        role: FragmentRole,
        provenance: Provenance,
    },
    Header {
        text: String,
        level: u8,
        provenance: Provenance,
    },
    Picture {
        picture: PictureItem,
        provenance: Provenance,
    },
    Table {
        table: TableFragment,
        provenance: Provenance,
    },
}

impl Fragment {
    /// Re-tag text for footnote bodies; headings there are plain footnote text.
    pub(crate) fn into_footnote(self) -> Fragment {
        match self {
            Fragment::Text {
                text, provenance, ..
            }
            | Fragment::Header {
                text, provenance, ..
            } => Fragment::Text {
                text,
                role: FragmentRole::Footnote,
                provenance,
            },
            other => other,
        }
    }
}

pub(crate) struct BlockExtract {
    pub(crate) fragments: Vec<Fragment>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

/// Extract one top-level block. Self-contained so blocks can run in any
/// order; the assembler restores document order.
pub(crate) fn extract_block(node: roxmltree::Node, ctx: &Context) -> BlockExtract {
    let mut fragments = Vec::new();
    let mut diagnostics = Vec::new();
    extract_into(node, ctx, 0, &mut diagnostics, &mut fragments);
    BlockExtract {
        fragments,
        diagnostics,
    }
}

/// Extract every block child of `parent` (table cell, text box, footnote).
pub(crate) fn extract_blocks(
    parent: roxmltree::Node,
    ctx: &Context,
    depth: usize,
    diags: &mut Vec<Diagnostic>,
) -> Vec<Fragment> {
    let mut out = Vec::new();
    if depth > ctx.options.max_nesting_depth {
        diags.push(ctx.diagnostic(
            DiagnosticKind::NestingTooDeep,
            parent,
            format!("content nested deeper than {} levels skipped", ctx.options.max_nesting_depth),
        ));
        return out;
    }
    for node in collect_block_nodes(parent) {
        extract_into(node, ctx, depth, diags, &mut out);
    }
    out
}

fn extract_into(
    node: roxmltree::Node,
    ctx: &Context,
    depth: usize,
    diags: &mut Vec<Diagnostic>,
    out: &mut Vec<Fragment>,
) {
    if node.tag_name().namespace() != Some(WML_NS) {
        return;
    }
    match node.tag_name().name() {
        "p" => paragraph(node, ctx, depth, diags, out),
        "tbl" => {
            let table = table::build_table(node, ctx, depth, diags);
            out.push(Fragment::Table {
                table,
                provenance: Provenance::of(ctx.part, node),
            });
        }
        "altChunk" => diags.push(ctx.diagnostic(
            DiagnosticKind::UnsupportedObject,
            node,
            "imported alternative-format chunk skipped",
        )),
        _ => {}
    }
}

fn paragraph(
    node: roxmltree::Node,
    ctx: &Context,
    depth: usize,
    diags: &mut Vec<Diagnostic>,
    out: &mut Vec<Fragment>,
) {
    let direct = DirectProperties::of(node);
    if let Some(id) = direct.style_id
        && ctx.styles.resolve(id).is_none()
    {
        diags.push(ctx.diagnostic(
            DiagnosticKind::UnknownStyle,
            node,
            format!("style '{id}' is not defined"),
        ));
    }
    let role = classify(&direct, ctx.styles);
    let segments = anchor::resolve_paragraph(node, ctx, depth, diags);
    let provenance = Provenance::of(ctx.part, node);

    if let ParagraphRole::Heading(level) = role {
        let mut text = String::new();
        let mut objects = Vec::new();
        for segment in segments {
            match segment {
                Segment::Text(t) => text.push_str(&t),
                Segment::Objects(fragments) => objects.extend(fragments),
            }
        }
        let text = text.trim();
        if !text.is_empty() {
            out.push(Fragment::Header {
                text: text.to_string(),
                level,
                provenance,
            });
        }
        out.extend(objects);
        return;
    }

    let mut role = match role {
        ParagraphRole::Title => FragmentRole::Title,
        ParagraphRole::Caption => FragmentRole::Caption,
        ParagraphRole::Footnote => FragmentRole::Footnote,
        ParagraphRole::ListItem(n) => FragmentRole::ListItem(n),
        ParagraphRole::Body | ParagraphRole::Heading(_) => FragmentRole::Paragraph,
    };
    for segment in segments {
        match segment {
            Segment::Text(t) => {
                let t = t.trim();
                if t.is_empty() {
                    continue;
                }
                let next_role = role.continuation();
                out.push(Fragment::Text {
                    text: t.to_string(),
                    role: std::mem::replace(&mut role, next_role),
                    provenance: provenance.clone(),
                });
            }
            Segment::Objects(fragments) => out.extend(fragments),
        }
    }
}
