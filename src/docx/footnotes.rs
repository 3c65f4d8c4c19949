use std::collections::HashSet;

use crate::model::Diagnostic;

use super::blocks::{self, Fragment};
use super::{Context, WML_NS, is_elem, unreadable};

/// Footnote bodies for every footnote the document references, in order of
/// first reference. Separator and continuation notes are never referenced
/// and so never appear.
pub(crate) fn extract(
    body: roxmltree::Node,
    ctx: &Context,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Fragment> {
    let mut seen = HashSet::new();
    let referenced: Vec<&str> = body
        .descendants()
        .filter(|n| is_elem(*n, WML_NS, "footnoteReference"))
        .filter_map(|n| n.attribute((WML_NS, "id")))
        .filter(|id| seen.insert(*id))
        .collect();
    if referenced.is_empty() {
        return Vec::new();
    }

    let Some(part) = ctx.rels.target_of_type("/footnotes") else {
        log::debug!("{} footnote references but no footnotes part", referenced.len());
        return Vec::new();
    };
    let Some(text) = ctx.package.part_text(part) else {
        return Vec::new();
    };
    let xml = match roxmltree::Document::parse(&text) {
        Ok(xml) => xml,
        Err(_) => {
            unreadable(part, diagnostics);
            return Vec::new();
        }
    };

    let rels = ctx.package.relationships(part);
    let footnote_ctx = Context {
        package: ctx.package,
        part,
        rels: &rels,
        styles: ctx.styles,
        options: ctx.options,
    };

    let mut out = Vec::new();
    for id in referenced {
        let Some(note) = xml.root_element().children().find(|n| {
            is_elem(*n, WML_NS, "footnote") && n.attribute((WML_NS, "id")) == Some(id)
        }) else {
            log::debug!("Footnote {id} is referenced but not defined");
            continue;
        };
        let fragments = blocks::extract_blocks(note, &footnote_ctx, 0, diagnostics);
        out.extend(fragments.into_iter().map(Fragment::into_footnote));
    }
    out
}
