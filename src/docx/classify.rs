//! Paragraph style → semantic role.

use super::styles::{NumberingRef, ResolvedStyle, StyleResolver, parse_num_pr, parse_outline_level};
use super::{wml, wml_attr};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParagraphRole {
    Body,
    Title,
    Heading(u8),
    /// List item; nesting depth is `NumberingRef::level`.
    ListItem(NumberingRef),
    Caption,
    Footnote,
}

/// Properties set directly on a paragraph's `w:pPr`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectProperties<'a> {
    pub style_id: Option<&'a str>,
    pub outline_level: Option<u8>,
    pub numbering: Option<Option<NumberingRef>>,
}

impl<'a> DirectProperties<'a> {
    pub(crate) fn of(para: roxmltree::Node<'a, 'a>) -> Self {
        let Some(ppr) = wml(para, "pPr") else {
            return Self::default();
        };
        Self {
            style_id: wml_attr(ppr, "pStyle"),
            outline_level: parse_outline_level(ppr),
            numbering: wml(ppr, "numPr").and_then(parse_num_pr),
        }
    }
}

/// Classify a paragraph. Never fails: anything unrecognized is body text.
///
/// Precedence: direct outline level, heading/title style names, inherited
/// outline level, numbering, caption/footnote style names, body.
pub fn classify(direct: &DirectProperties, resolver: &dyn StyleResolver) -> ParagraphRole {
    let style = match direct.style_id {
        Some(id) => resolver.resolve(id),
        None => resolver.default_paragraph_style(),
    };

    if let Some(level) = direct.outline_level
        && level < 9
    {
        return ParagraphRole::Heading(level + 1);
    }
    // outlineLvl 9 on the paragraph itself pins it to body text
    let pinned_body = direct.outline_level.is_some();

    let names = style_names(direct, style);

    if !pinned_body {
        if let Some(level) = names.iter().find_map(|n| heading_level_from_name(n)) {
            return ParagraphRole::Heading(level);
        }
        if names.iter().any(|n| normalize(n) == "title") {
            return ParagraphRole::Title;
        }
        if let Some(level) = style.and_then(|s| s.outline_level)
            && level < 9
        {
            return ParagraphRole::Heading(level + 1);
        }
    }

    let numbering = match &direct.numbering {
        Some(explicit) => explicit.clone(),
        None => style.and_then(|s| s.numbering().cloned()),
    };
    if let Some(numbering) = numbering {
        return ParagraphRole::ListItem(numbering);
    }

    if names.iter().any(|n| normalize(n) == "caption") {
        return ParagraphRole::Caption;
    }
    if names.iter().any(|n| normalize(n) == "footnotetext") {
        return ParagraphRole::Footnote;
    }

    ParagraphRole::Body
}

fn style_names<'s>(direct: &'s DirectProperties, style: Option<&'s ResolvedStyle>) -> Vec<&'s str> {
    match style {
        Some(s) => s
            .name
            .as_deref()
            .into_iter()
            .chain(std::iter::once(s.id.as_str()))
            .collect(),
        // Undefined style: the id is all we have
        None => direct.style_id.into_iter().collect(),
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// "heading 1", "Heading1", "HEADING_3" → level. Built-in style names are
/// stored in English regardless of UI language, so this is locale-invariant
/// when applied to `w:name`.
fn heading_level_from_name(name: &str) -> Option<u8> {
    let normalized = normalize(name);
    let rest = normalized.strip_prefix("heading")?;
    match rest.as_bytes() {
        [d @ b'1'..=b'9'] => Some(d - b'0'),
        _ => None,
    }
}
