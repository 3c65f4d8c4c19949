use std::collections::HashMap;

use super::{WML_NS, wml, wml_attr};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberingRef {
    pub num_id: String,
    pub level: u8,
}

/// Effective paragraph-style properties after `basedOn` inheritance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub id: String,
    pub name: Option<String>,
    /// Raw `w:outlineLvl` (0-based; 9 means body text).
    pub outline_level: Option<u8>,
    /// `None` when unset anywhere in the chain; `Some(None)` when a style
    /// explicitly removes numbering with `numId` 0.
    pub numbering: Option<Option<NumberingRef>>,
    pub based_on: Option<String>,
}

impl ResolvedStyle {
    pub fn numbering(&self) -> Option<&NumberingRef> {
        self.numbering.as_ref().and_then(Option::as_ref)
    }
}

/// Style lookup consumed by the classifier. The core never walks the style
/// hierarchy itself; implementations hand back fully-resolved styles.
pub trait StyleResolver: Sync {
    fn resolve(&self, style_id: &str) -> Option<&ResolvedStyle>;

    /// Style applied to paragraphs without a `w:pStyle`.
    fn default_paragraph_style(&self) -> Option<&ResolvedStyle>;
}

#[derive(Debug, Default)]
pub struct StyleSheet {
    paragraph_styles: HashMap<String, ResolvedStyle>,
    default_paragraph: Option<String>,
}

impl StyleResolver for StyleSheet {
    fn resolve(&self, style_id: &str) -> Option<&ResolvedStyle> {
        self.paragraph_styles.get(style_id)
    }

    fn default_paragraph_style(&self) -> Option<&ResolvedStyle> {
        self.default_paragraph
            .as_deref()
            .and_then(|id| self.paragraph_styles.get(id))
    }
}

pub(super) fn parse_num_pr(num_pr: roxmltree::Node) -> Option<Option<NumberingRef>> {
    let num_id = wml_attr(num_pr, "numId")?;
    if num_id == "0" {
        return Some(None);
    }
    let level = wml_attr(num_pr, "ilvl")
        .and_then(|v| v.parse::<u8>().ok())
        .unwrap_or(0)
        .min(8);
    Some(Some(NumberingRef {
        num_id: num_id.to_string(),
        level,
    }))
}

pub(super) fn parse_outline_level(ppr: roxmltree::Node) -> Option<u8> {
    wml_attr(ppr, "outlineLvl").and_then(|v| v.parse::<u8>().ok())
}

impl StyleSheet {
    pub fn parse(xml_content: &str) -> Self {
        let mut sheet = StyleSheet::default();
        let Ok(xml) = roxmltree::Document::parse(xml_content) else {
            log::warn!("Unreadable styles part, classifying every paragraph as body text");
            return sheet;
        };

        for style_node in xml.root_element().children() {
            if style_node.tag_name().name() != "style"
                || style_node.tag_name().namespace() != Some(WML_NS)
            {
                continue;
            }
            if style_node.attribute((WML_NS, "type")) != Some("paragraph") {
                continue;
            }
            let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
                continue;
            };

            let is_default = style_node
                .attribute((WML_NS, "default"))
                .is_some_and(|v| v == "1" || v == "true");
            if is_default && sheet.default_paragraph.is_none() {
                sheet.default_paragraph = Some(style_id.to_string());
            }

            let ppr = wml(style_node, "pPr");
            let name = wml_attr(style_node, "name").map(|s| s.to_string());
            let outline_level = ppr.and_then(parse_outline_level);
            let numbering = ppr
                .and_then(|ppr| wml(ppr, "numPr"))
                .and_then(parse_num_pr);
            let based_on = wml_attr(style_node, "basedOn").map(|s| s.to_string());

            sheet.paragraph_styles.insert(
                style_id.to_string(),
                ResolvedStyle {
                    id: style_id.to_string(),
                    name,
                    outline_level,
                    numbering,
                    based_on,
                },
            );
        }

        resolve_based_on(&mut sheet.paragraph_styles);
        sheet
    }
}

fn resolve_based_on(styles: &mut HashMap<String, ResolvedStyle>) {
    let mut ids: Vec<String> = styles.keys().cloned().collect();
    ids.sort();
    for id in ids {
        let mut chain: Vec<String> = Vec::new();
        let mut current = id.clone();
        loop {
            if chain.contains(&current) {
                break;
            }
            chain.push(current.clone());
            match styles.get(&current).and_then(|s| s.based_on.clone()) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        // Walk ancestors from furthest to closest; each closer one overrides.
        let mut outline_level = None;
        let mut numbering = None;
        for ancestor_id in chain.iter().rev() {
            if let Some(s) = styles.get(ancestor_id) {
                if s.outline_level.is_some() {
                    outline_level = s.outline_level;
                }
                if s.numbering.is_some() {
                    numbering = s.numbering.clone();
                }
            }
        }

        if let Some(s) = styles.get_mut(&id) {
            s.outline_level = outline_level;
            s.numbering = numbering;
        }
    }
}
