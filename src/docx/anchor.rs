//! Floating-object resolution inside a paragraph.
//!
//! A paragraph's run content is scanned in declaration order. Text
//! accumulates until a drawing, VML shape or text box is met; the object is
//! then resolved into fragments of its own and the text on either side
//! becomes separate segments. Objects the scan does not understand are
//! dropped with a diagnostic rather than failing the paragraph.

use std::io::Cursor;

use crate::model::{
    Anchor, AnchorKind, AnchorPosition, Diagnostic, DiagnosticKind, ImageRef, PictureItem,
    Provenance, WrapMode,
};
use crate::package::REL_NS;

use super::blocks::{self, Fragment};
use super::{
    Context, DML_NS, MATH_NS, MC_NS, PIC_NS, VML_NS, WML_NS, WPC_NS, WPD_NS, WPG_NS, WPS_NS,
    child_ns, is_elem, wml,
};

const EMU_PER_POINT: f64 = 12700.0;

pub(crate) enum Segment {
    Text(String),
    Objects(Vec<Fragment>),
}

pub(crate) fn resolve_paragraph(
    para: roxmltree::Node,
    ctx: &Context,
    depth: usize,
    diags: &mut Vec<Diagnostic>,
) -> Vec<Segment> {
    let mut scan = Scan {
        ctx,
        depth,
        diags,
        segments: Vec::new(),
        pending: String::new(),
        fields: Vec::new(),
    };
    scan.container(para);
    scan.flush_text();
    scan.segments
}

struct Scan<'c, 'a> {
    ctx: &'c Context<'a>,
    depth: usize,
    diags: &'c mut Vec<Diagnostic>,
    segments: Vec<Segment>,
    pending: String,
    /// Complex-field nesting; `true` once the field's result part started.
    fields: Vec<bool>,
}

impl Scan<'_, '_> {
    fn visible(&self) -> bool {
        self.fields.iter().all(|in_result| *in_result)
    }

    fn flush_text(&mut self) {
        if !self.pending.is_empty() {
            self.segments
                .push(Segment::Text(std::mem::take(&mut self.pending)));
        }
    }

    fn push_objects(&mut self, fragments: Vec<Fragment>) {
        if fragments.is_empty() {
            return;
        }
        self.flush_text();
        self.segments.push(Segment::Objects(fragments));
    }

    fn produced(&self) -> (usize, usize) {
        (self.segments.len(), self.pending.len())
    }

    /// Paragraph-level content: runs and the inline wrappers around them.
    fn container(&mut self, parent: roxmltree::Node) {
        for child in parent.children().filter(|n| n.is_element()) {
            let ns = child.tag_name().namespace();
            match (ns, child.tag_name().name()) {
                (Some(WML_NS), "r") => self.run(child),
                (
                    Some(WML_NS),
                    "hyperlink" | "ins" | "smartTag" | "customXml" | "fldSimple" | "moveTo"
                    | "bdo" | "dir",
                ) => self.container(child),
                (Some(WML_NS), "sdt") => {
                    if let Some(content) = wml(child, "sdtContent") {
                        self.container(content);
                    }
                }
                (Some(WML_NS), "drawing") => self.drawing(child),
                (Some(MC_NS), "AlternateContent") => {
                    self.alternate_content(child, Self::container)
                }
                (Some(MATH_NS), "oMath" | "oMathPara") => self.math(child),
                _ => {}
            }
        }
    }

    fn run(&mut self, run: roxmltree::Node) {
        for child in run.children().filter(|n| n.is_element()) {
            let ns = child.tag_name().namespace();
            let name = child.tag_name().name();
            if ns == Some(WML_NS) && name == "fldChar" {
                match child.attribute((WML_NS, "fldCharType")) {
                    Some("begin") => self.fields.push(false),
                    Some("separate") => {
                        if let Some(last) = self.fields.last_mut() {
                            *last = true;
                        }
                    }
                    Some("end") => {
                        self.fields.pop();
                    }
                    _ => {}
                }
                continue;
            }
            if !self.visible() {
                continue;
            }
            match (ns, name) {
                (Some(WML_NS), "t") => {
                    if let Some(t) = child.text() {
                        self.pending.push_str(t);
                    }
                }
                (Some(WML_NS), "tab" | "ptab") => self.pending.push('\t'),
                (Some(WML_NS), "br") => match child.attribute((WML_NS, "type")) {
                    Some("page") | Some("column") => {}
                    _ => self.pending.push('\n'),
                },
                (Some(WML_NS), "cr") => self.pending.push('\n'),
                (Some(WML_NS), "noBreakHyphen") => self.pending.push('-'),
                (Some(WML_NS), "drawing") => self.drawing(child),
                (Some(WML_NS), "pict") => self.vml(child),
                (Some(WML_NS), "object") => self.diags.push(self.ctx.diagnostic(
                    DiagnosticKind::UnsupportedObject,
                    child,
                    "embedded OLE object skipped",
                )),
                (Some(MC_NS), "AlternateContent") => self.alternate_content(child, Self::run),
                _ => {}
            }
        }
    }

    /// Take the first `mc:Choice` that yields something, else `mc:Fallback`.
    /// A branch that yields nothing leaves no diagnostics behind.
    fn alternate_content(&mut self, ac: roxmltree::Node, walk: fn(&mut Self, roxmltree::Node)) {
        let branches = ac
            .children()
            .filter(|n| is_elem(*n, MC_NS, "Choice"))
            .chain(ac.children().filter(|n| is_elem(*n, MC_NS, "Fallback")));
        for branch in branches {
            let before = self.produced();
            let diag_mark = self.diags.len();
            walk(self, branch);
            if self.produced() != before {
                return;
            }
            self.diags.truncate(diag_mark);
        }
    }

    fn math(&mut self, math: roxmltree::Node) {
        for t in math.descendants().filter(|n| is_elem(*n, MATH_NS, "t")) {
            if let Some(text) = t.text() {
                self.pending.push_str(text);
            }
        }
    }

    fn drawing(&mut self, drawing: roxmltree::Node) {
        for container in drawing.children() {
            let name = container.tag_name().name();
            if container.tag_name().namespace() != Some(WPD_NS)
                || (name != "inline" && name != "anchor")
            {
                continue;
            }
            let anchor = if name == "anchor" {
                parse_anchor(container)
            } else {
                Anchor::inline()
            };
            let extent = child_ns(container, WPD_NS, "extent").and_then(|n| {
                let cx = n.attribute("cx")?.parse::<i64>().ok()?;
                let cy = n.attribute("cy")?.parse::<i64>().ok()?;
                Some((cx, cy))
            });
            let description = child_ns(container, WPD_NS, "docPr")
                .and_then(|n| n.attribute("descr").or_else(|| n.attribute("title")))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            let Some(graphic_data) = child_ns(container, DML_NS, "graphic")
                .and_then(|g| child_ns(g, DML_NS, "graphicData"))
            else {
                continue;
            };
            let object = Object {
                anchor,
                extent,
                description,
            };
            let fragments = self.graphic_children(graphic_data, &object, 0);
            self.push_objects(fragments);
        }
    }

    /// Resolve the objects under a graphicData or group element.
    fn graphic_children(
        &mut self,
        parent: roxmltree::Node,
        object: &Object,
        group_depth: usize,
    ) -> Vec<Fragment> {
        let mut out = Vec::new();
        for child in parent.children().filter(|n| n.is_element()) {
            let ns = child.tag_name().namespace();
            match (ns, child.tag_name().name()) {
                (Some(PIC_NS), "pic") => {
                    let blip = child
                        .descendants()
                        .find(|n| is_elem(*n, DML_NS, "blip"))
                        .and_then(|b| {
                            b.attribute((REL_NS, "embed"))
                                .or_else(|| b.attribute((REL_NS, "link")))
                        });
                    match blip {
                        Some(rel_id) => out.extend(self.picture(child, rel_id, object)),
                        None => self.diags.push(self.ctx.diagnostic(
                            DiagnosticKind::UnresolvedImage,
                            child,
                            "picture without an image reference",
                        )),
                    }
                }
                (Some(WPS_NS), "wsp") => out.extend(self.shape(child)),
                (Some(WPG_NS), "wgp" | "grpSp") | (Some(WPC_NS), "wpc") => {
                    if group_depth >= self.ctx.options.max_nesting_depth {
                        self.diags.push(self.ctx.diagnostic(
                            DiagnosticKind::NestingTooDeep,
                            child,
                            "shape group nested too deeply",
                        ));
                        continue;
                    }
                    // Members share the group's anchor; their own extents are
                    // in group coordinates and not carried over.
                    let member = Object {
                        anchor: object.anchor.clone(),
                        extent: None,
                        description: None,
                    };
                    out.extend(self.graphic_children(child, &member, group_depth + 1));
                }
                // Group and canvas bookkeeping, not content
                (Some(WPG_NS), "cNvGrpSpPr" | "grpSpPr")
                | (Some(WPC_NS), "bg" | "whole")
                | (Some(WPS_NS), "cNvPr" | "cNvSpPr" | "spPr" | "style" | "bodyPr") => {}
                _ => {
                    let uri = parent.attribute("uri").unwrap_or(child.tag_name().name());
                    self.diags.push(self.ctx.diagnostic(
                        DiagnosticKind::UnsupportedObject,
                        child,
                        format!("unsupported drawing content '{uri}' skipped"),
                    ));
                }
            }
        }
        out
    }

    /// A DrawingML shape: only its text box carries content.
    fn shape(&mut self, wsp: roxmltree::Node) -> Vec<Fragment> {
        if let Some(content) = child_ns(wsp, WPS_NS, "txbx").and_then(|t| wml(t, "txbxContent")) {
            return self.text_box(content);
        }
        if child_ns(wsp, WPS_NS, "linkedTxbx").is_some() {
            self.diags.push(self.ctx.diagnostic(
                DiagnosticKind::UnsupportedObject,
                wsp,
                "linked text box continuation skipped",
            ));
        }
        Vec::new()
    }

    fn text_box(&mut self, content: roxmltree::Node) -> Vec<Fragment> {
        blocks::extract_blocks(content, self.ctx, self.depth + 1, self.diags)
    }

    fn picture(
        &mut self,
        node: roxmltree::Node,
        rel_id: &str,
        object: &Object,
    ) -> Option<Fragment> {
        let Some(image) = image_ref(self.ctx, rel_id) else {
            self.diags.push(self.ctx.diagnostic(
                DiagnosticKind::UnresolvedImage,
                node,
                format!("image relationship '{rel_id}' does not resolve"),
            ));
            return None;
        };
        Some(Fragment::Picture {
            picture: PictureItem {
                anchor: object.anchor.clone(),
                image,
                extent_emu: object.extent,
                description: object.description.clone(),
                caption: None,
            },
            provenance: Provenance::of(self.ctx.part, node),
        })
    }

    /// Legacy VML (`w:pict`): text boxes and image data on shapes or groups.
    fn vml(&mut self, pict: roxmltree::Node) {
        let mut out = Vec::new();
        for shape in pict.children().filter(|n| n.is_element()) {
            self.vml_shape(shape, &mut out, 0);
        }
        self.push_objects(out);
    }

    fn vml_shape(&mut self, shape: roxmltree::Node, out: &mut Vec<Fragment>, group_depth: usize) {
        if shape.tag_name().namespace() != Some(VML_NS) {
            return;
        }
        match shape.tag_name().name() {
            "shapetype" => {}
            "group" => {
                if group_depth >= self.ctx.options.max_nesting_depth {
                    return;
                }
                for child in shape.children().filter(|n| n.is_element()) {
                    self.vml_shape(child, out, group_depth + 1);
                }
            }
            _ => {
                if let Some(content) =
                    child_ns(shape, VML_NS, "textbox").and_then(|t| wml(t, "txbxContent"))
                {
                    out.extend(self.text_box(content));
                }
                if let Some(rel_id) =
                    child_ns(shape, VML_NS, "imagedata").and_then(|n| n.attribute((REL_NS, "id")))
                {
                    let object = Object {
                        anchor: vml_anchor(shape.attribute("style").unwrap_or("")),
                        extent: None,
                        description: shape
                            .attribute("alt")
                            .filter(|s| !s.is_empty())
                            .map(str::to_string),
                    };
                    out.extend(self.picture(shape, rel_id, &object));
                }
            }
        }
    }
}

struct Object {
    anchor: Anchor,
    extent: Option<(i64, i64)>,
    description: Option<String>,
}

fn parse_position(container: roxmltree::Node, name: &str) -> Option<AnchorPosition> {
    let pos = child_ns(container, WPD_NS, name)?;
    let relative_from = pos.attribute("relativeFrom").unwrap_or("column").to_string();
    let align = child_ns(pos, WPD_NS, "align")
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string());
    let offset_emu = child_ns(pos, WPD_NS, "posOffset")
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse::<i64>().ok());
    Some(AnchorPosition {
        relative_from,
        offset_emu,
        align,
    })
}

fn parse_anchor(container: roxmltree::Node) -> Anchor {
    let behind_text = matches!(container.attribute("behindDoc"), Some("1") | Some("true"));
    let wrap = container
        .children()
        .filter(|n| n.tag_name().namespace() == Some(WPD_NS))
        .find_map(|n| match n.tag_name().name() {
            "wrapNone" => Some(WrapMode::None),
            "wrapSquare" => Some(WrapMode::Square),
            "wrapTight" => Some(WrapMode::Tight),
            "wrapThrough" => Some(WrapMode::Through),
            "wrapTopAndBottom" => Some(WrapMode::TopAndBottom),
            _ => None,
        })
        .unwrap_or(WrapMode::None);
    Anchor {
        kind: AnchorKind::Floating,
        horizontal: parse_position(container, "positionH"),
        vertical: parse_position(container, "positionV"),
        wrap,
        behind_text,
    }
}

/// Anchor for a VML shape from its CSS-like `style` attribute.
fn vml_anchor(style: &str) -> Anchor {
    let prop = |key: &str| {
        style.split(';').find_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            (k.trim() == key).then(|| v.trim())
        })
    };
    if prop("position") != Some("absolute") {
        return Anchor::inline();
    }
    let offset = |key: &str| {
        prop(key)
            .and_then(|v| v.strip_suffix("pt"))
            .and_then(|v| v.parse::<f64>().ok())
            .map(|pt| (pt * EMU_PER_POINT).round() as i64)
    };
    let position = |relative: &str, offset_key: &str| AnchorPosition {
        relative_from: prop(relative).unwrap_or("column").to_string(),
        offset_emu: offset(offset_key),
        align: None,
    };
    Anchor {
        kind: AnchorKind::Floating,
        horizontal: Some(position("mso-position-horizontal-relative", "margin-left")),
        vertical: Some(position("mso-position-vertical-relative", "margin-top")),
        wrap: WrapMode::None,
        behind_text: prop("z-index").is_some_and(|z| z.starts_with('-')),
    }
}

fn image_ref(ctx: &Context, rel_id: &str) -> Option<ImageRef> {
    let rel = ctx.rels.get(rel_id)?;
    if rel.external {
        return Some(ImageRef {
            relationship_id: rel_id.to_string(),
            target: rel.target.clone(),
            external: true,
            mime_type: None,
            pixel_size: None,
        });
    }
    let data = ctx.package.part(&rel.target)?;
    let (mime_type, pixel_size) = if ctx.options.image_metadata {
        sniff_image(data, &rel.target)
    } else {
        (None, None)
    };
    Some(ImageRef {
        relationship_id: rel_id.to_string(),
        target: rel.target.clone(),
        external: false,
        mime_type,
        pixel_size,
    })
}

/// MIME type and pixel size from the image header; falls back to the file
/// extension for formats the decoder does not know (EMF, WMF).
fn sniff_image(data: &[u8], target: &str) -> (Option<String>, Option<(u32, u32)>) {
    match image::guess_format(data) {
        Ok(format) => {
            let size = image::ImageReader::with_format(Cursor::new(data), format)
                .into_dimensions()
                .ok();
            (Some(format.to_mime_type().to_string()), size)
        }
        Err(_) => {
            let ext = target.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
            let mime = match ext.as_deref() {
                Some("emf") => Some("image/x-emf".to_string()),
                Some("wmf") => Some("image/x-wmf".to_string()),
                Some(other) => image::ImageFormat::from_extension(other)
                    .map(|f| f.to_mime_type().to_string()),
                None => None,
            };
            (mime, None)
        }
    }
}
