use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// Where a node came from in the source package. Only for tracing output
/// back to markup; nothing downstream depends on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub part: String,
    pub element: String,
    /// Byte offset of the element's start tag within the part.
    pub offset: usize,
}

impl Provenance {
    pub(crate) fn of(part: &str, node: roxmltree::Node) -> Self {
        let tag = node.tag_name();
        let element = match node.lookup_prefix(tag.namespace().unwrap_or("")) {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, tag.name()),
            _ => tag.name().to_string(),
        };
        Self {
            part: part.to_string(),
            element,
            offset: node.range().start,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextRole {
    Paragraph,
    Title,
    Caption,
    Footnote,
    ListItem {
        depth: u8,
        enumerated: bool,
        marker: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextItem {
    pub text: String,
    pub role: TextRole,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectionHeaderItem {
    pub text: String,
    pub level: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableCell {
    pub start_row: usize,
    pub start_col: usize,
    pub row_span: usize,
    pub col_span: usize,
    pub content: Vec<Node>,
}

impl TableCell {
    pub fn covers(&self, row: usize, col: usize) -> bool {
        (self.start_row..self.start_row + self.row_span).contains(&row)
            && (self.start_col..self.start_col + self.col_span).contains(&col)
    }

    /// Plain text of the cell: every text-bearing node, depth-first, joined
    /// with single spaces.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        for node in &self.content {
            node.collect_text(&mut parts);
        }
        parts.join(" ")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableItem {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<TableCell>,
}

impl TableItem {
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.cells.iter().find(|c| c.covers(row, col))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    Inline,
    Floating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    Inline,
    None,
    Square,
    Tight,
    Through,
    TopAndBottom,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnchorPosition {
    pub relative_from: String,
    pub offset_emu: Option<i64>,
    pub align: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub horizontal: Option<AnchorPosition>,
    pub vertical: Option<AnchorPosition>,
    pub wrap: WrapMode,
    pub behind_text: bool,
}

impl Anchor {
    pub fn inline() -> Self {
        Self {
            kind: AnchorKind::Inline,
            horizontal: None,
            vertical: None,
            wrap: WrapMode::Inline,
            behind_text: false,
        }
    }
}

/// Opaque handle to the image blob inside the package. Pixels are never
/// decoded; size and MIME type come from the file header when available.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub relationship_id: String,
    pub target: String,
    pub external: bool,
    pub mime_type: Option<String>,
    pub pixel_size: Option<(u32, u32)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PictureItem {
    pub anchor: Anchor,
    pub image: ImageRef,
    /// Extent in EMU as declared by the drawing.
    pub extent_emu: Option<(i64, i64)>,
    pub description: Option<String>,
    pub caption: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    Text(TextItem),
    SectionHeader(SectionHeaderItem),
    Table(TableItem),
    Picture(PictureItem),
}

impl Item {
    pub fn label(&self) -> &'static str {
        match self {
            Item::Text(t) => match t.role {
                TextRole::Paragraph => "paragraph",
                TextRole::Title => "title",
                TextRole::Caption => "caption",
                TextRole::Footnote => "footnote",
                TextRole::ListItem { .. } => "list_item",
            },
            Item::SectionHeader(_) => "section_header",
            Item::Table(_) => "table",
            Item::Picture(_) => "picture",
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Item::Text(t) => Some(&t.text),
            Item::SectionHeader(h) => Some(&h.text),
            Item::Table(_) | Item::Picture(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    /// Back-reference only; the parent owns this node, not the other way round.
    pub parent: Option<NodeId>,
    pub item: Item,
    pub children: Vec<Node>,
    pub provenance: Provenance,
}

impl Node {
    fn collect_text(&self, out: &mut Vec<String>) {
        match &self.item {
            Item::Table(table) => {
                for cell in &table.cells {
                    for node in &cell.content {
                        node.collect_text(out);
                    }
                }
            }
            item => {
                if let Some(text) = item.text() {
                    out.push(text.to_string());
                }
            }
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentTree {
    pub name: String,
    pub children: Vec<Node>,
}

impl DocumentTree {
    /// Depth-first walk over the body in reading order, yielding each node
    /// with its nesting depth. Table cell content is not entered; exporters
    /// walk cells themselves.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.children.iter().rev().map(|n| (n, 0)).collect(),
        }
    }

    /// Number of nodes reachable from the root, cell content included.
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|n| {
                    let cells = match &n.item {
                        Item::Table(t) => t.cells.iter().map(|c| count(&c.content)).sum(),
                        _ => 0,
                    };
                    1 + cells + count(&n.children)
                })
                .sum()
        }
        count(&self.children)
    }
}

pub struct Walk<'a> {
    stack: Vec<(&'a Node, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (&'a Node, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|c| (c, depth + 1)));
        Some((node, depth))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnknownStyle,
    UnresolvedImage,
    UnsupportedObject,
    OrphanMergeContinuation,
    ColumnOutOfBounds,
    NestingTooDeep,
    UnreadablePart,
}

/// A recoverable condition met during extraction. The offending element was
/// skipped or degraded; the rest of the document is unaffected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub provenance: Option<Provenance>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Conversion {
    pub document: DocumentTree,
    pub diagnostics: Vec<Diagnostic>,
}
