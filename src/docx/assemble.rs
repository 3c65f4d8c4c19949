//! Sequential assembly of extracted fragments into the document tree.
//!
//! This is the only stateful step: node ids, the open-header stack and
//! list counters all depend on document order, so fragments must arrive in
//! that order even when they were extracted in parallel.

use crate::model::{
    Item, Node, NodeId, SectionHeaderItem, TableCell, TableItem, TextItem, TextRole,
};

use super::blocks::{Fragment, FragmentRole};
use super::numbering::{ListCounters, Numbering};

pub(crate) struct Assembler<'n> {
    numbering: &'n Numbering,
    lists: ListCounters,
    next_id: u32,
}

/// One level of output: the body, or a table cell.
struct Scope {
    parent: Option<NodeId>,
    roots: Vec<Node>,
    /// Open headers, outermost first. Each owns the nodes nested under it
    /// so far and is attached to its own parent when closed.
    open: Vec<(u8, Node)>,
}

impl Scope {
    fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            roots: Vec::new(),
            open: Vec::new(),
        }
    }

    fn current_parent(&self) -> Option<NodeId> {
        self.open.last().map(|(_, n)| n.id).or(self.parent)
    }

    fn push(&mut self, node: Node) {
        match self.open.last_mut() {
            Some((_, header)) => header.children.push(node),
            None => self.roots.push(node),
        }
    }

    /// Close every open header whose level is >= `level`.
    fn close_to(&mut self, level: u8) {
        while self.open.last().is_some_and(|(top, _)| *top >= level) {
            if let Some((_, header)) = self.open.pop() {
                self.push(header);
            }
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.close_to(0);
        self.roots
    }
}

impl<'n> Assembler<'n> {
    pub(crate) fn new(numbering: &'n Numbering) -> Self {
        Self {
            numbering,
            lists: ListCounters::default(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn text_role(&mut self, role: FragmentRole) -> TextRole {
        match role {
            FragmentRole::Paragraph => TextRole::Paragraph,
            FragmentRole::Title => TextRole::Title,
            FragmentRole::Caption => TextRole::Caption,
            FragmentRole::Footnote => TextRole::Footnote,
            FragmentRole::ListItem(numbering) => {
                let marker = self.lists.next_marker(self.numbering, &numbering);
                TextRole::ListItem {
                    depth: numbering.level,
                    enumerated: marker.enumerated,
                    marker: marker.marker,
                }
            }
        }
    }

    /// Turn fragments into nodes under `parent`. Headers open a nesting
    /// level that lasts until a header of equal or lower level.
    pub(crate) fn assemble(&mut self, fragments: Vec<Fragment>, parent: Option<NodeId>) -> Vec<Node> {
        let mut scope = Scope::new(parent);
        let mut fragments = fragments.into_iter().peekable();

        while let Some(fragment) = fragments.next() {
            match fragment {
                Fragment::Header {
                    text,
                    level,
                    provenance,
                } => {
                    scope.close_to(level);
                    let node = Node {
                        id: self.next_id(),
                        parent: scope.current_parent(),
                        item: Item::SectionHeader(SectionHeaderItem { text, level }),
                        children: Vec::new(),
                        provenance,
                    };
                    scope.open.push((level, node));
                }
                Fragment::Text {
                    text,
                    role,
                    provenance,
                } => {
                    let role = self.text_role(role);
                    let node = Node {
                        id: self.next_id(),
                        parent: scope.current_parent(),
                        item: Item::Text(TextItem { text, role }),
                        children: Vec::new(),
                        provenance,
                    };
                    scope.push(node);
                }
                Fragment::Picture {
                    mut picture,
                    provenance,
                } => {
                    if let Some(Fragment::Text {
                        text,
                        role: FragmentRole::Caption,
                        ..
                    }) = fragments.peek()
                    {
                        picture.caption = Some(text.clone());
                    }
                    let node = Node {
                        id: self.next_id(),
                        parent: scope.current_parent(),
                        item: Item::Picture(picture),
                        children: Vec::new(),
                        provenance,
                    };
                    scope.push(node);
                }
                Fragment::Table { table, provenance } => {
                    let id = self.next_id();
                    let cells = table
                        .cells
                        .into_iter()
                        .map(|cell| TableCell {
                            start_row: cell.start_row,
                            start_col: cell.start_col,
                            row_span: cell.row_span,
                            col_span: cell.col_span,
                            content: self.assemble(cell.content, Some(id)),
                        })
                        .collect();
                    let node = Node {
                        id,
                        parent: scope.current_parent(),
                        item: Item::Table(TableItem {
                            rows: table.rows,
                            cols: table.cols,
                            cells,
                        }),
                        children: Vec::new(),
                        provenance,
                    };
                    scope.push(node);
                }
            }
        }

        scope.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provenance;

    fn prov() -> Provenance {
        Provenance {
            part: "word/document.xml".into(),
            element: "w:p".into(),
            offset: 0,
        }
    }

    fn header(text: &str, level: u8) -> Fragment {
        Fragment::Header {
            text: text.into(),
            level,
            provenance: prov(),
        }
    }

    fn para(text: &str) -> Fragment {
        Fragment::Text {
            text: text.into(),
            role: FragmentRole::Paragraph,
            provenance: prov(),
        }
    }

    fn outline(nodes: &[Node], depth: usize, out: &mut Vec<String>) {
        for node in nodes {
            out.push(format!("{}{}", " ".repeat(depth), node.item.text().unwrap_or("?")));
            outline(&node.children, depth + 1, out);
        }
    }

    #[test]
    fn headers_nest_following_content() {
        let numbering = Numbering::default();
        let mut assembler = Assembler::new(&numbering);
        let nodes = assembler.assemble(
            vec![
                para("intro"),
                header("A", 1),
                para("a1"),
                header("A.1", 3),
                para("a1.1"),
                header("A.2", 2),
                header("B", 1),
                para("b1"),
            ],
            None,
        );
        let mut lines = Vec::new();
        outline(&nodes, 0, &mut lines);
        assert_eq!(
            lines,
            vec!["intro", "A", " a1", " A.1", "  a1.1", " A.2", "B", " b1"]
        );
    }

    #[test]
    fn ids_follow_document_order_and_parents_match() {
        let numbering = Numbering::default();
        let mut assembler = Assembler::new(&numbering);
        let nodes = assembler.assemble(vec![header("A", 1), para("x"), para("y")], None);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, NodeId(0));
        assert_eq!(nodes[0].parent, None);
        let ids: Vec<_> = nodes[0].children.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![NodeId(1), NodeId(2)]);
        assert!(nodes[0].children.iter().all(|n| n.parent == Some(NodeId(0))));
    }
}
