use crate::model::{DocumentTree, Item, Node, PictureItem, TableItem, TextRole};

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn escape_text(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

pub fn to_html(doc: &DocumentTree) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_html(&doc.name)));
    out.push_str("</head>\n<body>\n");
    render_nodes(&doc.children, &mut out);
    out.push_str("</body>\n</html>\n");
    out
}

fn list_info(node: &Node) -> Option<(usize, &'static str)> {
    match &node.item {
        Item::Text(t) => match t.role {
            TextRole::ListItem {
                depth, enumerated, ..
            } => Some((depth as usize, if enumerated { "ol" } else { "ul" })),
            _ => None,
        },
        _ => None,
    }
}

fn render_nodes(nodes: &[Node], out: &mut String) {
    // Open lists, outermost first; every open level has an unclosed <li>
    // once its first item is written.
    let mut open: Vec<&'static str> = Vec::new();

    for node in nodes {
        let Some((depth, tag)) = list_info(node) else {
            close_lists(&mut open, 0, out);
            render_node(node, out);
            continue;
        };
        let target = depth + 1;
        if open.len() < target {
            // Skipped levels get a bare <li> so every nested list sits
            // inside an item.
            while open.len() < target {
                out.push_str(&format!("<{tag}>\n"));
                open.push(tag);
                if open.len() < target {
                    out.push_str("<li>");
                }
            }
        } else {
            close_lists(&mut open, target, out);
            out.push_str("</li>\n");
            if let Some(top) = open.last_mut()
                && *top != tag
            {
                out.push_str(&format!("</{top}>\n<{tag}>\n"));
                *top = tag;
            }
        }
        out.push_str("<li>");
        if let Item::Text(t) = &node.item {
            out.push_str(&escape_text(&t.text));
        }
        render_nodes(&node.children, out);
    }
    close_lists(&mut open, 0, out);
}

fn close_lists(open: &mut Vec<&'static str>, keep: usize, out: &mut String) {
    while open.len() > keep {
        if let Some(tag) = open.pop() {
            out.push_str(&format!("</li>\n</{tag}>\n"));
        }
    }
}

fn render_node(node: &Node, out: &mut String) {
    match &node.item {
        Item::SectionHeader(h) => {
            let level = (h.level as usize + 1).min(6);
            out.push_str(&format!("<h{level}>{}</h{level}>\n", escape_text(&h.text)));
        }
        Item::Text(t) => {
            let text = escape_text(&t.text);
            match t.role {
                TextRole::Title => out.push_str(&format!("<h1>{text}</h1>\n")),
                TextRole::Caption => out.push_str(&format!("<p class=\"caption\">{text}</p>\n")),
                TextRole::Footnote => out.push_str(&format!("<p class=\"footnote\">{text}</p>\n")),
                TextRole::Paragraph | TextRole::ListItem { .. } => {
                    out.push_str(&format!("<p>{text}</p>\n"))
                }
            }
        }
        Item::Table(table) => render_table(table, out),
        Item::Picture(picture) => render_picture(picture, out),
    }
    render_nodes(&node.children, out);
}

fn render_table(table: &TableItem, out: &mut String) {
    out.push_str("<table>\n");
    for row in 0..table.rows {
        out.push_str("<tr>");
        for cell in table.cells.iter().filter(|c| c.start_row == row) {
            out.push_str("<td");
            if cell.row_span > 1 {
                out.push_str(&format!(" rowspan=\"{}\"", cell.row_span));
            }
            if cell.col_span > 1 {
                out.push_str(&format!(" colspan=\"{}\"", cell.col_span));
            }
            out.push('>');
            // Single-paragraph cells stay on one line without a <p> wrapper.
            match cell.content.as_slice() {
                [] => {}
                [only] if only.children.is_empty() && matches!(only.item, Item::Text(_)) => {
                    if let Some(text) = only.item.text() {
                        out.push_str(&escape_text(text));
                    }
                }
                content => {
                    out.push('\n');
                    render_nodes(content, out);
                }
            }
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}

fn render_picture(picture: &PictureItem, out: &mut String) {
    out.push_str("<figure>");
    out.push_str(&format!(
        "<img src=\"{}\" alt=\"{}\">",
        escape_html(&picture.image.target),
        escape_html(picture.description.as_deref().unwrap_or(""))
    ));
    if let Some(caption) = &picture.caption {
        out.push_str(&format!("<figcaption>{}</figcaption>", escape_text(caption)));
    }
    out.push_str("</figure>\n");
}
