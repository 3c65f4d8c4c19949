use crate::model::{DocumentTree, Item};

/// One line per node: `item-N at level D: label: text`, indented two spaces
/// per level. Text is cut to `max_text_len` characters; line breaks inside
/// text are written as `\n` so every node stays on its own line.
pub fn to_indented_text(doc: &DocumentTree, max_text_len: usize) -> String {
    let mut out = format!("item-0 at level 0: document: {}\n", truncate(&doc.name, max_text_len));
    for (index, (node, depth)) in doc.walk().enumerate() {
        let level = depth + 1;
        let detail = match &node.item {
            Item::Table(t) => format!("table with [{}x{}]", t.rows, t.cols),
            Item::Picture(p) => match &p.caption {
                Some(caption) => format!("picture: {}", truncate(caption, max_text_len)),
                None => "picture".to_string(),
            },
            item => format!(
                "{}: {}",
                item.label(),
                truncate(item.text().unwrap_or(""), max_text_len)
            ),
        };
        out.push_str(&"  ".repeat(level));
        out.push_str(&format!("item-{} at level {level}: {detail}\n", index + 1));
    }
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .collect::<String>()
        .replace('\n', "\\n")
}
