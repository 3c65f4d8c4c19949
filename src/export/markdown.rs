use crate::model::{DocumentTree, Item, Node, TableItem, TextRole};

const IMAGE_PLACEHOLDER: &str = "<!-- image -->";

/// Markdown rendering. Header levels are shifted down by one so that a
/// document title can own the single `#` heading.
pub fn to_markdown(doc: &DocumentTree) -> String {
    let mut out = String::new();
    let mut prev_was_list = false;

    for (node, _) in doc.walk() {
        let Some(block) = render_block(node) else {
            continue;
        };
        let is_list = matches!(
            &node.item,
            Item::Text(t) if matches!(t.role, TextRole::ListItem { .. })
        );
        if !out.is_empty() {
            out.push_str(if is_list && prev_was_list { "\n" } else { "\n\n" });
        }
        out.push_str(&block);
        prev_was_list = is_list;
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn render_block(node: &Node) -> Option<String> {
    match &node.item {
        Item::SectionHeader(h) => {
            let hashes = "#".repeat((h.level as usize + 1).min(6));
            Some(format!("{hashes} {}", h.text))
        }
        Item::Text(t) => Some(match &t.role {
            TextRole::Title => format!("# {}", t.text),
            TextRole::ListItem {
                depth,
                enumerated,
                marker,
            } => {
                let indent = "    ".repeat(*depth as usize);
                let bullet = if *enumerated { marker.as_str() } else { "-" };
                format!("{indent}{bullet} {}", t.text)
            }
            TextRole::Paragraph | TextRole::Caption | TextRole::Footnote => t.text.clone(),
        }),
        Item::Table(table) => render_table(table),
        Item::Picture(_) => Some(IMAGE_PLACEHOLDER.to_string()),
    }
}

fn cell_text(table: &TableItem, row: usize, col: usize) -> String {
    let Some(cell) = table.cell_at(row, col) else {
        return String::new();
    };
    let text = cell.text();
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '|' => escaped.push_str("\\|"),
            '\n' | '\t' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Pipe table over the full grid. A spanned cell's text is repeated in every
/// grid position it covers; the first row is the header.
fn render_table(table: &TableItem) -> Option<String> {
    if table.rows == 0 || table.cols == 0 {
        return None;
    }
    let grid: Vec<Vec<String>> = (0..table.rows)
        .map(|r| (0..table.cols).map(|c| cell_text(table, r, c)).collect())
        .collect();

    let widths: Vec<usize> = (0..table.cols)
        .map(|c| {
            grid.iter()
                .map(|row| row[c].chars().count())
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let line = |row: &[String]| {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(text, width)| {
                let pad = width - text.chars().count();
                format!(" {text}{} ", " ".repeat(pad))
            })
            .collect();
        format!("|{}|", cells.join("|"))
    };

    let mut lines = vec![line(&grid[0])];
    let rule: Vec<String> = widths.iter().map(|w| format!("-{}-", "-".repeat(*w))).collect();
    lines.push(format!("|{}|", rule.join("|")));
    for row in &grid[1..] {
        lines.push(line(row));
    }
    Some(lines.join("\n"))
}
