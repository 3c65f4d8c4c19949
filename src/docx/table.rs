use crate::model::{Diagnostic, DiagnosticKind};

use super::blocks::{self, Fragment};
use super::{Context, WML_NS, collect_block_nodes, is_elem, wml};

/// Word refuses tables wider than this many grid columns.
const MAX_COLUMNS: usize = 63;

#[derive(Debug)]
pub(crate) struct TableFragment {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) cells: Vec<CellFragment>,
}

#[derive(Debug)]
pub(crate) struct CellFragment {
    pub(crate) start_row: usize,
    pub(crate) start_col: usize,
    pub(crate) row_span: usize,
    pub(crate) col_span: usize,
    pub(crate) content: Vec<Fragment>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Merge {
    None,
    Restart,
    Continue,
}

fn merge_marker(tc_pr: Option<roxmltree::Node>, name: &str) -> Merge {
    tc_pr
        .and_then(|pr| wml(pr, name))
        .map(|n| match n.attribute((WML_NS, "val")) {
            Some("restart") => Merge::Restart,
            _ => Merge::Continue,
        })
        .unwrap_or(Merge::None)
}

/// Grid-column counts, capped so arithmetic on them cannot overflow.
fn int_val(node: Option<roxmltree::Node>, name: &str) -> Option<usize> {
    node.and_then(|n| wml(n, name))
        .and_then(|n| n.attribute((WML_NS, "val")))
        .and_then(|v| v.parse::<usize>().ok())
        .map(|v| v.min(MAX_COLUMNS))
}

/// Occupied grid positions, one row per `w:tr`, each slot holding the index
/// of the cell that covers it.
struct Grid {
    slots: Vec<Vec<Option<usize>>>,
}

impl Grid {
    fn get(&self, row: usize, col: usize) -> Option<usize> {
        self.slots.get(row).and_then(|r| r.get(col).copied().flatten())
    }

    fn mark(&mut self, row: usize, cols: std::ops::Range<usize>, cell: usize) {
        let slots = &mut self.slots[row];
        if slots.len() < cols.end {
            slots.resize(cols.end, None);
        }
        for col in cols {
            slots[col] = Some(cell);
        }
    }

    fn width(&self) -> usize {
        self.slots.iter().map(Vec::len).max().unwrap_or(0)
    }
}

pub(crate) fn build_table(
    tbl: roxmltree::Node,
    ctx: &Context,
    depth: usize,
    diags: &mut Vec<Diagnostic>,
) -> TableFragment {
    let tbl_rows: Vec<_> = collect_block_nodes(tbl)
        .into_iter()
        .filter(|n| is_elem(*n, WML_NS, "tr"))
        .collect();

    let mut cells: Vec<CellFragment> = Vec::new();
    let mut grid = Grid {
        slots: vec![Vec::new(); tbl_rows.len()],
    };

    for (ri, tr) in tbl_rows.iter().enumerate() {
        let tr_pr = wml(*tr, "trPr");
        let mut grid_col = int_val(tr_pr, "gridBefore").unwrap_or(0);
        let mut prev_in_row: Option<usize> = None;

        for tc in collect_block_nodes(*tr)
            .into_iter()
            .filter(|n| is_elem(*n, WML_NS, "tc"))
        {
            while grid.get(ri, grid_col).is_some() {
                grid_col += 1;
            }
            let tc_pr = wml(tc, "tcPr");
            let mut grid_span = int_val(tc_pr, "gridSpan").unwrap_or(1).max(1);

            if grid_col >= MAX_COLUMNS {
                diags.push(ctx.diagnostic(
                    DiagnosticKind::ColumnOutOfBounds,
                    tc,
                    format!("cell at column {grid_col} is beyond the {MAX_COLUMNS}-column limit"),
                ));
                continue;
            }
            if grid_col.saturating_add(grid_span) > MAX_COLUMNS {
                diags.push(ctx.diagnostic(
                    DiagnosticKind::ColumnOutOfBounds,
                    tc,
                    format!("span of {grid_span} clamped at the {MAX_COLUMNS}-column limit"),
                ));
                grid_span = MAX_COLUMNS - grid_col;
            }

            let content = blocks::extract_blocks(tc, ctx, depth + 1, diags);

            if merge_marker(tc_pr, "hMerge") == Merge::Continue {
                let origin = prev_in_row.filter(|&i| {
                    let c = &cells[i];
                    c.start_row == ri && c.start_col + c.col_span == grid_col
                });
                if let Some(i) = origin {
                    cells[i].col_span += grid_span;
                    cells[i].content.extend(content);
                    grid.mark(ri, grid_col..grid_col + grid_span, i);
                    grid_col += grid_span;
                    continue;
                }
                diags.push(ctx.diagnostic(
                    DiagnosticKind::OrphanMergeContinuation,
                    tc,
                    "horizontal merge continuation without an origin",
                ));
            } else if merge_marker(tc_pr, "vMerge") == Merge::Continue {
                let origin = ri
                    .checked_sub(1)
                    .and_then(|above| grid.get(above, grid_col))
                    .filter(|&i| {
                        let c = &cells[i];
                        c.start_col == grid_col && c.start_row + c.row_span == ri
                    });
                if let Some(i) = origin {
                    let span = cells[i].col_span;
                    cells[i].row_span += 1;
                    cells[i].content.extend(content);
                    grid.mark(ri, grid_col..grid_col + span, i);
                    prev_in_row = Some(i);
                    grid_col += span;
                    continue;
                }
                diags.push(ctx.diagnostic(
                    DiagnosticKind::OrphanMergeContinuation,
                    tc,
                    "vertical merge continuation without an origin",
                ));
            }

            let index = cells.len();
            cells.push(CellFragment {
                start_row: ri,
                start_col: grid_col,
                row_span: 1,
                col_span: grid_span,
                content,
            });
            grid.mark(ri, grid_col..grid_col + grid_span, index);
            prev_in_row = Some(index);
            grid_col += grid_span;
        }
    }

    // Ragged rows: fill the holes so the cells tile the grid.
    let cols = grid.width();
    for (ri, row) in grid.slots.iter().enumerate() {
        for ci in 0..cols {
            if row.get(ci).copied().flatten().is_none() {
                cells.push(CellFragment {
                    start_row: ri,
                    start_col: ci,
                    row_span: 1,
                    col_span: 1,
                    content: Vec::new(),
                });
            }
        }
    }
    cells.sort_by_key(|c| (c.start_row, c.start_col));

    TableFragment {
        rows: tbl_rows.len(),
        cols,
        cells,
    }
}
