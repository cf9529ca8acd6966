// src/ui/layouts/table.rs
//! Sparse grid layout.

use super::Align;
use crate::canvas::Canvas;
use crate::ui::elements::{ElementError, ElementId, ElementKind, ElementResult, UiTree};
use crate::ui::geometry::Size;

/// Grid of optional children.
///
/// The table is `max row length` columns wide and `row count` rows tall.
/// Column widths and row heights are sized to their largest child. Each child
/// is aligned inside its cell by the first gravity found in this order:
/// per-column, per-row, table-wide (default [`Align::Center`]).
#[derive(Debug, Clone, Default)]
pub struct TableLayout {
    cells: Vec<Vec<Option<ElementId>>>,
    gravity: Align,
    row_gravity: Vec<Option<Align>>,
    column_gravity: Vec<Option<Align>>,
    col_widths: Vec<u32>,
    row_heights: Vec<u32>,
}

impl TableLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child at `(row, col)`, or `None` for empty or out-of-range cells.
    pub fn get(&self, row: usize, col: usize) -> Option<ElementId> {
        self.cells.get(row)?.get(col).copied().flatten()
    }

    /// `(columns, rows)`.
    pub fn dimensions(&self) -> (usize, usize) {
        dimensions_of(&self.cells)
    }

    pub fn gravity(&self) -> Align {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Align) {
        self.gravity = gravity;
    }

    /// Override gravity for one row; `None` removes the override.
    pub fn set_row_gravity(&mut self, row: usize, gravity: Option<Align>) {
        set_override(&mut self.row_gravity, row, gravity);
    }

    /// Override gravity for one column; `None` removes the override.
    pub fn set_column_gravity(&mut self, col: usize, gravity: Option<Align>) {
        set_override(&mut self.column_gravity, col, gravity);
    }

    /// Gravity that applies to the cell at `(row, col)`.
    pub fn gravity_at(&self, row: usize, col: usize) -> Align {
        self.column_gravity
            .get(col)
            .copied()
            .flatten()
            .or_else(|| self.row_gravity.get(row).copied().flatten())
            .unwrap_or(self.gravity)
    }

    pub fn column_widths(&self) -> &[u32] {
        &self.col_widths
    }

    pub fn row_heights(&self) -> &[u32] {
        &self.row_heights
    }

    /// Store `child` at `(row, col)`, growing the grid. Returns the replaced occupant.
    fn place(&mut self, row: usize, col: usize, child: ElementId) -> Option<ElementId> {
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if cells.len() <= col {
            cells.resize(col + 1, None);
        }
        cells[col].replace(child)
    }
}

fn dimensions_of(cells: &[Vec<Option<ElementId>>]) -> (usize, usize) {
    let cols = cells.iter().map(Vec::len).max().unwrap_or(0);
    (cols, cells.len())
}

fn set_override(slots: &mut Vec<Option<Align>>, index: usize, gravity: Option<Align>) {
    if slots.len() <= index {
        if gravity.is_none() {
            return;
        }
        slots.resize(index + 1, None);
    }
    slots[index] = gravity;
}

impl UiTree {
    pub fn table(&self, id: ElementId) -> Option<&TableLayout> {
        match self.kind(id) {
            Some(ElementKind::Table(table)) => Some(table),
            _ => None,
        }
    }

    pub fn table_mut(&mut self, id: ElementId) -> Option<&mut TableLayout> {
        match self.kind_mut(id) {
            Some(ElementKind::Table(table)) => Some(table),
            _ => None,
        }
    }

    fn table_checked_mut(&mut self, id: ElementId) -> ElementResult<&mut TableLayout> {
        if self.table(id).is_none() {
            return Err(self.wrong_kind(id, "table layout"));
        }
        self.table_mut(id).ok_or(ElementError::Unknown(id))
    }

    /// Place `child` at `(row, col)`. A previous occupant of the cell is detached.
    pub fn put(&mut self, table: ElementId, row: usize, col: usize, child: ElementId) -> ElementResult<()> {
        self.table_checked_mut(table)?;
        self.attach(table, child)?;
        if let Some(previous) = self.table_checked_mut(table)?.place(row, col, child) {
            self.detach(previous);
        }
        Ok(())
    }

    /// Place a `width x height` spacer at `(row, col)`.
    pub fn put_space(&mut self, table: ElementId, row: usize, col: usize, width: u32, height: u32) -> ElementResult<ElementId> {
        self.table_checked_mut(table)?;
        let spacer = self.add_spacer(width, height);
        self.put(table, row, col, spacer)?;
        Ok(spacer)
    }

    /// Detach every child of the table. Gravity overrides are kept.
    pub fn clear_table(&mut self, table: ElementId) -> ElementResult<()> {
        let target = self.table_checked_mut(table)?;
        let cells = std::mem::take(&mut target.cells);
        target.col_widths.clear();
        target.row_heights.clear();
        for child in cells.iter().flatten().flatten() {
            self.detach(*child);
        }
        Ok(())
    }

    pub(crate) fn measure_table(&mut self, id: ElementId, max_w: u32, max_h: u32) -> Size {
        let Some(table) = self.table_mut(id) else {
            return Size::ZERO;
        };
        let cells = std::mem::take(&mut table.cells);
        let (cols, rows) = dimensions_of(&cells);
        let cell = |row: usize, col: usize| cells.get(row)?.get(col).copied().flatten();

        // Column widths, each column probing the width left over by earlier ones
        let mut col_widths = vec![0u32; cols];
        let mut remaining_w = max_w;
        for (col, width) in col_widths.iter_mut().enumerate() {
            for row in 0..rows {
                if let Some(child) = cell(row, col) {
                    *width = (*width).max(self.measure(child, remaining_w, max_h).width);
                }
            }
            remaining_w = remaining_w.saturating_sub(*width);
        }

        let mut row_heights = vec![0u32; rows];
        let mut remaining_h = max_h;
        for (row, height) in row_heights.iter_mut().enumerate() {
            for col in 0..cols {
                if let Some(child) = cell(row, col) {
                    *height = (*height).max(self.measure(child, max_w, remaining_h).height);
                }
            }
            remaining_h = remaining_h.saturating_sub(*height);
        }

        // Re-measure against the final cell sizes
        for (row, &height) in row_heights.iter().enumerate() {
            for (col, &width) in col_widths.iter().enumerate() {
                if let Some(child) = cell(row, col) {
                    self.measure(child, width, height);
                }
            }
        }

        if let Some(table) = self.table_mut(id) {
            table.cells = cells;
            table.col_widths = col_widths;
            table.row_heights = row_heights;
        }

        Size::new(max_w - remaining_w, max_h - remaining_h)
    }

    pub(crate) fn render_table(&self, table: &TableLayout, x: i32, y: i32, w: u32, h: u32, canvas: &mut Canvas) {
        let mut cell_y = 0u32;
        for (row, &row_h) in table.row_heights.iter().enumerate() {
            let mut cell_x = 0u32;
            for (col, &col_w) in table.col_widths.iter().enumerate() {
                if let Some(child) = table.get(row, col) {
                    let size = self.measured_size(child);
                    let child_w = size.width.min(col_w);
                    let child_h = size.height.min(row_h);
                    let align = table.gravity_at(row, col);
                    let px = cell_x.saturating_add(align.horizontal().offset(col_w - child_w));
                    let py = cell_y.saturating_add(align.vertical().offset(row_h - child_h));
                    // Clip to the table window
                    let render_w = child_w.min(w.saturating_sub(px));
                    let render_h = child_h.min(h.saturating_sub(py));
                    if render_w > 0 && render_h > 0 {
                        self.render(
                            child,
                            x.saturating_add(px as i32),
                            y.saturating_add(py as i32),
                            render_w,
                            render_h,
                            canvas,
                        );
                    }
                }
                cell_x = cell_x.saturating_add(col_w);
            }
            cell_y = cell_y.saturating_add(row_h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::font::testing::block_style;

    #[test]
    fn test_put_and_get_round_trip() {
        let mut tree = UiTree::new();
        let table = tree.add_table();
        let child = tree.add_spacer(1, 1);
        tree.put(table, 2, 3, child).unwrap();

        let layout = tree.table(table).unwrap();
        assert_eq!(layout.get(2, 3), Some(child));
        assert_eq!(layout.get(0, 0), None);
        assert_eq!(layout.get(2, 2), None);
        assert_eq!(layout.get(9, 9), None);
        assert_eq!(layout.dimensions(), (4, 3));
    }

    #[test]
    fn test_put_replaces_and_detaches() {
        let mut tree = UiTree::new();
        let table = tree.add_table();
        let first = tree.add_spacer(1, 1);
        let second = tree.add_spacer(2, 2);
        tree.put(table, 0, 0, first).unwrap();
        tree.put(table, 0, 0, second).unwrap();
        assert_eq!(tree.table(table).unwrap().get(0, 0), Some(second));
        assert_eq!(tree.parent(first), None);
    }

    #[test]
    fn test_gravity_precedence() {
        let mut layout = TableLayout::new();
        assert_eq!(layout.gravity_at(0, 0), Align::Center);
        layout.set_gravity(Align::South);
        assert_eq!(layout.gravity_at(4, 4), Align::South);
        layout.set_row_gravity(1, Some(Align::East));
        assert_eq!(layout.gravity_at(1, 0), Align::East);
        layout.set_column_gravity(0, Some(Align::NorthWest));
        assert_eq!(layout.gravity_at(1, 0), Align::NorthWest);
        assert_eq!(layout.gravity_at(1, 1), Align::East);
        layout.set_column_gravity(0, None);
        assert_eq!(layout.gravity_at(1, 0), Align::East);
    }

    #[test]
    fn test_measure_columns_and_rows() {
        let mut tree = UiTree::new();
        let table = tree.add_table();
        let a = tree.add_spacer(10, 2);
        let b = tree.add_spacer(4, 6);
        let c = tree.add_spacer(7, 3);
        tree.put(table, 0, 0, a).unwrap();
        tree.put(table, 0, 1, b).unwrap();
        tree.put(table, 1, 0, c).unwrap();

        let size = tree.measure(table, 100, 100);
        let layout = tree.table(table).unwrap();
        assert_eq!(layout.column_widths(), &[10, 4]);
        assert_eq!(layout.row_heights(), &[6, 3]);
        assert_eq!(size, Size::new(14, 9));
    }

    #[test]
    fn test_measure_shrinks_later_columns() {
        let mut tree = UiTree::new();
        let table = tree.add_table();
        let a = tree.add_spacer(8, 2);
        let b = tree.add_spacer(8, 2);
        tree.put(table, 0, 0, a).unwrap();
        tree.put(table, 0, 1, b).unwrap();
        assert_eq!(tree.measure(table, 12, 10), Size::new(12, 2));
        assert_eq!(tree.measured_size(b), Size::new(4, 2));
    }

    #[test]
    fn test_render_aligns_within_cells() {
        let mut tree = UiTree::new();
        let table = tree.add_table();
        let wide = tree.add_spacer(6, 4);
        let small = tree.add_text(block_style(2, 2), "x");
        let empty_row_filler = tree.add_spacer(4, 4);
        tree.put(table, 0, 0, wide).unwrap();
        tree.put(table, 1, 0, small).unwrap();
        // (1, 1) left empty, (0, 1) filled
        tree.put(table, 0, 1, empty_row_filler).unwrap();
        let trailing = tree.add_text(block_style(2, 2), "y");
        tree.put(table, 1, 2, trailing).unwrap();
        tree.table_mut(table).unwrap().set_row_gravity(1, Some(Align::SouthEast));
        tree.set_root(table).unwrap();

        let mut canvas = Canvas::new(32, 16);
        tree.measure_and_render(&mut canvas);

        // row 1 starts at y = 4 with height 2; small is bottom-right of the 6-wide column
        assert!(canvas.is_lit(4, 4) && canvas.is_lit(5, 5));
        assert!(!canvas.is_lit(3, 4));
        // column 2 begins after widths 6 + 4, even though (1, 1) is empty
        assert!(canvas.is_lit(10, 4) && canvas.is_lit(11, 5));
    }

    #[test]
    fn test_clear_table() {
        let mut tree = UiTree::new();
        let table = tree.add_table();
        let spacer = tree.put_space(table, 1, 1, 3, 3).unwrap();
        tree.clear_table(table).unwrap();
        assert_eq!(tree.table(table).unwrap().dimensions(), (0, 0));
        assert_eq!(tree.parent(spacer), None);
    }
}
