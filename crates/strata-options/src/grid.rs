//! Selectable grid: a 2-D addressable cell collection with single, multi,
//! and range selection plus keyboard navigation.
//!
//! The grid is the selection surface for both the supplier list and every
//! target list. It is headless - cells carry logical state (content,
//! visibility, clickability) and the embedding UI mirrors that state into
//! whatever it renders.
//!
//! # Selection model
//!
//! Selection is an ordered list of cells plus a distinguished *root* cell,
//! the anchor for shift-range selection. The root is the most recently
//! added cell, except that a range selection leaves it untouched. In
//! `full_row_select` mode selecting any cell selects its whole row.
//!
//! # Events
//!
//! - `selection_changed` whenever the selection set changes
//! - `got_focus` on the first selection while unfocused
//! - `lost_focus` when the selection is cleared while focused

use slotmap::{SlotMap, new_key_type};
use strata_core::Signal;

use crate::error::{OptionsError, OptionsResult};
use crate::format::FormattedValue;

new_key_type! {
    /// Stable handle to a grid cell.
    pub struct CellKey;
}

/// A single grid cell.
#[derive(Clone, Debug)]
pub struct Cell {
    row: usize,
    column: usize,
    /// The value the cell displays, if any.
    pub content: Option<FormattedValue>,
    visible: bool,
    clickable: bool,
    /// Virtual cells are layout placeholders: never selectable, never
    /// hit-tested, never carrying content.
    virtual_cell: bool,
    selected: bool,
}

impl Cell {
    /// A visible, clickable cell with optional content.
    pub fn new(content: Option<FormattedValue>) -> Self {
        Self {
            row: 0,
            column: 0,
            content,
            visible: true,
            clickable: true,
            virtual_cell: false,
            selected: false,
        }
    }

    /// A placeholder cell that takes part in layout but never in
    /// selection or hit-testing.
    pub fn virtual_placeholder() -> Self {
        Self {
            row: 0,
            column: 0,
            content: None,
            visible: true,
            clickable: false,
            virtual_cell: true,
            selected: false,
        }
    }

    pub fn clickable(mut self, clickable: bool) -> Self {
        self.clickable = clickable;
        self
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_clickable(&self) -> bool {
        self.clickable
    }

    pub fn is_virtual(&self) -> bool {
        self.virtual_cell
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    fn selectable(&self) -> bool {
        self.visible && self.clickable && !self.virtual_cell
    }
}

/// A grid of cells with multi-mode selection.
pub struct SelectableGrid {
    cells: SlotMap<CellKey, Cell>,
    /// `(row, column) -> key` order table.
    rows: Vec<Vec<Option<CellKey>>>,
    /// Ordered selection; the most recently added cell is last.
    selection: Vec<CellKey>,
    /// Anchor for range selection.
    root: Option<CellKey>,
    full_row_select: bool,
    has_focus: bool,

    /// Emitted whenever the selection set changes.
    pub selection_changed: Signal<()>,
    /// Emitted on the first selection while the grid was unfocused.
    pub got_focus: Signal<()>,
    /// Emitted when the selection is cleared while the grid held focus.
    pub lost_focus: Signal<()>,
}

impl Default for SelectableGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectableGrid {
    pub fn new() -> Self {
        Self {
            cells: SlotMap::with_key(),
            rows: Vec::new(),
            selection: Vec::new(),
            root: None,
            full_row_select: false,
            has_focus: false,
            selection_changed: Signal::new(),
            got_focus: Signal::new(),
            lost_focus: Signal::new(),
        }
    }

    /// Selecting any cell selects its entire row.
    pub fn set_full_row_select(&mut self, enabled: bool) {
        self.full_row_select = enabled;
    }

    pub fn full_row_select(&self) -> bool {
        self.full_row_select
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Place a cell at a coordinate. The coordinate must be free.
    pub fn add_cell(&mut self, row: usize, column: usize, mut cell: Cell) -> OptionsResult<CellKey> {
        if self.cell_at(row, column).is_some() {
            return Err(OptionsError::CellOccupied { row, column });
        }
        cell.row = row;
        cell.column = column;
        cell.selected = false;
        let key = self.cells.insert(cell);

        if self.rows.len() <= row {
            self.rows.resize(row + 1, Vec::new());
        }
        let columns = &mut self.rows[row];
        if columns.len() <= column {
            columns.resize(column + 1, None);
        }
        columns[column] = Some(key);
        Ok(key)
    }

    /// Remove a cell, pruning it from the selection if present.
    pub fn remove_cell(&mut self, key: CellKey) {
        let Some(cell) = self.cells.remove(key) else {
            return;
        };
        self.rows[cell.row][cell.column] = None;

        if self.root == Some(key) {
            self.root = None;
        }
        if let Some(pos) = self.selection.iter().position(|&k| k == key) {
            self.selection.remove(pos);
            if self.root.is_none() {
                self.root = self.selection.last().copied();
            }
            self.selection_changed.emit(());
        }
    }

    pub fn cell(&self, key: CellKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    /// The key at a coordinate, if a cell exists there.
    pub fn cell_at(&self, row: usize, column: usize) -> Option<CellKey> {
        self.rows.get(row)?.get(column).copied().flatten()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Change a cell's visibility. Hiding a selected cell deselects it.
    pub fn set_cell_visible(&mut self, key: CellKey, visible: bool) {
        let Some(cell) = self.cells.get_mut(key) else {
            return;
        };
        if cell.visible == visible {
            return;
        }
        cell.visible = visible;
        if !visible && cell.selected {
            // same path the UI takes when a selected cell disappears
            self.on_selection_changed(key, true, false);
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select a cell in response to a click or key press.
    ///
    /// No-op when the cell is already selected and `force_toggle` is false.
    pub fn select_cell(&mut self, key: CellKey, ctrl: bool, shift: bool, force_toggle: bool) {
        let Some(cell) = self.cells.get(key) else {
            return;
        };
        if !force_toggle && cell.selected {
            return;
        }
        self.on_selection_changed(key, ctrl, shift);
    }

    /// Apply a selection change for a cell, dispatching to the range,
    /// replace, or toggle behaviour.
    pub fn on_selection_changed(&mut self, key: CellKey, ctrl: bool, shift: bool) {
        let Some(cell) = self.cells.get(key) else {
            return;
        };
        let was_selected = cell.selected;
        let mut changed = false;

        if !self.selection.is_empty() && shift {
            self.apply_range_selection(key);
            changed = true;
        } else if !was_selected || (!ctrl && self.selection.len() > 1) {
            // replace, or additive select under ctrl
            let cells = self.set_cell_selection(true, key);
            if ctrl {
                self.selection.extend(cells);
            } else {
                let prior: Vec<CellKey> = self
                    .selection
                    .iter()
                    .copied()
                    .filter(|k| !cells.contains(k))
                    .collect();
                for k in prior {
                    self.set_selected_flag(k, false);
                }
                self.selection = cells;
            }
            self.root = self.selection.last().copied();
            changed = true;
        } else if ctrl && !self.selection.is_empty() {
            // toggle off
            let cells = self.set_cell_selection(false, key);
            self.selection.retain(|k| !cells.contains(k));
            self.root = self.selection.last().copied();
            changed = true;
        }

        let gained_focus = !self.has_focus;
        self.has_focus = true;
        if gained_focus {
            self.got_focus.emit(());
        }
        if changed {
            self.selection_changed.emit(());
        }
    }

    /// Rectangular span between the root cell and `key`, inclusive.
    fn apply_range_selection(&mut self, key: CellKey) {
        let Some(anchor) = self.root.or_else(|| self.selection.last().copied()) else {
            return;
        };
        let (r0, c0) = {
            let cell = &self.cells[key];
            (cell.row, cell.column)
        };
        let (r1, c1) = {
            let cell = &self.cells[anchor];
            (cell.row, cell.column)
        };
        let rows = r0.min(r1)..=r0.max(r1);
        let cols = c0.min(c1)..=c0.max(c1);

        // deselect everything outside the span
        let outside: Vec<CellKey> = self
            .selection
            .iter()
            .copied()
            .filter(|&k| {
                let cell = &self.cells[k];
                !(rows.contains(&cell.row) && cols.contains(&cell.column))
            })
            .collect();
        for k in outside {
            self.set_selected_flag(k, false);
        }
        self.selection.clear();

        for r in rows {
            for c in cols.clone() {
                let Some(k) = self.cell_at(r, c) else {
                    continue;
                };
                if !self.cells[k].selectable() {
                    continue;
                }
                let cells = self.set_cell_selection(true, k);
                for cell_key in cells {
                    if !self.selection.contains(&cell_key) {
                        self.selection.insert(0, cell_key);
                    }
                }
                if self.full_row_select {
                    break;
                }
            }
        }
        // root stays the range anchor
        self.root = Some(anchor);
    }

    /// Set one cell's selected flag plus, in `full_row_select` mode, every
    /// visible sibling in its row. Returns the affected keys, the primary
    /// cell last.
    fn set_cell_selection(&mut self, value: bool, key: CellKey) -> Vec<CellKey> {
        let mut cells = Vec::new();
        self.set_selected_flag(key, value);
        if self.full_row_select {
            let (row, column) = {
                let cell = &self.cells[key];
                (cell.row, cell.column)
            };
            let width = self.rows.get(row).map_or(0, Vec::len);
            for c in 0..width {
                if c == column {
                    continue;
                }
                let Some(sibling) = self.cell_at(row, c) else {
                    continue;
                };
                let cell = &self.cells[sibling];
                if cell.visible && !cell.virtual_cell && cell.selected != value {
                    self.set_selected_flag(sibling, value);
                    cells.push(sibling);
                }
            }
        }
        cells.push(key);
        cells
    }

    fn set_selected_flag(&mut self, key: CellKey, value: bool) {
        if let Some(cell) = self.cells.get_mut(key) {
            cell.selected = value;
        }
    }

    /// Deselect everything.
    pub fn clear_selection(&mut self) {
        let changed = !self.selection.is_empty();
        for key in std::mem::take(&mut self.selection) {
            self.set_selected_flag(key, false);
        }
        self.root = None;

        let lost = self.has_focus;
        self.has_focus = false;
        if lost {
            self.lost_focus.emit(());
        }
        if changed {
            self.selection_changed.emit(());
        }
    }

    /// Selected cells in selection order.
    pub fn selected_cells(&self) -> &[CellKey] {
        &self.selection
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    /// Distinct selected rows, ascending.
    pub fn selected_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self
            .selection
            .iter()
            .filter_map(|&k| self.cells.get(k).map(|c| c.row))
            .collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }

    pub fn root_cell(&self) -> Option<CellKey> {
        self.root
    }

    // =========================================================================
    // Keyboard navigation
    // =========================================================================

    /// Move the selection anchor to the nearest visible cell below, as the
    /// Down arrow does.
    pub fn select_below(&mut self, ctrl: bool, shift: bool) {
        self.select_adjacent(1, ctrl, shift);
    }

    /// Move the selection anchor to the nearest visible cell above, as the
    /// Up arrow does.
    pub fn select_above(&mut self, ctrl: bool, shift: bool) {
        self.select_adjacent(-1, ctrl, shift);
    }

    fn select_adjacent(&mut self, direction: isize, ctrl: bool, shift: bool) {
        let Some(&last) = self.selection.last() else {
            return;
        };
        let (row, column) = {
            let cell = &self.cells[last];
            (cell.row, cell.column)
        };
        if let Some(next) = self.nearest_in_column(row, column, direction) {
            self.select_cell(next, ctrl, shift, true);
        }
    }

    /// The nearest selectable cell in the same column, scanning from `row`
    /// in `direction` and skipping hidden rows.
    fn nearest_in_column(&self, row: usize, column: usize, direction: isize) -> Option<CellKey> {
        let mut r = row as isize + direction;
        while r >= 0 && (r as usize) < self.rows.len() {
            if let Some(key) = self.cell_at(r as usize, column) {
                if self.cells[key].selectable() {
                    return Some(key);
                }
            }
            r += direction;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn grid_of(rows: usize, cols: usize) -> (SelectableGrid, Vec<Vec<CellKey>>) {
        let mut grid = SelectableGrid::new();
        let mut keys = Vec::new();
        for r in 0..rows {
            let mut row_keys = Vec::new();
            for c in 0..cols {
                let key = grid
                    .add_cell(r, c, Cell::new(Some(FormattedValue::variable(format!("v{r}{c}")))))
                    .unwrap();
                row_keys.push(key);
            }
            keys.push(row_keys);
        }
        (grid, keys)
    }

    #[test]
    fn test_add_cell_rejects_occupied_coordinate() {
        let mut grid = SelectableGrid::new();
        grid.add_cell(0, 0, Cell::new(None)).unwrap();
        assert!(matches!(
            grid.add_cell(0, 0, Cell::new(None)),
            Err(OptionsError::CellOccupied { row: 0, column: 0 })
        ));
    }

    #[test]
    fn test_simple_select_replaces() {
        let (mut grid, keys) = grid_of(3, 1);
        grid.select_cell(keys[0][0], false, false, false);
        grid.select_cell(keys[2][0], false, false, false);

        assert_eq!(grid.selected_cells(), &[keys[2][0]]);
        assert!(!grid.cell(keys[0][0]).unwrap().is_selected());
        assert_eq!(grid.root_cell(), Some(keys[2][0]));
    }

    #[test]
    fn test_select_already_selected_is_noop() {
        let (mut grid, keys) = grid_of(2, 1);
        let fired = Arc::new(Mutex::new(0));
        let fired_clone = fired.clone();
        grid.selection_changed.connect(move |_| {
            *fired_clone.lock() += 1;
        });

        grid.select_cell(keys[0][0], false, false, false);
        grid.select_cell(keys[0][0], false, false, false);
        assert_eq!(*fired.lock(), 1);
    }

    #[test]
    fn test_ctrl_toggle_adds_and_removes() {
        let (mut grid, keys) = grid_of(3, 1);
        grid.select_cell(keys[0][0], false, false, false);
        grid.select_cell(keys[1][0], true, false, false);
        assert_eq!(grid.selected_count(), 2);
        assert_eq!(grid.root_cell(), Some(keys[1][0]));

        // toggling the root off moves the root to the last remaining cell
        grid.select_cell(keys[1][0], true, false, true);
        assert_eq!(grid.selected_cells(), &[keys[0][0]]);
        assert_eq!(grid.root_cell(), Some(keys[0][0]));
    }

    #[test]
    fn test_range_selection_covers_rectangle() {
        let (mut grid, keys) = grid_of(4, 3);
        grid.select_cell(keys[1][1], false, false, false);
        grid.select_cell(keys[3][2], false, true, false);

        // exactly the cells of the (1,1)-(3,2) rectangle
        for r in 0..4 {
            for c in 0..3 {
                let expected = (1..=3).contains(&r) && (1..=2).contains(&c);
                assert_eq!(
                    grid.cell(keys[r][c]).unwrap().is_selected(),
                    expected,
                    "cell ({r},{c})"
                );
            }
        }
        // root is unchanged by a range selection
        assert_eq!(grid.root_cell(), Some(keys[1][1]));
    }

    #[test]
    fn test_range_selection_skips_invisible_cells() {
        let (mut grid, keys) = grid_of(3, 1);
        grid.set_cell_visible(keys[1][0], false);
        grid.select_cell(keys[0][0], false, false, false);
        grid.select_cell(keys[2][0], false, true, false);

        assert!(grid.cell(keys[0][0]).unwrap().is_selected());
        assert!(!grid.cell(keys[1][0]).unwrap().is_selected());
        assert!(grid.cell(keys[2][0]).unwrap().is_selected());
    }

    #[test]
    fn test_range_excludes_previous_out_of_span_selection() {
        let (mut grid, keys) = grid_of(4, 1);
        grid.select_cell(keys[3][0], false, false, false);
        grid.select_cell(keys[1][0], true, false, false); // root now row 1
        grid.select_cell(keys[0][0], false, true, false); // range rows 0..=1

        assert!(grid.cell(keys[0][0]).unwrap().is_selected());
        assert!(grid.cell(keys[1][0]).unwrap().is_selected());
        assert!(!grid.cell(keys[3][0]).unwrap().is_selected());
    }

    #[test]
    fn test_full_row_select() {
        let (mut grid, keys) = grid_of(2, 3);
        grid.set_full_row_select(true);
        grid.select_cell(keys[1][1], false, false, false);

        for c in 0..3 {
            assert!(grid.cell(keys[1][c]).unwrap().is_selected());
            assert!(!grid.cell(keys[0][c]).unwrap().is_selected());
        }
        assert_eq!(grid.selected_rows(), vec![1]);
    }

    #[test]
    fn test_virtual_cells_are_never_selected() {
        let mut grid = SelectableGrid::new();
        let real = grid
            .add_cell(0, 0, Cell::new(Some(FormattedValue::variable("a"))))
            .unwrap();
        let placeholder = grid.add_cell(0, 1, Cell::virtual_placeholder()).unwrap();
        grid.set_full_row_select(true);

        grid.select_cell(real, false, false, false);
        assert!(grid.cell(real).unwrap().is_selected());
        assert!(!grid.cell(placeholder).unwrap().is_selected());
    }

    #[test]
    fn test_focus_signals() {
        let (mut grid, keys) = grid_of(2, 1);
        let events = Arc::new(Mutex::new(Vec::new()));

        let got = events.clone();
        grid.got_focus.connect(move |_| got.lock().push("got"));
        let lost = events.clone();
        grid.lost_focus.connect(move |_| lost.lock().push("lost"));

        grid.select_cell(keys[0][0], false, false, false);
        grid.select_cell(keys[1][0], false, false, false); // already focused
        grid.clear_selection();

        assert_eq!(*events.lock(), vec!["got", "lost"]);
    }

    #[test]
    fn test_remove_cell_prunes_selection() {
        let (mut grid, keys) = grid_of(2, 1);
        grid.select_cell(keys[0][0], false, false, false);

        let fired = Arc::new(Mutex::new(0));
        let fired_clone = fired.clone();
        grid.selection_changed.connect(move |_| {
            *fired_clone.lock() += 1;
        });

        grid.remove_cell(keys[0][0]);
        assert_eq!(grid.selected_count(), 0);
        assert_eq!(*fired.lock(), 1);
    }

    #[test]
    fn test_keyboard_navigation_skips_hidden_rows() {
        let (mut grid, keys) = grid_of(4, 1);
        grid.set_cell_visible(keys[1][0], false);

        grid.select_cell(keys[0][0], false, false, false);
        grid.select_below(false, false);
        assert_eq!(grid.selected_cells(), &[keys[2][0]]);

        grid.select_above(false, false);
        assert_eq!(grid.selected_cells(), &[keys[0][0]]);
    }

    #[test]
    fn test_hiding_selected_cell_deselects_it() {
        let (mut grid, keys) = grid_of(2, 1);
        grid.select_cell(keys[0][0], false, false, false);
        grid.set_cell_visible(keys[0][0], false);
        assert!(!grid.cell(keys[0][0]).unwrap().is_selected());
        assert_eq!(grid.selected_count(), 0);
    }
}
