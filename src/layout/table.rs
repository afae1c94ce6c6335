//! Renderer-neutral table rows for header and photo blocks.
//!
//! Both renderers walk the same rows, so labels, spans and column
//! proportions agree between the document and the print output.

/// Six-column grid, in percent of the table width.
pub const COLUMN_GRID: [u32; 6] = [15, 15, 20, 15, 15, 20];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// Characters spread across the full cell width (label cells).
    Distribute,
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Text(String),
    /// The block's photograph.
    Photo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub content: CellContent,
    /// Number of grid columns covered.
    pub span: usize,
    pub align: Align,
    /// Field caption rather than a value.
    pub is_label: bool,
}

impl Cell {
    pub fn label(text: impl Into<String>) -> Self {
        Cell {
            content: CellContent::Text(text.into()),
            span: 1,
            align: Align::Distribute,
            is_label: true,
        }
    }

    pub fn value(text: impl Into<String>, span: usize) -> Self {
        Cell {
            content: CellContent::Text(text.into()),
            span,
            align: Align::Left,
            is_label: false,
        }
    }

    pub fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    pub fn photo() -> Self {
        Cell {
            content: CellContent::Photo,
            span: COLUMN_GRID.len(),
            align: Align::Center,
            is_label: false,
        }
    }

    pub fn text(&self) -> &str {
        match &self.content {
            CellContent::Text(t) => t,
            CellContent::Photo => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Row { cells }
    }

    pub fn is_photo(&self) -> bool {
        self.cells
            .iter()
            .any(|c| matches!(c.content, CellContent::Photo))
    }

    /// Width of each cell in percent: the sum of the grid columns it spans.
    pub fn widths(&self) -> Vec<u32> {
        let mut column = 0;
        self.cells
            .iter()
            .map(|cell| {
                let end = (column + cell.span).min(COLUMN_GRID.len());
                let width = COLUMN_GRID[column.min(end)..end].iter().sum();
                column = end;
                width
            })
            .collect()
    }

    /// Total grid columns covered by the row.
    pub fn span(&self) -> usize {
        self.cells.iter().map(|c| c.span).sum()
    }
}
