//! Formatted tables drawn in place of a chart.

use crate::color::{heatmap_colors, Rgb};
use crate::figure::{with_axes, Axes, Figure, TableBlock, Ticks, DEFAULT_FONTSIZE};
use folioscope_core::{CategoryTable, NumFormat};

#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    pub title: Option<String>,
    pub fontsize: f64,
    /// Format of every column without an entry in `column_formats`.
    pub var_format: NumFormat,
    pub column_formats: Vec<(String, NumFormat)>,
    /// Columns shaded red/yellow/green by value; `None` shades none.
    pub heatmap_columns: Option<Vec<usize>>,
    /// Rows above which a separator is drawn.
    pub row_edges: Vec<usize>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            title: None,
            fontsize: DEFAULT_FONTSIZE,
            var_format: NumFormat::thousands(2),
            column_formats: Vec::new(),
            heatmap_columns: None,
            row_edges: Vec::new(),
        }
    }
}

impl TableOptions {
    fn format_of(&self, column: &str) -> NumFormat {
        self.column_formats
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, f)| *f)
            .unwrap_or(self.var_format)
    }
}

/// Build the cell grid without drawing it.
pub fn table_block(table: &CategoryTable, opts: &TableOptions) -> TableBlock {
    let formats: Vec<NumFormat> = table.names().iter().map(|n| opts.format_of(n)).collect();
    let cells = (0..table.len())
        .map(|r| {
            formats
                .iter()
                .enumerate()
                .map(|(c, f)| f.format(table.value(r, c)))
                .collect()
        })
        .collect();

    let cell_colors = opts.heatmap_columns.as_ref().map(|shaded| {
        let mut grid = vec![vec![Rgb::WHITE; table.width()]; table.len()];
        for &c in shaded.iter().filter(|c| **c < table.width()) {
            for (r, color) in heatmap_colors(table.column_at(c)).into_iter().enumerate() {
                grid[r][c] = color;
            }
        }
        grid
    });

    TableBlock {
        columns: table.names().to_vec(),
        rows: table.labels().to_vec(),
        cells,
        cell_colors,
        row_edges: opts.row_edges.clone(),
        fontsize: opts.fontsize,
    }
}

pub fn render_table(
    table: &CategoryTable,
    opts: &TableOptions,
    ax: Option<&mut Axes>,
) -> Option<Figure> {
    let height = (80 + 24 * (table.len() as u32 + 1)).max(160);
    let width = (160 + 90 * table.width() as u32).max(480);
    with_axes(ax, (width, height), |ax| {
        ax.push(table_block(table, opts));
        ax.x_ticks = Ticks::Hidden;
        ax.y_ticks = Ticks::Hidden;
        ax.fontsize = opts.fontsize;
        if opts.title.is_some() {
            ax.title = opts.title.clone();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_use_per_column_formats() {
        let t = CategoryTable::from_rows(
            vec!["Sharpe".into(), "Vol".into()],
            vec![("p1".into(), vec![1.234, 0.1]), ("p2".into(), vec![f64::NAN, 0.25])],
        )
        .unwrap();
        let opts = TableOptions {
            column_formats: vec![("Vol".into(), NumFormat::percent(1))],
            heatmap_columns: Some(vec![0]),
            ..TableOptions::default()
        };
        let block = table_block(&t, &opts);
        assert_eq!(block.cells[0], vec!["1.23", "10.0%"]);
        assert_eq!(block.cells[1], vec!["nan", "25.0%"]);
        let colors = block.cell_colors.unwrap();
        assert_eq!(colors[1][0], Rgb::LIGHT_GREY);
        assert_eq!(colors[0][1], Rgb::WHITE);
    }
}
