//! Terminal-backed drawing surface.
//!
//! Surface units are finer than terminal cells: each column spans
//! [`UNITS_PER_COLUMN`] units and each row [`UNITS_PER_ROW`] units. Partially
//! covered cells at the top of a bar are drawn with eighth-block glyphs.

use super::renderer::{Fill, Rect, Rgb, Surface, BACKGROUND};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect as Area;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

pub const UNITS_PER_COLUMN: f64 = 4.0;
pub const UNITS_PER_ROW: f64 = 8.0;

const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    color: Rgb,
    /// Filled eighths, counted from the bottom of the cell
    level: u8,
}

/// Grid of terminal cells that implements [`Surface`].
pub struct TerminalSurface {
    columns: u16,
    rows: u16,
    background: Rgb,
    cells: Vec<Option<Cell>>,
}

impl TerminalSurface {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns,
            rows,
            background: BACKGROUND,
            cells: vec![None; columns as usize * rows as usize],
        }
    }

    /// Adopts a new size. Contents are discarded; the next frame repaints.
    pub fn resize(&mut self, columns: u16, rows: u16) {
        if columns == self.columns && rows == self.rows {
            return;
        }
        tracing::debug!("Spectrum surface resized to {}x{}", columns, rows);
        self.columns = columns;
        self.rows = rows;
        self.cells = vec![None; columns as usize * rows as usize];
    }

    pub fn size(&self) -> (u16, u16) {
        (self.columns, self.rows)
    }

    /// Returns the glyph and color painted at a cell, if any.
    pub fn cell(&self, column: u16, row: u16) -> Option<(char, Rgb)> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.cells[self.index(column, row)].map(|cell| (LEVELS[cell.level as usize], cell.color))
    }

    fn index(&self, column: u16, row: u16) -> usize {
        row as usize * self.columns as usize + column as usize
    }
}

fn overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

impl Surface for TerminalSurface {
    fn width(&self) -> f64 {
        self.columns as f64 * UNITS_PER_COLUMN
    }

    fn height(&self) -> f64 {
        self.rows as f64 * UNITS_PER_ROW
    }

    fn clear(&mut self, color: Rgb) {
        self.background = color;
        self.cells.fill(None);
    }

    fn fill_rect(&mut self, rect: Rect, fill: Fill) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }

        for column in 0..self.columns {
            let left = column as f64 * UNITS_PER_COLUMN;
            let covered = overlap(rect.x, rect.x + rect.width, left, left + UNITS_PER_COLUMN);
            if covered < UNITS_PER_COLUMN / 2.0 {
                continue;
            }

            for row in 0..self.rows {
                let top = row as f64 * UNITS_PER_ROW;
                let bottom = top + UNITS_PER_ROW;
                let level = overlap(rect.y, rect.y + rect.height, top, bottom).round() as u8;
                if level == 0 {
                    continue;
                }

                let color = fill.color_at(top + UNITS_PER_ROW / 2.0);
                let index = self.index(column, row);
                self.cells[index] = Some(Cell {
                    color,
                    level: level.min(8),
                });
            }
        }
    }
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

impl Widget for &TerminalSurface {
    fn render(self, area: Area, buf: &mut Buffer) {
        let background = Style::default().bg(to_color(self.background));
        let width = area.width.min(self.columns);
        let height = area.height.min(self.rows);

        for row in 0..area.height {
            for column in 0..area.width {
                let Some(target) = buf.cell_mut((area.x + column, area.y + row)) else {
                    continue;
                };
                target.set_char(' ').set_style(background);

                if column >= width || row >= height {
                    continue;
                }
                if let Some(cell) = self.cells[self.index(column, row)] {
                    target
                        .set_char(LEVELS[cell.level as usize])
                        .set_fg(to_color(cell.color));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::renderer::{bar_fill, GRADIENT_TOP};

    fn flat() -> Fill {
        Fill::VerticalGradient {
            y_from: 0.0,
            y_to: 0.0,
            from: GRADIENT_TOP,
            to: GRADIENT_TOP,
        }
    }

    #[test]
    fn test_dimensions_in_units() {
        let surface = TerminalSurface::new(80, 20);
        assert_eq!(surface.width(), 320.0);
        assert_eq!(surface.height(), 160.0);
    }

    #[test]
    fn test_bar_rasterizes_with_partial_top() {
        let mut surface = TerminalSurface::new(4, 3);
        let height = surface.height();
        // 12 units tall: one full row plus half of the next
        let rect = Rect {
            x: 0.0,
            y: height - 12.0,
            width: 4.0,
            height: 12.0,
        };
        surface.fill_rect(rect, bar_fill(height));

        assert_eq!(surface.cell(0, 2).map(|(c, _)| c), Some('█'));
        assert_eq!(surface.cell(0, 1).map(|(c, _)| c), Some('▄'));
        assert_eq!(surface.cell(0, 0), None);
        assert_eq!(surface.cell(1, 2), None);
    }

    #[test]
    fn test_narrow_slivers_are_skipped() {
        let mut surface = TerminalSurface::new(4, 1);
        let rect = Rect {
            x: 3.5,
            y: 0.0,
            width: 1.0,
            height: 8.0,
        };
        surface.fill_rect(rect, flat());
        assert!((0..4).all(|c| surface.cell(c, 0).is_none()));
    }

    #[test]
    fn test_clear_and_resize_reset_cells() {
        let mut surface = TerminalSurface::new(2, 1);
        let rect = Rect {
            x: 0.0,
            y: 0.0,
            width: 8.0,
            height: 8.0,
        };
        surface.fill_rect(rect, flat());
        assert!(surface.cell(0, 0).is_some());

        surface.clear(BACKGROUND);
        assert!(surface.cell(0, 0).is_none());

        surface.fill_rect(rect, flat());
        surface.resize(3, 2);
        assert_eq!(surface.size(), (3, 2));
        assert!(surface.cell(0, 0).is_none());
    }

    #[test]
    fn test_widget_renders_into_buffer() {
        let mut surface = TerminalSurface::new(2, 1);
        surface.fill_rect(
            Rect {
                x: 0.0,
                y: 0.0,
                width: 4.0,
                height: 8.0,
            },
            flat(),
        );

        let area = Area::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        (&surface).render(area, &mut buf);

        assert_eq!(buf[(0, 0)].symbol(), "█");
        assert_eq!(buf[(1, 0)].symbol(), " ");
    }
}
