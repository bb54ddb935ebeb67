//! Terminal-backed canvas.
//!
//! A cell is drawn as a `▀` half block, so it shows two vertically stacked
//! pixels and is treated as 1 logical unit wide and 2 units tall. The
//! backing surface holds `density` pixels per logical unit on both axes;
//! each half cell averages a `density × density` block when painted.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::Widget;
use tracing::debug;

use super::color::Rgba;
use super::surface::Surface;

/// Logical units per terminal row.
pub const CELL_ASPECT: usize = 2;
pub const MAX_DENSITY: u32 = 4;

pub struct Canvas {
    cols: u16,
    rows: u16,
    density: u32,
    surface: Surface,
    resizes: u64,
}

impl Canvas {
    pub fn new(density: u32) -> Self {
        let density = density.clamp(1, MAX_DENSITY);
        Self {
            cols: 0,
            rows: 0,
            density,
            surface: Surface::new(0, 0, density as f32),
            resizes: 0,
        }
    }

    /// Reallocates the backing surface for a `cols × rows` cell area.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        let d = self.density as usize;
        self.cols = cols;
        self.rows = rows;
        self.surface = Surface::new(
            cols as usize * d,
            rows as usize * CELL_ASPECT * d,
            self.density as f32,
        );
        self.resizes += 1;
        debug!(
            cols,
            rows,
            width = self.surface.width(),
            height = self.surface.height(),
            "canvas resized"
        );
    }

    pub fn cells(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    pub fn density(&self) -> u32 {
        self.density
    }

    pub fn resize_count(&self) -> u64 {
        self.resizes
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn view(&self) -> CanvasView<'_> {
        CanvasView { canvas: self }
    }

    /// Mean color of a half cell.
    fn half_cell(&self, col: u16, half_row: usize) -> Rgba {
        let d = self.density as usize;
        let (x0, y0) = (col as usize * d, half_row * d);
        let mut sum = (0.0, 0.0, 0.0);
        let mut n = 0.0;
        for y in y0..y0 + d {
            for x in x0..x0 + d {
                if let Some(p) = self.surface.pixel(x, y) {
                    sum = (sum.0 + p.r, sum.1 + p.g, sum.2 + p.b);
                    n += 1.0;
                }
            }
        }
        if n == 0.0 {
            return Rgba::BLACK;
        }
        Rgba {
            r: sum.0 / n,
            g: sum.1 / n,
            b: sum.2 / n,
            a: 1.0,
        }
    }
}

/// Terminal color of an opaque `color`.
pub fn term_color(color: Rgba) -> Color {
    let (r, g, b) = color.to_rgb8();
    Color::Rgb(r, g, b)
}

/// Paints a [`Canvas`] with half-block glyphs.
pub struct CanvasView<'a> {
    canvas: &'a Canvas,
}

impl Widget for CanvasView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (cols, rows) = self.canvas.cells();
        for row in 0..area.height.min(rows) {
            for col in 0..area.width.min(cols) {
                let top = self.canvas.half_cell(col, row as usize * CELL_ASPECT);
                let bottom = self.canvas.half_cell(col, row as usize * CELL_ASPECT + 1);
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_char('▀')
                        .set_fg(term_color(top))
                        .set_bg(term_color(bottom));
                }
            }
        }
    }
}
