//! A small software raster: an opaque RGB pixel grid drawn in logical
//! units and scaled by the pixel density.

use super::color::Rgba;

/// Linear gradient between two logical points.
#[derive(Debug, Clone)]
pub struct LinearGradient {
    start: (f32, f32),
    end: (f32, f32),
    stops: Vec<(f32, Rgba)>,
}

impl LinearGradient {
    pub fn new(start: (f32, f32), end: (f32, f32)) -> Self {
        Self {
            start,
            end,
            stops: Vec::with_capacity(3),
        }
    }

    /// Adds a stop at `offset` in [0, 1]. Stops must be added in order.
    pub fn stop(mut self, offset: f32, color: Rgba) -> Self {
        self.stops.push((offset.clamp(0.0, 1.0), color));
        self
    }

    pub fn color_at(&self, x: f32, y: f32) -> Rgba {
        let Some(&(_, first)) = self.stops.first() else {
            return Rgba::BLACK.with_alpha(0.0);
        };
        let (dx, dy) = (self.end.0 - self.start.0, self.end.1 - self.start.1);
        let len_sq = dx * dx + dy * dy;
        let t = if len_sq <= f32::EPSILON {
            0.0
        } else {
            (((x - self.start.0) * dx + (y - self.start.1) * dy) / len_sq).clamp(0.0, 1.0)
        };

        let mut prev = (0.0, first);
        for &(offset, color) in &self.stops {
            if t <= offset {
                let span = offset - prev.0;
                if span <= f32::EPSILON {
                    return color;
                }
                return prev.1.lerp(color, (t - prev.0) / span);
            }
            prev = (offset, color);
        }
        prev.1
    }
}

#[derive(Debug, Clone)]
pub enum Paint {
    Solid(Rgba),
    Linear(LinearGradient),
}

impl Paint {
    fn color_at(&self, x: f32, y: f32) -> Rgba {
        match self {
            Paint::Solid(color) => *color,
            Paint::Linear(gradient) => gradient.color_at(x, y),
        }
    }
}

fn overlap(px: f32, lo: f32, hi: f32) -> f32 {
    (hi.min(px + 1.0) - lo.max(px)).clamp(0.0, 1.0)
}

pub struct Surface {
    width: usize,
    height: usize,
    scale: f32,
    pixels: Vec<Rgba>,
}

impl Surface {
    pub fn new(width: usize, height: usize, scale: f32) -> Self {
        Self {
            width,
            height,
            scale: scale.max(f32::EPSILON),
            pixels: vec![Rgba::BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Size in logical units.
    pub fn logical_size(&self) -> (f32, f32) {
        (
            self.width as f32 / self.scale,
            self.height as f32 / self.scale,
        )
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn clear(&mut self, color: Rgba) {
        let color = color.over(Rgba::BLACK);
        self.pixels.fill(color);
    }

    fn blend(&mut self, x: usize, y: usize, color: Rgba, coverage: f32) {
        let idx = y * self.width + x;
        let src = color.with_alpha(color.a * coverage);
        self.pixels[idx] = src.over(self.pixels[idx]);
    }

    /// Pixel rows touched by the logical span `[y0, y1)`, with coverage.
    fn rows(&self, y0: f32, y1: f32) -> impl Iterator<Item = (usize, f32)> + use<> {
        let (lo, hi) = (y0 * self.scale, y1 * self.scale);
        let first = lo.floor().max(0.0) as usize;
        let last = (hi.ceil().max(0.0) as usize).min(self.height);
        (first..last).map(move |py| (py, overlap(py as f32, lo, hi)))
    }

    fn cols(&self, x0: f32, x1: f32) -> impl Iterator<Item = (usize, f32)> + use<> {
        let (lo, hi) = (x0 * self.scale, x1 * self.scale);
        let first = lo.floor().max(0.0) as usize;
        let last = (hi.ceil().max(0.0) as usize).min(self.width);
        (first..last).map(move |px| (px, overlap(px as f32, lo, hi)))
    }

    /// Fills a logical rectangle, anti-aliased on its edges.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: &Paint) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let inv = 1.0 / self.scale;
        for (py, cov_y) in self.rows(y, y + h) {
            for (px, cov_x) in self.cols(x, x + w) {
                let color = paint.color_at((px as f32 + 0.5) * inv, (py as f32 + 0.5) * inv);
                self.blend(px, py, color, cov_x * cov_y);
            }
        }
    }

    /// Fills a rectangle whose two top corners are rounded by `radius`.
    pub fn fill_rounded_top(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32, paint: &Paint) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let radius = radius.clamp(0.0, (w / 2.0).min(h));
        let inv = 1.0 / self.scale;
        for (py, cov_y) in self.rows(y, y + h) {
            let cy = (py as f32 + 0.5) * inv;
            let from_top = cy - y;
            let inset = if from_top < radius {
                let dy = radius - from_top;
                radius - (radius * radius - dy * dy).max(0.0).sqrt()
            } else {
                0.0
            };
            for (px, cov_x) in self.cols(x + inset, x + w - inset) {
                let color = paint.color_at((px as f32 + 0.5) * inv, cy);
                self.blend(px, py, color, cov_x * cov_y);
            }
        }
    }

    /// Soft shadow around a logical rectangle. Opacity falls off
    /// quadratically to zero at `blur` units from the edge.
    pub fn shadow(&mut self, x: f32, y: f32, w: f32, h: f32, blur: f32, color: Rgba) {
        if blur <= 0.0 || color.a <= 0.0 {
            return;
        }
        let inv = 1.0 / self.scale;
        for (py, _) in self.rows(y - blur, y + h + blur) {
            let cy = (py as f32 + 0.5) * inv;
            let dy = (y - cy).max(cy - (y + h)).max(0.0);
            for (px, _) in self.cols(x - blur, x + w + blur) {
                let cx = (px as f32 + 0.5) * inv;
                let dx = (x - cx).max(cx - (x + w)).max(0.0);
                let d = (dx * dx + dy * dy).sqrt();
                if d < blur {
                    let falloff = 1.0 - d / blur;
                    self.blend(px, py, color, falloff * falloff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_interpolates_between_stops() {
        let g = LinearGradient::new((0.0, 0.0), (0.0, 10.0))
            .stop(0.0, Rgba::BLACK)
            .stop(1.0, Rgba::WHITE);
        assert_eq!(g.color_at(3.0, 0.0), Rgba::BLACK);
        assert_eq!(g.color_at(0.0, 10.0), Rgba::WHITE);
        let mid = g.color_at(0.0, 5.0);
        assert!((mid.r - 0.5).abs() < 1e-6);
        // Clamped past the end points.
        assert_eq!(g.color_at(0.0, 50.0), Rgba::WHITE);
    }

    #[test]
    fn flat_segment_before_a_later_stop() {
        let navy = Rgba::rgb8(2, 6, 23);
        let g = LinearGradient::new((0.0, 0.0), (100.0, 0.0))
            .stop(0.0, navy)
            .stop(0.35, navy)
            .stop(1.0, Rgba::BLACK);
        assert_eq!(g.color_at(20.0, 0.0), navy);
        assert_eq!(g.color_at(100.0, 0.0), Rgba::BLACK);
    }

    #[test]
    fn rect_edges_get_partial_coverage() {
        let mut s = Surface::new(4, 1, 1.0);
        s.fill_rect(0.5, 0.0, 2.0, 1.0, &Paint::Solid(Rgba::WHITE));
        assert_eq!(s.pixel(0, 0).unwrap().to_rgb8(), (128, 128, 128));
        assert_eq!(s.pixel(1, 0).unwrap(), Rgba::WHITE);
        assert_eq!(s.pixel(2, 0).unwrap().to_rgb8(), (128, 128, 128));
        assert_eq!(s.pixel(3, 0).unwrap(), Rgba::BLACK);
    }

    #[test]
    fn scale_maps_logical_units_to_pixels() {
        let mut s = Surface::new(8, 8, 2.0);
        assert_eq!(s.logical_size(), (4.0, 4.0));
        s.fill_rect(1.0, 1.0, 1.0, 1.0, &Paint::Solid(Rgba::WHITE));
        assert_eq!(s.pixel(2, 2).unwrap(), Rgba::WHITE);
        assert_eq!(s.pixel(3, 3).unwrap(), Rgba::WHITE);
        assert_eq!(s.pixel(4, 4).unwrap(), Rgba::BLACK);
    }

    #[test]
    fn drawing_outside_is_clipped() {
        let mut s = Surface::new(2, 2, 1.0);
        s.fill_rect(-5.0, -5.0, 20.0, 20.0, &Paint::Solid(Rgba::WHITE));
        s.shadow(-3.0, -3.0, 1.0, 1.0, 10.0, Rgba::WHITE);
        assert_eq!(s.pixel(1, 1).unwrap().to_rgb8(), (255, 255, 255));
    }

    #[test]
    fn shadow_fades_with_distance() {
        let mut s = Surface::new(20, 1, 1.0);
        s.shadow(0.0, 0.0, 2.0, 1.0, 8.0, Rgba::WHITE);
        let near = s.pixel(3, 0).unwrap().r;
        let far = s.pixel(8, 0).unwrap().r;
        assert!(near > far);
        assert_eq!(s.pixel(12, 0).unwrap(), Rgba::BLACK);
    }

    #[test]
    fn rounded_top_trims_corners() {
        let mut s = Surface::new(10, 10, 1.0);
        s.fill_rounded_top(0.0, 0.0, 10.0, 10.0, 4.0, &Paint::Solid(Rgba::WHITE));
        assert_eq!(s.pixel(0, 0).unwrap(), Rgba::BLACK);
        assert_eq!(s.pixel(5, 0).unwrap(), Rgba::WHITE);
        assert_eq!(s.pixel(0, 9).unwrap(), Rgba::WHITE);
    }
}
