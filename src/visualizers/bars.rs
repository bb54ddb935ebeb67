use super::color::{Rgba, hsl, hsla};
use super::surface::{LinearGradient, Paint, Surface};

pub const BAR_COUNT: usize = 72;
/// Fraction of the canvas height a full-scale bar reaches.
pub const MAX_HEIGHT_RATIO: f32 = 0.9;
/// Bars never shrink below this fraction of the canvas height.
pub const MIN_HEIGHT_RATIO: f32 = 0.04;
/// Below 1 this lifts mid-level energy relative to a linear mapping.
pub const HEIGHT_EXPONENT: f32 = 0.85;
/// Hue sweep across the field, in degrees.
pub const HUE_SWEEP: f32 = 300.0;
/// Extra hue for a full-scale bar, in degrees.
pub const LEVEL_HUE_SHIFT: f32 = 60.0;
/// Shadow blur radius in logical units.
pub const SHADOW_BLUR: f32 = 2.5;

/// Geometry and color of one bar for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub index: usize,
    pub bin: usize,
    /// Normalized level in [0, 1].
    pub value: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub hue_top: f32,
    pub hue_mid: f32,
    pub hue_bottom: f32,
}

/// Snapshot bin a bar reads from. Nearest sample, no averaging.
pub fn bar_bin(index: usize, bin_count: usize) -> usize {
    index * bin_count / BAR_COUNT
}

pub fn bar_height(value: f32, canvas_height: f32) -> f32 {
    let max_height = MAX_HEIGHT_RATIO * canvas_height;
    let min_height = MIN_HEIGHT_RATIO * canvas_height;
    (value.powf(HEIGHT_EXPONENT) * max_height).max(min_height)
}

/// Lays out every bar for one snapshot on a `width × height` canvas.
pub fn layout(bins: &[u8], width: f32, height: f32, out: &mut Vec<Bar>) {
    out.clear();
    if bins.is_empty() {
        return;
    }
    let slot = width / BAR_COUNT as f32;
    for index in 0..BAR_COUNT {
        let bin = bar_bin(index, bins.len());
        let value = bins[bin] as f32 / 255.0;
        let bar_height = bar_height(value, height);

        let base_hue = index as f32 / BAR_COUNT as f32 * HUE_SWEEP;
        let level_shift = value * LEVEL_HUE_SHIFT;
        out.push(Bar {
            index,
            bin,
            value,
            x: index as f32 * slot + slot * 0.1,
            y: height - bar_height,
            width: slot * 0.8,
            height: bar_height,
            hue_top: (base_hue + level_shift) % 360.0,
            hue_mid: (base_hue + level_shift + 40.0) % 360.0,
            hue_bottom: (base_hue + 120.0) % 360.0,
        });
    }
}

/// Paints one bar: glow, gradient body, then the light spine.
pub fn paint_bar(surface: &mut Surface, bar: &Bar) {
    let Bar {
        x, y, width: w, height: h, ..
    } = *bar;

    let glow = hsla(bar.hue_mid, 1.0, 0.65, 0.6 + bar.value * 0.6);
    surface.shadow(x, y, w, h, SHADOW_BLUR, glow);

    let body = LinearGradient::new((x, y), (x, y + h))
        .stop(0.0, hsl(bar.hue_top, 0.95, 0.65))
        .stop(0.5, hsl(bar.hue_mid, 0.95, 0.60))
        .stop(1.0, hsla(bar.hue_bottom, 0.95, 0.55, 0.15));
    surface.fill_rounded_top(x, y, w, h, w * 0.4, &Paint::Linear(body));

    let spine_x = x + w / 2.0;
    let spine = LinearGradient::new((spine_x, y), (spine_x, y + h))
        .stop(0.0, Rgba::WHITE.with_alpha(0.95))
        .stop(1.0, Rgba::WHITE.with_alpha(0.0));
    surface.fill_rect(
        spine_x - w * 0.1,
        y + h * 0.05,
        w * 0.2,
        h * 0.85,
        &Paint::Linear(spine),
    );
}
