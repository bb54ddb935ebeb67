use crate::audio::bands::{
    BAND_COUNT, EQ_BANDS, GAIN_STEP_DB, MAX_GAIN_DB, MIN_GAIN_DB, find_band,
};
use crate::error::ControlError;

pub const VOLUME_STEP: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlId {
    Volume,
    Band(usize),
}

impl ControlId {
    /// Slider order on screen.
    pub const ALL: [ControlId; BAND_COUNT + 1] = [
        ControlId::Volume,
        ControlId::Band(0),
        ControlId::Band(1),
        ControlId::Band(2),
        ControlId::Band(3),
        ControlId::Band(4),
    ];

    pub fn label(self) -> &'static str {
        match self {
            ControlId::Volume => "VOLUME",
            ControlId::Band(i) => EQ_BANDS.get(i).map(|b| b.label).unwrap_or("?"),
        }
    }

    pub fn step(self) -> f32 {
        match self {
            ControlId::Volume => VOLUME_STEP,
            ControlId::Band(_) => GAIN_STEP_DB,
        }
    }

    pub fn range(self) -> (f32, f32) {
        match self {
            ControlId::Volume => (0.0, 1.0),
            ControlId::Band(_) => (MIN_GAIN_DB, MAX_GAIN_DB),
        }
    }

    /// Snaps `value` to the slider's step and bounds.
    pub fn clamp(self, value: f32) -> Result<f32, ControlError> {
        if !value.is_finite() {
            return Err(ControlError::NonFinite);
        }
        let (lo, hi) = self.range();
        let step = self.step();
        let snapped = (value / step).round() / step.recip();
        Ok(snapped.clamp(lo, hi))
    }
}

/// Which slider keyboard adjustments apply to.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    row: usize,
}

impl Selection {
    pub fn current(&self) -> ControlId {
        ControlId::ALL[self.row]
    }

    pub fn next(&mut self) {
        self.row = (self.row + 1) % ControlId::ALL.len();
    }

    pub fn previous(&mut self) {
        self.row = (self.row + ControlId::ALL.len() - 1) % ControlId::ALL.len();
    }
}

/// Parses a `BAND=DB` assignment such as `bass=4` or `2=-3`.
pub fn parse_band_gain(text: &str) -> Result<(usize, f32), ControlError> {
    let (band, value) = text
        .split_once('=')
        .ok_or_else(|| ControlError::Malformed(text.to_string()))?;
    let index = find_band(band.trim()).ok_or_else(|| ControlError::Malformed(text.to_string()))?;
    let db: f32 = value
        .trim()
        .parse()
        .map_err(|_| ControlError::Malformed(text.to_string()))?;
    let db = ControlId::Band(index).clamp(db)?;
    Ok((index, db))
}
