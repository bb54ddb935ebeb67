use biquad::Type;

/// Lowest gain a band accepts, in dB.
pub const MIN_GAIN_DB: f32 = -15.0;
/// Highest gain a band accepts, in dB.
pub const MAX_GAIN_DB: f32 = 15.0;
/// Control surface step for band gains, in dB.
pub const GAIN_STEP_DB: f32 = 1.0;

/// Filter response of a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterShape {
    LowShelf,
    Peaking,
    HighShelf,
}

impl FilterShape {
    /// Resonance (Q) used when building the stage.
    pub fn resonance(self) -> f32 {
        match self {
            FilterShape::Peaking => 1.2,
            FilterShape::LowShelf | FilterShape::HighShelf => 0.7,
        }
    }

    pub(crate) fn biquad_type(self, gain_db: f32) -> Type<f32> {
        match self {
            FilterShape::LowShelf => Type::LowShelf(gain_db),
            FilterShape::Peaking => Type::PeakingEQ(gain_db),
            FilterShape::HighShelf => Type::HighShelf(gain_db),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandDefinition {
    pub label: &'static str,
    pub shape: FilterShape,
    pub center_hz: f32,
}

pub const BAND_COUNT: usize = 5;

/// Bands in chain order, lowest first.
pub static EQ_BANDS: [BandDefinition; BAND_COUNT] = [
    BandDefinition {
        label: "SUB",
        shape: FilterShape::LowShelf,
        center_hz: 80.0,
    },
    BandDefinition {
        label: "BASS",
        shape: FilterShape::Peaking,
        center_hz: 250.0,
    },
    BandDefinition {
        label: "MID",
        shape: FilterShape::Peaking,
        center_hz: 1000.0,
    },
    BandDefinition {
        label: "HIGH MID",
        shape: FilterShape::Peaking,
        center_hz: 3500.0,
    },
    BandDefinition {
        label: "TREBLE",
        shape: FilterShape::HighShelf,
        center_hz: 8000.0,
    },
];

/// User-set gain of one band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandState {
    pub index: usize,
    pub gain_db: f32,
}

impl BandState {
    /// Flat settings for every band.
    pub fn flat() -> [BandState; BAND_COUNT] {
        std::array::from_fn(|index| BandState {
            index,
            gain_db: 0.0,
        })
    }
}

/// Finds a band by label (case and separator insensitive) or by index.
pub fn find_band(name: &str) -> Option<usize> {
    let wanted: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if let Ok(index) = wanted.parse::<usize>() {
        return (index < BAND_COUNT).then_some(index);
    }
    EQ_BANDS
        .iter()
        .position(|band| band.label.replace(' ', "") == wanted)
}
