pub mod analyser;
pub mod bands;
pub mod chain;
pub mod context;
pub mod graph;
pub mod param;
pub mod source;

pub use analyser::{AnalyserSettings, AnalysisTap, BIN_COUNT, FFT_SIZE, SpectralSampler};
pub use bands::{BAND_COUNT, BandDefinition, BandState, EQ_BANDS, FilterShape};
pub use chain::{ChainHandle, DEFAULT_VOLUME, SignalChainBuilder};
pub use context::{
    AudioContext, ContextFactory, ContextState, CpalContextFactory, OfflineContext,
    OfflineContextFactory,
};
pub use source::{SourceHandle, SourceId};
