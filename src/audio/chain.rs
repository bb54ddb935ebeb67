use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use super::analyser::AnalysisTap;
use super::bands::{BAND_COUNT, BandState, EQ_BANDS};
use super::context::{AudioContext, ContextFactory, ContextState};
use super::graph::{FilterStage, GainStage, SignalGraph};
use super::param::LiveParam;
use super::source::{SourceHandle, SourceId};
use crate::error::{ChainError, ControlError};

/// Volume a fresh session starts with.
pub const DEFAULT_VOLUME: f32 = 0.8;

static NEXT_CHAIN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(u64);

/// Control-side view of a built chain: its live parameters and its tap.
#[derive(Clone)]
pub struct ChainHandle {
    id: ChainId,
    source: SourceId,
    band_gains: [LiveParam; BAND_COUNT],
    master: LiveParam,
    tap: AnalysisTap,
}

impl PartialEq for ChainHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::fmt::Debug for ChainHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainHandle")
            .field("id", &self.id)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl ChainHandle {
    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Live gain parameter of stage `index`, in dB.
    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.band_gains.get(index).map(LiveParam::get)
    }

    /// Live master gain parameter.
    pub fn master_volume(&self) -> f32 {
        self.master.get()
    }

    pub fn tap(&self) -> &AnalysisTap {
        &self.tap
    }
}

/// Builds and owns the session's signal chain.
///
/// The context is created on the first successful `start` and kept for the
/// rest of the session. A chain is rebuilt only when the source changes.
pub struct SignalChainBuilder<F: ContextFactory> {
    factory: F,
    context: Option<F::Context>,
    chain: Option<ChainHandle>,
    bands: [BandState; BAND_COUNT],
    volume: f32,
    chains_built: usize,
}

impl<F: ContextFactory> SignalChainBuilder<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            context: None,
            chain: None,
            bands: BandState::flat(),
            volume: DEFAULT_VOLUME,
            chains_built: 0,
        }
    }

    /// Returns the chain for `source`, building it on first use.
    ///
    /// Nothing is committed unless every step succeeds, so a failed attempt
    /// can simply be retried on the next play action.
    pub fn start(&mut self, source: &SourceHandle) -> Result<ChainHandle, ChainError> {
        if let Some(chain) = &self.chain {
            if chain.source == source.id() {
                return Ok(chain.clone());
            }
        }

        let mut created = None;
        let (sample_rate, channels) = match &self.context {
            Some(ctx) => (ctx.sample_rate(), ctx.channels()),
            None => {
                let ctx = self.factory.create()?;
                let format = (ctx.sample_rate(), ctx.channels());
                created = Some(ctx);
                format
            }
        };

        let band_gains: [LiveParam; BAND_COUNT] =
            std::array::from_fn(|i| LiveParam::new(self.bands[i].gain_db));
        let stages = EQ_BANDS
            .iter()
            .zip(&band_gains)
            .map(|(band, gain)| FilterStage::new(band, gain.clone(), sample_rate, channels))
            .collect::<Result<Vec<_>, _>>()?;
        let master = LiveParam::new(self.volume);
        let tap = AnalysisTap::new();
        let node = source.attach(sample_rate)?;

        let graph = SignalGraph::new(node, stages, GainStage::new(master.clone()), tap.clone());
        if let Some(ctx) = created {
            self.context = Some(ctx);
        }
        let Some(ctx) = self.context.as_mut() else {
            return Err(ChainError::ContextUnavailable("context vanished".into()));
        };
        ctx.connect(graph);

        let handle = ChainHandle {
            id: ChainId(NEXT_CHAIN_ID.fetch_add(1, Ordering::Relaxed)),
            source: source.id(),
            band_gains,
            master,
            tap,
        };
        self.chains_built += 1;
        info!(
            source = %source.id(),
            track = source.name(),
            sample_rate,
            channels,
            "signal chain built"
        );
        self.chain = Some(handle.clone());
        Ok(handle)
    }

    /// Sets the gain of band `index`. Out-of-range indices change nothing.
    pub fn set_band_gain(&mut self, index: usize, db: f32) -> Result<(), ControlError> {
        let band = self
            .bands
            .get_mut(index)
            .ok_or(ControlError::BandIndex(index))?;
        band.gain_db = db;
        if let Some(chain) = &self.chain {
            chain.band_gains[index].set(db);
        }
        debug!(band = EQ_BANDS[index].label, db, "band gain");
        Ok(())
    }

    /// Sets the master gain. The caller keeps `volume` within [0, 1].
    pub fn set_master_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(chain) = &self.chain {
            chain.master.set(volume);
        }
        debug!(volume, "master volume");
    }

    /// Resumes a suspended context. No-op without a context.
    pub fn resume(&mut self) -> Result<(), ChainError> {
        match self.context.as_mut() {
            Some(ctx) if ctx.state() == ContextState::Suspended => ctx.resume(),
            _ => Ok(()),
        }
    }

    pub fn chain(&self) -> Option<&ChainHandle> {
        self.chain.as_ref()
    }

    pub fn context(&self) -> Option<&F::Context> {
        self.context.as_ref()
    }

    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.bands.get(index).map(|b| b.gain_db)
    }

    pub fn master_volume(&self) -> f32 {
        self.volume
    }

    /// Number of graphs constructed this session.
    pub fn chains_built(&self) -> usize {
        self.chains_built
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::context::OfflineContextFactory;
    use crate::audio::source::DecodedAudio;

    fn source() -> SourceHandle {
        let audio = DecodedAudio {
            samples: vec![0.0; 4800],
            channels: 1,
            sample_rate: 48_000,
        };
        SourceHandle::from_audio("silence", audio)
    }

    fn builder() -> SignalChainBuilder<OfflineContextFactory> {
        SignalChainBuilder::new(OfflineContextFactory::new(48_000, 2))
    }

    #[test]
    fn start_is_idempotent_per_source() {
        let mut builder = builder();
        let track = source();
        let first = builder.start(&track).unwrap();
        let second = builder.start(&track).unwrap();
        assert_eq!(first, second);
        assert_eq!(builder.chains_built(), 1);
        assert_eq!(builder.factory.created, 1);
    }

    #[test]
    fn every_band_gain_reaches_its_stage() {
        let mut builder = builder();
        let chain = builder.start(&source()).unwrap();
        for index in 0..BAND_COUNT {
            for db in [-15.0, -7.0, 0.0, 4.0, 15.0] {
                builder.set_band_gain(index, db).unwrap();
                assert_eq!(chain.band_gain(index), Some(db));
            }
        }
    }

    #[test]
    fn master_volume_is_independent_of_bands() {
        let mut builder = builder();
        let chain = builder.start(&source()).unwrap();
        builder.set_band_gain(1, 9.0).unwrap();
        for v in [0.0, 0.01, 0.5, 1.0] {
            builder.set_master_volume(v);
            assert_eq!(chain.master_volume(), v);
        }
        assert_eq!(chain.band_gain(1), Some(9.0));
    }

    #[test]
    fn out_of_range_band_is_a_no_op_error() {
        let mut builder = builder();
        let chain = builder.start(&source()).unwrap();
        assert_eq!(builder.set_band_gain(5, 3.0), Err(ControlError::BandIndex(5)));
        assert!((0..BAND_COUNT).all(|i| chain.band_gain(i) == Some(0.0)));
    }

    #[test]
    fn settings_made_before_start_seed_the_chain() {
        let mut builder = builder();
        builder.set_band_gain(0, -6.0).unwrap();
        builder.set_master_volume(0.3);
        let chain = builder.start(&source()).unwrap();
        assert_eq!(chain.band_gain(0), Some(-6.0));
        assert_eq!(chain.master_volume(), 0.3);
    }

    #[test]
    fn failed_context_leaves_nothing_behind() {
        let mut builder = SignalChainBuilder::new(OfflineContextFactory::new(48_000, 2).failing(1));
        let track = source();
        assert!(matches!(
            builder.start(&track),
            Err(ChainError::ContextUnavailable(_))
        ));
        assert!(builder.chain().is_none());
        assert!(builder.context().is_none());
        assert!(!track.is_attached());

        let chain = builder.start(&track).unwrap();
        assert_eq!(builder.chain(), Some(&chain));
        assert_eq!(builder.chains_built(), 1);
    }

    #[test]
    fn rejected_stage_leaves_source_unattached() {
        // 8 kHz output cannot host the 8 kHz treble shelf.
        let mut builder = SignalChainBuilder::new(OfflineContextFactory::new(8_000, 1));
        let track = source();
        assert!(matches!(
            builder.start(&track),
            Err(ChainError::InvalidStage { .. })
        ));
        assert!(builder.chain().is_none());
        assert!(!track.is_attached());
    }

    #[test]
    fn new_source_rebuilds_on_the_same_context() {
        let mut builder = builder();
        builder.set_band_gain(2, 5.0).unwrap();
        let first = builder.start(&source()).unwrap();
        let second = builder.start(&source()).unwrap();
        assert_ne!(first, second);
        assert_eq!(second.band_gain(2), Some(5.0));
        assert_eq!(builder.chains_built(), 2);
        assert_eq!(builder.factory.created, 1);
    }

    #[test]
    fn resume_without_context_is_a_no_op() {
        let mut builder = builder();
        assert!(builder.resume().is_ok());
        builder.start(&source()).unwrap();
        assert_eq!(builder.context().map(|c| c.state()), Some(ContextState::Suspended));
        builder.resume().unwrap();
        assert_eq!(builder.context().map(|c| c.state()), Some(ContextState::Running));
    }
}
