//! Audio contexts: the platform side of the signal graph.
//!
//! A context owns the sink. The graph connected to it is pulled block by
//! block, either by a real-time `cpal` callback ([`CpalContext`]) or by the
//! caller ([`OfflineContext`]).

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use super::graph::SignalGraph;
use crate::error::ChainError;

/// The sink slot shared with the audio thread.
pub type SharedGraph = Arc<Mutex<Option<SignalGraph>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
}

pub trait AudioContext {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> usize;

    fn state(&self) -> ContextState;

    /// Starts pulling audio if the context is suspended.
    fn resume(&mut self) -> Result<(), ChainError>;

    /// Replaces whatever graph feeds the sink.
    fn connect(&mut self, graph: SignalGraph);
}

/// Creates the one context a session uses.
pub trait ContextFactory {
    type Context: AudioContext;

    fn create(&mut self) -> Result<Self::Context, ChainError>;
}

fn connect_slot(slot: &SharedGraph, graph: SignalGraph) {
    match slot.lock() {
        Ok(mut current) => *current = Some(graph),
        Err(poisoned) => *poisoned.into_inner() = Some(graph),
    }
}

/// Renders one block from the slot, or silence if nothing is connected.
fn render_slot(slot: &SharedGraph, out: &mut [f32], channels: usize) {
    match slot.lock() {
        Ok(mut graph) => match graph.as_mut() {
            Some(graph) => graph.render(out, channels),
            None => out.fill(0.0),
        },
        Err(_) => out.fill(0.0),
    }
}

/// Real-time output on the default `cpal` device.
///
/// Created suspended; nothing is heard until [`AudioContext::resume`].
pub struct CpalContext {
    slot: SharedGraph,
    sample_rate: u32,
    channels: usize,
    state: ContextState,
    stream: cpal::Stream,
}

impl CpalContext {
    pub fn open_default() -> Result<Self, ChainError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| ChainError::ContextUnavailable("no output device found".into()))?;

        let config: cpal::StreamConfig = device
            .default_output_config()
            .map_err(|e| ChainError::ContextUnavailable(e.to_string()))?
            .into();
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate;

        let slot: SharedGraph = Arc::new(Mutex::new(None));
        let callback_slot = Arc::clone(&slot);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    render_slot(&callback_slot, data, channels);
                },
                |err| error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| ChainError::ContextUnavailable(e.to_string()))?;
        // Some hosts start streams on creation.
        stream
            .pause()
            .map_err(|e| ChainError::ContextUnavailable(e.to_string()))?;

        match device.description() {
            Ok(desc) => info!(device = %desc, sample_rate, channels, "audio context created"),
            Err(_) => info!(sample_rate, channels, "audio context created"),
        }

        Ok(Self {
            slot,
            sample_rate,
            channels,
            state: ContextState::Suspended,
            stream,
        })
    }
}

impl AudioContext for CpalContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<(), ChainError> {
        if self.state == ContextState::Running {
            return Ok(());
        }
        self.stream
            .play()
            .map_err(|e| ChainError::ContextUnavailable(e.to_string()))?;
        self.state = ContextState::Running;
        info!("audio context resumed");
        Ok(())
    }

    fn connect(&mut self, graph: SignalGraph) {
        connect_slot(&self.slot, graph);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CpalContextFactory;

impl ContextFactory for CpalContextFactory {
    type Context = CpalContext;

    fn create(&mut self) -> Result<CpalContext, ChainError> {
        CpalContext::open_default()
    }
}

/// A context rendered on demand by the caller.
pub struct OfflineContext {
    slot: SharedGraph,
    sample_rate: u32,
    channels: usize,
    state: ContextState,
}

impl OfflineContext {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            sample_rate,
            channels,
            state: ContextState::Suspended,
        }
    }

    /// Pulls one block of interleaved frames through the connected graph.
    /// A suspended context renders silence without advancing the graph.
    pub fn render(&self, out: &mut [f32]) {
        if self.state == ContextState::Suspended {
            out.fill(0.0);
            return;
        }
        render_slot(&self.slot, out, self.channels);
    }
}

impl AudioContext for OfflineContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<(), ChainError> {
        self.state = ContextState::Running;
        Ok(())
    }

    fn connect(&mut self, graph: SignalGraph) {
        connect_slot(&self.slot, graph);
    }
}

/// Builds [`OfflineContext`]s. The first `failures` calls are refused, the
/// way a platform refuses audio before a user gesture.
#[derive(Debug, Clone)]
pub struct OfflineContextFactory {
    pub sample_rate: u32,
    pub channels: usize,
    pub failures: usize,
    pub created: usize,
}

impl OfflineContextFactory {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
            failures: 0,
            created: 0,
        }
    }

    pub fn failing(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }
}

impl ContextFactory for OfflineContextFactory {
    type Context = OfflineContext;

    fn create(&mut self) -> Result<OfflineContext, ChainError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(ChainError::ContextUnavailable(
                "audio is blocked until a user gesture".into(),
            ));
        }
        self.created += 1;
        Ok(OfflineContext::new(self.sample_rate, self.channels))
    }
}
