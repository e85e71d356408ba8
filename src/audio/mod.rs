mod analyser;
mod capture;

use crate::media::MediaElement;
use anyhow::Context;
use log::{debug, warn};

pub use analyser::{SpectrumAnalyser, MAX_DECIBELS, MIN_DECIBELS, SMOOTHING_TIME_CONSTANT};
pub use capture::{input_device_names, CpalBackend, CpalContext};

pub const FFT_SIZE: usize = 256;
pub const BIN_COUNT: usize = FFT_SIZE / 2;
/// Loudness at full scale on every bin.
pub const MAX_AMPLITUDE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

/// Frequency-domain tap on an audio graph.
pub trait Analyser {
    fn frequency_bin_count(&self) -> usize;
    /// Fills `out` with the current magnitudes, one byte per bin.
    fn byte_frequency_data(&mut self, out: &mut [u8]);
}

pub trait AudioContext {
    fn state(&self) -> ContextState;
    fn suspend(&mut self) -> anyhow::Result<()>;
    fn resume(&mut self) -> anyhow::Result<()>;
    fn close(&mut self) -> anyhow::Result<()>;
    /// Routes `media` through a new analyser into the destination.
    fn analyse_media(
        &mut self,
        media: &dyn MediaElement,
        fft_size: usize,
    ) -> anyhow::Result<Box<dyn Analyser>>;
}

pub trait AudioBackend {
    fn create_context(&mut self) -> anyhow::Result<Box<dyn AudioContext>>;
}

/// Audio graph plus the bin buffer it is read into.
pub struct AudioSession {
    context: Box<dyn AudioContext>,
    analyser: Box<dyn Analyser>,
    bins: Vec<u8>,
}

impl AudioSession {
    pub fn open(backend: &mut dyn AudioBackend, media: &dyn MediaElement) -> anyhow::Result<Self> {
        let mut context = backend.create_context().context("create audio context")?;
        let analyser = match context.analyse_media(media, FFT_SIZE) {
            Ok(a) => a,
            Err(err) => {
                if let Err(close_err) = context.close() {
                    warn!("audio close after failed connect: {close_err:#}");
                }
                return Err(err.context("connect analyser"));
            }
        };
        let bins = vec![0u8; analyser.frequency_bin_count()];
        Ok(Self {
            context,
            analyser,
            bins,
        })
    }

    pub fn state(&self) -> ContextState {
        self.context.state()
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn suspend(&mut self) {
        if self.context.state() != ContextState::Running {
            return;
        }
        if let Err(err) = self.context.suspend() {
            warn!("audio suspend failed: {err:#}");
        }
    }

    pub fn resume_if_suspended(&mut self) {
        if self.context.state() != ContextState::Suspended {
            return;
        }
        if let Err(err) = self.context.resume() {
            warn!("audio resume failed: {err:#}");
        }
    }

    pub fn close(&mut self) {
        if self.context.state() == ContextState::Closed {
            return;
        }
        if let Err(err) = self.context.close() {
            warn!("audio close failed: {err:#}");
        }
    }

    fn sample(&mut self) -> Option<f32> {
        if self.bins.is_empty() || self.context.state() == ContextState::Closed {
            return None;
        }
        self.analyser.byte_frequency_data(&mut self.bins);
        Some(loudness(&self.bins))
    }
}

/// Owns the lazily built audio session and turns its spectrum into a
/// displacement amplitude.
#[derive(Default)]
pub struct AudioDriver {
    session: Option<AudioSession>,
}

impl AudioDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&AudioSession> {
        self.session.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.bins.is_empty())
    }

    /// Opens the session on the first call; later calls only resume a
    /// suspended engine. Returns whether a session exists afterwards.
    pub fn activate(&mut self, backend: &mut dyn AudioBackend, media: &dyn MediaElement) -> bool {
        if let Some(session) = self.session.as_mut() {
            debug!("audio session reused");
            session.resume_if_suspended();
            return true;
        }
        match AudioSession::open(backend, media) {
            Ok(mut session) => {
                session.resume_if_suspended();
                self.session = Some(session);
                true
            }
            Err(err) => {
                warn!("audio analysis unavailable: {err:#}");
                false
            }
        }
    }

    /// Loudness in `[0, MAX_AMPLITUDE]`, or `None` while there is nothing
    /// to read from yet.
    pub fn sample_loudness(&mut self) -> Option<f32> {
        self.session.as_mut()?.sample()
    }

    /// Pauses a running engine until the next `activate`.
    pub fn suspend(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.suspend();
        }
    }

    pub fn close(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.close();
        }
    }
}

/// Mean bin magnitude, normalised and scaled to `MAX_AMPLITUDE`.
pub fn loudness(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| b as u32).sum();
    let average = sum as f32 / bins.len() as f32;
    (average / 255.0) * MAX_AMPLITUDE
}
