use super::{Analyser, AudioBackend, AudioContext, ContextState, SpectrumAnalyser};
use crate::media::MediaElement;
use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample};
use log::{info, warn};
use ringbuf::traits::{Producer as _, Split as _};
use ringbuf::{HeapProd, HeapRb};

/// Names of the input devices the default host can open.
pub fn input_device_names() -> anyhow::Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;
    Ok(devices.map(|dev| device_name(&dev)).collect())
}

fn device_name(device: &cpal::Device) -> String {
    device.name().unwrap_or_else(|_| "<unknown>".to_string())
}

/// Audio engine backed by an input device. The device is expected to carry
/// what the audio track plays (a loopback or monitor source).
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    device_query: Option<String>,
}

impl CpalBackend {
    pub fn new(device_query: Option<String>) -> Self {
        Self { device_query }
    }

    /// The first device whose name contains the query (case-insensitive),
    /// or the host default when there is no query.
    fn device(&self, host: &cpal::Host) -> anyhow::Result<cpal::Device> {
        let Some(query) = self.device_query.as_deref() else {
            return host
                .default_input_device()
                .ok_or_else(|| anyhow!("no default input device found"));
        };
        let query = query.to_lowercase();
        host.input_devices()
            .context("enumerate input devices")?
            .find(|dev| device_name(dev).to_lowercase().contains(&query))
            .ok_or_else(|| anyhow!("no input device matching: {query}"))
    }
}

impl AudioBackend for CpalBackend {
    fn create_context(&mut self) -> anyhow::Result<Box<dyn AudioContext>> {
        let host = cpal::default_host();
        let device = self.device(&host)?;
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        info!(
            "audio context on {} ({} Hz, {} ch)",
            device_name(&device),
            supported.sample_rate().0,
            supported.channels()
        );
        Ok(Box::new(CpalContext {
            device,
            supported,
            streams: Vec::new(),
            state: ContextState::Running,
        }))
    }
}

/// One open input device. Each analysed media element gets its own stream;
/// suspend and resume pause and play all of them.
pub struct CpalContext {
    device: cpal::Device,
    supported: cpal::SupportedStreamConfig,
    streams: Vec<cpal::Stream>,
    state: ContextState,
}

impl CpalContext {
    /// Input stream that downmixes each frame to mono and feeds `prod`.
    fn open_stream<T>(
        &self,
        config: &cpal::StreamConfig,
        mut prod: HeapProd<f32>,
    ) -> anyhow::Result<cpal::Stream>
    where
        T: SizedSample + Sample<Float = f32>,
    {
        let channels = usize::from(config.channels.max(1));
        self.device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(channels) {
                        let sum: f32 = frame.iter().map(|s| s.to_float_sample()).sum();
                        if prod.try_push(sum / frame.len() as f32).is_err() {
                            break;
                        }
                    }
                },
                |err| warn!("audio stream error: {err}"),
                None,
            )
            .context("build input stream")
    }
}

impl AudioContext for CpalContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn suspend(&mut self) -> anyhow::Result<()> {
        if self.state == ContextState::Closed {
            return Err(anyhow!("audio context is closed"));
        }
        for stream in &self.streams {
            stream.pause().context("pause input stream")?;
        }
        self.state = ContextState::Suspended;
        Ok(())
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        if self.state == ContextState::Closed {
            return Err(anyhow!("audio context is closed"));
        }
        for stream in &self.streams {
            stream.play().context("resume input stream")?;
        }
        self.state = ContextState::Running;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        for stream in self.streams.drain(..) {
            if let Err(err) = stream.pause() {
                warn!("pause input stream on close: {err}");
            }
        }
        self.state = ContextState::Closed;
        Ok(())
    }

    fn analyse_media(
        &mut self,
        _media: &dyn MediaElement,
        fft_size: usize,
    ) -> anyhow::Result<Box<dyn Analyser>> {
        if self.state == ContextState::Closed {
            return Err(anyhow!("audio context is closed"));
        }
        let config: cpal::StreamConfig = self.supported.clone().into();
        // One second of mono samples, never less than a full FFT window.
        let capacity = (config.sample_rate.0 as usize).max(fft_size);
        let (prod, cons) = HeapRb::<f32>::new(capacity).split();

        let stream = match self.supported.sample_format() {
            SampleFormat::F32 => self.open_stream::<f32>(&config, prod)?,
            SampleFormat::I16 => self.open_stream::<i16>(&config, prod)?,
            SampleFormat::U16 => self.open_stream::<u16>(&config, prod)?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };
        if self.state == ContextState::Running {
            stream.play().context("start input stream")?;
        }
        self.streams.push(stream);

        Ok(Box::new(SpectrumAnalyser::new(fft_size, cons)))
    }
}
