use super::Analyser;
use ringbuf::traits::Consumer as _;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

/// Byte spectrum over the most recent `fft_size` samples pulled from a ring
/// buffer: Blackman window, FFT, smoothing across reads, then decibels
/// mapped linearly from `[MIN_DECIBELS, MAX_DECIBELS]` onto `[0, 255]`.
pub struct SpectrumAnalyser {
    input: ringbuf::HeapCons<f32>,
    history: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    fft_buf: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyser {
    pub fn new(fft_size: usize, input: ringbuf::HeapCons<f32>) -> Self {
        let n = fft_size.max(2);
        let window = (0..n)
            .map(|i| {
                let x = 2.0 * PI * i as f32 / n as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();
        let mut planner = FftPlanner::<f32>::new();
        Self {
            input,
            history: vec![0.0; n],
            write_pos: 0,
            window,
            fft: planner.plan_fft_forward(n),
            fft_buf: vec![Complex { re: 0.0, im: 0.0 }; n],
            smoothed: vec![0.0; n / 2],
        }
    }

    fn drain_input(&mut self) {
        let n = self.history.len();
        while let Some(s) = self.input.try_pop() {
            self.history[self.write_pos] = s;
            self.write_pos = (self.write_pos + 1) % n;
        }
    }

    /// Smoothed linear magnitudes after pulling in pending samples.
    pub fn analyse(&mut self) -> &[f32] {
        self.drain_input();
        let n = self.history.len();
        for i in 0..n {
            let s = self.history[(self.write_pos + i) % n];
            self.fft_buf[i] = Complex {
                re: s * self.window[i],
                im: 0.0,
            };
        }
        self.fft.process(&mut self.fft_buf);

        let scale = 1.0 / n as f32;
        for (k, prev) in self.smoothed.iter_mut().enumerate() {
            let mag = self.fft_buf[k].norm() * scale;
            let v = SMOOTHING_TIME_CONSTANT * *prev + (1.0 - SMOOTHING_TIME_CONSTANT) * mag;
            *prev = if v.is_finite() { v } else { 0.0 };
        }
        &self.smoothed
    }
}

impl Analyser for SpectrumAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.smoothed.len()
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        let mags = self.analyse();
        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (dst, &m) in out.iter_mut().zip(mags) {
            let db = 20.0 * m.log10();
            let scaled = (255.0 / range) * (db - MIN_DECIBELS);
            *dst = if scaled.is_nan() {
                0
            } else {
                scaled.clamp(0.0, 255.0) as u8
            };
        }
    }
}
