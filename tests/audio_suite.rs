mod common;

use approx::assert_abs_diff_eq;
use chroma_overlay::audio::{
    loudness, Analyser, AudioDriver, ContextState, SpectrumAnalyser, BIN_COUNT, FFT_SIZE,
    MAX_AMPLITUDE,
};
use chroma_overlay::media::MediaClock;
use common::FakeAudio;
use ringbuf::traits::{Producer as _, Split as _};
use ringbuf::HeapRb;
use std::f32::consts::PI;

#[test]
fn analyser_geometry() {
    assert_eq!(FFT_SIZE, 256);
    assert_eq!(BIN_COUNT, 128);
    assert_eq!(MAX_AMPLITUDE, 0.5);
}

#[test]
fn loudness_of_silence_is_zero() {
    assert_eq!(loudness(&[0u8; BIN_COUNT]), 0.0);
    assert_eq!(loudness(&[]), 0.0);
}

#[test]
fn loudness_at_full_scale_is_max_amplitude() {
    assert_abs_diff_eq!(loudness(&[255u8; BIN_COUNT]), 0.5, epsilon = 1e-6);
}

#[test]
fn loudness_is_mean_over_bins() {
    let mut bins = [0u8; BIN_COUNT];
    bins[..BIN_COUNT / 2].fill(255);
    assert_abs_diff_eq!(loudness(&bins), 0.25, epsilon = 1e-6);

    let bins = [51u8; BIN_COUNT];
    assert_abs_diff_eq!(loudness(&bins), 0.1, epsilon = 1e-6);
}

#[test]
fn loudness_stays_in_range() {
    let mut seed = 0x2545_f491u32;
    for _ in 0..200 {
        let mut bins = [0u8; BIN_COUNT];
        for b in bins.iter_mut() {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            *b = (seed >> 24) as u8;
        }
        let l = loudness(&bins);
        assert!((0.0..=MAX_AMPLITUDE).contains(&l), "{l} out of range");
    }
}

// ── Spectrum analyser ───────────────────────────────────────────────────────

#[test]
fn spectrum_of_silence_is_zero() {
    let (_prod, cons) = HeapRb::<f32>::new(1024).split();
    let mut analyser = SpectrumAnalyser::new(FFT_SIZE, cons);
    assert_eq!(analyser.frequency_bin_count(), BIN_COUNT);

    let mut bins = [7u8; BIN_COUNT];
    analyser.byte_frequency_data(&mut bins);
    assert!(bins.iter().all(|&b| b == 0));
}

#[test]
fn spectrum_peaks_at_tone_bin() {
    let (mut prod, cons) = HeapRb::<f32>::new(1024).split();
    let mut analyser = SpectrumAnalyser::new(FFT_SIZE, cons);

    let tone_bin = 8usize;
    let samples: Vec<f32> = (0..FFT_SIZE)
        .map(|i| (2.0 * PI * tone_bin as f32 * i as f32 / FFT_SIZE as f32).sin())
        .collect();
    assert_eq!(prod.push_slice(&samples), FFT_SIZE);

    let mut bins = [0u8; BIN_COUNT];
    analyser.byte_frequency_data(&mut bins);
    let (peak, value) = bins
        .iter()
        .enumerate()
        .max_by_key(|(_, v)| **v)
        .expect("bins");
    assert_eq!(peak, tone_bin);
    assert_eq!(*value, 255);
    assert!(bins[64] < *value);
}

#[test]
fn spectrum_decays_after_signal_stops() {
    let (mut prod, cons) = HeapRb::<f32>::new(1024).split();
    let mut analyser = SpectrumAnalyser::new(FFT_SIZE, cons);
    let tone: Vec<f32> = (0..FFT_SIZE)
        .map(|i| (2.0 * PI * 16.0 * i as f32 / FFT_SIZE as f32).sin())
        .collect();
    prod.push_slice(&tone);
    let first = analyser.analyse()[16];

    prod.push_slice(&[0.0; FFT_SIZE]);
    let second = analyser.analyse()[16];
    assert!(second < first);
    assert!(second > 0.0, "smoothing keeps part of the previous frame");
}

// ── Driver ──────────────────────────────────────────────────────────────────

#[test]
fn driver_is_not_ready_before_activation() {
    let mut driver = AudioDriver::new();
    assert!(!driver.is_ready());
    assert_eq!(driver.sample_loudness(), None);
}

#[test]
fn driver_builds_session_once() {
    let audio = FakeAudio::new();
    let mut backend = audio.backend();
    let track = MediaClock::new(5.0);
    let mut driver = AudioDriver::new();

    assert!(driver.activate(backend.as_mut(), &track));
    assert!(driver.activate(backend.as_mut(), &track));
    assert!(driver.activate(backend.as_mut(), &track));
    assert_eq!(audio.contexts_created.get(), 1);
    assert_eq!(audio.analysers_created.get(), 1);
    assert_eq!(driver.session().map(|s| s.bins().len()), Some(BIN_COUNT));
}

#[test]
fn driver_resumes_suspended_engine() {
    let audio = FakeAudio::new();
    audio.start_suspended.set(true);
    let mut backend = audio.backend();
    let track = MediaClock::new(5.0);
    let mut driver = AudioDriver::new();

    driver.activate(backend.as_mut(), &track);
    assert_eq!(audio.resumes.get(), 1);
    assert_eq!(audio.state.get(), ContextState::Running);

    // Running engines are left alone.
    driver.activate(backend.as_mut(), &track);
    assert_eq!(audio.resumes.get(), 1);

    audio.state.set(ContextState::Suspended);
    driver.activate(backend.as_mut(), &track);
    assert_eq!(audio.resumes.get(), 2);
    assert_eq!(audio.contexts_created.get(), 1);
}

#[test]
fn suspended_driver_resumes_on_next_activation() {
    let audio = FakeAudio::new();
    let mut backend = audio.backend();
    let track = MediaClock::new(5.0);
    let mut driver = AudioDriver::new();

    driver.suspend();
    assert_eq!(audio.suspends.get(), 0, "nothing to suspend before activation");

    driver.activate(backend.as_mut(), &track);
    driver.suspend();
    driver.suspend();
    assert_eq!(audio.suspends.get(), 1, "only a running engine is suspended");
    assert_eq!(driver.session().map(|s| s.state()), Some(ContextState::Suspended));

    assert!(driver.activate(backend.as_mut(), &track));
    assert_eq!(audio.resumes.get(), 1);
    assert_eq!(audio.state.get(), ContextState::Running);
    assert_eq!(audio.contexts_created.get(), 1);

    driver.close();
    driver.suspend();
    assert_eq!(audio.suspends.get(), 1, "a closed engine stays closed");
}

#[test]
fn driver_samples_loudness_from_bins() {
    let audio = FakeAudio::new();
    let mut backend = audio.backend();
    let mut driver = AudioDriver::new();
    driver.activate(backend.as_mut(), &MediaClock::new(5.0));

    audio.level.set(255);
    assert_eq!(driver.sample_loudness(), Some(0.5));
    audio.level.set(0);
    assert_eq!(driver.sample_loudness(), Some(0.0));
    assert_eq!(audio.reads.get(), 2);
}

#[test]
fn driver_failure_leaves_it_not_ready() {
    let audio = FakeAudio::new();
    audio.fail.set(true);
    let mut backend = audio.backend();
    let mut driver = AudioDriver::new();

    assert!(!driver.activate(backend.as_mut(), &MediaClock::new(5.0)));
    assert!(!driver.is_ready());
    assert_eq!(driver.sample_loudness(), None);

    audio.fail.set(false);
    assert!(driver.activate(backend.as_mut(), &MediaClock::new(5.0)));
    assert!(driver.is_ready());
}

#[test]
fn closed_driver_stops_sampling() {
    let audio = FakeAudio::new();
    let mut backend = audio.backend();
    let mut driver = AudioDriver::new();
    driver.activate(backend.as_mut(), &MediaClock::new(5.0));

    driver.close();
    driver.close();
    assert_eq!(audio.closes.get(), 1);
    assert_eq!(driver.sample_loudness(), None);
}
