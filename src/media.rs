use crate::shader::VideoFrame;
use glam::Vec3;
use std::cell::RefCell;
use std::rc::Rc;

/// Playback controls shared by the video source and the audio track.
pub trait MediaElement {
    fn play(&mut self);
    fn pause(&mut self);
    fn paused(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn looping(&self) -> bool;
    fn set_looping(&mut self, looping: bool);
}

/// A media element that also provides frames to a texture.
pub trait VideoSource: MediaElement {
    fn frame(&self) -> Option<&VideoFrame>;
}

pub type MediaRef = Rc<RefCell<dyn MediaElement>>;
pub type VideoRef = Rc<RefCell<dyn VideoSource>>;

/// Playback position of a finite-length media element, advanced by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaClock {
    duration: f64,
    position: f64,
    paused: bool,
    looping: bool,
}

impl MediaClock {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            position: 0.0,
            paused: true,
            looping: false,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn ended(&self) -> bool {
        self.position >= self.duration
    }

    pub fn advance(&mut self, dt: f64) {
        if self.paused || dt <= 0.0 {
            return;
        }
        self.position += dt;
        if self.position < self.duration {
            return;
        }
        if self.looping && self.duration > 0.0 {
            self.position %= self.duration;
        } else {
            self.position = self.duration;
            self.paused = true;
        }
    }
}

impl MediaElement for MediaClock {
    fn play(&mut self) {
        // Playing an element that reached its end starts it over.
        if self.ended() {
            self.position = 0.0;
        }
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.duration);
    }

    fn looping(&self) -> bool {
        self.looping
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }
}

/// Video source that shows one frame for as long as it plays.
pub struct StillVideo {
    pub clock: MediaClock,
    frame: VideoFrame,
}

impl StillVideo {
    pub fn new(frame: VideoFrame, duration: f64) -> Self {
        Self {
            clock: MediaClock::new(duration),
            frame,
        }
    }

    /// Key-coloured backdrop with a disc of `subject` in the middle.
    pub fn test_pattern(width: usize, height: usize, key: Vec3, subject: Vec3) -> Self {
        let mut frame = VideoFrame::solid(width, height, key);
        let cx = width as f32 * 0.5;
        let cy = height as f32 * 0.5;
        let r = width.min(height) as f32 * 0.3;
        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    frame.set_pixel(x, y, subject);
                }
            }
        }
        Self::new(frame, f64::INFINITY)
    }
}

impl MediaElement for StillVideo {
    fn play(&mut self) {
        self.clock.play();
    }

    fn pause(&mut self) {
        self.clock.pause();
    }

    fn paused(&self) -> bool {
        self.clock.paused()
    }

    fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.clock.set_current_time(seconds);
    }

    fn looping(&self) -> bool {
        self.clock.looping()
    }

    fn set_looping(&mut self, looping: bool) {
        self.clock.set_looping(looping);
    }
}

impl VideoSource for StillVideo {
    fn frame(&self) -> Option<&VideoFrame> {
        Some(&self.frame)
    }
}
