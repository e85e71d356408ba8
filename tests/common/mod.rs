#![allow(dead_code)]

use chroma_overlay::audio::{Analyser, AudioBackend, AudioContext, ContextState};
use chroma_overlay::media::MediaElement;
use std::cell::Cell;
use std::rc::Rc;

/// Counters and knobs shared between a fake backend and the test body.
pub struct FakeAudio {
    pub contexts_created: Cell<usize>,
    pub analysers_created: Cell<usize>,
    pub suspends: Cell<usize>,
    pub resumes: Cell<usize>,
    pub closes: Cell<usize>,
    pub reads: Cell<usize>,
    pub state: Cell<ContextState>,
    pub start_suspended: Cell<bool>,
    pub fail: Cell<bool>,
    pub level: Cell<u8>,
}

impl FakeAudio {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            contexts_created: Cell::new(0),
            analysers_created: Cell::new(0),
            suspends: Cell::new(0),
            resumes: Cell::new(0),
            closes: Cell::new(0),
            reads: Cell::new(0),
            state: Cell::new(ContextState::Running),
            start_suspended: Cell::new(false),
            fail: Cell::new(false),
            level: Cell::new(0),
        })
    }

    pub fn backend(self: &Rc<Self>) -> Box<dyn AudioBackend> {
        Box::new(FakeBackend(Rc::clone(self)))
    }
}

pub struct FakeBackend(pub Rc<FakeAudio>);

impl AudioBackend for FakeBackend {
    fn create_context(&mut self) -> anyhow::Result<Box<dyn AudioContext>> {
        if self.0.fail.get() {
            anyhow::bail!("no audio device");
        }
        self.0.contexts_created.set(self.0.contexts_created.get() + 1);
        let state = if self.0.start_suspended.get() {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        self.0.state.set(state);
        Ok(Box::new(FakeContext(Rc::clone(&self.0))))
    }
}

struct FakeContext(Rc<FakeAudio>);

impl AudioContext for FakeContext {
    fn state(&self) -> ContextState {
        self.0.state.get()
    }

    fn suspend(&mut self) -> anyhow::Result<()> {
        self.0.suspends.set(self.0.suspends.get() + 1);
        self.0.state.set(ContextState::Suspended);
        Ok(())
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        self.0.resumes.set(self.0.resumes.get() + 1);
        self.0.state.set(ContextState::Running);
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.0.closes.set(self.0.closes.get() + 1);
        self.0.state.set(ContextState::Closed);
        Ok(())
    }

    fn analyse_media(
        &mut self,
        _media: &dyn MediaElement,
        fft_size: usize,
    ) -> anyhow::Result<Box<dyn Analyser>> {
        self.0.analysers_created.set(self.0.analysers_created.get() + 1);
        Ok(Box::new(FakeAnalyser {
            audio: Rc::clone(&self.0),
            bins: fft_size / 2,
        }))
    }
}

struct FakeAnalyser {
    audio: Rc<FakeAudio>,
    bins: usize,
}

impl Analyser for FakeAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.bins
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.audio.reads.set(self.audio.reads.get() + 1);
        out.fill(self.audio.level.get());
    }
}
