use log::debug;

/// Ticket for a one-shot per-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Per-frame scheduling primitive provided by the renderer.
pub trait FrameHost {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Frame callbacks with animation-frame semantics: anything requested while
/// frame N runs fires in frame N + 1, and a cancelled request never fires.
#[derive(Debug, Default)]
pub struct FrameClock {
    next_id: u64,
    frame: u64,
    pending: Vec<FrameHandle>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_number(&self) -> u64 {
        self.frame
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Starts the next frame and hands back the callbacks due in it.
    pub fn begin_frame(&mut self) -> Vec<FrameHandle> {
        self.frame += 1;
        std::mem::take(&mut self.pending)
    }
}

impl FrameHost for FrameClock {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.retain(|h| *h != handle);
    }
}

/// Self-rescheduling frame task. Holds at most one outstanding callback.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: Option<FrameHandle>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Requests the next tick unless one is already outstanding.
    pub fn schedule(&mut self, host: &mut dyn FrameHost) {
        if self.pending.is_none() {
            self.pending = Some(host.request_frame());
        }
    }

    /// Drops the outstanding tick. Calling it with nothing pending is a no-op.
    pub fn cancel(&mut self, host: &mut dyn FrameHost) {
        if let Some(handle) = self.pending.take() {
            debug!("frame {} cancelled", handle.id());
            host.cancel_frame(handle);
        }
    }

    /// Accepts a fired callback if it is the outstanding one, clearing it.
    /// Stale or foreign handles are refused.
    pub fn claim(&mut self, handle: FrameHandle) -> bool {
        if self.pending == Some(handle) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}
