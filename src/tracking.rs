use crate::audio::{AudioBackend, AudioDriver};
use crate::media::{MediaRef, VideoRef};
use crate::scheduler::{FrameHandle, FrameHost, FrameScheduler};
use crate::shader::{MaterialRef, Mesh, PlaneGeometry, ShaderConfig, ShaderProgram};
use log::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    Tracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    Found,
    Lost,
}

impl TrackingEvent {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "found" | "targetFound" => Some(Self::Found),
            "lost" | "targetLost" => Some(Self::Lost),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::Lost => "lost",
        }
    }
}

/// The tracked scene object: visibility, material attribute, and the mesh
/// once the renderer has built it.
pub struct Entity {
    visible: bool,
    material: ShaderConfig,
    mesh: Option<Mesh>,
}

impl Entity {
    pub fn new(material: ShaderConfig) -> Self {
        Self {
            visible: true,
            material,
            mesh: None,
        }
    }

    pub fn with_mesh(material: ShaderConfig, geometry: PlaneGeometry) -> Self {
        let mut entity = Self::new(material);
        entity.attach_mesh(geometry);
        entity
    }

    /// Builds the program from the current material attribute.
    pub fn attach_mesh(&mut self, geometry: PlaneGeometry) -> MaterialRef {
        let material = ShaderProgram::shared(&self.material);
        self.mesh = Some(Mesh {
            geometry,
            material: material.clone(),
        });
        material
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn material_config(&self) -> &ShaderConfig {
        &self.material
    }

    /// Replaces the material attribute and runs the program's update.
    pub fn set_material(&mut self, config: ShaderConfig) {
        if let Some(mesh) = self.mesh.as_ref() {
            mesh.material.borrow_mut().update(&config);
        }
        self.material = config;
    }

    pub fn video_source(&self) -> Option<VideoRef> {
        self.material.src.clone()
    }
}

/// Plays the overlay while its target is tracked.
///
/// On `Found` the video and companion audio start, the audio graph is built
/// (once per component) and a frame loop starts feeding loudness into the
/// displacement amplitude. On `Lost` everything pauses, the loop is cancelled
/// and the amplitude drops to zero before the handler returns. The audio
/// engine is suspended on `Lost` and resumed by the next `Found`.
///
/// Known limitation: nothing can be started again after [`OverlayComponent::remove`],
/// the audio engine stays closed.
pub struct OverlayComponent {
    entity: Entity,
    sound: Option<MediaRef>,
    backend: Box<dyn AudioBackend>,
    material: Option<MaterialRef>,
    audio: AudioDriver,
    scheduler: FrameScheduler,
    state: TrackingState,
}

impl OverlayComponent {
    pub fn new(entity: Entity, sound: Option<MediaRef>, backend: Box<dyn AudioBackend>) -> Self {
        Self {
            entity,
            sound,
            backend,
            material: None,
            audio: AudioDriver::new(),
            scheduler: FrameScheduler::new(),
            state: TrackingState::Idle,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    pub fn audio(&self) -> &AudioDriver {
        &self.audio
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Material resolved on the first found event, if any.
    pub fn material(&self) -> Option<&MaterialRef> {
        self.material.as_ref()
    }

    pub fn handle(&mut self, event: TrackingEvent, frames: &mut dyn FrameHost) {
        trace!("event {}", event.as_str());
        match event {
            TrackingEvent::Found => self.found(frames),
            TrackingEvent::Lost => self.lost(frames),
        }
    }

    pub fn found(&mut self, frames: &mut dyn FrameHost) {
        if self.state == TrackingState::Tracking {
            debug!("target found while tracking, ignored");
            return;
        }
        info!("target found");

        self.resolve_material();

        // Without a video source the entry stops here and the state stays Idle.
        let Some(video) = self.entity.video_source() else {
            debug!("no video source, entry skipped");
            return;
        };
        self.state = TrackingState::Tracking;
        self.entity.set_visible(true);

        {
            let mut video = video.borrow_mut();
            if video.paused() {
                video.play();
            }
        }

        let Some(sound) = self.sound.clone() else {
            return;
        };
        self.audio.activate(self.backend.as_mut(), &*sound.borrow());
        {
            let mut sound = sound.borrow_mut();
            sound.play();
            sound.set_looping(true);
        }
        self.scheduler.schedule(frames);
    }

    pub fn lost(&mut self, frames: &mut dyn FrameHost) {
        if self.state == TrackingState::Idle {
            debug!("target lost while idle, ignored");
            return;
        }
        info!("target lost");

        // Without a video source the exit stops here and the state stays Tracking.
        let Some(video) = self.entity.video_source() else {
            debug!("no video source, exit skipped");
            return;
        };
        self.state = TrackingState::Idle;
        self.stop(Some(video), frames);
        self.audio.suspend();
    }

    /// One scheduler tick: write the current loudness if everything is in
    /// place, then ask for the next frame either way. A mesh built after the
    /// found event is picked up here.
    pub fn on_frame(&mut self, handle: FrameHandle, frames: &mut dyn FrameHost) {
        if !self.scheduler.claim(handle) {
            return;
        }
        self.resolve_material();
        if let Some(material) = self.material.as_ref() {
            if let Some(amplitude) = self.audio.sample_loudness() {
                trace!("damplitude {amplitude:.4}");
                material.borrow_mut().set_damplitude(amplitude);
            }
        }
        self.scheduler.schedule(frames);
    }

    /// Tears the component down: stops everything regardless of state and
    /// closes the audio engine for good.
    pub fn remove(&mut self, frames: &mut dyn FrameHost) {
        info!("overlay removed");
        let video = self.entity.video_source();
        self.stop(video, frames);
        self.audio.close();
        self.state = TrackingState::Idle;
    }

    fn resolve_material(&mut self) {
        if self.material.is_none() {
            self.material = self.entity.mesh().map(|m| m.material.clone());
        }
    }

    fn stop(&mut self, video: Option<VideoRef>, frames: &mut dyn FrameHost) {
        self.entity.set_visible(false);

        if let Some(video) = video {
            let mut video = video.borrow_mut();
            if !video.paused() {
                video.pause();
            }
        }

        if let Some(sound) = self.sound.as_ref() {
            let mut sound = sound.borrow_mut();
            sound.pause();
            sound.set_current_time(0.0);
            sound.set_looping(false);
        }

        self.scheduler.cancel(frames);
        if let Some(material) = self.material.as_ref() {
            material.borrow_mut().set_damplitude(0.0);
        }
    }
}
