use crate::audio::CpalBackend;
use crate::config::{Config, MaterialSettings, TrackingScript};
use crate::media::{MediaClock, MediaRef, StillVideo, VideoRef};
use crate::scheduler::FrameClock;
use crate::shader::{PlaneGeometry, Transforms};
use crate::tracking::{Entity, OverlayComponent};
use anyhow::Context;
use glam::Vec3;
use log::info;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

const PLANE_SEGMENTS: u32 = 16;
const AUDIO_TRACK_SECONDS: f64 = 30.0;

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let settings = MaterialSettings::resolve(&cfg).context("load material settings")?;
    let mut script = TrackingScript::parse(&cfg.events).context("parse tracking events")?;
    if cfg.fps == 0 {
        return Err(anyhow::anyhow!("--fps must be greater than zero"));
    }

    let key = Vec3::from_array(settings.color);
    let video = Rc::new(RefCell::new(StillVideo::test_pattern(
        cfg.width.max(1),
        cfg.height.max(1),
        key,
        Vec3::ONE - key,
    )));
    let sound = Rc::new(RefCell::new(MediaClock::new(AUDIO_TRACK_SECONDS)));

    let video_ref: VideoRef = video.clone();
    let sound_ref: MediaRef = sound.clone();
    let aspect = cfg.width.max(1) as f32 / cfg.height.max(1) as f32;
    let entity = Entity::with_mesh(
        settings.into_shader_config(Some(video_ref)),
        PlaneGeometry::new(aspect, 1.0, PLANE_SEGMENTS, PLANE_SEGMENTS),
    );
    let transforms = Transforms::looking_at_plane(60.0, aspect, 1.5);

    let mut component = OverlayComponent::new(
        entity,
        Some(sound_ref),
        Box::new(CpalBackend::new(cfg.device.clone())),
    );
    let mut frames = FrameClock::new();

    let dt = 1.0 / cfg.fps as f32;
    let total_frames = (cfg.duration.max(0.0) / dt).ceil() as u64;
    info!(
        "running {total_frames} frames at {} fps, {} tracking events",
        cfg.fps,
        script.entries().len()
    );

    let start = Instant::now();
    for n in 0..total_frames {
        let t = n as f32 * dt;

        for event in script.take_due(t) {
            component.handle(event, &mut frames);
        }
        for handle in frames.begin_frame() {
            component.on_frame(handle, &mut frames);
        }

        video.borrow_mut().clock.advance(dt as f64);
        sound.borrow_mut().advance(dt as f64);

        if cfg.report_every > 0 && n % cfg.report_every == 0 {
            report(&component, &transforms, cfg.width, cfg.height, t);
        }

        let target = start + Duration::from_secs_f32(t + dt);
        let now = Instant::now();
        if target > now {
            std::thread::sleep(target - now);
        }
    }

    component.remove(&mut frames);
    Ok(())
}

fn report(
    component: &OverlayComponent,
    transforms: &Transforms,
    width: usize,
    height: usize,
    t: f32,
) {
    let entity = component.entity();
    let Some(mesh) = entity.mesh() else {
        return;
    };
    let program = mesh.material.borrow();
    let vertices = program.displace_mesh(&mesh.geometry, transforms);
    let max_shift = vertices
        .iter()
        .zip(&mesh.geometry.positions)
        .map(|(v, p)| (v.position.z - p.z).abs())
        .fold(0.0f32, f32::max);
    let rgba = program.shade_frame(width, height);

    info!(
        "t={t:6.2}s state={:?} visible={} damplitude={:.4} keyed={:5.1}% max_shift={:.4}",
        component.state(),
        entity.visible(),
        program.damplitude(),
        keyed_coverage(&rgba) * 100.0,
        max_shift
    );
}

/// Fraction of pixels that came out fully transparent.
pub fn keyed_coverage(rgba: &[u8]) -> f32 {
    let total = rgba.len() / 4;
    if total == 0 {
        return 0.0;
    }
    let keyed = rgba.chunks_exact(4).filter(|px| px[3] == 0).count();
    keyed as f32 / total as f32
}
