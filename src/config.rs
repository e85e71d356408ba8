use crate::media::VideoRef;
use crate::shader::{ShaderConfig, DEFAULT_KEY_COLOR};
use crate::tracking::TrackingEvent;
use clap::Parser;
use glam::Vec3;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Parser, Debug, Clone)]
#[command(name = "chroma-overlay", version, about = "Chroma-keyed, audio-displaced video overlay driven by target tracking")]
pub struct Config {
    /// TOML file with material settings.
    #[arg(long)]
    pub material: Option<PathBuf>,

    /// Key colour as normalized `r,g,b`.
    #[arg(long, value_parser = parse_color)]
    pub key_color: Option<[f32; 3]>,

    #[arg(long, default_value_t = false)]
    pub chroma: bool,

    #[arg(long, default_value_t = false)]
    pub displacement: bool,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seconds to run.
    #[arg(long, default_value_t = 10.0)]
    pub duration: f32,

    /// Tracking script such as `found@1.0,lost@4.5`.
    #[arg(long, default_value = "found@0.5")]
    pub events: String,

    #[arg(long, default_value_t = 64)]
    pub width: usize,

    #[arg(long, default_value_t = 36)]
    pub height: usize,

    /// Log a status line every this many frames.
    #[arg(long, default_value_t = 60)]
    pub report_every: u64,

    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("bad colour `{0}`: expected three numbers in [0, 1] separated by commas")]
    Color(String),
    #[error("bad tracking entry `{entry}`: {message}")]
    Script { entry: String, message: String },
}

/// Material attribute values that can come from a file. Missing keys take
/// the schema defaults.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MaterialSettings {
    pub color: [f32; 3],
    pub chroma: bool,
    pub transparent: bool,
    pub displacement: bool,
    pub damplitude: f32,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            color: DEFAULT_KEY_COLOR.to_array(),
            chroma: false,
            transparent: true,
            displacement: false,
            damplitude: 0.0,
        }
    }
}

impl MaterialSettings {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File values (or defaults) with command-line flags layered on top.
    pub fn resolve(cfg: &Config) -> Result<Self, ConfigError> {
        let mut settings = match cfg.material.as_deref() {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(color) = cfg.key_color {
            settings.color = color;
        }
        settings.chroma |= cfg.chroma;
        settings.displacement |= cfg.displacement;
        Ok(settings)
    }

    pub fn into_shader_config(self, src: Option<VideoRef>) -> ShaderConfig {
        ShaderConfig {
            src,
            color: Vec3::from_array(self.color),
            chroma: self.chroma,
            transparent: self.transparent,
            displacement: self.displacement,
            damplitude: self.damplitude,
        }
    }
}

pub fn parse_color(s: &str) -> Result<[f32; 3], ConfigError> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigError::Color(s.to_string()))?;
    match parts.as_slice() {
        [r, g, b] if [r, g, b].iter().all(|c| (0.0..=1.0).contains(*c)) => Ok([*r, *g, *b]),
        _ => Err(ConfigError::Color(s.to_string())),
    }
}

/// Timed tracking events, ordered by time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingScript {
    entries: Vec<(f32, TrackingEvent)>,
}

impl TrackingScript {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();
        for raw in text.split(',') {
            let entry = raw.trim();
            if entry.is_empty() {
                continue;
            }
            let Some((name, at)) = entry.split_once('@') else {
                return Err(ConfigError::Script {
                    entry: entry.to_string(),
                    message: "expected <event>@<seconds>".to_string(),
                });
            };
            let event = TrackingEvent::parse(name.trim()).ok_or_else(|| ConfigError::Script {
                entry: entry.to_string(),
                message: "event must be found or lost".to_string(),
            })?;
            let at = at
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|t| t.is_finite() && *t >= 0.0)
                .ok_or_else(|| ConfigError::Script {
                    entry: entry.to_string(),
                    message: "time must be a non-negative number of seconds".to_string(),
                })?;
            entries.push((at, event));
        }
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(f32, TrackingEvent)] {
        &self.entries
    }

    /// Removes and returns every event due at or before `t` seconds.
    pub fn take_due(&mut self, t: f32) -> Vec<TrackingEvent> {
        let n = self.entries.iter().take_while(|(at, _)| *at <= t).count();
        self.entries.drain(..n).map(|(_, e)| e).collect()
    }
}
