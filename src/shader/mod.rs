mod geometry;
mod stages;
mod texture;

use crate::media::VideoRef;
use glam::{Vec2, Vec3, Vec4};
use std::cell::RefCell;
use std::rc::Rc;

pub use geometry::{PlaneGeometry, Transforms};
pub use stages::{
    chroma_alpha, composite, displace, noise_value, project, CHROMA_GAIN, CHROMA_THRESHOLD,
    NOISE_BIAS, NOISE_WEIGHT,
};
pub use texture::{to_rgba8, Texture, VideoFrame, VideoTexture, EMPTY_TEXEL};

pub const DEFAULT_KEY_COLOR: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Shared handle to the program bound to a mesh.
pub type MaterialRef = Rc<RefCell<ShaderProgram>>;

/// Material attribute as configured on the entity.
#[derive(Clone)]
pub struct ShaderConfig {
    pub src: Option<VideoRef>,
    pub color: Vec3,
    pub chroma: bool,
    pub transparent: bool,
    pub displacement: bool,
    pub damplitude: f32,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            src: None,
            color: DEFAULT_KEY_COLOR,
            chroma: false,
            transparent: true,
            displacement: false,
            damplitude: 0.0,
        }
    }
}

/// Values the stages read on every draw.
#[derive(Clone)]
pub struct Uniforms {
    pub chroma: bool,
    pub color: Vec3,
    pub texture: VideoTexture,
    pub displacement: bool,
    pub damplitude: f32,
}

/// Plain fields on the material object. `update` writes `color` and `src`
/// here, where the stages never look; only `transparent` changes how a
/// frame is blended.
#[derive(Clone)]
pub struct MaterialFields {
    pub color: Option<Vec3>,
    pub src: Option<VideoRef>,
    pub transparent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexOutput {
    pub position: Vec3,
    pub clip: Vec4,
    pub uv: Vec2,
}

pub struct ShaderProgram {
    uniforms: Uniforms,
    material: MaterialFields,
}

impl ShaderProgram {
    /// Builds the uniform set from `config` and then applies it once through
    /// [`ShaderProgram::update`], the way the host does on attach.
    pub fn new(config: &ShaderConfig) -> Self {
        let mut program = Self {
            uniforms: Uniforms {
                chroma: config.chroma,
                color: config.color,
                texture: VideoTexture::new(config.src.clone()),
                displacement: config.displacement,
                damplitude: config.damplitude,
            },
            material: MaterialFields {
                color: None,
                src: None,
                transparent: false,
            },
        };
        program.update(config);
        program
    }

    pub fn shared(config: &ShaderConfig) -> MaterialRef {
        Rc::new(RefCell::new(Self::new(config)))
    }

    /// Re-applies configuration. Only the displacement pair reaches the
    /// uniforms; key colour and source land on the material fields and do not
    /// change what gets drawn.
    pub fn update(&mut self, config: &ShaderConfig) {
        self.material.color = Some(config.color);
        self.material.src = config.src.clone();
        self.material.transparent = config.transparent;

        self.uniforms.displacement = config.displacement;
        self.uniforms.damplitude = config.damplitude;
    }

    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    pub fn material(&self) -> &MaterialFields {
        &self.material
    }

    pub fn damplitude(&self) -> f32 {
        self.uniforms.damplitude
    }

    pub(crate) fn set_damplitude(&mut self, value: f32) {
        self.uniforms.damplitude = value;
    }

    pub fn vertex(&self, position: Vec3, uv: Vec2, transforms: &Transforms) -> VertexOutput {
        let displaced = displace(
            position,
            uv,
            &self.uniforms.texture,
            self.uniforms.displacement,
            self.uniforms.damplitude,
        );
        VertexOutput {
            position: displaced,
            clip: project(displaced, transforms.model_view, transforms.projection),
            uv,
        }
    }

    pub fn fragment(&self, uv: Vec2) -> Vec4 {
        let t_color = self.uniforms.texture.sample(uv).truncate();
        composite(t_color, self.uniforms.color, self.uniforms.chroma)
    }

    pub fn displace_mesh(&self, geometry: &PlaneGeometry, transforms: &Transforms) -> Vec<VertexOutput> {
        geometry
            .positions
            .iter()
            .zip(&geometry.uvs)
            .map(|(p, uv)| self.vertex(*p, *uv, transforms))
            .collect()
    }

    /// Runs the fragment stage over a `width` x `height` grid covering the
    /// whole plane. Straight-alpha RGBA8, rows top to bottom. Without
    /// blending the alpha channel is written as opaque.
    pub fn shade_frame(&self, width: usize, height: usize) -> Vec<u8> {
        let mut out = vec![0u8; width * height * 4];
        for y in 0..height {
            let v = 1.0 - (y as f32 + 0.5) / height as f32;
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32;
                let mut c = self.fragment(Vec2::new(u, v));
                if !self.material.transparent {
                    c.w = 1.0;
                }
                let i = (y * width + x) * 4;
                out[i..i + 4].copy_from_slice(&to_rgba8(c));
            }
        }
        out
    }
}

/// Geometry plus the program it is drawn with.
pub struct Mesh {
    pub geometry: PlaneGeometry,
    pub material: MaterialRef,
}
