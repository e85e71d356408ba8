use super::texture::Texture;
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Colour distance below which a pixel starts fading out.
pub const CHROMA_THRESHOLD: f32 = 0.5;
/// Slope of the alpha ramp above the threshold.
pub const CHROMA_GAIN: f32 = 7.0;

/// Per-channel weight used to fold the displacement sample into one value.
pub const NOISE_WEIGHT: f32 = 0.333;
/// Offset subtracted from the folded sample. Leaves the noise mostly negative.
pub const NOISE_BIAS: f32 = 1.4;

/// Alpha for a texel given the key colour.
///
/// With keying disabled the texel is fully opaque. Otherwise the alpha ramps
/// from 0 to 1 as the Euclidean RGB distance to `key` goes from
/// `CHROMA_THRESHOLD` to `CHROMA_THRESHOLD + 1 / CHROMA_GAIN`.
pub fn chroma_alpha(t_color: Vec3, key: Vec3, chroma: bool) -> f32 {
    let a = if chroma {
        ((t_color - key).length() - CHROMA_THRESHOLD) * CHROMA_GAIN
    } else {
        1.0
    };
    a.clamp(0.0, 1.0)
}

/// Fragment stage: the colour passes through untouched, only alpha is keyed.
pub fn composite(t_color: Vec3, key: Vec3, chroma: bool) -> Vec4 {
    t_color.extend(chroma_alpha(t_color, key, chroma))
}

/// Folds a displacement sample into the signed noise value.
pub fn noise_value(sample: Vec4) -> f32 {
    sample.truncate().dot(Vec3::splat(NOISE_WEIGHT)) - NOISE_BIAS
}

/// Moves `position` along z by the noise read from `texture` at `uv - floor(uv)`.
///
/// Returns the input untouched when displacement is off.
pub fn displace(
    position: Vec3,
    uv: Vec2,
    texture: &dyn Texture,
    displacement: bool,
    damplitude: f32,
) -> Vec3 {
    if !displacement {
        return position;
    }
    let noise = texture.sample(uv.fract_gl());
    let mut out = position;
    out.z -= noise_value(noise) * damplitude;
    out
}

/// Object space to clip space.
pub fn project(position: Vec3, model_view: Mat4, projection: Mat4) -> Vec4 {
    let mv_position = model_view * position.extend(1.0);
    projection * mv_position
}
