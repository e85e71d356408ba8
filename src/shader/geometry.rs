use glam::{Mat4, Vec2, Vec3};

/// Segmented plane in the XY plane, centred on the origin, facing +Z.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneGeometry {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl PlaneGeometry {
    pub fn new(width: f32, height: f32, segments_x: u32, segments_y: u32) -> Self {
        let gx = segments_x.max(1);
        let gy = segments_y.max(1);
        let cols = gx + 1;
        let seg_w = width / gx as f32;
        let seg_h = height / gy as f32;

        let mut positions = Vec::with_capacity((cols * (gy + 1)) as usize);
        let mut uvs = Vec::with_capacity(positions.capacity());
        for iy in 0..=gy {
            let y = iy as f32 * seg_h - height * 0.5;
            for ix in 0..=gx {
                let x = ix as f32 * seg_w - width * 0.5;
                positions.push(Vec3::new(x, -y, 0.0));
                uvs.push(Vec2::new(ix as f32 / gx as f32, 1.0 - iy as f32 / gy as f32));
            }
        }

        let mut indices = Vec::with_capacity((gx * gy * 6) as usize);
        for iy in 0..gy {
            for ix in 0..gx {
                let a = ix + cols * iy;
                let b = ix + cols * (iy + 1);
                let c = ix + 1 + cols * (iy + 1);
                let d = ix + 1 + cols * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            positions,
            uvs,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Per-draw transforms handed over by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transforms {
    pub model_view: Mat4,
    pub projection: Mat4,
}

impl Default for Transforms {
    fn default() -> Self {
        Self {
            model_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

impl Transforms {
    /// Camera `distance` units in front of the plane, looking down -Z.
    pub fn looking_at_plane(fov_y_deg: f32, aspect: f32, distance: f32) -> Self {
        Self {
            model_view: Mat4::from_translation(Vec3::new(0.0, 0.0, -distance)),
            projection: Mat4::perspective_rh_gl(fov_y_deg.to_radians(), aspect, 0.01, 100.0),
        }
    }
}
