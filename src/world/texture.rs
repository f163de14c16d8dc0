// Optional per-polygon surface data: texture, bump map, anchors, normals.
// The rasteriser reads these through `SurfaceMaps`; nothing bound means a
// flat-color, flat-normal polygon.

use glam::{Vec2, Vec3};

use crate::error::RenderError;

/// Row-major texel grid of `bin` channels per texel.
///
/// Only the first three channels of a texel are ever read: color for a
/// texture, a normal offset (scaled by 1/1000) for a bump map.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureMap {
    pub w: usize,
    pub h: usize,
    pub bin: usize,
    pub data: Vec<i32>,
}

impl TextureMap {
    pub fn new(data: Vec<i32>, w: usize, h: usize, bin: usize) -> Result<Self, RenderError> {
        if w < 2 || h < 2 || bin < 3 {
            return Err(RenderError::BadMap {
                width: w,
                height: h,
                bin,
            });
        }
        let need = w * h * bin;
        if data.len() < need {
            return Err(RenderError::ShortBuffer {
                what: "texture",
                len: data.len(),
                need,
            });
        }
        Ok(Self { w, h, bin, data })
    }

    /// Map an anchor value in `0..=255` to a texel coordinate in `[1, w-1]`.
    #[inline]
    pub fn anchor_to_texel(&self, a: Vec2) -> Vec2 {
        let span = Vec2::new((self.w - 2) as f32, (self.h - 2) as f32);
        Vec2::ONE + a / 255.0 * span
    }

    /// First three channels of the texel at `t`, index clamped into the data.
    #[inline]
    pub fn sample(&self, t: Vec2) -> [i32; 3] {
        let idx = (t.y as i64 * self.w as i64 + t.x as i64) * self.bin as i64;
        let max = (self.w * self.h * self.bin) as i64 - 3;
        let i = idx.clamp(0, max) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Bump-map offset at `t`.
    #[inline]
    pub fn sample_bump(&self, t: Vec2) -> Vec3 {
        let [x, y, z] = self.sample(t);
        Vec3::new(x as f32, y as f32, z as f32) / 1000.0
    }
}

/// One `(u, v)` anchor per polygon vertex, each in `0..=255`.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchors(pub Vec<Vec2>);

impl Anchors {
    /// Decode four values per anchor (`u, v, _, _`).
    pub fn from_flat(buf: &[i32], count: usize) -> Result<Self, RenderError> {
        if buf.len() < 4 * count {
            return Err(RenderError::ShortBuffer {
                what: "anchor",
                len: buf.len(),
                need: 4 * count,
            });
        }
        Ok(Self(
            buf.chunks_exact(4)
                .take(count)
                .map(|c| Vec2::new(c[0] as f32, c[1] as f32))
                .collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-vertex normals used instead of the polygon's face normal.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalBuffer(pub Vec<Vec3>);

impl NormalBuffer {
    /// Decode four values per normal (`x, y, z, _`).
    pub fn from_flat(buf: &[f32], count: usize) -> Result<Self, RenderError> {
        if buf.len() < 4 * count {
            return Err(RenderError::ShortBuffer {
                what: "normal",
                len: buf.len(),
                need: 4 * count,
            });
        }
        Ok(Self(
            buf.chunks_exact(4)
                .take(count)
                .map(|c| Vec3::new(c[0], c[1], c[2]))
                .collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Surface data bound for the next polygon draws.
#[derive(Clone, Debug, Default)]
pub struct SurfaceMaps {
    pub texture: Option<TextureMap>,
    pub bump: Option<TextureMap>,
    pub anchors: Option<Anchors>,
    pub normals: Option<NormalBuffer>,
}

impl SurfaceMaps {
    // ---- Binding ----

    pub fn set_texture(&mut self, map: TextureMap) {
        self.texture = Some(map);
    }

    pub fn set_bump_map(&mut self, map: TextureMap) {
        self.bump = Some(map);
    }

    pub fn set_anchor_points(&mut self, anchors: Anchors) {
        self.anchors = Some(anchors);
    }

    pub fn enable_normal_interpolation(&mut self, normals: NormalBuffer) {
        self.normals = Some(normals);
    }

    pub fn disable_normal_interpolation(&mut self) {
        self.normals = None;
    }

    // ---- Release ----

    pub fn release_textures(&mut self) {
        self.texture = None;
    }

    pub fn release_bump_map(&mut self) {
        self.bump = None;
    }

    pub fn release_anchors_and_textures(&mut self) {
        self.anchors = None;
        self.texture = None;
        self.bump = None;
    }

    /// Check the bound state against a polygon of `vertices` corners.
    pub fn check(&self, vertices: usize) -> Result<(), RenderError> {
        match (&self.anchors, &self.texture, &self.bump) {
            (Some(a), _, _) if a.len() != vertices => {
                return Err(RenderError::AnchorMismatch {
                    anchors: a.len(),
                    vertices,
                });
            }
            (Some(_), None, None) => return Err(RenderError::AnchorsWithoutMap),
            (None, Some(_), _) => return Err(RenderError::TextureWithoutAnchors),
            (None, None, Some(_)) => return Err(RenderError::BumpWithoutAnchors),
            _ => {}
        }
        if let Some(n) = &self.normals {
            if n.len() < vertices {
                return Err(RenderError::NormalMismatch {
                    normals: n.len(),
                    vertices,
                });
            }
        }
        Ok(())
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
