use glam::{Vec3, Vec4};

use crate::error::RenderError;

/// Screen-space polygon corner.
///
/// `pos.x`, `pos.y` are pixel coordinates (truncated when rasterised),
/// `pos.z` is view depth and `pos.w` the homogeneous coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub pos: Vec4,
    /// `[0,1]` per channel.
    pub color: Vec3,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, color: Vec3) -> Self {
        Self {
            pos: Vec4::new(x, y, z, 1.0),
            color,
        }
    }
}

/// Closed ring of vertices; the last one connects back to the first.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<Vertex>,
    /// Face normal used when no per-vertex normals are bound.
    pub normal: Vec3,
}

impl Polygon {
    pub fn new(vertices: Vec<Vertex>, normal: Vec3) -> Self {
        Self { vertices, normal }
    }

    /// Decode interleaved position and color buffers.
    ///
    /// Each vertex occupies `band_size` slots in both buffers: `x, y, z, w`
    /// then anything else the caller packs, and `r, g, b, a` likewise.
    pub fn from_flat(
        points: &[f32],
        colors: &[f32],
        count: usize,
        band_size: usize,
        normal: Vec3,
    ) -> Result<Self, RenderError> {
        if band_size < 4 {
            return Err(RenderError::BandSize(band_size));
        }
        let need = count * band_size;
        for (what, len) in [("point", points.len()), ("color", colors.len())] {
            if len < need {
                return Err(RenderError::ShortBuffer { what, len, need });
            }
        }
        let vertices = points
            .chunks_exact(band_size)
            .zip(colors.chunks_exact(band_size))
            .take(count)
            .map(|(p, c)| Vertex {
                pos: Vec4::new(p[0], p[1], p[2], p[3]),
                color: Vec3::new(c[0], c[1], c[2]),
            })
            .collect();
        Ok(Self { vertices, normal })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Consecutive vertex pairs, closing last → first.
    pub fn edges(&self) -> impl Iterator<Item = (&Vertex, &Vertex)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (&self.vertices[i], &self.vertices[(i + 1) % n]))
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_reads_bands() {
        let pts = [1.0, 2.0, 3.0, 1.0, 4.0, 5.0, 6.0, 1.0];
        let cols = [0.1, 0.2, 0.3, 1.0, 0.4, 0.5, 0.6, 1.0];
        let p = Polygon::from_flat(&pts, &cols, 2, 4, Vec3::Z).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.vertices[1].pos, Vec4::new(4.0, 5.0, 6.0, 1.0));
        assert_eq!(p.vertices[0].color, Vec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn from_flat_rejects_bad_input() {
        assert_eq!(
            Polygon::from_flat(&[0.0; 9], &[0.0; 9], 3, 3, Vec3::Z),
            Err(RenderError::BandSize(3))
        );
        assert_eq!(
            Polygon::from_flat(&[0.0; 8], &[0.0; 12], 3, 4, Vec3::Z),
            Err(RenderError::ShortBuffer {
                what: "point",
                len: 8,
                need: 12
            })
        );
    }

    #[test]
    fn edges_close_the_ring() {
        let v = |x| Vertex::new(x, 0.0, 1.0, Vec3::ZERO);
        let p = Polygon::new(vec![v(0.0), v(1.0), v(2.0)], Vec3::Z);
        let last = p.edges().last().unwrap();
        assert_eq!(last.0.pos.x, 2.0);
        assert_eq!(last.1.pos.x, 0.0);
        assert_eq!(p.edges().count(), 3);
    }
}
