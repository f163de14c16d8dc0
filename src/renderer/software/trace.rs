//! Per-pixel fragment store ("trace buffer").
//!
//! Each pixel owns a short list of surface samples ordered front to back.
//! A pixel nothing was drawn to holds a single background fragment.  Lists
//! only grow within a frame; [`TraceBuffer::reset`] restores the
//! background-only state.

use glam::Vec3;
use smallvec::{SmallVec, smallvec};

use crate::renderer::{BACKGROUND_DEPTH, DEPTH_CUTOFF, Rgb};

/// `polygon_id` carried by background fragments.
pub const BACKGROUND_ID: i32 = -1;

/// One retained surface sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fragment {
    pub normal: Vec3,
    pub alpha: f32,
    pub beta: f32,
    /// Reciprocal depth.
    pub depth: f32,
    pub color: Rgb,
    /// Specular tint, `[0,1]` per channel.
    pub surface: Vec3,
    pub one_sided: bool,
    pub polygon_id: i32,
}

impl Fragment {
    pub const BACKGROUND: Fragment = Fragment {
        normal: Vec3::ZERO,
        alpha: 1.0,
        beta: 1.0,
        depth: BACKGROUND_DEPTH,
        color: Rgb::BLACK,
        surface: Vec3::ZERO,
        one_sided: true,
        polygon_id: BACKGROUND_ID,
    };

    #[inline]
    pub fn is_background(&self) -> bool {
        self.depth > DEPTH_CUTOFF
    }
}

/// Layers of one pixel, nearest first.
pub type Layers = SmallVec<[Fragment; 1]>;

/// Record `frag` at a pixel, keeping the layers ordered.
///
/// * background head → replaced;
/// * nearer than (or level with) the head → becomes the new head;
/// * farther than the background sentinel → dropped;
/// * otherwise lands in front of the first layer at least as far, or
///   replaces that layer when it is background.
pub fn insert(layers: &mut Layers, frag: Fragment) {
    let Some(head) = layers.first() else {
        layers.push(frag);
        return;
    };
    if head.is_background() {
        layers[0] = frag;
        return;
    }
    if frag.depth <= head.depth {
        layers.insert(0, frag);
        return;
    }
    if frag.depth > BACKGROUND_DEPTH {
        return;
    }
    match layers.iter().position(|l| l.depth >= frag.depth) {
        Some(i) if layers[i].is_background() => layers[i] = frag,
        Some(i) => layers.insert(i, frag),
        None => layers.push(frag),
    }
}

/// Fragment lists for a `width × height` frame.
#[derive(Clone, Debug)]
pub struct TraceBuffer {
    width: usize,
    height: usize,
    cells: Vec<Layers>,
}

impl TraceBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![smallvec![Fragment::BACKGROUND]; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Drop every recorded fragment.
    pub fn reset(&mut self) {
        for c in &mut self.cells {
            c.clear();
            c.push(Fragment::BACKGROUND);
        }
    }

    #[inline]
    pub fn layers(&self, idx: usize) -> &[Fragment] {
        &self.cells[idx]
    }

    /// Layers at `(x, y)`; empty outside the frame.
    #[inline]
    pub fn at(&self, x: i32, y: i32) -> &[Fragment] {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return &[];
        }
        &self.cells[y as usize * self.width + x as usize]
    }

    #[inline]
    pub fn insert(&mut self, idx: usize, frag: Fragment) {
        insert(&mut self.cells[idx], frag);
    }

    pub(crate) fn cells(&self) -> &[Layers] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Layers] {
        &mut self.cells
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;

    fn frag(depth: f32, id: i32) -> Fragment {
        Fragment {
            depth,
            polygon_id: id,
            ..Fragment::BACKGROUND
        }
    }

    fn depths(l: &Layers) -> Vec<f32> {
        l.iter().map(|f| f.depth).collect()
    }

    #[test]
    fn first_sample_replaces_background() {
        let mut l: Layers = smallvec![Fragment::BACKGROUND];
        insert(&mut l, frag(0.5, 1));
        assert_eq!(l.len(), 1);
        assert_eq!(l[0].polygon_id, 1);
    }

    #[test]
    fn nearer_sample_becomes_head() {
        let mut l: Layers = smallvec![Fragment::BACKGROUND];
        insert(&mut l, frag(0.5, 1));
        insert(&mut l, frag(0.2, 2));
        assert_eq!(depths(&l), vec![0.2, 0.5]);
        assert_eq!(l[0].polygon_id, 2);
    }

    #[test]
    fn farther_samples_slot_in_order() {
        let mut l: Layers = smallvec![Fragment::BACKGROUND];
        for d in [0.5, 0.9, 0.7, 0.1, 0.6, 0.9] {
            insert(&mut l, frag(d, 0));
        }
        assert_eq!(depths(&l), vec![0.1, 0.5, 0.6, 0.7, 0.9, 0.9]);
    }

    #[test]
    fn far_background_layer_is_overwritten() {
        let mut l: Layers = smallvec![frag(0.5, 1), Fragment::BACKGROUND];
        insert(&mut l, frag(200.0, 2));
        assert_eq!(depths(&l), vec![0.5, 200.0]);
        insert(&mut l, frag(BACKGROUND_DEPTH + 1.0, 3));
        assert_eq!(depths(&l), vec![0.5, 200.0]);
    }

    #[test]
    fn order_invariant_holds() {
        let mut tb = TraceBuffer::new(1, 1);
        let mut d = 0.37_f32;
        for i in 0..40 {
            d = (d * 7.13 + 0.11).fract();
            tb.insert(0, frag(d * 5.0, i));
        }
        let l = tb.layers(0);
        assert_eq!(l.len(), 40);
        assert!(l.windows(2).all(|w| w[0].depth <= w[1].depth));
        assert!(l.iter().all(|f| !f.is_background()));
    }

    #[test]
    fn drawn_store_keeps_one_sentinel_only_where_untouched() {
        use crate::renderer::software::polygon::draw_polygon;
        use crate::renderer::{FrameBuffer, FrameConfig};
        use crate::world::{Polygon, SurfaceMaps, Vertex};

        let quad = |x0: f32, y0: f32, x1: f32, y1: f32, z: f32| {
            let c = Vec3::ONE;
            Polygon::new(
                vec![
                    Vertex::new(x0, y0, z, c),
                    Vertex::new(x1, y0, z, c),
                    Vertex::new(x1, y1, z, c),
                    Vertex::new(x0, y1, z, c),
                ],
                Vec3::Z,
            )
        };
        let (mut fb, mut tb) = (FrameBuffer::new(12, 10, Rgb::WHITE), TraceBuffer::new(12, 10));
        let mut cfg = FrameConfig::default();
        cfg.set_polygon_fill(true);
        let (maps, mut edges) = (SurfaceMaps::default(), Vec::new());
        for (id, q) in [
            quad(1.0, 1.0, 6.0, 6.0, 2.0),
            quad(4.0, 3.0, 9.0, 8.0, 4.0),
            quad(3.0, 2.0, 7.0, 4.0, 1.0),
        ]
        .iter()
        .enumerate()
        {
            cfg.set_polygon_id(id as i32);
            draw_polygon(&mut fb.view(), &mut tb, q, &maps, &cfg, &mut edges).unwrap();
        }

        for (i, layers) in tb.cells().iter().enumerate() {
            let sentinels = layers.iter().filter(|f| f.depth == BACKGROUND_DEPTH).count();
            let drawn = fb.depth()[i] < BACKGROUND_DEPTH;
            assert_eq!(sentinels, if drawn { 0 } else { 1 }, "pixel {i}");
            assert!(layers.windows(2).all(|w| w[0].depth <= w[1].depth));
        }
        // all three overlap here
        assert_eq!(tb.at(4, 3).len(), 3);
        assert_eq!(tb.at(11, 9), &[Fragment::BACKGROUND]);
    }

    #[test]
    fn reset_and_bounds() {
        let mut tb = TraceBuffer::new(3, 2);
        tb.insert(4, frag(0.5, 1));
        tb.insert(4, frag(0.4, 2));
        assert_eq!(tb.at(1, 1).len(), 2);
        assert!(tb.at(3, 0).is_empty());
        assert!(tb.at(-1, 0).is_empty());
        tb.reset();
        assert_eq!(tb.at(1, 1), &[Fragment::BACKGROUND]);
    }
}
