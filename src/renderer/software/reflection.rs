//! Mirror reflections traced through the fragment store.

use glam::{IVec2, Vec2, Vec3};
use rand::Rng;
use rayon::prelude::*;

use super::bresenham::{Bresenham, steps};
use super::trace::{Fragment, TraceBuffer};
use super::{pixel_rng, recip};
use crate::renderer::{DEPTH_CUTOFF, Image, ReflectionParams, Rgb};

/// Jitter offsets for an `m × m` grid over `area`, cells centred on zero.
fn jitter_grid<R: Rng>(rng: &mut R, area: Vec2, m: u32, out: &mut Vec<Vec2>) {
    out.clear();
    let mf = m as f32;
    let half = mf / 2.0;
    let cell = |a: f32, i: f32| ((a * i / mf) as i32 as f32, (a * (i + 1.0) / mf) as i32 as f32);
    for i in (0..m).map(|k| k as f32 - half) {
        for j in (0..m).map(|k| k as f32 - half) {
            let (xmin, xmax) = cell(area.x, i);
            let (ymin, ymax) = cell(area.y, j);
            out.push(Vec2::new(
                rng.random::<f32>() * (xmax - xmin) + xmin,
                rng.random::<f32>() * (ymax - ymin) + ymin,
            ));
        }
    }
}

/// Mirror of the light direction about the surface normal.
#[inline]
pub fn reflect(light: Vec3, pos: Vec3, normal: Vec3) -> Vec3 {
    let l = (light - pos).normalize_or_zero();
    let n = normal.normalize_or_zero();
    (2.0 * l.dot(n) * n - l).normalize_or_zero()
}

#[inline]
fn clamp_to_frame(p: Vec3, w: i32, h: i32) -> IVec2 {
    IVec2::new((p.x as i32).clamp(0, w - 1), (p.y as i32).clamp(0, h - 1))
}

/// First fragment along `dir` from `origin` whose polygon differs from `from`'s.
///
/// The ray covers `offset ..= offset + projection` along `dir`; its screen
/// ends are clamped into the frame and the origin pixel is never tested.
pub fn first_hit<'t>(
    trace: &'t TraceBuffer,
    origin: IVec2,
    pos: Vec3,
    dir: Vec3,
    from: &Fragment,
    params: &ReflectionParams,
) -> Option<&'t Fragment> {
    let (w, h) = (trace.width() as i32, trace.height() as i32);
    let start = pos + dir * params.offset;
    let end = pos + dir * (params.offset + params.projection);
    let (s, e) = (clamp_to_frame(start, w, h), clamp_to_frame(end, w, h));
    let (rs, re) = (recip(start.z), recip(end.z));
    let n = steps(s, e);
    let zinc = if n == 0 { 0.0 } else { (re - rs) / n as f32 };

    for (k, p) in Bresenham::new(s, e).enumerate() {
        if p == origin {
            continue;
        }
        let r = rs + zinc * k as f32;
        let hit = trace
            .at(p.x, p.y)
            .iter()
            .find(|f| (f.depth - r).abs() < params.threshold && f.polygon_id != from.polygon_id);
        if hit.is_some() {
            return hit;
        }
    }
    None
}

/// Blend what each reflective pixel mirrors into its color.
pub(crate) fn apply(
    image: &mut Image<'_>,
    trace: &TraceBuffer,
    light: Vec3,
    params: &ReflectionParams,
    seed: u64,
) {
    let w = image.width();
    if w == 0 {
        return;
    }
    let m = params.depth.max(1);
    let samples = (m * m) as f32;

    let (pixels, depth) = image.buffers_mut();
    let depth: &[f32] = depth;
    pixels.par_chunks_mut(w).enumerate().for_each(|(row, px)| {
        for col in 0..px.len() {
            let idx = row * w + col;
            let layers = trace.layers(idx);
            let head = match layers.first() {
                Some(head) if depth[idx] <= DEPTH_CUTOFF && head.beta < 1.0 => head,
                _ => continue,
            };
            let origin = IVec2::new(col as i32, row as i32);
            let mut rng = pixel_rng(seed ^ 0xA5A5_A5A5, idx);
            let mut c = Rgb::unpack(px[col]);
            let mut offsets = Vec::with_capacity((m * m) as usize);
            // identity and reflectivity come from the visible surface for every layer
            let blend = head.beta.powf(1.0 / samples);

            for layer in layers.iter().take_while(|l| !l.is_background()) {
                let pos = Vec3::new(col as f32, row as f32, recip(layer.depth));
                jitter_grid(&mut rng, params.area, m, &mut offsets);
                for &off in &offsets {
                    let dir = reflect(light + off.extend(0.0), pos, layer.normal);
                    if let Some(hit) = first_hit(trace, origin, pos, dir, head, params) {
                        c = c.mix(hit.color, blend);
                    }
                }
                if layer.alpha == 0.0 {
                    break;
                }
            }
            px[col] = c.pack();
        }
    });
}

/*──────────────────────────────── Tests ───────────────────────────────*/
