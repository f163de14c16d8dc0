//! Area-light shadows by marching from each pixel towards the light.

use glam::{IVec2, Vec3};
use rand::Rng;
use rayon::prelude::*;

use super::bresenham::{Bresenham, steps};
use super::trace::TraceBuffer;
use super::{RAY_LIMIT, light_xy, pixel_rng, ray_target, recip};
use crate::renderer::{DEPTH_CUTOFF, Image, Rgb, ShadowParams};

/// Random offset inside cell `i` of `n` along an axis of length `area`,
/// capped at [`RAY_LIMIT`].
#[inline]
fn jitter<R: Rng>(rng: &mut R, area: u32, i: u32, n: u32) -> i32 {
    let cell = |k: u64| (area as u64 * k / n as u64).min(RAY_LIMIT as u64) as i32;
    let (lo, hi) = (cell(i as u64), cell(i as u64 + 1));
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

/// True when something in the store sits on the path from `origin` (depth
/// `d`) to `target` (depth `target_r`). The origin pixel itself is skipped.
pub fn occluded(
    trace: &TraceBuffer,
    origin: IVec2,
    d: f32,
    target: IVec2,
    target_r: f32,
    tolerance: f32,
) -> bool {
    let (w, h) = (trace.width() as i32, trace.height() as i32);
    let n = steps(origin, target);
    let zinc = if n == 0 { 0.0 } else { (target_r - d) / n as f32 };
    for (k, p) in Bresenham::new(origin, target).enumerate().skip(1) {
        if p.x < 0 || p.y < 0 || p.x >= w || p.y >= h {
            break;
        }
        let r = d + zinc * k as f32;
        if trace.at(p.x, p.y).iter().any(|f| (f.depth - r).abs() < tolerance) {
            return true;
        }
    }
    false
}

/// Darken every visible pixel by the share of light samples it cannot see.
pub(crate) fn apply(image: &mut Image<'_>, trace: &TraceBuffer, light: Vec3, params: &ShadowParams, seed: u64) {
    let w = image.width();
    if w == 0 {
        return;
    }
    let n = params.depth.max(1);
    let per_hit = params.darkness / (n * n) as f32;
    let base = light_xy(light);
    let target_r = recip(light.z);

    let (pixels, depth) = image.buffers_mut();
    let depth: &[f32] = depth;
    pixels.par_chunks_mut(w).enumerate().for_each(|(row, px)| {
        for col in 0..px.len() {
            let idx = row * w + col;
            let d = depth[idx];
            if d > DEPTH_CUTOFF {
                continue;
            }
            let origin = IVec2::new(col as i32, row as i32);
            let mut rng = pixel_rng(seed, idx);
            let mut shadow = 1.0_f32;
            for i in 0..n {
                for j in 0..n {
                    let jx = jitter(&mut rng, params.area.x, i, n);
                    let jy = jitter(&mut rng, params.area.y, j, n);
                    let target = ray_target(base, IVec2::new(jx, jy));
                    if occluded(trace, origin, d, target, target_r, params.tolerance) {
                        shadow -= per_hit;
                    }
                }
            }
            px[col] = Rgb::unpack(px[col]).scale(shadow).pack();
        }
    });
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::FrameBuffer;
    use crate::renderer::software::trace::Fragment;
    use glam::UVec2;

    const GREY: Rgb = Rgb::new(200, 200, 200);

    fn frag(depth: f32) -> Fragment {
        Fragment {
            depth,
            polygon_id: 1,
            ..Fragment::BACKGROUND
        }
    }

    fn point_light() -> ShadowParams {
        ShadowParams {
            area: UVec2::new(1, 1),
            ..ShadowParams::default()
        }
    }

    /// 10×1 strip with one lit pixel at x = 0 (depth 0.5).
    fn strip() -> (FrameBuffer, TraceBuffer) {
        let mut fb = FrameBuffer::new(10, 1, Rgb::BLACK);
        fb.view().plot(0, 0.5, GREY.pack());
        let mut tb = TraceBuffer::new(10, 1);
        tb.insert(0, frag(0.5));
        (fb, tb)
    }

    // Light at (9, 0) with z = 1: the ray's reciprocal depth climbs from
    // 0.5 to 1.0 over nine steps.
    const LIGHT: Vec3 = Vec3::new(9.0, 0.0, 1.0);

    #[test]
    fn unobstructed_pixel_keeps_color() {
        let (mut fb, tb) = strip();
        apply(&mut fb.view(), &tb, LIGHT, &point_light(), 1);
        assert_eq!(fb.pixels()[0], GREY.pack());
    }

    #[test]
    fn occluder_on_path_darkens() {
        let (mut fb, mut tb) = strip();
        tb.insert(5, frag(0.5 + 5.0 * 0.5 / 9.0));
        apply(&mut fb.view(), &tb, LIGHT, &point_light(), 1);
        assert_eq!(fb.pixels()[0], Rgb::new(100, 100, 100).pack());
        // background pixels are never traced
        assert_eq!(fb.pixels()[5], 0);
    }

    #[test]
    fn occluder_off_depth_is_ignored() {
        let (mut fb, mut tb) = strip();
        tb.insert(5, frag(0.2));
        apply(&mut fb.view(), &tb, LIGHT, &point_light(), 1);
        assert_eq!(fb.pixels()[0], GREY.pack());
    }

    #[test]
    fn each_blocked_sample_takes_its_share() {
        let (mut fb, mut tb) = strip();
        tb.insert(5, frag(0.5 + 5.0 * 0.5 / 9.0));
        let params = ShadowParams {
            area: UVec2::new(2, 2),
            depth: 2,
            darkness: 1.0,
            ..ShadowParams::default()
        };
        apply(&mut fb.view(), &tb, LIGHT, &params, 1);
        // unit cells pin the jitter to (9|10, 0|1); only the ray aimed at
        // (9, 0) meets the occluder at its depth
        assert_eq!(fb.pixels()[0], Rgb::new(150, 150, 150).pack());
    }

    #[test]
    fn lights_outside_the_frame_are_safe() {
        let (mut fb, tb) = strip();
        for light in [Vec3::new(-500.0, -500.0, 1.0), Vec3::new(1e12, 3.0, 0.0)] {
            apply(&mut fb.view(), &tb, light, &ShadowParams::default(), 7);
        }
        assert_eq!(fb.pixels()[0], GREY.pack());
    }

    #[test]
    fn oversized_light_area_stays_in_range() {
        let mut cfg = crate::renderer::FrameConfig::default();
        cfg.set_shadow_meta_parameters(2_100_000_000, u32::MAX, 0.01, 3, 0.5);
        assert_eq!(cfg.shadow.area, UVec2::new(2_100_000_000, u32::MAX));

        let (mut fb, mut tb) = strip();
        tb.insert(5, frag(0.5 + 5.0 * 0.5 / 9.0));
        let far = Vec3::new(i32::MAX as f32, i32::MAX as f32, 1.0);
        for light in [LIGHT, far] {
            apply(&mut fb.view(), &tb, light, &cfg.shadow, 1);
        }
        // targets sit millions of pixels away, so the ray depth has barely
        // moved by the occluder's column
        assert_eq!(fb.pixels()[0], GREY.pack());
    }

    #[test]
    fn same_seed_same_image() {
        let run = |seed| {
            let (mut fb, mut tb) = strip();
            tb.insert(3, frag(0.5 + 3.0 * 0.5 / 9.0));
            let params = ShadowParams {
                area: UVec2::new(6, 6),
                depth: 3,
                ..ShadowParams::default()
            };
            apply(&mut fb.view(), &tb, LIGHT, &params, seed);
            fb.pixels()[0]
        };
        assert_eq!(run(42), run(42));
    }
}
