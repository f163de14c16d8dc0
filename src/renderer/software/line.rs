use glam::{IVec2, Vec3};

use super::bresenham::{Bresenham, steps};
use super::{fog_shade, recip};
use crate::renderer::{Image, Rgb};

/// Per-step increment of reciprocal depth along a segment.
#[inline]
fn depth_step(from: IVec2, z0: f32, to: IVec2, z1: f32) -> f32 {
    match steps(from, to) {
        0 => 0.0,
        n => (recip(z1) - recip(z0)) / n as f32,
    }
}

/// Depth-tested flat line.
pub fn draw_line(
    image: &mut Image<'_>,
    from: IVec2,
    z0: f32,
    to: IVec2,
    z1: f32,
    color: Rgb,
    fog: f32,
) {
    let r0 = recip(z0);
    let zinc = depth_step(from, z0, to, z1);
    for (k, p) in Bresenham::new(from, to).enumerate() {
        let Some(idx) = image.index(p.x, p.y) else {
            continue;
        };
        let r = r0 + zinc * k as f32;
        let s = fog_shade(r, fog);
        let c = Rgb::clamped(
            color.r as i32 - s,
            color.g as i32 - s,
            color.b as i32 - s,
        );
        image.plot(idx, r, c.pack());
    }
}

/// Depth-tested line with the color blended from `c0` to `c1`.
#[allow(clippy::too_many_arguments)]
pub fn draw_shaded_line(
    image: &mut Image<'_>,
    from: IVec2,
    z0: f32,
    to: IVec2,
    z1: f32,
    c0: Vec3,
    c1: Vec3,
    fog: f32,
) {
    let n = steps(from, to);
    let r0 = recip(z0);
    let zinc = depth_step(from, z0, to, z1);
    let cinc = if n == 0 { Vec3::ZERO } else { (c1 - c0) / n as f32 };
    for (k, p) in Bresenham::new(from, to).enumerate() {
        let Some(idx) = image.index(p.x, p.y) else {
            continue;
        };
        let r = r0 + zinc * k as f32;
        let c = (c0 + cinc * k as f32) * 255.0 - Vec3::splat(fog_shade(r, fog) as f32);
        image.plot(idx, r, Rgb::clamped(c.x as i32, c.y as i32, c.z as i32).pack());
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{BACKGROUND_DEPTH, FrameBuffer};

    const RED: Rgb = Rgb::new(255, 0, 0);

    fn written(fb: &FrameBuffer) -> Vec<(i32, i32)> {
        let w = fb.width();
        fb.depth()
            .iter()
            .enumerate()
            .filter(|(_, d)| **d < BACKGROUND_DEPTH)
            .map(|(i, _)| ((i % w) as i32, (i / w) as i32))
            .collect()
    }

    #[test]
    fn matches_bresenham_pixel_set() {
        let (a, b) = (IVec2::new(1, 7), IVec2::new(14, 2));
        let mut fb = FrameBuffer::new(16, 10, Rgb::BLACK);
        draw_line(&mut fb.view(), a, 2.0, b, 4.0, RED, 0.0);
        let mut want: Vec<_> = Bresenham::new(a, b).map(|p| (p.x, p.y)).collect();
        want.sort_by_key(|&(x, y)| (y, x));
        assert_eq!(written(&fb), want);
    }

    #[test]
    fn zero_length_writes_one_pixel() {
        let mut fb = FrameBuffer::new(4, 4, Rgb::BLACK);
        let p = IVec2::new(2, 1);
        draw_line(&mut fb.view(), p, 2.0, p, 2.0, RED, 0.0);
        assert_eq!(written(&fb), vec![(2, 1)]);
        assert_eq!(fb.depth()[6], 0.5);
        assert_eq!(fb.pixels()[6], RED.pack());
    }

    #[test]
    fn depth_is_interpolated_in_reciprocal_space() {
        let mut fb = FrameBuffer::new(5, 1, Rgb::BLACK);
        draw_line(&mut fb.view(), IVec2::ZERO, 1.0, IVec2::new(4, 0), 0.5, RED, 0.0);
        assert_eq!(fb.depth(), &[1.0, 1.25, 1.5, 1.75, 2.0]);
    }

    #[test]
    fn farther_line_is_hidden() {
        let mut fb = FrameBuffer::new(5, 1, Rgb::BLACK);
        let (a, b) = (IVec2::ZERO, IVec2::new(4, 0));
        draw_line(&mut fb.view(), a, 4.0, b, 4.0, RED, 0.0);
        draw_line(&mut fb.view(), a, 2.0, b, 2.0, Rgb::WHITE, 0.0);
        assert!(fb.pixels().iter().all(|&p| p == RED.pack()));
    }

    #[test]
    fn off_frame_pixels_are_skipped() {
        let mut fb = FrameBuffer::new(4, 4, Rgb::BLACK);
        draw_line(&mut fb.view(), IVec2::new(-3, 1), 1.0, IVec2::new(6, 1), 1.0, RED, 0.0);
        assert_eq!(written(&fb), vec![(0, 1), (1, 1), (2, 1), (3, 1)]);
    }

    #[test]
    fn fog_darkens() {
        let mut fb = FrameBuffer::new(1, 1, Rgb::BLACK);
        // r = 2 → shade = (1 - 1/2) * 70 = 35
        draw_line(&mut fb.view(), IVec2::ZERO, 0.5, IVec2::ZERO, 0.5, RED, 70.0);
        assert_eq!(fb.pixels()[0], Rgb::new(220, 0, 0).pack());
    }

    #[test]
    fn shaded_line_blends_endpoints() {
        let mut fb = FrameBuffer::new(3, 1, Rgb::BLACK);
        draw_shaded_line(
            &mut fb.view(),
            IVec2::ZERO,
            1.0,
            IVec2::new(2, 0),
            1.0,
            Vec3::X,
            Vec3::Z,
            0.0,
        );
        assert_eq!(fb.pixels()[0], Rgb::new(255, 0, 0).pack());
        assert_eq!(fb.pixels()[1], Rgb::new(127, 0, 127).pack());
        assert_eq!(fb.pixels()[2], Rgb::new(0, 0, 255).pack());
    }
}
