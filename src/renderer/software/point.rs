use glam::IVec2;

use crate::renderer::{Image, Rgb};

/// `(c * a + old * (255 - a)) >> 8` per channel.
#[inline]
fn blend(old: Rgb, c: Rgb, a: u8) -> Rgb {
    let a = a as u32;
    let ch = |n: u8, o: u8| ((n as u32 * a + o as u32 * (255 - a)) >> 8) as u8;
    Rgb::new(ch(c.r, old.r), ch(c.g, old.g), ch(c.b, old.b))
}

/// Largest radius walked.
const MAX_RADIUS: i64 = 1 << 24;

/// Filled disc of `radius` around `center`, alpha-blended over the image.
///
/// Row extents come from the midpoint circle walk; each covered pixel is
/// blended exactly once. No depth test, clipped to the frame.
pub fn draw_point(image: &mut Image<'_>, center: IVec2, radius: i32, color: Rgb, alpha: u8) {
    let (w, h) = (image.width() as i64, image.height() as i64);
    if w == 0 || h == 0 {
        return;
    }
    let (cx, cy) = (center.x as i64, center.y as i64);
    // a radius reaching the farthest corner covers the frame already
    let far_x = cx.abs().max((w - 1 - cx).abs());
    let far_y = cy.abs().max((h - 1 - cy).abs());
    let reach = (far_x as f64).hypot(far_y as f64).ceil() as i64;
    let radius = (radius.max(0) as i64).min(reach).min(MAX_RADIUS);

    let near_x = (cx.clamp(0, w - 1) - cx).abs();
    let near_y = (cy.clamp(0, h - 1) - cy).abs();
    if near_x > radius || near_y > radius {
        return;
    }

    // half-width per frame row, -1 where the disc misses the row
    let mut half = vec![-1i64; h as usize];
    let mut widen = |dy: i64, hw: i64| {
        let py = cy + dy;
        if (0..h).contains(&py) {
            let slot = &mut half[py as usize];
            *slot = (*slot).max(hw);
        }
    };

    let (mut x, mut y, mut err) = (radius, 0i64, 1 - radius);
    while x >= y {
        widen(y, x);
        widen(-y, x);
        widen(x, y);
        widen(-x, y);
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }

    for (py, &hw) in half.iter().enumerate() {
        if hw < 0 {
            continue;
        }
        let x0 = (cx - hw).max(0);
        let x1 = (cx + hw).min(w - 1);
        for px in x0..=x1 {
            let idx = py * w as usize + px as usize;
            let old = Rgb::unpack(image.pixels()[idx]);
            image.put(idx, blend(old, color, alpha).pack());
        }
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::FrameBuffer;

    fn covered(fb: &FrameBuffer) -> usize {
        fb.pixels().iter().filter(|&&p| p != 0).count()
    }

    #[test]
    fn radius_zero_is_one_pixel() {
        let mut fb = FrameBuffer::new(3, 3, Rgb::BLACK);
        draw_point(&mut fb.view(), IVec2::new(1, 1), 0, Rgb::WHITE, 255);
        assert_eq!(covered(&fb), 1);
        assert_eq!(fb.pixels()[4], Rgb::new(254, 254, 254).pack());
    }

    #[test]
    fn radius_one_is_a_plus() {
        let mut fb = FrameBuffer::new(3, 3, Rgb::BLACK);
        draw_point(&mut fb.view(), IVec2::new(1, 1), 1, Rgb::WHITE, 255);
        assert_eq!(covered(&fb), 5);
        assert_eq!(fb.pixels()[0], 0);
    }

    #[test]
    fn disc_is_symmetric_and_blended_once() {
        let mut fb = FrameBuffer::new(21, 21, Rgb::BLACK);
        draw_point(&mut fb.view(), IVec2::new(10, 10), 6, Rgb::new(200, 100, 0), 128);
        let px = fb.pixels();
        let once = Rgb::new(100, 50, 0).pack();
        for y in 0..21 {
            for x in 0..21 {
                let p = px[y * 21 + x];
                assert!(p == 0 || p == once);
                assert_eq!(p, px[y * 21 + (20 - x)]);
                assert_eq!(p, px[(20 - y) * 21 + x]);
            }
        }
        assert_eq!(px[10 * 21 + 4], once);
        assert_eq!(px[10 * 21 + 3], 0);
    }

    #[test]
    fn huge_radius_fills_the_frame() {
        for center in [IVec2::new(1, 1), IVec2::new(-3, 7), IVec2::new(i32::MAX, i32::MIN)] {
            let mut fb = FrameBuffer::new(4, 3, Rgb::BLACK);
            draw_point(&mut fb.view(), center, i32::MAX, Rgb::WHITE, 255);
            if center.x == i32::MAX {
                // out of reach once the radius is capped
                assert_eq!(covered(&fb), 0);
            } else {
                assert_eq!(covered(&fb), 12);
            }
        }
    }

    #[test]
    fn far_center_misses_the_frame() {
        let mut fb = FrameBuffer::new(4, 4, Rgb::BLACK);
        draw_point(&mut fb.view(), IVec2::new(100, 2), 50, Rgb::WHITE, 255);
        assert_eq!(covered(&fb), 0);
    }

    #[test]
    fn clipped_at_frame_edge() {
        let mut fb = FrameBuffer::new(4, 4, Rgb::BLACK);
        draw_point(&mut fb.view(), IVec2::new(0, 0), 3, Rgb::WHITE, 255);
        assert!(covered(&fb) > 0);
    }
}
