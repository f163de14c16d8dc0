use glam::Vec3;
use rayon::prelude::*;

use super::trace::{Fragment, TraceBuffer};
use crate::renderer::{DEPTH_CUTOFF, Image, Rgb};

/// Layers closer together than this count as one surface sampled twice.
pub const ALPHA_TOLERANCE: f32 = 0.025;

/// Blend one pixel's layers back to front over `background`.
///
/// A layer is skipped when a farther layer already blended, or skipped,
/// sits within [`ALPHA_TOLERANCE`] of it.
pub fn composite(layers: &[Fragment], background: Rgb) -> Rgb {
    let bg = background;
    let mut running = Vec3::new(bg.r as f32, bg.g as f32, bg.b as f32);
    for (k, f) in layers.iter().enumerate().rev() {
        if f.is_background() {
            continue;
        }
        let behind = &layers[k + 1..];
        if behind
            .iter()
            .any(|g| !g.is_background() && (g.depth - f.depth).abs() < ALPHA_TOLERANCE)
        {
            continue;
        }
        let c = Vec3::new(f.color.r as f32, f.color.g as f32, f.color.b as f32);
        running = running * f.alpha + c * (1.0 - f.alpha);
    }
    Rgb::clamped(running.x as i32, running.y as i32, running.z as i32)
}

/// Rewrite every visible pixel from its composited layers.
///
/// Reads only the fragment store, so running it twice changes nothing.
pub(crate) fn apply(image: &mut Image<'_>, trace: &TraceBuffer, background: Rgb) {
    let w = image.width();
    if w == 0 {
        return;
    }
    let (pixels, depth) = image.buffers_mut();
    pixels
        .par_chunks_mut(w)
        .zip(depth.par_chunks(w))
        .zip(trace.cells().par_chunks(w))
        .for_each(|((px, dp), cells)| {
            for ((p, &d), layers) in px.iter_mut().zip(dp).zip(cells) {
                if d <= DEPTH_CUTOFF {
                    *p = composite(layers, background).pack();
                }
            }
        });
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::FrameBuffer;

    fn frag(depth: f32, alpha: f32, color: Rgb) -> Fragment {
        Fragment {
            depth,
            alpha,
            color,
            polygon_id: 0,
            ..Fragment::BACKGROUND
        }
    }

    const RED: Rgb = Rgb::new(200, 0, 0);

    #[test]
    fn single_layer_over_background() {
        let c = composite(&[frag(0.5, 0.5, RED)], Rgb::WHITE);
        assert_eq!(c, Rgb::new(227, 127, 127));
    }

    #[test]
    fn opaque_front_layer_wins() {
        let layers = [frag(0.2, 0.0, Rgb::new(0, 0, 90)), frag(0.5, 0.5, RED)];
        assert_eq!(composite(&layers, Rgb::WHITE), Rgb::new(0, 0, 90));
    }

    #[test]
    fn near_duplicate_layer_is_blended_once() {
        let once = composite(&[frag(0.5, 0.5, RED)], Rgb::WHITE);
        let twice = composite(&[frag(0.49, 0.5, RED), frag(0.5, 0.5, RED)], Rgb::WHITE);
        assert_eq!(once, twice);
    }

    #[test]
    fn pass_is_idempotent_and_skips_background() {
        let mut fb = FrameBuffer::new(2, 1, Rgb::WHITE);
        let mut tb = TraceBuffer::new(2, 1);
        tb.insert(0, frag(0.5, 0.5, RED));
        tb.insert(0, frag(0.3, 0.25, Rgb::new(0, 100, 0)));
        fb.view().plot(0, 0.3, 0x123456);

        apply(&mut fb.view(), &tb, Rgb::WHITE);
        let first = fb.pixels().to_vec();
        apply(&mut fb.view(), &tb, Rgb::WHITE);
        assert_eq!(fb.pixels(), &first[..]);
        assert_ne!(first[0], 0x123456);
        assert_eq!(first[1], Rgb::WHITE.pack());
    }
}
