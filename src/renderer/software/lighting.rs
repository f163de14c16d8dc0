//! Ambient + point light evaluation and the per-pixel lighting pass.

use glam::Vec3;
use rayon::prelude::*;

use super::recip;
use super::trace::TraceBuffer;
use crate::renderer::{DEPTH_CUTOFF, Image, Rgb};
use crate::world::{LightKind, LightingSetup};

/// `x^s` by repeated multiplication; `s == 0` gives 1.
#[inline]
fn ipow(x: f32, s: u32) -> f32 {
    (0..s).fold(1.0, |acc, _| acc * x)
}

/// Surface seen at one pixel.
#[derive(Clone, Copy, Debug)]
pub struct SurfacePoint {
    /// Body color, `[0,1]`.
    pub body: Vec3,
    /// Specular tint, `[0,1]`.
    pub surface: Vec3,
    pub pos: Vec3,
    pub normal: Vec3,
    pub one_sided: bool,
}

/// Sum of every light's contribution, unclamped, `[0,1]` scale.
///
/// `positions` are the lights' positions already in screen space, in the
/// same order as `setup.lights`.
pub fn shade(setup: &LightingSetup, positions: &[Vec3], p: &SurfacePoint) -> Vec3 {
    let n = p.normal.normalize_or_zero();
    setup
        .lights
        .iter()
        .zip(positions)
        .map(|(light, &lpos)| match light.kind {
            LightKind::Ambient => light.color * p.body,
            LightKind::Point => {
                let l = (lpos - p.pos).normalize_or_zero();
                let h = ((l + setup.view) / 2.0).normalize_or_zero();
                let (mut diffuse, mut spec) = (l.dot(n), h.dot(n));
                if !p.one_sided && diffuse < 0.0 {
                    diffuse = -diffuse;
                    spec = -spec;
                }
                p.body * light.color * diffuse + light.color * p.surface * ipow(spec, light.sharpness)
            }
        })
        .fold(Vec3::ZERO, |acc, c| acc + c)
}

/// Relight every visible pixel from its head fragment.
///
/// Both the head fragment's color and the pixel are replaced.
pub(crate) fn apply(image: &mut Image<'_>, trace: &mut TraceBuffer, setup: &LightingSetup) {
    let w = image.width();
    if w == 0 {
        return;
    }
    let positions: Vec<Vec3> = setup
        .lights
        .iter()
        .map(|l| setup.view_transform.transform_point3(l.pos))
        .collect();

    let (pixels, depth) = image.buffers_mut();
    pixels
        .par_chunks_mut(w)
        .zip(depth.par_chunks(w))
        .zip(trace.cells_mut().par_chunks_mut(w))
        .enumerate()
        .for_each(|(row, ((px, dp), cells))| {
            for col in 0..px.len() {
                let d = dp[col];
                if d > DEPTH_CUTOFF {
                    continue;
                }
                let Some(head) = cells[col].first_mut() else {
                    continue;
                };
                let point = SurfacePoint {
                    body: head.color.to_unit(),
                    surface: head.surface,
                    pos: Vec3::new(col as f32, row as f32, recip(d)),
                    normal: head.normal,
                    one_sided: head.one_sided,
                };
                let c = Rgb::from_unit(shade(setup, &positions, &point));
                head.color = c;
                px[col] = c.pack();
            }
        });
}

/*──────────────────────────────── Tests ───────────────────────────────*/
