//! Polygon rasteriser: edge walk → row spans → parallel fill.
//!
//! ```text
//!  ring ──walk_edges──▶ EdgePoint samples ──sort (y,x)──▶ rows
//!  rows ──row_spans──▶ merged spans ──rayon, one row per task──▶ pixels + fragments
//! ```
//!
//! Every pixel a polygon covers is visited once per draw.  The depth test
//! only gates the color/depth write; the fragment store records the sample
//! either way so hidden surfaces stay visible to the later passes.

use glam::{IVec2, Vec2, Vec3};
use rayon::prelude::*;
use smallvec::SmallVec;

use super::bresenham::{Bresenham, steps};
use super::trace::{Fragment, Layers, TraceBuffer, insert};
use super::{fog_shade, recip};
use crate::error::RenderError;
use crate::renderer::{FrameConfig, Image, Rgb, Rgba};
use crate::world::{Polygon, SurfaceMaps, TextureMap};

/// One boundary pixel produced by walking an edge.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgePoint {
    pub x: i32,
    pub y: i32,
    /// Raw depth; spans interpolate its reciprocal.
    pub z: f32,
    pub color: Vec3,
    /// Texel coordinates.
    pub tex: Vec2,
    /// Bump-map texel coordinates.
    pub bump: Vec2,
    pub normal: Vec3,
    /// Index of the edge that produced the sample.
    pub edge: u32,
}

/// Interpolated attributes at a polygon corner.
#[derive(Clone, Copy, Debug)]
struct Corner {
    z: f32,
    color: Vec3,
    tex: Vec2,
    bump: Vec2,
    normal: Vec3,
}

impl Corner {
    #[inline]
    fn lerp(&self, o: &Corner, t: f32) -> Corner {
        Corner {
            z: self.z + (o.z - self.z) * t,
            color: self.color.lerp(o.color, t),
            tex: self.tex.lerp(o.tex, t),
            bump: self.bump.lerp(o.bump, t),
            normal: self.normal.lerp(o.normal, t),
        }
    }
}

fn corners(polygon: &Polygon, maps: &SurfaceMaps) -> Vec<Corner> {
    let texel = |map: &Option<TextureMap>, i: usize| match (map, &maps.anchors) {
        (Some(m), Some(a)) => m.anchor_to_texel(a.0[i]),
        _ => Vec2::ZERO,
    };
    polygon
        .vertices
        .iter()
        .enumerate()
        .map(|(i, v)| Corner {
            z: v.pos.z,
            color: v.color,
            tex: texel(&maps.texture, i),
            bump: texel(&maps.bump, i),
            normal: maps.normals.as_ref().map_or(polygon.normal, |n| n.0[i]),
        })
        .collect()
}

/// Walk every edge of the closed ring into `out` (cleared first).
///
/// Both end pixels of an edge are emitted; the last one carries the end
/// corner's attributes exactly.
pub fn walk_edges(polygon: &Polygon, maps: &SurfaceMaps, out: &mut Vec<EdgePoint>) {
    out.clear();
    let corners = corners(polygon, maps);
    let n = polygon.len();
    for e in 0..n {
        let (a, b) = (&polygon.vertices[e], &polygon.vertices[(e + 1) % n]);
        let (ca, cb) = (&corners[e], &corners[(e + 1) % n]);
        let p0 = IVec2::new(a.pos.x as i32, a.pos.y as i32);
        let p1 = IVec2::new(b.pos.x as i32, b.pos.y as i32);
        let len = steps(p0, p1);
        for (k, p) in Bresenham::new(p0, p1).enumerate() {
            let c = if k as i32 == len {
                *cb
            } else {
                ca.lerp(cb, k as f32 / len as f32)
            };
            out.push(EdgePoint {
                x: p.x,
                y: p.y,
                z: c.z,
                color: c.color,
                tex: c.tex,
                bump: c.bump,
                normal: c.normal,
                edge: e as u32,
            });
        }
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                                 Spans                                 */
/*───────────────────────────────────────────────────────────────────────*/

/// Horizontal run between two samples of the same row, `a.x <= b.x`.
#[derive(Clone, Copy, Debug)]
pub struct Span {
    pub a: EdgePoint,
    pub b: EdgePoint,
}

/// True when the edge spanning rows `ya..yb` crosses row `y` (half-open).
#[inline]
fn crosses((ya, yb): (i32, i32), y: i32) -> bool {
    ya.min(yb) <= y && y < ya.max(yb)
}

/// Spans of one row.  `row` holds that row's samples sorted by x.
///
/// With `fill`, crossing edges are paired left to right (even-odd) and
/// every sample also counts as a one-pixel span; the result is merged so
/// no pixel appears twice.  Without it, each distinct sample pixel is its
/// own span.
pub fn row_spans(row: &[EdgePoint], edge_rows: &[(i32, i32)], fill: bool, out: &mut Vec<Span>) {
    out.clear();
    let Some(first) = row.first() else {
        return;
    };
    let y = first.y;

    if !fill {
        let mut last_x = None;
        for p in row {
            if last_x != Some(p.x) {
                out.push(Span { a: *p, b: *p });
                last_x = Some(p.x);
            }
        }
        return;
    }

    // (edge, leftmost, rightmost) in order of first appearance = by min x
    let mut runs: SmallVec<[(u32, EdgePoint, EdgePoint); 8]> = SmallVec::new();
    for p in row {
        if !crosses(edge_rows[p.edge as usize], y) {
            continue;
        }
        match runs.iter_mut().find(|r| r.0 == p.edge) {
            Some(r) => r.2 = *p,
            None => runs.push((p.edge, *p, *p)),
        }
    }

    let mut spans: SmallVec<[Span; 16]> = runs
        .chunks_exact(2)
        .map(|pair| Span {
            a: pair[0].1,
            b: pair[1].2,
        })
        .collect();
    spans.extend(row.iter().map(|p| Span { a: *p, b: *p }));
    spans.sort_by_key(|s| s.a.x);

    for s in spans {
        match out.last_mut() {
            Some(cur) if s.a.x <= cur.b.x + 1 => {
                if s.b.x > cur.b.x {
                    cur.b = s.b;
                }
            }
            _ => out.push(s),
        }
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                                 Shading                               */
/*───────────────────────────────────────────────────────────────────────*/

/// Everything a row task needs to turn an interpolated sample into a
/// pixel write and a fragment.
struct Shader<'m> {
    texture: Option<&'m TextureMap>,
    bump: Option<&'m TextureMap>,
    fog: f32,
    stamp: Fragment,
}

impl<'m> Shader<'m> {
    fn new(maps: &'m SurfaceMaps, config: &FrameConfig) -> Self {
        Self {
            texture: maps.texture.as_ref(),
            bump: maps.bump.as_ref(),
            fog: config.fog_scale,
            stamp: Fragment {
                alpha: config.alpha,
                beta: config.beta,
                surface: config.surface_color,
                one_sided: config.one_sided(),
                polygon_id: config.polygon_id,
                ..Fragment::BACKGROUND
            },
        }
    }

    fn fill_span(&self, px: &mut [Rgba], depth: &mut [f32], cells: &mut [Layers], s: &Span) {
        let (a, b) = (&s.a, &s.b);
        let (ra, rb) = (recip(a.z), recip(b.z));
        let dx = (b.x - a.x) as f32;
        let x0 = a.x.max(0);
        let x1 = b.x.min(px.len() as i32 - 1);
        for x in x0..=x1 {
            let t = if dx == 0.0 { 0.0 } else { (x - a.x) as f32 / dx };
            let r = ra + (rb - ra) * t;
            let i = x as usize;
            self.write(
                &mut px[i],
                &mut depth[i],
                &mut cells[i],
                r,
                a.color.lerp(b.color, t),
                a.tex.lerp(b.tex, t),
                a.bump.lerp(b.bump, t),
                a.normal.lerp(b.normal, t),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[inline]
    fn write(
        &self,
        px: &mut Rgba,
        depth: &mut f32,
        layers: &mut Layers,
        r: f32,
        color: Vec3,
        tex: Vec2,
        bump: Vec2,
        normal: Vec3,
    ) {
        let shade = fog_shade(r, self.fog);
        let color = match self.texture {
            Some(t) => {
                let [tr, tg, tb] = t.sample(tex);
                Rgb::clamped(tr - shade, tg - shade, tb - shade)
            }
            None => {
                let c = color * 255.0;
                Rgb::clamped(c.x as i32 - shade, c.y as i32 - shade, c.z as i32 - shade)
            }
        };
        let normal = match self.bump {
            Some(m) => normal + m.sample_bump(bump),
            None => normal,
        };

        if *depth > r {
            *depth = r;
            *px = color.pack();
        }
        insert(
            layers,
            Fragment {
                normal,
                depth: r,
                color,
                ..self.stamp
            },
        );
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                                 Driver                                */
/*───────────────────────────────────────────────────────────────────────*/

/// Rasterise `polygon` into `image` and `trace`.
///
/// `edges` is reusable scratch; its contents on return are the sorted
/// boundary samples.
pub(crate) fn draw_polygon(
    image: &mut Image<'_>,
    trace: &mut TraceBuffer,
    polygon: &Polygon,
    maps: &SurfaceMaps,
    config: &FrameConfig,
    edges: &mut Vec<EdgePoint>,
) -> Result<(), RenderError> {
    maps.check(polygon.len())?;
    let (w, h) = (image.width(), image.height());
    if polygon.is_empty() || w == 0 || h == 0 {
        return Ok(());
    }

    walk_edges(polygon, maps, edges);
    edges.sort_by_key(|p| (p.y, p.x));

    let first = edges[0].y.max(0);
    let last = edges[edges.len() - 1].y.min(h as i32 - 1);
    if first > last {
        return Ok(());
    }

    let n = polygon.len();
    let edge_rows: Vec<(i32, i32)> = (0..n)
        .map(|e| {
            let ya = polygon.vertices[e].pos.y as i32;
            let yb = polygon.vertices[(e + 1) % n].pos.y as i32;
            (ya, yb)
        })
        .collect();

    let mut jobs: Vec<Vec<Span>> = vec![Vec::new(); (last - first + 1) as usize];
    for row in edges.chunk_by(|a, b| a.y == b.y) {
        let y = row[0].y;
        if (first..=last).contains(&y) {
            row_spans(row, &edge_rows, config.fill(), &mut jobs[(y - first) as usize]);
        }
    }

    let shader = Shader::new(maps, config);
    let lo = first as usize * w;
    let hi = (last as usize + 1) * w;
    let (pixels, depth) = image.buffers_mut();
    pixels[lo..hi]
        .par_chunks_mut(w)
        .zip(depth[lo..hi].par_chunks_mut(w))
        .zip(trace.cells_mut()[lo..hi].par_chunks_mut(w))
        .zip(jobs.par_iter())
        .for_each(|(((px, dp), cells), spans)| {
            for s in spans {
                shader.fill_span(px, dp, cells, s);
            }
        });
    Ok(())
}

/*──────────────────────────────── Tests ───────────────────────────────*/
