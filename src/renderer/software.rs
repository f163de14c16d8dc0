//! ---------------------------------------------------------------------------
//! CPU rasteriser with a per-pixel fragment store
//!
//! * Writes a caller-owned [`Image`] (0x00RRGGBB color + reciprocal depth).
//! * Keeps every sample, visible or not, in a [`TraceBuffer`] so the post
//!   passes can look behind the front surface.
//! * Rows are independent in every stage and run on the rayon pool.
//! ---------------------------------------------------------------------------

use glam::{IVec2, Vec3};
use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::{
    error::RenderError,
    renderer::{FrameConfig, Image, Renderer, Rgb},
    world::{LightingSetup, Polygon, SurfaceMaps},
};

pub mod alpha;
pub mod bresenham;
pub mod lighting;
pub mod line;
pub mod point;
pub mod polygon;
pub mod reflection;
pub mod shadow;
pub mod trace;

use polygon::EdgePoint;
use trace::TraceBuffer;

/*───────────────────────────────────────────────────────────────────────*/
/*                            Shared helpers                             */
/*───────────────────────────────────────────────────────────────────────*/

/// `1 / z`, with `0` mapping to `0`.
#[inline]
pub fn recip(z: f32) -> f32 {
    if z == 0.0 { 0.0 } else { 1.0 / z }
}

/// Fog darkening subtracted from each channel at reciprocal depth `r`.
#[inline]
pub fn fog_shade(r: f32, scale: f32) -> i32 {
    (((1.0 - recip(r)) * scale) as i32).max(0)
}

/// Deterministic per-pixel generator, independent of thread scheduling.
#[inline]
pub(crate) fn pixel_rng(seed: u64, idx: usize) -> SmallRng {
    SmallRng::seed_from_u64(seed ^ (idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Largest screen offset a marched ray may aim at.
pub(crate) const RAY_LIMIT: i32 = 1 << 24;

#[inline]
pub(crate) fn light_xy(light: Vec3) -> IVec2 {
    let lim = RAY_LIMIT as f32;
    IVec2::new(light.x.clamp(-lim, lim) as i32, light.y.clamp(-lim, lim) as i32)
}

/// `base + offset`, saturating, then pulled back inside `±RAY_LIMIT`.
#[inline]
pub(crate) fn ray_target(base: IVec2, offset: IVec2) -> IVec2 {
    let ch = |b: i32, o: i32| b.saturating_add(o).clamp(-RAY_LIMIT, RAY_LIMIT);
    IVec2::new(ch(base.x, offset.x), ch(base.y, offset.y))
}

/*───────────────────────────────────────────────────────────────────────*/
/*                                Backend                                */
/*───────────────────────────────────────────────────────────────────────*/

/// Software renderer state carried between draws of a frame.
#[derive(Default)]
pub struct Software {
    config: FrameConfig,
    maps: SurfaceMaps,
    lighting: Option<LightingSetup>,
    trace: Option<TraceBuffer>,
    /// polygon edge scratch, reused across draws
    edges: Vec<EdgePoint>,
}

impl Software {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    // ---- State ----

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FrameConfig {
        &mut self.config
    }

    pub fn maps(&self) -> &SurfaceMaps {
        &self.maps
    }

    pub fn maps_mut(&mut self) -> &mut SurfaceMaps {
        &mut self.maps
    }

    pub fn set_lighting(&mut self, setup: LightingSetup) {
        self.lighting = Some(setup);
    }

    pub fn trace(&self) -> Option<&TraceBuffer> {
        self.trace.as_ref()
    }

    // ---- Trace buffer lifecycle ----

    /// Allocate the fragment store, or reset it when already at this size.
    pub fn init_trace_buffer(&mut self, width: usize, height: usize) -> Result<(), RenderError> {
        match &mut self.trace {
            Some(t) if t.width() == width && t.height() == height => {
                debug!("trace buffer {width}x{height} reset");
                t.reset();
            }
            Some(t) => {
                return Err(RenderError::TraceResize {
                    old_w: t.width(),
                    old_h: t.height(),
                    new_w: width,
                    new_h: height,
                });
            }
            None => {
                debug!("trace buffer {width}x{height} allocated");
                self.trace = Some(TraceBuffer::new(width, height));
            }
        }
        Ok(())
    }

    pub fn release_trace_buffer(&mut self) {
        if self.trace.take().is_some() {
            debug!("trace buffer released");
        }
    }

    /// Trace buffer matching `image`, split from the rest of the state.
    fn trace_for<'t>(
        trace: &'t mut Option<TraceBuffer>,
        image: &Image<'_>,
    ) -> Result<&'t mut TraceBuffer, RenderError> {
        let t = trace.as_mut().ok_or(RenderError::NoTraceBuffer)?;
        if t.width() != image.width() || t.height() != image.height() {
            return Err(RenderError::TraceSizeMismatch {
                trace_w: t.width(),
                trace_h: t.height(),
                image_w: image.width(),
                image_h: image.height(),
            });
        }
        Ok(t)
    }
}

/*──────────────────────── Renderer trait impl ────────────────────────*/
impl Renderer for Software {
    fn draw_line(
        &mut self,
        image: &mut Image<'_>,
        from: IVec2,
        z0: f32,
        to: IVec2,
        z1: f32,
        color: Rgb,
    ) {
        line::draw_line(image, from, z0, to, z1, color, self.config.fog_scale);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_shaded_line(
        &mut self,
        image: &mut Image<'_>,
        from: IVec2,
        z0: f32,
        to: IVec2,
        z1: f32,
        c0: Vec3,
        c1: Vec3,
    ) {
        line::draw_shaded_line(image, from, z0, to, z1, c0, c1, self.config.fog_scale);
    }

    fn draw_point(&mut self, image: &mut Image<'_>, center: IVec2, radius: i32, color: Rgb, alpha: u8) {
        point::draw_point(image, center, radius, color, alpha);
    }

    fn draw_polygon(&mut self, image: &mut Image<'_>, poly: &Polygon) -> Result<(), RenderError> {
        let trace = Self::trace_for(&mut self.trace, image)?;
        polygon::draw_polygon(image, trace, poly, &self.maps, &self.config, &mut self.edges)
    }

    fn apply_global_lighting(&mut self, image: &mut Image<'_>) -> Result<(), RenderError> {
        let trace = Self::trace_for(&mut self.trace, image)?;
        let Some(setup) = &self.lighting else {
            warn!("no lighting set up; lighting pass skipped");
            return Ok(());
        };
        lighting::apply(image, trace, setup);
        debug!("lighting: {} lights", setup.lights.len());
        Ok(())
    }

    fn apply_shadows(&mut self, image: &mut Image<'_>, light: Vec3) -> Result<(), RenderError> {
        let trace = Self::trace_for(&mut self.trace, image)?;
        let params = &self.config.shadow;
        shadow::apply(image, trace, light, params, self.config.seed);
        debug!("shadows: {}x{} samples toward {light}", params.depth, params.depth);
        Ok(())
    }

    fn apply_reflections(&mut self, image: &mut Image<'_>, light: Vec3) -> Result<(), RenderError> {
        let trace = Self::trace_for(&mut self.trace, image)?;
        let params = &self.config.reflection;
        reflection::apply(image, trace, light, params, self.config.seed);
        debug!("reflections: {}x{} rays per layer", params.depth, params.depth);
        Ok(())
    }

    fn apply_transparency(&mut self, image: &mut Image<'_>) -> Result<(), RenderError> {
        let trace = Self::trace_for(&mut self.trace, image)?;
        alpha::apply(image, trace, self.config.background);
        Ok(())
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
