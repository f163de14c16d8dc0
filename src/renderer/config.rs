//! Per-frame configuration consumed by the rasteriser and the post passes.
//!
//! Every setter validates its own field.  A rejected value is logged with
//! `warn!` and the previous value stays in place; the other arguments of the
//! same call are still applied.

use bitflags::bitflags;
use glam::{UVec2, Vec2, Vec3};
use log::warn;

use super::Rgb;

bitflags! {
    /// Rasteriser switches.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RasterFlags: u8 {
        /// Fill spans between edges; off draws outlines only.
        const FILL      = 0b01;
        /// Surfaces facing away from a light stay dark.
        const ONE_SIDED = 0b10;
    }
}

/// Area-light sampling for [`crate::renderer::Renderer::apply_shadows`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowParams {
    /// Light extent in pixels, split into `depth × depth` cells.
    pub area: UVec2,
    /// Max depth difference that counts as an occluder.
    pub tolerance: f32,
    /// Samples per axis.
    pub depth: u32,
    /// Total darkening when every sample is blocked.
    pub darkness: f32,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            area: UVec2::new(10, 10),
            tolerance: 0.01,
            depth: 1,
            darkness: 0.5,
        }
    }
}

/// Ray parameters for [`crate::renderer::Renderer::apply_reflections`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReflectionParams {
    /// Distance skipped before the ray starts sampling.
    pub offset: f32,
    /// Perturbations per axis.
    pub depth: u32,
    /// Ray length past `offset`.
    pub projection: f32,
    /// Max depth difference that counts as a hit.
    pub threshold: f32,
    pub area: Vec2,
}

impl Default for ReflectionParams {
    fn default() -> Self {
        Self {
            offset: 1.275,
            depth: 1,
            projection: 200.0,
            threshold: 0.01,
            area: Vec2::new(1000.0, 1000.0),
        }
    }
}

/// Scalars stamped onto every fragment plus the pass parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameConfig {
    pub alpha: f32,
    pub beta: f32,
    /// Specular tint, `[0,1]` per channel.
    pub surface_color: Vec3,
    pub background: Rgb,
    pub fog_scale: f32,
    pub polygon_id: i32,
    pub flags: RasterFlags,
    pub shadow: ShadowParams,
    pub reflection: ReflectionParams,
    /// Base seed for the jittered shadow/reflection samples.
    pub seed: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.5,
            surface_color: Vec3::ONE,
            background: Rgb::WHITE,
            fog_scale: 0.0,
            polygon_id: 0,
            flags: RasterFlags::ONE_SIDED,
            shadow: ShadowParams::default(),
            reflection: ReflectionParams::default(),
            seed: 0x5EED,
        }
    }
}

#[inline]
fn unit(v: f32) -> bool {
    (0.0..=1.0).contains(&v)
}

impl FrameConfig {
    pub fn set_alpha(&mut self, value: f32) {
        if unit(value) {
            self.alpha = value;
        } else {
            warn!("alpha {value} outside [0,1]; keeping {}", self.alpha);
        }
    }

    pub fn set_beta(&mut self, value: f32) {
        if unit(value) {
            self.beta = value;
        } else {
            warn!("beta {value} outside [0,1]; keeping {}", self.beta);
        }
    }

    pub fn set_surface_color(&mut self, r: f32, g: f32, b: f32) {
        self.surface_color = Vec3::new(r, g, b);
    }

    pub fn set_background_color(&mut self, r: u8, g: u8, b: u8) {
        self.background = Rgb::new(r, g, b);
    }

    pub fn set_fog_scale(&mut self, value: f32) {
        self.fog_scale = value;
    }

    pub fn set_polygon_id(&mut self, id: i32) {
        self.polygon_id = id;
    }

    pub fn set_polygon_fill(&mut self, enabled: bool) {
        self.flags.set(RasterFlags::FILL, enabled);
    }

    pub fn set_one_sided(&mut self, enabled: bool) {
        self.flags.set(RasterFlags::ONE_SIDED, enabled);
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    #[inline]
    pub fn fill(&self) -> bool {
        self.flags.contains(RasterFlags::FILL)
    }

    #[inline]
    pub fn one_sided(&self) -> bool {
        self.flags.contains(RasterFlags::ONE_SIDED)
    }

    pub fn set_shadow_meta_parameters(
        &mut self,
        area_x: u32,
        area_y: u32,
        tolerance: f32,
        diffusion_depth: u32,
        darkness: f32,
    ) {
        let s = &mut self.shadow;
        if area_x == 0 || area_y == 0 {
            warn!("shadow area {area_x}x{area_y} is empty; keeping {}x{}", s.area.x, s.area.y);
        } else {
            s.area = UVec2::new(area_x, area_y);
        }
        if tolerance >= 0.0 {
            s.tolerance = tolerance;
        } else {
            warn!("negative shadow tolerance {tolerance}; keeping {}", s.tolerance);
        }
        if diffusion_depth >= 1 {
            s.depth = diffusion_depth;
        } else {
            warn!("shadow diffusion depth must be at least 1; keeping {}", s.depth);
        }
        if unit(darkness) {
            s.darkness = darkness;
        } else {
            warn!("darkness factor {darkness} outside [0,1]; keeping {}", s.darkness);
        }
    }

    pub fn set_reflection_meta_parameters(
        &mut self,
        offset: f32,
        max_diffusion_depth: u32,
        projection: f32,
        threshold: f32,
        area_x: f32,
        area_y: f32,
    ) {
        let r = &mut self.reflection;
        if offset >= 0.0 {
            r.offset = offset;
        } else {
            warn!("negative reflection offset {offset}; keeping {}", r.offset);
        }
        if max_diffusion_depth >= 1 {
            r.depth = max_diffusion_depth;
        } else {
            warn!("reflection diffusion depth must be at least 1; keeping {}", r.depth);
        }
        if projection > 0.0 {
            r.projection = projection;
        } else {
            warn!("reflection projection {projection} must be positive; keeping {}", r.projection);
        }
        if threshold >= 0.0 {
            r.threshold = threshold;
        } else {
            warn!("negative reflection threshold {threshold}; keeping {}", r.threshold);
        }
        if area_x == 0.0 || area_y == 0.0 {
            warn!("reflection area {area_x}x{area_y} is empty; keeping {}x{}", r.area.x, r.area.y);
        } else {
            r.area = Vec2::new(area_x, area_y);
        }
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
