//! Rendering abstraction layer.
//!
//! *The renderer never owns the frame.*  Callers hand it an [`Image`], a
//! borrowed view over their pixel and depth buffers, and drive a frame in
//! two phases:
//!
//! * rasterise geometry with [`Renderer::draw_line`] / [`Renderer::draw_polygon`],
//!   which fills the image and the per-pixel fragment store;
//! * run the post passes (lighting, shadows, reflections, transparency) that
//!   ray-march through the fragment store.
//!
//! [`RendererExt::post_process`] runs the selected passes in pipeline order
//! so call-sites stay short.

use bitflags::bitflags;
use glam::{IVec2, Vec3};

use crate::error::RenderError;
use crate::world::geometry::Polygon;

pub mod config;
pub mod software;

pub use config::{FrameConfig, RasterFlags, ReflectionParams, ShadowParams};
pub use software::Software;

/// Pixel format of the software frame-buffer (0x00RRGGBB).
pub type Rgba = u32;

/// Depth stored in cells nothing has been drawn to.
pub const BACKGROUND_DEPTH: f32 = 1000.0;

/// Stored reciprocal depths above this value count as background.
pub const DEPTH_CUTOFF: f32 = 100.0;

/// Unpacked 8-bit color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from wide integers, clamping each channel to `0..=255`.
    #[inline]
    pub fn clamped(r: i32, g: i32, b: i32) -> Self {
        Self {
            r: r.clamp(0, 255) as u8,
            g: g.clamp(0, 255) as u8,
            b: b.clamp(0, 255) as u8,
        }
    }

    /// Convert a `[0,1]` color to 8 bits, rounding to nearest.
    #[inline]
    pub fn from_unit(c: Vec3) -> Self {
        let c = (c * 255.0).round();
        Self::clamped(c.x as i32, c.y as i32, c.z as i32)
    }

    /// Channels as `[0,1]` floats.
    #[inline]
    pub fn to_unit(self) -> Vec3 {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32) / 255.0
    }

    #[inline]
    pub fn pack(self) -> Rgba {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    #[inline]
    pub fn unpack(px: Rgba) -> Self {
        Self {
            r: ((px >> 16) & 0xFF) as u8,
            g: ((px >> 8) & 0xFF) as u8,
            b: (px & 0xFF) as u8,
        }
    }

    /// Multiply every channel by `k` (truncating, clamped on the way out).
    #[inline]
    pub fn scale(self, k: f32) -> Self {
        Self::clamped(
            (self.r as f32 * k) as i32,
            (self.g as f32 * k) as i32,
            (self.b as f32 * k) as i32,
        )
    }

    /// `self * w + other * (1 - w)`, truncating.
    #[inline]
    pub fn mix(self, other: Rgb, w: f32) -> Self {
        let ch = |a: u8, b: u8| (a as f32 * w + b as f32 * (1.0 - w)) as i32;
        Self::clamped(
            ch(self.r, other.r),
            ch(self.g, other.g),
            ch(self.b, other.b),
        )
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                              Framebuffer                              */
/*───────────────────────────────────────────────────────────────────────*/

/// Borrowed view over a caller-owned color + depth buffer pair.
///
/// Depth cells hold reciprocal depth; a smaller value is nearer.
pub struct Image<'a> {
    pixels: &'a mut [Rgba],
    depth: &'a mut [f32],
    width: usize,
    height: usize,
}

impl<'a> Image<'a> {
    /// Wrap two buffers, checking that both hold `width * height` cells.
    pub fn new(
        pixels: &'a mut [Rgba],
        depth: &'a mut [f32],
        width: usize,
        height: usize,
    ) -> Result<Self, RenderError> {
        let cells = width * height;
        if pixels.len() != cells || depth.len() != cells {
            return Err(RenderError::BufferSize {
                width,
                height,
                pixels: pixels.len(),
                depth: depth.len(),
            });
        }
        Ok(Self {
            pixels,
            depth,
            width,
            height,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Linear index of `(x, y)`, or `None` outside the frame.
    #[inline]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height)
            .then(|| y as usize * self.width + x as usize)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgba> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    pub fn depth_at(&self, x: i32, y: i32) -> Option<f32> {
        self.index(x, y).map(|i| self.depth[i])
    }

    pub fn pixels(&self) -> &[Rgba] {
        self.pixels
    }

    pub fn depth(&self) -> &[f32] {
        self.depth
    }

    /// Split into the color (mutable) and depth (mutable) halves.
    #[inline]
    pub(crate) fn buffers_mut(&mut self) -> (&mut [Rgba], &mut [f32]) {
        (self.pixels, self.depth)
    }

    /// Depth-tested write at a linear index. Returns true when it landed.
    #[inline]
    pub(crate) fn plot(&mut self, idx: usize, inv_z: f32, color: Rgba) -> bool {
        if self.depth[idx] > inv_z {
            self.depth[idx] = inv_z;
            self.pixels[idx] = color;
            true
        } else {
            false
        }
    }

    /// Unconditional color write at a linear index.
    #[inline]
    pub(crate) fn put(&mut self, idx: usize, color: Rgba) {
        self.pixels[idx] = color;
    }

    /// Fill with `color` and reset every depth cell to background.
    pub fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color.pack());
        self.depth.fill(BACKGROUND_DEPTH);
    }
}

/// Owned color + depth buffers for callers that do not bring their own.
pub struct FrameBuffer {
    pixels: Vec<Rgba>,
    depth: Vec<f32>,
    width: usize,
    height: usize,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize, background: Rgb) -> Self {
        Self {
            pixels: vec![background.pack(); width * height],
            depth: vec![BACKGROUND_DEPTH; width * height],
            width,
            height,
        }
    }

    pub fn view(&mut self) -> Image<'_> {
        Image {
            pixels: &mut self.pixels,
            depth: &mut self.depth,
            width: self.width,
            height: self.height,
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

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn depth(&self) -> &[f32] {
        &self.depth
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                            Renderer traits                            */
/*───────────────────────────────────────────────────────────────────────*/

bitflags! {
    /// Post passes selectable for [`RendererExt::post_process`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Passes: u8 {
        const LIGHTING     = 0b0001;
        const SHADOWS      = 0b0010;
        const REFLECTIONS  = 0b0100;
        const TRANSPARENCY = 0b1000;
    }
}

/// A rasteriser that keeps per-pixel fragment history between draws so
/// later passes can look behind the visible surface.
pub trait Renderer {
    /// Depth-tested flat line from `from` to `to`.
    fn draw_line(
        &mut self,
        image: &mut Image<'_>,
        from: IVec2,
        z0: f32,
        to: IVec2,
        z1: f32,
        color: Rgb,
    );

    /// Like [`Renderer::draw_line`] with the color blended between two
    /// `[0,1]` endpoint colors.
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
    );

    /// Alpha-blended filled disc, no depth test.
    fn draw_point(&mut self, image: &mut Image<'_>, center: IVec2, radius: i32, color: Rgb, alpha: u8);

    /// Scan-line fill (or outline) a polygon and record its fragments.
    fn draw_polygon(&mut self, image: &mut Image<'_>, polygon: &Polygon)
    -> Result<(), RenderError>;

    /// Ambient + point lighting of every visible fragment.
    fn apply_global_lighting(&mut self, image: &mut Image<'_>) -> Result<(), RenderError>;

    /// Darken pixels whose path to `light` crosses retained geometry.
    fn apply_shadows(&mut self, image: &mut Image<'_>, light: Vec3) -> Result<(), RenderError>;

    /// Blend mirrored surfaces into reflective pixels.
    fn apply_reflections(&mut self, image: &mut Image<'_>, light: Vec3)
    -> Result<(), RenderError>;

    /// Composite every pixel's fragment layers back to front.
    fn apply_transparency(&mut self, image: &mut Image<'_>) -> Result<(), RenderError>;
}

/// Convenience blanket-impl running the post passes in pipeline order.
pub trait RendererExt: Renderer {
    fn post_process(
        &mut self,
        image: &mut Image<'_>,
        passes: Passes,
        light: Vec3,
    ) -> Result<(), RenderError> {
        if passes.contains(Passes::LIGHTING) {
            self.apply_global_lighting(image)?;
        }
        if passes.contains(Passes::SHADOWS) {
            self.apply_shadows(image, light)?;
        }
        if passes.contains(Passes::REFLECTIONS) {
            self.apply_reflections(image, light)?;
        }
        if passes.contains(Passes::TRANSPARENCY) {
            self.apply_transparency(image)?;
        }
        Ok(())
    }
}
impl<T: Renderer + ?Sized> RendererExt for T {}

/*──────────────────────────────── Tests ───────────────────────────────*/
