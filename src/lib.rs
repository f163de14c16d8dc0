//! CPU polygon rasteriser with a per-pixel fragment store.
//!
//! Geometry is drawn into a caller-owned [`renderer::Image`]; every sample,
//! hidden or not, is kept in the renderer's trace buffer so the lighting,
//! shadow, reflection and transparency passes can look behind the visible
//! surface without re-rasterising.

pub mod engine;
pub mod error;
pub mod renderer;
pub mod world;

pub use error::RenderError;
pub use renderer::{
    FrameBuffer, FrameConfig, Image, Passes, Renderer, RendererExt, Rgb, Rgba, Software,
};
