//! Error type shared by every fallible renderer operation.

use thiserror::Error;

/// Usage and precondition failures.
///
/// Each variant aborts the operation that raised it; nothing is drawn or
/// mutated when one is returned. Out-of-range configuration values are not
/// errors: they are logged and ignored (see [`crate::renderer::FrameConfig`]).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Pixel or depth slice length does not match `width * height`.
    #[error("framebuffer is {width}x{height} but holds {pixels} pixels and {depth} depth cells")]
    BufferSize {
        width: usize,
        height: usize,
        pixels: usize,
        depth: usize,
    },

    /// A draw or pass ran before `init_trace_buffer`.
    #[error("trace buffer has not been initialised")]
    NoTraceBuffer,

    /// The trace buffer and the image disagree on dimensions.
    #[error("trace buffer is {trace_w}x{trace_h} but the image is {image_w}x{image_h}")]
    TraceSizeMismatch {
        trace_w: usize,
        trace_h: usize,
        image_w: usize,
        image_h: usize,
    },

    /// `init_trace_buffer` with a new size while the old buffer still exists.
    #[error("trace buffer already allocated at {old_w}x{old_h}; release it before resizing to {new_w}x{new_h}")]
    TraceResize {
        old_w: usize,
        old_h: usize,
        new_w: usize,
        new_h: usize,
    },

    /// Anchor point count differs from the polygon's vertex count.
    #[error("polygon mismatch between {anchors} anchor points and {vertices} vertices")]
    AnchorMismatch { anchors: usize, vertices: usize },

    /// Anchors are bound but neither a texture nor a bump map is.
    #[error("anchor points defined without a texture or bump map")]
    AnchorsWithoutMap,

    /// A texture is bound without anchors to address it.
    #[error("texture defined without anchor points")]
    TextureWithoutAnchors,

    /// A bump map is bound without anchors to address it.
    #[error("bump map defined without anchor points")]
    BumpWithoutAnchors,

    /// Normal interpolation is enabled with fewer normals than vertices.
    #[error("normal buffer holds {normals} normals but the polygon has {vertices} vertices")]
    NormalMismatch { normals: usize, vertices: usize },

    /// A flat input buffer is too short for the advertised element count.
    #[error("{what} buffer holds {len} values, need {need}")]
    ShortBuffer {
        what: &'static str,
        len: usize,
        need: usize,
    },

    /// Band size (values per vertex) below the four `x, y, z, w` slots.
    #[error("band size {0} is smaller than 4")]
    BandSize(usize),

    /// Texture or bump map with unusable dimensions.
    #[error("map of {width}x{height} with bin size {bin} cannot be sampled")]
    BadMap {
        width: usize,
        height: usize,
        bin: usize,
    },

    /// Transform input with different point and normal counts.
    #[error("{points} points but {normals} normals")]
    GeometryMismatch { points: usize, normals: usize },
}
