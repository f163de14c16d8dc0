pub mod projection;

pub use projection::{
    clip_to_viewport, compose, homogenize, make_view_canonical, row_major, transform_module,
};
