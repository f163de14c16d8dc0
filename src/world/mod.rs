pub mod geometry;
pub mod lighting;
pub mod texture;

pub use geometry::{Polygon, Vertex};

pub use lighting::{Light, LightKind, LightingSetup};

pub use texture::{Anchors, NormalBuffer, SurfaceMaps, TextureMap};
