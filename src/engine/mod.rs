pub mod controller;
pub mod glue;
pub mod map;
pub mod semantic;
pub mod separation;
pub mod session;
pub mod transform;
pub mod transition;
pub mod zoom;

pub use map::{MapEngine, RenderedEdge, RenderedNode};
pub use transform::ZoomTransform;
