//! lane topology for the graph-log view.
//!
//! One lane per active branch line; the engine assigns each commit the lane
//! snapshot of its row as commits are consumed in traversal order. Only lane
//! indices are computed here, pixel placement belongs to the renderer.

mod engine;
mod lane;

pub use engine::LaneEngine;
pub use lane::LaneType;
