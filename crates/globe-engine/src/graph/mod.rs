//! Command graphs and render graphs.
//!
//! A window exclusively owns one [`CommandGraph`]; a command graph owns its
//! [`RenderGraph`]s in recording order; a render graph wraps one view.

mod activate;
mod command;
mod render;

pub use activate::activate_render_graph;
pub use command::CommandGraph;
pub use render::{ClearColor, RenderArea, RenderGraph, RenderGraphId, DEFAULT_CLEAR};
