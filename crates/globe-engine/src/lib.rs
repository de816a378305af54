//! Globe engine crate.
//!
//! Window, view and render-graph lifecycle for a geospatial viewer, plus the
//! frame loop driving it. GPU work goes through the [`device::Backend`] seam.

pub mod app;
pub mod camera;
pub mod content;
pub mod device;
pub mod display;
pub mod graph;
pub mod input;
pub mod logging;
pub mod manip;
pub mod runtime;
pub mod scene;
pub mod time;
pub mod util;
pub mod view;
pub mod viewer;

pub use app::{AppConfig, Application, LoopState};
pub use util::Future;
