//! Frame timing.
//!
//! - [`FrameClock`] produces the [`FrameStamp`] fed to scene updates
//! - [`FrameStats`] holds the per-phase timings of the last frame

mod frame_clock;
mod stats;

pub use frame_clock::{FrameClock, FrameStamp};
pub use stats::{FrameStats, PhaseMarks};
