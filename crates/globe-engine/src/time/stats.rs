use std::time::{Duration, Instant};

/// Per-phase timings of the most recently completed frame.
///
/// The four phases partition the frame: `events + update + record + present`
/// equals `frame` exactly, since all five are measured from the same marks.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Whole frame, advance through present.
    pub frame: Duration,
    /// Advancing the frame slot and polling window events.
    pub events: Duration,
    /// Scene, system and user updates, event dispatch and queued operations.
    pub update: Duration,
    /// Command recording and submission.
    pub record: Duration,
    /// Presentation.
    pub present: Duration,
}

/// Timestamps taken at the phase boundaries of one frame.
#[derive(Debug, Copy, Clone)]
pub struct PhaseMarks {
    pub start: Instant,
    pub update: Instant,
    pub record: Instant,
    pub present: Instant,
    pub end: Instant,
}

impl FrameStats {
    pub fn from_marks(m: PhaseMarks) -> Self {
        let since = |later: Instant, earlier: Instant| later.saturating_duration_since(earlier);
        Self {
            frame: since(m.end, m.start),
            events: since(m.update, m.start),
            update: since(m.record, m.update),
            record: since(m.present, m.record),
            present: since(m.end, m.present),
        }
    }

    /// Sum of the four phases.
    #[inline]
    pub fn phase_total(&self) -> Duration {
        self.events + self.update + self.record + self.present
    }
}
