//! Seek control arbitration against live transport position

/// Tracks duration/position reports and an in-progress user seek
///
/// While the user holds the seek control, live position updates must not
/// overwrite the dragged value, and nothing is committed to the transport
/// until release - a drag would otherwise flood it with seek commands.
pub struct PositionSync {
    duration_ms: u64,
    position_ms: u64,
    seeking: bool,
    pending_ms: u64,
    resume_on_release: bool,
}

impl PositionSync {
    pub fn new() -> Self {
        Self {
            duration_ms: 0,
            position_ms: 0,
            seeking: false,
            pending_ms: 0,
            resume_on_release: false,
        }
    }

    /// Duration report from the transport
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Live position report; ignored while a user seek is in progress
    pub fn on_position(&mut self, ms: u64) {
        if !self.seeking {
            self.position_ms = ms;
        }
    }

    /// Value the seek control and time label should show
    pub fn display_ms(&self) -> u64 {
        if self.seeking {
            self.pending_ms
        } else {
            self.position_ms
        }
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    /// User pressed the seek control; `resume` records whether playback
    /// was active and should restart on release
    pub fn begin_seek(&mut self, resume: bool) {
        self.seeking = true;
        self.pending_ms = self.position_ms;
        self.resume_on_release = resume;
    }

    /// User dragged to a new value; display only, nothing is committed
    pub fn drag(&mut self, ms: u64) {
        if self.seeking {
            self.pending_ms = ms.min(self.duration_ms);
        }
    }

    /// User released: returns the position to commit and whether playback
    /// should resume
    pub fn end_seek(&mut self) -> (u64, bool) {
        self.seeking = false;
        self.position_ms = self.pending_ms;
        (self.pending_ms, self.resume_on_release)
    }

    /// Forget everything about the previous track
    pub fn reset(&mut self) {
        self.duration_ms = 0;
        self.position_ms = 0;
        self.seeking = false;
        self.pending_ms = 0;
        self.resume_on_release = false;
    }
}

impl Default for PositionSync {
    fn default() -> Self {
        Self::new()
    }
}

/// Format milliseconds as a `m:ss` time label
pub fn format_time(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_updates_flow_through_when_idle() {
        let mut sync = PositionSync::new();
        sync.set_duration(200_000);
        sync.on_position(5_000);
        assert_eq!(sync.display_ms(), 5_000);
    }

    #[test]
    fn drag_suppresses_live_updates_until_release() {
        let mut sync = PositionSync::new();
        sync.set_duration(200_000);
        sync.on_position(5_000);

        sync.begin_seek(true);
        sync.drag(100_000);
        // Transport keeps reporting, the control must not move
        sync.on_position(6_000);
        assert_eq!(sync.display_ms(), 100_000);

        let (committed, resume) = sync.end_seek();
        assert_eq!(committed, 100_000);
        assert!(resume);
        assert_eq!(sync.display_ms(), 100_000);
    }

    #[test]
    fn drag_clamps_to_duration() {
        let mut sync = PositionSync::new();
        sync.set_duration(60_000);
        sync.begin_seek(false);
        sync.drag(90_000);
        assert_eq!(sync.end_seek(), (60_000, false));
    }

    #[test]
    fn time_labels_render_minutes_and_seconds() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(61_000), "1:01");
        assert_eq!(format_time(600_000), "10:00");
        assert_eq!(format_time(199_999), "3:19");
    }
}
