use serde::{Deserialize, Serialize};

/// A persisted countdown timer.
///
/// The countdown itself is wall-clock arithmetic over this record:
/// `remaining_ms` is a checkpoint frozen at the last start/pause, and the
/// live value is derived from it together with `started_at_ms` and "now".
/// After a resume, the remaining frozen at pause becomes the new basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub id: i64,
    pub label: String,
    pub duration_ms: i64,
    /// Remaining at the last checkpoint (start, pause, resume).
    pub remaining_ms: i64,
    pub running: bool,
    pub paused: bool,
    pub finished: bool,
    pub started_at_ms: i64,
    pub paused_at_ms: i64,
    pub end_at_ms: i64,
    pub vibrate: bool,
    pub created_at_ms: i64,
}

impl Timer {
    /// New running timer starting at `now_ms`.
    pub fn new(label: &str, duration_ms: i64, vibrate: bool, now_ms: i64) -> Self {
        Self {
            id: 0,
            label: label.into(),
            duration_ms,
            remaining_ms: duration_ms,
            running: true,
            paused: false,
            finished: false,
            started_at_ms: now_ms,
            paused_at_ms: 0,
            end_at_ms: now_ms + duration_ms,
            vibrate,
            created_at_ms: now_ms,
        }
    }

    /// Live remaining time at `now_ms`, never negative.
    pub fn current_remaining_ms(&self, now_ms: i64) -> i64 {
        if self.finished {
            0
        } else if self.running && !self.paused {
            let elapsed = now_ms - self.started_at_ms;
            (self.remaining_ms - elapsed).max(0)
        } else {
            self.remaining_ms
        }
    }

    /// Completed fraction, 0.0 to 1.0.
    pub fn progress(&self, now_ms: i64) -> f64 {
        if self.duration_ms <= 0 {
            return 1.0;
        }
        let elapsed = self.duration_ms - self.current_remaining_ms(now_ms);
        (elapsed as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }

    /// Remaining time as "MM:SS", or "H:MM:SS" past an hour.
    pub fn formatted_remaining(&self, now_ms: i64) -> String {
        format_hms(self.current_remaining_ms(now_ms))
    }

    /// Whether a tick loop should still be driving this record.
    pub fn needs_tick(&self) -> bool {
        self.running && !self.paused && !self.finished
    }
}

/// "MM:SS" below an hour, "H:MM:SS" above.
pub fn format_hms(ms: i64) -> String {
    let ms = ms.max(0);
    let seconds = (ms / 1000) % 60;
    let minutes = (ms / 60_000) % 60;
    let hours = ms / 3_600_000;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
