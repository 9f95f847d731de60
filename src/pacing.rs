//! Pacing & Deadline Monitor (C5): predicts the earliest moment the next
//! callback can occur, sleeps until just before then, and records missed
//! deadlines.
//!
//! Grounded on `cb.go`'s `setOrgTime`/`maybeSleep`/`checkDeadline`: the
//! bridge sleeps until `SLEEP_SLACK` before the predicted next-callback
//! instant, then falls through to the exchange cell's own short spin for
//! the remainder, absorbing OS scheduling jitter without blocking past it.

use std::fmt;
use std::time::{Duration, Instant};

/// Slack kept between the end of a deadline-directed sleep and the
/// predicted callback instant, absorbing one worst-case scheduling
/// preemption.
pub const SLEEP_SLACK: Duration = Duration::from_millis(10);

/// An observation that the bridge attempted to communicate with the driver
/// after the sample-rate-predicted target instant.
///
/// Not necessarily an audible glitch — the driver may buffer — but the
/// absence of any misses implies the bridge is keeping up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissedDeadline {
    /// Number of frames exchanged with the driver at the time of the miss.
    pub frame_index: i64,
    /// How much earlier the exchange would have needed to happen to meet
    /// the deadline.
    pub late_by: Duration,
}

impl fmt::Display for MissedDeadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missed frame {} by {:?}",
            self.frame_index, self.late_by
        )
    }
}

/// Tracks the origin instant and frame duration needed to predict the next
/// callback and to sleep/record misses around it.
pub struct PacingMonitor {
    origin_time: Option<Instant>,
    frame_duration: Duration,
    buffer_size_frames: usize,
    min_callback_frames: usize,
}

impl PacingMonitor {
    /// Creates a monitor for a stream with the given per-frame duration and
    /// configured buffer size. `min_callback_frames` defaults to
    /// `buffer_size_frames`.
    pub fn new(frame_duration: Duration, buffer_size_frames: usize) -> Self {
        PacingMonitor {
            origin_time: None,
            frame_duration,
            buffer_size_frames,
            min_callback_frames: buffer_size_frames,
        }
    }

    /// Overrides the minimum number of frames the driver may deliver per
    /// callback. Lower values make the bridge sleep less aggressively,
    /// since the next callback may arrive sooner.
    pub fn set_min_callback_frames(&mut self, n: usize) {
        self.min_callback_frames = n;
    }

    /// Whether the origin instant has been set yet.
    pub fn has_origin(&self) -> bool {
        self.origin_time.is_some()
    }

    /// Sets the origin instant exactly once, on the first successful
    /// exchange. Subsequent calls are no-ops.
    pub fn set_origin_if_unset(&mut self, now: Instant) {
        if self.origin_time.is_none() {
            self.origin_time = Some(now);
        }
    }

    fn target_for_frame(&self, frame: i64) -> Option<Instant> {
        let origin = self.origin_time?;
        origin.checked_add(self.frame_duration.mul_f64(frame as f64))
    }

    /// Sleeps until `SLEEP_SLACK` before the predicted instant of the next
    /// callback, given `frames_exchanged` so far. A no-op before the origin
    /// is set, or if the deadline is already within `SLEEP_SLACK`.
    pub fn maybe_sleep(&self, frames_exchanged: i64) {
        if frames_exchanged == 0 {
            return;
        }
        let Some(target) = self.target_for_frame(frames_exchanged + self.min_callback_frames as i64)
        else {
            return;
        };
        let now = Instant::now();
        if target <= now {
            return;
        }
        let deadline = target - now;
        if deadline > SLEEP_SLACK {
            std::thread::sleep(deadline - SLEEP_SLACK);
        }
    }

    /// Checks whether the exchange about to happen for `frames_exchanged`
    /// is already past its predicted deadline, returning a
    /// [`MissedDeadline`] if so. A no-op before the origin is set.
    pub fn check_deadline(&self, frames_exchanged: i64) -> Option<MissedDeadline> {
        if frames_exchanged == 0 {
            return None;
        }
        let target = self.target_for_frame(frames_exchanged + 1)?;
        let now = Instant::now();
        if now > target {
            Some(MissedDeadline {
                frame_index: frames_exchanged,
                late_by: now - target,
            })
        } else {
            None
        }
    }

    /// Resets the origin, used when a bridge transitions back to `Idle`
    /// between calls is not required, but closing and reopening a back-end
    /// needs a fresh origin.
    pub fn reset(&mut self) {
        self.origin_time = None;
    }

    #[cfg(test)]
    pub(crate) fn buffer_size_frames(&self) -> usize {
        self.buffer_size_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_deadline_before_origin_set() {
        let monitor = PacingMonitor::new(Duration::from_micros(20), 512);
        assert!(monitor.check_deadline(0).is_none());
        monitor.maybe_sleep(0); // must not panic or sleep
    }

    #[test]
    fn origin_is_set_only_once() {
        let mut monitor = PacingMonitor::new(Duration::from_micros(20), 512);
        let first = Instant::now();
        monitor.set_origin_if_unset(first);
        std::thread::sleep(Duration::from_millis(1));
        monitor.set_origin_if_unset(Instant::now());
        assert_eq!(monitor.origin_time, Some(first));
    }

    #[test]
    fn missed_deadline_display_mentions_frame() {
        let miss = MissedDeadline {
            frame_index: 42,
            late_by: Duration::from_millis(3),
        };
        assert!(miss.to_string().contains("42"));
    }

    #[test]
    fn stale_target_is_reported_as_missed() {
        let mut monitor = PacingMonitor::new(Duration::from_nanos(1), 512);
        monitor.set_origin_if_unset(Instant::now() - Duration::from_secs(1));
        assert!(monitor.check_deadline(1).is_some());
    }

    #[test]
    fn buffer_size_frames_accessor_reflects_construction() {
        let monitor = PacingMonitor::new(Duration::from_micros(20), 256);
        assert_eq!(monitor.buffer_size_frames(), 256);
    }
}
