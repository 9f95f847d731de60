//! Packet (C1) and Form: the plain value types exchanged with callers.

/// The pair `(channel count, sample rate)` shared by both ends of a stream.
///
/// Immutable for the lifetime of the stream it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Form {
    channel_count: u16,
    sample_rate: u32,
}

impl Form {
    /// Creates a form. Panics if `channel_count` is zero, mirroring the
    /// bridge's own refusal to operate on a channel-less stream.
    pub fn new(channel_count: u16, sample_rate: u32) -> Self {
        assert!(channel_count > 0, "channel_count must be positive");
        Form {
            channel_count,
            sample_rate,
        }
    }

    /// Number of interleaved channels in one frame.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Samples per second, per channel.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration of one frame at this form's sample rate.
    pub fn frame_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.sample_rate as f64)
    }
}

/// A buffer of interleaved, normalized `f64` samples together with the
/// frame index and origin-relative timestamp of its first frame.
///
/// `data.len()` is always a multiple of the form's channel count; callers
/// are responsible for allocating data of the right length, construction
/// performs no copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    data: Vec<f64>,
    frame_index: i64,
    start_time: std::time::Instant,
}

impl Packet {
    /// Builds a packet. `data.len()` must already be a multiple of the
    /// stream's channel count; this is a plain value type and does not
    /// itself validate against a `Form`.
    pub fn new(data: Vec<f64>, frame_index: i64, start_time: std::time::Instant) -> Self {
        Packet {
            data,
            frame_index,
            start_time,
        }
    }

    /// Interleaved sample data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable access to the interleaved sample data.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Frames exchanged with the driver before this packet's first frame.
    pub fn frame_index(&self) -> i64 {
        self.frame_index
    }

    /// For capture, the latest instant at which the driver could have
    /// recorded the first frame. For playback, the earliest instant the
    /// driver will play it.
    pub fn start_time(&self) -> std::time::Instant {
        self.start_time
    }

    /// Identity of this packet's backing storage, used by the bridge to
    /// enforce that a playback packet handed back by the caller is the same
    /// allocation it issued (spec.md's buffer-identity invariant).
    pub fn storage_identity(&self) -> usize {
        self.data.as_ptr() as usize
    }
}
