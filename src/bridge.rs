//! Bridge Engine (C6): the core. Orchestrates a capture or playback call by
//! repeatedly claiming the exchange cell, decoding/encoding one driver
//! buffer, and advancing frame counters, carrying over any misalignment
//! between the driver's buffer size and the caller's request size.
//!
//! Grounded directly on `cb.go`'s `Receive`/`Send`: the loop structure,
//! the overflow-buffer carry-over, and the origin-time-on-first-exchange
//! rule are all taken from there; the `sound.Source`/`sound.Sink` split is
//! collapsed into the one `Bridge` type spec.md §4.6 asks for.

use std::time::Instant;

use log::{debug, warn};

use crate::backend::{Backend, BackendStream};
use crate::cell::SPIN_CAP;
use crate::codec::SampleCodec;
use crate::device::{DeviceId, IoMode};
use crate::error::{BridgeError, Result};
use crate::interleave;
use crate::packet::{Form, Packet};
use crate::pacing::{MissedDeadline, PacingMonitor};

/// The three states a bridge can be in. Any state transitions to `Closed`
/// on `close()`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Exchanging,
    Closed,
}

/// Orchestrates one open stream: claims the exchange cell, decodes/encodes
/// one driver buffer at a time, and tracks pacing and carry-over state.
pub struct Bridge {
    form: Form,
    codec: SampleCodec,
    buffer_size_frames: usize,
    stream: Box<dyn BackendStream>,
    overflow: Vec<f64>,
    frames_exchanged: i64,
    pacing: PacingMonitor,
    misses: Vec<MissedDeadline>,
    state: BridgeState,
    spin_cap: u64,
    scratch: Vec<f64>,
    last_issued_playback_identity: Option<usize>,
}

impl Bridge {
    /// Opens a bridge against `backend`, configuring it for `mode`/`form`/
    /// `codec`/`buffer_size_frames` and arming its callbacks.
    pub fn open(
        backend: &dyn Backend,
        dev: &DeviceId,
        mode: IoMode,
        form: Form,
        codec: SampleCodec,
        buffer_size_frames: usize,
    ) -> Result<Self> {
        Self::open_with_spin_cap(backend, dev, mode, form, codec, buffer_size_frames, SPIN_CAP)
    }

    /// As [`Self::open`], but with an explicit exchange-cell spin cap
    /// instead of the production [`SPIN_CAP`]. Intended for tests that
    /// exercise the `DriverLost` path without a multi-second wait.
    pub fn open_with_spin_cap(
        backend: &dyn Backend,
        dev: &DeviceId,
        mode: IoMode,
        form: Form,
        codec: SampleCodec,
        buffer_size_frames: usize,
        spin_cap: u64,
    ) -> Result<Self> {
        let mut stream = backend.open(dev, mode, form, codec, buffer_size_frames)?;
        stream.start()?;
        Ok(Bridge {
            form,
            codec,
            buffer_size_frames,
            stream,
            overflow: Vec::with_capacity(buffer_size_frames * form.channel_count() as usize),
            frames_exchanged: 0,
            pacing: PacingMonitor::new(form.frame_duration(), buffer_size_frames),
            misses: Vec::new(),
            state: BridgeState::Idle,
            spin_cap,
            scratch: Vec::new(),
            last_issued_playback_identity: None,
        })
    }

    /// Closes the bridge. Idempotent; releases the back-end stream.
    pub fn close(&mut self) {
        if self.state == BridgeState::Closed {
            return;
        }
        debug!("bridge closing");
        let _ = self.stream.stop();
        self.stream.close();
        self.state = BridgeState::Closed;
    }

    /// Overrides the minimum number of frames the driver may deliver per
    /// callback. See [`PacingMonitor::set_min_callback_frames`].
    pub fn set_min_callback_frames(&mut self, n: usize) {
        self.pacing.set_min_callback_frames(n);
    }

    /// Missed deadlines recorded during the last `receive`/`send` call.
    pub fn last_misses(&self) -> &[MissedDeadline] {
        &self.misses
    }

    /// Whether the last `receive`/`send` call recorded any missed
    /// deadlines.
    pub fn last_missed(&self) -> bool {
        !self.misses.is_empty()
    }

    /// Total frames exchanged with the driver since this bridge was opened.
    pub fn frames_exchanged(&self) -> i64 {
        self.frames_exchanged
    }

    fn check_alignment(&self, len: usize) -> Result<usize> {
        let channels = self.form.channel_count() as usize;
        if len % channels != 0 {
            return Err(BridgeError::ChannelAlignment);
        }
        let frames = len / channels;
        if frames % self.buffer_size_frames != 0 {
            return Err(BridgeError::FrameAlignment);
        }
        Ok(frames)
    }

    /// Capture: fills `dst` with up to `dst.len()` interleaved samples,
    /// returning the number of frames actually written.
    ///
    /// `dst.len()` must be a multiple of the channel count, and the
    /// resulting frame count a multiple of the configured buffer size;
    /// violations are rejected before any cell interaction.
    pub fn receive(&mut self, dst: &mut [f64]) -> Result<usize> {
        let requested_frames = self.check_alignment(dst.len())?;
        if self.state == BridgeState::Closed {
            return Err(BridgeError::Closed);
        }
        self.state = BridgeState::Exchanging;
        self.misses.clear();

        let channels = self.form.channel_count() as usize;
        let bps = self.codec.bytes_per_sample();

        let mut start = 0usize;
        let overflow_frames = self.overflow.len() / channels;
        if overflow_frames > 0 {
            let n = overflow_frames.min(requested_frames);
            dst[..n * channels].copy_from_slice(&self.overflow[..n * channels]);
            self.overflow.drain(..n * channels);
            start += n;
        }

        while start < requested_frames {
            self.pacing.maybe_sleep(self.frames_exchanged);
            if let Err(e) = self.stream.cell().acquire_within(self.spin_cap) {
                warn!("driver lost while waiting for capture callback");
                self.state = BridgeState::Closed;
                return Err(e);
            }
            let nf = self.stream.cell().in_frames() as usize;
            if nf == 0 {
                let _ = self.stream.cell().release_within(self.spin_cap);
                self.state = BridgeState::Closed;
                return Err(BridgeError::EndOfStream);
            }
            if self.frames_exchanged == 0 {
                self.pacing.set_origin_if_unset(Instant::now());
            }

            let take = nf.min(requested_frames - start);
            let spill = nf - take;
            let bytes = self.stream.cell().app_in();

            let take_bytes = take * channels * bps;
            self.codec
                .decode(&mut dst[start * channels..(start + take) * channels], &bytes[..take_bytes])?;

            if spill > 0 {
                let spill_bytes = spill * channels * bps;
                self.overflow.resize(spill * channels, 0.0);
                self.codec.decode(
                    &mut self.overflow,
                    &bytes[take_bytes..take_bytes + spill_bytes],
                )?;
            }

            self.stream.cell().release_within(self.spin_cap)?;
            start += take;
            self.frames_exchanged += nf as i64;
            if let Some(miss) = self.pacing.check_deadline(self.frames_exchanged) {
                debug!("{miss}");
                self.misses.push(miss);
            }
        }

        interleave::deinterleave(&mut dst[..start * channels], channels, &mut self.scratch);
        self.state = BridgeState::Idle;
        Ok(start)
    }

    /// Playback: writes `src` (planar, one channel's frames contiguous) to
    /// the driver. `src` is interleaved in place before encoding.
    ///
    /// `src.len()` must be a multiple of the channel count, and the
    /// resulting frame count a multiple of the configured buffer size;
    /// violations are rejected before any cell interaction.
    pub fn send(&mut self, src: &mut [f64]) -> Result<()> {
        let requested_frames = self.check_alignment(src.len())?;
        if self.state == BridgeState::Closed {
            return Err(BridgeError::Closed);
        }
        self.state = BridgeState::Exchanging;
        self.misses.clear();

        let channels = self.form.channel_count() as usize;
        let bps = self.codec.bytes_per_sample();
        interleave::interleave(src, channels, &mut self.scratch);

        let mut start = 0usize;
        while start < requested_frames {
            if let Some(miss) = self.pacing.check_deadline(self.frames_exchanged) {
                debug!("{miss}");
                self.misses.push(miss);
            }
            self.pacing.maybe_sleep(self.frames_exchanged);

            if let Err(e) = self.stream.cell().acquire_within(self.spin_cap) {
                warn!("driver lost while waiting for playback callback");
                self.state = BridgeState::Closed;
                return Err(e);
            }
            let nf = self.stream.cell().driver_wants_frames() as usize;
            if nf == 0 {
                let _ = self.stream.cell().release_within(self.spin_cap);
                self.state = BridgeState::Closed;
                return Err(BridgeError::EndOfStream);
            }
            if self.frames_exchanged == 0 {
                self.pacing.set_origin_if_unset(Instant::now());
            }

            let give = nf.min(requested_frames - start);
            let give_bytes = give * channels * bps;
            {
                let out = self.stream.cell().app_out_mut();
                self.codec
                    .encode(&mut out[..give_bytes], &src[start * channels..(start + give) * channels])?;
            }
            self.stream.cell().set_out_frames(give as i32);
            self.stream.cell().release_within(self.spin_cap)?;

            start += give;
            self.frames_exchanged += give as i64;
        }

        self.state = BridgeState::Idle;
        Ok(())
    }

    /// Duplex exchange. Reserved: spec.md leaves the back-end contract for
    /// duplex under-specified, so this always returns
    /// [`BridgeError::Unsupported`].
    pub fn send_receive(&mut self, _out: &mut [f64], _in: &mut [f64]) -> Result<usize> {
        Err(BridgeError::Unsupported)
    }

    /// Allocates a playback packet of `frames` frames and remembers its
    /// storage identity, to be handed to [`Self::send_packet`] later.
    pub fn new_playback_packet(&mut self, frames: usize) -> Packet {
        let data = vec![0.0; frames * self.form.channel_count() as usize];
        let packet = Packet::new(data, self.frames_exchanged, Instant::now());
        self.last_issued_playback_identity = Some(packet.storage_identity());
        packet
    }

    /// Sends a packet previously obtained from [`Self::new_playback_packet`].
    ///
    /// # Panics
    ///
    /// Panics if `packet`'s backing storage is not the same allocation this
    /// bridge issued — a caller that substitutes a foreign buffer of the
    /// same length has violated the playback buffer-identity invariant,
    /// which is a fatal condition rather than one this bridge silently
    /// accepts.
    pub fn send_packet(&mut self, mut packet: Packet) -> Result<()> {
        let expected = self.last_issued_playback_identity.take();
        assert_eq!(
            expected,
            Some(packet.storage_identity()),
            "playback packet storage identity mismatch: caller substituted a foreign buffer"
        );
        self.send(packet.data_mut())
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockBackend, MockSchedule};
    use crate::host::null::NullBackend;
    use std::time::Duration;

    fn stereo_form() -> Form {
        Form::new(2, 44_100)
    }

    #[test]
    fn capture_returns_exact_buffer_size_each_call() {
        let schedule = MockSchedule::steady(512, 32, Duration::from_micros(200));
        let backend = MockBackend::new(IoMode::Input, schedule);
        let mut bridge = Bridge::open_with_spin_cap(
            &backend,
            &DeviceId::new("mock"),
            IoMode::Input,
            stereo_form(),
            SampleCodec::I16Le,
            512,
            1_000_000,
        )
        .unwrap();

        for _ in 0..16 {
            let mut dst = vec![0.0; 512 * 2];
            let n = bridge.receive(&mut dst).unwrap();
            assert_eq!(n, 512);
        }
        assert_eq!(bridge.frames_exchanged(), 512 * 16);
    }

    #[test]
    fn misaligned_driver_stashes_overflow() {
        let schedule = MockSchedule {
            counts: vec![600, 424, 512, 512],
            tick: Duration::from_micros(200),
            end_of_stream: false,
        };
        let backend = MockBackend::new(IoMode::Input, schedule);
        // buffer_size_frames stays at the nominal 512; the mock sizes its
        // cell to fit the larger 600-frame callback on top of that.
        let mut bridge = Bridge::open_with_spin_cap(
            &backend,
            &DeviceId::new("mock"),
            IoMode::Input,
            Form::new(1, 44_100),
            SampleCodec::F32Le,
            512,
            1_000_000,
        )
        .unwrap();
        bridge.set_min_callback_frames(1);

        for _ in 0..3 {
            let mut dst = vec![0.0; 512];
            let n = bridge.receive(&mut dst).unwrap();
            assert_eq!(n, 512);
        }
    }

    #[test]
    fn zero_frame_callback_yields_end_of_stream_then_closed() {
        let backend = NullBackend;
        let mut bridge = Bridge::open_with_spin_cap(
            &backend,
            &DeviceId::new("null"),
            IoMode::Input,
            stereo_form(),
            SampleCodec::F32Le,
            256,
            1_000,
        )
        .unwrap();
        let mut dst = vec![0.0; 256 * 2];
        assert_eq!(bridge.receive(&mut dst), Err(BridgeError::EndOfStream));
        assert_eq!(bridge.receive(&mut dst), Err(BridgeError::Closed));
    }

    #[test]
    fn driver_lost_when_nothing_arrives() {
        let schedule = MockSchedule {
            counts: vec![],
            tick: Duration::from_micros(200),
            end_of_stream: false,
        };
        let backend = MockBackend::new(IoMode::Input, schedule);
        let mut bridge = Bridge::open_with_spin_cap(
            &backend,
            &DeviceId::new("mock"),
            IoMode::Input,
            stereo_form(),
            SampleCodec::F32Le,
            256,
            50,
        )
        .unwrap();
        let mut dst = vec![0.0; 256 * 2];
        assert_eq!(bridge.receive(&mut dst), Err(BridgeError::DriverLost));
    }

    #[test]
    fn playback_consumes_fully_each_call() {
        let schedule = MockSchedule::steady(512, 32, Duration::from_micros(200));
        let backend = MockBackend::new(IoMode::Output, schedule);
        let mut bridge = Bridge::open_with_spin_cap(
            &backend,
            &DeviceId::new("mock"),
            IoMode::Output,
            stereo_form(),
            SampleCodec::F32Le,
            512,
            1_000_000,
        )
        .unwrap();

        for _ in 0..16 {
            let mut src = vec![0.25; 512 * 2];
            bridge.send(&mut src).unwrap();
        }
        assert_eq!(bridge.frames_exchanged(), 512 * 16);
    }

    #[test]
    fn alignment_errors_never_touch_the_cell() {
        let backend = NullBackend;
        let mut bridge = Bridge::open(
            &backend,
            &DeviceId::new("null"),
            IoMode::Input,
            stereo_form(),
            SampleCodec::F32Le,
            256,
        )
        .unwrap();
        let mut odd = vec![0.0; 3];
        assert_eq!(bridge.receive(&mut odd), Err(BridgeError::ChannelAlignment));
        let mut unaligned = vec![0.0; 2 * 100];
        assert_eq!(bridge.receive(&mut unaligned), Err(BridgeError::FrameAlignment));
    }

    #[test]
    #[should_panic(expected = "storage identity mismatch")]
    fn foreign_playback_buffer_panics() {
        let schedule = MockSchedule::steady(512, 4, Duration::from_micros(200));
        let backend = MockBackend::new(IoMode::Output, schedule);
        let mut bridge = Bridge::open_with_spin_cap(
            &backend,
            &DeviceId::new("mock"),
            IoMode::Output,
            stereo_form(),
            SampleCodec::F32Le,
            512,
            1_000_000,
        )
        .unwrap();
        let _issued = bridge.new_playback_packet(512);
        let foreign = Packet::new(vec![0.0; 512 * 2], 0, Instant::now());
        bridge.send_packet(foreign).unwrap();
    }
}
