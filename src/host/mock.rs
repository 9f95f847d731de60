//! A loopback back-end that drives a real callback thread on a
//! caller-supplied schedule, used to exercise the bridge engine end to end
//! in tests without a platform binding.
//!
//! The worker thread's shape (a named thread woken on a timer, writing the
//! cell then releasing it, joined on close) is conceptually grounded on the
//! teacher's ALSA worker (`input_stream_worker`/`output_stream_worker` in
//! the now-removed `host/alsa/mod.rs`): poll/prepare, process one buffer,
//! hand off, repeat, with a clean join on drop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::backend::{Backend, BackendStream};
use crate::cell::ExchangeCell;
use crate::codec::SampleCodec;
use crate::device::{DeviceId, IoMode};
use crate::error::{BridgeError, Result};
use crate::packet::Form;

/// A driver-delivery plan for [`MockBackend`]: how many frames to deliver
/// (capture) or demand (playback) on each tick, how long to wait between
/// ticks, and whether to end with a zero-frame callback once exhausted.
#[derive(Debug, Clone)]
pub struct MockSchedule {
    /// Frame count delivered/demanded on each successive callback.
    pub counts: Vec<usize>,
    /// Wall-clock wait before each callback.
    pub tick: Duration,
    /// If true, one final zero-frame callback follows the schedule,
    /// signaling `EndOfStream`. If false, the worker thread simply stops,
    /// which surfaces as `DriverLost` once the bridge's spin cap elapses.
    pub end_of_stream: bool,
}

impl MockSchedule {
    /// A schedule that delivers `count` frames every `tick` forever — in
    /// practice, `repeat` times, which should be chosen larger than any
    /// test will actually consume.
    pub fn steady(count: usize, repeat: usize, tick: Duration) -> Self {
        MockSchedule {
            counts: vec![count; repeat],
            tick,
            end_of_stream: false,
        }
    }
}

/// The back-end registered under the name `"mock"`. Each call to
/// [`Backend::open`] starts a fresh worker thread following a clone of the
/// configured [`MockSchedule`].
pub struct MockBackend {
    mode: IoMode,
    schedule: MockSchedule,
}

impl MockBackend {
    /// Builds a mock back-end that will drive streams opened in `mode`
    /// according to `schedule`.
    pub fn new(mode: IoMode, schedule: MockSchedule) -> Self {
        MockBackend { mode, schedule }
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn can_open_source(&self) -> bool {
        self.mode.inputs()
    }

    fn can_open_sink(&self) -> bool {
        self.mode.outputs()
    }

    fn open(
        &self,
        _dev: &DeviceId,
        mode: IoMode,
        form: Form,
        codec: SampleCodec,
        buffer_size_frames: usize,
    ) -> Result<Box<dyn BackendStream>> {
        let bytes_per_frame = form.channel_count() as usize * codec.bytes_per_sample();
        // The cell must hold the largest single callback this schedule will
        // ever deliver, which may exceed the nominal buffer size when the
        // schedule is deliberately misaligned (see spec scenario 3).
        let max_frames = self
            .schedule
            .counts
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .max(buffer_size_frames);
        let capacity = max_frames * bytes_per_frame;
        // Duplex is unimplemented (see DESIGN.md): no bundled `Backend`
        // reports `can_open_duplex() == true`, and `Bridge::send_receive`
        // always returns `Unsupported`, so there's nothing for a duplex
        // stream here to drive.
        let (in_capacity, out_capacity) = match mode {
            IoMode::Input => (capacity, 0),
            IoMode::Output => (0, capacity),
            IoMode::Duplex => return Err(BridgeError::Unsupported),
        };
        let cell = Arc::new(ExchangeCell::new(in_capacity, out_capacity));
        Ok(Box::new(MockStream {
            cell,
            handle: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            schedule: self.schedule.clone(),
            mode,
            codec,
            bytes_per_frame,
        }))
    }
}

struct MockStream {
    cell: Arc<ExchangeCell>,
    handle: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
    schedule: MockSchedule,
    mode: IoMode,
    codec: SampleCodec,
    bytes_per_frame: usize,
}

impl BackendStream for MockStream {
    fn cell(&self) -> &Arc<ExchangeCell> {
        &self.cell
    }

    fn start(&mut self) -> Result<()> {
        let cell = self.cell.clone();
        let stop_flag = self.stop_flag.clone();
        let schedule = self.schedule.clone();
        let mode = self.mode;
        let codec = self.codec;
        let bytes_per_frame = self.bytes_per_frame;

        let handle = thread::Builder::new()
            .name("callback_bridge_mock".into())
            .spawn(move || {
                let mut phase: f64 = 0.0;
                for &count in &schedule.counts {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(schedule.tick);
                    match mode {
                        IoMode::Input => {
                            let needed = count * bytes_per_frame;
                            let buf = cell.driver_in_mut();
                            let n = needed.min(buf.len());
                            let mut floats = vec![0.0f64; n / codec.bytes_per_sample().max(1)];
                            for f in floats.iter_mut() {
                                *f = phase.sin();
                                phase += 0.01;
                            }
                            let _ = codec.encode(&mut buf[..n], &floats);
                            cell.set_in_frames(count as i32);
                        }
                        IoMode::Output => cell.set_out_frames(count as i32),
                        IoMode::Duplex => unreachable!("MockBackend::open rejects Duplex"),
                    }
                    cell.driver_release();
                }
                if schedule.end_of_stream && !stop_flag.load(Ordering::Relaxed) {
                    thread::sleep(schedule.tick);
                    cell.set_in_frames(0);
                    cell.set_out_frames(0);
                    cell.driver_release();
                }
            })
            .expect("failed to spawn mock driver thread");
        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stop_flag.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn close(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.close();
    }
}
