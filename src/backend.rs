//! Back-end Adapter Surface (C7): the narrow contract a platform back-end
//! must satisfy to plug into the bridge engine.
//!
//! Modeled on the teacher's `HostTrait`/`DeviceTrait`/`StreamTrait` split
//! (`traits.rs`) and on the dyn-erasure pattern in `host/custom/mod.rs`
//! that lets a caller supply an arbitrary implementation without any
//! platform binding compiled in. `Backend` plays the role of `HostTrait`
//! (capability + name + open), `BackendStream` plays the role of
//! `StreamTrait` (start/stop/close) plus ownership of the exchange cell the
//! bridge drives.

use std::sync::Arc;

use crate::cell::ExchangeCell;
use crate::codec::SampleCodec;
use crate::device::{DeviceId, IoMode};
use crate::error::Result;
use crate::packet::Form;

/// An open connection to a driver, already configured for a fixed form,
/// codec and buffer size. Returned by [`Backend::open`].
///
/// A back-end's callback thread is expected to be running (or ready to run
/// once [`Self::start`] is called) against the [`ExchangeCell`] returned by
/// [`Self::cell`], following the protocol in `cell`'s module docs.
pub trait BackendStream: Send {
    /// The cell the bridge exchanges frames through.
    fn cell(&self) -> &Arc<ExchangeCell>;

    /// Arms callbacks. Until called, the driver must not touch the cell.
    fn start(&mut self) -> Result<()>;

    /// Disarms callbacks. Idempotent.
    fn stop(&mut self) -> Result<()>;

    /// Tears down driver resources. Called at most once, after `stop`.
    fn close(&mut self);
}

/// A platform back-end capable of opening streams against one or more
/// devices.
///
/// Back-ends known to the original design (CoreAudio AudioQueue, CoreAudio
/// HAL, ALSA PCM) are out of scope to reimplement here; this trait, plus
/// the null and mock back-ends in [`crate::host`], are what callers and
/// tests plug into the bridge engine instead.
pub trait Backend: Send + Sync {
    /// The name this back-end registers itself under.
    fn name(&self) -> &str;

    /// Whether this back-end can open capture streams.
    fn can_open_source(&self) -> bool;

    /// Whether this back-end can open playback streams.
    fn can_open_sink(&self) -> bool;

    /// Whether this back-end can open a single duplex stream sharing one
    /// device clock. Reserved: no bundled back-end returns `true` yet,
    /// since duplex is unimplemented per spec.md's open questions.
    fn can_open_duplex(&self) -> bool {
        false
    }

    /// Configures the driver to deliver callbacks of `buffer_size_frames`
    /// against `dev`, for the requested `mode`/`form`/`codec`.
    fn open(
        &self,
        dev: &DeviceId,
        mode: IoMode,
        form: Form,
        codec: SampleCodec,
        buffer_size_frames: usize,
    ) -> Result<Box<dyn BackendStream>>;
}
