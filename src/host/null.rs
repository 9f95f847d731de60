//! A back-end that never delivers audio: every stream it opens ends the
//! instant the bridge first touches it.
//!
//! Grounded on the teacher's `host/null` stub host, which exists purely so
//! callers (and this crate's own tests) can exercise the host-selection
//! machinery without a real platform binding compiled in.

use std::sync::Arc;

use crate::backend::{Backend, BackendStream};
use crate::cell::ExchangeCell;
use crate::codec::SampleCodec;
use crate::device::{DeviceId, IoMode};
use crate::error::Result;
use crate::packet::Form;

/// The back-end registered under the name `"null"`.
#[derive(Debug, Default)]
pub struct NullBackend;

impl Backend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn can_open_source(&self) -> bool {
        true
    }

    fn can_open_sink(&self) -> bool {
        true
    }

    fn open(
        &self,
        _dev: &DeviceId,
        _mode: IoMode,
        _form: Form,
        _codec: SampleCodec,
        _buffer_size_frames: usize,
    ) -> Result<Box<dyn BackendStream>> {
        let cell = Arc::new(ExchangeCell::new(0, 0));
        Ok(Box::new(NullStream { cell }))
    }
}

struct NullStream {
    cell: Arc<ExchangeCell>,
}

impl BackendStream for NullStream {
    fn cell(&self) -> &Arc<ExchangeCell> {
        &self.cell
    }

    fn start(&mut self) -> Result<()> {
        // Signal end-of-stream immediately: zero frames, one release.
        self.cell.set_in_frames(0);
        self.cell.set_out_frames(0);
        self.cell.driver_release();
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_and_signals_end_of_stream_on_start() {
        let backend = NullBackend;
        let form = Form::new(1, 48_000);
        let mut stream = backend
            .open(&DeviceId::new("null"), IoMode::Input, form, SampleCodec::F32Le, 512)
            .unwrap();
        stream.start().unwrap();
        assert_eq!(stream.cell().turn(), 1);
        assert_eq!(stream.cell().in_frames(), 0);
    }
}
