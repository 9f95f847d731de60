//! Error types returned by the bridge, the codec and the back-end registry.

use thiserror::Error;

/// Errors that can occur while exchanging audio with a bridge, or while
/// managing the process-wide back-end registry.
///
/// Alignment errors are caller bugs: they are detected and returned before
/// the exchange cell is touched, so the bridge's state is unaffected.
/// `DriverLost` and `EndOfStream` are terminal for the bridge that produced
/// them — see [`crate::bridge::Bridge`] for the state machine.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// The caller's buffer length is not a multiple of the form's channel count.
    #[error("buffer length is not a multiple of the channel count")]
    ChannelAlignment,

    /// The caller's buffer, once divided into frames, is not a multiple of
    /// the bridge's configured buffer size.
    #[error("frame count is not a multiple of the configured buffer size")]
    FrameAlignment,

    /// The driver's callback thread did not respond within the spin cap;
    /// it is presumed dead or starved.
    #[error("driver callback thread did not respond, presumed lost")]
    DriverLost,

    /// The back-end signaled a zero-frame callback, meaning the stream has
    /// ended. Returned exactly once; the bridge behaves as `Closed`
    /// thereafter.
    #[error("end of stream")]
    EndOfStream,

    /// The bridge has already been closed.
    #[error("bridge is closed")]
    Closed,

    /// The requested [`crate::codec::SampleCodec`] is not one of the
    /// recognized wire formats.
    #[error("unsupported sample codec")]
    UnsupportedCodec,

    /// A decode/encode call received a source or destination slice whose
    /// length is not a whole multiple of the codec's sample size.
    #[error("buffer length is not aligned to the sample size")]
    BufferMisaligned,

    /// `connect` was called for a name already connected under a different
    /// adapter.
    #[error("an adapter is already connected")]
    AdapterInUse,

    /// The registry has no adapter registered under the requested name.
    #[error("no adapter is registered under that name")]
    NoAdapterAvailable,

    /// The requested adapter name is empty or otherwise malformed.
    #[error("invalid adapter name")]
    InvalidAdapterName,

    /// The requested operation is not supported by this back-end or
    /// configuration (e.g. duplex on an adapter that only opens sources).
    #[error("unsupported operation")]
    Unsupported,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;
