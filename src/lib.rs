//! Synchronization layer bridging a callback-driven audio driver to a
//! pull/push streaming interface.
//!
//! A hardware or OS audio API typically drives I/O by invoking a callback
//! on its own real-time thread, handing over (or demanding) one buffer at a
//! time. Application code, on the other hand, usually wants a pull/push
//! interface: call `receive`/`send` and get `N` frames back. This crate is
//! the bridge between the two: a single-slot [`cell::ExchangeCell`]
//! coordinated by one atomic counter, a deadline-directed pacing strategy
//! that avoids both busy-spinning and syscall-induced latency, and the
//! [`bridge::Bridge`] engine that ties them together with the
//! [`codec::SampleCodec`] and [`interleave`] layout conversions a real
//! driver boundary needs.
//!
//! Concrete platform back-ends (CoreAudio, ALSA, …) are out of scope: this
//! crate defines the [`backend::Backend`]/[`backend::BackendStream`]
//! contract such a back-end must satisfy, plus a [`host::null::NullBackend`]
//! and a scriptable [`host::mock::MockBackend`] for composing and testing
//! without one compiled in, and a [`registry::Registry`] for selecting an
//! adapter by name at runtime.
//!
//! ```no_run
//! use callback_bridge::backend::Backend;
//! use callback_bridge::bridge::Bridge;
//! use callback_bridge::codec::SampleCodec;
//! use callback_bridge::device::{DeviceId, IoMode};
//! use callback_bridge::host::null::NullBackend;
//! use callback_bridge::packet::Form;
//!
//! let backend = NullBackend;
//! let mut bridge = Bridge::open(
//!     &backend,
//!     &DeviceId::new("default"),
//!     IoMode::Input,
//!     Form::new(2, 44_100),
//!     SampleCodec::I16Le,
//!     512,
//! ).expect("open failed");
//!
//! let mut buf = vec![0.0; 512 * 2];
//! match bridge.receive(&mut buf) {
//!     Ok(n) => println!("captured {n} frames"),
//!     Err(e) => eprintln!("capture failed: {e}"),
//! }
//! ```

pub mod backend;
pub mod bridge;
pub mod cell;
pub mod codec;
pub mod device;
pub mod error;
pub mod host;
pub mod interleave;
pub mod packet;
pub mod pacing;
pub mod registry;

pub use backend::{Backend, BackendStream};
pub use bridge::{Bridge, BridgeState};
pub use codec::{ByteOrderKind, SampleCodec};
pub use device::{DeviceId, IoMode};
pub use error::{BridgeError, Result};
pub use packet::{Form, Packet};
pub use pacing::MissedDeadline;
pub use registry::Registry;
