//! Bundled [`crate::backend::Backend`] implementations that don't require a
//! platform binding: a no-op back-end for composing with a registry before
//! any real adapter is registered, and a scriptable loopback back-end used
//! to exercise the bridge engine in tests.

pub mod mock;
pub mod null;
