//! Minimal device identity and stream direction, kept intentionally opaque.
//!
//! Device enumeration, default-device selection and capability queries are
//! out of scope here; a back-end's `open` still needs a concrete, typed
//! parameter to name which device it should configure, so this crate keeps
//! only that much.

use std::fmt;

/// Opaque identifier for a device, as understood by a particular back-end.
///
/// This crate does not interpret the contents; a back-end is free to treat
/// it as a platform device name, an index serialized to a string, or
/// anything else meaningful to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wraps a back-end-specific device identifier.
    pub fn new(id: impl Into<String>) -> Self {
        DeviceId(id.into())
    }

    /// The wrapped identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        DeviceId::new(s)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        DeviceId::new(s)
    }
}

/// The direction a bridge was opened for.
///
/// This is descriptive only — `Debug`/logging and registry bookkeeping use
/// it to reject a mismatched open before a back-end is even asked. The
/// actual contract a back-end implements is the capability predicates in
/// [`crate::backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoMode {
    /// Capture only.
    Input,
    /// Playback only.
    Output,
    /// Simultaneous capture and playback, sharing one device clock.
    Duplex,
}

impl IoMode {
    /// True for `Input` and `Duplex`.
    pub fn inputs(&self) -> bool {
        matches!(self, IoMode::Input | IoMode::Duplex)
    }

    /// True for `Output` and `Duplex`.
    pub fn outputs(&self) -> bool {
        matches!(self, IoMode::Output | IoMode::Duplex)
    }

    /// True only for `Duplex`.
    pub fn is_duplex(&self) -> bool {
        matches!(self, IoMode::Duplex)
    }
}

impl fmt::Display for IoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IoMode::Input => "input",
            IoMode::Output => "output",
            IoMode::Duplex => "duplex",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_mode() {
        assert!(IoMode::Input.inputs());
        assert!(!IoMode::Input.outputs());
        assert!(IoMode::Output.outputs());
        assert!(!IoMode::Output.inputs());
        assert!(IoMode::Duplex.inputs());
        assert!(IoMode::Duplex.outputs());
        assert!(IoMode::Duplex.is_duplex());
        assert!(!IoMode::Input.is_duplex());
    }

    #[test]
    fn device_id_roundtrips_through_display() {
        let id: DeviceId = "hw:0,0".into();
        assert_eq!(id.as_str(), "hw:0,0");
        assert_eq!(id.to_string(), "hw:0,0");
    }
}
