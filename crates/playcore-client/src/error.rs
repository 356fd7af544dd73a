//! Error taxonomy of the client API.
//!
//! Every error category has a stable negative integer code so the values can
//! be carried across language bindings unchanged. `0` and positive values are
//! reserved for success (positive values are reply IDs in the async paths).

use thiserror::Error;

/// Errors reported by the client API.
///
/// The discriminants are part of the wire contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// An async request could not reserve a reply slot in the client's
    /// event ring.
    #[error("event queue full")]
    EventQueueFull,
    /// Malformed input, or an operation issued in the wrong state.
    #[error("invalid parameter")]
    InvalidParameter,
    /// An allocation or resource request failed.
    #[error("out of memory")]
    Nomem,
    /// Unknown client, property, or option.
    #[error("not found")]
    NotFound,
    /// Property access failed.
    #[error("property access failed")]
    Property,
    /// The subsystem backing a property is not active.
    #[error("property unavailable")]
    PropertyUnavailable,
    /// The engine has not been initialized yet.
    #[error("core not initialized")]
    Uninitialized,
}

impl Error {
    /// Returns the stable integer code for this error.
    #[inline]
    pub const fn code(self) -> i32 {
        match self {
            Error::EventQueueFull => -1,
            Error::InvalidParameter => -2,
            Error::Nomem => -3,
            Error::NotFound => -4,
            Error::Property => -5,
            Error::PropertyUnavailable => -6,
            Error::Uninitialized => -7,
        }
    }

    /// Maps a stable integer code back to the error, `None` for codes that
    /// do not name an error (zero, positive, or unassigned).
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Error::EventQueueFull),
            -2 => Some(Error::InvalidParameter),
            -3 => Some(Error::Nomem),
            -4 => Some(Error::NotFound),
            -5 => Some(Error::Property),
            -6 => Some(Error::PropertyUnavailable),
            -7 => Some(Error::Uninitialized),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns a human-readable description for a stable error code.
///
/// Codes `≥ 0` describe success; unassigned negative codes yield a generic
/// description rather than an error.
pub fn error_string(code: i32) -> &'static str {
    if code >= 0 {
        return "success";
    }
    match Error::from_code(code) {
        Some(Error::EventQueueFull) => "event queue full",
        Some(Error::InvalidParameter) => "invalid parameter",
        Some(Error::Nomem) => "out of memory",
        Some(Error::NotFound) => "not found",
        Some(Error::Property) => "property access failed",
        Some(Error::PropertyUnavailable) => "property unavailable",
        Some(Error::Uninitialized) => "core not initialized",
        None => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::EventQueueFull.code(), -1);
        assert_eq!(Error::InvalidParameter.code(), -2);
        assert_eq!(Error::Nomem.code(), -3);
        assert_eq!(Error::NotFound.code(), -4);
        assert_eq!(Error::Property.code(), -5);
        assert_eq!(Error::PropertyUnavailable.code(), -6);
        assert_eq!(Error::Uninitialized.code(), -7);
    }

    #[test]
    fn test_round_trip() {
        for code in -7..=-1 {
            let err = Error::from_code(code).unwrap();
            assert_eq!(err.code(), code);
        }
        assert_eq!(Error::from_code(0), None);
        assert_eq!(Error::from_code(1), None);
        assert_eq!(Error::from_code(-8), None);
    }

    #[test]
    fn test_error_string() {
        assert_eq!(error_string(0), "success");
        assert_eq!(error_string(5), "success");
        assert_eq!(error_string(-1), "event queue full");
        assert_eq!(error_string(-100), "unknown error");
    }
}
