//! playcore-client - Client API core for an embeddable playback engine
//!
//! This crate lets any number of threads observe and drive one long-running
//! playback engine over an in-process message interface. Each client handle
//! owns a private event queue with reply-slot reservation, so every accepted
//! asynchronous request is guaranteed an answer even under event pressure;
//! cross-thread requests are marshalled onto the single engine thread by a
//! dispatch bridge that also supports cooperative suspension.
//!
//! # Key pieces
//!
//! - Per-client event ring (via the `evring` crate): bounded, drop-on-full
//!   for unsolicited events, never-drop for reserved replies
//! - Dispatch bridge: sync and async submission onto the engine thread,
//!   reference-counted suspend/resume
//! - Client registry: unique names, broadcast fan-out filtered by
//!   per-client event masks
//! - Log taps: per-client subscriptions to the engine's log stream
//!
//! # Example
//!
//! ```
//! use playcore_client::{create, EventKind};
//!
//! let client = create();
//! client.initialize().unwrap();
//! client.command(&["loadfile", "intro.mkv"]).unwrap();
//!
//! loop {
//!     let event = client.wait_event(1.0);
//!     if event.kind == EventKind::PlaybackStart {
//!         break;
//!     }
//! }
//! ```

mod client;
mod dispatch;
mod engine;
mod error;
mod event;
mod handle;
mod logging;
mod registry;
mod request;

pub use error::{error_string, Error, Result};
pub use event::{
    Event, EventData, EventKind, Format, PropertyData, ScriptInputDispatch, DEFAULT_EVENT_MASK,
};
pub use handle::{create, Client};
pub use logging::{LogLevel, LogMessage};

/// ABI generation of the client API.
const API_ABI: u32 = 1;
/// Minor, backwards-compatible additions within the current ABI.
const API_MINOR: u32 = 0;

/// Returns the API version: ABI generation in the high 16 bits, minor
/// additions in the low 16 bits.
pub const fn client_api_version() -> u32 {
    (API_ABI << 16) | API_MINOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_layout() {
        let version = client_api_version();
        assert_eq!(version >> 16, 1);
        assert_eq!(version & 0xffff, 0);
    }
}
