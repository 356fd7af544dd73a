//! Engine log routing and per-client log taps.
//!
//! The engine logs through a [`LogRouter`] owned by its context. Every line
//! is forwarded to the `log` facade, so the host application sees engine
//! diagnostics through whatever logger it installed, and copied into each
//! registered [`LogTap`] whose level admits it. A tap is a bounded buffer
//! with a wakeup hook; clients subscribe one through
//! `request_log_messages` and drain it from their `wait_event` loop.
//!
//! Lock discipline: the router lock is held while a tap buffers a line, but
//! a tap never holds its own lock while invoking its wakeup hook, and the
//! hook may take the owning client's handle lock. The reverse path (a client
//! reading its tap under its handle lock) therefore cannot deadlock.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;

/// Log verbosity levels, ordered from silent to most verbose.
///
/// The names are the stable strings accepted by `request_log_messages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Disables the tap.
    No = 0,
    /// Fatal errors; the engine cannot continue.
    Fatal = 1,
    /// Errors.
    Error = 2,
    /// Warnings.
    Warn = 3,
    /// Informational messages.
    Info = 4,
    /// Status line updates.
    Status = 5,
    /// Verbose messages.
    V = 6,
    /// Debug messages.
    Debug = 7,
    /// Extremely noisy trace messages.
    Trace = 8,
}

impl LogLevel {
    /// Returns the stable name of the level.
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::No => "no",
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Status => "status",
            LogLevel::V => "v",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Maps onto the `log` facade's coarser scale.
    fn facade_level(self) -> Option<log::Level> {
        match self {
            LogLevel::No => None,
            LogLevel::Fatal | LogLevel::Error => Some(log::Level::Error),
            LogLevel::Warn => Some(log::Level::Warn),
            LogLevel::Info | LogLevel::Status => Some(log::Level::Info),
            LogLevel::V | LogLevel::Debug => Some(log::Level::Debug),
            LogLevel::Trace => Some(log::Level::Trace),
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" => Ok(LogLevel::No),
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "status" => Ok(LogLevel::Status),
            "v" => Ok(LogLevel::V),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(()),
        }
    }
}

/// One line captured by a log tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    /// Subsystem prefix, e.g. `"core"` or `"client"`.
    pub prefix: String,
    /// Severity of the line.
    pub level: LogLevel,
    /// The message text, without a trailing newline.
    pub text: String,
}

/// Number of lines a tap buffers before dropping new ones.
pub(crate) const LOG_TAP_CAPACITY: usize = 1000;

struct TapState {
    queue: VecDeque<LogMessage>,
    /// Latched when a line was dropped; surfaced as a marker line once
    /// space frees up.
    overflowed: bool,
}

/// Bounded per-client buffer of log lines with a wakeup hook.
pub(crate) struct LogTap {
    level: LogLevel,
    capacity: usize,
    state: Mutex<TapState>,
    /// Invoked after a line is buffered, outside the tap lock. May take the
    /// owning client's handle lock.
    wakeup: Box<dyn Fn() + Send + Sync>,
}

impl LogTap {
    pub(crate) fn new(
        level: LogLevel,
        capacity: usize,
        wakeup: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            level,
            capacity,
            state: Mutex::new(TapState {
                queue: VecDeque::new(),
                overflowed: false,
            }),
            wakeup: Box::new(wakeup),
        }
    }

    /// Offers a line to the tap; lines above the tap's verbosity are
    /// ignored, lines past capacity are dropped with the overflow latch set.
    fn offer(&self, msg: &LogMessage) {
        if msg.level > self.level || msg.level == LogLevel::No {
            return;
        }

        {
            let mut st = self.state.lock();
            if st.queue.len() >= self.capacity {
                st.overflowed = true;
                return;
            }
            if st.overflowed {
                st.overflowed = false;
                st.queue.push_back(LogMessage {
                    prefix: "logbuffer".into(),
                    level: LogLevel::Warn,
                    text: "log buffer overflow, messages lost".into(),
                });
            }
            st.queue.push_back(msg.clone());
        }

        // Tap lock released before the hook runs.
        (self.wakeup)();
    }

    /// Removes and returns the oldest buffered line.
    pub(crate) fn read(&self) -> Option<LogMessage> {
        self.state.lock().queue.pop_front()
    }
}

/// Fan-out point for engine log lines.
pub(crate) struct LogRouter {
    taps: Mutex<Vec<Arc<LogTap>>>,
}

impl LogRouter {
    pub(crate) fn new() -> Self {
        Self {
            taps: Mutex::new(Vec::new()),
        }
    }

    /// Logs a line: forwards to the `log` facade and copies it into every
    /// registered tap that admits the level.
    ///
    /// Must not be called while holding any handle lock; tap wakeup hooks
    /// take handle locks.
    pub(crate) fn log(&self, level: LogLevel, prefix: &str, text: impl AsRef<str>) {
        let text = text.as_ref();

        if let Some(facade) = level.facade_level() {
            log::log!(target: prefix, facade, "{}", text);
        }

        let msg = LogMessage {
            prefix: prefix.to_string(),
            level,
            text: text.to_string(),
        };
        for tap in self.taps.lock().iter() {
            tap.offer(&msg);
        }
    }

    pub(crate) fn register(&self, tap: Arc<LogTap>) {
        self.taps.lock().push(tap);
    }

    pub(crate) fn unregister(&self, tap: &Arc<LogTap>) {
        self.taps.lock().retain(|t| !Arc::ptr_eq(t, tap));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_level_names_round_trip() {
        for level in [
            LogLevel::No,
            LogLevel::Fatal,
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Status,
            LogLevel::V,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert_eq!(level.as_str().parse::<LogLevel>(), Ok(level));
        }
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_tap_filters_by_level() {
        let tap = Arc::new(LogTap::new(LogLevel::Warn, 16, || {}));
        let router = LogRouter::new();
        router.register(Arc::clone(&tap));

        router.log(LogLevel::Error, "core", "bad");
        router.log(LogLevel::Debug, "core", "chatty");

        assert_eq!(tap.read().unwrap().text, "bad");
        assert_eq!(tap.read(), None);
    }

    #[test]
    fn test_tap_wakeup_fires_per_buffered_line() {
        static WAKEUPS: AtomicUsize = AtomicUsize::new(0);
        WAKEUPS.store(0, Ordering::SeqCst);

        let tap = Arc::new(LogTap::new(LogLevel::Info, 16, || {
            WAKEUPS.fetch_add(1, Ordering::SeqCst);
        }));
        let router = LogRouter::new();
        router.register(Arc::clone(&tap));

        router.log(LogLevel::Info, "core", "one");
        router.log(LogLevel::Trace, "core", "filtered");
        router.log(LogLevel::Info, "core", "two");

        assert_eq!(WAKEUPS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_tap_overflow_marker() {
        let tap = Arc::new(LogTap::new(LogLevel::Info, 2, || {}));
        let router = LogRouter::new();
        router.register(Arc::clone(&tap));

        router.log(LogLevel::Info, "core", "a");
        router.log(LogLevel::Info, "core", "b");
        router.log(LogLevel::Info, "core", "lost");

        assert_eq!(tap.read().unwrap().text, "a");
        router.log(LogLevel::Info, "core", "c");

        assert_eq!(tap.read().unwrap().text, "b");
        let marker = tap.read().unwrap();
        assert_eq!(marker.level, LogLevel::Warn);
        assert!(marker.text.contains("overflow"));
        assert_eq!(tap.read().unwrap().text, "c");
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let tap = Arc::new(LogTap::new(LogLevel::Info, 16, || {}));
        let router = LogRouter::new();
        router.register(Arc::clone(&tap));
        router.unregister(&tap);

        router.log(LogLevel::Info, "core", "after");
        assert_eq!(tap.read(), None);
    }
}
