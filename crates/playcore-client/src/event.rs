//! Event records delivered through per-client event rings.
//!
//! An [`Event`] is a small record: a reply correlation ID, an event kind, an
//! error code, and an owned variant payload. Broadcast fan-out clones the
//! payload per recipient, so the producer's own copy is dropped exactly once
//! after the fan-out regardless of how many clients received it.

use crate::logging::LogMessage;

/// The kinds of events a client can observe.
///
/// The integer values are part of the wire contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EventKind {
    /// No event; returned on wakeup or timeout.
    None = 0,
    /// Successful reply to an async request.
    Ok = 1,
    /// Failed reply to an async request; `Event::error` holds the code.
    Error = 2,
    /// The engine is tearing down; the client should destroy its handle.
    Shutdown = 3,
    /// A line from the client's log tap.
    LogMessage = 4,
    /// Periodic notification while playback is active. High-frequency;
    /// disabled in the default mask, opt in with `request_event`.
    Tick = 5,
    /// Reply to an async property read; carries the property payload.
    Property = 6,
    /// A new file is being loaded.
    StartFile = 7,
    /// The current file ended or was unloaded.
    EndFile = 8,
    /// Decoding of the current file started.
    PlaybackStart = 9,
    /// The set of tracks changed.
    TracksChanged = 10,
    /// The selected track changed.
    TrackSwitched = 11,
    /// The engine entered idle mode.
    Idle = 12,
    /// Playback was paused.
    Pause = 13,
    /// Playback was unpaused.
    Unpause = 14,
    /// A scripting binding was dispatched to this client.
    ScriptInputDispatch = 15,
}

impl EventKind {
    /// Every kind, in wire order.
    pub const ALL: [EventKind; 16] = [
        EventKind::None,
        EventKind::Ok,
        EventKind::Error,
        EventKind::Shutdown,
        EventKind::LogMessage,
        EventKind::Tick,
        EventKind::Property,
        EventKind::StartFile,
        EventKind::EndFile,
        EventKind::PlaybackStart,
        EventKind::TracksChanged,
        EventKind::TrackSwitched,
        EventKind::Idle,
        EventKind::Pause,
        EventKind::Unpause,
        EventKind::ScriptInputDispatch,
    ];

    /// Returns the stable integer value.
    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Maps a stable integer value back to the kind. This is the validation
    /// seam for bindings that carry kinds as raw integers.
    pub const fn from_id(id: u32) -> Option<Self> {
        if id < Self::ALL.len() as u32 {
            Some(Self::ALL[id as usize])
        } else {
            None
        }
    }

    /// Returns the bit this kind occupies in an event mask.
    #[inline]
    pub const fn mask_bit(self) -> u64 {
        1 << self.id()
    }

    /// Returns the stable name of this kind.
    pub const fn name(self) -> &'static str {
        match self {
            EventKind::None => "none",
            EventKind::Ok => "ok",
            EventKind::Error => "error",
            EventKind::Shutdown => "shutdown",
            EventKind::LogMessage => "log-message",
            EventKind::Tick => "tick",
            EventKind::Property => "property",
            EventKind::StartFile => "start-file",
            EventKind::EndFile => "end-file",
            EventKind::PlaybackStart => "playback-start",
            EventKind::TracksChanged => "tracks-changed",
            EventKind::TrackSwitched => "track-switched",
            EventKind::Idle => "idle",
            EventKind::Pause => "pause",
            EventKind::Unpause => "unpause",
            EventKind::ScriptInputDispatch => "script-input-dispatch",
        }
    }
}

/// Default event mask: everything enabled except the high-frequency `Tick`.
pub const DEFAULT_EVENT_MASK: u64 = {
    let mut mask = 0u64;
    let mut i = 0;
    while i < EventKind::ALL.len() {
        mask |= 1 << i;
        i += 1;
    }
    mask & !EventKind::Tick.mask_bit()
};

/// Format of a property value carried in a [`PropertyData`] payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// No data.
    None,
    /// UTF-8 text.
    Text,
}

/// Payload of a [`EventKind::Property`] reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyData {
    /// Property name as requested.
    pub name: String,
    /// Format of `data`.
    pub format: Format,
    /// The value; `None` when `format` is [`Format::None`].
    pub data: Option<String>,
}

/// Payload of a [`EventKind::ScriptInputDispatch`] event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInputDispatch {
    /// Binding-defined argument.
    pub arg0: i32,
    /// Dispatch type, e.g. `"keyup_follows"`.
    pub kind: String,
}

/// Variant payload of an event, determined by the event kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EventData {
    /// No payload.
    #[default]
    None,
    /// Log line, for [`EventKind::LogMessage`].
    LogMessage(LogMessage),
    /// Property reply, for [`EventKind::Property`].
    Property(PropertyData),
    /// Script dispatch, for [`EventKind::ScriptInputDispatch`].
    ScriptInputDispatch(ScriptInputDispatch),
}

/// One record in a client's event ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Reply ID of the async request this event answers; `0` for
    /// unsolicited events.
    pub reply_id: u64,
    /// What happened.
    pub kind: EventKind,
    /// Stable error code for [`EventKind::Error`] events, `0` otherwise.
    pub error: i32,
    /// Owned payload.
    pub data: EventData,
}

impl Event {
    /// Creates an unsolicited event without payload.
    pub fn new(kind: EventKind) -> Self {
        Self {
            reply_id: 0,
            kind,
            error: 0,
            data: EventData::None,
        }
    }

    /// Creates an unsolicited event with a payload.
    pub fn with_data(kind: EventKind, data: EventData) -> Self {
        Self {
            reply_id: 0,
            kind,
            error: 0,
            data,
        }
    }

    /// The event returned on wakeup and timeout.
    pub fn none() -> Self {
        Self::new(EventKind::None)
    }

    /// True if this event answers an async request.
    #[inline]
    pub fn is_reply(&self) -> bool {
        self.reply_id != 0
    }
}
