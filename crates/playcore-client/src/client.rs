//! Per-client state: the event ring, subscriptions, and the wait loop.
//!
//! Each client owns a [`ClientInner`] shared between the public handle and
//! the engine-side paths that deliver events to it. All mutable state sits
//! behind one mutex; the condition variable alongside it wakes the client's
//! waiting thread.
//!
//! Lock discipline: the handle lock is the innermost lock on the delivery
//! path (registry lock, then handle lock). Nothing may be acquired while it
//! is held except a log tap's internal lock in `wait_event`. In particular
//! the choke warning is *not* logged from inside `send_event`; the outcome
//! is bubbled to the registry, which logs after releasing the handle.

use crate::error::{Error, Result};
use crate::event::{Event, EventData, EventKind, DEFAULT_EVENT_MASK};
use crate::logging::LogTap;
use evring::Ring;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Capacity of a client's event ring.
pub(crate) const MAX_EVENTS: usize = 1000;

/// What happened to an event offered to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendOutcome {
    /// Written to the ring, client signalled.
    Delivered,
    /// The client's mask filters this kind; success-no-op.
    Masked,
    /// The ring was full. `first_choke` is true exactly once per client, so
    /// the caller can emit the one-shot choke warning.
    Dropped { first_choke: bool },
}

struct ClientState {
    ring: Ring<Event>,
    event_mask: u64,
    queued_wakeup: bool,
    shutdown: bool,
    /// Latched after the first dropped event; gates the choke warning.
    choke_warning: bool,
    wakeup_cb: Option<Box<dyn Fn() + Send>>,
    /// Last issued reply ID; the first ID handed out is 1.
    next_reply_id: u64,
    log_tap: Option<Arc<LogTap>>,
}

/// Shared per-client state. The public `Client` handle wraps an `Arc` of
/// this; engine-side reply closures hold their own `Arc` so a reply can
/// land even while the handle is being torn down.
pub(crate) struct ClientInner {
    name: String,
    state: Mutex<ClientState>,
    cond: Condvar,
}

impl ClientInner {
    pub(crate) fn new(name: String, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            state: Mutex::new(ClientState {
                ring: Ring::with_capacity(capacity),
                event_mask: DEFAULT_EVENT_MASK,
                queued_wakeup: false,
                shutdown: false,
                choke_warning: false,
                wakeup_cb: None,
                next_reply_id: 0,
                log_tap: None,
            }),
            cond: Condvar::new(),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Signals the waiting thread and fires the wakeup callback. The
    /// callback runs with the handle lock held; it must be wait-free and
    /// must not call back into the API.
    fn wakeup_locked(&self, st: &ClientState) {
        self.cond.notify_all();
        if let Some(cb) = &st.wakeup_cb {
            cb();
        }
    }

    // ---------------------------------------------------------------------
    // DELIVERY (engine side)
    // ---------------------------------------------------------------------

    /// Offers an unsolicited event. May drop; never blocks.
    pub(crate) fn send_event(&self, event: Event) -> SendOutcome {
        let mut st = self.state.lock();
        if st.event_mask & event.kind.mask_bit() == 0 {
            return SendOutcome::Masked;
        }
        match st.ring.try_push(event) {
            Ok(()) => {
                self.wakeup_locked(&st);
                SendOutcome::Delivered
            }
            Err(_) => {
                let first_choke = !st.choke_warning;
                st.choke_warning = true;
                SendOutcome::Dropped { first_choke }
            }
        }
    }

    /// Claims a reply slot and allocates the reply ID for an async request.
    pub(crate) fn reserve_reply(&self) -> Result<u64> {
        let mut st = self.state.lock();
        st.ring.reserve().map_err(|_| Error::EventQueueFull)?;
        st.next_reply_id += 1;
        Ok(st.next_reply_id)
    }

    /// Writes a reply into a previously reserved slot. Never drops.
    pub(crate) fn send_reply(&self, event: Event) {
        debug_assert!(event.reply_id > 0, "reply without a reply ID");
        let mut st = self.state.lock();
        st.ring.push_reserved(event);
        self.wakeup_locked(&st);
    }

    /// Translates a status into an Ok or Error reply.
    pub(crate) fn send_status_reply(&self, reply_id: u64, status: Result<()>) {
        let event = match status {
            Ok(()) => Event {
                reply_id,
                kind: EventKind::Ok,
                error: 0,
                data: EventData::None,
            },
            Err(err) => Event {
                reply_id,
                kind: EventKind::Error,
                error: err.code(),
                data: EventData::None,
            },
        };
        self.send_reply(event);
    }

    /// Marks the client as shutting down and wakes it. Subsequent
    /// `wait_event` calls return Shutdown once the ring has drained.
    pub(crate) fn mark_shutdown(&self) {
        let mut st = self.state.lock();
        st.shutdown = true;
        self.wakeup_locked(&st);
    }

    // ---------------------------------------------------------------------
    // CLIENT SIDE
    // ---------------------------------------------------------------------

    /// Waits for the next event, up to `timeout` seconds. A timeout of zero
    /// or less polls without blocking. Returns a None event on wakeup or
    /// timeout.
    ///
    /// Single-consumer: only one thread may wait on a given client.
    pub(crate) fn wait_event(&self, timeout: f64) -> Event {
        let deadline = if timeout > 0.0 {
            Some(Instant::now() + Duration::from_secs_f64(timeout.min(1.0e9)))
        } else {
            None
        };

        let mut st = self.state.lock();
        loop {
            if let Some(event) = st.ring.pop() {
                return event;
            }
            if st.shutdown {
                return Event::new(EventKind::Shutdown);
            }
            if let Some(tap) = st.log_tap.clone() {
                if let Some(msg) = tap.read() {
                    return Event::with_data(EventKind::LogMessage, EventData::LogMessage(msg));
                }
            }
            if st.queued_wakeup {
                st.queued_wakeup = false;
                return Event::none();
            }
            let Some(deadline) = deadline else {
                return Event::none();
            };
            if Instant::now() >= deadline {
                return Event::none();
            }
            let _ = self.cond.wait_until(&mut st, deadline);
        }
    }

    /// Interrupts `wait_event` from any thread; the waiter observes a None
    /// event. Also fires the wakeup callback.
    pub(crate) fn wakeup(&self) {
        let mut st = self.state.lock();
        st.queued_wakeup = true;
        self.wakeup_locked(&st);
    }

    /// Wakes the waiting thread without queuing a None event; used by the
    /// log tap when a line arrives.
    pub(crate) fn notify(&self) {
        let st = self.state.lock();
        self.wakeup_locked(&st);
    }

    pub(crate) fn set_wakeup_callback(&self, cb: Option<Box<dyn Fn() + Send>>) {
        self.state.lock().wakeup_cb = cb;
    }

    /// Toggles one bit of the event mask. Events of a disabled kind already
    /// in the ring are still delivered.
    pub(crate) fn request_event(&self, kind: EventKind, enable: bool) {
        let mut st = self.state.lock();
        if enable {
            st.event_mask |= kind.mask_bit();
        } else {
            st.event_mask &= !kind.mask_bit();
        }
    }

    pub(crate) fn set_log_tap(&self, tap: Option<Arc<LogTap>>) {
        self.state.lock().log_tap = tap;
    }

    pub(crate) fn take_log_tap(&self) -> Option<Arc<LogTap>> {
        self.state.lock().log_tap.take()
    }

    /// Teardown on destroy: drop buffered events and their payloads, drop
    /// the wakeup callback, detach the log tap (returned so the caller can
    /// unregister it from the router outside this lock). Also reports the
    /// ring's traffic counters for the destroy log line.
    pub(crate) fn teardown(&self) -> (Option<Arc<LogTap>>, evring::RingStats) {
        let mut st = self.state.lock();
        st.ring.clear();
        st.wakeup_cb = None;
        (st.log_tap.take(), st.ring.stats())
    }

    #[cfg(test)]
    fn buffered(&self) -> usize {
        self.state.lock().ring.buffered()
    }
}
