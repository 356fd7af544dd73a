//! The public client handle: creation, initialization, teardown, the event
//! wait loop, and per-client subscriptions.

use crate::client::{ClientInner, MAX_EVENTS};
use crate::engine::{playback_thread, Engine, Playback};
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::logging::{LogLevel, LogTap, LOG_TAP_CAPACITY};
use std::sync::{Arc, Weak};
use std::thread;

/// Creates a fresh engine context with one client named `"main"`.
///
/// Embedder-friendly defaults are applied to the option store: the engine
/// idles instead of exiting when no file is loaded, and the terminal and
/// on-screen controller integrations are off. Hosts opt back in through
/// [`Client::set_option`] before initializing.
pub fn create() -> Client {
    let engine = Arc::new(Engine::new());
    let inner = engine
        .registry
        .new_client("main", MAX_EVENTS, &engine.log)
        .expect("fresh registry has every name free");
    let client = Client { inner, engine };

    for (name, value) in [("idle", "yes"), ("terminal", "no"), ("osc", "no")] {
        let _ = client.set_option(name, value);
    }
    client
}

/// A handle onto the engine, held by one client.
///
/// Handles are independent: each has its own event queue, event mask, log
/// tap, and reply ID space. The handle can be shared across threads (wrap
/// it in an `Arc`), but the wait loop is single-consumer: only one thread
/// may call [`wait_event`] on a given handle.
///
/// Dropping the last handle of an initialized engine makes the playback
/// thread tear the engine down.
///
/// [`wait_event`]: Client::wait_event
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
    pub(crate) engine: Arc<Engine>,
}

impl Client {
    /// Creates another client of the same engine.
    ///
    /// The name is made unique by appending a numeric suffix on collision;
    /// an empty name becomes `"client"`. Fails with [`Error::Nomem`] when
    /// the suffix space is exhausted.
    pub fn create_client(&self, name: &str) -> Result<Client> {
        let inner = self.engine.registry.new_client(name, MAX_EVENTS, &self.engine.log)?;
        Ok(Client {
            inner,
            engine: Arc::clone(&self.engine),
        })
    }

    /// Initializes the engine and spawns the detached playback thread.
    ///
    /// May be called once per engine context; later calls fail with
    /// [`Error::InvalidParameter`]. A failed thread spawn reports
    /// [`Error::Nomem`] and leaves the context uninitialized.
    pub fn initialize(&self) -> Result<()> {
        if !self.engine.set_initialized() {
            return Err(Error::InvalidParameter);
        }

        let core = {
            let opts = self.engine.options.lock();
            Playback::new(Arc::clone(&self.engine), &opts)
        };
        match thread::Builder::new()
            .name("playcore-playback".into())
            .spawn(move || playback_thread(core))
        {
            Ok(_detached) => Ok(()),
            Err(_) => {
                self.engine.clear_initialized();
                Err(Error::Nomem)
            }
        }
    }

    /// The unique name this client is registered under.
    pub fn client_name(&self) -> &str {
        self.inner.name()
    }

    /// Waits up to `timeout` seconds for the next event.
    ///
    /// A timeout of zero or less polls without blocking. Returns an event
    /// of kind [`EventKind::None`] on timeout or wakeup, and
    /// [`EventKind::Shutdown`] (repeatedly) once the engine is tearing
    /// down and the queue has drained.
    ///
    /// Only one thread may wait on a given client at a time.
    pub fn wait_event(&self, timeout: f64) -> Event {
        self.inner.wait_event(timeout)
    }

    /// Interrupts a concurrent [`wait_event`](Client::wait_event) from any
    /// thread; the waiter observes a None event.
    pub fn wakeup(&self) {
        self.inner.wakeup();
    }

    /// Installs a callback fired whenever this client has a reason to call
    /// [`wait_event`](Client::wait_event) again.
    ///
    /// The callback runs with internal locks held: it must return quickly,
    /// must not block, and must not call back into this API. Prefer
    /// signalling a channel or an eventfd-like primitive from it.
    pub fn set_wakeup_callback(&self, cb: impl Fn() + Send + 'static) {
        self.inner.set_wakeup_callback(Some(Box::new(cb)));
    }

    /// Removes the wakeup callback.
    pub fn clear_wakeup_callback(&self) {
        self.inner.set_wakeup_callback(None);
    }

    /// Enables or disables delivery of one event kind for this client.
    ///
    /// All kinds start enabled except the high-frequency
    /// [`EventKind::Tick`]. Disabling a kind does not remove events of that
    /// kind already queued; they are still delivered.
    pub fn request_event(&self, kind: EventKind, enable: bool) {
        self.inner.request_event(kind, enable);
    }

    /// Subscribes this client to the engine's log stream at the given
    /// minimum level, one of `no`, `fatal`, `error`, `warn`, `info`,
    /// `status`, `v`, `debug`, `trace`.
    ///
    /// `"no"` closes the subscription; any other level replaces the
    /// current tap with a fresh one (buffered lines are discarded).
    /// Captured lines are delivered as [`EventKind::LogMessage`] events.
    pub fn request_log_messages(&self, level: &str) -> Result<()> {
        let level: LogLevel = level.parse().map_err(|()| Error::InvalidParameter)?;

        // Swap outside the handle lock; the router takes tap and handle
        // locks on delivery and must never be entered while holding one.
        if let Some(old) = self.inner.take_log_tap() {
            self.engine.log.unregister(&old);
        }
        if level == LogLevel::No {
            return Ok(());
        }

        let weak: Weak<ClientInner> = Arc::downgrade(&self.inner);
        let tap = Arc::new(LogTap::new(level, LOG_TAP_CAPACITY, move || {
            if let Some(client) = weak.upgrade() {
                client.notify();
            }
        }));
        self.engine.log.register(Arc::clone(&tap));
        self.inner.set_log_tap(Some(tap));
        Ok(())
    }

    /// Parks the engine thread at its next safe point. Reentrant; each call
    /// must be matched by one [`resume`](Client::resume). Synchronous and
    /// asynchronous requests still execute while suspended.
    pub fn suspend(&self) {
        self.engine.dispatch.suspend();
    }

    /// Releases one suspension.
    ///
    /// # Panics
    ///
    /// More resumes than suspends is a fatal programming error and panics.
    pub fn resume(&self) {
        self.engine.dispatch.resume();
    }

    /// Destroys this handle: deregisters the client, discards its queued
    /// events, and closes its log tap. Equivalent to dropping the handle;
    /// provided for symmetry with `create`.
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.engine.registry.remove(&self.inner);
        let (tap, stats) = self.inner.teardown();
        if let Some(tap) = tap {
            self.engine.log.unregister(&tap);
        }
        self.engine.log.log(
            LogLevel::Debug,
            "client",
            format!(
                "client \"{}\" destroyed ({} events delivered, {} dropped)",
                self.inner.name(),
                stats.pushed,
                stats.dropped
            ),
        );
        // Wake the engine so it observes the reduced client count.
        self.engine.dispatch.poke();
    }
}
