//! Client registry: unique-name allocation and event fan-out.
//!
//! One registry per engine context. The registry lock is the outermost lock
//! in the crate: it is held across fan-out while each recipient's handle
//! lock is taken in turn, which gives all recipients a consistent total
//! order of broadcasts. The engine never blocks on a slow client; a full
//! ring drops the event for that client only.

use crate::client::{ClientInner, SendOutcome};
use crate::error::{Error, Result};
use crate::event::{Event, EventData, EventKind};
use crate::logging::{LogLevel, LogRouter};
use parking_lot::Mutex;
use std::sync::Arc;

pub(crate) struct Registry {
    clients: Mutex<Vec<Arc<ClientInner>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new client under a unique name.
    ///
    /// A taken name gets a numeric suffix from 2 to 999; when all of those
    /// are taken too the registry is considered exhausted.
    pub(crate) fn new_client(
        &self,
        name: &str,
        capacity: usize,
        log: &LogRouter,
    ) -> Result<Arc<ClientInner>> {
        let base = if name.is_empty() { "client" } else { name };

        let client = {
            let mut clients = self.clients.lock();
            let taken = |candidate: &str| clients.iter().any(|c| c.name() == candidate);

            let unique = if !taken(base) {
                base.to_string()
            } else {
                (2..=999u32)
                    .map(|n| format!("{base}{n}"))
                    .find(|candidate| !taken(candidate))
                    .ok_or(Error::Nomem)?
            };

            let client = ClientInner::new(unique, capacity);
            clients.push(Arc::clone(&client));
            client
        };

        log.log(
            LogLevel::Debug,
            "client",
            format!("registered client \"{}\"", client.name()),
        );
        Ok(client)
    }

    /// Removes a client; events still in flight for it are dropped by the
    /// handle's own teardown.
    pub(crate) fn remove(&self, client: &Arc<ClientInner>) {
        self.clients.lock().retain(|c| !Arc::ptr_eq(c, client));
    }

    /// Number of live clients.
    pub(crate) fn count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Delivers an unsolicited event to every client, filtered by each
    /// client's mask. The payload is cloned per recipient; the copy passed
    /// in is dropped exactly once when this function returns, no matter how
    /// many clients received it. Returns the number of deliveries.
    pub(crate) fn broadcast(&self, kind: EventKind, data: EventData, log: &LogRouter) -> usize {
        let clients = self.clients.lock();
        let mut delivered = 0;
        for client in clients.iter() {
            let event = Event::with_data(kind, data.clone());
            match client.send_event(event) {
                SendOutcome::Delivered => delivered += 1,
                SendOutcome::Masked => {}
                SendOutcome::Dropped { first_choke } => {
                    if first_choke {
                        log.log(
                            LogLevel::Warn,
                            "client",
                            format!("{}: too many events queued", client.name()),
                        );
                    }
                }
            }
        }
        delivered
    }

    /// Delivers an unsolicited event to one client by name.
    pub(crate) fn send_to(
        &self,
        name: &str,
        kind: EventKind,
        data: EventData,
        log: &LogRouter,
    ) -> Result<()> {
        let clients = self.clients.lock();
        let Some(client) = clients.iter().find(|c| c.name() == name) else {
            return Err(Error::NotFound);
        };
        match client.send_event(Event::with_data(kind, data)) {
            SendOutcome::Dropped { first_choke: true } => {
                log.log(
                    LogLevel::Warn,
                    "client",
                    format!("{}: too many events queued", client.name()),
                );
            }
            _ => {}
        }
        Ok(())
    }

    /// Sets the shutdown flag on every client and wakes them.
    pub(crate) fn mark_shutdown_all(&self) {
        for client in self.clients.lock().iter() {
            client.mark_shutdown();
        }
    }
}
