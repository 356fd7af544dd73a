//! Request runners: commands and property access, sync and async.
//!
//! All runners share one shape. Input validation happens synchronously on
//! the caller's thread, so malformed commands, bad levels, and calls before
//! initialization are reported as return values and never consume a reply
//! slot. The synchronous forms then block on the dispatch bridge until the
//! engine thread has executed the request; the asynchronous forms reserve a
//! reply slot, enqueue the work, and return the positive reply ID that the
//! eventual reply event carries in [`Event::reply_id`].
//!
//! [`Event::reply_id`]: crate::Event::reply_id

use crate::engine::command::{parse_argv, parse_line};
use crate::engine::props::{property_do, Verb};
use crate::error::{Error, Result};
use crate::event::{Event, EventData, EventKind, Format, PropertyData};
use crate::handle::Client;
use std::sync::Arc;

impl Client {
    fn ensure_initialized(&self) -> Result<()> {
        if self.engine.is_initialized() {
            Ok(())
        } else {
            Err(Error::Uninitialized)
        }
    }

    // ---------------------------------------------------------------------
    // COMMANDS
    // ---------------------------------------------------------------------

    /// Runs a command given as argv and blocks until it has executed.
    pub fn command<S: AsRef<str>>(&self, args: &[S]) -> Result<()> {
        let cmd = parse_argv(args)?;
        self.ensure_initialized()?;
        self.engine.dispatch.run(move |core| core.run_command(cmd))
    }

    /// Runs a command given as a single line, with quoting.
    pub fn command_string(&self, line: &str) -> Result<()> {
        let cmd = parse_line(line)?;
        self.ensure_initialized()?;
        self.engine.dispatch.run(move |core| core.run_command(cmd))
    }

    /// Submits a command for asynchronous execution.
    ///
    /// Returns the reply ID; the engine answers with an
    /// [`EventKind::Ok`] or [`EventKind::Error`] event carrying it.
    pub fn command_async<S: AsRef<str>>(&self, args: &[S]) -> Result<u64> {
        let cmd = parse_argv(args)?;
        self.ensure_initialized()?;

        let reply_id = self.inner.reserve_reply()?;
        let client = Arc::clone(&self.inner);
        self.engine.dispatch.run_async(move |core| {
            let status = core.run_command(cmd);
            client.send_status_reply(reply_id, status);
        });
        Ok(reply_id)
    }

    // ---------------------------------------------------------------------
    // PROPERTIES
    // ---------------------------------------------------------------------

    /// Sets a property from its text representation and blocks until done.
    pub fn set_property(&self, name: &str, value: &str) -> Result<()> {
        self.ensure_initialized()?;
        let name = name.to_string();
        let value = value.to_string();
        self.engine
            .dispatch
            .run(move |core| property_do(core, &name, Verb::SetText(&value)).map(|_| ()))
    }

    /// Submits a property write for asynchronous execution; the reply is an
    /// Ok or Error event.
    pub fn set_property_async(&self, name: &str, value: &str) -> Result<u64> {
        self.ensure_initialized()?;

        let reply_id = self.inner.reserve_reply()?;
        let client = Arc::clone(&self.inner);
        let name = name.to_string();
        let value = value.to_string();
        self.engine.dispatch.run_async(move |core| {
            let status = property_do(core, &name, Verb::SetText(&value)).map(|_| ());
            client.send_status_reply(reply_id, status);
        });
        Ok(reply_id)
    }

    /// Reads a property as text and blocks until the engine has answered.
    pub fn get_property(&self, name: &str) -> Result<String> {
        self.run_get(name, Verb::GetText)
    }

    /// Reads the print-friendly rendering of a property.
    pub fn get_property_print(&self, name: &str) -> Result<String> {
        self.run_get(name, Verb::Print)
    }

    fn run_get(&self, name: &str, verb: Verb<'static>) -> Result<String> {
        self.ensure_initialized()?;
        let name = name.to_string();
        self.engine
            .dispatch
            .run(move |core| property_do(core, &name, verb))
            .map(Option::unwrap_or_default)
    }

    /// Submits a property read for asynchronous execution.
    ///
    /// On success the reply is an [`EventKind::Property`] event whose
    /// payload carries the property name and its text value; on failure an
    /// [`EventKind::Error`] event.
    pub fn get_property_async(&self, name: &str) -> Result<u64> {
        self.ensure_initialized()?;

        let reply_id = self.inner.reserve_reply()?;
        let client = Arc::clone(&self.inner);
        let name = name.to_string();
        self.engine.dispatch.run_async(move |core| {
            match property_do(core, &name, Verb::GetText) {
                Ok(value) => client.send_reply(Event {
                    reply_id,
                    kind: EventKind::Property,
                    error: 0,
                    data: EventData::Property(PropertyData {
                        name,
                        format: Format::Text,
                        data: value,
                    }),
                }),
                Err(err) => client.send_status_reply(reply_id, Err(err)),
            }
        });
        Ok(reply_id)
    }

    // ---------------------------------------------------------------------
    // OPTIONS
    // ---------------------------------------------------------------------

    /// Sets an option from its text representation.
    ///
    /// Before [`initialize`](Client::initialize) this writes the
    /// configuration store directly, bypassing the dispatch bridge. After
    /// initialization the write is routed to the matching runtime property
    /// under the `options/` prefix; options without a runtime property
    /// then report [`Error::NotFound`].
    pub fn set_option(&self, name: &str, value: &str) -> Result<()> {
        if self.engine.is_initialized() {
            return self.set_property(&format!("options/{name}"), value);
        }
        self.engine.options.lock().set(name, value).into_result()
    }
}
