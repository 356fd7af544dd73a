//! The engine context and the playback thread.
//!
//! [`Engine`] is the shared per-context state: option store, client
//! registry, log router, and the dispatch bridge. [`Playback`] is the
//! single-threaded playback state owned by the playback thread; every
//! mutation of it travels through the dispatch bridge, so clients never
//! touch it directly.
//!
//! The playback model is deliberately small. Files are abstract sources
//! (no media I/O happens here): loading one broadcasts the start-of-file
//! event sequence, the position clock advances with wall time scaled by
//! speed, and ticks are emitted while playback is active. What matters is
//! the event traffic and state transitions the clients observe.

pub(crate) mod command;
pub(crate) mod options;
pub(crate) mod props;

use crate::dispatch::Dispatch;
use crate::error::{Error, Result};
use crate::event::{EventData, EventKind, ScriptInputDispatch};
use crate::logging::{LogLevel, LogRouter};
use crate::registry::Registry;
use self::command::Command;
use self::options::OptionStore;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Spacing of Tick events while playback runs.
const TICK_INTERVAL: Duration = Duration::from_millis(10);
/// How long the engine sleeps when there is nothing to play.
const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Shared engine context; one per `create()`.
pub(crate) struct Engine {
    pub(crate) options: Mutex<OptionStore>,
    pub(crate) registry: Registry,
    pub(crate) log: LogRouter,
    pub(crate) dispatch: Dispatch<Playback>,
    initialized: AtomicBool,
}

impl Engine {
    pub(crate) fn new() -> Self {
        Self {
            options: Mutex::new(OptionStore::new()),
            registry: Registry::new(),
            log: LogRouter::new(),
            dispatch: Dispatch::new(),
            initialized: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Flips the context to initialized; returns false if it already was.
    pub(crate) fn set_initialized(&self) -> bool {
        !self.initialized.swap(true, Ordering::SeqCst)
    }

    /// Rolls initialization back after a failed thread spawn.
    pub(crate) fn clear_initialized(&self) {
        self.initialized.store(false, Ordering::SeqCst);
    }
}

/// Playback state, owned by the playback thread.
pub(crate) struct Playback {
    engine: Arc<Engine>,
    playlist: VecDeque<String>,
    current: Option<String>,
    pause: bool,
    volume: f64,
    speed: f64,
    track: i64,
    time_pos: f64,
    /// The `idle` option: stay alive with no file loaded.
    idle_mode: bool,
    idle_active: bool,
    quit: bool,
    last_step: Instant,
    next_tick: Instant,
}

impl Playback {
    pub(crate) fn new(engine: Arc<Engine>, opts: &OptionStore) -> Self {
        let now = Instant::now();
        Self {
            engine,
            playlist: VecDeque::new(),
            current: None,
            pause: opts.flag("pause"),
            volume: opts.float("volume"),
            speed: opts.float("speed"),
            track: 1,
            time_pos: 0.0,
            idle_mode: opts.flag("idle"),
            idle_active: false,
            quit: false,
            last_step: now,
            next_tick: now,
        }
    }

    fn broadcast(&self, kind: EventKind, data: EventData) {
        self.engine.registry.broadcast(kind, data, &self.engine.log);
    }

    fn log(&self, level: LogLevel, text: impl AsRef<str>) {
        self.engine.log.log(level, "core", text);
    }

    // ---------------------------------------------------------------------
    // STATE ACCESS (property layer)
    // ---------------------------------------------------------------------

    pub(super) fn pause(&self) -> bool {
        self.pause
    }

    pub(super) fn volume(&self) -> f64 {
        self.volume
    }

    pub(super) fn speed(&self) -> f64 {
        self.speed
    }

    pub(super) fn track(&self) -> i64 {
        self.track
    }

    pub(super) fn current_path(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub(super) fn time_pos(&self) -> f64 {
        self.time_pos
    }

    pub(super) fn idle_active(&self) -> bool {
        self.idle_active
    }

    pub(super) fn playlist_count(&self) -> usize {
        self.playlist.len() + usize::from(self.current.is_some())
    }

    pub(super) fn set_pause(&mut self, pause: bool) {
        if pause == self.pause {
            return;
        }
        self.pause = pause;
        self.last_step = Instant::now();
        self.log(LogLevel::V, if pause { "pausing" } else { "unpausing" });
        self.broadcast(
            if pause { EventKind::Pause } else { EventKind::Unpause },
            EventData::None,
        );
    }

    pub(super) fn set_volume(&mut self, volume: f64) -> Result<()> {
        if !(0.0..=1000.0).contains(&volume) {
            return Err(Error::Property);
        }
        self.volume = volume;
        Ok(())
    }

    pub(super) fn set_speed(&mut self, speed: f64) -> Result<()> {
        if !(0.01..=100.0).contains(&speed) {
            return Err(Error::Property);
        }
        self.speed = speed;
        Ok(())
    }

    pub(super) fn set_track(&mut self, track: i64) {
        if track != self.track {
            self.track = track;
            self.broadcast(EventKind::TrackSwitched, EventData::None);
        }
    }

    pub(super) fn seek_absolute(&mut self, target: f64) {
        self.time_pos = target.max(0.0);
    }

    // ---------------------------------------------------------------------
    // PLAYBACK TRANSITIONS
    // ---------------------------------------------------------------------

    pub(super) fn start_file(&mut self, path: String) {
        self.end_current();
        self.log(LogLevel::Info, format!("playing: {path}"));
        self.current = Some(path);
        self.time_pos = 0.0;
        self.idle_active = false;
        let now = Instant::now();
        self.last_step = now;
        self.next_tick = now;
        self.broadcast(EventKind::StartFile, EventData::None);
        self.broadcast(EventKind::TracksChanged, EventData::None);
        self.broadcast(EventKind::PlaybackStart, EventData::None);
    }

    fn end_current(&mut self) {
        if self.current.take().is_some() {
            self.broadcast(EventKind::EndFile, EventData::None);
        }
    }

    /// Entered whenever the playlist runs dry: idle mode keeps the engine
    /// alive, otherwise it quits the way a player without `idle` exits when
    /// its last file ends.
    fn after_playback_end(&mut self) {
        if self.idle_mode && !self.quit {
            if !self.idle_active {
                self.idle_active = true;
                self.broadcast(EventKind::Idle, EventData::None);
            }
        } else {
            self.request_quit();
        }
    }

    fn request_quit(&mut self) {
        if self.quit {
            return;
        }
        self.quit = true;
        self.log(LogLevel::Info, "quit requested, notifying clients");
        self.engine.registry.mark_shutdown_all();
    }

    pub(crate) fn run_command(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Loadfile { path, append } => {
                if append && self.current.is_some() {
                    self.playlist.push_back(path);
                } else {
                    self.start_file(path);
                }
                Ok(())
            }
            Command::Stop => {
                self.playlist.clear();
                self.end_current();
                self.after_playback_end();
                Ok(())
            }
            Command::Seek { offset } => {
                if self.current.is_none() {
                    return Err(Error::PropertyUnavailable);
                }
                self.time_pos = (self.time_pos + offset).max(0.0);
                Ok(())
            }
            Command::PlaylistNext => {
                if let Some(next) = self.playlist.pop_front() {
                    self.start_file(next);
                    Ok(())
                } else if self.current.is_some() {
                    self.end_current();
                    self.after_playback_end();
                    Ok(())
                } else {
                    Err(Error::PropertyUnavailable)
                }
            }
            Command::Quit => {
                self.request_quit();
                Ok(())
            }
            Command::ScriptDispatch { target, arg0, kind } => self.engine.registry.send_to(
                &target,
                EventKind::ScriptInputDispatch,
                EventData::ScriptInputDispatch(ScriptInputDispatch { arg0, kind }),
                &self.engine.log,
            ),
            Command::Set { name, value } => {
                props::property_do(self, &name, props::Verb::SetText(&value)).map(|_| ())
            }
        }
    }

    /// One playback step: advance the position clock and emit a Tick when
    /// one is due. Returns how long the engine may sleep.
    fn step(&mut self) -> Duration {
        let now = Instant::now();
        if self.quit || self.pause || self.current.is_none() {
            self.last_step = now;
            return IDLE_WAIT;
        }

        self.time_pos += now.duration_since(self.last_step).as_secs_f64() * self.speed;
        self.last_step = now;

        if now >= self.next_tick {
            self.broadcast(EventKind::Tick, EventData::None);
            self.next_tick = now + TICK_INTERVAL;
        }
        self.next_tick.saturating_duration_since(now)
    }
}

/// Body of the detached playback thread.
///
/// Drains the dispatch queue between playback steps and exits once the last
/// client is gone; destroying a handle pokes the bridge so the reduced
/// count is observed promptly. The engine never blocks on any client.
pub(crate) fn playback_thread(mut core: Playback) {
    let engine = Arc::clone(&core.engine);
    engine.dispatch.set_running(true);
    engine.log.log(LogLevel::V, "core", "playback thread started");

    if core.current.is_none() {
        if core.idle_mode {
            core.idle_active = true;
            core.broadcast(EventKind::Idle, EventData::None);
        } else {
            core.request_quit();
        }
    }

    loop {
        engine.dispatch.safepoint(&mut core);
        while let Some(work) = engine.dispatch.try_pop() {
            work(&mut core);
        }
        if engine.registry.count() == 0 {
            break;
        }
        let wait = core.step();
        engine.dispatch.wait_for_work(wait);
    }

    engine.log.log(LogLevel::V, "core", "last client gone, tearing down");
    engine.dispatch.set_running(false);
}
