//! Playback clock
//!
//! A background thread turns wall-clock time into frame numbers and hands
//! each one to every subscriber (playhead, time label, ...) once per frame.
//!
//! State machine:
//! ```text
//! Stopped --start--> Running --pause--> Paused --resume--> Running
//!    ^                  |                  |
//!    +-------stop-------+-------stop-------+
//! ```
//! `reset` and `set_clock_time` work from any state. Calls that have no
//! transition from the current state do nothing.
//!
//! All state lives behind one mutex paired with a condvar. The thread blocks
//! on the condvar while not running and waits one tick interval between
//! emissions.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, warn};

use crate::engine::time::{FrameNumber, FrameRate};
use crate::error::{BeatstackError, Result};

/// Clock states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl fmt::Display for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockState::Stopped => write!(f, "Stopped"),
            ClockState::Running => write!(f, "Running"),
            ClockState::Paused => write!(f, "Paused"),
        }
    }
}

/// Callback receiving each emitted frame number
///
/// Subscribers run on the clock thread (or on the caller's thread for a
/// seek) and must not call back into the same clock's `set_clock_time`.
pub type FrameSubscriber = Box<dyn Fn(FrameNumber) + Send>;

#[derive(Debug, Default)]
struct ClockInner {
    state: ClockState,
    /// Seconds accumulated by finished running segments (and seeks)
    elapsed: f64,
    /// Start of the current running segment
    start_time: Option<Instant>,
    terminate: bool,
}

impl ClockInner {
    fn adjusted_time(&self) -> f64 {
        match (self.state, self.start_time) {
            (ClockState::Running, Some(start)) => self.elapsed + start.elapsed().as_secs_f64(),
            _ => self.elapsed,
        }
    }

    /// Fold the current running segment into `elapsed`
    fn fold(&mut self) {
        self.elapsed = self.adjusted_time();
        self.start_time = None;
    }
}

struct Shared {
    inner: Mutex<ClockInner>,
    wake: Condvar,
    subscribers: Mutex<Vec<FrameSubscriber>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ClockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<FrameSubscriber>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wall-clock driven frame source
pub struct PlaybackClock {
    frame_rate: FrameRate,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl fmt::Debug for PlaybackClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackClock")
            .field("frame_rate", &self.frame_rate)
            .field("state", &self.state())
            .field("thread_alive", &self.thread.is_some())
            .finish()
    }
}

impl PlaybackClock {
    pub fn new(frame_rate: FrameRate) -> Self {
        PlaybackClock {
            frame_rate,
            shared: Arc::new(Shared {
                inner: Mutex::new(ClockInner::default()),
                wake: Condvar::new(),
                subscribers: Mutex::new(Vec::new()),
            }),
            thread: None,
        }
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Register a callback for every emitted frame
    pub fn subscribe(&self, subscriber: impl Fn(FrameNumber) + Send + 'static) {
        self.shared.lock_subscribers().push(Box::new(subscriber));
    }

    pub fn state(&self) -> ClockState {
        self.shared.lock().state
    }

    /// Playback position in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.shared.lock().adjusted_time()
    }

    /// Frame at the current playback position
    pub fn current_frame(&self) -> FrameNumber {
        self.frame_rate.frame_at(self.elapsed_secs())
    }

    /// Start ticking from the current position (Stopped only)
    ///
    /// Spawns the clock thread if none is alive.
    pub fn start(&mut self) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            if inner.state != ClockState::Stopped {
                return Ok(());
            }
            inner.state = ClockState::Running;
            inner.start_time = Some(Instant::now());
            inner.terminate = false;
            self.shared.wake.notify_all();
        }

        if self.thread.is_none() {
            let shared = Arc::clone(&self.shared);
            let frame_rate = self.frame_rate;
            let handle = thread::Builder::new()
                .name("playback-clock".to_string())
                .spawn(move || run(shared, frame_rate))
                .map_err(|e| {
                    let mut inner = self.shared.lock();
                    inner.state = ClockState::Stopped;
                    inner.start_time = None;
                    BeatstackError::ClockStart {
                        reason: e.to_string(),
                    }
                })?;
            self.thread = Some(handle);
        }

        debug!("Clock started at {:.3}s", self.elapsed_secs());
        Ok(())
    }

    /// Freeze the position (Running only)
    pub fn pause(&self) {
        let mut inner = self.shared.lock();
        if inner.state == ClockState::Running {
            inner.fold();
            inner.state = ClockState::Paused;
            debug!("Clock paused at {:.3}s", inner.elapsed);
        }
    }

    /// Continue from the frozen position (Paused only)
    pub fn resume(&self) {
        let mut inner = self.shared.lock();
        if inner.state == ClockState::Paused {
            inner.start_time = Some(Instant::now());
            inner.state = ClockState::Running;
            self.shared.wake.notify_all();
            debug!("Clock resumed at {:.3}s", inner.elapsed);
        }
    }

    /// Return to frame 0; a running clock keeps running from there
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        inner.elapsed = 0.0;
        inner.start_time = match inner.state {
            ClockState::Running => Some(Instant::now()),
            _ => None,
        };
        self.shared.wake.notify_all();
        debug!("Clock reset ({})", inner.state);
    }

    /// Seek to `frame` and emit it immediately
    pub fn set_clock_time(&self, frame: FrameNumber) {
        {
            let mut inner = self.shared.lock();
            inner.elapsed = self.frame_rate.seconds_at(frame);
            if inner.state == ClockState::Running {
                inner.start_time = Some(Instant::now());
            }
            debug!("Clock seek to frame {} ({})", frame, inner.state);
        }

        for subscriber in self.shared.lock_subscribers().iter() {
            subscriber(frame);
        }
    }

    /// Stop ticking and terminate the clock thread
    ///
    /// The position is kept; `start` continues from it on a fresh thread.
    pub fn stop(&mut self) {
        {
            let mut inner = self.shared.lock();
            inner.fold();
            inner.state = ClockState::Stopped;
            inner.terminate = true;
            self.shared.wake.notify_all();
        }

        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("Clock thread panicked");
            }
            debug!("Clock thread joined");
        }
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Clock thread body
fn run(shared: Arc<Shared>, frame_rate: FrameRate) {
    let tick = frame_rate.tick_interval();

    loop {
        // Block until running or told to exit
        {
            let mut inner = shared.lock();
            while !inner.terminate && inner.state != ClockState::Running {
                inner = shared
                    .wake
                    .wait(inner)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if inner.terminate {
                break;
            }
        }

        // The subscriber lock is held from computing the frame until it has
        // been delivered, so a seek emitted meanwhile is never overtaken.
        {
            let subscribers = shared.lock_subscribers();
            let frame = {
                let inner = shared.lock();
                if inner.terminate {
                    break;
                }
                (inner.state == ClockState::Running)
                    .then(|| frame_rate.frame_at(inner.adjusted_time()))
            };
            if let Some(frame) = frame {
                for subscriber in subscribers.iter() {
                    subscriber(frame);
                }
            }
        }

        let inner = shared.lock();
        if inner.terminate {
            break;
        }
        let _ = shared
            .wake
            .wait_timeout(inner, tick)
            .unwrap_or_else(PoisonError::into_inner);
    }
}
