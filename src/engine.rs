// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::RwLock;
use tracing::{debug, info, span, warn, Level};

use crate::device::{Device, DeviceError};
use crate::matrix::{Dimensions, PixelBuffer};
use crate::playsync::CancelHandle;
use crate::show::Show;

/// The default tick cadence of the playback loop.
pub const DEFAULT_TICK: Duration = Duration::from_millis(25);

/// The default number of consecutive failed commits tolerated before
/// playback gives up on the device.
pub const DEFAULT_COMMIT_RETRY_LIMIT: u32 = 3;

/// The playback states visible to the control surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Playing,
    Completed,
    Stopped,
}

/// A race-free snapshot of the engine's current status.
#[derive(Clone, Copy, Debug)]
pub struct Status {
    pub state: State,
    pub elapsed: Duration,
}

/// How a playback session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The show ran to its duration.
    Completed,
    /// Playback was cancelled.
    Stopped,
}

/// A fatal playback error.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("display device unavailable after {attempts} failed commits: {source}")]
    DeviceUnavailable {
        attempts: u32,
        #[source]
        source: DeviceError,
    },
}

/// The playback engine. Owns the pixel buffer and the display device for the
/// lifetime of a session and is the only writer of either; the rest of the
/// process observes playback through status snapshots and the cancel handle.
pub struct Engine {
    device: Arc<dyn Device>,
    dimensions: Dimensions,
    tick: Duration,
    commit_retry_limit: u32,
    status: RwLock<Status>,
}

impl Engine {
    /// Creates a new playback engine.
    pub fn new(
        device: Arc<dyn Device>,
        dimensions: Dimensions,
        tick: Duration,
        commit_retry_limit: u32,
    ) -> Engine {
        Engine {
            device,
            dimensions,
            tick,
            commit_retry_limit,
            status: RwLock::new(Status {
                state: State::Idle,
                elapsed: Duration::ZERO,
            }),
        }
    }

    /// Gets a snapshot of the current playback status.
    pub fn status(&self) -> Status {
        *self.status.read()
    }

    fn set_status(&self, state: State, elapsed: Duration) {
        *self.status.write() = Status { state, elapsed };
    }

    /// Plays the show to completion, blocking the calling thread. The show's
    /// effects are applied to a fresh pixel buffer in timestamp order and
    /// committed to the display once per tick; cancellation is honored at
    /// tick boundaries.
    pub fn play(
        &self,
        show: Arc<Show>,
        cancel_handle: CancelHandle,
    ) -> Result<Outcome, PlaybackError> {
        let span = span!(Level::INFO, "play show");
        let _enter = span.enter();

        info!(
            show = show.name(),
            duration = show.duration().as_secs_f64(),
            looped = show.looped(),
            device = self.device.to_string(),
            "Playing show."
        );

        let mut session = Session::new(show.clone(), self.dimensions.pixel_count());
        let mut failures = 0u32;
        self.set_status(State::Playing, Duration::ZERO);

        // A looping show with no duration would wrap forever without ever
        // advancing; treat it like any other zero-length show, whose initial
        // frame is also its final one.
        let zero_length = show.duration_ms() == 0;

        // Paint the initial frame before the clock starts so there's no
        // blank flash at t=0 while the first tick is being scheduled.
        if let Err(e) = self.commit(&session, &mut failures, zero_length) {
            self.set_status(State::Stopped, Duration::ZERO);
            return Err(e);
        }

        if zero_length {
            self.set_status(State::Completed, Duration::ZERO);
            info!(show = show.name(), "Show completed.");
            return Ok(Outcome::Completed);
        }

        let mut session_start = Instant::now();
        let mut next_tick = session_start + self.tick;

        loop {
            if cancel_handle.is_cancelled() {
                let elapsed = session_start.elapsed();
                self.set_status(State::Stopped, elapsed);
                info!(show = show.name(), "Playback stopped.");
                return Ok(Outcome::Stopped);
            }

            let elapsed_ms = session_start.elapsed().as_millis() as u64;
            let progress = session.advance(elapsed_ms);

            let (finished, local_elapsed_ms) = match progress {
                Progress::Running { wraps } => {
                    if wraps > 0 {
                        // Advance the session start by whole durations rather
                        // than resampling the clock, so processing jitter
                        // never accumulates into drift across loop seams.
                        session_start += show.duration() * wraps;
                        debug!(show = show.name(), wraps, "Loop seam.");
                    }
                    (false, elapsed_ms - u64::from(wraps) * show.duration_ms())
                }
                Progress::Finished => (true, show.duration_ms()),
            };

            self.set_status(State::Playing, Duration::from_millis(local_elapsed_ms));

            // Check again so a cancel arriving during effect application
            // skips the commit.
            if cancel_handle.is_cancelled() {
                continue;
            }

            self.commit(&session, &mut failures, finished).inspect_err(|_| {
                self.set_status(State::Stopped, Duration::from_millis(local_elapsed_ms));
            })?;

            if finished {
                self.set_status(State::Completed, show.duration());
                info!(
                    show = show.name(),
                    frames_applied = session.applied(),
                    "Show completed."
                );
                return Ok(Outcome::Completed);
            }

            // Sleep until the next tick boundary. If this tick overran the
            // cadence the sleep clamps to zero and we tick again immediately
            // until the schedule catches up.
            next_tick += self.tick;
            spin_sleep::sleep(next_tick.saturating_duration_since(Instant::now()));
        }
    }

    /// Commits the session's buffer to the device. Failures are transient up
    /// to the retry ceiling: the buffer is left untouched and the next tick
    /// recommits the full state, so no pixel data is ever lost to a flaky
    /// device link. The last frame of a show has no next tick, so its commit
    /// retries in place until the device accepts it or the ceiling is
    /// exhausted.
    fn commit(
        &self,
        session: &Session,
        failures: &mut u32,
        last: bool,
    ) -> Result<(), PlaybackError> {
        loop {
            match self.device.commit(session.buffer().as_slice()) {
                Ok(()) => {
                    *failures = 0;
                    return Ok(());
                }
                Err(source) => {
                    *failures += 1;
                    if *failures > self.commit_retry_limit {
                        return Err(PlaybackError::DeviceUnavailable {
                            attempts: *failures,
                            source,
                        });
                    }
                    warn!(
                        err = source.to_string(),
                        attempt = *failures,
                        "Display commit failed, retrying."
                    );
                    if !last {
                        return Ok(());
                    }
                    spin_sleep::sleep(self.tick);
                }
            }
        }
    }
}

/// The outcome of advancing a session to a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Progress {
    /// Still playing. `wraps` is the number of loop seams crossed while
    /// advancing; the caller shifts its clock by one duration per wrap.
    Running { wraps: u32 },
    /// A non-looping show reached its duration.
    Finished,
}

/// The deterministic core of a playback session: a cursor over the show's
/// frames plus the engine-owned pixel buffer. Separated from the wall-clock
/// tick loop so the timestamp semantics can be driven with virtual time.
pub(crate) struct Session {
    show: Arc<Show>,
    buffer: PixelBuffer,
    /// The next timestamp not yet applied. Effects in `[cursor, elapsed]`
    /// are due on each advance.
    cursor_ms: u64,
    applied: u64,
}

impl Session {
    /// Creates a fresh session: an all-black buffer with the initial effect,
    /// if any, already painted.
    pub(crate) fn new(show: Arc<Show>, pixel_count: usize) -> Session {
        let mut session = Session {
            show,
            buffer: PixelBuffer::new(pixel_count),
            cursor_ms: 0,
            applied: 0,
        };
        if let Some(effect) = session.show.initial_effect() {
            session.buffer.apply(effect);
        }
        session
    }

    /// The current pixel buffer state.
    pub(crate) fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// The total number of effects applied so far.
    pub(crate) fn applied(&self) -> u64 {
        self.applied
    }

    /// Advances the session to the given elapsed time, applying every effect
    /// due since the last advance in stable timestamp order. Loop seams are
    /// handled here: effects due through `durationMs` (inclusive) fire at
    /// the end of the old cycle, then the buffer resets, the initial effect
    /// repaints, and the remainder of the elapsed time lands in the new
    /// cycle's window.
    pub(crate) fn advance(&mut self, elapsed_ms: u64) -> Progress {
        let duration_ms = self.show.duration_ms();

        if !self.show.looped() {
            if elapsed_ms >= duration_ms {
                self.apply_range(self.cursor_ms, duration_ms + 1);
                return Progress::Finished;
            }
            self.apply_range(self.cursor_ms, elapsed_ms + 1);
            return Progress::Running { wraps: 0 };
        }

        let mut wraps = 0u32;
        let mut remaining_ms = elapsed_ms;
        while remaining_ms >= duration_ms {
            self.apply_range(self.cursor_ms, duration_ms + 1);
            self.buffer.reset();
            if let Some(effect) = self.show.initial_effect() {
                self.buffer.apply(effect);
            }
            self.cursor_ms = 0;
            remaining_ms -= duration_ms;
            wraps += 1;
        }
        self.apply_range(self.cursor_ms, remaining_ms + 1);
        Progress::Running { wraps }
    }

    /// Applies all effects in `[from_ms, to_ms)` and moves the cursor.
    fn apply_range(&mut self, from_ms: u64, to_ms: u64) {
        for effect in self.show.effects_in_range(from_ms, to_ms) {
            self.buffer.apply(effect);
            self.applied += 1;
        }
        self.cursor_ms = to_ms;
    }
}
