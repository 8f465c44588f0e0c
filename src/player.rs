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
use std::{error::Error, sync::Arc};

use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{info, span, Level, Span};

use crate::engine::{Engine, Outcome, PlaybackError, Status};
use crate::playsync::CancelHandle;
use crate::show::Show;

struct PlayHandles {
    join: JoinHandle<Result<Outcome, PlaybackError>>,
    cancel: CancelHandle,
}

/// The control surface over the playback engine. The blocking tick loop runs
/// on a dedicated blocking task; this side only posts cancellation and reads
/// status snapshots, so it stays responsive while a show is playing.
pub struct Player {
    engine: Arc<Engine>,
    /// Keeps track of the active playback. There is at most one at a time.
    join: Mutex<Option<PlayHandles>>,
    /// The logging span.
    span: Span,
}

impl Player {
    /// Creates a new player around the given engine.
    pub fn new(engine: Arc<Engine>) -> Player {
        Player {
            engine,
            join: Mutex::new(None),
            span: span!(Level::INFO, "player"),
        }
    }

    /// Gets a snapshot of the current playback status.
    pub fn status(&self) -> Status {
        self.engine.status()
    }

    /// Starts playing the given show. Returns immediately; use `wait` to
    /// block until playback ends.
    pub async fn play(&self, show: Arc<Show>) -> Result<(), Box<dyn Error>> {
        let _enter = self.span.enter();

        let mut join = self.join.lock().await;
        if join.is_some() {
            info!("Player is already playing a show.");
            return Ok(());
        }

        let cancel_handle = CancelHandle::new();
        let join_handle = {
            let engine = self.engine.clone();
            let cancel_handle = cancel_handle.clone();
            tokio::task::spawn_blocking(move || engine.play(show, cancel_handle))
        };

        *join = Some(PlayHandles {
            join: join_handle,
            cancel: cancel_handle,
        });
        Ok(())
    }

    /// Stops the active playback, if any. Safe to call at any time.
    pub async fn stop(&self) {
        let _enter = self.span.enter();

        let join = self.join.lock().await;
        match join.as_ref() {
            Some(handles) => {
                info!("Stopping playback.");
                handles.cancel.cancel();
            }
            None => info!("Player is not active, nothing to stop."),
        }
    }

    /// Waits for the active playback to end and returns its outcome, or
    /// `None` if nothing was playing.
    pub async fn wait(&self) -> Result<Option<Outcome>, Box<dyn Error>> {
        let handles = self.join.lock().await.take();
        match handles {
            Some(handles) => Ok(Some(handles.join.await??)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::device::mock;
    use crate::engine::State;
    use crate::matrix::{Dimensions, Rgb};
    use crate::show::{Effect, EffectKind};

    fn new_player(device: Arc<mock::Device>) -> Player {
        Player::new(Arc::new(Engine::new(
            device,
            Dimensions::new(4, 2),
            Duration::from_millis(5),
            3,
        )))
    }

    fn short_show(duration_ms: u64, looped: bool) -> Arc<Show> {
        Arc::new(Show::new(
            "show".to_string(),
            None,
            duration_ms,
            looped,
            vec![Effect::new(
                0,
                EffectKind::Fill {
                    color: Rgb::new(5, 5, 5),
                },
            )],
        ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_player_plays_to_completion() {
        let device = Arc::new(mock::Device::get("mock-device"));
        let player = new_player(device.clone());

        player.play(short_show(40, false)).await.unwrap();
        let outcome = player.wait().await.unwrap();
        assert_eq!(outcome, Some(Outcome::Completed));
        assert_eq!(player.status().state, State::Completed);
        assert_eq!(device.last_committed()[0], Rgb::new(5, 5, 5));

        // Nothing left to wait on.
        assert_eq!(player.wait().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_player_stop() {
        let device = Arc::new(mock::Device::get("mock-device"));
        let player = new_player(device);

        player.play(short_show(10_000, true)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(player.status().state, State::Playing);

        player.stop().await;
        let outcome = player.wait().await.unwrap();
        assert_eq!(outcome, Some(Outcome::Stopped));
        assert_eq!(player.status().state, State::Stopped);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_play_is_ignored_while_active() {
        let device = Arc::new(mock::Device::get("mock-device"));
        let player = new_player(device);

        player.play(short_show(10_000, true)).await.unwrap();
        player.play(short_show(10, false)).await.unwrap();

        player.stop().await;
        assert_eq!(player.wait().await.unwrap(), Some(Outcome::Stopped));
    }
}
