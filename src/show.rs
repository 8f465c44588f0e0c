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
use std::fmt;
use std::time::Duration;

use crate::matrix::Rgb;

/// One scheduled mutation of the pixel buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    /// Offset from show start, in milliseconds.
    timestamp_ms: u64,
    /// What the effect does to the buffer.
    kind: EffectKind,
}

/// The kinds of mutations an effect can apply.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectKind {
    /// Sets every pixel to one color.
    Fill { color: Rgb },
    /// Sets the listed pixels to one color, leaving the rest untouched.
    Set { color: Rgb, leds: Vec<usize> },
    /// Sets the listed pixels to black, leaving the rest untouched.
    Clear { leds: Vec<usize> },
}

impl Effect {
    /// Creates a new effect.
    pub fn new(timestamp_ms: u64, kind: EffectKind) -> Effect {
        Effect { timestamp_ms, kind }
    }

    /// The offset from show start at which this effect is due.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// The mutation this effect applies.
    pub fn kind(&self) -> &EffectKind {
        &self.kind
    }
}

/// A complete, pre-rendered lighting sequence. Immutable once loaded; all
/// mutable state during playback lives in the engine's pixel buffer.
pub struct Show {
    name: String,
    description: Option<String>,
    duration_ms: u64,
    looped: bool,
    frames: Vec<Effect>,
}

impl Show {
    /// Creates a new show. Frames are stably sorted by timestamp here, so
    /// authoring tools are free to emit effects in any order; effects sharing
    /// a timestamp keep their declared order and the later one wins for any
    /// pixel both touch.
    pub fn new(
        name: String,
        description: Option<String>,
        duration_ms: u64,
        looped: bool,
        mut frames: Vec<Effect>,
    ) -> Show {
        frames.sort_by_key(Effect::timestamp_ms);
        Show {
            name,
            description,
            duration_ms,
            looped,
            frames,
        }
    }

    /// The display label of the show.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// An optional human readable description of the show.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The total runtime of the show in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// The total runtime of the show.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Whether playback restarts at offset 0 once the duration is reached.
    pub fn looped(&self) -> bool {
        self.looped
    }

    /// All effects in the show, in timestamp order.
    pub fn frames(&self) -> &[Effect] {
        &self.frames
    }

    /// All effects with `from_ms <= timestamp < to_ms`, in ascending
    /// timestamp order with stable ties. Cheap to restart from any offset,
    /// which is what the engine does when a looping show wraps.
    pub fn effects_in_range(&self, from_ms: u64, to_ms: u64) -> &[Effect] {
        let start = self.frames.partition_point(|e| e.timestamp_ms < from_ms);
        let end = self.frames.partition_point(|e| e.timestamp_ms < to_ms);
        &self.frames[start..end]
    }

    /// The first effect at timestamp 0, if present. Applied before the clock
    /// starts advancing so the first committed frame isn't blank.
    pub fn initial_effect(&self) -> Option<&Effect> {
        self.frames.first().filter(|e| e.timestamp_ms == 0)
    }
}

impl fmt::Display for Show {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.1}s, {} frames{})",
            self.name,
            self.duration().as_secs_f64(),
            self.frames.len(),
            if self.looped { ", looped" } else { "" },
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fill(timestamp_ms: u64, color: Rgb) -> Effect {
        Effect::new(timestamp_ms, EffectKind::Fill { color })
    }

    fn set(timestamp_ms: u64, color: Rgb, leds: Vec<usize>) -> Effect {
        Effect::new(timestamp_ms, EffectKind::Set { color, leds })
    }

    #[test]
    fn test_frames_sorted_on_load() {
        let show = Show::new(
            "unsorted".to_string(),
            None,
            1000,
            false,
            vec![
                fill(500, Rgb::BLACK),
                fill(0, Rgb::BLACK),
                fill(250, Rgb::new(255, 0, 0)),
            ],
        );

        let timestamps: Vec<u64> = show.frames().iter().map(Effect::timestamp_ms).collect();
        assert_eq!(timestamps, vec![0, 250, 500]);
    }

    #[test]
    fn test_stable_order_for_equal_timestamps() {
        let first = set(100, Rgb::new(255, 0, 0), vec![0]);
        let second = set(100, Rgb::new(0, 255, 0), vec![0]);
        let show = Show::new(
            "ties".to_string(),
            None,
            1000,
            false,
            vec![fill(200, Rgb::BLACK), first.clone(), second.clone()],
        );

        // The two effects at t=100 keep their declared order.
        assert_eq!(show.frames()[0], first);
        assert_eq!(show.frames()[1], second);
    }

    #[test]
    fn test_effects_in_range_is_half_open() {
        let show = Show::new(
            "range".to_string(),
            None,
            300,
            false,
            vec![
                fill(0, Rgb::BLACK),
                fill(100, Rgb::new(1, 1, 1)),
                fill(200, Rgb::new(2, 2, 2)),
                fill(300, Rgb::new(3, 3, 3)),
            ],
        );

        let in_range = show.effects_in_range(100, 300);
        assert_eq!(in_range.len(), 2);
        assert_eq!(in_range[0].timestamp_ms(), 100);
        assert_eq!(in_range[1].timestamp_ms(), 200);

        // The full window returned in order, regardless of the source order.
        assert_eq!(show.effects_in_range(0, 301).len(), 4);
        assert!(show.effects_in_range(301, 1000).is_empty());
    }

    #[test]
    fn test_initial_effect() {
        let show = Show::new(
            "initial".to_string(),
            None,
            1000,
            false,
            vec![fill(100, Rgb::BLACK), fill(0, Rgb::new(9, 9, 9))],
        );
        assert_eq!(
            show.initial_effect().map(Effect::timestamp_ms),
            Some(0),
            "effect at t=0 should be reported as the initial effect"
        );

        let no_initial = Show::new(
            "no-initial".to_string(),
            None,
            1000,
            false,
            vec![fill(100, Rgb::BLACK)],
        );
        assert!(no_initial.initial_effect().is_none());
    }
}
