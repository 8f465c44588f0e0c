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
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::error::ShowError;
use crate::matrix::Dimensions;
use crate::show::{Effect, EffectKind};

/// A JSON representation of a show file, as emitted by the authoring tools.
#[derive(Deserialize)]
pub(crate) struct Show {
    /// The display label of the show.
    name: String,
    /// An optional description of the show.
    description: Option<String>,
    /// The total runtime in milliseconds.
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    /// Whether playback restarts at 0 when the duration is reached.
    #[serde(rename = "loop", default)]
    looped: bool,
    /// The timestamped effects. Authoring tools are not required to emit
    /// these sorted.
    frames: Vec<Frame>,
}

/// A JSON representation of a single effect.
#[derive(Deserialize)]
pub(crate) struct Frame {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    effect: Kind,
    /// Required for fill and set.
    color: Option<String>,
    /// Required for set and clear.
    leds: Option<Vec<usize>>,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Kind {
    Fill,
    Set,
    Clear,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Fill => "fill",
            Kind::Set => "set",
            Kind::Clear => "clear",
        }
    }
}

impl Show {
    /// Deserializes a file from the path into a show configuration struct.
    pub(crate) fn deserialize(path: &Path) -> Result<Show, ShowError> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Converts the configuration into a validated show for the given matrix
    /// dimensions. All structural and range validation happens here, at load
    /// time; a show that converts successfully cannot fail mid-playback.
    pub(crate) fn to_show(self, dimensions: Dimensions) -> Result<crate::show::Show, ShowError> {
        let pixel_count = dimensions.pixel_count();
        let frames = self
            .frames
            .into_iter()
            .map(|frame| frame.to_effect(pixel_count))
            .collect::<Result<Vec<Effect>, ShowError>>()?;

        Ok(crate::show::Show::new(
            self.name,
            self.description,
            self.duration_ms,
            self.looped,
            frames,
        ))
    }
}

impl Frame {
    /// Converts the frame into a validated effect.
    fn to_effect(self, pixel_count: usize) -> Result<Effect, ShowError> {
        let timestamp_ms = self.timestamp_ms;
        let kind = match self.effect {
            Kind::Fill => EffectKind::Fill {
                color: self.required_color()?,
            },
            Kind::Set => EffectKind::Set {
                color: self.required_color()?,
                leds: self.required_leds(pixel_count)?,
            },
            Kind::Clear => EffectKind::Clear {
                leds: self.required_leds(pixel_count)?,
            },
        };
        Ok(Effect::new(timestamp_ms, kind))
    }

    fn required_color(&self) -> Result<crate::matrix::Rgb, ShowError> {
        let color = self.color.as_ref().ok_or_else(|| {
            ShowError::Malformed(format!(
                "{} effect at {}ms is missing a color",
                self.effect.name(),
                self.timestamp_ms
            ))
        })?;
        color.parse().map_err(|e: crate::matrix::ParseColorError| {
            ShowError::Malformed(format!(
                "{} effect at {}ms: {}",
                self.effect.name(),
                self.timestamp_ms,
                e
            ))
        })
    }

    fn required_leds(&self, pixel_count: usize) -> Result<Vec<usize>, ShowError> {
        let leds = self.leds.clone().ok_or_else(|| {
            ShowError::Malformed(format!(
                "{} effect at {}ms is missing its led list",
                self.effect.name(),
                self.timestamp_ms
            ))
        })?;
        for &index in &leds {
            if index >= pixel_count {
                return Err(ShowError::OutOfRangeIndex {
                    timestamp_ms: self.timestamp_ms,
                    index,
                    pixel_count,
                });
            }
        }
        Ok(leds)
    }
}
