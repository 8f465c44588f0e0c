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

/// Typed error for player config load/parse failures so callers can
/// distinguish e.g. file-not-found from parse errors without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),
}

/// An error loading a show file. Load-time rejection is the only failure
/// mode for bad show data; nothing malformed ever reaches playback.
#[derive(Debug, thiserror::Error)]
pub enum ShowError {
    /// The show file could not be read.
    #[error("unable to read show file: {0}")]
    Io(#[from] std::io::Error),
    /// The show document is structurally invalid or mistyped.
    #[error("malformed show: {0}")]
    Malformed(String),
    /// An effect references a pixel beyond the configured matrix size.
    #[error(
        "effect at {timestamp_ms}ms references led {index}, but the matrix only has {pixel_count} pixels"
    )]
    OutOfRangeIndex {
        timestamp_ms: u64,
        index: usize,
        pixel_count: usize,
    },
}

impl From<serde_json::Error> for ShowError {
    fn from(e: serde_json::Error) -> ShowError {
        ShowError::Malformed(e.to_string())
    }
}
