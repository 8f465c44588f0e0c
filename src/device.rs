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
use std::{error::Error, fmt, sync::Arc};

use crate::config;
use crate::matrix::Rgb;

pub mod bridge;
pub mod mock;

/// An error reported by a display device. Commit errors are treated as
/// transient by the playback engine and retried up to its ceiling.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to encode device command: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("timed out waiting for device acknowledgement")]
    Timeout,
    #[error("driver reported an error: {0}")]
    Driver(String),
    #[error("driver process is gone")]
    Disconnected,
}

/// A display device accepts full pixel buffer snapshots and pushes them to
/// the physical LEDs. Implementations must bound the time a commit can take
/// so a stalled device cannot stall the playback tick loop.
pub trait Device: fmt::Display + Send + Sync {
    /// Commits a full snapshot of the pixel buffer to the hardware.
    fn commit(&self, pixels: &[Rgb]) -> Result<(), DeviceError>;

    /// Blanks the display. Used on startup and shutdown.
    fn clear(&self) -> Result<(), DeviceError>;
}

/// Gets the display device described by the configuration.
pub fn get_device(config: &config::Device) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let driver = config.driver();
    if driver.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(driver)));
    }

    match driver {
        "bridge" => Ok(Arc::new(bridge::Device::spawn(config)?)),
        other => Err(format!("unrecognized display driver: {}", other).into()),
    }
}
