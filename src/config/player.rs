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
use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::engine::{DEFAULT_COMMIT_RETRY_LIMIT, DEFAULT_TICK};
use crate::matrix::Dimensions;

/// How long the bridge waits for a single command acknowledgement.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(250);

/// How long the bridge waits for the driver helper to announce itself.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// A YAML representation of the player configuration.
#[derive(Deserialize, Default)]
pub struct Player {
    /// The logical dimensions of the matrix.
    matrix: Option<Matrix>,
    /// The playback tick cadence, e.g. "25ms".
    tick: Option<String>,
    /// How many consecutive failed display commits to tolerate.
    commit_retry_limit: Option<u32>,
    /// The display device configuration.
    device: Option<Device>,
}

/// A YAML representation of the matrix dimensions.
#[derive(Deserialize, Clone)]
pub(crate) struct Matrix {
    width: u16,
    height: u16,
}

/// A YAML representation of the display device configuration.
#[derive(Deserialize, Clone)]
pub struct Device {
    /// The driver to use: `mock` or `bridge`.
    driver: String,
    /// The helper command the bridge driver spawns, e.g.
    /// ["python3", "led_driver.py"].
    command: Option<Vec<String>>,
    /// How long to wait for a command acknowledgement, e.g. "250ms".
    ack_timeout: Option<String>,
    /// How long to wait for the helper to initialize, e.g. "10s".
    startup_timeout: Option<String>,
}

impl Player {
    /// Deserializes a file from the path into a player configuration struct.
    pub fn deserialize(path: &Path) -> Result<Player, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Player>()?)
    }

    /// Gets the matrix dimensions.
    pub fn dimensions(&self) -> Dimensions {
        self.matrix
            .as_ref()
            .map_or_else(Dimensions::default, |matrix| {
                Dimensions::new(matrix.width, matrix.height)
            })
    }

    /// Gets the tick cadence.
    pub fn tick(&self) -> Result<Duration, duration_string::Error> {
        self.tick.as_ref().map_or(Ok(DEFAULT_TICK), |duration| {
            Ok(DurationString::from_string(duration.clone())?.into())
        })
    }

    /// Gets the commit retry ceiling.
    pub fn commit_retry_limit(&self) -> u32 {
        self.commit_retry_limit.unwrap_or(DEFAULT_COMMIT_RETRY_LIMIT)
    }

    /// Gets the device configuration.
    pub fn device(&self) -> Device {
        self.device
            .clone()
            .unwrap_or_else(|| Device::new("mock".to_string(), None, None, None))
    }
}

impl Device {
    /// Creates a new device configuration.
    pub fn new(
        driver: String,
        command: Option<Vec<String>>,
        ack_timeout: Option<String>,
        startup_timeout: Option<String>,
    ) -> Device {
        Device {
            driver,
            command,
            ack_timeout,
            startup_timeout,
        }
    }

    /// Gets the driver name.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Gets the helper command for the bridge driver.
    pub fn command(&self) -> Vec<String> {
        self.command.clone().unwrap_or_default()
    }

    /// Gets the acknowledgement timeout.
    pub fn ack_timeout(&self) -> Result<Duration, duration_string::Error> {
        self.ack_timeout
            .as_ref()
            .map_or(Ok(DEFAULT_ACK_TIMEOUT), |duration| {
                Ok(DurationString::from_string(duration.clone())?.into())
            })
    }

    /// Gets the driver helper startup timeout.
    pub fn startup_timeout(&self) -> Result<Duration, duration_string::Error> {
        self.startup_timeout
            .as_ref()
            .map_or(Ok(DEFAULT_STARTUP_TIMEOUT), |duration| {
                Ok(DurationString::from_string(duration.clone())?.into())
            })
    }
}
