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
    error::Error,
    fmt,
    io::{BufRead, BufReader, Write},
    process::{Child, ChildStdin, ChildStdout, Stdio},
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::DeviceError;
use crate::command::{Command, PixelUpdate, Response};
use crate::config;
use crate::matrix::Rgb;

/// A display device backed by a driver helper process (typically the
/// neopixel bridge on the Pi) speaking line-delimited JSON commands on its
/// stdin and acknowledgements on its stdout. Every command waits for its ack
/// with a bounded timeout, so a wedged helper shows up as a transient commit
/// failure instead of stalling the tick loop.
pub struct Device {
    name: String,
    stdin: Mutex<ChildStdin>,
    acks: Receiver<Response>,
    ack_timeout: Duration,
    child: Mutex<Child>,
}

impl Device {
    /// Spawns the configured driver helper and performs the startup
    /// handshake (the helper announces itself with an `initialized` line).
    pub fn spawn(config: &config::Device) -> Result<Device, Box<dyn Error>> {
        let command = config.command();
        let (program, args) = match command.split_first() {
            Some(split) => split,
            None => return Err("the bridge driver requires a command to spawn".into()),
        };

        let mut child = std::process::Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or("unable to open driver helper stdin")?;
        let stdout = child
            .stdout
            .take()
            .ok_or("unable to open driver helper stdout")?;

        let (sender, acks) = crossbeam_channel::unbounded();
        thread::spawn(move || Device::read_acks(stdout, sender));

        match acks.recv_timeout(config.startup_timeout()?) {
            Ok(response) if response.is_ok() => {
                info!(leds = response.leds, "Driver helper initialized.");
            }
            Ok(response) => {
                return Err(format!(
                    "driver helper failed to initialize: {}",
                    response.message.unwrap_or_default()
                )
                .into());
            }
            Err(_) => return Err("driver helper never initialized".into()),
        }

        Ok(Device {
            name: program.to_string(),
            stdin: Mutex::new(stdin),
            acks,
            ack_timeout: config.ack_timeout()?,
            child: Mutex::new(child),
        })
    }

    /// Reads acknowledgement lines from the helper until it exits.
    fn read_acks(stdout: ChildStdout, sender: Sender<Response>) {
        for line in BufReader::new(stdout).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!(err = e.to_string(), "Error reading from driver helper");
                    return;
                }
            };
            match serde_json::from_str::<Response>(&line) {
                Ok(response) => {
                    if sender.send(response).is_err() {
                        return;
                    }
                }
                Err(e) => debug!(
                    err = e.to_string(),
                    line, "Ignoring unparseable driver output"
                ),
            }
        }
    }

    /// Sends one command and waits for its acknowledgement.
    fn send(&self, command: &Command) -> Result<(), DeviceError> {
        let mut stdin = self.stdin.lock();

        // A previous timeout can leave a stale ack behind; drop any such
        // acks so this command pairs with its own response.
        while self.acks.try_recv().is_ok() {}

        writeln!(stdin, "{}", serde_json::to_string(command)?)?;
        stdin.flush()?;

        match self.acks.recv_timeout(self.ack_timeout) {
            Ok(response) if response.is_ok() => Ok(()),
            Ok(response) => Err(DeviceError::Driver(
                response.message.unwrap_or_else(|| response.status.clone()),
            )),
            Err(RecvTimeoutError::Timeout) => Err(DeviceError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(DeviceError::Disconnected),
        }
    }
}

impl super::Device for Device {
    fn commit(&self, pixels: &[Rgb]) -> Result<(), DeviceError> {
        let updates: Vec<PixelUpdate> = pixels
            .iter()
            .enumerate()
            .map(|(index, color)| PixelUpdate {
                index,
                r: color.r,
                g: color.g,
                b: color.b,
            })
            .collect();

        self.send(&Command::SetPixels { pixels: updates })?;
        self.send(&Command::Show)
    }

    fn clear(&self) -> Result<(), DeviceError> {
        self.send(&Command::Clear)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (bridge)", self.name)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let mut child = self.child.lock();
        if let Err(e) = child.kill() {
            debug!(err = e.to_string(), "Unable to kill driver helper");
        }
        if let Err(e) = child.wait() {
            error!(err = e.to_string(), "Error waiting for driver helper");
        }
    }
}
