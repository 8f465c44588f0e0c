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
    io::{BufRead, Write},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::Device;
use crate::matrix::{Dimensions, PixelBuffer, Rgb};

/// One ad-hoc pixel command, as a line of JSON. This is the same wire
/// protocol the driver helper process speaks, so the bridge device and the
/// `driver` subcommand share these types.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Blanks the display immediately.
    Clear,
    /// Stages a single pixel color. Not visible until `show`.
    SetPixel {
        index: usize,
        #[serde(default)]
        r: u8,
        #[serde(default)]
        g: u8,
        #[serde(default)]
        b: u8,
    },
    /// Stages a batch of pixel colors. Not visible until `show`.
    SetPixels { pixels: Vec<PixelUpdate> },
    /// Stages one color on every pixel. Not visible until `show`.
    Fill {
        #[serde(default)]
        r: u8,
        #[serde(default)]
        g: u8,
        #[serde(default)]
        b: u8,
    },
    /// Commits the staged buffer to the hardware.
    Show,
    /// Liveness check.
    Ping,
}

/// A single pixel update within a `set_pixels` command.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PixelUpdate {
    pub index: usize,
    #[serde(default)]
    pub r: u8,
    #[serde(default)]
    pub g: u8,
    #[serde(default)]
    pub b: u8,
}

/// A line of JSON acknowledging a command.
#[derive(Serialize, Deserialize, Debug)]
pub struct Response {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leds: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    /// A successful acknowledgement of the given command.
    pub fn ok(command: &str) -> Response {
        Response {
            status: "ok".to_string(),
            command: Some(command.to_string()),
            count: None,
            leds: None,
            message: None,
        }
    }

    /// An error response with the given message.
    pub fn error(message: String) -> Response {
        Response {
            status: "error".to_string(),
            command: None,
            count: None,
            leds: None,
            message: Some(message),
        }
    }

    /// The startup banner emitted once when the channel comes up.
    pub fn initialized(leds: usize) -> Response {
        Response {
            status: "initialized".to_string(),
            command: None,
            count: None,
            leds: Some(leds),
            message: None,
        }
    }

    /// Whether this response acknowledges success.
    pub fn is_ok(&self) -> bool {
        self.status == "ok" || self.status == "initialized"
    }
}

/// The command channel handler. Owns its own staging pixel buffer and a
/// display device handle; nothing else may touch the device while a channel
/// is active. Commands mutate the staging buffer and `show` commits it, so a
/// batch of updates reaches the hardware as a single write.
pub struct Channel {
    device: Arc<dyn Device>,
    buffer: PixelBuffer,
}

impl Channel {
    /// Creates a new command channel handler for the given device.
    pub fn new(device: Arc<dyn Device>, dimensions: Dimensions) -> Channel {
        Channel {
            device,
            buffer: PixelBuffer::new(dimensions.pixel_count()),
        }
    }

    /// Handles a single command and produces its acknowledgement. Out of
    /// range indices are ignored rather than rejected, matching the driver
    /// helper's behavior.
    pub fn handle(&mut self, command: Command) -> Response {
        match command {
            Command::Clear => {
                self.buffer.reset();
                match self.device.clear() {
                    Ok(()) => Response::ok("clear"),
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Command::SetPixel { index, r, g, b } => {
                self.buffer.set(&[index], Rgb::new(r, g, b));
                Response::ok("set_pixel")
            }
            Command::SetPixels { pixels } => {
                let count = pixels.len();
                for pixel in pixels {
                    self.buffer
                        .set(&[pixel.index], Rgb::new(pixel.r, pixel.g, pixel.b));
                }
                let mut response = Response::ok("set_pixels");
                response.count = Some(count);
                response
            }
            Command::Fill { r, g, b } => {
                self.buffer.fill(Rgb::new(r, g, b));
                Response::ok("fill")
            }
            Command::Show => match self.device.commit(self.buffer.as_slice()) {
                Ok(()) => Response::ok("show"),
                Err(e) => Response::error(e.to_string()),
            },
            Command::Ping => Response::ok("ping"),
        }
    }
}

/// Runs the command channel over the given reader and writer, one JSON
/// command per input line, one JSON response per output line. Malformed
/// input produces an error response, never a crash.
pub fn run(
    reader: impl BufRead,
    mut writer: impl Write,
    device: Arc<dyn Device>,
    dimensions: Dimensions,
) -> Result<(), Box<dyn Error>> {
    let mut channel = Channel::new(device.clone(), dimensions);

    // Blank the display on startup, then announce readiness.
    device.clear()?;
    let banner = Response::initialized(dimensions.pixel_count());
    writeln!(writer, "{}", serde_json::to_string(&banner)?)?;
    writer.flush()?;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Command>(line) {
            Ok(command) => {
                debug!(command = format!("{:?}", command), "Handling command");
                channel.handle(command)
            }
            Err(e) => Response::error(format!("Invalid JSON: {}", e)),
        };

        writeln!(writer, "{}", serde_json::to_string(&response)?)?;
        writer.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;
    use crate::device::mock;

    fn new_channel() -> (Arc<mock::Device>, Channel) {
        let device = Arc::new(mock::Device::get("mock-device"));
        let channel = Channel::new(device.clone(), Dimensions::new(4, 2));
        (device, channel)
    }

    #[test]
    fn test_parse_driver_wire_format() {
        // Exact lines as emitted by existing tooling.
        let command: Command =
            serde_json::from_str(r#"{"command": "set_pixel", "index": 3, "r": 255, "g": 0, "b": 0}"#)
                .unwrap();
        assert_eq!(
            command,
            Command::SetPixel {
                index: 3,
                r: 255,
                g: 0,
                b: 0
            }
        );

        let command: Command = serde_json::from_str(r#"{"command": "ping"}"#).unwrap();
        assert_eq!(command, Command::Ping);

        // Missing channels default to zero.
        let command: Command =
            serde_json::from_str(r#"{"command": "fill", "r": 16}"#).unwrap();
        assert_eq!(command, Command::Fill { r: 16, g: 0, b: 0 });
    }

    #[test]
    fn test_staging_and_show() {
        let (device, mut channel) = new_channel();

        let response = channel.handle(Command::SetPixel {
            index: 1,
            r: 10,
            g: 20,
            b: 30,
        });
        assert!(response.is_ok());

        // Nothing committed until show.
        assert_eq!(device.commit_count(), 0);

        let response = channel.handle(Command::Show);
        assert!(response.is_ok());
        assert_eq!(device.commit_count(), 1);
        assert_eq!(device.last_committed()[1], Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_set_pixels_reports_count_and_ignores_out_of_range() {
        let (device, mut channel) = new_channel();

        let response = channel.handle(Command::SetPixels {
            pixels: vec![
                PixelUpdate {
                    index: 0,
                    r: 1,
                    g: 1,
                    b: 1,
                },
                PixelUpdate {
                    index: 99,
                    r: 2,
                    g: 2,
                    b: 2,
                },
            ],
        });
        assert_eq!(response.count, Some(2));

        channel.handle(Command::Show);
        assert_eq!(device.last_committed()[0], Rgb::new(1, 1, 1));
        assert_eq!(device.last_committed().len(), 8);
    }

    #[test]
    fn test_clear_blanks_device() {
        let (device, mut channel) = new_channel();

        channel.handle(Command::Fill { r: 9, g: 9, b: 9 });
        channel.handle(Command::Show);
        assert_eq!(device.last_committed()[0], Rgb::new(9, 9, 9));

        let response = channel.handle(Command::Clear);
        assert!(response.is_ok());
        assert_eq!(device.clear_count(), 1);

        // The staging buffer was blanked too.
        channel.handle(Command::Show);
        assert_eq!(device.last_committed()[0], Rgb::BLACK);
    }

    #[test]
    fn test_run_loop_responses() {
        let device = Arc::new(mock::Device::get("mock-device"));
        let input = concat!(
            r#"{"command": "ping"}"#,
            "\n",
            "not json\n",
            r#"{"command": "fill", "r": 1, "g": 2, "b": 3}"#,
            "\n",
            r#"{"command": "show"}"#,
            "\n",
        );
        let mut output = Vec::new();

        run(
            Cursor::new(input),
            &mut output,
            device.clone(),
            Dimensions::new(2, 2),
        )
        .unwrap();

        let lines: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].status, "initialized");
        assert_eq!(lines[0].leds, Some(4));
        assert_eq!(lines[1].command.as_deref(), Some("ping"));
        assert_eq!(lines[2].status, "error");
        assert!(lines[2].message.as_deref().unwrap().contains("Invalid JSON"));
        assert_eq!(lines[3].command.as_deref(), Some("fill"));
        assert_eq!(lines[4].command.as_deref(), Some("show"));

        assert_eq!(device.last_committed(), vec![Rgb::new(1, 2, 3); 4]);
    }
}
