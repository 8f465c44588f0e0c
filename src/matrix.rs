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
use std::str::FromStr;

use crate::show::{Effect, EffectKind};

/// The default matrix width in columns.
pub const DEFAULT_WIDTH: u16 = 32;

/// The default matrix height in rows.
pub const DEFAULT_HEIGHT: u16 = 8;

/// An 8-bit-per-channel RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// All channels off.
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Creates a new color from the given channels.
    pub fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b }
    }
}

/// An error parsing a `#RRGGBB` color string.
#[derive(Debug, thiserror::Error)]
#[error("invalid color {0:?}, expected #RRGGBB")]
pub struct ParseColorError(String);

impl FromStr for Rgb {
    type Err = ParseColorError;

    /// Parses a `#RRGGBB` hex string, the color format used by show files.
    fn from_str(s: &str) -> Result<Rgb, ParseColorError> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ParseColorError(s.to_string()))?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParseColorError(s.to_string()));
        }
        let channel = |range| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ParseColorError(s.to_string()))
        };
        Ok(Rgb {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// The logical dimensions of the LED matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    width: u16,
    height: u16,
}

impl Default for Dimensions {
    fn default() -> Dimensions {
        Dimensions {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl Dimensions {
    /// Creates new matrix dimensions.
    pub fn new(width: u16, height: u16) -> Dimensions {
        Dimensions { width, height }
    }

    /// The width of the matrix in columns.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// The height of the matrix in rows.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The total number of addressable pixels.
    pub fn pixel_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Maps a logical (x, y) coordinate to the physical wire-order index for
    /// serpentine column wiring: even columns run top-to-bottom, odd columns
    /// bottom-to-top. Any tool producing led index lists for show files must
    /// use this exact mapping to stay compatible with existing shows.
    ///
    /// Panics if the coordinate lies outside the matrix.
    pub fn led_index(&self, x: u16, y: u16) -> usize {
        assert!(
            x < self.width && y < self.height,
            "coordinate ({}, {}) is outside the {}x{} matrix",
            x,
            y,
            self.width,
            self.height
        );
        let height = usize::from(self.height);
        let row = if x % 2 == 0 {
            usize::from(y)
        } else {
            height - 1 - usize::from(y)
        };
        usize::from(x) * height + row
    }
}

/// The authoritative in-memory color state of every physical LED. Exclusively
/// owned by a playback session; the display device only ever sees full
/// snapshots, so a single effect is never observed half-applied.
pub struct PixelBuffer {
    pixels: Vec<Rgb>,
}

impl PixelBuffer {
    /// Creates a new all-black buffer with the given number of pixels.
    pub fn new(pixel_count: usize) -> PixelBuffer {
        PixelBuffer {
            pixels: vec![Rgb::BLACK; pixel_count],
        }
    }

    /// The number of pixels in the buffer.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns true if the buffer has no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Resets every pixel to black.
    pub fn reset(&mut self) {
        self.fill(Rgb::BLACK);
    }

    /// Sets every pixel to the given color.
    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    /// Sets the listed pixels to the given color. Indices are expected to be
    /// validated at show load time; anything out of range here is ignored.
    pub fn set(&mut self, leds: &[usize], color: Rgb) {
        for &led in leds {
            if let Some(pixel) = self.pixels.get_mut(led) {
                *pixel = color;
            }
        }
    }

    /// Sets the listed pixels to black.
    pub fn clear(&mut self, leds: &[usize]) {
        self.set(leds, Rgb::BLACK);
    }

    /// Applies a single effect to the buffer.
    pub fn apply(&mut self, effect: &Effect) {
        match effect.kind() {
            EffectKind::Fill { color } => self.fill(*color),
            EffectKind::Set { color, leds } => self.set(leds, *color),
            EffectKind::Clear { leds } => self.clear(leds),
        }
    }

    /// A snapshot view of the full buffer for committing to the device.
    pub fn as_slice(&self) -> &[Rgb] {
        &self.pixels
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!("#000000".parse::<Rgb>().unwrap(), Rgb::BLACK);
        assert_eq!("#FF0000".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 0));
        assert_eq!("#cc9933".parse::<Rgb>().unwrap(), Rgb::new(0xCC, 0x99, 0x33));

        assert!("FF0000".parse::<Rgb>().is_err());
        assert!("#FF00".parse::<Rgb>().is_err());
        assert!("#GG0000".parse::<Rgb>().is_err());
        assert!("#FF0000FF".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_color_display_round_trip() {
        let color = Rgb::new(0x12, 0xAB, 0x03);
        assert_eq!(color.to_string().parse::<Rgb>().unwrap(), color);
    }

    #[test]
    fn test_serpentine_mapping() {
        let dimensions = Dimensions::default();
        assert_eq!(dimensions.pixel_count(), 256);

        // Even columns enumerate rows top-to-bottom.
        assert_eq!(dimensions.led_index(0, 0), 0);
        assert_eq!(dimensions.led_index(0, 7), 7);
        assert_eq!(dimensions.led_index(2, 3), 19);

        // Odd columns enumerate rows bottom-to-top.
        assert_eq!(dimensions.led_index(1, 7), 8);
        assert_eq!(dimensions.led_index(1, 0), 15);
        assert_eq!(dimensions.led_index(31, 0), 255);
    }

    #[test]
    #[should_panic(expected = "outside the 4x2 matrix")]
    fn test_out_of_range_coordinate_panics() {
        Dimensions::new(4, 2).led_index(1, 2);
    }

    #[test]
    fn test_mapping_is_a_bijection() {
        let dimensions = Dimensions::new(6, 4);
        let mut seen = vec![false; dimensions.pixel_count()];
        for x in 0..dimensions.width() {
            for y in 0..dimensions.height() {
                let index = dimensions.led_index(x, y);
                assert!(!seen[index], "index {} mapped twice", index);
                seen[index] = true;
            }
        }
        assert!(seen.into_iter().all(|mapped| mapped));
    }

    #[test]
    fn test_set_then_clear_round_trip() {
        let mut buffer = PixelBuffer::new(16);
        let leds = [0, 3, 7, 15];
        buffer.set(&leds, Rgb::new(255, 128, 0));
        assert_eq!(buffer.as_slice()[3], Rgb::new(255, 128, 0));

        buffer.clear(&leds);
        assert!(buffer.as_slice().iter().all(|&pixel| pixel == Rgb::BLACK));
    }

    #[test]
    fn test_fill_is_idempotent() {
        let mut once = PixelBuffer::new(8);
        let mut twice = PixelBuffer::new(8);
        let color = Rgb::new(0, 64, 32);

        once.fill(color);
        twice.fill(color);
        twice.fill(color);
        assert_eq!(once.as_slice(), twice.as_slice());
    }

    #[test]
    fn test_out_of_range_set_ignored() {
        let mut buffer = PixelBuffer::new(4);
        buffer.set(&[2, 99], Rgb::new(1, 2, 3));
        assert_eq!(buffer.as_slice()[2], Rgb::new(1, 2, 3));
        assert_eq!(buffer.len(), 4);
    }
}
