/*
 *  display/traits.rs
 *
 *  dailyclock - 128x32 daily clock
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display driver abstraction
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    pub supports_rotation: bool,
    pub supports_brightness: bool,
    pub supports_invert: bool,
}

impl DisplayCapabilities {
    /// A 1-bit panel of the given size with every knob available
    pub fn monochrome(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            supports_rotation: true,
            supports_brightness: true,
            supports_invert: true,
        }
    }

    /// Bytes in one packed frame, 8 pixels per byte
    pub fn frame_len(&self) -> usize {
        (self.width * self.height).div_ceil(8) as usize
    }
}

/// What the scheduler needs from a panel.
///
/// Frames arrive packed 8 pixels per byte, LSB first, row-major.
pub trait DisplayDriver: Send {
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Bring the controller up; called once after open
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Set display brightness (0-255)
    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError>;

    /// Push whatever the driver currently holds to the panel
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Blank the panel
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Replace the panel contents with a packed frame and flush
    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError>;

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        let _ = inverted;
        Err(DisplayError::Unsupported("invert"))
    }

    /// Rotation angle should be 0, 90, 180, or 270 degrees.
    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        if !self.capabilities().supports_rotation {
            return Err(DisplayError::Unsupported("rotation"));
        }
        if !matches!(degrees, 0 | 90 | 180 | 270) {
            return Err(DisplayError::BadRotation(degrees));
        }
        Err(DisplayError::Unsupported("rotation"))
    }

    /// Apply the optional knobs from config, skipping what the panel lacks
    fn apply_config(&mut self, config: &DisplayConfig) -> Result<(), DisplayError> {
        let caps = self.capabilities().clone();
        if let Some(brightness) = config.brightness.filter(|_| caps.supports_brightness) {
            self.set_brightness(brightness)?;
        }
        if let Some(invert) = config.invert.filter(|_| caps.supports_invert) {
            self.set_invert(invert)?;
        }
        if let Some(rotation) = config.rotate_deg.filter(|_| caps.supports_rotation) {
            self.set_rotation(rotation)?;
        }
        Ok(())
    }
}
