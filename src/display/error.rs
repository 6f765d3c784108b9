/*
 *  display/error.rs
 *
 *  dailyclock - 128x32 daily clock
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error type for the display subsystem
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

use std::fmt;
use std::error::Error;

/// Failures between a packed frame and the panel. All of them end the loop.
#[derive(Debug)]
pub enum DisplayError {
    /// The I2C device node could not be opened
    BusOpen { bus: String, reason: String },

    /// Controller rejected its init sequence
    InitFailed(String),

    /// A frame or clear never reached the panel
    PushFailed(String),

    /// Rotation other than 0, 90, 180 or 270
    BadRotation(u16),

    /// Packed frame is not width * height / 8 bytes
    FrameSize { expected: usize, actual: usize },

    /// The panel has no such knob
    Unsupported(&'static str),

    /// Raised by the ssd1306 command layer
    Interface(display_interface::DisplayError),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::BusOpen { bus, reason } =>
                write!(f, "cannot open {}: {}", bus, reason),
            DisplayError::InitFailed(msg) =>
                write!(f, "panel init failed: {}", msg),
            DisplayError::PushFailed(msg) =>
                write!(f, "frame push failed: {}", msg),
            DisplayError::BadRotation(degrees) =>
                write!(f, "rotation {} is not one of 0, 90, 180, 270", degrees),
            DisplayError::FrameSize { expected, actual } =>
                write!(f, "frame is {} bytes, panel takes {}", actual, expected),
            DisplayError::Unsupported(knob) =>
                write!(f, "panel does not support {}", knob),
            DisplayError::Interface(err) =>
                write!(f, "panel interface: {:?}", err),
        }
    }
}

// display_interface::DisplayError is not a std error, so no source()
impl Error for DisplayError {}

impl From<display_interface::DisplayError> for DisplayError {
    fn from(err: display_interface::DisplayError) -> Self {
        DisplayError::Interface(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = DisplayError::FrameSize { expected: 512, actual: 3 };
        assert_eq!(err.to_string(), "frame is 3 bytes, panel takes 512");
        assert!(DisplayError::BadRotation(45).to_string().contains("45"));
        assert_eq!(
            DisplayError::BusOpen { bus: "/dev/i2c-9".into(), reason: "no such file".into() }.to_string(),
            "cannot open /dev/i2c-9: no such file"
        );
    }

    #[test]
    fn test_from_interface_error() {
        let err: DisplayError = display_interface::DisplayError::BusWriteError.into();
        assert!(matches!(err, DisplayError::Interface(_)));
    }
}
