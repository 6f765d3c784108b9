/*
 *  display/drivers/ssd1306.rs
 *
 *  dailyclock - 128x32 daily clock
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1306 128x32 OLED over I2C
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

use linux_embedded_hal::I2cdev;
use ssd1306::{
    mode::BufferedGraphicsMode,
    prelude::*,
    size::DisplaySize128x32,
    I2CDisplayInterface,
    Ssd1306,
};

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};

use log::{debug, info};

type Panel = Ssd1306<I2CInterface<I2cdev>, DisplaySize128x32, BufferedGraphicsMode<DisplaySize128x32>>;

/// The dashboard panel: SSD1306, 128x32, buffered, on a Linux I2C bus
pub struct Ssd1306Driver {
    panel: Panel,
    caps: DisplayCapabilities,
}

impl Ssd1306Driver {
    /// Open `bus` (e.g. "/dev/i2c-1") for the controller at `address`
    /// (0x3C or 0x3D). Nothing is sent until `init`.
    pub fn new_i2c(bus: &str, address: u8) -> Result<Self, DisplayError> {
        info!("ssd1306 128x32 on {} @ 0x{:02X}", bus, address);

        let i2c = I2cdev::new(bus).map_err(|e| DisplayError::BusOpen {
            bus: bus.to_string(),
            reason: e.to_string(),
        })?;

        let panel = Ssd1306::new(
            I2CDisplayInterface::new_custom_address(i2c, address),
            DisplaySize128x32,
            DisplayRotation::Rotate0,
        )
        .into_buffered_graphics_mode();

        Ok(Self {
            panel,
            caps: DisplayCapabilities::monochrome(DISPLAY_WIDTH, DISPLAY_HEIGHT),
        })
    }
}

fn contrast_step(value: u8) -> Brightness {
    match value {
        0..=63 => Brightness::DIMMEST,
        64..=127 => Brightness::DIM,
        128..=191 => Brightness::NORMAL,
        _ => Brightness::BRIGHTEST,
    }
}

impl DisplayDriver for Ssd1306Driver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.caps
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.panel
            .init()
            .map_err(|e| DisplayError::InitFailed(format!("{:?}", e)))?;
        debug!("ssd1306 ready");
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.panel.set_brightness(contrast_step(value))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.panel
            .flush()
            .map_err(|e| DisplayError::PushFailed(format!("{:?}", e)))
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.panel.clear_buffer();
        self.flush()
    }

    /// The frame is row-major, one bit per pixel, LSB first. The controller
    /// wants page order, so go through the buffered mode pixel by pixel.
    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected = self.caps.frame_len();
        if buffer.len() != expected {
            return Err(DisplayError::FrameSize { expected, actual: buffer.len() });
        }

        let width = self.caps.width;
        self.panel.clear_buffer();
        for (n, _) in buffer
            .iter()
            .enumerate()
            .flat_map(|(i, &b)| (0..8).map(move |bit| (i * 8 + bit, (b >> bit) & 1)))
            .filter(|&(_, lit)| lit == 1)
        {
            let n = n as u32;
            self.panel.set_pixel(n % width, n / width, true);
        }

        self.flush()
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        self.panel.set_invert(inverted)?;
        Ok(())
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        let rotation = match degrees {
            0 => DisplayRotation::Rotate0,
            90 => DisplayRotation::Rotate90,
            180 => DisplayRotation::Rotate180,
            270 => DisplayRotation::Rotate270,
            other => return Err(DisplayError::BadRotation(other)),
        };
        self.panel.set_rotation(rotation)?;
        Ok(())
    }
}
