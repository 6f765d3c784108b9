/*
 *  canvas.rs
 *
 *  dailyclock - 128x32 daily clock
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use core::convert::Infallible;
use std::path::Path;

use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::image::Image;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use image::{GrayImage, Luma};

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::sprites::Sprite;

/// The fixed 128x32 monochrome frame.
///
/// Allocated once and blanked every tick; the composer draws into it through
/// the embedded-graphics `DrawTarget` impl below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    buf: Vec<BinaryColor>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self { buf: vec![BinaryColor::Off; (DISPLAY_WIDTH * DISPLAY_HEIGHT) as usize] }
    }

    pub fn width(&self) -> u32 { DISPLAY_WIDTH }
    pub fn height(&self) -> u32 { DISPLAY_HEIGHT }

    /// Immutable raw access, row-major
    pub fn as_slice(&self) -> &[BinaryColor] { &self.buf }

    /// Fill the whole frame with the background color
    pub fn blank(&mut self) {
        self.buf.fill(BinaryColor::Off);
    }

    /// Pixel at (x, y), `None` outside the frame
    pub fn pixel(&self, x: i32, y: i32) -> Option<BinaryColor> {
        self.idx(Point::new(x, y)).map(|i| self.buf[i])
    }

    pub fn is_on(&self, x: i32, y: i32) -> bool {
        self.pixel(x, y) == Some(BinaryColor::On)
    }

    pub fn count_on_pixels(&self) -> usize {
        self.buf.iter().filter(|&&p| p == BinaryColor::On).count()
    }

    /// Number of lit pixels inside `area` (clipped to the frame)
    pub fn count_on_in(&self, area: &Rectangle) -> usize {
        area.points().filter(|p| self.is_on(p.x, p.y)).count()
    }

    /// Paste a sprite with its top-left corner at `at`.
    ///
    /// Both colors are written, so the sprite replaces whatever was below it.
    pub fn blit(&mut self, sprite: &Sprite, at: Point) {
        let raw = sprite.raw();
        let _ = Image::new(&raw, at).draw(self);
    }

    /// Horizontal run of `len` pixels starting at `start`
    pub fn hline(&mut self, start: Point, len: u32, color: BinaryColor) {
        if len == 0 {
            return;
        }
        let _ = Rectangle::new(start, Size::new(len, 1))
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(self);
    }

    /// Pack the frame 8 pixels per byte, LSB first, row-major.
    ///
    /// This is the layout `DisplayDriver::write_buffer` expects.
    pub fn to_packed_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.buf.len().div_ceil(8)];
        for (i, pixel) in self.buf.iter().enumerate() {
            if pixel.is_on() {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        bytes
    }

    /// Grayscale copy of the frame, on pixels white
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(DISPLAY_WIDTH, DISPLAY_HEIGHT, |x, y| {
            if self.is_on(x as i32, y as i32) { Luma([255]) } else { Luma([0]) }
        })
    }

    /// Write the frame as a PNG (store mode)
    pub fn save_png(&self, path: &Path) -> image::ImageResult<()> {
        self.to_gray_image().save_with_format(path, image::ImageFormat::Png)
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as u32, p.y as u32);
            if x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT {
                return Some((y * DISPLAY_WIDTH + x) as usize);
            }
        }
        None
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }
}

impl DrawTarget for Canvas {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // clipped per pixel, sprites may hang off the right edge
        for (p, c) in area.points().zip(colors) {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }
}
