/*
 *  display/components/clock.rs
 *
 *  dailyclock - 128x32 daily clock
 *  (c) 2020-26 Stuart Hunter
 *
 *  Clock digits and the seconds bar
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

use chrono::{NaiveDateTime, Timelike};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::canvas::Canvas;
use crate::config::TimeFormat;
use crate::constants::{
    CLOCK_GLYPH_GAP, CLOCK_X_OFFSET, CLOCK_Y_OFFSET,
    PROGRESS_BAR_Y_POS, PROGRESS_MAX_SECOND, PROGRESS_TRACK_WIDTH,
};
use crate::sprites::{SpriteAtlas, SpriteError};

/// Length of the lit part of the seconds bar.
///
/// Monotonic, 0 at second 0 and the full track at 59; a leap second clamps.
pub fn progress_len(second: u32) -> u32 {
    second.min(PROGRESS_MAX_SECOND) * PROGRESS_TRACK_WIDTH / PROGRESS_MAX_SECOND
}

/// Clock display component
#[derive(Debug, Clone, Copy)]
pub struct ClockDisplay {
    format: TimeFormat,
}

impl ClockDisplay {
    pub fn new(format: TimeFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> TimeFormat {
        self.format
    }

    /// Clock text for `now`, e.g. "07:05"
    pub fn time_text(&self, now: &NaiveDateTime) -> String {
        now.format(self.format.pattern()).to_string()
    }

    /// Draw the digits left to right from the clock origin.
    ///
    /// Returns the x just past the last glyph. A missing glyph aborts the draw.
    pub fn render(&self, canvas: &mut Canvas, atlas: &SpriteAtlas, now: &NaiveDateTime) -> Result<i32, SpriteError> {
        let mut x = CLOCK_X_OFFSET;
        for c in self.time_text(now).chars() {
            let sprite = atlas.digit(c)?;
            canvas.blit(&sprite, Point::new(x, CLOCK_Y_OFFSET));
            x += sprite.width() as i32 + CLOCK_GLYPH_GAP;
        }
        Ok(x)
    }

    /// Seconds bar on the bottom row: clear the track, then light the elapsed part.
    pub fn render_progress(&self, canvas: &mut Canvas, now: &NaiveDateTime) {
        let origin = Point::new(0, PROGRESS_BAR_Y_POS);
        canvas.hline(origin, PROGRESS_TRACK_WIDTH, BinaryColor::Off);
        canvas.hline(origin, progress_len(now.second()), BinaryColor::On);
    }
}
