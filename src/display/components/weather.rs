/*
 *  display/components/weather.rs
 *
 *  dailyclock - 128x32 daily clock
 *  (c) 2020-26 Stuart Hunter
 *
 *  Weather block: icon, condition symbol and two feels-like readouts
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

use std::sync::Arc;

use embedded_graphics::prelude::*;
use log::{debug, warn};

use crate::canvas::Canvas;
use crate::condition::classify;
use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, EVENING_START_HOUR, MORNING_END_HOUR,
    SMALL_GLYPH_GAP, WEATHER_ICON_SYMBOL_GAP, WEATHER_START_X,
};
use crate::icons::{IconPipeline, IconSource};
use crate::sprites::{Sprite, SpriteAtlas, SpriteError, DEGREE_SPRITE};
use crate::weather::{DayForecast, WeatherSnapshot};

/// The two feels-like temperatures for the local `hour`.
///
/// Morning shows (morn, day), evening shows (eve, tomorrow's morn) and
/// everything in between (day, eve). Evening without a second day falls back
/// to the daytime pair. `None` when there is no forecast at all.
pub fn feels_like_pair(hour: u32, snapshot: &WeatherSnapshot) -> Option<(f64, f64)> {
    let today = &snapshot.today()?.feels_like;
    let pair = if hour < MORNING_END_HOUR {
        (today.morn, today.day)
    } else if hour >= EVENING_START_HOUR {
        match snapshot.tomorrow() {
            Some(tomorrow) => (today.eve, tomorrow.feels_like.morn),
            None => (today.day, today.eve),
        }
    } else {
        (today.day, today.eve)
    };
    Some(pair)
}

/// Nearest whole degree as drawn, "-0" collapses to "0"
pub fn temperature_text(value: f64) -> String {
    (value.round() as i64).to_string()
}

/// Optional glyphs never stop a frame: absent is quiet, unreadable is warned
fn optional(result: Result<Arc<Sprite>, SpriteError>) -> Option<Arc<Sprite>> {
    match result {
        Ok(sprite) => Some(sprite),
        Err(e) if e.is_missing() => {
            debug!("{}, drawn without it", e);
            None
        }
        Err(e) => {
            warn!("{}, drawn without it", e);
            None
        }
    }
}

/// One temperature: small digits plus an optional degree mark
struct Readout {
    glyphs: Vec<Arc<Sprite>>,
    degree: Option<Arc<Sprite>>,
}

impl Readout {
    fn build(atlas: &SpriteAtlas, value: f64) -> Result<Self, SpriteError> {
        let glyphs = temperature_text(value)
            .chars()
            .map(|c| atlas.small(c))
            .collect::<Result<Vec<_>, _>>()?;
        let degree = optional(atlas.lookup(DEGREE_SPRITE));
        Ok(Self { glyphs, degree })
    }

    fn width(&self) -> i32 {
        let widths: Vec<i32> = self.glyphs.iter()
            .chain(self.degree.iter())
            .map(|s| s.width() as i32)
            .collect();
        widths.iter().sum::<i32>() + SMALL_GLYPH_GAP * (widths.len() as i32 - 1).max(0)
    }

    /// Digits sit on the bottom edge, the degree mark hangs from their top.
    fn draw(&self, canvas: &mut Canvas, x: i32) {
        let bottom = DISPLAY_HEIGHT as i32;
        let digit_top = bottom - self.glyphs.iter().map(|s| s.height() as i32).max().unwrap_or(0);
        let mut x = x;
        for glyph in &self.glyphs {
            canvas.blit(glyph, Point::new(x, bottom - glyph.height() as i32));
            x += glyph.width() as i32 + SMALL_GLYPH_GAP;
        }
        if let Some(degree) = &self.degree {
            canvas.blit(degree, Point::new(x, digit_top));
        }
    }
}

/// Weather display component
pub struct WeatherDisplay {
    /// Normalized icons, read from the icon cache directory
    icon_atlas: SpriteAtlas,
}

impl WeatherDisplay {
    pub fn new(icon_atlas: SpriteAtlas) -> Self {
        Self { icon_atlas }
    }

    /// Left edge of an icon block `block_width` wide, centered in the weather region
    pub fn block_x(block_width: i32) -> i32 {
        let region = DISPLAY_WIDTH as i32 - WEATHER_START_X;
        (WEATHER_START_X + (region - block_width) / 2).max(WEATHER_START_X)
    }

    /// Icon and condition symbol, top aligned and centered as one block.
    ///
    /// An icon that cannot be fetched or decoded drops the whole block for
    /// this tick; it is retried on the next one.
    pub async fn render_icon<I: IconSource>(
        &self,
        canvas: &mut Canvas,
        atlas: &SpriteAtlas,
        icons: &IconPipeline<I>,
        today: &DayForecast,
    ) {
        let Some(icon_id) = today.icon_id() else {
            debug!("Forecast has no icon, icon block skipped");
            return;
        };

        let icon = match icons.ensure(icon_id).await {
            Ok(_) => match self.icon_atlas.lookup(icon_id) {
                Ok(icon) => icon,
                Err(e) => {
                    warn!("Icon '{}' unusable: {}", icon_id, e);
                    return;
                }
            },
            Err(e) => {
                warn!("Icon '{}' unavailable: {}", icon_id, e);
                return;
            }
        };

        let symbol = classify(today.condition_code().unwrap_or_default());
        let symbol = optional(atlas.lookup(symbol.sprite_name()));

        let mut block_width = icon.width() as i32;
        if let Some(symbol) = &symbol {
            block_width += WEATHER_ICON_SYMBOL_GAP + symbol.width() as i32;
        }

        let x = Self::block_x(block_width);
        canvas.blit(&icon, Point::new(x, 0));
        if let Some(symbol) = &symbol {
            canvas.blit(symbol, Point::new(x + icon.width() as i32 + WEATHER_ICON_SYMBOL_GAP, 0));
        }
    }

    /// First readout from the weather region's left edge, second flush with the right edge.
    pub fn render_temperatures(
        &self,
        canvas: &mut Canvas,
        atlas: &SpriteAtlas,
        (first, second): (f64, f64),
    ) -> Result<(), SpriteError> {
        Readout::build(atlas, first)?.draw(canvas, WEATHER_START_X);

        let second = Readout::build(atlas, second)?;
        second.draw(canvas, DISPLAY_WIDTH as i32 - second.width());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprites::test_support::{full_sprite_dir, write_block};
    use crate::weather::test_support::day;
    use embedded_graphics::primitives::Rectangle;

    fn snapshot(days: Vec<DayForecast>) -> WeatherSnapshot {
        WeatherSnapshot { daily: days, ..Default::default() }
    }

    #[test]
    fn test_feels_like_pair_by_hour() {
        let snap = snapshot(vec![day(800, "01d", 1.0, 2.0, 3.0), day(800, "01d", 4.0, 5.0, 6.0)]);
        assert_eq!(feels_like_pair(0, &snap), Some((1.0, 2.0)));
        assert_eq!(feels_like_pair(11, &snap), Some((1.0, 2.0)));
        assert_eq!(feels_like_pair(12, &snap), Some((2.0, 3.0)));
        assert_eq!(feels_like_pair(19, &snap), Some((2.0, 3.0)));
        assert_eq!(feels_like_pair(20, &snap), Some((3.0, 4.0)));
        assert_eq!(feels_like_pair(23, &snap), Some((3.0, 4.0)));
    }

    #[test]
    fn test_evening_without_tomorrow_falls_back() {
        let snap = snapshot(vec![day(800, "01d", 1.0, 2.0, 3.0)]);
        assert_eq!(feels_like_pair(21, &snap), Some((2.0, 3.0)));
        assert_eq!(feels_like_pair(21, &snapshot(vec![])), None);
    }

    #[test]
    fn test_temperature_text_rounds() {
        assert_eq!(temperature_text(3.4), "3");
        assert_eq!(temperature_text(7.9), "8");
        assert_eq!(temperature_text(-2.6), "-3");
        assert_eq!(temperature_text(-0.4), "0");
        assert_eq!(temperature_text(12.5), "13");
    }

    #[test]
    fn test_block_x_centers_and_clamps() {
        assert_eq!(WeatherDisplay::block_x(43), 75);
        assert_eq!(WeatherDisplay::block_x(34), 80);
        assert_eq!(WeatherDisplay::block_x(62), 66);
        assert_eq!(WeatherDisplay::block_x(80), 66);
    }

    #[test]
    fn test_readouts_are_anchored() {
        let dir = tempfile::tempdir().unwrap();
        full_sprite_dir(dir.path());
        let atlas = SpriteAtlas::new(dir.path());
        let display = WeatherDisplay::new(SpriteAtlas::new(dir.path().join("icons")));
        let mut canvas = Canvas::new();

        display.render_temperatures(&mut canvas, &atlas, (-3.2, 12.0)).unwrap();

        // "-3": minus 3 wide at 66, digit at 70, degree at 76..79 on the digit top row
        assert!(canvas.is_on(66, 31));
        assert!(canvas.is_on(70, 27));
        assert!(canvas.is_on(76, 27));
        assert!(!canvas.is_on(76, 30));
        // "12": 5+1+5+1+3 = 15 wide, so it starts at 113 and ends on 127
        assert!(canvas.is_on(113, 31));
        assert!(!canvas.is_on(112, 31));
        assert!(canvas.is_on(127, 27));
    }

    #[test]
    fn test_missing_degree_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        write_block(dir.path(), "s8", 5, 5);
        let atlas = SpriteAtlas::new(dir.path());
        let display = WeatherDisplay::new(SpriteAtlas::new(dir.path()));
        let mut canvas = Canvas::new();

        display.render_temperatures(&mut canvas, &atlas, (8.0, 8.0)).unwrap();
        assert!(canvas.is_on(66, 27));
        assert!(canvas.is_on(127, 31));
        assert_eq!(canvas.count_on_in(&Rectangle::new(Point::new(66, 0), Size::new(62, 27))), 0);
    }

    #[test]
    fn test_missing_small_digit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = SpriteAtlas::new(dir.path());
        let display = WeatherDisplay::new(SpriteAtlas::new(dir.path()));
        let mut canvas = Canvas::new();
        assert!(display.render_temperatures(&mut canvas, &atlas, (1.0, 2.0)).is_err());
    }
}
