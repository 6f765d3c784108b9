/*
 *  display/composer.rs
 *
 *  dailyclock - 128x32 daily clock
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds one finished frame per tick
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
use log::debug;
use thiserror::Error;

use crate::canvas::Canvas;
use crate::config::TimeFormat;
use crate::display::components::{feels_like_pair, ClockDisplay, WeatherDisplay};
use crate::icons::{IconPipeline, IconSource};
use crate::sprites::{SpriteAtlas, SpriteError};
use crate::weather::WeatherSnapshot;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("frame composition failed: {0}")]
    Sprite(#[from] SpriteError),
}

/// Owns everything needed to turn (time, weather) into pixels.
pub struct FrameComposer<I: IconSource> {
    atlas: SpriteAtlas,
    icons: IconPipeline<I>,
    clock: ClockDisplay,
    weather: WeatherDisplay,
}

impl<I: IconSource> FrameComposer<I> {
    pub fn new(atlas: SpriteAtlas, icons: IconPipeline<I>, time_format: TimeFormat) -> Self {
        let weather = WeatherDisplay::new(SpriteAtlas::new(icons.dir()));
        Self {
            atlas,
            icons,
            clock: ClockDisplay::new(time_format),
            weather,
        }
    }

    pub fn atlas(&self) -> &SpriteAtlas {
        &self.atlas
    }

    pub fn icons(&self) -> &IconPipeline<I> {
        &self.icons
    }

    /// Blank the canvas and draw the clock, the seconds bar and, unless
    /// skipped, the weather block.
    ///
    /// Only a missing or unreadable clock or readout digit fails the frame;
    /// icon, symbol and degree trouble just leaves them out.
    pub async fn compose(
        &self,
        canvas: &mut Canvas,
        now: NaiveDateTime,
        snapshot: &WeatherSnapshot,
        skip_weather: bool,
    ) -> Result<(), ComposeError> {
        canvas.blank();

        self.clock.render(canvas, &self.atlas, &now)?;
        self.clock.render_progress(canvas, &now);

        if skip_weather {
            debug!("Screensaver tick, weather block skipped");
            return Ok(());
        }
        let Some(today) = snapshot.today() else {
            debug!("No daily forecast yet, weather block skipped");
            return Ok(());
        };

        self.weather.render_icon(canvas, &self.atlas, &self.icons, today).await;
        if let Some(pair) = feels_like_pair(now.hour(), snapshot) {
            self.weather.render_temperatures(canvas, &self.atlas, pair)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WEATHER_START_X;
    use crate::icons::test_support::StubIcons;
    use crate::sprites::test_support::full_sprite_dir;
    use crate::weather::test_support::day;
    use chrono::NaiveDate;
    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::Rectangle;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    fn weather_region() -> Rectangle {
        Rectangle::new(Point::new(WEATHER_START_X, 0), Size::new(128 - WEATHER_START_X as u32, 31))
    }

    fn composer(dir: &std::path::Path, icons: StubIcons) -> FrameComposer<StubIcons> {
        full_sprite_dir(dir);
        FrameComposer::new(
            SpriteAtlas::new(dir),
            IconPipeline::new(icons, dir.join("icons")),
            TimeFormat::TwentyFour,
        )
    }

    #[tokio::test]
    async fn test_skip_weather_leaves_region_blank() {
        let dir = tempfile::tempdir().unwrap();
        let icons = StubIcons::default();
        let composer = composer(dir.path(), icons.clone());
        let snap = WeatherSnapshot { daily: vec![day(500, "10d", 3.4, 7.9, 5.0)], ..Default::default() };
        let mut canvas = Canvas::new();

        composer.compose(&mut canvas, at(7, 5, 30), &snap, true).await.unwrap();

        assert!(canvas.is_on(4, 0));
        assert!(canvas.is_on(29, 31));
        assert_eq!(canvas.count_on_in(&weather_region()), 0);
        assert_eq!(icons.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_daily_skips_weather() {
        let dir = tempfile::tempdir().unwrap();
        let composer = composer(dir.path(), StubIcons::default());
        let mut canvas = Canvas::new();

        composer.compose(&mut canvas, at(13, 0, 0), &WeatherSnapshot::default(), false).await.unwrap();

        assert!(canvas.is_on(4, 0));
        assert_eq!(canvas.count_on_in(&weather_region()), 0);
    }

    #[tokio::test]
    async fn test_icon_failure_keeps_readouts() {
        let dir = tempfile::tempdir().unwrap();
        let icons = StubIcons { fail: true, ..Default::default() };
        let composer = composer(dir.path(), icons);
        let snap = WeatherSnapshot { daily: vec![day(500, "10d", 3.4, 7.9, 5.0)], ..Default::default() };
        let mut canvas = Canvas::new();

        composer.compose(&mut canvas, at(7, 5, 30), &snap, false).await.unwrap();

        let icon_rows = Rectangle::new(Point::new(WEATHER_START_X, 0), Size::new(62, 27));
        assert_eq!(canvas.count_on_in(&icon_rows), 0);
        assert!(canvas.is_on(WEATHER_START_X, 31));
        // "8" then the degree mark ending on the last column
        assert!(canvas.is_on(123, 31));
        assert!(canvas.is_on(127, 27));
    }

    #[tokio::test]
    async fn test_compose_blanks_previous_frame() {
        let dir = tempfile::tempdir().unwrap();
        let composer = composer(dir.path(), StubIcons::default());
        let mut canvas = Canvas::new();
        canvas.hline(Point::new(0, 29), 128, embedded_graphics::pixelcolor::BinaryColor::On);

        composer.compose(&mut canvas, at(7, 5, 0), &WeatherSnapshot::default(), false).await.unwrap();

        assert!(!canvas.is_on(127, 29));
        assert!(!canvas.is_on(0, 31));
    }

    #[tokio::test]
    async fn test_missing_digits_fail_the_frame() {
        let dir = tempfile::tempdir().unwrap();
        let composer = FrameComposer::new(
            SpriteAtlas::new(dir.path()),
            IconPipeline::new(StubIcons::default(), dir.path()),
            TimeFormat::TwentyFour,
        );
        let mut canvas = Canvas::new();
        let err = composer.compose(&mut canvas, at(7, 5, 0), &WeatherSnapshot::default(), true).await;
        assert!(matches!(err, Err(ComposeError::Sprite(SpriteError::AssetMissing(_)))));
    }
}
