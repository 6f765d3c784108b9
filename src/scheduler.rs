/*
 *  scheduler.rs
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

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::time::{sleep, Instant};

use crate::canvas::Canvas;
use crate::constants::TICK_SECS;
use crate::display::{ComposeError, DisplayDriver, DisplayError, FrameComposer};
use crate::func_timer::FunctionTimer;
use crate::icons::IconSource;
use crate::weather::{WeatherCache, WeatherSource};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("display fault: {0}")]
    DeviceFault(#[source] DisplayError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error("could not store frame: {0}")]
    Store(#[from] image::ImageError),
}

/// Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Render one frame to an image file and exit
    Store,
    /// Render and push once a second until signalled
    Loop,
}

impl RunMode {
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some("store") => RunMode::Store,
            _ => RunMode::Loop,
        }
    }
}

/// Screensaver: every `interval`-th tick, counting from the first, drops the weather block.
pub fn skip_weather(loop_count: u64, interval: u64) -> bool {
    interval > 0 && loop_count % interval == 0
}

/// Time left in the tick after `elapsed`; `None` means go again right away.
pub fn remaining(elapsed: Duration) -> Option<Duration> {
    Duration::from_secs_f64(TICK_SECS)
        .checked_sub(elapsed)
        .filter(|d| !d.is_zero())
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub loop_count: u64,
    pub skipped_weather: bool,
    pub fetched: bool,
}

pub struct Scheduler<S: WeatherSource, I: IconSource> {
    canvas: Canvas,
    cache: WeatherCache<S>,
    composer: FrameComposer<I>,
    screensaver: u64,
    loop_count: u64,
}

impl<S: WeatherSource, I: IconSource> Scheduler<S, I> {
    pub fn new(cache: WeatherCache<S>, composer: FrameComposer<I>, screensaver: u64) -> Self {
        Self {
            canvas: Canvas::new(),
            cache,
            composer,
            screensaver,
            loop_count: 0,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn cache(&self) -> &WeatherCache<S> {
        &self.cache
    }

    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    /// Refresh if stale; a failed fetch keeps the old snapshot on screen.
    async fn refresh_weather(&mut self, now: DateTime<Utc>) -> bool {
        match self.cache.refresh(now).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("Weather refresh failed, showing cached data: {}", e);
                false
            }
        }
    }

    async fn render(&mut self, now: DateTime<Local>, skip: bool) -> Result<bool, SchedulerError> {
        let fetched = self.refresh_weather(now.with_timezone(&Utc)).await;
        let _timer = FunctionTimer::new("compose");
        self.composer
            .compose(&mut self.canvas, now.naive_local(), self.cache.snapshot(), skip)
            .await?;
        Ok(fetched)
    }

    /// One render and push at `now`.
    pub async fn tick_at(
        &mut self,
        driver: &mut dyn DisplayDriver,
        now: DateTime<Local>,
    ) -> Result<TickReport, SchedulerError> {
        let skipped_weather = skip_weather(self.loop_count, self.screensaver);
        let fetched = self.render(now, skipped_weather).await?;

        {
            let _timer = FunctionTimer::new("push");
            driver
                .write_buffer(&self.canvas.to_packed_bytes())
                .map_err(SchedulerError::DeviceFault)?;
        }

        let report = TickReport { loop_count: self.loop_count, skipped_weather, fetched };
        self.loop_count += 1;
        Ok(report)
    }

    pub async fn tick(&mut self, driver: &mut dyn DisplayDriver) -> Result<TickReport, SchedulerError> {
        self.tick_at(driver, Local::now()).await
    }

    /// Tick once a second until an error; the caller races this against shutdown.
    pub async fn run_loop(&mut self, driver: &mut dyn DisplayDriver) -> Result<(), SchedulerError> {
        info!("Clock loop started (screensaver every {} ticks)", self.screensaver);
        loop {
            let tick_start = Instant::now();
            self.tick(driver).await?;

            let elapsed = tick_start.elapsed();
            match remaining(elapsed) {
                Some(rest) => sleep(rest).await,
                None => debug!("Tick overran by {:?}", elapsed.saturating_sub(Duration::from_secs_f64(TICK_SECS))),
            }
        }
    }

    /// Compose a single frame at `now` and write it as a PNG.
    pub async fn store_at(&mut self, path: &Path, now: DateTime<Local>) -> Result<(), SchedulerError> {
        self.render(now, false).await?;
        self.canvas.save_png(path)?;
        info!("Stored frame to {}", path.display());
        Ok(())
    }

    pub async fn store_once(&mut self, path: &Path) -> Result<(), SchedulerError> {
        self.store_at(path, Local::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeFormat;
    use crate::display::MockDriver;
    use crate::icons::test_support::StubIcons;
    use crate::icons::IconPipeline;
    use crate::sprites::test_support::full_sprite_dir;
    use crate::sprites::SpriteAtlas;
    use crate::weather::test_support::{day, query, StubSource};
    use chrono::TimeZone;

    fn scheduler(dir: &Path, weather: StubSource, screensaver: u64) -> Scheduler<StubSource, StubIcons> {
        full_sprite_dir(dir);
        let cache = WeatherCache::new(weather, query(), dir.join("weather_cache.json"));
        let composer = FrameComposer::new(
            SpriteAtlas::new(dir),
            IconPipeline::new(StubIcons::default(), dir.join("icons")),
            TimeFormat::TwentyFour,
        );
        Scheduler::new(cache, composer, screensaver)
    }

    fn local(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, h, m, s).unwrap()
    }

    #[test]
    fn test_run_mode_from_arg() {
        assert_eq!(RunMode::from_arg(Some("store")), RunMode::Store);
        assert_eq!(RunMode::from_arg(Some("loop")), RunMode::Loop);
        assert_eq!(RunMode::from_arg(None), RunMode::Loop);
    }

    #[test]
    fn test_screensaver_skips() {
        let skipped: Vec<u64> = (0..6).filter(|&n| skip_weather(n, 3)).collect();
        assert_eq!(skipped, vec![0, 3]);
        assert!((0..10).all(|n| !skip_weather(n, 0)));
    }

    #[test]
    fn test_remaining() {
        assert_eq!(remaining(Duration::from_millis(300)), Some(Duration::from_millis(700)));
        assert_eq!(remaining(Duration::from_secs(1)), None);
        assert_eq!(remaining(Duration::from_millis(1800)), None);
    }

    #[tokio::test]
    async fn test_tick_pushes_frame_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let weather = StubSource::with_days(vec![day(500, "10d", 3.4, 7.9, 5.0)]);
        let mut sched = scheduler(dir.path(), weather.clone(), 3);
        let mut driver = MockDriver::new();

        let mut reports = Vec::new();
        for s in 0..6 {
            reports.push(sched.tick_at(&mut driver, local(7, 5, s)).await.unwrap());
        }

        let skipped: Vec<bool> = reports.iter().map(|r| r.skipped_weather).collect();
        assert_eq!(skipped, vec![true, false, false, true, false, false]);
        assert!(reports[0].fetched);
        assert!(reports[1..].iter().all(|r| !r.fetched));
        assert_eq!(weather.calls(), 1);
        assert_eq!(sched.loop_count(), 6);
        assert_eq!(driver.state().lock().unwrap().pushes, 6);
        // last pushed frame matches the canvas
        assert_eq!(driver.state().lock().unwrap().frame, sched.canvas().to_packed_bytes());
    }

    #[tokio::test]
    async fn test_weather_failure_still_pushes() {
        let dir = tempfile::tempdir().unwrap();
        let weather = StubSource { fail: true, ..Default::default() };
        let mut sched = scheduler(dir.path(), weather, 0);
        let mut driver = MockDriver::new();

        let report = sched.tick_at(&mut driver, local(12, 0, 0)).await.unwrap();
        assert!(!report.fetched);
        assert_eq!(driver.state().lock().unwrap().pushes, 1);
        assert!(driver.is_on(4, 0));
    }

    #[tokio::test]
    async fn test_unreadable_symbol_and_degree_still_push() {
        let dir = tempfile::tempdir().unwrap();
        let weather = StubSource::with_days(vec![day(500, "10d", 3.4, 7.9, 5.0)]);
        let mut sched = scheduler(dir.path(), weather, 0);
        std::fs::write(dir.path().join("minus.png"), b"not a png").unwrap();
        std::fs::write(dir.path().join("degree.png"), b"not a png").unwrap();
        let mut driver = MockDriver::new();

        sched.tick_at(&mut driver, local(7, 5, 30)).await.unwrap();

        assert_eq!(driver.state().lock().unwrap().pushes, 1);
        assert!(driver.is_on(4, 0));
        // readouts drawn, symbol slot and degree marks left dark
        assert!(driver.is_on(66, 31));
        assert!(!driver.is_on(72, 27));
        assert!((111..118).all(|x| (0..7).all(|y| !driver.is_on(x, y))));
    }

    #[tokio::test]
    async fn test_push_failure_is_device_fault() {
        let dir = tempfile::tempdir().unwrap();
        let mut sched = scheduler(dir.path(), StubSource::default(), 0);
        let mut driver = MockDriver::new();
        driver.state().lock().unwrap().fail_push = true;

        let err = sched.tick_at(&mut driver, local(9, 0, 0)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::DeviceFault(_)));
        assert_eq!(sched.loop_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_paces_once_a_second() {
        let dir = tempfile::tempdir().unwrap();
        let mut sched = scheduler(dir.path(), StubSource::default(), 0);
        let mut driver = MockDriver::new();
        let state = driver.state();

        let ran = tokio::time::timeout(Duration::from_millis(3500), sched.run_loop(&mut driver)).await;
        assert!(ran.is_err(), "loop only ends on error");
        assert_eq!(state.lock().unwrap().pushes, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_ends_on_device_fault() {
        let dir = tempfile::tempdir().unwrap();
        let mut sched = scheduler(dir.path(), StubSource::default(), 0);
        let mut driver = MockDriver::new();
        driver.state().lock().unwrap().fail_push = true;

        let result = sched.run_loop(&mut driver).await;
        assert!(matches!(result, Err(SchedulerError::DeviceFault(_))));
    }

    #[tokio::test]
    async fn test_store_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let weather = StubSource::with_days(vec![day(800, "01d", 1.0, 2.0, 3.0)]);
        let mut sched = scheduler(dir.path(), weather, 0);
        let out = dir.path().join("current.png");

        sched.store_at(&out, local(7, 5, 30)).await.unwrap();

        let img = image::open(&out).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (128, 32));
        assert_eq!(img.get_pixel(4, 0).0[0], 255);
        assert_eq!(img.get_pixel(29, 31).0[0], 255);
        assert_eq!(img.get_pixel(30, 31).0[0], 0);
    }
}
