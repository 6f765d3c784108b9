/*
 *  main.rs
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

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};

use dailyclock::config::{self, Cli};
use dailyclock::display::{open_display, FrameComposer};
use dailyclock::icons::{HttpIconSource, IconPipeline};
use dailyclock::scheduler::{RunMode, Scheduler};
use dailyclock::sprites::SpriteAtlas;
use dailyclock::weather::{OpenWeatherClient, WeatherCache};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP and names the one that arrived.
async fn signal_handler() -> std::io::Result<&'static str> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sighup.recv() => "SIGHUP",
    };
    Ok(name)
}

fn debug_from_env() -> bool {
    std::env::var("DEBUG")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load(&cli).context("loading configuration")?;

    let debug_enabled = cli.debug || debug_from_env();
    let level = if debug_enabled { "debug" } else { config.log_level.as_deref().unwrap_or("info") };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if cli.dump_config {
        println!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let query = config.weather_query();
    if query.api_key.is_empty() {
        warn!("No api_key configured, weather can only come from the local cache");
    }

    let timeout = config.http_timeout();
    let client = OpenWeatherClient::new(config.weather_url(), timeout)?;
    let cache = WeatherCache::load(client, query, config.cache_file());
    let icons = IconPipeline::new(HttpIconSource::new(config.icon_base_url(), timeout)?, config.icon_dir());
    let composer = FrameComposer::new(SpriteAtlas::new(config.sprite_dir()), icons, config.time_format());
    let mut scheduler = Scheduler::new(cache, composer, config.screensaver());

    match RunMode::from_arg(cli.mode.as_deref()) {
        RunMode::Store => {
            let path = config.store_path();
            scheduler.store_once(&path).await
                .with_context(|| format!("storing frame to {}", path.display()))?;
        }
        RunMode::Loop => {
            let mut display = open_display(&config.display()).context("opening display")?;

            let outcome = tokio::select! {
                signalled = signal_handler() => {
                    let name = signalled.context("installing signal handlers")?;
                    info!("{} received. Initiating graceful shutdown.", name);
                    Ok(())
                }
                ended = scheduler.run_loop(display.as_mut()) => ended,
            };

            if let Err(e) = display.clear() {
                warn!("Could not clear display on exit: {}", e);
            }
            if let Err(e) = outcome {
                error!("Clock loop stopped: {}", e);
                return Err(e.into());
            }
            info!("Stopped after {} ticks", scheduler.loop_count());
        }
    }

    Ok(())
}
