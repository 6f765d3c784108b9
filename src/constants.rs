//! This module contains global constants used across the display and other modules.

/// The total width of the OLED display in pixels.
pub const DISPLAY_WIDTH: u32 = 128;
/// The total height of the OLED display in pixels.
pub const DISPLAY_HEIGHT: u32 = 32;

// Clock block
/// X-offset of the first clock digit.
pub const CLOCK_X_OFFSET: i32 = 4;
/// Y-offset of the clock digits (top aligned).
pub const CLOCK_Y_OFFSET: i32 = 0;
/// Horizontal gap after every clock glyph, colon included.
pub const CLOCK_GLYPH_GAP: i32 = 2;

// Seconds progress bar
/// Row the seconds bar is drawn on.
pub const PROGRESS_BAR_Y_POS: i32 = DISPLAY_HEIGHT as i32 - 1;
/// Length of the seconds track, second 59 fills it completely.
pub const PROGRESS_TRACK_WIDTH: u32 = 59;
/// Highest value of seconds-of-minute.
pub const PROGRESS_MAX_SECOND: u32 = 59;

// Weather block
/// Left edge of the weather region, also the origin of the first temperature.
pub const WEATHER_START_X: i32 = 66;
/// Gap between the weather icon and the condition symbol.
pub const WEATHER_ICON_SYMBOL_GAP: i32 = 2;
/// Gap between small readout glyphs.
pub const SMALL_GLYPH_GAP: i32 = 1;

/// Normalized icon width after the icon pipeline.
pub const ICON_WIDTH: u32 = 34;
/// Normalized icon height after the icon pipeline.
pub const ICON_HEIGHT: u32 = 27;
/// Luminance threshold used to binarize icons (above -> white).
pub const ICON_LUMA_THRESHOLD: f32 = 200.0;

/// Local hour from which the morning readout moves to the second reading.
pub const MORNING_END_HOUR: u32 = 12;
/// Local hour from which evening + tomorrow morning are shown.
pub const EVENING_START_HOUR: u32 = 20;

/// Weather cache time to live, seconds.
pub const WEATHER_CACHE_TTL_SECS: f64 = 900.0;

/// Nominal tick length, seconds.
pub const TICK_SECS: f64 = 1.0;

pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/onecall";
pub const DEFAULT_ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));
