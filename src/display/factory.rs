/*
 *  display/factory.rs
 *
 *  dailyclock - 128x32 daily clock
 *  (c) 2020-26 Stuart Hunter
 *
 *  Open, initialize and configure the panel
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
use crate::display::traits::DisplayDriver;

#[cfg(feature = "driver-ssd1306")]
use crate::display::drivers::ssd1306::Ssd1306Driver;

#[cfg(not(feature = "driver-ssd1306"))]
use crate::display::drivers::mock::MockDriver;
#[cfg(not(feature = "driver-ssd1306"))]
use log::warn;

/// Type alias for boxed display driver trait objects
pub type BoxedDriver = Box<dyn DisplayDriver>;

/// Open the configured panel, bring it up and apply brightness, invert and rotation.
pub fn open_display(config: &DisplayConfig) -> Result<BoxedDriver, DisplayError> {
    let driver = create_driver(config)?;
    prepare(driver, config)
}

/// `init` followed by the config knobs, for any driver
pub fn prepare(mut driver: BoxedDriver, config: &DisplayConfig) -> Result<BoxedDriver, DisplayError> {
    driver.init()?;
    driver.apply_config(config)?;
    driver.clear()?;
    Ok(driver)
}

#[cfg(feature = "driver-ssd1306")]
fn create_driver(config: &DisplayConfig) -> Result<BoxedDriver, DisplayError> {
    Ok(Box::new(Ssd1306Driver::new_i2c(config.bus(), config.address())?))
}

#[cfg(not(feature = "driver-ssd1306"))]
fn create_driver(config: &DisplayConfig) -> Result<BoxedDriver, DisplayError> {
    warn!(
        "Built without a panel driver, frames for {} @ 0x{:02X} are discarded",
        config.bus(),
        config.address()
    );
    Ok(Box::new(MockDriver::new()))
}
