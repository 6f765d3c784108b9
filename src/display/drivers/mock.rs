/*
 *  display/drivers/mock.rs
 *
 *  dailyclock - 128x32 daily clock
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock display driver for running without hardware
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

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};

use std::sync::{Arc, Mutex, MutexGuard};

/// Stand-in panel for tests and builds without a real driver.
///
/// Keeps the last pushed frame and counts every call. The log sits behind an
/// `Arc` so a test keeps its handle after the driver is boxed.
#[derive(Debug, Clone)]
pub struct MockDriver {
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<PanelLog>>,
}

/// What the stand-in panel has been asked to do
#[derive(Debug, Default)]
pub struct PanelLog {
    pub inits: usize,
    pub flushes: usize,
    pub clears: usize,
    /// Number of frames accepted by write_buffer()
    pub pushes: usize,

    pub last_brightness: Option<u8>,
    pub last_rotation: Option<u16>,
    pub last_invert: Option<bool>,

    pub ready: bool,

    /// Last frame accepted, packed as handed in
    pub frame: Vec<u8>,

    /// Make the next flush or init fail
    pub fail_push: bool,
    pub fail_init: bool,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    pub fn new() -> Self {
        let capabilities = DisplayCapabilities::monochrome(DISPLAY_WIDTH, DISPLAY_HEIGHT);
        let state = PanelLog {
            frame: vec![0; capabilities.frame_len()],
            ..Default::default()
        };
        Self {
            capabilities,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Shared handle on the recorded state
    pub fn state(&self) -> Arc<Mutex<PanelLog>> {
        Arc::clone(&self.state)
    }

    /// Whether pixel (x, y) of the last pushed frame is lit
    pub fn is_on(&self, x: u32, y: u32) -> bool {
        if x >= self.capabilities.width || y >= self.capabilities.height {
            return false;
        }
        let idx = (y * self.capabilities.width + x) as usize;
        self.lock().frame[idx / 8] & (1 << (idx % 8)) != 0
    }

    pub fn count_on_pixels(&self) -> usize {
        self.lock().frame.iter().map(|b| b.count_ones() as usize).sum()
    }

    // a poisoned lock only means another test thread panicked mid-update
    fn lock(&self) -> MutexGuard<'_, PanelLog> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();

        if state.fail_init {
            return Err(DisplayError::InitFailed("simulated".to_string()));
        }

        state.inits += 1;
        state.ready = true;
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.lock().last_brightness = Some(value);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();

        if state.fail_push {
            return Err(DisplayError::PushFailed("simulated".to_string()));
        }

        state.flushes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        {
            let mut state = self.lock();
            state.clears += 1;
            state.frame.fill(0);
        }
        self.flush()
    }

    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected = self.capabilities.frame_len();
        if buffer.len() != expected {
            return Err(DisplayError::FrameSize {
                expected,
                actual: buffer.len(),
            });
        }

        {
            let mut state = self.lock();
            state.frame.copy_from_slice(buffer);
            state.pushes += 1;
        }

        self.flush()
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        self.lock().last_invert = Some(inverted);
        Ok(())
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        if !matches!(degrees, 0 | 90 | 180 | 270) {
            return Err(DisplayError::BadRotation(degrees));
        }
        self.lock().last_rotation = Some(degrees);
        Ok(())
    }
}
