/*
 *  lib.rs
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

//! Clock, seconds bar and daily weather on a 128x32 SSD1306.

pub mod constants;
pub mod config;
pub mod canvas;
pub mod sprites;
pub mod condition;
pub mod weather;
pub mod icons;
pub mod display;
pub mod scheduler;
pub mod func_timer;
