/*
 *  condition.rs
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

/// Intensity glyph drawn next to the weather icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionSymbol {
    MinusMinus,
    Minus,
    Neutral,
    Plus,
    PlusPlus,
    Exclamation,
    Unknown,
}

impl ConditionSymbol {
    /// Sprite name for the symbol, Neutral and Unknown ship without a glyph
    /// but are looked up all the same.
    pub fn sprite_name(&self) -> &'static str {
        match self {
            ConditionSymbol::MinusMinus => "minus_minus",
            ConditionSymbol::Minus => "minus",
            ConditionSymbol::Neutral => "neutral",
            ConditionSymbol::Plus => "plus",
            ConditionSymbol::PlusPlus => "plus_plus",
            ConditionSymbol::Exclamation => "exclamation",
            ConditionSymbol::Unknown => "unknown",
        }
    }
}

use ConditionSymbol::{Exclamation as X, Minus as M, Neutral as N, Plus as P, PlusPlus as PP};

/// OpenWeatherMap condition ids and their intensity bucket.
/// No provider code currently maps to MinusMinus.
pub const CONDITION_TABLE: &[(i64, ConditionSymbol)] = &[
    // 2xx thunderstorm
    (200, M), (201, N), (202, P), (210, M), (211, N), (212, P), (221, P), (230, M), (231, N), (232, P),
    // 3xx drizzle
    (300, M), (301, N), (302, P), (310, M), (311, N), (312, P), (313, N), (314, P), (321, N),
    // 5xx rain
    (500, M), (501, N), (502, P), (503, PP), (504, X), (511, X), (520, P), (521, PP), (522, X), (531, N),
    // 6xx snow
    (600, M), (601, N), (602, P), (611, PP), (612, P), (613, PP), (615, PP), (616, X), (620, P), (621, PP),
    (622, X),
    // 7xx atmosphere
    (701, M), (711, M), (721, N), (731, N), (741, N), (751, P), (761, P), (762, PP), (771, PP), (781, X),
    // 800 clear
    (800, N),
    // 80x clouds
    (801, M), (802, N), (803, P), (804, PP),
];

/// First matching bucket for `code`, Unknown when the table has no entry.
pub fn classify(code: i64) -> ConditionSymbol {
    CONDITION_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, symbol)| *symbol)
        .unwrap_or(ConditionSymbol::Unknown)
}
