/*
 *  sprites.rs
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

use std::path::{Path, PathBuf};
use std::sync::Arc;

use embedded_graphics::image::ImageRaw;
use embedded_graphics::pixelcolor::BinaryColor;
use image::GrayImage;
use log::debug;
use mini_moka::sync::Cache;
use thiserror::Error;

/// Glyphs are stored as PNG, one file per name.
const SPRITE_EXT: &str = "png";
/// Luma at or below this is background.
const SPRITE_ON_LEVEL: u8 = 127;
/// Upper bound on distinct sprites held (digits, small digits, symbols, icons).
const ATLAS_CAPACITY: u64 = 64;

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("sprite '{0}' not found")]
    AssetMissing(String),
    #[error("sprite '{name}' could not be decoded: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

impl SpriteError {
    pub fn is_missing(&self) -> bool {
        matches!(self, SpriteError::AssetMissing(_))
    }
}

/// An immutable 1-bit glyph.
///
/// Pixels are packed MSB first with rows padded to a whole byte, which is the
/// layout `ImageRaw<BinaryColor>` reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    name: String,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Sprite {
    /// Build from a grayscale image, luma above mid-grey is on.
    pub fn from_gray(name: &str, img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        let stride = width.div_ceil(8) as usize;
        let mut data = vec![0u8; stride * height as usize];
        for (x, y, px) in img.enumerate_pixels() {
            if px.0[0] > SPRITE_ON_LEVEL {
                data[y as usize * stride + (x / 8) as usize] |= 0x80 >> (x % 8);
            }
        }
        Self { name: name.to_string(), width, height, data }
    }

    /// Decode a PNG from disk.
    pub fn open(name: &str, path: &Path) -> Result<Self, SpriteError> {
        if !path.is_file() {
            return Err(SpriteError::AssetMissing(name.to_string()));
        }
        let img = image::open(path)
            .map_err(|source| SpriteError::Decode { name: name.to_string(), source })?;
        Ok(Self::from_gray(name, &img.to_luma8()))
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_on(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let stride = self.width.div_ceil(8) as usize;
        self.data[y as usize * stride + (x / 8) as usize] & (0x80 >> (x % 8)) != 0
    }

    pub fn raw(&self) -> ImageRaw<'_, BinaryColor> {
        ImageRaw::<BinaryColor>::new(&self.data, self.width)
    }
}

/// Sprite name for a large clock glyph.
pub fn digit_name(c: char) -> String {
    match c {
        ':' => "colon".to_string(),
        _ => c.to_string(),
    }
}

/// Sprite name for a small readout glyph; kept apart from the clock digits.
pub fn small_name(c: char) -> String {
    match c {
        '-' => "sminus".to_string(),
        _ => format!("s{}", c),
    }
}

pub const DEGREE_SPRITE: &str = "degree";

/// Lazily loaded, name-keyed sprite store backed by a sprite directory.
///
/// Absent files are remembered as `None`, so a glyph that does not ship is
/// looked for on disk once. Undecodable files are not remembered.
#[derive(Clone)]
pub struct SpriteAtlas {
    dir: PathBuf,
    cache: Cache<String, Option<Arc<Sprite>>>,
}

impl SpriteAtlas {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Cache::new(ATLAS_CAPACITY),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, SPRITE_EXT))
    }

    /// Sprite by name; the first access reads the file, later ones hit the cache.
    pub fn lookup(&self, name: &str) -> Result<Arc<Sprite>, SpriteError> {
        let key = name.to_string();
        match self.cache.get(&key) {
            Some(Some(sprite)) => return Ok(sprite),
            Some(None) => return Err(SpriteError::AssetMissing(key)),
            None => {}
        }
        match Sprite::open(name, &self.path_for(name)) {
            Ok(sprite) => {
                let sprite = Arc::new(sprite);
                debug!("Loaded sprite '{}' ({}x{})", name, sprite.width(), sprite.height());
                self.cache.insert(key, Some(Arc::clone(&sprite)));
                Ok(sprite)
            }
            Err(e) => {
                if e.is_missing() {
                    self.cache.insert(key, None);
                }
                Err(e)
            }
        }
    }

    pub fn dimensions(&self, name: &str) -> Result<(u32, u32), SpriteError> {
        Ok(self.lookup(name)?.dimensions())
    }

    pub fn digit(&self, c: char) -> Result<Arc<Sprite>, SpriteError> {
        self.lookup(&digit_name(c))
    }

    pub fn small(&self, c: char) -> Result<Arc<Sprite>, SpriteError> {
        self.lookup(&small_name(c))
    }
}
