/*
 *  icons.rs
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

//! Weather icons: download once, normalize to a 34x27 one bit glyph, keep forever.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{imageops, DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use log::{debug, info, warn};
use reqwest::{header, Client};
use thiserror::Error;

use crate::constants::{ICON_HEIGHT, ICON_LUMA_THRESHOLD, ICON_WIDTH, USER_AGENT};

#[derive(Debug, Error)]
pub enum IconError {
    #[error("icon '{id}' download failed: {reason}")]
    IconFetchFailed { id: String, reason: String },
    #[error("icon id '{0}' is not a plain file name")]
    InvalidId(String),
    #[error("icon '{id}' could not be decoded: {source}")]
    Decode {
        id: String,
        #[source]
        source: image::ImageError,
    },
    #[error("icon cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where raw icon bytes come from.
#[allow(async_fn_in_trait)]
pub trait IconSource {
    async fn download(&self, icon_id: &str) -> Result<Vec<u8>, IconError>;
}

/// Fetches `<base_url>/<icon_id>.png` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIconSource {
    base_url: String,
    client: Client,
}

impl HttpIconSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(USER_AGENT));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client })
    }

    pub fn url_for(&self, icon_id: &str) -> String {
        format!("{}/{}.png", self.base_url, icon_id)
    }
}

impl IconSource for HttpIconSource {
    async fn download(&self, icon_id: &str) -> Result<Vec<u8>, IconError> {
        let fetch_failed = |e: reqwest::Error| IconError::IconFetchFailed {
            id: icon_id.to_string(),
            reason: e.to_string(),
        };
        let bytes = self.client
            .get(self.url_for(icon_id))
            .send()
            .await
            .map_err(fetch_failed)?
            .error_for_status()
            .map_err(fetch_failed)?
            .bytes()
            .await
            .map_err(fetch_failed)?;
        Ok(bytes.to_vec())
    }
}

/// Create-once icon cache over an icon directory.
pub struct IconPipeline<I: IconSource> {
    source: I,
    dir: PathBuf,
}

impl<I: IconSource> IconPipeline<I> {
    pub fn new(source: I, dir: impl Into<PathBuf>) -> Self {
        Self { source, dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source(&self) -> &I {
        &self.source
    }

    /// Local path for an icon id, rejecting anything that is not a bare name.
    pub fn path_for(&self, icon_id: &str) -> Result<PathBuf, IconError> {
        if icon_id.is_empty()
            || icon_id.contains(['/', '\\'])
            || icon_id.starts_with('.')
        {
            return Err(IconError::InvalidId(icon_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.png", icon_id)))
    }

    /// Path of the normalized icon, downloading and converting it on first use.
    ///
    /// An existing file is trusted as already normalized.
    pub async fn ensure(&self, icon_id: &str) -> Result<PathBuf, IconError> {
        let path = self.path_for(icon_id)?;
        if path.is_file() {
            return Ok(path);
        }

        debug!("Icon '{}' not cached, downloading", icon_id);
        let bytes = self.source.download(icon_id).await?;
        let raw = image::load_from_memory(&bytes)
            .map_err(|source| IconError::Decode { id: icon_id.to_string(), source })?;
        let glyph = normalize_icon(&raw);

        // only a finished glyph ever carries the final name
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("png.tmp");
        let written = glyph
            .save_with_format(&tmp, image::ImageFormat::Png)
            .map_err(|source| IconError::Decode { id: icon_id.to_string(), source })
            .and_then(|_| fs::rename(&tmp, &path).map_err(IconError::from));
        if let Err(e) = written {
            if let Err(rm) = fs::remove_file(&tmp) {
                warn!("Could not remove partial icon {}: {}", tmp.display(), rm);
            }
            return Err(e);
        }
        info!("Cached icon '{}' at {}", icon_id, path.display());
        Ok(path)
    }
}

/// Crop, center, flatten, binarize and invert a provider icon.
///
/// The result is `ICON_WIDTH x ICON_HEIGHT`, luma 255 where the glyph is.
pub fn normalize_icon(raw: &DynamicImage) -> GrayImage {
    let rgba = raw.to_rgba8();
    let cropped = crop_to_content(&rgba);
    let fitted = fit_within(cropped, ICON_WIDTH, ICON_HEIGHT);

    let mut centered = RgbaImage::from_pixel(ICON_WIDTH, ICON_HEIGHT, Rgba([0, 0, 0, 0]));
    let x = (ICON_WIDTH - fitted.width()) / 2;
    let y = (ICON_HEIGHT - fitted.height()) / 2;
    imageops::overlay(&mut centered, &fitted, x as i64, y as i64);

    GrayImage::from_fn(ICON_WIDTH, ICON_HEIGHT, |x, y| {
        let luma = flattened_luma(centered.get_pixel(x, y));
        // binarize, then invert so the dark glyph lights up
        let white = luma > ICON_LUMA_THRESHOLD;
        if white { Luma([0]) } else { Luma([255]) }
    })
}

/// Luma of a pixel composited onto a white background
fn flattened_luma(p: &Rgba<u8>) -> f32 {
    let [r, g, b, a] = p.0;
    let alpha = a as f32 / 255.0;
    let over_white = |c: u8| c as f32 * alpha + 255.0 * (1.0 - alpha);
    0.299 * over_white(r) + 0.587 * over_white(g) + 0.114 * over_white(b)
}

/// Bounding box of the non transparent pixels; the whole image if there are none.
fn crop_to_content(img: &RgbaImage) -> RgbaImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in img.enumerate_pixels() {
        if p.0[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    match bounds {
        Some((x0, y0, x1, y1)) => imageops::crop_imm(img, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image(),
        None => img.clone(),
    }
}

/// Shrink (never grow) to fit the box, keeping the aspect ratio
fn fit_within(img: RgbaImage, max_w: u32, max_h: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w <= max_w && h <= max_h {
        return img;
    }
    // integer math so the limiting side lands exactly on the box edge
    let (nw, nh) = if w as u64 * max_h as u64 >= h as u64 * max_w as u64 {
        (max_w, (h as u64 * max_w as u64 / w as u64) as u32)
    } else {
        ((w as u64 * max_h as u64 / h as u64) as u32, max_h)
    };
    imageops::resize(&img, nw.max(1), nh.max(1), imageops::FilterType::Triangle)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_ensure_downloads_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let icons = StubIcons::default();
        let pipeline = IconPipeline::new(icons.clone(), dir.path().join("icons"));

        let path = pipeline.ensure("10d").await.unwrap();
        assert_eq!(path, dir.path().join("icons").join("10d.png"));
        assert_eq!(icons.calls(), 1);

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (ICON_WIDTH, ICON_HEIGHT));
        // 10x8 glyph centered in 34x27: x 12..22, y 9..17
        let lit: Vec<(u32, u32)> = img.enumerate_pixels().filter(|(_, _, p)| p.0[0] == 255).map(|(x, y, _)| (x, y)).collect();
        assert_eq!(lit.len(), 80);
        assert!(lit.iter().all(|&(x, y)| (12..22).contains(&x) && (9..17).contains(&y)));
        assert!(img.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let icons = StubIcons::default();
        let pipeline = IconPipeline::new(icons.clone(), dir.path());

        let first = pipeline.ensure("01d").await.unwrap();
        let content = std::fs::read(&first).unwrap();
        let second = pipeline.ensure("01d").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), content);
        assert_eq!(icons.calls(), 1);
    }

    #[tokio::test]
    async fn test_existing_file_is_trusted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02n.png"), b"anything").unwrap();
        let icons = StubIcons::default();
        let pipeline = IconPipeline::new(icons.clone(), dir.path());

        pipeline.ensure("02n").await.unwrap();
        assert_eq!(icons.calls(), 0);
        assert_eq!(std::fs::read(dir.path().join("02n.png")).unwrap(), b"anything");
    }

    #[tokio::test]
    async fn test_download_failure_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let icons = StubIcons { fail: true, ..Default::default() };
        let pipeline = IconPipeline::new(icons.clone(), dir.path());

        let err = pipeline.ensure("09d").await.unwrap_err();
        assert!(matches!(err, IconError::IconFetchFailed { .. }));
        assert!(!dir.path().join("09d.png").exists());
    }

    #[tokio::test]
    async fn test_undecodable_download_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let icons = StubIcons { corrupt: true, ..Default::default() };
        let pipeline = IconPipeline::new(icons.clone(), dir.path().join("icons"));

        let err = pipeline.ensure("04d").await.unwrap_err();
        assert!(matches!(err, IconError::Decode { .. }));
        // neither the final name nor a temp file is left to be trusted later
        let left = std::fs::read_dir(dir.path().join("icons"))
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(left, 0);

        // a later good download still lands
        let pipeline = IconPipeline::new(StubIcons::default(), dir.path().join("icons"));
        pipeline.ensure("04d").await.unwrap();
        assert!(dir.path().join("icons").join("04d.png").is_file());
        assert!(!dir.path().join("icons").join("04d.png.tmp").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = IconPipeline::new(StubIcons::default(), dir.path());
        assert!(matches!(pipeline.ensure("../etc").await, Err(IconError::InvalidId(_))));
        assert!(matches!(pipeline.ensure("").await, Err(IconError::InvalidId(_))));
    }

    #[test]
    fn test_large_icon_is_shrunk_to_fit() {
        let img = RgbaImage::from_pixel(80, 60, Rgba([0, 0, 0, 255]));
        let out = normalize_icon(&DynamicImage::ImageRgba8(img));
        assert_eq!(out.dimensions(), (ICON_WIDTH, ICON_HEIGHT));
        // 80x60 scales to 34x25, one row free above and below
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(0, 1).0[0], 255);
        assert_eq!(out.get_pixel(33, 25).0[0], 255);
        assert_eq!(out.get_pixel(0, 26).0[0], 0);
    }

    #[test]
    fn test_light_pixels_drop_out() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        img.put_pixel(0, 0, Rgba([250, 250, 250, 255]));
        img.put_pixel(3, 3, Rgba([10, 10, 10, 255]));
        let out = normalize_icon(&DynamicImage::ImageRgba8(img));
        let lit = out.pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(lit, 1);
    }
}
