use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use image::ImageFormat;
use image::imageops::FilterType;
use tempfile::Builder;

use crate::error::ScraperError;
use crate::flickr::ImageSource;
use crate::store::IMAGE_TEMP_PREFIX;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizePolicy {
    pub min_dim: Option<u32>,
    pub resize_to: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Saved {
        path: Utf8PathBuf,
        width: u32,
        height: u32,
    },
    Rejected {
        width: u32,
        height: u32,
    },
}

impl SizePolicy {
    pub fn accepts(&self, width: f64, height: f64) -> bool {
        match self.min_dim {
            Some(min) => {
                let min = f64::from(min);
                width >= min && height >= min
            }
            None => true,
        }
    }

    /// Output dimensions when a resize target is set. The scale is the
    /// smaller of the two side ratios, so the smaller side ends up at
    /// `resize_to` and the larger one keeps the aspect ratio.
    pub fn target_dimensions(&self, width: f64, height: f64) -> Option<(u32, u32)> {
        let target = f64::from(self.resize_to.filter(|value| *value > 0)?);
        let scale = (width / target).min(height / target);
        let new_width = (width / scale) as u32;
        let new_height = (height / scale) as u32;
        Some((new_width.max(1), new_height.max(1)))
    }
}

pub fn fetch_and_maybe_resize<S>(
    source: &S,
    url: &str,
    destination: &Utf8Path,
    policy: &SizePolicy,
) -> Result<ImageOutcome, ScraperError>
where
    S: ImageSource + ?Sized,
{
    let bytes = source.download(url)?;
    process_image(&bytes, destination, policy)
}

/// Nothing is written on rejection; the format follows the extension of
/// `destination`.
pub fn process_image(
    bytes: &[u8],
    destination: &Utf8Path,
    policy: &SizePolicy,
) -> Result<ImageOutcome, ScraperError> {
    let format = ImageFormat::from_path(destination.as_std_path())
        .map_err(|err| ScraperError::ImageEncode(format!("{destination}: {err}")))?;
    let mut img =
        image::load_from_memory(bytes).map_err(|err| ScraperError::ImageDecode(err.to_string()))?;
    let (width, height) = (f64::from(img.width()), f64::from(img.height()));

    if !policy.accepts(width, height) {
        return Ok(ImageOutcome::Rejected {
            width: img.width(),
            height: img.height(),
        });
    }

    if let Some((new_width, new_height)) = policy.target_dimensions(width, height) {
        img = img.resize_exact(new_width, new_height, FilterType::Lanczos3);
    }

    let parent = destination
        .parent()
        .ok_or_else(|| ScraperError::Filesystem(format!("invalid destination {destination}")))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
    let suffix = destination
        .extension()
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let temp = Builder::new()
        .prefix(IMAGE_TEMP_PREFIX)
        .suffix(&suffix)
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
    img.save_with_format(temp.path(), format)
        .map_err(|err| ScraperError::ImageEncode(err.to_string()))?;
    temp.persist(destination.as_std_path())
        .map_err(|err| ScraperError::Filesystem(err.to_string()))?;

    Ok(ImageOutcome::Saved {
        path: destination.to_path_buf(),
        width: img.width(),
        height: img.height(),
    })
}
