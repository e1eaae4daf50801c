//! Screenshot artifact discovery, timestamp recovery, and cropping.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::VisionError;

const SCREENSHOT_PREFIX: &str = "timeline_";
const SCREENSHOT_EXT: &str = ".png";

/// Crop region believed to contain the trends / who-to-follow panel.
const CROP_WIDTH: u32 = 1260;
const CROP_HEIGHT: u32 = 1600;

/// Finds the most recently modified `timeline_*.png` in `dir`.
///
/// Returns `Ok(None)` when the directory is missing or holds no matching
/// file; the stage treats that as a no-op success.
///
/// # Errors
///
/// Returns [`VisionError::Io`] if the directory exists but cannot be read.
pub fn find_latest_screenshot(dir: &Path) -> Result<Option<PathBuf>, VisionError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(SCREENSHOT_PREFIX) || !name.ends_with(SCREENSHOT_EXT) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        if latest.as_ref().is_none_or(|(best, _)| modified > *best) {
            latest = Some((modified, entry.path()));
        }
    }

    Ok(latest.map(|(_, path)| path))
}

/// Recovers the capture timestamp from a screenshot filename.
///
/// Accepts `timeline_YYYYMMDD_HHMMSS.png` and the older date-only
/// `timeline_YYYYMMDD.png` form. Returns `None` for anything else; the
/// caller falls back to the current time.
#[must_use]
pub fn timestamp_from_filename(name: &str) -> Option<DateTime<Utc>> {
    let stem = name
        .strip_prefix(SCREENSHOT_PREFIX)?
        .strip_suffix(SCREENSHOT_EXT)?;

    let naive = if stem.len() == 8 {
        NaiveDate::parse_from_str(stem, "%Y%m%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
    } else {
        NaiveDateTime::parse_from_str(stem, "%Y%m%d_%H%M%S").ok()?
    };

    Some(naive.and_utc())
}

/// Crops the screenshot to the panel region and writes the result as
/// `processed_<name>` under `processed_dir`.
///
/// The crop clamps to the image bounds, so undersized screenshots pass
/// through whole.
///
/// # Errors
///
/// Returns [`VisionError::Image`] if the file cannot be decoded or
/// re-encoded, or [`VisionError::Io`] on filesystem failures.
pub(crate) fn crop_screenshot(source: &Path, processed_dir: &Path) -> Result<PathBuf, VisionError> {
    let img = image::open(source)?;
    let cropped = img.crop_imm(0, 0, CROP_WIDTH, CROP_HEIGHT);

    let name = source
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("screenshot.png");
    let target = processed_dir.join(format!("processed_{name}"));
    cropped.save(&target)?;

    tracing::info!(path = %target.display(), "cropped screenshot saved");
    Ok(target)
}
