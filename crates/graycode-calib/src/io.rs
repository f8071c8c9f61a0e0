//! Reading captures from disk and writing patterns and masks back.
//!
//! Captures are converted to 8-bit intensity on load. Single-channel images
//! are used as stored; anything else goes through BT.601 luma so colour
//! cameras produce the same values regardless of the decoder backing `image`.

use crate::core::{self, ChannelOrder, ColorImageView, GrayImage};
use crate::decode::{GrayCodePattern, Mask};
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Errors produced while loading or saving frames.
#[derive(thiserror::Error, Debug)]
pub enum FrameIoError {
    #[error("failed to read or write {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("failed to list {path}")]
    Dir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no image files found in {0}")]
    EmptyDir(PathBuf),

    #[error("image {path} is too large ({width}x{height})")]
    TooLarge {
        path: PathBuf,
        width: usize,
        height: usize,
    },

    #[error(transparent)]
    Buffer(#[from] core::ImageError),
}

/// Convert an `image::GrayImage` into the core view type.
pub fn gray_view(img: &::image::GrayImage) -> core::GrayImageView<'_> {
    core::GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Convert a decoded image of any pixel format into an 8-bit intensity image.
pub fn to_gray(img: ::image::DynamicImage) -> Result<GrayImage, core::ImageError> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    match img {
        ::image::DynamicImage::ImageLuma8(g) => GrayImage::from_raw(w, h, g.into_raw()),
        other => {
            let rgb = other.to_rgb8();
            Ok(ColorImageView::from_slice(w, h, ChannelOrder::Rgb, rgb.as_raw())?.to_gray())
        }
    }
}

/// Load one capture as an intensity image.
pub fn load_frame(path: impl AsRef<Path>) -> Result<GrayImage, FrameIoError> {
    let path = path.as_ref();
    let img = ::image::open(path).map_err(|source| FrameIoError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(to_gray(img)?)
}

/// Load captures in the given order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(paths), fields(frames = paths.len()))
)]
pub fn load_frames<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<GrayImage>, FrameIoError> {
    let frames = paths
        .iter()
        .map(load_frame)
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("loaded {} frames", frames.len());
    Ok(frames)
}

/// Image files directly inside `dir`, sorted by file name.
///
/// Capture tools number their frames, so lexicographic order is the
/// projection order as long as the numbers are zero-padded.
pub fn frame_paths_in_dir(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, FrameIoError> {
    let dir = dir.as_ref();
    let dir_err = |source| FrameIoError::Dir {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(dir_err)? {
        let path = entry.map_err(dir_err)?.path();
        if path.is_file() && has_frame_extension(&path) {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(FrameIoError::EmptyDir(dir.to_path_buf()));
    }
    paths.sort();
    Ok(paths)
}

/// Load every capture in `dir`, sorted by file name.
pub fn load_frames_from_dir(dir: impl AsRef<Path>) -> Result<Vec<GrayImage>, FrameIoError> {
    load_frames(&frame_paths_in_dir(dir)?)
}

/// Save an intensity image; the format follows the file extension.
pub fn save_gray(path: impl AsRef<Path>, img: &GrayImage) -> Result<(), FrameIoError> {
    let path = path.as_ref();
    let too_large = || FrameIoError::TooLarge {
        path: path.to_path_buf(),
        width: img.width,
        height: img.height,
    };
    let w = u32::try_from(img.width).map_err(|_| too_large())?;
    let h = u32::try_from(img.height).map_err(|_| too_large())?;
    ::image::save_buffer(path, &img.data, w, h, ::image::ColorType::L8).map_err(|source| {
        FrameIoError::Image {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Save a mask as a black/white image.
pub fn save_mask(path: impl AsRef<Path>, mask: &Mask) -> Result<(), FrameIoError> {
    save_gray(path, &mask.view().to_owned_image())
}

/// Write the full projected sequence as `frame_000.png`, `frame_001.png`, ...
///
/// Returns the written paths in projection order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(pattern, dir), fields(frames = pattern.frame_count()))
)]
pub fn save_pattern_frames(
    pattern: &GrayCodePattern,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, FrameIoError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|source| FrameIoError::Dir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(pattern.frame_count());
    for index in 0..pattern.frame_count() {
        let Some(frame) = pattern.frame(index) else {
            break;
        };
        let path = dir.join(format!("frame_{index:03}.png"));
        save_gray(&path, &frame)?;
        written.push(path);
    }
    log::info!("wrote {} pattern frames to {}", written.len(), dir.display());
    Ok(written)
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
