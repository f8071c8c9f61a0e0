//! Foreground mask: which camera pixels see the projector.

use crate::filter::gaussian_blur_5x5;
use crate::threshold::otsu_threshold;
use crate::DecodeError;
use graycode_calib_core::{GrayImage, GrayImageView, ImageError};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Value stored for pixels inside the mask.
pub const MASK_ON: u8 = 255;

/// How the white/black difference image is binarised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskThreshold {
    /// Pick the level that best separates lit and unlit pixels.
    Otsu,
    /// Keep pixels whose difference is strictly above this value.
    Fixed(u8),
}

/// Mask extraction parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskParams {
    pub threshold: MaskThreshold,
    /// Smooth the difference image before an automatic threshold.
    /// Ignored for `MaskThreshold::Fixed`.
    pub blur: bool,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            threshold: MaskThreshold::Otsu,
            blur: true,
        }
    }
}

impl MaskParams {
    pub fn fixed(threshold: u8) -> Self {
        Self {
            threshold: MaskThreshold::Fixed(threshold),
            blur: false,
        }
    }
}

/// Binary camera-space mask; `255` inside, `0` outside.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    /// Every pixel inside.
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            image: GrayImage::filled(width, height, MASK_ON),
        }
    }

    /// Build from a predicate evaluated in raster order.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        Self {
            image: GrayImage::from_fn(width, height, |x, y| if f(x, y) { MASK_ON } else { 0 }),
        }
    }

    /// Interpret any non-zero pixel as inside.
    ///
    /// The buffer must hold exactly `width * height` bytes.
    pub fn from_image(image: GrayImage) -> Result<Self, ImageError> {
        let GrayImage {
            width,
            height,
            mut data,
        } = image;
        for v in &mut data {
            if *v != 0 {
                *v = MASK_ON;
            }
        }
        Ok(Self {
            image: GrayImage::from_raw(width, height, data)?,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.image.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.image.height
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.image.view().get(x, y).is_some_and(|v| v != 0)
    }

    /// Raster-index membership test.
    #[inline]
    pub fn contains_index(&self, idx: usize) -> bool {
        self.image.data[idx] != 0
    }

    /// Number of pixels inside the mask.
    pub fn count(&self) -> usize {
        self.image.data.iter().filter(|&&v| v != 0).count()
    }

    /// Fraction of pixels inside the mask.
    pub fn coverage(&self) -> f64 {
        let n = self.image.data.len();
        if n == 0 {
            return 0.0;
        }
        self.count() as f64 / n as f64
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.image.data
    }

    pub fn view(&self) -> GrayImageView<'_> {
        self.image.view()
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }
}

/// Difference `white - black`, saturating at zero.
fn saturating_difference(white: &GrayImageView<'_>, black: &GrayImageView<'_>) -> GrayImage {
    let data = white
        .data
        .iter()
        .zip(black.data)
        .map(|(&w, &b)| w.saturating_sub(b))
        .collect();
    GrayImage {
        width: white.width,
        height: white.height,
        data,
    }
}

fn check_buffer(view: &GrayImageView<'_>) -> Result<(), ImageError> {
    let expected = view.width * view.height;
    if view.data.len() != expected {
        return Err(ImageError::InvalidBuffer {
            expected,
            got: view.data.len(),
        });
    }
    Ok(())
}

/// Extract the projector-lit region from a white and a black reference capture.
///
/// A scene without contrast is not rejected here; it yields a near-empty or
/// near-full mask and the decoder simply finds few usable pixels.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(white, black, params), fields(width = white.width, height = white.height))
)]
pub fn extract_mask(
    white: &GrayImageView<'_>,
    black: &GrayImageView<'_>,
    params: &MaskParams,
) -> Result<Mask, DecodeError> {
    check_buffer(white)?;
    check_buffer(black)?;
    if white.size() != black.size() {
        return Err(DecodeError::FrameSize {
            index: 1,
            expected_width: white.width,
            expected_height: white.height,
            got_width: black.width,
            got_height: black.height,
        });
    }

    let difference = saturating_difference(white, black);
    let (difference, threshold) = match params.threshold {
        MaskThreshold::Fixed(t) => (difference, t),
        MaskThreshold::Otsu => {
            let difference = if params.blur {
                gaussian_blur_5x5(&difference.view())
            } else {
                difference
            };
            let t = otsu_threshold(&difference.data);
            (difference, t)
        }
    };

    let mut image = difference;
    for v in &mut image.data {
        *v = if *v > threshold { MASK_ON } else { 0 };
    }
    let mask = Mask { image };

    log::debug!(
        "mask threshold={} ({:?}) coverage={:.3}",
        threshold,
        params.threshold,
        mask.coverage()
    );
    Ok(mask)
}
