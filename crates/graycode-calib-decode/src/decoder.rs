//! Bit-plane passes over the captured pattern frames.

use crate::bitplane::{bits_for, plane_weight, Axis, PixelState};
use crate::selector::{select_pairs, Correspondences, ErrorHistogram};
use crate::{DecodeError, Mask};
use graycode_calib_core::GrayImageView;
use serde::{Deserialize, Serialize};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Projector resolution in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectorSize {
    pub width: u32,
    pub height: u32,
}

impl ProjectorSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }
}

/// Number of bit planes per axis and the frame count they imply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    pub column_bits: u32,
    pub row_bits: u32,
}

impl FrameLayout {
    /// Widest axis a `u16` coordinate can hold.
    pub const MAX_BITS: u32 = 16;

    pub fn for_projector(size: ProjectorSize) -> Result<Self, DecodeError> {
        let ProjectorSize { width, height } = size;
        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidProjectorSize { width, height });
        }
        let layout = Self {
            column_bits: bits_for(width),
            row_bits: bits_for(height),
        };
        if layout.column_bits > Self::MAX_BITS || layout.row_bits > Self::MAX_BITS {
            return Err(DecodeError::ProjectorTooLarge { width, height });
        }
        Ok(layout)
    }

    /// Layout of a captured sequence with `pattern_frames` frames.
    ///
    /// Column planes follow from the projector width. Every frame after them
    /// is a row plane, so a sequence may carry more row planes than the
    /// projector height needs; rows decoded past the height are dropped when
    /// pairs are selected.
    pub fn for_frames(projector: ProjectorSize, pattern_frames: usize) -> Result<Self, DecodeError> {
        let minimum = Self::for_projector(projector)?;
        if pattern_frames < minimum.pattern_frames() {
            return Err(DecodeError::FrameCount {
                expected: minimum.pattern_frames(),
                got: pattern_frames,
            });
        }
        let remaining = pattern_frames - minimum.column_frames();
        if remaining % 2 != 0 {
            return Err(DecodeError::UnpairedRowFrame { remaining });
        }
        let planes = remaining / 2;
        if planes > Self::MAX_BITS as usize {
            return Err(DecodeError::TooManyRowPlanes { planes });
        }
        Ok(Self {
            column_bits: minimum.column_bits,
            row_bits: planes as u32,
        })
    }

    /// Column pattern frames: a normal and an inverted frame per plane.
    #[inline]
    pub fn column_frames(&self) -> usize {
        2 * self.column_bits as usize
    }

    #[inline]
    pub fn row_frames(&self) -> usize {
        2 * self.row_bits as usize
    }

    /// Pattern frames, excluding the white and black references.
    #[inline]
    pub fn pattern_frames(&self) -> usize {
        self.column_frames() + self.row_frames()
    }
}

/// Decoder parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeParams {
    /// Keep relaxing the error threshold until at least this many pixels pass.
    pub min_point_count: usize,
    /// Differences with `|pattern - inverted| < ambiguity_threshold` mark the
    /// plane as ambiguous for that pixel.
    pub ambiguity_threshold: i16,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            min_point_count: 100,
            ambiguity_threshold: 5,
        }
    }
}

impl DecodeParams {
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.min_point_count == 0 {
            return Err(DecodeError::ZeroMinPointCount);
        }
        if self.ambiguity_threshold <= 0 {
            return Err(DecodeError::NonPositiveAmbiguityThreshold(
                self.ambiguity_threshold,
            ));
        }
        Ok(())
    }
}

/// Turns gray-code pattern captures into camera/projector correspondences.
#[derive(Clone, Debug, Default)]
pub struct GrayCodeDecoder {
    params: DecodeParams,
}

impl GrayCodeDecoder {
    pub fn new(params: DecodeParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &DecodeParams {
        &self.params
    }

    /// Decode `patterns` (column planes then row planes, each as a
    /// normal/inverted pair, MSB first) into point pairs.
    ///
    /// Pixels outside `mask` are never decoded, counted or emitted. The result
    /// is in raster order and may hold fewer than `min_point_count` pairs.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, patterns, mask),
            fields(frames = patterns.len(), projector_w = projector.width, projector_h = projector.height)
        )
    )]
    pub fn decode(
        &self,
        patterns: &[GrayImageView<'_>],
        mask: &Mask,
        projector: ProjectorSize,
    ) -> Result<Correspondences, DecodeError> {
        self.params.validate()?;
        let layout = FrameLayout::for_frames(projector, patterns.len())?;
        log::debug!(
            "decoding {} column and {} row planes",
            layout.column_bits,
            layout.row_bits
        );
        let states = decode_states(patterns, mask, layout, self.params.ambiguity_threshold)?;

        let histogram = ErrorHistogram::from_states(&states, mask);
        let threshold = histogram.select_threshold(self.params.min_point_count);
        let pairs = select_pairs(&states, mask, projector, threshold, histogram);

        log::info!(
            "decoded {} correspondences (histogram {:?}, error threshold {})",
            pairs.len(),
            histogram.counts,
            threshold
        );
        if pairs.len() < self.params.min_point_count {
            log::warn!(
                "only {} correspondences, fewer than the requested {}",
                pairs.len(),
                self.params.min_point_count
            );
        }
        Ok(pairs)
    }
}

/// Run both axis passes and return the per-pixel state buffer (`y * width + x`).
pub fn decode_states(
    patterns: &[GrayImageView<'_>],
    mask: &Mask,
    layout: FrameLayout,
    ambiguity_threshold: i16,
) -> Result<Vec<PixelState>, DecodeError> {
    check_frames(patterns, mask, layout)?;

    let mut states = vec![PixelState::default(); mask.width() * mask.height()];
    let (columns, rows) = patterns.split_at(layout.column_frames());
    run_axis(&mut states, columns, mask, Axis::Column, ambiguity_threshold);
    run_axis(&mut states, rows, mask, Axis::Row, ambiguity_threshold);
    Ok(states)
}

fn check_frames(
    patterns: &[GrayImageView<'_>],
    mask: &Mask,
    layout: FrameLayout,
) -> Result<(), DecodeError> {
    let expected = layout.pattern_frames();
    if patterns.len() != expected {
        return Err(DecodeError::LayoutMismatch {
            expected,
            got: patterns.len(),
        });
    }
    let (width, height) = patterns
        .first()
        .map_or((mask.width(), mask.height()), |f| f.size());
    for (index, frame) in patterns.iter().enumerate() {
        if frame.size() != (width, height) || frame.data.len() != width * height {
            return Err(DecodeError::FrameSize {
                index,
                expected_width: width,
                expected_height: height,
                got_width: frame.width,
                got_height: frame.height,
            });
        }
    }
    if (mask.width(), mask.height()) != (width, height) {
        return Err(DecodeError::MaskSize {
            expected_width: width,
            expected_height: height,
            got_width: mask.width(),
            got_height: mask.height(),
        });
    }
    Ok(())
}

// Planes are strictly sequential: each one depends on the previous parity.
fn run_axis(
    states: &mut [PixelState],
    frames: &[GrayImageView<'_>],
    mask: &Mask,
    axis: Axis,
    threshold: i16,
) {
    let bits = (frames.len() / 2) as u32;
    for (plane, pair) in frames.chunks_exact(2).enumerate() {
        let weight = plane_weight(bits, plane as u32);
        apply_plane(states, &pair[0], &pair[1], mask, axis, threshold, weight);
        log::trace!("{axis:?} plane {plane}/{bits} applied (weight {weight})");
    }
    log::debug!("{axis:?} pass finished over {bits} planes");
}

#[inline]
fn step(
    state: &mut PixelState,
    pattern: u8,
    inverted: u8,
    inside: u8,
    axis: Axis,
    threshold: i16,
    weight: u8,
) {
    if inside == 0 {
        return;
    }
    let difference = pattern as i16 - inverted as i16;
    *state = state.apply_plane(axis, difference, threshold, weight);
}

#[cfg(not(feature = "rayon"))]
fn apply_plane(
    states: &mut [PixelState],
    pattern: &GrayImageView<'_>,
    inverted: &GrayImageView<'_>,
    mask: &Mask,
    axis: Axis,
    threshold: i16,
    weight: u8,
) {
    states
        .iter_mut()
        .zip(pattern.data)
        .zip(inverted.data)
        .zip(mask.as_slice())
        .for_each(|(((s, &p), &i), &m)| step(s, p, i, m, axis, threshold, weight));
}

#[cfg(feature = "rayon")]
fn apply_plane(
    states: &mut [PixelState],
    pattern: &GrayImageView<'_>,
    inverted: &GrayImageView<'_>,
    mask: &Mask,
    axis: Axis,
    threshold: i16,
    weight: u8,
) {
    states
        .par_iter_mut()
        .zip(pattern.data.par_iter())
        .zip(inverted.data.par_iter())
        .zip(mask.as_slice().par_iter())
        .for_each(|(((s, &p), &i), &m)| step(s, p, i, m, axis, threshold, weight));
}
