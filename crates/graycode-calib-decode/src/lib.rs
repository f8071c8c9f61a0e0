//! Gray-code structured-light decoding for projector calibration.
//!
//! This crate turns a stack of camera captures of projected reflected-binary
//! patterns into a dense list of camera-pixel to projector-pixel
//! correspondences:
//! - [`extract_mask`] finds the camera pixels the projector actually lights,
//! - [`GrayCodeDecoder`] reconstructs a projector column and row per pixel,
//!   one bit plane at a time, tracking how ambiguous each decision was,
//! - the selector keeps the most trustworthy pixels while still returning at
//!   least `min_point_count` pairs whenever the data allows it.
//!
//! Everything is a deterministic in-memory transform over fixed-size inputs;
//! there is no I/O, cancellation or retry here. Fitting a warp to the pairs is
//! delegated to a [`CorrespondenceFitter`].
//!
//! ## Quickstart
//!
//! ```
//! use graycode_calib_decode::{
//!     extract_mask, DecodeParams, GrayCodeDecoder, GrayCodePattern, MaskParams, ProjectorSize,
//! };
//!
//! # fn main() -> Result<(), graycode_calib_decode::DecodeError> {
//! let size = ProjectorSize::new(32, 16);
//! // A camera that sees the projector pixel-for-pixel.
//! let frames = GrayCodePattern::new(size)?.frames();
//! let views: Vec<_> = frames.iter().map(|f| f.view()).collect();
//!
//! let mask = extract_mask(&views[0], &views[1], &MaskParams::default())?;
//! let pairs = GrayCodeDecoder::new(DecodeParams::default()).decode(&views[2..], &mask, size)?;
//! assert_eq!(pairs.len(), 32 * 16);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//! - `rayon`: parallel per-pixel loop inside each bit plane.
//! - `tracing`: spans around mask extraction, decoding and calibration.

mod bitplane;
mod decoder;
mod error;
mod filter;
mod mask;
mod pattern;
mod pipeline;
mod selector;
mod threshold;

pub use bitplane::{
    bits_for, decode_bit, plane_weight, update_error, Axis, AxisState, PixelState,
    ERROR_UNRESOLVED,
};
pub use decoder::{decode_states, DecodeParams, FrameLayout, GrayCodeDecoder, ProjectorSize};
pub use error::DecodeError;
pub use mask::{extract_mask, Mask, MaskParams, MaskThreshold, MASK_ON};
pub use pattern::{gray_decode, gray_encode, GrayCodePattern, PatternFrame};
pub use pipeline::{
    CalibrationError, CalibrationParams, CalibrationReport, CaptureSequence, CorrespondenceFitter,
    GrayCodeCalibrator, MeshRefinement,
};
pub use selector::{select_pairs, Correspondences, ErrorHistogram, PointPair};
