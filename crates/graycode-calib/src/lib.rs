//! High-level facade for the `graycode-calib-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the core types and the gray-code decoder,
//! - (feature `image`) loading captured frames from disk, saving generated
//!   patterns and masks, and a JSON-configured decode job,
//! - (feature `cli`) the `graycode-calib` command-line tool.
//!
//! ## Quickstart
//!
//! ```no_run
//! use graycode_calib::decode::{CalibrationParams, GrayCodeCalibrator, ProjectorSize};
//! use graycode_calib::io::load_frames_from_dir;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frames = load_frames_from_dir("captures/")?;
//! let views: Vec<_> = frames.iter().map(|f| f.view()).collect();
//!
//! let params = CalibrationParams::for_projector(ProjectorSize::new(1920, 1080));
//! let report = GrayCodeCalibrator::new(params).correspondences(&views)?;
//! println!("{} correspondences", report.correspondences.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `graycode_calib::core`: image buffers, homography and remap maps, logger.
//! - `graycode_calib::decode`: mask extraction, bit-plane decoding, pair
//!   selection, pattern generation and the calibration pipeline.
//! - `graycode_calib::io` (feature `image`): frame loading and saving.
//! - `graycode_calib::job` (feature `image`): config-driven decode runs and
//!   their JSON report.

pub use graycode_calib_core as core;
pub use graycode_calib_decode as decode;

pub use graycode_calib_decode::{
    CalibrationParams, Correspondences, DecodeError, DecodeParams, GrayCodeCalibrator,
    GrayCodeDecoder, GrayCodePattern, MaskParams, ProjectorSize,
};

#[cfg(feature = "image")]
pub mod io;
#[cfg(feature = "image")]
pub mod job;
