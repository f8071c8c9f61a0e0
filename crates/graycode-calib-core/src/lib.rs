//! Core types shared by the gray-code projector calibration crates.
//!
//! This crate is intentionally small. It holds plain image buffers, the
//! homography and remap-map types exchanged with the fitting stage, and the
//! logger. It does *not* depend on any concrete image I/O library.

mod error;
mod homography;
mod image;
mod logger;
mod remap;

pub use error::ImageError;
pub use homography::Homography;
pub use image::{ChannelOrder, ColorImageView, GrayImage, GrayImageView};
pub use remap::RemapMaps;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{filter_directive, init_with_level, LogFormat};
