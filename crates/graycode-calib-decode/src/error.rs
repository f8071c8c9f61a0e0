use graycode_calib_core::ImageError;

/// Precondition violations rejected before any decoding work starts.
///
/// Poor signal is never an error: ambiguous, unresolved and out-of-range
/// pixels are dropped and the caller gets fewer correspondences.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid projector size {width}x{height}")]
    InvalidProjectorSize { width: u32, height: u32 },

    #[error("projector size {width}x{height} needs more than 16 bit planes per axis")]
    ProjectorTooLarge { width: u32, height: u32 },

    #[error("expected at least {expected} frames, got {got}")]
    FrameCount { expected: usize, got: usize },

    #[error("frame layout describes {expected} pattern frames, got {got}")]
    LayoutMismatch { expected: usize, got: usize },

    #[error("{remaining} frames follow the column planes; row planes come in normal/inverted pairs")]
    UnpairedRowFrame { remaining: usize },

    #[error("{planes} row bit planes exceed the 16-bit coordinate range")]
    TooManyRowPlanes { planes: usize },

    #[error(
        "frame {index} is {got_width}x{got_height}, expected {expected_width}x{expected_height}"
    )]
    FrameSize {
        index: usize,
        expected_width: usize,
        expected_height: usize,
        got_width: usize,
        got_height: usize,
    },

    #[error("mask is {got_width}x{got_height}, frames are {expected_width}x{expected_height}")]
    MaskSize {
        expected_width: usize,
        expected_height: usize,
        got_width: usize,
        got_height: usize,
    },

    #[error("min_point_count must be positive")]
    ZeroMinPointCount,

    #[error("ambiguity_threshold must be positive (got {0})")]
    NonPositiveAmbiguityThreshold(i16),

    #[error(transparent)]
    Image(#[from] ImageError),
}
