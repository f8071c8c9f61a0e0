//! Per-pixel reflected-binary decoding, one bit plane at a time.
//!
//! Everything here is a pure function of the prior pixel state and the
//! signed `pattern - inverted` difference, so it can be tested without images.

use serde::{Deserialize, Serialize};

/// Error level of a pixel whose worst ambiguous plane is too significant to
/// trust. Such pixels are never emitted.
pub const ERROR_UNRESOLVED: u8 = 4;

/// Projector axis encoded by a bit plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Projector columns (x).
    Column,
    /// Projector rows (y).
    Row,
}

/// Number of bit planes needed to address `n` projector pixels, `ceil(log2(n))`.
#[inline]
pub fn bits_for(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        u32::BITS - (n - 1).leading_zeros()
    }
}

/// Error weight of plane `plane` (0 = MSB) on an axis with `bits` planes.
///
/// The MSB weighs `bits`, the LSB weighs 1: a wrong high bit moves the
/// decoded coordinate further than a wrong low bit.
#[inline]
pub fn plane_weight(bits: u32, plane: u32) -> u8 {
    debug_assert!(plane < bits);
    bits.saturating_sub(plane).min(u8::MAX as u32) as u8
}

/// Decoded coordinate and running parity for one axis of one pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AxisState {
    /// Binary coordinate, MSB first; one bit appended per plane.
    pub value: u16,
    /// Previous emitted bit (the Gray-to-binary running XOR).
    pub parity: bool,
}

/// Append one bit to `prior`.
///
/// `raw = difference >= 0`; the emitted binary bit is `parity XOR raw` and
/// becomes the parity for the next plane.
#[inline]
pub fn decode_bit(prior: AxisState, difference: i16) -> AxisState {
    let raw = difference >= 0;
    let bit = prior.parity != raw;
    AxisState {
        value: (prior.value << 1) | bit as u16,
        parity: bit,
    }
}

/// Raise `error` to `weight` (clamped to `ERROR_UNRESOLVED`) when the
/// difference lies inside the ambiguity band `(-threshold, threshold)`.
#[inline]
pub fn update_error(error: u8, difference: i16, threshold: i16, weight: u8) -> u8 {
    let ambiguous = difference > -threshold && difference < threshold;
    let weight = weight.min(ERROR_UNRESOLVED);
    if ambiguous && weight > error {
        weight
    } else {
        error
    }
}

/// Accumulated decode state of one camera pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelState {
    pub column: AxisState,
    pub row: AxisState,
    /// Worst ambiguity weight seen on either axis, `0..=ERROR_UNRESOLVED`.
    pub error: u8,
}

impl PixelState {
    /// Apply one bit plane of `axis` to this pixel.
    #[inline]
    #[must_use]
    pub fn apply_plane(self, axis: Axis, difference: i16, threshold: i16, weight: u8) -> Self {
        let mut next = self;
        match axis {
            Axis::Column => next.column = decode_bit(self.column, difference),
            Axis::Row => next.row = decode_bit(self.row, difference),
        }
        next.error = update_error(self.error, difference, threshold, weight);
        next
    }

    /// Decoded projector coordinate `(x, y)`.
    #[inline]
    pub fn coordinate(&self) -> (u16, u16) {
        (self.column.value, self.row.value)
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.error < ERROR_UNRESOLVED
    }
}
