//! Projected frame sequence matching what [`GrayCodeDecoder`](crate::GrayCodeDecoder) consumes.

use crate::bitplane::Axis;
use crate::{DecodeError, FrameLayout, ProjectorSize};
use graycode_calib_core::GrayImage;

/// Reflected binary code of `n`.
#[inline]
pub fn gray_encode(n: u32) -> u32 {
    n ^ (n >> 1)
}

/// Inverse of [`gray_encode`].
#[inline]
pub fn gray_decode(g: u32) -> u32 {
    let mut n = g;
    let mut shift = g >> 1;
    while shift != 0 {
        n ^= shift;
        shift >>= 1;
    }
    n
}

/// What a single frame of the sequence shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternFrame {
    White,
    Black,
    BitPlane {
        axis: Axis,
        /// 0 is the most significant plane.
        plane: u32,
        inverted: bool,
    },
}

/// Gray-code pattern generator for one projector resolution.
///
/// Frame order: white, black, then every column plane (MSB first) as a
/// normal/inverted pair, then every row plane the same way.
#[derive(Clone, Copy, Debug)]
pub struct GrayCodePattern {
    size: ProjectorSize,
    layout: FrameLayout,
}

impl GrayCodePattern {
    pub fn new(size: ProjectorSize) -> Result<Self, DecodeError> {
        Ok(Self {
            size,
            layout: FrameLayout::for_projector(size)?,
        })
    }

    pub fn size(&self) -> ProjectorSize {
        self.size
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Total frames including the two references.
    pub fn frame_count(&self) -> usize {
        2 + self.layout.pattern_frames()
    }

    pub fn describe(&self, index: usize) -> Option<PatternFrame> {
        let columns = self.layout.column_frames();
        match index {
            0 => Some(PatternFrame::White),
            1 => Some(PatternFrame::Black),
            i if i < 2 + columns => Some(PatternFrame::BitPlane {
                axis: Axis::Column,
                plane: ((i - 2) / 2) as u32,
                inverted: (i - 2) % 2 == 1,
            }),
            i if i < self.frame_count() => Some(PatternFrame::BitPlane {
                axis: Axis::Row,
                plane: ((i - 2 - columns) / 2) as u32,
                inverted: (i - 2 - columns) % 2 == 1,
            }),
            _ => None,
        }
    }

    /// Render frame `index`, or `None` past the end of the sequence.
    pub fn frame(&self, index: usize) -> Option<GrayImage> {
        let (w, h) = (self.size.width as usize, self.size.height as usize);
        let image = match self.describe(index)? {
            PatternFrame::White => GrayImage::filled(w, h, 255),
            PatternFrame::Black => GrayImage::filled(w, h, 0),
            PatternFrame::BitPlane {
                axis,
                plane,
                inverted,
            } => {
                let bits = match axis {
                    Axis::Column => self.layout.column_bits,
                    Axis::Row => self.layout.row_bits,
                };
                let shift = bits - 1 - plane;
                let lit = |n: usize| ((gray_encode(n as u32) >> shift) & 1 == 1) != inverted;
                GrayImage::from_fn(w, h, |x, y| {
                    let n = match axis {
                        Axis::Column => x,
                        Axis::Row => y,
                    };
                    if lit(n) {
                        255
                    } else {
                        0
                    }
                })
            }
        };
        Some(image)
    }

    /// Render the whole sequence.
    pub fn frames(&self) -> Vec<GrayImage> {
        (0..self.frame_count()).filter_map(|i| self.frame(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_code_neighbours_differ_in_one_bit() {
        for n in 0..4095u32 {
            assert_eq!((gray_encode(n) ^ gray_encode(n + 1)).count_ones(), 1);
            assert_eq!(gray_decode(gray_encode(n)), n);
        }
    }

    #[test]
    fn sequence_length_for_small_projector() {
        let p = GrayCodePattern::new(ProjectorSize::new(64, 32)).unwrap();
        assert_eq!(p.frame_count(), 24);
        assert_eq!(p.frames().len(), 24);
        assert!(p.frame(24).is_none());
    }

    #[test]
    fn frames_are_described_in_decoder_order() {
        let p = GrayCodePattern::new(ProjectorSize::new(8, 4)).unwrap();
        assert_eq!(p.describe(0), Some(PatternFrame::White));
        assert_eq!(p.describe(1), Some(PatternFrame::Black));
        assert_eq!(
            p.describe(3),
            Some(PatternFrame::BitPlane {
                axis: Axis::Column,
                plane: 0,
                inverted: true
            })
        );
        assert_eq!(
            p.describe(8),
            Some(PatternFrame::BitPlane {
                axis: Axis::Row,
                plane: 0,
                inverted: false
            })
        );
        assert_eq!(
            p.describe(11),
            Some(PatternFrame::BitPlane {
                axis: Axis::Row,
                plane: 1,
                inverted: true
            })
        );
        assert_eq!(p.describe(12), None);
    }

    #[test]
    fn msb_column_plane_splits_projector_in_half() {
        let p = GrayCodePattern::new(ProjectorSize::new(8, 2)).unwrap();
        let normal = p.frame(2).unwrap();
        let inverted = p.frame(3).unwrap();
        assert_eq!(&normal.data[..8], &[0, 0, 0, 0, 255, 255, 255, 255]);
        for (a, b) in normal.data.iter().zip(&inverted.data) {
            assert_eq!(a ^ b, 255);
        }
    }
}
