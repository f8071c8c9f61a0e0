use crate::ImageError;

/// Per-pixel dewarp lookup produced by the fitting stage.
///
/// For projector pixel `(x, y)`, `map_x[y * width + x]` and `map_y[...]` give
/// the source coordinate to sample. This is the layout image remapping
/// routines expect for a pair of float maps.
#[derive(Clone, Debug, PartialEq)]
pub struct RemapMaps {
    pub width: usize,
    pub height: usize,
    pub map_x: Vec<f32>,
    pub map_y: Vec<f32>,
}

impl RemapMaps {
    pub fn new(
        width: usize,
        height: usize,
        map_x: Vec<f32>,
        map_y: Vec<f32>,
    ) -> Result<Self, ImageError> {
        let expected = width
            .checked_mul(height)
            .filter(|&n| n > 0)
            .ok_or(ImageError::InvalidDimensions { width, height })?;
        for got in [map_x.len(), map_y.len()] {
            if got != expected {
                return Err(ImageError::InvalidBuffer { expected, got });
            }
        }
        Ok(Self {
            width,
            height,
            map_x,
            map_y,
        })
    }

    /// Maps where every pixel samples itself.
    pub fn identity(width: usize, height: usize) -> Self {
        let mut map_x = Vec::with_capacity(width * height);
        let mut map_y = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                map_x.push(x as f32);
                map_y.push(y as f32);
            }
        }
        Self {
            width,
            height,
            map_x,
            map_y,
        }
    }

    #[inline]
    pub fn lookup(&self, x: usize, y: usize) -> Option<(f32, f32)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y * self.width + x;
        Some((self.map_x[idx], self.map_y[idx]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_maps_each_pixel_to_itself() {
        let maps = RemapMaps::identity(4, 3);
        assert_eq!(maps.lookup(3, 2), Some((3.0, 2.0)));
        assert_eq!(maps.lookup(4, 0), None);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let err = RemapMaps::new(2, 2, vec![0.0; 4], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, ImageError::InvalidBuffer { expected: 4, got: 3 }));
    }
}
