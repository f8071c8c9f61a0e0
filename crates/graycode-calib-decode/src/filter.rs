//! Separable 5x5 Gaussian smoothing.

use graycode_calib_core::{GrayImage, GrayImageView};

// Binomial approximation of a 5-tap Gaussian; sums to 16.
const KERNEL: [u32; 5] = [1, 4, 6, 4, 1];

/// Mirror an out-of-range index without repeating the edge pixel
/// (`gfedcb|abcdefgh|gfedcba`).
#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Blur with the 5x5 binomial kernel, rounding to nearest.
pub(crate) fn gaussian_blur_5x5(src: &GrayImageView<'_>) -> GrayImage {
    let (w, h) = (src.width, src.height);

    // Horizontal pass keeps full precision (x16).
    let mut tmp = vec![0u32; w * h];
    for y in 0..h {
        let row = &src.data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0u32;
            for (k, &c) in KERNEL.iter().enumerate() {
                let sx = reflect101(x as isize + k as isize - 2, w);
                acc += c * row[sx] as u32;
            }
            tmp[y * w + x] = acc;
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u32;
            for (k, &c) in KERNEL.iter().enumerate() {
                let sy = reflect101(y as isize + k as isize - 2, h);
                acc += c * tmp[sy * w + x];
            }
            out[y * w + x] = ((acc + 128) >> 8) as u8;
        }
    }

    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}
