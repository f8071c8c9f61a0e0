//! Automatic bimodal thresholding.

/// 256-bin intensity histogram.
pub(crate) fn histogram(samples: &[u8]) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    hist
}

/// Otsu threshold: the level `t` maximising between-class variance of
/// `{v <= t}` and `{v > t}`.
///
/// A uniform image has no split and yields `0`. A two-valued image yields the
/// midpoint between its two levels.
pub(crate) fn otsu_threshold(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 0;
    }

    let hist = histogram(samples);
    let occupied: Vec<usize> = (0..256).filter(|&i| hist[i] > 0).collect();
    match occupied.as_slice() {
        [_] => return 0,
        [lo, hi] => return ((lo + hi) / 2) as u8,
        _ => {}
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 0u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}
