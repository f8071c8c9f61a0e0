//! Decode a simulated capture and build dewarp maps with a toy fitter.
//!
//! The "camera" sees the projector magnified 2x with a 5 px dark border.
//! The fitter averages the camera positions of every projector pixel and
//! falls back to the initial homography where nothing was decoded.

use graycode_calib_core::{init_with_level, GrayImage, Homography, RemapMaps};
use graycode_calib_decode::{
    CalibrationError, CalibrationParams, CorrespondenceFitter, Correspondences, GrayCodeCalibrator,
    GrayCodePattern, MeshRefinement, ProjectorSize,
};
use nalgebra::Point2;

const SCALE: usize = 2;
const BORDER: usize = 5;

#[derive(thiserror::Error, Debug)]
enum FitError {
    #[error("no correspondences to fit")]
    Empty,
    #[error("initial homography is singular")]
    Singular,
}

struct MeanFitter;

impl CorrespondenceFitter for MeanFitter {
    type Error = FitError;

    fn fit(
        &self,
        correspondences: &Correspondences,
        projector: ProjectorSize,
        initial_homography: &Homography,
        _refinement: &MeshRefinement,
    ) -> Result<RemapMaps, FitError> {
        if correspondences.is_empty() {
            return Err(FitError::Empty);
        }
        let to_camera = initial_homography.inverse().ok_or(FitError::Singular)?;
        let (w, h) = (projector.width as usize, projector.height as usize);
        let mut sum = vec![(0.0f64, 0.0f64, 0u32); w * h];
        for pair in correspondences.pairs() {
            let slot = &mut sum[pair.projector.y as usize * w + pair.projector.x as usize];
            slot.0 += pair.camera.x as f64;
            slot.1 += pair.camera.y as f64;
            slot.2 += 1;
        }

        let mut map_x = Vec::with_capacity(w * h);
        let mut map_y = Vec::with_capacity(w * h);
        for (idx, &(sx, sy, n)) in sum.iter().enumerate() {
            let (x, y) = if n > 0 {
                (sx / n as f64, sy / n as f64)
            } else {
                let p = to_camera.apply(Point2::new((idx % w) as f64, (idx / w) as f64));
                (p.x, p.y)
            };
            map_x.push(x as f32);
            map_y.push(y as f32);
        }
        RemapMaps::new(w, h, map_x, map_y).map_err(|_| FitError::Empty)
    }
}

fn simulate_camera(frames: &[GrayImage]) -> Vec<GrayImage> {
    frames
        .iter()
        .map(|f| {
            let w = f.width * SCALE + 2 * BORDER;
            let h = f.height * SCALE + 2 * BORDER;
            GrayImage::from_fn(w, h, |x, y| {
                let inside = (BORDER..w - BORDER).contains(&x) && (BORDER..h - BORDER).contains(&y);
                if !inside {
                    return 10;
                }
                let (px, py) = ((x - BORDER) / SCALE, (y - BORDER) / SCALE);
                // the projector never reaches full contrast through the lens
                30 + f.data[py * f.width + px] / 2
            })
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(log::LevelFilter::Info).map_err(|e| e.to_string())?;

    let projector = ProjectorSize::new(64, 40);
    let frames = simulate_camera(&GrayCodePattern::new(projector)?.frames());
    let views: Vec<_> = frames.iter().map(|f| f.view()).collect();

    let mut params = CalibrationParams::for_projector(projector);
    // camera -> projector: remove the border, halve
    let (s, b) = (1.0 / SCALE as f64, BORDER as f64);
    params.initial_homography =
        Homography::from_array([[s, 0.0, -b * s], [0.0, s, -b * s], [0.0, 0.0, 1.0]]);

    let calibrator = GrayCodeCalibrator::new(params);
    let report = calibrator.correspondences(&views)?;
    println!(
        "mask: {} px, pairs: {}, threshold: {}, histogram: {:?}",
        report.mask.count(),
        report.correspondences.len(),
        report.correspondences.error_threshold,
        report.correspondences.histogram.counts
    );

    let maps = match calibrator.calibrate(&views, &MeanFitter) {
        Ok(maps) => maps,
        Err(CalibrationError::Fit(e)) => return Err(e.into()),
        Err(CalibrationError::Decode(e)) => return Err(e.into()),
    };
    for (px, py) in [(0, 0), (31, 20), (63, 39)] {
        if let Some((cx, cy)) = maps.lookup(px, py) {
            println!("projector ({px}, {py}) <- camera ({cx:.1}, {cy:.1})");
        }
    }
    Ok(())
}
