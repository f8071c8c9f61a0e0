//! End-to-end calibration flow: captures -> mask -> correspondences -> fitter.

use crate::{
    extract_mask, Correspondences, DecodeError, DecodeParams, GrayCodeDecoder, Mask, MaskParams,
    ProjectorSize,
};
use graycode_calib_core::{GrayImageView, Homography, RemapMaps};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One calibration capture run split into references and patterns.
#[derive(Clone, Debug)]
pub struct CaptureSequence<'a> {
    pub white: GrayImageView<'a>,
    pub black: GrayImageView<'a>,
    pub patterns: Vec<GrayImageView<'a>>,
}

impl<'a> CaptureSequence<'a> {
    /// Split `[white, black, patterns...]`.
    pub fn from_frames(frames: &[GrayImageView<'a>]) -> Result<Self, DecodeError> {
        match frames {
            [white, black, patterns @ ..] => Ok(Self {
                white: *white,
                black: *black,
                patterns: patterns.to_vec(),
            }),
            _ => Err(DecodeError::FrameCount {
                expected: 2,
                got: frames.len(),
            }),
        }
    }

    /// Frames in the sequence, references included.
    pub fn frame_count(&self) -> usize {
        2 + self.patterns.len()
    }
}

/// Mesh refinement settings forwarded untouched to the fitting stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshRefinement {
    pub iterations: u32,
    /// Maximum camera-space distance, in pixels, between mesh nodes and the
    /// correspondences used to refine them.
    pub distance_limit: u32,
}

impl Default for MeshRefinement {
    fn default() -> Self {
        Self {
            iterations: 3,
            distance_limit: 10,
        }
    }
}

/// Everything the calibrator needs besides the captures themselves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    pub projector: ProjectorSize,
    #[serde(default)]
    pub mask: MaskParams,
    #[serde(default)]
    pub decode: DecodeParams,
    #[serde(default)]
    pub refinement: MeshRefinement,
    /// Initial camera-to-projector guess for the fitting stage.
    #[serde(default)]
    pub initial_homography: Homography,
}

impl CalibrationParams {
    pub fn for_projector(projector: ProjectorSize) -> Self {
        Self {
            projector,
            mask: MaskParams::default(),
            decode: DecodeParams::default(),
            refinement: MeshRefinement::default(),
            initial_homography: Homography::identity(),
        }
    }
}

/// Mesh/homography fitting stage fed with the decoded point pairs.
///
/// Implementations receive pairs in raster order without deduplication; any
/// conditioning the fit needs is their responsibility.
pub trait CorrespondenceFitter {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fit(
        &self,
        correspondences: &Correspondences,
        projector: ProjectorSize,
        initial_homography: &Homography,
        refinement: &MeshRefinement,
    ) -> Result<RemapMaps, Self::Error>;
}

/// Errors from [`GrayCodeCalibrator::calibrate`].
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("fitting stage failed")]
    Fit(#[source] E),
}

/// Intermediate products of a calibration run.
#[derive(Clone, Debug)]
pub struct CalibrationReport {
    pub mask: Mask,
    pub correspondences: Correspondences,
}

/// Runs the whole gray-code calibration for one projector.
#[derive(Clone, Debug)]
pub struct GrayCodeCalibrator {
    params: CalibrationParams,
}

impl GrayCodeCalibrator {
    pub fn new(params: CalibrationParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// Mask extraction and decoding over a full capture sequence.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frames), fields(frames = frames.len()))
    )]
    pub fn correspondences(
        &self,
        frames: &[GrayImageView<'_>],
    ) -> Result<CalibrationReport, DecodeError> {
        let capture = CaptureSequence::from_frames(frames)?;
        let mask = extract_mask(&capture.white, &capture.black, &self.params.mask)?;
        log::info!(
            "mask covers {} of {} camera pixels",
            mask.count(),
            mask.width() * mask.height()
        );

        let decoder = GrayCodeDecoder::new(self.params.decode.clone());
        let correspondences = decoder.decode(&capture.patterns, &mask, self.params.projector)?;
        Ok(CalibrationReport {
            mask,
            correspondences,
        })
    }

    /// Decode the captures and hand the pairs to `fitter`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frames, fitter), fields(frames = frames.len()))
    )]
    pub fn calibrate<F: CorrespondenceFitter>(
        &self,
        frames: &[GrayImageView<'_>],
        fitter: &F,
    ) -> Result<RemapMaps, CalibrationError<F::Error>> {
        let report = self.correspondences(frames)?;
        fitter
            .fit(
                &report.correspondences,
                self.params.projector,
                &self.params.initial_homography,
                &self.params.refinement,
            )
            .map_err(CalibrationError::Fit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrayCodePattern;
    use graycode_calib_core::GrayImage;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingFitter {
        seen: RefCell<Option<(usize, ProjectorSize, MeshRefinement)>>,
    }

    #[derive(thiserror::Error, Debug)]
    #[error("no points")]
    struct NoPoints;

    impl CorrespondenceFitter for RecordingFitter {
        type Error = NoPoints;

        fn fit(
            &self,
            correspondences: &Correspondences,
            projector: ProjectorSize,
            _initial_homography: &Homography,
            refinement: &MeshRefinement,
        ) -> Result<RemapMaps, NoPoints> {
            if correspondences.is_empty() {
                return Err(NoPoints);
            }
            *self.seen.borrow_mut() = Some((correspondences.len(), projector, *refinement));
            Ok(RemapMaps::identity(
                projector.width as usize,
                projector.height as usize,
            ))
        }
    }

    #[test]
    fn sequence_needs_both_references() {
        let f = GrayImage::filled(2, 2, 0);
        let err = CaptureSequence::from_frames(&[f.view()]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::FrameCount {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn calibrate_forwards_pairs_and_settings_to_fitter() {
        let size = ProjectorSize::new(16, 8);
        let frames = GrayCodePattern::new(size).unwrap().frames();
        let views: Vec<_> = frames.iter().map(|f| f.view()).collect();

        let mut params = CalibrationParams::for_projector(size);
        params.refinement.iterations = 7;
        let fitter = RecordingFitter::default();
        let maps = GrayCodeCalibrator::new(params)
            .calibrate(&views, &fitter)
            .expect("calibrate");

        assert_eq!((maps.width, maps.height), (16, 8));
        let seen = *fitter.seen.borrow();
        let (count, projector, refinement) = seen.expect("fitter called");
        assert_eq!(count, 16 * 8);
        assert_eq!(projector, size);
        assert_eq!(refinement.iterations, 7);
    }

    #[test]
    fn fitter_errors_are_wrapped() {
        let size = ProjectorSize::new(4, 4);
        let mut frames = GrayCodePattern::new(size).unwrap().frames();
        // no light reaches the camera: empty mask, no pairs
        frames[0] = GrayImage::filled(4, 4, 0);
        let views: Vec<_> = frames.iter().map(|f| f.view()).collect();

        let err = GrayCodeCalibrator::new(CalibrationParams::for_projector(size))
            .calibrate(&views, &RecordingFitter::default())
            .unwrap_err();
        assert!(matches!(err, CalibrationError::Fit(NoPoints)));
    }

    #[test]
    fn params_load_from_json_with_defaults() {
        let p: CalibrationParams =
            serde_json::from_str(r#"{"projector":{"width":1920,"height":1080}}"#).unwrap();
        assert_eq!(p, CalibrationParams::for_projector(ProjectorSize::new(1920, 1080)));
    }
}
