//! Config-driven decode runs and their JSON report.
//!
//! A [`DecodeJob`] names the captures and the calibration parameters;
//! [`run_decode_job`] loads the frames, extracts the mask, decodes the
//! correspondences and optionally writes the mask image and the report.

use crate::decode::{
    CalibrationParams, Correspondences, DecodeError, ErrorHistogram, GrayCodeCalibrator,
    ProjectorSize,
};
use crate::io::{frame_paths_in_dir, load_frames, save_mask, FrameIoError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Decode job description, usually read from a JSON file.
///
/// Captures come either from an explicit `frames` list (projection order:
/// white, black, then the bit planes) or from every image in `frames_dir`
/// sorted by file name. Relative paths are resolved against the config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecodeJob {
    #[serde(default)]
    pub frames: Vec<PathBuf>,
    #[serde(default)]
    pub frames_dir: Option<PathBuf>,
    #[serde(flatten)]
    pub params: CalibrationParams,
    /// Where to write the camera-space mask image.
    #[serde(default)]
    pub mask_path: Option<PathBuf>,
    /// Where to write the JSON report.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

/// Errors produced by [`run_decode_job`] and config loading.
#[derive(thiserror::Error, Debug)]
pub enum JobError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid job config")]
    Config(#[source] serde_json::Error),

    #[error("failed to serialize report")]
    Report(#[source] serde_json::Error),

    #[error("job lists no frames; set `frames` or `frames_dir`")]
    NoFrames,

    #[error(transparent)]
    Io(#[from] FrameIoError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl DecodeJob {
    /// Parse a job from JSON text.
    pub fn from_json(text: &str) -> Result<Self, JobError> {
        serde_json::from_str(text).map_err(JobError::Config)
    }

    /// Read a job file and resolve its relative paths against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JobError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| JobError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let job = Self::from_json(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(job.resolved_against(base))
    }

    /// Rebase every relative path onto `base`.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.frames.iter_mut().for_each(rebase);
        self.frames_dir.iter_mut().for_each(rebase);
        self.mask_path.iter_mut().for_each(rebase);
        self.report_path.iter_mut().for_each(rebase);
        self
    }

    /// Capture paths in projection order.
    pub fn frame_paths(&self) -> Result<Vec<PathBuf>, JobError> {
        if !self.frames.is_empty() {
            return Ok(self.frames.clone());
        }
        match &self.frames_dir {
            Some(dir) => Ok(frame_paths_in_dir(dir)?),
            None => Err(JobError::NoFrames),
        }
    }
}

/// Wall-clock time spent per stage, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub load_ms: u64,
    pub decode_ms: u64,
    pub total_ms: u64,
}

/// Summary of one decode run.
///
/// `camera_points[i]` and `projector_points[i]` form one pair, in camera
/// raster order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodeReport {
    pub frame_count: usize,
    pub camera_width: usize,
    pub camera_height: usize,
    pub projector: ProjectorSize,
    pub mask_pixels: usize,
    pub mask_coverage: f64,
    pub histogram: ErrorHistogram,
    pub error_threshold: u8,
    pub min_point_count: usize,
    pub point_count: usize,
    pub camera_points: Vec<[u32; 2]>,
    pub projector_points: Vec<[u32; 2]>,
    pub timings: StageTimings,
}

impl DecodeReport {
    fn new(
        job: &DecodeJob,
        frame_count: usize,
        camera: (usize, usize),
        mask: &crate::decode::Mask,
        correspondences: &Correspondences,
        timings: StageTimings,
    ) -> Self {
        Self {
            frame_count,
            camera_width: camera.0,
            camera_height: camera.1,
            projector: job.params.projector,
            mask_pixels: mask.count(),
            mask_coverage: mask.coverage(),
            histogram: correspondences.histogram,
            error_threshold: correspondences.error_threshold,
            min_point_count: job.params.decode.min_point_count,
            point_count: correspondences.len(),
            camera_points: correspondences
                .camera_points
                .iter()
                .map(|p| [p.x, p.y])
                .collect(),
            projector_points: correspondences
                .projector_points
                .iter()
                .map(|p| [p.x, p.y])
                .collect(),
            timings,
        }
    }
}

/// Load, decode and report.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip(job)))]
pub fn run_decode_job(job: &DecodeJob) -> Result<DecodeReport, JobError> {
    let t_total = Instant::now();

    let t_load = Instant::now();
    let paths = job.frame_paths()?;
    let frames = load_frames(&paths)?;
    let load_ms = t_load.elapsed().as_millis() as u64;
    log::info!("loaded {} frames in {load_ms} ms", frames.len());

    let views: Vec<_> = frames.iter().map(|f| f.view()).collect();
    let t_decode = Instant::now();
    let result = GrayCodeCalibrator::new(job.params.clone()).correspondences(&views)?;
    let decode_ms = t_decode.elapsed().as_millis() as u64;

    if let Some(path) = &job.mask_path {
        save_mask(path, &result.mask)?;
        log::info!("wrote mask to {}", path.display());
    }

    let camera = (result.mask.width(), result.mask.height());
    let timings = StageTimings {
        load_ms,
        decode_ms,
        total_ms: t_total.elapsed().as_millis() as u64,
    };
    let report = DecodeReport::new(
        job,
        frames.len(),
        camera,
        &result.mask,
        &result.correspondences,
        timings,
    );

    if let Some(path) = &job.report_path {
        write_report(path, &report)?;
        log::info!("wrote report to {}", path.display());
    }
    Ok(report)
}

/// Write a report as pretty-printed JSON.
pub fn write_report(path: impl AsRef<Path>, report: &DecodeReport) -> Result<(), JobError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(report).map_err(JobError::Report)?;
    std::fs::write(path, json).map_err(|source| JobError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{GrayCodePattern, MaskParams, MaskThreshold};
    use crate::io::save_pattern_frames;

    #[test]
    fn job_config_accepts_minimal_json() {
        let job = DecodeJob::from_json(
            r#"{"frames_dir": "captures", "projector": {"width": 64, "height": 32}}"#,
        )
        .unwrap();
        assert!(job.frames.is_empty());
        assert_eq!(job.frames_dir, Some(PathBuf::from("captures")));
        assert_eq!(
            job.params,
            CalibrationParams::for_projector(ProjectorSize::new(64, 32))
        );
        assert!(job.report_path.is_none());
    }

    #[test]
    fn job_config_reads_nested_params() {
        let job = DecodeJob::from_json(
            r#"{
                "frames": ["a.png", "b.png"],
                "projector": {"width": 8, "height": 8},
                "mask": {"threshold": {"fixed": 40}},
                "decode": {"min_point_count": 12}
            }"#,
        )
        .unwrap();
        assert_eq!(job.frames.len(), 2);
        // unset fields keep their defaults
        assert_eq!(
            job.params.mask,
            MaskParams {
                threshold: MaskThreshold::Fixed(40),
                blur: true
            }
        );
        assert_eq!(job.params.decode.min_point_count, 12);
        assert_eq!(job.params.decode.ambiguity_threshold, 5);
    }

    #[test]
    fn relative_paths_follow_config_location() {
        let job = DecodeJob::from_json(
            r#"{"frames": ["f0.png", "/abs/f1.png"], "report_path": "out.json",
                "projector": {"width": 2, "height": 2}}"#,
        )
        .unwrap()
        .resolved_against(Path::new("/data/run1"));
        assert_eq!(job.frames[0], PathBuf::from("/data/run1/f0.png"));
        assert_eq!(job.frames[1], PathBuf::from("/abs/f1.png"));
        assert_eq!(job.report_path, Some(PathBuf::from("/data/run1/out.json")));
    }

    #[test]
    fn job_without_frames_is_rejected() {
        let job = DecodeJob::from_json(r#"{"projector": {"width": 2, "height": 2}}"#).unwrap();
        assert!(matches!(run_decode_job(&job), Err(JobError::NoFrames)));
    }

    #[test]
    fn decode_job_reports_every_projector_pixel() {
        let dir = tempfile::tempdir().unwrap();
        let size = ProjectorSize::new(16, 8);
        save_pattern_frames(&GrayCodePattern::new(size).unwrap(), dir.path()).unwrap();

        let mut job = DecodeJob {
            frames: Vec::new(),
            frames_dir: Some(dir.path().to_path_buf()),
            params: CalibrationParams::for_projector(size),
            mask_path: Some(dir.path().join("mask.bmp")),
            report_path: Some(dir.path().join("report.json")),
        };
        job.params.decode.min_point_count = 10;
        let report = run_decode_job(&job).unwrap();

        assert_eq!(report.frame_count, 16);
        assert_eq!((report.camera_width, report.camera_height), (16, 8));
        assert_eq!(report.point_count, 128);
        assert_eq!(report.error_threshold, 0);
        assert_eq!(report.camera_points, report.projector_points);
        assert!(dir.path().join("mask.bmp").is_file());

        let text = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
        let back: DecodeReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.point_count, 128);
        assert_eq!(back.histogram, report.histogram);
    }
}
