//! # Path scorer
//!
//! Accumulates a running measure of how well the dog tracked its planned
//! path. Two figures are kept:
//!
//! - the time-weighted integral of the squared distance between the dog and
//!   its planned point, lower is better
//! - the running mean of the dog's height deviation from its expected
//!   standing height, a sanity check on the simulation
//!
//! Scoring only accumulates between explicit start and stop calls, samples
//! arriving outside the measurement window are ignored.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use util::maths::square;
use util::module::State;
use util::session::Session;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Path scorer parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathScorerParams {
    /// The dog's standing height, deviations are measured from this
    pub dog_height_m: f64,
}

/// One scoring sample.
#[derive(Debug, Clone, Copy)]
pub struct ScoreSample {
    /// The time of the sample
    pub time_s: f64,

    /// Where the dog was planned to be
    pub planned_position_m: Point3<f64>,

    /// Where the dog actually was
    pub actual_position_m: Point3<f64>,
}

/// The accumulated score so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreReport {
    /// Integral of squared planar deviation over time
    pub total_deviation_m2s: f64,

    /// Running mean of the dog's height deviation
    pub mean_height_deviation_m: f64,

    /// Number of samples accumulated
    pub samples: u64,
}

/// The path scorer module state.
#[derive(Default)]
pub struct PathScorer {
    params: PathScorerParams,
    measuring: bool,
    report: ScoreReport,
    last_time_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised by the path scorer.
#[derive(Debug, Error)]
pub enum PathScorerError {
    #[error("dog_height_m must not be negative, got {0}")]
    InvalidDogHeight(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PathScorerParams {
    fn default() -> Self {
        Self { dog_height_m: 0.1 }
    }
}

impl PathScorerParams {
    pub fn validate(&self) -> Result<(), PathScorerError> {
        if self.dog_height_m < 0.0 {
            return Err(PathScorerError::InvalidDogHeight(self.dog_height_m));
        }
        Ok(())
    }
}

impl PathScorer {
    /// Begin accumulating samples.
    pub fn start_measuring(&mut self) {
        info!("Path scoring started");
        self.measuring = true;
    }

    /// Stop accumulating samples and log the totals.
    pub fn stop_measuring(&mut self) {
        self.measuring = false;
        info!(
            "Path scoring stopped: total deviation = {:.4} m^2 s over {} samples, \
            mean height deviation = {:.4} m",
            self.report.total_deviation_m2s, self.report.samples, self.report.mean_height_deviation_m
        );
    }

    /// The accumulated score so far.
    pub fn report(&self) -> ScoreReport {
        self.report
    }
}

impl State for PathScorer {
    type InitData = PathScorerParams;
    type InitError = PathScorerError;

    type InputData = ScoreSample;
    type OutputData = ();
    type StatusReport = ScoreReport;
    type ProcError = PathScorerError;

    fn init(
        &mut self,
        init_data: Self::InitData,
        _session: &Session,
    ) -> Result<(), Self::InitError> {
        init_data.validate()?;
        self.params = init_data;
        Ok(())
    }

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !self.measuring {
            debug!("Score sample outside the measurement window, ignored");
            return Ok(((), self.report));
        }

        // First sample carries no time weight
        let dt_s = match self.last_time_s {
            Some(last) => (input_data.time_s - last).max(0.0),
            None => 0.0,
        };
        self.last_time_s = Some(input_data.time_s);

        let dx = input_data.planned_position_m.x - input_data.actual_position_m.x;
        let dy = input_data.planned_position_m.y - input_data.actual_position_m.y;
        self.report.total_deviation_m2s += (square(dx) + square(dy)) * dt_s;

        self.report.samples += 1;
        let height_deviation_m = input_data.actual_position_m.z - self.params.dog_height_m;
        self.report.mean_height_deviation_m += (height_deviation_m
            - self.report.mean_height_deviation_m)
            / self.report.samples as f64;

        Ok(((), self.report))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
