//! # Path server
//!
//! Owns the active path provider and answers all path queries: where the dog
//! should be at a given time, whether the walk has started or ended, and full
//! sampled traversals of both the dog's path and the robot's escort path.
//!
//! The escort path is derived from the dog path, the robot walks a laterally
//! shifted copy so the pair are side by side rather than in single file.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use walk_if::geom::TimedPose;
use walk_if::services::{
    ClientError, GetEntirePathRequest, GetEntireRobotPathRequest, GetPathRequest, GetPathResponse,
    MaximumTimeResponse, StartPathRequest,
};

use crate::clients::PathQuery;
use crate::path_provider::PathProvider;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Path server parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathServerParams {
    /// How far behind the dog the escort pose trails. Zero puts the robot
    /// level with the dog.
    pub trailing_distance_m: f64,

    /// Lateral offset of the escort pose to the left of the dog's direction
    /// of travel
    pub shift_distance_m: f64,

    /// Time step used to estimate the path tangent by finite difference
    pub slope_delta_s: f64,
}

/// The path server.
pub struct PathServer {
    provider: Box<dyn PathProvider>,
    params: PathServerParams,
    started: bool,
    start_time_s: f64,
}

/// Iterator over a sampled traversal of the path.
///
/// Yields poses at `t = 0, increment, 2 * increment, ...` strictly below the
/// walk's maximum time, stamped with the walk's start time plus `t`.
pub struct PathSamples<'a> {
    server: &'a PathServer,
    increment_s: f64,
    next_t_s: f64,
    escort: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised by the path server.
#[derive(Debug, Error)]
pub enum PathServerError {
    #[error("The walk has already been started")]
    AlreadyStarted,

    #[error("Sample increment must be greater than zero, got {0} s")]
    InvalidIncrement(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PathServerParams {
    fn default() -> Self {
        Self {
            trailing_distance_m: 0.0,
            shift_distance_m: 0.6,
            slope_delta_s: 0.01,
        }
    }
}

impl PathServer {
    /// Build a server around the given provider, initialising it.
    pub fn new(mut provider: Box<dyn PathProvider>, params: PathServerParams) -> Self {
        provider.init();

        Self {
            provider,
            params,
            started: false,
            start_time_s: 0.0,
        }
    }

    /// Start the walk clock at the given time. Single use.
    pub fn start(&mut self, req: StartPathRequest) -> Result<(), PathServerError> {
        if self.started {
            return Err(PathServerError::AlreadyStarted);
        }

        self.started = true;
        self.start_time_s = req.time_s;
        info!("Walk started at t = {:.2} s", req.time_s);
        Ok(())
    }

    /// The duration of the walk in seconds.
    pub fn maximum_time_s(&self) -> f64 {
        self.provider.maximum_time_s()
    }

    /// The duration of the walk as a service response.
    pub fn maximum_time(&self) -> MaximumTimeResponse {
        MaximumTimeResponse {
            maximum_time_s: self.maximum_time_s(),
        }
    }

    /// Get the dog's planned position at an absolute time.
    ///
    /// Before the walk starts this reports the path's start point, after the
    /// maximum time has elapsed it reports the final point with `ended` set.
    pub fn get_path(&self, req: GetPathRequest) -> GetPathResponse {
        let elapsed_s = if self.started {
            req.time_s - self.start_time_s
        } else {
            0.0
        };

        let started = self.started && elapsed_s >= 0.0;
        let ended = started && elapsed_s > self.maximum_time_s();

        let pose = if started {
            self.provider.pose_at_time(elapsed_s)
        } else {
            self.provider.pose_at_time(0.0)
        };

        GetPathResponse {
            position_m: pose.position_m,
            frame: pose.frame,
            stamp_s: req.time_s,
            started,
            ended,
            elapsed_s,
        }
    }

    /// Sample the entire dog path at a fixed increment.
    pub fn entire_path(
        &self,
        req: GetEntirePathRequest,
    ) -> Result<PathSamples<'_>, PathServerError> {
        self.samples(req.increment_s, false)
    }

    /// Sample the entire escort (robot) path at a fixed increment.
    pub fn entire_robot_path(
        &self,
        req: GetEntireRobotPathRequest,
    ) -> Result<PathSamples<'_>, PathServerError> {
        self.samples(req.increment_s, true)
    }

    /// Derive the escort pose at `t_s` seconds into the walk.
    ///
    /// The escort pose trails the dog's position along the path tangent and is
    /// shifted perpendicular to it, heading along the tangent.
    pub fn escort_pose_at(&self, t_s: f64) -> TimedPose {
        let dog = self.provider.pose_at_time(t_s);
        let ahead = self.provider.pose_at_time(t_s + self.params.slope_delta_s);

        let mut tangent = Vector2::new(
            ahead.position_m.x - dog.position_m.x,
            ahead.position_m.y - dog.position_m.y,
        );
        let norm = tangent.norm();
        if norm > f64::MIN_POSITIVE {
            tangent /= norm;
        } else {
            // Degenerate at the clamped end of the path, hold a fixed heading
            debug!("Degenerate path tangent at t = {:.2} s", t_s);
            tangent = Vector2::x();
        }

        let behind = Vector2::new(dog.position_m.x, dog.position_m.y)
            - tangent * self.params.trailing_distance_m;

        // Perpendicular is the tangent rotated +90 degrees
        let perpendicular = Vector2::new(-tangent.y, tangent.x);
        let escort = behind + perpendicular * self.params.shift_distance_m;

        TimedPose::new_ground(
            escort.x,
            escort.y,
            tangent.y.atan2(tangent.x),
            dog.frame,
            dog.stamp_s,
        )
    }

    fn samples(&self, increment_s: f64, escort: bool) -> Result<PathSamples<'_>, PathServerError> {
        if increment_s <= 0.0 {
            return Err(PathServerError::InvalidIncrement(increment_s));
        }

        Ok(PathSamples {
            server: self,
            increment_s,
            next_t_s: 0.0,
            escort,
        })
    }
}

impl PathQuery for PathServer {
    fn get_path(&self, req: GetPathRequest) -> Result<GetPathResponse, ClientError> {
        Ok(PathServer::get_path(self, req))
    }
}

impl<'a> Iterator for PathSamples<'a> {
    type Item = TimedPose;

    fn next(&mut self) -> Option<TimedPose> {
        let t = self.next_t_s;
        if t >= self.server.maximum_time_s() {
            return None;
        }
        self.next_t_s += self.increment_s;

        let mut pose = if self.escort {
            self.server.escort_pose_at(t)
        } else {
            self.server.provider.pose_at_time(t)
        };
        pose.stamp_s = self.server.start_time_s + t;

        Some(pose)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
