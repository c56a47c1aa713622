//! # Path server service definitions
//!
//! These types define the transport-agnostic RPC surface of the path server.
//! A transport layer (topic, socket, whatever) wraps these; the core only ever
//! sees the request and response structs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::Frame;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Request to start the walk clock. Single use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StartPathRequest {
    /// The time the walk starts at
    pub time_s: f64,
}

/// The duration of the configured walk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MaximumTimeResponse {
    /// The walk's duration
    pub maximum_time_s: f64,
}

/// Request for the dog's planned position at a given time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GetPathRequest {
    /// The time to query the path at
    pub time_s: f64,
}

/// The dog's planned position and the state of the walk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GetPathResponse {
    /// The planned position of the dog
    pub position_m: Point3<f64>,

    /// The frame `position_m` is expressed in
    pub frame: Frame,

    /// The time the position is valid at
    pub stamp_s: f64,

    /// True once the walk has been started
    pub started: bool,

    /// True once the walk's maximum time has elapsed. Terminal.
    pub ended: bool,

    /// Time elapsed since the start of the walk
    pub elapsed_s: f64,
}

/// Request for the full dog path sampled at a fixed increment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GetEntirePathRequest {
    /// The sample spacing. Must be greater than zero.
    pub increment_s: f64,
}

/// Request for the full escort (robot) path sampled at a fixed increment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GetEntireRobotPathRequest {
    /// The sample spacing. Must be greater than zero.
    pub increment_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised by clients of external services.
///
/// All waits on external services are bounded, an operation that cannot
/// complete within its timeout fails with [`ClientError::Timeout`] rather
/// than blocking the control cycle.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("The upstream service \"{0}\" is unavailable")]
    ServiceUnavailable(String),

    #[error("Timed out after {timeout_s} s waiting for {what}")]
    Timeout { what: String, timeout_s: f64 },
}
