//! # Interface crate for the dog walk software.
//!
//! Provides the common geometry, service, and action types shared between the
//! executables and the transport layers that wrap them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Action goal and state definitions (coordination and movement actions)
pub mod action;

/// Common geometry types (poses, frames, velocity commands)
pub mod geom;

/// Service request/response definitions for the path server
pub mod services;
