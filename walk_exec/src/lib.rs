//! # Walk executable library.
//!
//! This library allows other crates in the workspace (and the tests) to access
//! items defined inside the walk executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Client traits - the seams to the external collaborators (transforms, the
/// simulated dog, and the base/arm movement actions)
pub mod clients;

/// Coordination action - moves the base and positions the arm as one
/// preemptable two stage operation
pub mod coord_action;

/// Leash constraint solver - places the base and end-effector so the leash
/// stays taut at its fixed length
pub mod leash_ctrl;

/// Executable-level parameters
pub mod params;

/// Path providers - the family of time-parameterised dog path generators
pub mod path_provider;

/// Path scorer - measures how well the dog tracked its planned path
pub mod path_scorer;

/// Path server - owns the active path provider and answers path queries
pub mod path_server;

/// In-process simulation backend used by the executable and the tests
pub mod sim;

/// Walk driver - the periodic follower control loop
pub mod walk_driver;
