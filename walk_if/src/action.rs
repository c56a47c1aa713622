//! # Action definitions
//!
//! Goal types and goal handles for the movement and coordination actions. A
//! [`GoalHandle`] is the client's view of a fire-and-forget goal: it can be
//! waited on with a bounded timeout, cancelled, and completed by the executor.
//! This replaces a full action transport with the minimum the core needs:
//! cancellation and a bounded settle wait.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::geom::{Frame, TimedPose};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The state of an action server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionState {
    /// No goal has been received yet
    Idle,

    /// A goal is being executed
    Active,

    /// The last goal completed successfully
    Succeeded,

    /// The last goal was preempted by an external cancel
    Preempted,

    /// The last goal was aborted due to an error
    Aborted,
}

/// The state of a single fire-and-forget goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalState {
    /// The goal is still being executed
    Active,

    /// The goal was cancelled before completing
    Cancelled,

    /// The goal completed
    Complete,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Goal for the coordination (adjust dog position) action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustDogGoal {
    /// The current pose of the dog
    pub dog_pose: TimedPose,

    /// The target point on the dog's path, ahead of the dog
    pub goal_position_m: Point3<f64>,

    /// The frame `goal_position_m` is expressed in
    pub goal_frame: Frame,
}

/// Goal for the base movement action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveRobotGoal {
    /// The target base position (on the ground plane)
    pub target_m: Point3<f64>,

    /// The frame `target_m` is expressed in
    pub frame: Frame,
}

/// Goal for the arm movement action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveArmGoal {
    /// The target end-effector position
    pub target_m: Point3<f64>,

    /// The frame `target_m` is expressed in
    pub frame: Frame,
}

/// A cancellable, waitable handle on an in-flight goal.
///
/// Cloning the handle shares the underlying goal, the executor keeps one
/// clone and marks it complete, the issuer keeps another to wait or cancel.
#[derive(Clone)]
pub struct GoalHandle(Arc<GoalShared>);

struct GoalShared {
    state: Mutex<GoalState>,
    cvar: Condvar,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GoalHandle {
    /// Create a new handle in the `Active` state.
    pub fn new() -> Self {
        Self(Arc::new(GoalShared {
            state: Mutex::new(GoalState::Active),
            cvar: Condvar::new(),
        }))
    }

    /// Get the current state of the goal.
    pub fn state(&self) -> GoalState {
        *self.lock_state()
    }

    /// True while the goal has neither completed nor been cancelled.
    pub fn is_active(&self) -> bool {
        self.state() == GoalState::Active
    }

    /// Cancel the goal. A no-op if the goal has already finished.
    pub fn cancel(&self) {
        self.finish(GoalState::Cancelled)
    }

    /// Mark the goal complete. A no-op if the goal was already cancelled.
    pub fn complete(&self) {
        self.finish(GoalState::Complete)
    }

    /// Wait for the goal to finish, up to the given timeout.
    ///
    /// Returns the state of the goal at the end of the wait, `Active` means
    /// the timeout expired with the goal still in flight.
    pub fn wait_timeout(&self, timeout: Duration) -> GoalState {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock_state();

        while *state == GoalState::Active {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = self
                .0
                .cvar
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }

        *state
    }

    fn finish(&self, end_state: GoalState) {
        let mut state = self.lock_state();
        if *state == GoalState::Active {
            *state = end_state;
            self.0.cvar.notify_all();
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, GoalState> {
        self.0.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for GoalHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionState::Idle => write!(f, "Idle"),
            ActionState::Active => write!(f, "Active"),
            ActionState::Succeeded => write!(f, "Succeeded"),
            ActionState::Preempted => write!(f, "Preempted"),
            ActionState::Aborted => write!(f, "Aborted"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
