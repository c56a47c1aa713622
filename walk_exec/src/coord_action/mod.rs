//! # Coordination action
//!
//! The "adjust dog position" action: given the dog's pose and a goal point on
//! its path, solve the leash constraint and drive the base and the arm to the
//! solved targets as one preemptable operation.
//!
//! Goals are fire and forget. [`AdjustDogAction::send_goal`] returns
//! immediately and the goal executes on a worker thread, a newer goal or an
//! explicit [`AdjustDogAction::preempt`] cancels whatever is still in flight.
//! The action never waits on the movement goals beyond a short settle time,
//! anything still moving after that is released to finish on its own.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use thiserror::Error;
use util::time::seconds_to_duration;

use walk_if::action::{ActionState, AdjustDogGoal, GoalHandle, MoveArmGoal, MoveRobotGoal};
use walk_if::geom::Frame;
use walk_if::services::ClientError;

use crate::clients::{FrameResolver, MoveArmClient, MoveRobotClient};
use crate::leash_ctrl::{LeashCtrl, LeashCtrlError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Coordination action parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordActionParams {
    /// How long to wait for the movement goals to settle before releasing
    /// them
    pub settle_wait_s: f64,

    /// Timeout on transform lookups
    pub transform_timeout_s: f64,
}

/// The coordination action server.
pub struct AdjustDogAction {
    params: CoordActionParams,
    leash_ctrl: LeashCtrl,
    state: Mutex<ActionState>,
    /// Handles on the (base, arm) goals currently in flight
    active_goals: Mutex<Option<(GoalHandle, GoalHandle)>>,
    frames: Box<dyn FrameResolver + Send + Sync>,
    move_robot: Box<dyn MoveRobotClient>,
    move_arm: Box<dyn MoveArmClient>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised by the coordination action.
#[derive(Debug, Error)]
pub enum CoordActionError {
    #[error("Could not transform {what} into the base frame: {source}")]
    TransformUnavailable {
        what: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("Leash solver error: {0}")]
    Leash(#[from] LeashCtrlError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CoordActionParams {
    fn default() -> Self {
        Self {
            settle_wait_s: 0.5,
            transform_timeout_s: 1.0,
        }
    }
}

impl AdjustDogAction {
    pub fn new(
        params: CoordActionParams,
        leash_ctrl: LeashCtrl,
        frames: Box<dyn FrameResolver + Send + Sync>,
        move_robot: Box<dyn MoveRobotClient>,
        move_arm: Box<dyn MoveArmClient>,
    ) -> Self {
        Self {
            params,
            leash_ctrl,
            state: Mutex::new(ActionState::Idle),
            active_goals: Mutex::new(None),
            frames,
            move_robot,
            move_arm,
        }
    }

    /// The state of the most recent goal.
    pub fn state(&self) -> ActionState {
        *self.lock_state()
    }

    /// Issue a goal, executing it on a worker thread.
    pub fn send_goal(self: &Arc<Self>, goal: AdjustDogGoal) {
        let action = Arc::clone(self);
        thread::spawn(move || {
            if let Err(e) = action.execute(goal) {
                warn!("Coordination goal failed: {}", e);
            }
        });
    }

    /// Cancel the in-flight goal, if any.
    ///
    /// Cancels both movement goals and marks the action preempted. A no-op
    /// unless a goal is active.
    pub fn preempt(&self) {
        let mut state = self.lock_state();
        if *state != ActionState::Active {
            debug!("Preempt with no active goal, ignoring");
            return;
        }

        if let Some((base, arm)) = self.lock_goals().take() {
            base.cancel();
            arm.cancel();
        }

        *state = ActionState::Preempted;
        info!("Coordination goal preempted");
    }

    /// Execute a goal to completion. Blocks for up to the settle wait.
    pub fn execute(&self, goal: AdjustDogGoal) -> Result<ActionState, CoordActionError> {
        // A new goal supersedes anything still in flight
        self.preempt();
        *self.lock_state() = ActionState::Active;

        let timeout_s = self.params.transform_timeout_s;

        // Bring everything into the base frame
        let goal_in_base = if goal.goal_frame == Frame::BaseFootprint {
            goal.goal_position_m
        } else {
            self.frames
                .transform_point(
                    Frame::BaseFootprint,
                    goal.goal_frame,
                    &goal.goal_position_m,
                    timeout_s,
                )
                .map_err(|source| {
                    self.abort();
                    CoordActionError::TransformUnavailable {
                        what: "the goal position",
                        source,
                    }
                })?
        };

        let dog_in_base = if goal.dog_pose.frame == Frame::BaseFootprint {
            goal.dog_pose
        } else {
            self.frames
                .transform_pose(Frame::BaseFootprint, &goal.dog_pose, timeout_s)
                .map_err(|source| {
                    self.abort();
                    CoordActionError::TransformUnavailable {
                        what: "the dog pose",
                        source,
                    }
                })?
        };

        // The end-effector position is the origin of the wrist frame
        let hand_in_base = self
            .frames
            .transform_point(
                Frame::BaseFootprint,
                Frame::WristRoll,
                &Point3::origin(),
                timeout_s,
            )
            .map_err(|source| {
                self.abort();
                CoordActionError::TransformUnavailable {
                    what: "the end-effector position",
                    source,
                }
            })?;

        let (solution, report) = self
            .leash_ctrl
            .solve(&dog_in_base.position_m, &goal_in_base, &hand_in_base)
            .map_err(|e| {
                self.abort();
                e
            })?;

        debug!(
            "Coordination solve: dog to goal = {:.3} m, planar leash = {:.3} m",
            report.dog_to_goal_m, report.planar_leash_m
        );

        // Preempt may have landed while solving
        if *self.lock_state() != ActionState::Active {
            return Ok(ActionState::Preempted);
        }

        let base_handle = self.move_robot.send_goal(MoveRobotGoal {
            target_m: solution.base_target_m,
            frame: Frame::BaseFootprint,
        });
        let arm_handle = self.move_arm.send_goal(MoveArmGoal {
            target_m: solution.arm_target_m,
            frame: Frame::BaseFootprint,
        });
        *self.lock_goals() = Some((base_handle.clone(), arm_handle.clone()));

        // Bounded settle wait, then release anything still moving so the
        // next goal is not held up
        base_handle.wait_timeout(seconds_to_duration(self.params.settle_wait_s));
        if base_handle.is_active() {
            base_handle.cancel();
        }
        if arm_handle.is_active() {
            arm_handle.cancel();
        }
        *self.lock_goals() = None;

        let mut state = self.lock_state();
        if *state == ActionState::Active {
            *state = ActionState::Succeeded;
        }
        info!("Coordination goal finished: {}", *state);
        Ok(*state)
    }

    fn abort(&self) {
        *self.lock_state() = ActionState::Aborted;
    }

    fn lock_state(&self) -> MutexGuard<'_, ActionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_goals(&self) -> MutexGuard<'_, Option<(GoalHandle, GoalHandle)>> {
        self.active_goals.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::leash_ctrl::LeashCtrlParams;
    use std::time::Duration;
    use walk_if::geom::TimedPose;

    /// Identity transforms with a fixed wrist offset, optionally failing.
    struct StubFrames {
        fail: bool,
    }

    impl FrameResolver for StubFrames {
        fn transform_point(
            &self,
            _target: Frame,
            source: Frame,
            point_m: &Point3<f64>,
            _timeout_s: f64,
        ) -> Result<Point3<f64>, ClientError> {
            if self.fail {
                return Err(ClientError::ServiceUnavailable("transforms".into()));
            }
            match source {
                Frame::WristRoll => Ok(Point3::new(0.6, 0.0, 1.0) + point_m.coords),
                _ => Ok(*point_m),
            }
        }

        fn transform_pose(
            &self,
            target: Frame,
            pose: &TimedPose,
            _timeout_s: f64,
        ) -> Result<TimedPose, ClientError> {
            if self.fail {
                return Err(ClientError::ServiceUnavailable("transforms".into()));
            }
            Ok(TimedPose {
                frame: target,
                ..*pose
            })
        }
    }

    /// Records base goals and optionally completes them immediately.
    struct StubMoveRobot {
        goals: Mutex<Vec<MoveRobotGoal>>,
        complete_immediately: bool,
    }

    impl MoveRobotClient for StubMoveRobot {
        fn send_goal(&self, goal: MoveRobotGoal) -> GoalHandle {
            self.goals.lock().unwrap().push(goal);
            let handle = GoalHandle::new();
            if self.complete_immediately {
                handle.complete();
            }
            handle
        }
    }

    struct StubMoveArm {
        goals: Mutex<Vec<MoveArmGoal>>,
    }

    impl MoveArmClient for StubMoveArm {
        fn send_goal(&self, goal: MoveArmGoal) -> GoalHandle {
            self.goals.lock().unwrap().push(goal);
            let handle = GoalHandle::new();
            handle.complete();
            handle
        }
    }

    fn make_action(fail_transforms: bool, settle_wait_s: f64) -> Arc<AdjustDogAction> {
        Arc::new(AdjustDogAction::new(
            CoordActionParams {
                settle_wait_s,
                transform_timeout_s: 0.1,
            },
            LeashCtrl::init(LeashCtrlParams::default()).unwrap(),
            Box::new(StubFrames {
                fail: fail_transforms,
            }),
            Box::new(StubMoveRobot {
                goals: Mutex::new(Vec::new()),
                complete_immediately: true,
            }),
            Box::new(StubMoveArm {
                goals: Mutex::new(Vec::new()),
            }),
        ))
    }

    fn base_frame_goal() -> AdjustDogGoal {
        AdjustDogGoal {
            dog_pose: TimedPose::new_ground(0.0, 0.0, 0.0, Frame::BaseFootprint, 0.0),
            goal_position_m: Point3::new(5.0, 0.0, 0.0),
            goal_frame: Frame::BaseFootprint,
        }
    }

    #[test]
    fn test_execute_succeeds() {
        let action = make_action(false, 0.05);
        let state = action.execute(base_frame_goal()).unwrap();

        assert_eq!(state, ActionState::Succeeded);
        assert_eq!(action.state(), ActionState::Succeeded);
    }

    #[test]
    fn test_execute_aborts_on_transform_failure() {
        let action = make_action(true, 0.05);
        let result = action.execute(base_frame_goal());

        assert!(matches!(
            result,
            Err(CoordActionError::TransformUnavailable { .. })
        ));
        assert_eq!(action.state(), ActionState::Aborted);
    }

    #[test]
    fn test_preempt_with_no_goal_is_noop() {
        let action = make_action(false, 0.05);
        action.preempt();
        assert_eq!(action.state(), ActionState::Idle);
    }

    #[test]
    fn test_preempt_cancels_in_flight_goal() {
        // Base goals never complete so execute blocks in its settle wait
        let action = Arc::new(AdjustDogAction::new(
            CoordActionParams {
                settle_wait_s: 2.0,
                transform_timeout_s: 0.1,
            },
            LeashCtrl::init(LeashCtrlParams::default()).unwrap(),
            Box::new(StubFrames { fail: false }),
            Box::new(StubMoveRobot {
                goals: Mutex::new(Vec::new()),
                complete_immediately: false,
            }),
            Box::new(StubMoveArm {
                goals: Mutex::new(Vec::new()),
            }),
        ));

        let worker = Arc::clone(&action);
        let t = thread::spawn(move || worker.execute(base_frame_goal()));

        // Let the worker reach its settle wait, then preempt
        thread::sleep(Duration::from_millis(100));
        action.preempt();

        let state = t.join().unwrap().unwrap();
        assert_eq!(state, ActionState::Preempted);
        assert_eq!(action.state(), ActionState::Preempted);
    }
}
