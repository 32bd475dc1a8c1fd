//! Move planning
//!
//! Validates files against the allowed-extension policy and computes a
//! destination for each one.

mod allowed;
mod planner;

pub use allowed::AllowedExtensions;
pub use planner::{MoveOperation, MovePlan, MovePlanner, PlanningFailure, PlanningFailureReason};
