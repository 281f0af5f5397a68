//! Search strategy interface.
//!
//! The orchestrator does not know how a path is found. It hands a
//! [`PlanRequest`] and a [`SearchContext`] to a [`Planner`] chosen at
//! construction time and interprets the returned [`SearchResult`].

use std::sync::Arc;

use motion_primitives::{Footprint, Move, Pose};
use tokio::sync::broadcast;
use tracing::trace;

use crate::collision::CollisionValidator;
use crate::map::GridMap;
use crate::motion::{MotionState, StateArena, StateId};

/// Inputs of one planning run.
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    /// Occupancy grid to plan on
    pub map: &'a GridMap,
    /// Displacements the search may apply
    pub moves: &'a [Move],
    /// Robot footprint used for collision checks
    pub footprint: &'a Footprint,
    /// Root of the search
    pub start: &'a MotionState,
    /// Target pose
    pub goal: &'a MotionState,
}

/// Services the orchestrator lends to a search: collision checks (with
/// their markers) and the debug pose stream.
pub struct SearchContext<'a> {
    validator: &'a mut CollisionValidator,
    debug_pose: Option<&'a broadcast::Sender<Arc<Pose>>>,
}

impl<'a> SearchContext<'a> {
    /// Creates a context around `validator`, publishing expanded poses on `debug_pose` if given.
    pub fn new(
        validator: &'a mut CollisionValidator,
        debug_pose: Option<&'a broadcast::Sender<Arc<Pose>>>,
    ) -> Self {
        Self {
            validator,
            debug_pose,
        }
    }

    /// Collision check that records a validation marker.
    pub fn is_allowed(&mut self, map: &GridMap, state: &MotionState, footprint: &Footprint) -> bool {
        self.validator.is_allowed(map, state, footprint)
    }

    /// Publishes the pose the search is currently expanding.
    pub fn publish_debug(&self, pose: Pose) {
        if let Some(tx) = self.debug_pose {
            if tx.receiver_count() > 0 && tx.send(Arc::new(pose)).is_err() {
                trace!("Debug pose dropped, no receivers");
            }
        }
    }
}

/// States allocated by a successful search and the state that reached the goal.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Every state the search allocated
    pub arena: StateArena,
    /// Last state of the path
    pub terminal: StateId,
    /// Number of expanded states
    pub expansions: usize,
}

/// A graph search from `request.start` to `request.goal`.
///
/// Returns `None` when no path was found.
pub trait Planner: Send + Sync {
    /// Runs the search.
    fn plan(&self, request: &PlanRequest<'_>, ctx: &mut SearchContext<'_>) -> Option<SearchResult>;
}

impl<P: Planner + ?Sized> Planner for Box<P> {
    fn plan(&self, request: &PlanRequest<'_>, ctx: &mut SearchContext<'_>) -> Option<SearchResult> {
        (**self).plan(request, ctx)
    }
}
