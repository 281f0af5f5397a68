//! Planning orchestrator.
//!
//! Owns the current map, start and goal, validates incoming poses, drives
//! the search strategy once all three are known and publishes the
//! reconstructed trajectory.
//!
//! One notification is handled at a time. The gate is a
//! [`tokio::sync::Mutex`] taken with `try_lock`: a notification that finds it
//! held is dropped with a warning, never queued. The guard is released on
//! every exit path, including a panicking search.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use motion_primitives::{Footprint, Move, Pose};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{Mutex, MutexGuard, broadcast};
use tracing::{debug, error, info, warn};

use crate::collision::{CollisionValidator, ValidationMarker};
use crate::error::{PlanningError, PoseRole, UpstreamSource};
use crate::feed::{PoseUpdate, UpstreamFeed};
use crate::map::{GridMap, MapUpdate};
use crate::motion::{MotionState, StateArena, StateId};
use crate::planner::{PlanRequest, Planner, SearchContext};

/// Default bound on each upstream wait while handling a goal.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);
/// Default number of validation markers kept per planning session.
pub const DEFAULT_MARKER_CAPACITY: usize = 1024;

/// Static inputs of every planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Robot footprint used for every collision check
    pub footprint: Footprint,
    /// Move set handed to the search strategy
    pub moves: Vec<Move>,
    /// Marker history size
    pub marker_capacity: usize,
    /// Bound on each upstream wait
    pub upstream_timeout: Duration,
}

impl PlannerConfig {
    /// Creates a config with default marker capacity and upstream timeout.
    pub fn new(footprint: Footprint, moves: Vec<Move>) -> Self {
        Self {
            footprint,
            moves,
            marker_capacity: DEFAULT_MARKER_CAPACITY,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Sets the marker history size.
    pub fn with_marker_capacity(mut self, capacity: usize) -> Self {
        self.marker_capacity = capacity;
        self
    }

    /// Sets the bound on each upstream wait.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}

/// Outbound streams of the orchestrator.
#[derive(Debug, Clone)]
pub struct PlannerOutputs {
    /// Planned trajectories, start to goal
    pub trajectory: broadcast::Sender<Arc<Trajectory>>,
    /// Poses expanded by the search
    pub debug_pose: broadcast::Sender<Arc<Pose>>,
    /// Full marker history after every validation
    pub markers: broadcast::Sender<Arc<Vec<ValidationMarker>>>,
}

impl PlannerOutputs {
    /// Creates the three streams with the given capacity each.
    pub fn new(capacity: usize) -> Self {
        let (trajectory, _) = broadcast::channel(capacity);
        let (debug_pose, _) = broadcast::channel(capacity);
        let (markers, _) = broadcast::channel(capacity);
        Self {
            trajectory,
            debug_pose,
            markers,
        }
    }
}

/// One pose of a planned trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    /// Position in the trajectory, 0 at the start
    pub seq: usize,
    /// Pose of the robot center
    pub pose: Pose,
}

/// A planned path from start to goal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trajectory {
    /// Waypoints, start first
    pub waypoints: Vec<Waypoint>,
    /// Footprint the path was validated with
    pub footprint: Footprint,
}

impl Trajectory {
    /// Rebuilds the path ending at `terminal` by walking its parent links
    /// back to the root and reversing the result.
    pub fn from_search(arena: &StateArena, terminal: StateId, footprint: Footprint) -> Self {
        let waypoints = arena
            .trace(terminal)
            .into_iter()
            .enumerate()
            .map(|(seq, state)| Waypoint {
                seq,
                pose: state.pose(),
            })
            .collect();
        Self {
            waypoints,
            footprint,
        }
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Returns true if there are no waypoints.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// Result of an accepted goal notification.
#[derive(Debug, Clone, PartialEq)]
pub enum GoalOutcome {
    /// The goal was stored but no valid start is known yet.
    GoalSet,
    /// The goal was stored and a trajectory was published.
    Planned(Arc<Trajectory>),
}

/// Copy of the orchestrator's state, for callers and tests.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Current map
    pub map: Option<Arc<GridMap>>,
    /// Current start
    pub start: Option<MotionState>,
    /// Current goal
    pub goal: Option<MotionState>,
    /// Markers in the current history
    pub markers: usize,
}

#[derive(Debug)]
struct Session {
    map: Option<Arc<GridMap>>,
    start: Option<MotionState>,
    goal: Option<MotionState>,
    validator: CollisionValidator,
}

impl Session {
    fn replace_map(&mut self, update: MapUpdate) -> Result<(), PlanningError> {
        let map = GridMap::from_update(update).map_err(|e| {
            warn!(error = %e, "Map update rejected");
            PlanningError::from(e)
        })?;
        info!(
            width = map.width(),
            height = map.height(),
            resolution = map.resolution(),
            "New map was set"
        );
        self.map = Some(Arc::new(map));
        self.validator.reset_markers();
        Ok(())
    }

    fn validate_candidate(
        &mut self,
        role: PoseRole,
        update: PoseUpdate,
        footprint: &Footprint,
    ) -> Result<MotionState, PlanningError> {
        let Some(map) = self.map.clone() else {
            warn!(%role, "No map available, pose discarded");
            return Err(PlanningError::NoMap);
        };
        // NaN would truncate to cell 0 and pass the scan.
        if !(update.x.is_finite() && update.y.is_finite()) {
            warn!(%role, x = update.x, y = update.y, "Non-finite pose, discarded");
            return Err(PlanningError::InvalidPose {
                role,
                x: update.x,
                y: update.y,
            });
        }
        let candidate = MotionState::from(update);
        if !self.validator.is_allowed(&map, &candidate, footprint) {
            warn!(%role, x = update.x, y = update.y, "New pose is bad, discarded");
            return Err(PlanningError::InvalidPose {
                role,
                x: update.x,
                y: update.y,
            });
        }
        Ok(candidate)
    }

    fn ready_to_plan(&self) -> bool {
        self.map.is_some() && self.start.is_some() && self.goal.is_some()
    }
}

/// Runs a CPU-bound search without stalling the other tasks of a
/// multi-thread runtime. Other flavors run it inline.
fn run_search<R>(search: impl FnOnce() -> R) -> R {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(search),
        _ => search(),
    }
}

/// Arbitrates map, start and goal notifications and runs the search strategy.
pub struct PlanningOrchestrator<P, F> {
    planner: P,
    feed: F,
    config: PlannerConfig,
    outputs: PlannerOutputs,
    session: Mutex<Session>,
}

impl<P: Planner, F: UpstreamFeed> PlanningOrchestrator<P, F> {
    /// Creates an idle orchestrator with no map, start or goal.
    pub fn new(planner: P, feed: F, config: PlannerConfig, outputs: PlannerOutputs) -> Self {
        let validator = CollisionValidator::new(config.marker_capacity)
            .with_publisher(outputs.markers.clone());
        Self {
            planner,
            feed,
            config,
            outputs,
            session: Mutex::new(Session {
                map: None,
                start: None,
                goal: None,
                validator,
            }),
        }
    }

    /// Static planning inputs.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Outbound streams.
    pub fn outputs(&self) -> &PlannerOutputs {
        &self.outputs
    }

    fn try_enter(&self, notification: &'static str) -> Result<MutexGuard<'_, Session>, PlanningError> {
        self.session.try_lock().map_err(|_| {
            warn!(notification, "Planner is busy, notification ignored");
            PlanningError::ConcurrentRequestIgnored
        })
    }

    /// Replaces the current map.
    pub fn on_map(&self, update: MapUpdate) -> Result<(), PlanningError> {
        let mut session = self.try_enter("map")?;
        session.replace_map(update)
    }

    /// Validates a start candidate against the current map and stores it if allowed.
    pub fn on_start(&self, update: PoseUpdate) -> Result<(), PlanningError> {
        let mut session = self.try_enter("start")?;
        let start = session.validate_candidate(PoseRole::Start, update, &self.config.footprint)?;
        info!(x = start.x, y = start.y, "New start was set");
        session.start = Some(start);
        Ok(())
    }

    /// Refreshes map and start from upstream, validates the goal and plans
    /// if map, start and goal are all known.
    pub async fn on_goal(&self, update: PoseUpdate) -> Result<GoalOutcome, PlanningError> {
        let mut guard = self.try_enter("goal")?;
        let session = &mut *guard;

        let map = self.fetch(UpstreamSource::Map, self.feed.next_map()).await?;
        session.replace_map(map)?;

        let start = self.fetch(UpstreamSource::Start, self.feed.next_start()).await?;
        match session.validate_candidate(PoseRole::Start, start, &self.config.footprint) {
            Ok(state) => {
                info!(x = state.x, y = state.y, "New start was set");
                session.start = Some(state);
            }
            Err(e) => debug!(error = %e, "Keeping previous start"),
        }

        let goal = session.validate_candidate(PoseRole::Goal, update, &self.config.footprint)?;
        info!(x = goal.x, y = goal.y, "New goal was set");
        session.goal = Some(goal);

        if !session.ready_to_plan() {
            return Ok(GoalOutcome::GoalSet);
        }
        self.replan(session).map(GoalOutcome::Planned)
    }

    /// Waits for the gate and copies the current state.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock().await;
        SessionSnapshot {
            map: session.map.clone(),
            start: session.start.clone(),
            goal: session.goal.clone(),
            markers: session.validator.markers().len(),
        }
    }

    async fn fetch<T>(
        &self,
        source: UpstreamSource,
        next: impl Future<Output = Option<T>>,
    ) -> Result<T, PlanningError> {
        let waited = self.config.upstream_timeout;
        match tokio::time::timeout(waited, next).await {
            Ok(Some(msg)) => Ok(msg),
            Ok(None) => {
                error!(%source, "Upstream closed while waiting");
                Err(PlanningError::UpstreamClosed(source))
            }
            Err(_) => {
                error!(%source, ?waited, "Timed out waiting for upstream");
                Err(PlanningError::UpstreamTimeout { source, waited })
            }
        }
    }

    fn replan(&self, session: &mut Session) -> Result<Arc<Trajectory>, PlanningError> {
        let (Some(map), Some(start), Some(goal)) =
            (session.map.clone(), session.start.as_ref(), session.goal.as_ref())
        else {
            return Err(PlanningError::NoMap);
        };
        info!(start = %start.pose(), goal = %goal.pose(), "Planning was started");

        let request = PlanRequest {
            map: &map,
            moves: &self.config.moves,
            footprint: &self.config.footprint,
            start,
            goal,
        };
        let mut ctx = SearchContext::new(&mut session.validator, Some(&self.outputs.debug_pose));
        let Some(result) = run_search(|| self.planner.plan(&request, &mut ctx)) else {
            info!("No path found");
            return Err(PlanningError::NoPathFound);
        };

        let trajectory = Arc::new(Trajectory::from_search(
            &result.arena,
            result.terminal,
            self.config.footprint,
        ));
        if self.outputs.trajectory.receiver_count() > 0 {
            if let Err(e) = self.outputs.trajectory.send(Arc::clone(&trajectory)) {
                warn!("Failed to publish trajectory: {}", e);
            }
        }
        info!(
            waypoints = trajectory.len(),
            expansions = result.expansions,
            "Planning was finished"
        );
        Ok(trajectory)
    }
}
