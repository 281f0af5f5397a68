//! Occupancy grid trajectory planning.
//!
//! [`map::GridMap`] indexes an occupancy grid, [`collision::CollisionValidator`]
//! checks robot footprints against it, [`astar::LatticeAStar`] searches the
//! move lattice and [`orchestrator::PlanningOrchestrator`] ties map, start and
//! goal notifications together into published trajectories.

pub mod astar;
pub mod collision;
pub mod error;
pub mod feed;
pub mod map;
pub mod motion;
pub mod orchestrator;
pub mod planner;
pub mod service;

pub use astar::LatticeAStar;
pub use collision::{CollisionValidator, ValidationMarker};
pub use error::{NavigationError, PlanningError, PoseRole, UpstreamSource};
pub use feed::{PoseUpdate, TopicFeed, UpstreamFeed};
pub use map::{CellState, GridMap, MapUpdate, Origin};
pub use motion::{MotionState, StateArena, StateId};
pub use orchestrator::{
    GoalOutcome, PlannerConfig, PlannerOutputs, PlanningOrchestrator, Trajectory, Waypoint,
};
pub use planner::{PlanRequest, Planner, SearchContext, SearchResult};
pub use service::run_planner_service;
