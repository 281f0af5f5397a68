//! This module defines the error types used by the `grid-navigation` crate.

#![warn(missing_docs)]

use std::time::Duration;

/// Error type for occupancy grid operations.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationError {
    /// Error for out-of-range cell access.
    /// This variant is returned when a row/column pair lies outside the grid.
    OutOfRange {
        /// Requested row.
        row: i64,
        /// Requested column.
        col: i64,
    },
    /// Error for a malformed map update.
    /// This variant is returned when dimensions, resolution or cell count are inconsistent.
    InvalidMap(&'static str),
}

impl core::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NavigationError::OutOfRange { row, col } => {
                write!(f, "Grid indices out of range: ({}, {})", row, col)
            }
            NavigationError::InvalidMap(msg) => write!(f, "Invalid map: {}", msg),
        }
    }
}

impl core::error::Error for NavigationError {}

/// Which pose of a planning request a notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseRole {
    /// The robot's start pose.
    Start,
    /// The requested goal pose.
    Goal,
}

impl core::fmt::Display for PoseRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PoseRole::Start => write!(f, "start"),
            PoseRole::Goal => write!(f, "goal"),
        }
    }
}

/// Upstream stream the orchestrator waits on while handling a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamSource {
    /// Occupancy grid updates.
    Map,
    /// Start pose updates.
    Start,
}

impl core::fmt::Display for UpstreamSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UpstreamSource::Map => write!(f, "map"),
            UpstreamSource::Start => write!(f, "start pose"),
        }
    }
}

/// Error type for the planning orchestrator.
///
/// Every variant is absorbed and logged by the service loop; handlers still
/// return it so callers and tests can observe what happened.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// A notification arrived while another one was being handled and was dropped.
    ConcurrentRequestIgnored,
    /// A pose was received before any map was available.
    NoMap,
    /// The collision validator rejected a candidate pose.
    InvalidPose {
        /// Whether the pose was a start or a goal candidate.
        role: PoseRole,
        /// Candidate x position (m).
        x: f64,
        /// Candidate y position (m).
        y: f64,
    },
    /// The search strategy exhausted its budget without reaching the goal.
    NoPathFound,
    /// No fresh upstream message arrived within the configured timeout.
    UpstreamTimeout {
        /// The stream that was awaited.
        source: UpstreamSource,
        /// How long the orchestrator waited.
        waited: Duration,
    },
    /// The upstream stream was closed while the orchestrator waited on it.
    UpstreamClosed(UpstreamSource),
    /// A map update could not be turned into an occupancy grid.
    Map(NavigationError),
}

impl core::fmt::Display for PlanningError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PlanningError::ConcurrentRequestIgnored => {
                write!(f, "Planner is busy, notification ignored")
            }
            PlanningError::NoMap => write!(f, "No map available"),
            PlanningError::InvalidPose { role, x, y } => {
                write!(f, "Invalid {} pose at ({:.3}, {:.3})", role, x, y)
            }
            PlanningError::NoPathFound => write!(f, "No path found"),
            PlanningError::UpstreamTimeout { source, waited } => {
                write!(f, "Timed out after {:?} waiting for {}", waited, source)
            }
            PlanningError::UpstreamClosed(source) => write!(f, "Upstream {} stream closed", source),
            PlanningError::Map(err) => write!(f, "{}", err),
        }
    }
}

impl core::error::Error for PlanningError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            PlanningError::Map(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NavigationError> for PlanningError {
    fn from(err: NavigationError) -> Self {
        PlanningError::Map(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlanningError::InvalidPose {
            role: PoseRole::Goal,
            x: 1.0,
            y: 2.5,
        };
        assert_eq!(format!("{}", err), "Invalid goal pose at (1.000, 2.500)");

        let err = PlanningError::UpstreamTimeout {
            source: UpstreamSource::Map,
            waited: Duration::from_millis(50),
        };
        assert_eq!(format!("{}", err), "Timed out after 50ms waiting for map");
    }

    #[test]
    fn test_error_from_navigation() {
        let err: PlanningError = NavigationError::InvalidMap("empty").into();
        assert!(matches!(err, PlanningError::Map(NavigationError::InvalidMap(_))));
        assert!(core::error::Error::source(&err).is_some());
    }
}
