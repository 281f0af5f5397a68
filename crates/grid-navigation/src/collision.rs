//! Footprint collision validation against an occupancy grid.
//!
//! The validator approximates the robot footprint by a square whose side is
//! the larger footprint extent, converts the square's two corners to cell
//! indices independently and scans the enclosed cells row by row.
//!
//! Two details of the scan are observable:
//! - Each corner is truncated on its own, so the scanned box can be one cell
//!   larger on one side than on the other.
//! - A blocking cell (`100` or `-1`) ends the scan at once, while an
//!   out-of-range cell is only remembered and rejects the pose after the
//!   scan completes.

use std::collections::VecDeque;
use std::sync::Arc;

use motion_primitives::{Footprint, Pose};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::map::{CellState, GridMap};
use crate::motion::MotionState;

/// Marker color, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
}

/// Color of markers for accepted poses.
pub const ALLOWED_COLOR: Rgb = Rgb { r: 0.0, g: 1.0, b: 0.0 };
/// Color of markers for rejected poses.
pub const BLOCKED_COLOR: Rgb = Rgb { r: 0.0, g: 0.0, b: 1.0 };

/// Diagnostic marker for one validated pose.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationMarker {
    /// Strictly increasing marker id
    pub id: u64,
    /// Validated pose
    pub pose: Pose,
    /// Footprint drawn around the pose
    pub scale: Footprint,
    /// Green if allowed, blue if blocked
    pub color: Rgb,
}

/// Inclusive cell range covered by a footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBounds {
    /// First row
    pub min_row: i64,
    /// First column
    pub min_col: i64,
    /// Last row (inclusive)
    pub max_row: i64,
    /// Last column (inclusive)
    pub max_col: i64,
}

impl CellBounds {
    /// Every `(row, col)` in the range, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        (self.min_row..=self.max_row)
            .flat_map(move |row| (self.min_col..=self.max_col).map(move |col| (row, col)))
    }
}

/// Why a footprint was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// An occupied or unknown cell lies under the footprint.
    BlockingCell {
        /// Row of the cell
        row: i64,
        /// Column of the cell
        col: i64,
        /// What the cell holds
        state: CellState,
    },
    /// Part of the footprint lies outside the grid. Reports the first such cell.
    OutOfRange {
        /// Row of the cell
        row: i64,
        /// Column of the cell
        col: i64,
    },
}

/// Outcome of a side-effect free footprint check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FootprintCheck {
    /// Cells that were scanned
    pub bounds: CellBounds,
    /// `None` if the footprint is allowed
    pub rejection: Option<Rejection>,
}

impl FootprintCheck {
    /// Returns true if the footprint is collision free.
    pub fn is_allowed(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Cells covered by a footprint centered at `(x, y)`.
pub fn footprint_bounds(map: &GridMap, x: f64, y: f64, footprint: &Footprint) -> CellBounds {
    let half = footprint.side() / 2.0;
    let (min_row, min_col) = map.coord_to_indices(x - half, y - half);
    let (max_row, max_col) = map.coord_to_indices(x + half, y + half);
    CellBounds {
        min_row,
        min_col,
        max_row,
        max_col,
    }
}

/// Classifies a footprint centered at `(x, y)` without touching any marker state.
pub fn check_footprint(map: &GridMap, x: f64, y: f64, footprint: &Footprint) -> FootprintCheck {
    let bounds = footprint_bounds(map, x, y, footprint);
    let mut out_of_range = None;

    for (row, col) in bounds.cells() {
        match map.cell_at(row, col) {
            Ok(value) => {
                let state = CellState::from_value(value);
                if state.is_blocking() {
                    return FootprintCheck {
                        bounds,
                        rejection: Some(Rejection::BlockingCell { row, col, state }),
                    };
                }
            }
            Err(_) => {
                if out_of_range.is_none() {
                    out_of_range = Some(Rejection::OutOfRange { row, col });
                }
            }
        }
    }

    FootprintCheck {
        bounds,
        rejection: out_of_range,
    }
}

/// Bounded history of validation markers.
///
/// When full, the oldest marker is evicted. Ids keep increasing across
/// [`MarkerBuffer::clear`].
#[derive(Debug, Clone)]
pub struct MarkerBuffer {
    markers: VecDeque<ValidationMarker>,
    capacity: usize,
    next_id: u64,
}

impl MarkerBuffer {
    /// Creates a buffer holding at most `capacity` markers (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            markers: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 0,
        }
    }

    /// Appends a marker and returns its id.
    pub fn record(&mut self, pose: Pose, scale: Footprint, color: Rgb) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.markers.len() == self.capacity {
            self.markers.pop_front();
        }
        self.markers.push_back(ValidationMarker {
            id,
            pose,
            scale,
            color,
        });
        id
    }

    /// Drops every stored marker.
    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Number of stored markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Returns true if no marker is stored.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Stored markers, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationMarker> {
        self.markers.iter()
    }

    /// Copy of the stored markers, oldest first.
    pub fn snapshot(&self) -> Vec<ValidationMarker> {
        self.markers.iter().cloned().collect()
    }
}

/// Result of [`CollisionValidator::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Whether the pose is collision free
    pub allowed: bool,
    /// Marker recorded for the pose
    pub marker: ValidationMarker,
    /// Details of the underlying check
    pub check: FootprintCheck,
}

/// Validates poses and republishes the marker history after every call.
#[derive(Debug)]
pub struct CollisionValidator {
    markers: MarkerBuffer,
    publisher: Option<broadcast::Sender<Arc<Vec<ValidationMarker>>>>,
}

impl CollisionValidator {
    /// Creates a validator that keeps up to `marker_capacity` markers.
    pub fn new(marker_capacity: usize) -> Self {
        Self {
            markers: MarkerBuffer::new(marker_capacity),
            publisher: None,
        }
    }

    /// Publishes the marker history on `tx` after every validation.
    pub fn with_publisher(mut self, tx: broadcast::Sender<Arc<Vec<ValidationMarker>>>) -> Self {
        self.publisher = Some(tx);
        self
    }

    /// Returns true if `state` with `footprint` is collision free on `map`.
    pub fn is_allowed(&mut self, map: &GridMap, state: &MotionState, footprint: &Footprint) -> bool {
        self.validate(map, state, footprint).allowed
    }

    /// Checks `state`, records a marker for it and republishes the marker history.
    pub fn validate(
        &mut self,
        map: &GridMap,
        state: &MotionState,
        footprint: &Footprint,
    ) -> ValidationResult {
        let check = check_footprint(map, state.x, state.y, footprint);
        let allowed = check.is_allowed();
        debug!(
            x = state.x,
            y = state.y,
            min_row = check.bounds.min_row,
            min_col = check.bounds.min_col,
            max_row = check.bounds.max_row,
            max_col = check.bounds.max_col,
            allowed,
            rejection = ?check.rejection,
            "Validated footprint"
        );

        let color = if allowed { ALLOWED_COLOR } else { BLOCKED_COLOR };
        let pose = state.pose();
        let id = self.markers.record(pose, *footprint, color);
        self.publish();

        ValidationResult {
            allowed,
            marker: ValidationMarker {
                id,
                pose,
                scale: *footprint,
                color,
            },
            check,
        }
    }

    /// The marker history.
    pub fn markers(&self) -> &MarkerBuffer {
        &self.markers
    }

    /// Starts a new marker history. Called when a new map begins a planning session.
    pub fn reset_markers(&mut self) {
        self.markers.clear();
        self.publish();
    }

    fn publish(&self) {
        if let Some(tx) = &self.publisher {
            if tx.receiver_count() > 0 {
                if let Err(e) = tx.send(Arc::new(self.markers.snapshot())) {
                    trace!("Failed to publish validation markers: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MapUpdate, Origin, grid::{FREE, OCCUPIED, UNKNOWN}};

    fn grid(update: MapUpdate) -> GridMap {
        GridMap::from_update(update).unwrap()
    }

    fn ten_by_ten() -> MapUpdate {
        MapUpdate::uniform(10, 10, 0.1, Origin::default(), FREE)
    }

    fn square(side: f64) -> Footprint {
        Footprint::new(side, side).unwrap()
    }

    #[test]
    fn test_free_grid_is_allowed() {
        let map = grid(ten_by_ten());
        let mut validator = CollisionValidator::new(16);
        let state = MotionState::root(0.5, 0.5, None);
        assert!(validator.is_allowed(&map, &state, &square(0.1)));
    }

    #[test]
    fn test_occupied_cell_blocks() {
        let map = grid(ten_by_ten().with_cell(5, 5, OCCUPIED));
        let mut validator = CollisionValidator::new(16);
        let state = MotionState::root(0.5, 0.5, None);

        let result = validator.validate(&map, &state, &square(0.1));
        assert!(!result.allowed);
        assert!(matches!(
            result.check.rejection,
            Some(Rejection::BlockingCell { row: 5, col: 5, state: CellState::Occupied })
        ));
    }

    #[test]
    fn test_unknown_cell_blocks() {
        let map = grid(MapUpdate::uniform(4, 4, 1.0, Origin::default(), FREE).with_cell(1, 2, UNKNOWN));
        let check = check_footprint(&map, 2.5, 1.5, &square(0.5));
        assert_eq!(
            check.bounds,
            CellBounds { min_row: 1, min_col: 2, max_row: 1, max_col: 2 }
        );
        assert!(!check.is_allowed());
    }

    #[test]
    fn test_partial_cells_are_allowed() {
        let mut update = MapUpdate::uniform(4, 4, 1.0, Origin::default(), FREE);
        for (i, cell) in update.cells.iter_mut().enumerate() {
            *cell = (i as i8 * 6) % 100;
        }
        let map = grid(update);
        let check = check_footprint(&map, 2.0, 2.0, &square(2.0));
        assert_eq!(
            check.bounds,
            CellBounds { min_row: 1, min_col: 1, max_row: 3, max_col: 3 }
        );
        assert!(check.is_allowed());
    }

    #[test]
    fn test_rectangle_is_treated_as_square() {
        // 0.5 x 2.0 footprint covers two cells in x as well as y.
        let map = grid(MapUpdate::uniform(5, 5, 1.0, Origin::default(), FREE).with_cell(2, 1, OCCUPIED));
        let thin = Footprint::new(0.5, 2.0).unwrap();
        let check = check_footprint(&map, 2.5, 2.5, &thin);
        assert_eq!(
            check.bounds,
            CellBounds { min_row: 1, min_col: 1, max_row: 3, max_col: 3 }
        );
        assert!(!check.is_allowed());
    }

    #[test]
    fn test_corners_truncate_independently() {
        let map = grid(MapUpdate::uniform(4, 4, 1.0, Origin::default(), FREE));
        // Lower corner at -0.3 truncates to 0, upper corner at 0.7 to 0.
        let near_edge = check_footprint(&map, 0.2, 0.2, &square(1.0));
        assert_eq!(
            near_edge.bounds,
            CellBounds { min_row: 0, min_col: 0, max_row: 0, max_col: 0 }
        );
        // The footprint hangs over the lower edge but is still accepted.
        assert!(near_edge.is_allowed());

        // Same footprint one cell further in covers two cells per axis.
        let inside = check_footprint(&map, 1.2, 1.2, &square(1.0));
        assert_eq!(
            inside.bounds,
            CellBounds { min_row: 0, min_col: 0, max_row: 1, max_col: 1 }
        );
    }

    #[test]
    fn test_out_of_range_blocks_after_full_scan() {
        let map = grid(MapUpdate::uniform(3, 3, 1.0, Origin::default(), FREE));
        let check = check_footprint(&map, 2.5, 1.5, &square(1.0));
        assert_eq!(
            check.bounds,
            CellBounds { min_row: 1, min_col: 2, max_row: 2, max_col: 3 }
        );
        assert_eq!(check.rejection, Some(Rejection::OutOfRange { row: 1, col: 3 }));
    }

    #[test]
    fn test_blocking_cell_after_out_of_range_short_circuits() {
        // (1, 3) is out of range and scanned before the occupied (2, 2).
        let map = grid(MapUpdate::uniform(3, 3, 1.0, Origin::default(), FREE).with_cell(2, 2, OCCUPIED));
        let check = check_footprint(&map, 2.5, 1.5, &square(1.0));
        assert!(matches!(
            check.rejection,
            Some(Rejection::BlockingCell { row: 2, col: 2, .. })
        ));
    }

    #[test]
    fn test_blocking_cell_wins_regardless_of_position() {
        let base = MapUpdate::uniform(6, 6, 1.0, Origin::default(), FREE);
        let footprint = square(3.0);
        let bounds = footprint_bounds(&grid(base.clone()), 3.0, 3.0, &footprint);
        for (row, col) in bounds.cells() {
            for value in [OCCUPIED, UNKNOWN] {
                let map = grid(base.clone().with_cell(row as usize, col as usize, value));
                assert!(
                    !check_footprint(&map, 3.0, 3.0, &footprint).is_allowed(),
                    "value {} at ({}, {}) should block",
                    value,
                    row,
                    col
                );
            }
        }
    }

    #[test]
    fn test_markers_colors_and_ids() {
        let map = grid(ten_by_ten().with_cell(5, 5, OCCUPIED));
        let mut validator = CollisionValidator::new(16);
        let footprint = square(0.1);

        let blocked = validator.validate(&map, &MotionState::root(0.5, 0.5, Some(1.0)), &footprint);
        let allowed = validator.validate(&map, &MotionState::root(0.15, 0.15, None), &footprint);

        assert_eq!(blocked.marker.color, BLOCKED_COLOR);
        assert_eq!(allowed.marker.color, ALLOWED_COLOR);
        assert!(allowed.marker.id > blocked.marker.id);
        assert_eq!(blocked.marker.pose, Pose::new(0.5, 0.5, 1.0));

        let history: Vec<u64> = validator.markers().iter().map(|m| m.id).collect();
        assert_eq!(history, vec![blocked.marker.id, allowed.marker.id]);
    }

    #[test]
    fn test_marker_buffer_is_bounded() {
        let map = grid(ten_by_ten());
        let mut validator = CollisionValidator::new(3);
        let footprint = square(0.1);
        for i in 0..5 {
            validator.is_allowed(&map, &MotionState::root(0.1 * i as f64 + 0.05, 0.5, None), &footprint);
        }
        let ids: Vec<u64> = validator.markers().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);

        validator.reset_markers();
        assert!(validator.markers().is_empty());
        let next = validator.validate(&map, &MotionState::root(0.5, 0.5, None), &footprint);
        assert_eq!(next.marker.id, 5);
    }

    #[test]
    fn test_publishes_full_history() {
        let (tx, mut rx) = broadcast::channel(8);
        let map = grid(ten_by_ten());
        let mut validator = CollisionValidator::new(16).with_publisher(tx);
        let footprint = square(0.1);

        validator.is_allowed(&map, &MotionState::root(0.5, 0.5, None), &footprint);
        validator.is_allowed(&map, &MotionState::root(0.3, 0.3, None), &footprint);

        assert_eq!(rx.try_recv().unwrap().len(), 1);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, 0);
        assert_eq!(second[1].id, 1);
    }
}
