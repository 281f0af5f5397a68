#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library of planar robot poses, lattice moves and footprints."]
#![doc = ""]
#![doc = "This crate provides the vocabulary shared by the trajectory planner's orchestrator"]
#![doc = "and the search strategies it drives: world-frame poses, the fixed displacements a"]
#![doc = "search may apply to them, and the robot's axis-aligned footprint."]

use core::f64::consts::PI;
use core::fmt;
use libm::hypot;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::PrimitivesError;

/// A 2‑D pose `(x, y, θ)` in meters and radians (θ measured counter‑clockwise
/// from the x‑axis in the world frame).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// World‑frame x position (m).
    pub x: f64,
    /// World‑frame y position (m).
    pub y: f64,
    /// Heading (rad), normalized to `[-PI, PI)`.
    pub theta: f64,
}

impl Pose {
    /// Construct a new pose.
    ///
    /// # Arguments
    ///
    /// * `x`: World-frame x position in meters.
    /// * `y`: World-frame y position in meters.
    /// * `theta`: Heading in radians.
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose { x, y, theta }
    }

    /// Normalize an angle to be within `[-PI, PI)`.
    ///
    /// Angles at `PI` will be normalized to `-PI`.
    pub fn normalize_angle(angle: f64) -> f64 {
        let a = angle % (2.0 * PI);
        if a >= PI {
            a - 2.0 * PI
        } else if a < -PI {
            a + 2.0 * PI
        } else {
            a
        }
    }

    /// Euclidean distance between the positions of two poses, ignoring heading.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        hypot(other.x - self.x, other.y - self.y)
    }

    /// Returns the pose reached by applying `mv` in the world frame.
    ///
    /// The displacement is added as is (moves are not rotated by the current
    /// heading) and the resulting heading is normalized.
    pub fn apply(&self, mv: &Move) -> Pose {
        Pose {
            x: self.x + mv.dx,
            y: self.y + mv.dy,
            theta: Pose::normalize_angle(self.theta + mv.dtheta),
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, θ: {:.2} rad)", self.x, self.y, self.theta)
    }
}

/// A fixed world-frame displacement a search strategy may apply to a state.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Move {
    /// Displacement along the world x-axis (m).
    pub dx: f64,
    /// Displacement along the world y-axis (m).
    pub dy: f64,
    /// Heading change (rad).
    pub dtheta: f64,
}

impl Move {
    /// Construct a new move.
    pub const fn new(dx: f64, dy: f64, dtheta: f64) -> Self {
        Move { dx, dy, dtheta }
    }

    /// Length of the translational part of the move (m).
    pub fn length(&self) -> f64 {
        hypot(self.dx, self.dy)
    }

    /// The 8-connected lattice used by the planner node: the four axis moves
    /// followed by the four diagonals, all without heading change.
    ///
    /// # Errors
    ///
    /// Returns `Err(PrimitivesError::InvalidStep)` if `step` is not a positive, finite number.
    pub fn eight_connected(step: f64) -> Result<[Move; 8], PrimitivesError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(PrimitivesError::InvalidStep("must be positive and finite"));
        }
        Ok([
            Move::new(step, 0.0, 0.0),   // forward
            Move::new(-step, 0.0, 0.0),  // back
            Move::new(0.0, step, 0.0),   // right
            Move::new(0.0, -step, 0.0),  // left
            Move::new(-step, -step, 0.0),
            Move::new(step, step, 0.0),
            Move::new(-step, step, 0.0),
            Move::new(step, -step, 0.0),
        ])
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(dx: {:.3} m, dy: {:.3} m, dθ: {:.3} rad)", self.dx, self.dy, self.dtheta)
    }
}

/// Axis-aligned bounding extent of the robot, in meters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    width: f64,
    height: f64,
}

impl Footprint {
    /// Construct a new footprint.
    ///
    /// # Errors
    ///
    /// Returns `Err(PrimitivesError::InvalidFootprint)` if either extent is not positive and finite.
    pub fn new(width: f64, height: f64) -> Result<Self, PrimitivesError> {
        if !(width.is_finite() && width > 0.0) {
            return Err(PrimitivesError::InvalidFootprint("width must be positive and finite"));
        }
        if !(height.is_finite() && height > 0.0) {
            return Err(PrimitivesError::InvalidFootprint("height must be positive and finite"));
        }
        Ok(Footprint { width, height })
    }

    /// Returns the width (m).
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Returns the height (m).
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Side of the square that bounds the footprint on both axes.
    pub fn side(&self) -> f64 {
        self.width.max(self.height)
    }
}

impl fmt::Display for Footprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Footprint ({:.2} m x {:.2} m)", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_pose_normalization() {
        assert!((Pose::normalize_angle(0.0) - 0.0).abs() < EPSILON);
        assert!((Pose::normalize_angle(PI) - (-PI)).abs() < EPSILON);
        assert!((Pose::normalize_angle(-PI) - -PI).abs() < EPSILON);
        assert!((Pose::normalize_angle(2.5 * PI) - 0.5 * PI).abs() < EPSILON);
        assert!((Pose::normalize_angle(-2.5 * PI) - -0.5 * PI).abs() < EPSILON);
    }

    #[test]
    fn test_apply_move_is_world_frame() {
        let pose = Pose::new(1.0, 2.0, PI / 2.0);
        let next = pose.apply(&Move::new(0.05, 0.0, 0.0));
        assert!((next.x - 1.05).abs() < EPSILON);
        assert!((next.y - 2.0).abs() < EPSILON);
        assert!((next.theta - PI / 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_apply_move_wraps_heading() {
        let pose = Pose::new(0.0, 0.0, 0.75 * PI);
        let next = pose.apply(&Move::new(0.0, 0.0, 0.5 * PI));
        assert!((next.theta - (-0.75 * PI)).abs() < EPSILON);
    }

    #[test]
    fn test_distance() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(3.0, 4.0, 1.0);
        assert!((a.distance_to(&b) - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_eight_connected() {
        let moves = Move::eight_connected(0.05).unwrap();
        assert_eq!(moves[0], Move::new(0.05, 0.0, 0.0));
        assert_eq!(moves[3], Move::new(0.0, -0.05, 0.0));
        let diagonals = moves.iter().filter(|m| m.dx != 0.0 && m.dy != 0.0).count();
        assert_eq!(diagonals, 4);
        for (i, a) in moves.iter().enumerate() {
            for b in &moves[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(matches!(
            Move::eight_connected(0.0),
            Err(PrimitivesError::InvalidStep(_))
        ));
        assert!(matches!(
            Move::eight_connected(f64::NAN),
            Err(PrimitivesError::InvalidStep(_))
        ));
    }

    #[test]
    fn test_footprint() {
        let footprint = Footprint::new(0.15, 0.3).unwrap();
        assert_eq!(footprint.side(), 0.3);
        assert!(matches!(
            Footprint::new(0.0, 0.1),
            Err(PrimitivesError::InvalidFootprint(_))
        ));
        assert!(matches!(
            Footprint::new(0.1, -1.0),
            Err(PrimitivesError::InvalidFootprint(_))
        ));
    }
}
