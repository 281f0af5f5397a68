//! Occupancy grid index.
//!
//! A [`GridMap`] is an immutable, row-major grid of occupancy values built
//! from a [`MapUpdate`]. It converts world coordinates to cell indices and
//! performs bounds-checked lookups. New map data always produces a new
//! `GridMap`; an existing one is never modified.

#![warn(missing_docs)]

use crate::error::NavigationError;

/// Raw value of an unknown cell.
pub const UNKNOWN: i8 = -1;
/// Raw value of a free cell.
pub const FREE: i8 = 0;
/// Raw value of an occupied cell.
pub const OCCUPIED: i8 = 100;

/// Occupancy classification of a raw cell value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CellState {
    /// No information available about this cell (`-1`)
    Unknown,
    /// Free cell (`0`)
    Free,
    /// Partially occupied cell (`1 - 99`)
    Partial(u8),
    /// Occupied cell (`100`)
    Occupied,
    /// Any value outside the occupancy range
    Invalid(i8),
}

impl CellState {
    /// Classifies a raw cell value.
    pub fn from_value(value: i8) -> Self {
        match value {
            UNKNOWN => CellState::Unknown,
            FREE => CellState::Free,
            1..=99 => CellState::Partial(value as u8),
            OCCUPIED => CellState::Occupied,
            other => CellState::Invalid(other),
        }
    }

    /// Converts the CellState back to its raw value.
    pub fn as_value(&self) -> i8 {
        match self {
            CellState::Unknown => UNKNOWN,
            CellState::Free => FREE,
            CellState::Partial(p) => *p as i8,
            CellState::Occupied => OCCUPIED,
            CellState::Invalid(v) => *v,
        }
    }

    /// Returns true for the two values that block a footprint: occupied and unknown.
    ///
    /// Only the exact values `100` and `-1` block. Out-of-range values do not.
    pub fn is_blocking(&self) -> bool {
        matches!(self, CellState::Occupied | CellState::Unknown)
    }
}

impl std::fmt::Display for CellState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellState::Unknown => write!(f, "Unknown"),
            CellState::Free => write!(f, "Free"),
            CellState::Partial(p) => write!(f, "Partial({})", p),
            CellState::Occupied => write!(f, "Occupied"),
            CellState::Invalid(v) => write!(f, "Invalid({})", v),
        }
    }
}

/// World coordinate of cell (0, 0).
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Origin {
    /// World x (m)
    pub x: f64,
    /// World y (m)
    pub y: f64,
}

impl Origin {
    /// Creates a new origin.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Inbound occupancy grid message, independent of any transport.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapUpdate {
    /// Row-major cell values, `width * height` of them
    pub cells: Vec<i8>,
    /// Width in cells
    pub width: usize,
    /// Height in cells
    pub height: usize,
    /// Meters per cell
    pub resolution: f64,
    /// World coordinate of cell (0, 0)
    pub origin: Origin,
}

impl MapUpdate {
    /// Creates a message whose cells all hold `value`.
    pub fn uniform(width: usize, height: usize, resolution: f64, origin: Origin, value: i8) -> Self {
        Self {
            cells: vec![value; width.saturating_mul(height)],
            width,
            height,
            resolution,
            origin,
        }
    }

    /// Overwrites one cell of the message. Indices outside the grid are ignored.
    pub fn with_cell(mut self, row: usize, col: usize, value: i8) -> Self {
        if row < self.height && col < self.width {
            self.cells[row * self.width + col] = value;
        }
        self
    }
}

/// A 2D occupancy grid with row-major storage.
///
/// `index = row * width + col`, where the row is derived from y and the
/// column from x.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridMap {
    /// Width of the grid in cells
    width: usize,
    /// Height of the grid in cells
    height: usize,
    /// Resolution of the grid in meters per cell
    resolution: f64,
    /// World coordinate of cell (0, 0)
    origin: Origin,
    /// Row-major occupancy values
    cells: Vec<i8>,
}

impl GridMap {
    /// Builds a grid from a map message.
    ///
    /// # Errors
    /// * `NavigationError::InvalidMap` if a dimension is zero, the resolution is
    ///   not positive and finite, or the cell count is not `width * height`.
    pub fn from_update(update: MapUpdate) -> Result<Self, NavigationError> {
        if update.width == 0 || update.height == 0 {
            return Err(NavigationError::InvalidMap("width and height must be non-zero"));
        }
        if !(update.resolution.is_finite() && update.resolution > 0.0) {
            return Err(NavigationError::InvalidMap("resolution must be positive and finite"));
        }
        if !(update.origin.x.is_finite() && update.origin.y.is_finite()) {
            return Err(NavigationError::InvalidMap("origin must be finite"));
        }
        let total_cells = update
            .width
            .checked_mul(update.height)
            .ok_or(NavigationError::InvalidMap("map dimensions overflow"))?;
        if update.cells.len() != total_cells {
            return Err(NavigationError::InvalidMap("cell count does not match width * height"));
        }

        Ok(GridMap {
            width: update.width,
            height: update.height,
            resolution: update.resolution,
            origin: update.origin,
            cells: update.cells,
        })
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Meters per cell.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// World coordinate of cell (0, 0).
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Row-major cell values.
    pub fn cells(&self) -> &[i8] {
        &self.cells
    }

    /// Converts world coordinates to `(row, col)`.
    ///
    /// Both components are truncated toward zero, not floored, so any offset
    /// in `(-1, 0)` cells lands on index 0. Callers must check the result with
    /// [`GridMap::indices_in_range`] before trusting it.
    pub fn coord_to_indices(&self, x: f64, y: f64) -> (i64, i64) {
        let row = ((y - self.origin.y) / self.resolution) as i64;
        let col = ((x - self.origin.x) / self.resolution) as i64;
        (row, col)
    }

    /// Returns true if `(row, col)` addresses a cell of this grid.
    pub fn indices_in_range(&self, row: i64, col: i64) -> bool {
        0 <= row && row < self.height as i64 && 0 <= col && col < self.width as i64
    }

    /// Gets the raw value at `(row, col)`.
    pub fn cell_at(&self, row: i64, col: i64) -> Result<i8, NavigationError> {
        if !self.indices_in_range(row, col) {
            return Err(NavigationError::OutOfRange { row, col });
        }
        Ok(self.cells[row as usize * self.width + col as usize])
    }

    /// Gets the raw value of the cell containing world point `(x, y)`.
    pub fn cell_at_coord(&self, x: f64, y: f64) -> Result<i8, NavigationError> {
        let (row, col) = self.coord_to_indices(x, y);
        self.cell_at(row, col)
    }

    /// World coordinates of the center of `(row, col)`, if it is in range.
    pub fn cell_center(&self, row: i64, col: i64) -> Option<(f64, f64)> {
        if !self.indices_in_range(row, col) {
            return None;
        }
        Some((
            self.origin.x + (col as f64 + 0.5) * self.resolution,
            self.origin.y + (row as f64 + 0.5) * self.resolution,
        ))
    }

    /// World extent of the grid as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.origin.x,
            self.origin.y,
            self.origin.x + self.width as f64 * self.resolution,
            self.origin.y + self.height as f64 * self.resolution,
        )
    }
}

impl TryFrom<MapUpdate> for GridMap {
    type Error = NavigationError;

    fn try_from(update: MapUpdate) -> Result<Self, Self::Error> {
        GridMap::from_update(update)
    }
}

impl std::fmt::Display for GridMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "GridMap ({}x{}, resolution: {:.3}m)",
            self.width, self.height, self.resolution
        )?;
        writeln!(f, "Origin: ({:.3}, {:.3})", self.origin.x, self.origin.y)?;

        // Highest row first so that +y points up.
        for row in (0..self.height).rev() {
            for col in 0..self.width {
                let symbol = match CellState::from_value(self.cells[row * self.width + col]) {
                    CellState::Free => '.',
                    CellState::Partial(_) => '+',
                    CellState::Occupied => '#',
                    CellState::Unknown => '?',
                    CellState::Invalid(_) => '!',
                };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
