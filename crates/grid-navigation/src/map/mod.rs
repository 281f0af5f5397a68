//! Map-related functionality for navigation.
//!
//! This module provides the occupancy grid index used by the collision
//! validator and the search strategies, together with the inbound map message
//! it is built from.

pub mod grid;

pub use grid::{CellState, GridMap, MapUpdate, Origin};
