//! Default search strategy: A* over the move lattice.
//!
//! States are deduplicated on a millimetre / milliradian key, so lattice
//! points reached along different paths collapse onto one entry.

use crate::motion::{MotionState, StateArena, StateId};
use crate::planner::{PlanRequest, Planner, SearchContext, SearchResult};

use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::{debug, info};

/// Default distance (m) within which an expanded state counts as reaching the goal.
pub const DEFAULT_GOAL_TOLERANCE: f64 = 0.05;
/// Default cap on expanded states per search.
pub const DEFAULT_MAX_EXPANSIONS: usize = 200_000;

/// Lattice key: position in millimeters, heading in milliradians.
type LatticeKey = (i64, i64, Option<i64>);

fn lattice_key(state: &MotionState) -> LatticeKey {
    (
        (state.x * 1000.0).round() as i64,
        (state.y * 1000.0).round() as i64,
        state.heading.map(|h| (h * 1000.0).round() as i64),
    )
}

/// Straight-line distance between two states, used as the heuristic.
pub fn euclidean_distance(a: &MotionState, b: &MotionState) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct Node {
    f: OrderedFloat<f64>,
    g: OrderedFloat<f64>,
    id: StateId,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f, deeper nodes first on ties.
        other
            .f
            .cmp(&self.f)
            .then_with(|| self.g.cmp(&other.g))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* over the move lattice rooted at the start state.
///
/// Successors are produced by applying every move of the request to the
/// expanded state and are admitted only if the collision validator accepts
/// them. The exact goal pose is appended as the terminal state once an
/// expanded state comes within `goal_tolerance` of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeAStar {
    goal_tolerance: f64,
    max_expansions: usize,
}

impl Default for LatticeAStar {
    fn default() -> Self {
        Self::new(DEFAULT_GOAL_TOLERANCE, DEFAULT_MAX_EXPANSIONS)
    }
}

impl LatticeAStar {
    /// Creates a search with the given goal tolerance (m) and expansion budget.
    pub fn new(goal_tolerance: f64, max_expansions: usize) -> Self {
        Self {
            goal_tolerance: goal_tolerance.max(0.0),
            max_expansions: max_expansions.max(1),
        }
    }

    /// Goal tolerance (m).
    pub fn goal_tolerance(&self) -> f64 {
        self.goal_tolerance
    }

    /// Expansion budget.
    pub fn max_expansions(&self) -> usize {
        self.max_expansions
    }
}

impl Planner for LatticeAStar {
    fn plan(&self, request: &PlanRequest<'_>, ctx: &mut SearchContext<'_>) -> Option<SearchResult> {
        let goal = request.goal;
        let mut arena = StateArena::new();
        let start_id = arena.push_root(request.start.clone());

        let mut open_set = BinaryHeap::new();
        let mut g_score: HashMap<LatticeKey, f64> = HashMap::new();
        let mut closed: HashSet<LatticeKey> = HashSet::new();
        let mut rejected: HashSet<LatticeKey> = HashSet::new();
        let mut expansions = 0;

        g_score.insert(lattice_key(request.start), 0.0);
        open_set.push(Node {
            f: OrderedFloat(euclidean_distance(request.start, goal)),
            g: OrderedFloat(0.0),
            id: start_id,
        });

        while let Some(Node { g, id, .. }) = open_set.pop() {
            let current = arena.get(id)?.clone();
            if !closed.insert(lattice_key(&current)) {
                continue;
            }
            expansions += 1;
            ctx.publish_debug(current.pose());

            if euclidean_distance(&current, goal) <= self.goal_tolerance {
                let terminal = if lattice_key(&current) == lattice_key(goal) {
                    id
                } else {
                    arena.push_child(id, goal.clone())?
                };
                info!(expansions, states = arena.len(), "Goal reached");
                return Some(SearchResult {
                    arena,
                    terminal,
                    expansions,
                });
            }

            if expansions >= self.max_expansions {
                debug!(expansions, "Expansion budget exhausted");
                break;
            }

            for mv in request.moves {
                let next = current.apply(mv);
                let key = lattice_key(&next);
                if closed.contains(&key) || rejected.contains(&key) {
                    continue;
                }

                let tentative_g = g.0 + mv.length() + mv.dtheta.abs();
                if tentative_g >= *g_score.get(&key).unwrap_or(&f64::INFINITY) {
                    continue;
                }
                if !ctx.is_allowed(request.map, &next, request.footprint) {
                    rejected.insert(key);
                    continue;
                }

                g_score.insert(key, tentative_g);
                let h = euclidean_distance(&next, goal);
                let next_id = arena.push_child(id, next)?;
                open_set.push(Node {
                    f: OrderedFloat(tentative_g + h),
                    g: OrderedFloat(tentative_g),
                    id: next_id,
                });
            }
        }

        debug!(expansions, "Open set exhausted without reaching the goal");
        None
    }
}
