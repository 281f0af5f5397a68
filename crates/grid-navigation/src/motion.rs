//! Search states and their ancestry.
//!
//! Search strategies allocate [`MotionState`]s in a [`StateArena`]. Each state
//! points at its predecessor by [`StateId`], so a terminal state's ancestry is
//! a plain index walk back to the root.

use motion_primitives::{Move, Pose};

/// Index of a state inside the [`StateArena`] that allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    /// Position of the state in its arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A pose node used both as a search vertex and as a trajectory waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionState {
    /// World x (m)
    pub x: f64,
    /// World y (m)
    pub y: f64,
    /// Heading (rad), if known
    pub heading: Option<f64>,
    parent: Option<StateId>,
}

impl MotionState {
    /// A state with no predecessor.
    pub fn root(x: f64, y: f64, heading: Option<f64>) -> Self {
        Self {
            x,
            y,
            heading,
            parent: None,
        }
    }

    /// A root state at `pose`, keeping its heading.
    pub fn from_pose(pose: &Pose) -> Self {
        Self::root(pose.x, pose.y, Some(pose.theta))
    }

    /// The state's pose; a missing heading reads as 0.
    pub fn pose(&self) -> Pose {
        Pose::new(self.x, self.y, self.heading.unwrap_or(0.0))
    }

    /// The predecessor of this state, `None` for a root.
    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    /// The unlinked state reached by applying `mv`. Link it with [`StateArena::push_child`].
    pub fn apply(&self, mv: &Move) -> MotionState {
        let next = self.pose().apply(mv);
        MotionState {
            x: next.x,
            y: next.y,
            heading: self.heading.map(|_| next.theta),
            parent: None,
        }
    }
}

/// Append-only storage for the states of one search.
///
/// A parent is always allocated before its children, so ancestry chains are
/// finite and acyclic.
#[derive(Debug, Clone, Default)]
pub struct StateArena {
    states: Vec<MotionState>,
}

impl StateArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `state` as a root, discarding any parent it carried.
    pub fn push_root(&mut self, mut state: MotionState) -> StateId {
        state.parent = None;
        self.states.push(state);
        StateId(self.states.len() - 1)
    }

    /// Stores `state` as a child of `parent`.
    ///
    /// Returns `None` if `parent` was not allocated by this arena.
    pub fn push_child(&mut self, parent: StateId, mut state: MotionState) -> Option<StateId> {
        if parent.0 >= self.states.len() {
            return None;
        }
        state.parent = Some(parent);
        self.states.push(state);
        Some(StateId(self.states.len() - 1))
    }

    /// Looks up a state.
    pub fn get(&self, id: StateId) -> Option<&MotionState> {
        self.states.get(id.0)
    }

    /// Number of allocated states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if no state was allocated.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Walks from `id` to its root, yielding `id` first.
    pub fn ancestry(&self, id: StateId) -> Ancestry<'_> {
        Ancestry {
            arena: self,
            next: Some(id),
        }
    }

    /// The chain ending at `terminal`, ordered root first and `terminal` last.
    pub fn trace(&self, terminal: StateId) -> Vec<&MotionState> {
        let mut path: Vec<&MotionState> = self.ancestry(terminal).collect();
        path.reverse();
        path
    }
}

/// Iterator over a state and its ancestors, see [`StateArena::ancestry`].
pub struct Ancestry<'a> {
    arena: &'a StateArena,
    next: Option<StateId>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a MotionState;

    fn next(&mut self) -> Option<Self::Item> {
        let state = self.arena.get(self.next?)?;
        self.next = state.parent;
        Some(state)
    }
}
