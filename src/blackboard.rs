use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use grid_navigation::Trajectory;

/// What the process has observed on the planner's output streams.
#[derive(Clone, Default)]
pub struct State {
    pub last_trajectory: Option<Arc<Trajectory>>,
    pub last_plan_ts: Option<Instant>,
    pub trajectories: u64,
    pub debug_poses: u64,
    pub markers: usize,
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn record_trajectory(bb: &Blackboard, trajectory: Arc<Trajectory>) {
    let mut g = bb.write();
    g.last_trajectory = Some(trajectory);
    g.last_plan_ts = Some(Instant::now());
    g.trajectories += 1;
}

pub fn count_debug_pose(bb: &Blackboard) {
    bb.write().debug_poses += 1;
}

pub fn record_markers(bb: &Blackboard, count: usize) {
    bb.write().markers = count;
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_primitives::Footprint;

    #[test]
    fn test_record_trajectory() {
        let bb: Blackboard = Arc::default();
        let trajectory = Arc::new(Trajectory {
            waypoints: Vec::new(),
            footprint: Footprint::new(0.15, 0.15).unwrap(),
        });
        record_trajectory(&bb, Arc::clone(&trajectory));
        record_trajectory(&bb, trajectory);
        count_debug_pose(&bb);
        record_markers(&bb, 12);

        let state = snapshot(&bb);
        assert_eq!(state.trajectories, 2);
        assert_eq!(state.debug_poses, 1);
        assert_eq!(state.markers, 12);
        assert!(state.last_plan_ts.is_some());
        assert!(state.last_trajectory.is_some());
    }
}
