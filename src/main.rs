mod blackboard; // brings `blackboard.rs` in as `crate::blackboard`
mod bus; // brings `bus.rs` in as `crate::bus`
mod config; // brings `config.rs` in as `crate::config`
mod sim; // brings `sim.rs` in as `crate::sim`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use blackboard::{Blackboard, count_debug_pose, record_markers, record_trajectory, snapshot};
use bus::Topic;
use grid_navigation::{
    MapUpdate, PlannerOutputs, PlanningOrchestrator, PoseUpdate, TopicFeed, run_planner_service,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Trajectory planner starting.");
    let settings = config::Settings::load().context("failed to load configuration")?;

    let capacity = settings.topics.capacity;
    let map_topic: Topic<MapUpdate> = Topic::new("map", capacity);
    let start_topic: Topic<PoseUpdate> = Topic::new("start", capacity);
    let goal_topic: Topic<PoseUpdate> = Topic::new("goal", capacity);
    let outputs = PlannerOutputs::new(capacity);

    let orchestrator = Arc::new(PlanningOrchestrator::new(
        settings.search(),
        TopicFeed::new(map_topic.sender(), start_topic.sender()),
        settings.planner_config()?,
        outputs.clone(),
    ));
    let bb: Blackboard = Arc::default();

    let service = tokio::spawn(run_planner_service(
        orchestrator,
        map_topic.subscribe(),
        start_topic.subscribe(),
        goal_topic.subscribe(),
    ));
    let monitor = tokio::spawn(monitor(bb.clone(), outputs));
    let sim = tokio::spawn(sim::run(
        settings.simulation.clone(),
        map_topic,
        start_topic,
        goal_topic,
    ));

    let run_for = Duration::from_secs(settings.simulation.run_for_secs);
    tokio::select! {
        res = service => res??,
        res = monitor => res??,
        res = sim => res??,
        _ = tokio::time::sleep(run_for) => info!(?run_for, "Run time elapsed, shutting down."),
    }

    let state = snapshot(&bb);
    info!(
        trajectories = state.trajectories,
        debug_poses = state.debug_poses,
        markers = state.markers,
        "Trajectory planner stopped."
    );
    Ok(())
}

/// Mirrors the planner's output streams into the blackboard.
async fn monitor(bb: Blackboard, outputs: PlannerOutputs) -> anyhow::Result<()> {
    let mut trajectory_rx = outputs.trajectory.subscribe();
    let mut debug_rx = outputs.debug_pose.subscribe();
    let mut marker_rx = outputs.markers.subscribe();
    drop(outputs);

    loop {
        tokio::select! {
            msg = trajectory_rx.recv() => match msg {
                Ok(trajectory) => {
                    let (first, last) = (trajectory.waypoints.first(), trajectory.waypoints.last());
                    if let (Some(first), Some(last)) = (first, last) {
                        info!(
                            waypoints = trajectory.len(),
                            from = %first.pose,
                            to = %last.pose,
                            "Trajectory received"
                        );
                    }
                    record_trajectory(&bb, trajectory);
                }
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "Trajectory monitor lagged"),
                Err(RecvError::Closed) => anyhow::bail!("trajectory stream closed"),
            },
            msg = debug_rx.recv() => match msg {
                Ok(_) => count_debug_pose(&bb),
                Err(RecvError::Lagged(n)) => debug!(skipped = n, "Debug pose monitor lagged"),
                Err(RecvError::Closed) => anyhow::bail!("debug pose stream closed"),
            },
            msg = marker_rx.recv() => match msg {
                Ok(markers) => record_markers(&bb, markers.len()),
                Err(RecvError::Lagged(n)) => debug!(skipped = n, "Marker monitor lagged"),
                Err(RecvError::Closed) => anyhow::bail!("marker stream closed"),
            },
        }
    }
}
