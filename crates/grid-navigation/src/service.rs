//! Notification loop feeding the orchestrator.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::PlanningError;
use crate::feed::{PoseUpdate, UpstreamFeed};
use crate::map::MapUpdate;
use crate::orchestrator::{GoalOutcome, PlanningOrchestrator};
use crate::planner::Planner;

fn log_rejection(notification: &'static str, err: &PlanningError) {
    match err {
        PlanningError::ConcurrentRequestIgnored => {}
        _ => debug!(notification, error = %err, "Notification not applied"),
    }
}

/// Dispatches map, start and goal notifications until one of the streams closes.
///
/// Map and start notifications are handled inline. Each goal is handled on
/// its own task so the loop keeps draining the streams while a goal waits
/// for its refresh or searches; notifications arriving meanwhile hit the
/// busy gate and are dropped.
pub async fn run_planner_service<P, F>(
    orchestrator: Arc<PlanningOrchestrator<P, F>>,
    mut map_rx: broadcast::Receiver<Arc<MapUpdate>>,
    mut start_rx: broadcast::Receiver<Arc<PoseUpdate>>,
    mut goal_rx: broadcast::Receiver<Arc<PoseUpdate>>,
) -> anyhow::Result<()>
where
    P: Planner + 'static,
    F: UpstreamFeed + 'static,
{
    info!("Planner service started.");
    let mut goals = JoinSet::new();

    loop {
        tokio::select! {
            msg = map_rx.recv() => match msg {
                Ok(update) => {
                    if let Err(e) = orchestrator.on_map(Arc::unwrap_or_clone(update)) {
                        log_rejection("map", &e);
                    }
                }
                Err(RecvError::Lagged(n)) => warn!(topic = "map", skipped = n, "Receiver lagged"),
                Err(RecvError::Closed) => anyhow::bail!("map stream closed"),
            },
            msg = start_rx.recv() => match msg {
                Ok(update) => {
                    if let Err(e) = orchestrator.on_start(*update) {
                        log_rejection("start", &e);
                    }
                }
                Err(RecvError::Lagged(n)) => warn!(topic = "start", skipped = n, "Receiver lagged"),
                Err(RecvError::Closed) => anyhow::bail!("start stream closed"),
            },
            msg = goal_rx.recv() => match msg {
                Ok(update) => {
                    let orchestrator = Arc::clone(&orchestrator);
                    goals.spawn(async move {
                        match orchestrator.on_goal(*update).await {
                            Ok(GoalOutcome::Planned(trajectory)) => {
                                info!(waypoints = trajectory.len(), "Trajectory published");
                            }
                            Ok(GoalOutcome::GoalSet) => debug!("Goal stored, waiting for a valid start"),
                            Err(e) => log_rejection("goal", &e),
                        }
                    });
                }
                Err(RecvError::Lagged(n)) => warn!(topic = "goal", skipped = n, "Receiver lagged"),
                Err(RecvError::Closed) => anyhow::bail!("goal stream closed"),
            },
            Some(joined) = goals.join_next(), if !goals.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "Goal task failed");
                }
            }
        }
    }
}
