//! Upstream data the orchestrator pulls while handling a goal.
//!
//! A goal is only planned against a fresh map and a fresh start pose. The
//! orchestrator asks an [`UpstreamFeed`] for the next message of each stream
//! and bounds every wait with its configured timeout.

use std::future::Future;
use std::sync::Arc;

use motion_primitives::Pose;
use tokio::sync::broadcast;
use tracing::warn;

use crate::map::MapUpdate;
use crate::motion::MotionState;

/// Inbound pose message, used for both start and goal notifications.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseUpdate {
    /// World x (m)
    pub x: f64,
    /// World y (m)
    pub y: f64,
    /// Heading (rad)
    pub heading: f64,
}

impl PoseUpdate {
    /// Creates a new pose message.
    pub const fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }
}

impl From<PoseUpdate> for MotionState {
    fn from(update: PoseUpdate) -> Self {
        MotionState::root(update.x, update.y, Some(update.heading))
    }
}

impl From<PoseUpdate> for Pose {
    fn from(update: PoseUpdate) -> Self {
        Pose::new(update.x, update.y, update.heading)
    }
}

/// Source of the next map and start pose.
///
/// Each call waits for a message published *after* the call; `None` means
/// the stream is gone.
pub trait UpstreamFeed: Send + Sync {
    /// Waits for the next map update.
    fn next_map(&self) -> impl Future<Output = Option<MapUpdate>> + Send;

    /// Waits for the next start pose update.
    fn next_start(&self) -> impl Future<Output = Option<PoseUpdate>> + Send;
}

/// [`UpstreamFeed`] over broadcast topics. Every call opens a fresh subscription.
#[derive(Debug, Clone)]
pub struct TopicFeed {
    map: broadcast::Sender<Arc<MapUpdate>>,
    start: broadcast::Sender<Arc<PoseUpdate>>,
}

impl TopicFeed {
    /// Creates a feed that listens on the given topics.
    pub fn new(
        map: broadcast::Sender<Arc<MapUpdate>>,
        start: broadcast::Sender<Arc<PoseUpdate>>,
    ) -> Self {
        Self { map, start }
    }
}

async fn next_message<T: Clone + Send + Sync>(
    mut rx: broadcast::Receiver<Arc<T>>,
    topic: &'static str,
) -> Option<T> {
    loop {
        match rx.recv().await {
            Ok(msg) => return Some(Arc::unwrap_or_clone(msg)),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(topic, skipped = n, "Upstream receiver lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

impl UpstreamFeed for TopicFeed {
    fn next_map(&self) -> impl Future<Output = Option<MapUpdate>> + Send {
        next_message(self.map.subscribe(), "map")
    }

    fn next_start(&self) -> impl Future<Output = Option<PoseUpdate>> + Send {
        next_message(self.start.subscribe(), "start")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Origin;
    use std::time::Duration;

    #[tokio::test]
    async fn test_topic_feed_waits_for_next_message() {
        let (map_tx, _) = broadcast::channel(4);
        let (start_tx, _) = broadcast::channel(4);
        let feed = TopicFeed::new(map_tx.clone(), start_tx.clone());

        // Published before the request: must not be returned.
        start_tx.send(Arc::new(PoseUpdate::new(9.0, 9.0, 0.0))).ok();

        let pending = feed.next_start();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            start_tx.send(Arc::new(PoseUpdate::new(1.0, 2.0, 0.5))).unwrap();
        });
        assert_eq!(pending.await, Some(PoseUpdate::new(1.0, 2.0, 0.5)));

        let pending = feed.next_map();
        let update = MapUpdate::uniform(2, 2, 0.5, Origin::default(), 0);
        map_tx.send(Arc::new(update.clone())).unwrap();
        assert_eq!(pending.await, Some(update));
    }

    #[tokio::test]
    async fn test_closed_stream_yields_none() {
        let (map_tx, _) = broadcast::channel::<Arc<MapUpdate>>(4);
        let rx = map_tx.subscribe();
        drop(map_tx);
        assert_eq!(next_message(rx, "map").await, None);
    }

    #[test]
    fn test_pose_update_conversions() {
        let update = PoseUpdate::new(1.0, -2.0, 0.25);
        let state: MotionState = update.into();
        assert_eq!(state.heading, Some(0.25));
        assert_eq!(state.parent(), None);
        assert_eq!(Pose::from(update), Pose::new(1.0, -2.0, 0.25));
    }
}
