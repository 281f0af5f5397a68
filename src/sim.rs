//! Simulated upstream: publishes a static map and a (noisy) start pose at a
//! fixed period and cycles through the configured goals.

use std::time::Duration;

use grid_navigation::map::grid::{FREE, OCCUPIED};
use grid_navigation::{MapUpdate, Origin, PoseUpdate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{self, Instant};
use tracing::info;

use crate::bus::Topic;
use crate::config::SimulationSettings;

/// Builds the simulated map, marking every cell whose center lies inside a wall.
pub fn build_map(settings: &SimulationSettings) -> MapUpdate {
    let origin = Origin {
        x: settings.origin_x,
        y: settings.origin_y,
    };
    let mut update = MapUpdate::uniform(
        settings.map_width,
        settings.map_height,
        settings.resolution,
        origin,
        FREE,
    );
    for row in 0..settings.map_height {
        let cy = origin.y + (row as f64 + 0.5) * settings.resolution;
        for col in 0..settings.map_width {
            let cx = origin.x + (col as f64 + 0.5) * settings.resolution;
            let inside = settings
                .walls
                .iter()
                .any(|&[x0, y0, x1, y1]| cx >= x0 && cx <= x1 && cy >= y0 && cy <= y1);
            if inside {
                update.cells[row * settings.map_width + col] = OCCUPIED;
            }
        }
    }
    update
}

fn noisy_start(settings: &SimulationSettings, rng: &mut StdRng) -> PoseUpdate {
    let [x, y, heading] = settings.start;
    let n = settings.start_noise.abs();
    if n == 0.0 {
        return PoseUpdate::new(x, y, heading);
    }
    PoseUpdate::new(x + rng.random_range(-n..=n), y + rng.random_range(-n..=n), heading)
}

pub async fn run(
    settings: SimulationSettings,
    map_topic: Topic<MapUpdate>,
    start_topic: Topic<PoseUpdate>,
    goal_topic: Topic<PoseUpdate>,
) -> anyhow::Result<()> {
    let map = build_map(&settings);
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut publish_tick = time::interval(Duration::from_millis(settings.publish_period_ms.max(1)));
    let goal_period = Duration::from_millis(settings.goal_period_ms.max(1));
    let mut goal_tick = time::interval_at(Instant::now() + goal_period, goal_period);
    let mut goals = settings.goals.iter().cycle();

    info!(
        width = settings.map_width,
        height = settings.map_height,
        walls = settings.walls.len(),
        goals = settings.goals.len(),
        "Simulated upstream started."
    );

    loop {
        tokio::select! {
            _ = publish_tick.tick() => {
                map_topic.publish(map.clone());
                start_topic.publish(noisy_start(&settings, &mut rng));
            }
            _ = goal_tick.tick() => {
                if let Some(&[x, y, heading]) = goals.next() {
                    info!(x, y, heading, "Publishing goal");
                    goal_topic.publish(PoseUpdate::new(x, y, heading));
                }
            }
        }
    }
}
