use grid_navigation::map::grid::{FREE, OCCUPIED, UNKNOWN};
use grid_navigation::{
    CollisionValidator, GridMap, LatticeAStar, MapUpdate, MotionState, Origin, PlanRequest,
    Planner, SearchContext, Trajectory,
};
use motion_primitives::{Footprint, Move};
use std::collections::HashSet;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // 4 m x 2 m room at 0.1 m resolution with two staggered walls.
    let mut update = MapUpdate::uniform(40, 20, 0.1, Origin::default(), FREE);
    for row in 0..14 {
        update = update.with_cell(row, 13, OCCUPIED);
    }
    for row in 6..20 {
        update = update.with_cell(row, 26, OCCUPIED);
    }
    for col in 30..34 {
        update = update.with_cell(2, col, UNKNOWN);
    }
    let map = match GridMap::from_update(update) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("Invalid map: {}", e);
            return;
        }
    };

    let moves = Move::eight_connected(0.1).expect("valid step");
    let footprint = Footprint::new(0.15, 0.15).expect("valid footprint");
    let start = MotionState::root(0.45, 0.45, Some(0.0));
    let goal = MotionState::root(3.55, 1.55, Some(0.0));
    let request = PlanRequest {
        map: &map,
        moves: &moves,
        footprint: &footprint,
        start: &start,
        goal: &goal,
    };

    let mut validator = CollisionValidator::new(100_000);
    let result = {
        let mut ctx = SearchContext::new(&mut validator, None);
        LatticeAStar::default().plan(&request, &mut ctx)
    };

    println!("Map:\n{}", map);
    let Some(result) = result else {
        println!("No path found.");
        return;
    };

    let trajectory = Trajectory::from_search(&result.arena, result.terminal, footprint);
    println!(
        "Path found: {} waypoints, {} expansions, {} validations",
        trajectory.len(),
        result.expansions,
        validator.markers().len()
    );

    let path_cells: HashSet<(i64, i64)> = trajectory
        .waypoints
        .iter()
        .map(|w| map.coord_to_indices(w.pose.x, w.pose.y))
        .collect();

    println!("\nMap with path:");
    for row in (0..map.height() as i64).rev() {
        for col in 0..map.width() as i64 {
            let c = if path_cells.contains(&(row, col)) {
                '*'
            } else {
                match map.cell_at(row, col) {
                    Ok(OCCUPIED) => '#',
                    Ok(UNKNOWN) => '?',
                    _ => '.',
                }
            };
            print!("{}", c);
        }
        println!();
    }
}
