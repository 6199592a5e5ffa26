use rand::{Rng, distr::Bernoulli};
use serde::{Deserialize, Serialize};

use crate::{
    Position,
    environment::{GridWorld, WorldError},
};

/// Where trials place their agent unless told otherwise.
pub const DEFAULT_START: Position = Position::new(1, 1);

/// Start cell for [`worst_case_world`], where [`DEFAULT_START`] is walled off.
pub const WORST_CASE_START: Position = Position::new(2, 2);

/// Interior dirt probability of the time-series and heatmap experiments.
pub const EXPERIMENT_DIRT_PROB: f64 = 0.3;
/// Interior obstacle probability of the time-series and heatmap experiments.
pub const EXPERIMENT_OBSTACLE_PROB: f64 = 0.1;

/// Parameters of the randomly generated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub width: usize,
    pub height: usize,
    pub inner_dirt_prob: f64,
    pub inner_obstacle_prob: f64,
    pub boundary_dirt_prob: f64,
    pub boundary_obstacle_prob: f64,
    /// Cell kept free of obstacles so an agent can start there.
    pub start: Position,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            width: 5,
            height: 5,
            inner_dirt_prob: 0.5,
            inner_obstacle_prob: 0.3,
            boundary_dirt_prob: 0.1,
            boundary_obstacle_prob: 0.1,
            start: DEFAULT_START,
        }
    }
}

fn chance(name: &'static str, probability: f64) -> Result<Bernoulli, WorldError> {
    Bernoulli::new(probability).map_err(|_| WorldError::InvalidProbability(name))
}

/// Builds a world with random dirt and obstacles.
///
/// Boundary cells use the (lower) boundary probabilities. Dirt is rolled
/// before the obstacle, so a dirty cell keeps its dirt. Probabilities outside
/// `[0, 1]`, NaN included, are rejected.
pub fn random_world<R: Rng + ?Sized>(
    config: &ScenarioConfig,
    rng: &mut R,
) -> Result<GridWorld, WorldError> {
    let inner = (
        chance("inner_dirt_prob", config.inner_dirt_prob)?,
        chance("inner_obstacle_prob", config.inner_obstacle_prob)?,
    );
    let boundary = (
        chance("boundary_dirt_prob", config.boundary_dirt_prob)?,
        chance("boundary_obstacle_prob", config.boundary_obstacle_prob)?,
    );
    let mut world = GridWorld::try_new(config.width, config.height)?;
    let (max_x, max_y) = (config.width as i32 - 1, config.height as i32 - 1);

    for position in world.cells().positions().collect::<Vec<_>>() {
        let on_edge =
            position.x == 0 || position.y == 0 || position.x == max_x || position.y == max_y;
        let (dirt, obstacle) = if on_edge { boundary } else { inner };

        if rng.sample(dirt) {
            world.add_dirt(position);
        }
        if rng.sample(obstacle) && position != config.start {
            world.add_obstacle(position);
        }
    }
    Ok(world)
}

/// Adds extra dirt and obstacles to the interior of an existing world.
///
/// `keep_clear` never receives an obstacle.
pub fn sprinkle_interior<R: Rng + ?Sized>(
    world: &mut GridWorld,
    rng: &mut R,
    dirt_prob: f64,
    obstacle_prob: f64,
    keep_clear: Position,
) -> Result<(), WorldError> {
    let dirt = chance("dirt_prob", dirt_prob)?;
    let obstacle = chance("obstacle_prob", obstacle_prob)?;
    let (width, height) = (world.width() as i32, world.height() as i32);
    for x in 1..width - 1 {
        for y in 1..height - 1 {
            let position = Position::new(x, y);
            if rng.sample(dirt) {
                world.add_dirt(position);
            }
            if rng.sample(obstacle) && position != keep_clear {
                world.add_obstacle(position);
            }
        }
    }
    Ok(())
}

/// A 5x5 maze: two walls of obstacles in columns 1 and 3 (rows 1 to 3) and
/// dirt in every corner, so the agent has to travel the outer corridor.
pub fn worst_case_world() -> GridWorld {
    let (width, height) = (5, 5);
    let mut world = GridWorld::new(width, height);
    for row in 1..=3 {
        world.add_obstacle(Position::new(1, row));
        world.add_obstacle(Position::new(3, row));
    }
    let (right, bottom) = (width as i32 - 1, height as i32 - 1);
    for corner in [
        Position::new(0, 0),
        Position::new(0, bottom),
        Position::new(right, 0),
        Position::new(right, bottom),
    ] {
        world.add_dirt(corner);
    }
    world
}

/// Represents errors found while parsing a map description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("Map string is empty.")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map code '{token}' at position ({x}, {y}).")]
    UnknownToken { token: String, x: usize, y: usize },
    #[error("Multiple start positions found.")]
    MultipleStarts,
    #[error("No start position found in map.")]
    NoStart,
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Loads a world from whitespace-separated cell codes, one row per line.
///
/// Codes: `.` clean, `D` dirt, `#` obstacle, `S` start on a clean cell,
/// `s` start on a dirty cell. Returns the world and the start position.
pub fn load_world_from_string(map_string: &str) -> Result<(GridWorld, Position), MapError> {
    let lines: Vec<&str> = map_string
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(MapError::Empty);
    }

    let mut rows: Vec<Vec<&str>> = Vec::with_capacity(lines.len());
    for (y, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if let Some(first) = rows.first() {
            if tokens.len() != first.len() {
                return Err(MapError::InconsistentWidth {
                    row: y,
                    expected: first.len(),
                    found: tokens.len(),
                });
            }
        }
        rows.push(tokens);
    }

    let mut world = GridWorld::try_new(rows[0].len(), rows.len())?;
    let mut start: Option<Position> = None;

    for (y, row) in rows.iter().enumerate() {
        for (x, token) in row.iter().enumerate() {
            let position = Position::new(x as i32, y as i32);
            match *token {
                "." => {}
                "D" => {
                    world.add_dirt(position);
                }
                "#" => {
                    world.add_obstacle(position);
                }
                "S" | "s" => {
                    if start.replace(position).is_some() {
                        return Err(MapError::MultipleStarts);
                    }
                    if *token == "s" {
                        world.add_dirt(position);
                    }
                }
                unknown => {
                    return Err(MapError::UnknownToken {
                        token: unknown.to_string(),
                        x,
                        y,
                    });
                }
            }
        }
    }

    let start = start.ok_or(MapError::NoStart)?;
    Ok((world, start))
}
