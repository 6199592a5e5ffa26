use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::{
    EntityId, Position,
    agent::AgentKind,
    environment::{GridWorld, WorldError},
    map::Grid,
    scenario::{DEFAULT_START, EXPERIMENT_DIRT_PROB, EXPERIMENT_OBSTACLE_PROB, sprinkle_interior},
};

/// How to run a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub agent: AgentKind,
    pub start: Position,
    pub steps: usize,
    pub seed: u64,
}

impl TrialConfig {
    pub fn new(agent: AgentKind) -> Self {
        TrialConfig {
            agent,
            start: DEFAULT_START,
            steps: 100,
            seed: 0,
        }
    }
}

/// What a finished trial looked like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialReport {
    pub agent: AgentKind,
    pub performance: i64,
    pub steps_taken: usize,
    pub clean: bool,
    pub final_location: Position,
    pub remaining_dirt: usize,
}

/// Final scores of one agent kind over repeated trials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentScores {
    pub agent: AgentKind,
    pub scores: Vec<i64>,
}

fn place(world: &mut GridWorld, config: &TrialConfig) -> Result<EntityId, WorldError> {
    world.add_agent(config.start, config.agent.build(config.seed))
}

fn performance(world: &GridWorld, id: EntityId) -> i64 {
    world.agents()[id].performance
}

/// Runs `config.agent` in `world` until the step budget is spent or the world is clean.
pub fn run_trial(mut world: GridWorld, config: &TrialConfig) -> Result<TrialReport, WorldError> {
    let _span = info_span!("trial", agent = %config.agent, seed = config.seed).entered();
    let id = place(&mut world, config)?;
    let summary = world.run(config.steps);
    let state = &world.agents()[id];
    Ok(TrialReport {
        agent: config.agent,
        performance: state.performance,
        steps_taken: summary.steps_taken,
        clean: summary.clean,
        final_location: state.location,
        remaining_dirt: world.dirt_count(),
    })
}

/// Like [`run_trial`], but calls `observer` with the world, the agent id and
/// the step number after placement (step 0) and after every step.
pub fn run_trial_observed<F>(
    mut world: GridWorld,
    config: &TrialConfig,
    mut observer: F,
) -> Result<TrialReport, WorldError>
where
    F: FnMut(&GridWorld, EntityId, usize),
{
    let _span = info_span!("trial", agent = %config.agent, seed = config.seed).entered();
    let id = place(&mut world, config)?;
    observer(&world, id, 0);

    let mut steps_taken = 0;
    while steps_taken < config.steps && !world.is_clean() {
        world.step();
        steps_taken += 1;
        observer(&world, id, steps_taken);
    }

    let state = &world.agents()[id];
    Ok(TrialReport {
        agent: config.agent,
        performance: state.performance,
        steps_taken,
        clean: world.is_clean(),
        final_location: state.location,
        remaining_dirt: world.dirt_count(),
    })
}

/// Adds the extra interior dirt and obstacles the time-series and heatmap
/// experiments run on, drawn from `config.seed`. The start cell stays free.
pub fn experiment_world(mut world: GridWorld, config: &TrialConfig) -> Result<GridWorld, WorldError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    sprinkle_interior(
        &mut world,
        &mut rng,
        EXPERIMENT_DIRT_PROB,
        EXPERIMENT_OBSTACLE_PROB,
        config.start,
    )?;
    Ok(world)
}

/// Cumulative performance after every step of an [`experiment_world`] run.
/// Stops after the step that leaves the world clean.
pub fn run_time_series(world: GridWorld, config: &TrialConfig) -> Result<Vec<i64>, WorldError> {
    let mut world = experiment_world(world, config)?;
    let id = place(&mut world, config)?;
    let mut series = Vec::with_capacity(config.steps);
    for _ in 0..config.steps {
        world.step();
        series.push(performance(&world, id));
        if world.is_clean() {
            break;
        }
    }
    Ok(series)
}

/// How often the agent ended a step on each cell of an [`experiment_world`] run.
pub fn run_visit_heatmap(world: GridWorld, config: &TrialConfig) -> Result<Grid<u32>, WorldError> {
    let mut world = experiment_world(world, config)?;
    let id = place(&mut world, config)?;
    let mut visits: Grid<u32> = Grid::new(world.width(), world.height());
    for _ in 0..config.steps {
        world.step();
        let location = world.agents()[id].location;
        if let Some(count) = visits.get_mut(location) {
            *count += 1;
        }
        if world.is_clean() {
            break;
        }
    }
    Ok(visits)
}

/// Runs every agent kind for `trials` independent trials.
///
/// Each trial gets a fresh world from `factory` and a fresh agent; both are
/// seeded from a single stream derived from `seed`, so results are
/// reproducible.
pub fn compare_agents<F>(
    mut factory: F,
    start: Position,
    trials: usize,
    steps: usize,
    seed: u64,
) -> Result<Vec<AgentScores>, WorldError>
where
    F: FnMut(&mut StdRng) -> Result<GridWorld, WorldError>,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let mut results = Vec::with_capacity(AgentKind::ALL.len());
    for agent in AgentKind::ALL {
        let mut scores = Vec::with_capacity(trials);
        for _ in 0..trials {
            let world = factory(&mut rng)?;
            let config = TrialConfig {
                agent,
                start,
                steps,
                seed: rng.random(),
            };
            scores.push(run_trial(world, &config)?.performance);
        }
        debug!(%agent, ?scores, "comparison finished");
        results.push(AgentScores { agent, scores });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        environment::Cell,
        scenario::{WORST_CASE_START, worst_case_world},
    };

    #[test]
    fn trial_reports_placement_errors() {
        let mut world = GridWorld::new(3, 3);
        world.add_obstacle(DEFAULT_START);
        let config = TrialConfig::new(AgentKind::Reflex);
        assert_eq!(
            run_trial(world, &config).err(),
            Some(WorldError::Obstructed(DEFAULT_START))
        );
    }

    #[test]
    fn rational_trial_cleans_single_dirt() {
        let mut world = GridWorld::new(5, 5);
        world.add_dirt(Position::new(3, 3));
        let config = TrialConfig {
            steps: 50,
            ..TrialConfig::new(AgentKind::Rational)
        };
        let report = run_trial(world, &config).unwrap();
        assert!(report.clean);
        assert_eq!(report.final_location, Position::new(3, 3));
        assert_eq!(report.remaining_dirt, 0);
        assert_eq!(report.performance, 100 - (report.steps_taken as i64 - 1));
    }

    #[test]
    fn observed_trial_matches_plain_trial() {
        let config = TrialConfig {
            start: WORST_CASE_START,
            seed: 4,
            ..TrialConfig::new(AgentKind::ModelBased)
        };
        let mut seen = Vec::new();
        let observed = run_trial_observed(worst_case_world(), &config, |world, id, step| {
            seen.push((step, world.agents()[id].performance));
        })
        .unwrap();
        let plain = run_trial(worst_case_world(), &config).unwrap();

        assert_eq!(observed, plain);
        assert_eq!(seen.len(), plain.steps_taken + 1);
        assert_eq!(seen[0], (0, 0));
        assert_eq!(seen.last().unwrap().1, plain.performance);
    }

    #[test]
    fn time_series_ends_when_clean() {
        // Two rows leave no interior, so nothing extra is added.
        let mut world = GridWorld::new(5, 2);
        world.add_dirt(Position::new(3, 1));
        let config = TrialConfig::new(AgentKind::Rational);
        let series = run_time_series(world, &config).unwrap();
        assert_eq!(series, vec![-1, -2, 98]);
    }

    #[test]
    fn experiment_world_sprinkles_interior_and_spares_start() {
        for seed in 0..20 {
            let config = TrialConfig {
                seed,
                ..TrialConfig::new(AgentKind::Reflex)
            };
            let world = experiment_world(GridWorld::new(9, 9), &config).unwrap();
            assert!(world.dirt_count() > 0, "seed {seed} added no dirt");
            assert!(!world.is_obstacle(config.start));
            for position in world.cells().positions() {
                let edge = position.x == 0 || position.y == 0 || position.x == 8 || position.y == 8;
                if edge {
                    assert_eq!(world.cell(position), Some(Cell::Empty));
                }
            }

            let again = experiment_world(GridWorld::new(9, 9), &config).unwrap();
            assert_eq!(world.cells(), again.cells());
        }
    }

    #[test]
    fn time_series_runs_on_the_sprinkled_world() {
        let config = TrialConfig {
            steps: 10,
            seed: 3,
            ..TrialConfig::new(AgentKind::Reflex)
        };
        // Without the extra dirt this world would be clean after one step.
        let series = run_time_series(GridWorld::new(9, 9), &config).unwrap();
        assert!(series.len() > 1);
        assert!(series.len() <= config.steps);
    }

    #[test]
    fn heatmap_counts_one_visit_per_step() {
        let config = TrialConfig {
            start: WORST_CASE_START,
            steps: 30,
            seed: 11,
            ..TrialConfig::new(AgentKind::RandomReflex)
        };
        let visits = run_visit_heatmap(worst_case_world(), &config).unwrap();
        let total: u32 = visits.iter().sum();
        assert!(total > 0 && total <= 30);
        assert_eq!(visits[Position::new(1, 1)], 0);
        assert_eq!(visits[Position::new(3, 2)], 0);
    }

    #[test]
    fn comparison_covers_every_agent() {
        let results = compare_agents(|_| Ok(worst_case_world()), WORST_CASE_START, 3, 40, 5)
            .unwrap();
        let kinds: Vec<AgentKind> = results.iter().map(|r| r.agent).collect();
        assert_eq!(kinds, AgentKind::ALL.to_vec());
        assert!(results.iter().all(|r| r.scores.len() == 3));
    }

    #[test]
    fn comparison_is_reproducible() {
        let run = || compare_agents(|_| Ok(worst_case_world()), Position::new(2, 0), 2, 25, 77);
        assert_eq!(run().unwrap(), run().unwrap());
    }
}
