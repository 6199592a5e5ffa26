use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use vacuum_world_core::{
    Position,
    agent::AgentKind,
    environment::{Cell, GridWorld, WorldError},
    explorer::{Classification, ExplorationMap},
    map::Grid,
    scenario::{
        DEFAULT_START, ScenarioConfig, WORST_CASE_START, load_world_from_string, random_world,
        worst_case_world,
    },
    simulation::{
        AgentScores, TrialConfig, TrialReport, compare_agents, run_time_series, run_trial_observed,
        run_visit_heatmap,
    },
};

use rand::{SeedableRng, rngs::StdRng};

#[derive(Parser, Debug)]
#[command(version, about = "Vacuum world agent simulator", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single trial and print its result
    Run {
        /// Agent strategy to run
        #[arg(short, long, value_enum, default_value_t = AgentArg::Rational)]
        agent: AgentArg,
        /// Map file to load instead of a generated scenario
        #[arg(
            short,
            long,
            value_name = "MAP_FILE",
            conflicts_with_all = ["scenario", "width", "height"]
        )]
        map: Option<PathBuf>,
        #[command(flatten)]
        world: WorldArgs,
        /// Print the grid after every step
        #[arg(long)]
        render: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare all agent strategies over many trials
    Compare {
        #[command(flatten)]
        world: WorldArgs,
        /// Number of trials per agent
        #[arg(short, long, default_value_t = 20)]
        trials: usize,
    },
    /// Print every agent's cumulative performance after each step
    TimeSeries {
        #[command(flatten)]
        world: WorldArgs,
        /// Print the series as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print how often every agent ended a step on each cell
    Heatmap {
        #[command(flatten)]
        world: WorldArgs,
        /// Print the visit grids as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
struct WorldArgs {
    /// Generated scenario to use
    #[arg(long, value_enum, default_value_t = ScenarioArg::Default)]
    scenario: ScenarioArg,
    /// Grid width of the default scenario [default: 5]
    #[arg(long)]
    width: Option<usize>,
    /// Grid height of the default scenario [default: 5]
    #[arg(long)]
    height: Option<usize>,
    /// Maximum number of steps per trial
    #[arg(short, long, default_value_t = 100)]
    steps: usize,
    /// Seed for world generation and agents
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AgentArg {
    Reflex,
    Random,
    ModelBased,
    Rational,
}

impl From<AgentArg> for AgentKind {
    fn from(arg: AgentArg) -> Self {
        match arg {
            AgentArg::Reflex => AgentKind::Reflex,
            AgentArg::Random => AgentKind::RandomReflex,
            AgentArg::ModelBased => AgentKind::ModelBased,
            AgentArg::Rational => AgentKind::Rational,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScenarioArg {
    /// Random dirt and obstacles
    Default,
    /// Fixed maze with dirt in the corners
    Worst,
}

impl WorldArgs {
    /// The worst-case maze has a fixed size.
    fn validate(&self) -> Result<()> {
        if matches!(self.scenario, ScenarioArg::Worst)
            && (self.width.is_some() || self.height.is_some())
        {
            bail!("--width and --height only apply to the default scenario");
        }
        Ok(())
    }

    fn scenario_config(&self) -> ScenarioConfig {
        let defaults = ScenarioConfig::default();
        ScenarioConfig {
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            ..defaults
        }
    }

    fn trial_config(&self, agent: AgentKind) -> TrialConfig {
        TrialConfig {
            agent,
            start: self.start(),
            steps: self.steps,
            seed: self.seed,
        }
    }

    fn start(&self) -> Position {
        match self.scenario {
            ScenarioArg::Default => DEFAULT_START,
            ScenarioArg::Worst => WORST_CASE_START,
        }
    }

    fn build_world(&self, rng: &mut StdRng) -> Result<GridWorld, WorldError> {
        match self.scenario {
            ScenarioArg::Default => random_world(&self.scenario_config(), rng),
            ScenarioArg::Worst => Ok(worst_case_world()),
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Command::Run {
            agent,
            map,
            world,
            render,
            json,
        } => {
            let (grid_world, start) = match map {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read map file {}", path.display()))?;
                    load_world_from_string(&text)
                        .with_context(|| format!("Failed to load map {}", path.display()))?
                }
                None => {
                    world.validate()?;
                    let mut rng = StdRng::seed_from_u64(world.seed);
                    (world.build_world(&mut rng)?, world.start())
                }
            };
            let config = TrialConfig {
                agent: agent.into(),
                start,
                steps: world.steps,
                seed: world.seed,
            };
            let report = run_observed(grid_world, &config, render)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Compare { world, trials } => {
            world.validate()?;
            info!(trials, steps = world.steps, scenario = ?world.scenario, "comparing agents");
            let results = compare_agents(
                |rng| world.build_world(rng),
                world.start(),
                trials,
                world.steps,
                world.seed,
            )?;
            print_comparison(&results);
        }
        Command::TimeSeries { world, json } => {
            world.validate()?;
            for agent in AgentKind::ALL {
                let base = world.build_world(&mut StdRng::seed_from_u64(world.seed))?;
                let series = run_time_series(base, &world.trial_config(agent))?;
                if json {
                    println!("{}", serde_json::json!({ "agent": agent, "series": series }));
                } else {
                    let values: Vec<String> = series.iter().map(i64::to_string).collect();
                    println!("{}: {}", agent, values.join(" "));
                }
            }
        }
        Command::Heatmap { world, json } => {
            world.validate()?;
            for agent in AgentKind::ALL {
                let base = world.build_world(&mut StdRng::seed_from_u64(world.seed))?;
                let visits = run_visit_heatmap(base, &world.trial_config(agent))?;
                if json {
                    println!("{}", serde_json::json!({ "agent": agent, "visits": visits }));
                } else {
                    println!("{agent}");
                    println!("{}", render_heatmap(&visits));
                }
            }
        }
    }

    Ok(())
}

/// Runs a trial, printing every intermediate state when `render` is set.
fn run_observed(world: GridWorld, config: &TrialConfig, render: bool) -> Result<TrialReport> {
    let mut known_map: Option<String> = None;
    let report = run_trial_observed(world, config, |world, id, step| {
        if !render {
            return;
        }
        let state = &world.agents()[id];
        println!(
            "step {} | pos {} | performance {}{}",
            step,
            state.location,
            state.performance,
            if state.bump { " | bump" } else { "" }
        );
        println!("{}", render_world(world));
        known_map = world
            .agent(id)
            .and_then(|agent| agent.exploration_map())
            .map(render_known_map);
    })?;

    if let Some(map) = known_map {
        println!("explored map");
        println!("{map}");
    }
    Ok(report)
}

/// Renders the world as text: `@` agent, `#` obstacle, `*` dirt, `.` clean.
fn render_world(world: &GridWorld) -> String {
    let mut lines = Vec::with_capacity(world.height());
    for y in 0..world.height() as i32 {
        let row: String = (0..world.width() as i32)
            .map(|x| {
                let position = Position::new(x, y);
                if world.agents().iter().any(|a| a.location == position) {
                    '@'
                } else {
                    match world.cell(position) {
                        Some(Cell::Obstacle) => '#',
                        Some(Cell::Dirt) => '*',
                        _ => '.',
                    }
                }
            })
            .collect();
        lines.push(row);
    }
    lines.join("\n")
}

/// Renders an agent's explored map over the bounding box of everything it knows.
fn render_known_map(map: &ExplorationMap) -> String {
    let positions: Vec<Position> = map.iter().map(|(p, _)| p).collect();
    let (Some(min_x), Some(max_x)) = (
        positions.iter().map(|p| p.x).min(),
        positions.iter().map(|p| p.x).max(),
    ) else {
        return String::new();
    };
    let min_y = positions.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = positions.iter().map(|p| p.y).max().unwrap_or(0);

    (min_y..=max_y)
        .map(|y| {
            (min_x..=max_x)
                .map(|x| match map.classification(Position::new(x, y)) {
                    Some(Classification::Explorable) => '.',
                    Some(Classification::Obstacle) => '#',
                    Some(Classification::Unknown) => '?',
                    None => ' ',
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders visit counts as right-aligned columns, one grid row per line.
fn render_heatmap(visits: &Grid<u32>) -> String {
    (0..visits.height() as i32)
        .map(|y| {
            (0..visits.width() as i32)
                .map(|x| format!("{:>4}", visits[Position::new(x, y)]))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_report(report: &TrialReport) {
    println!("Agent: {}", report.agent);
    println!("Performance: {}", report.performance);
    println!("Steps taken: {}", report.steps_taken);
    println!(
        "Clean: {} ({} dirty cells left)",
        report.clean, report.remaining_dirt
    );
    println!("Final position: {}", report.final_location);
}

fn print_comparison(results: &[AgentScores]) {
    for AgentScores { agent, scores } in results {
        let (mean, std_dev) = mean_and_std_dev(scores);
        println!(
            "{}: Avg Performance = {:.2}, Std Dev = {:.2}",
            agent, mean, std_dev
        );
    }
}

/// Sample mean and standard deviation; the deviation is 0 for fewer than two scores.
fn mean_and_std_dev(scores: &[i64]) -> (f64, f64) {
    if scores.is_empty() {
        return (0.0, 0.0);
    }
    let n = scores.len() as f64;
    let mean = scores.iter().map(|&s| s as f64).sum::<f64>() / n;
    if scores.len() < 2 {
        return (mean, 0.0);
    }
    let variance = scores
        .iter()
        .map(|&s| (s as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    (mean, variance.sqrt())
}
