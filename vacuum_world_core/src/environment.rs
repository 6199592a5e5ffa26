use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::{Action, CellStatus, EntityId, Percept, Position, agent::Agent, map::Grid};

/// Performance points charged for every movement attempt.
pub const MOVE_COST: i64 = 1;
/// Performance points granted for sucking up dirt.
pub const CLEAN_REWARD: i64 = 100;

/// Contents of a single cell. Dirt and obstacles exclude each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Dirt,
    Obstacle,
}

/// Holds the state of an agent within the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: EntityId,
    pub location: Position,
    /// Cumulative score: +100 per cleaned cell, -1 per movement attempt.
    pub performance: i64,
    /// Set when the last movement attempt was blocked.
    pub bump: bool,
}

/// Represents the outcome of executing an agent's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Moved,
    Bumped,
    Cleaned,
    NothingToClean,
    Idle,
}

/// Errors raised by world construction and agent bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("World dimensions must be positive, got ({width}, {height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("Agent {0} not found")]
    UnknownAgent(EntityId),
    #[error("Position {0} is out of bounds")]
    OutOfBounds(Position),
    #[error("Cannot place agent inside an obstacle at {0}")]
    Obstructed(Position),
    #[error("{0} must be a probability between 0 and 1")]
    InvalidProbability(&'static str),
}

/// Result of [`GridWorld::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps_taken: usize,
    pub clean: bool,
}

/// The vacuum world: a rectangular grid of cells plus the agents moving in it.
///
/// The world is the only thing that mutates cell contents and agent
/// locations. Agents are stepped in the order they were added.
pub struct GridWorld {
    cells: Grid<Cell>,
    dirt_count: usize,
    agents: Vec<AgentState>,
    behaviors: Vec<Box<dyn Agent>>,
}

impl GridWorld {
    /// Creates an empty world.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn new(width: usize, height: usize) -> Self {
        match Self::try_new(width, height) {
            Ok(world) => world,
            Err(err) => panic!("{err}"),
        }
    }

    /// Creates an empty world, rejecting zero dimensions.
    pub fn try_new(width: usize, height: usize) -> Result<Self, WorldError> {
        if width == 0 || height == 0 || i32::try_from(width.max(height)).is_err() {
            return Err(WorldError::InvalidDimensions { width, height });
        }
        Ok(GridWorld {
            cells: Grid::new(width, height),
            dirt_count: 0,
            agents: Vec::new(),
            behaviors: Vec::new(),
        })
    }

    pub fn width(&self) -> usize {
        self.cells.width()
    }

    pub fn height(&self) -> usize {
        self.cells.height()
    }

    pub fn cells(&self) -> &Grid<Cell> {
        &self.cells
    }

    /// Puts dirt at `position` unless it holds an obstacle or lies outside the grid.
    ///
    /// Returns whether the cell is dirty afterwards.
    pub fn add_dirt(&mut self, position: Position) -> bool {
        let Some(cell) = self.cells.get_mut(position) else {
            return false;
        };
        match *cell {
            Cell::Empty => {
                *cell = Cell::Dirt;
                self.dirt_count += 1;
                true
            }
            Cell::Dirt => true,
            Cell::Obstacle => false,
        }
    }

    /// Puts an obstacle at `position` unless it holds dirt or lies outside the grid.
    ///
    /// Returns whether the cell is an obstacle afterwards.
    pub fn add_obstacle(&mut self, position: Position) -> bool {
        let Some(cell) = self.cells.get_mut(position) else {
            return false;
        };
        match *cell {
            Cell::Empty => {
                *cell = Cell::Obstacle;
                true
            }
            Cell::Obstacle => true,
            Cell::Dirt => false,
        }
    }

    /// Adds an agent at `location` and returns its id.
    pub fn add_agent(
        &mut self,
        location: Position,
        behavior: Box<dyn Agent>,
    ) -> Result<EntityId, WorldError> {
        match self.cells.get(location) {
            None => return Err(WorldError::OutOfBounds(location)),
            Some(Cell::Obstacle) => return Err(WorldError::Obstructed(location)),
            Some(_) => {}
        }

        let id = self.agents.len();
        debug!(id, agent = behavior.name(), %location, "agent added");
        self.agents.push(AgentState {
            id,
            location,
            performance: 0,
            bump: false,
        });
        self.behaviors.push(behavior);
        Ok(id)
    }

    pub fn cell(&self, position: Position) -> Option<Cell> {
        self.cells.get(position).copied()
    }

    pub fn is_obstacle(&self, position: Position) -> bool {
        self.cell(position) == Some(Cell::Obstacle)
    }

    pub fn is_dirty(&self, position: Position) -> bool {
        self.cell(position) == Some(Cell::Dirt)
    }

    /// Dirt status of a cell; anything that is not dirt reads as clean.
    pub fn status_at(&self, position: Position) -> CellStatus {
        if self.is_dirty(position) {
            CellStatus::Dirty
        } else {
            CellStatus::Clean
        }
    }

    pub fn dirt_count(&self) -> usize {
        self.dirt_count
    }

    pub fn dirt_locations(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Dirt)
            .map(|(position, _)| position)
    }

    /// True once no dirt remains anywhere.
    pub fn is_clean(&self) -> bool {
        self.dirt_count == 0
    }

    pub fn agents(&self) -> &[AgentState] {
        &self.agents
    }

    pub fn agent_state(&self, id: EntityId) -> Option<&AgentState> {
        self.agents.get(id)
    }

    /// Read-only access to an agent's decision logic, e.g. to inspect its map.
    pub fn agent(&self, id: EntityId) -> Option<&dyn Agent> {
        self.behaviors.get(id).map(|behavior| behavior.as_ref())
    }

    /// The percept the agent would receive right now.
    pub fn percept(&self, id: EntityId) -> Result<Percept, WorldError> {
        let state = self.agents.get(id).ok_or(WorldError::UnknownAgent(id))?;
        Ok(self.percept_at(state.location))
    }

    fn percept_at(&self, location: Position) -> Percept {
        Percept {
            location,
            status: self.status_at(location),
        }
    }

    /// Executes `action` on behalf of agent `id`.
    pub fn execute_action(
        &mut self,
        id: EntityId,
        action: Action,
    ) -> Result<ActionOutcome, WorldError> {
        if id >= self.agents.len() {
            return Err(WorldError::UnknownAgent(id));
        }
        Ok(self.apply(id, action))
    }

    fn apply(&mut self, id: EntityId, action: Action) -> ActionOutcome {
        let agent = &mut self.agents[id];
        agent.bump = false;

        let outcome = match action {
            Action::NoOp => ActionOutcome::Idle,
            Action::Suck => match self.cells.get_mut(agent.location) {
                Some(cell) if *cell == Cell::Dirt => {
                    *cell = Cell::Empty;
                    self.dirt_count -= 1;
                    agent.performance += CLEAN_REWARD;
                    ActionOutcome::Cleaned
                }
                _ => ActionOutcome::NothingToClean,
            },
            Action::Move(direction) => {
                let target = agent.location.step(direction);
                agent.performance -= MOVE_COST;
                match self.cells.get(target) {
                    Some(Cell::Empty | Cell::Dirt) => {
                        agent.location = target;
                        ActionOutcome::Moved
                    }
                    Some(Cell::Obstacle) | None => {
                        agent.bump = true;
                        debug!(id, from = %agent.location, %target, "bump");
                        ActionOutcome::Bumped
                    }
                }
            }
        };

        trace!(id, %action, ?outcome, location = %agent.location, performance = agent.performance);
        outcome
    }

    /// Runs one perceive, decide, execute cycle for every agent in turn.
    pub fn step(&mut self) {
        for id in 0..self.agents.len() {
            let percept = self.percept_at(self.agents[id].location);
            let action = self.behaviors[id].decide(&percept);
            self.apply(id, action);
        }
    }

    /// Steps the world up to `max_steps` times, stopping early once it is clean.
    pub fn run(&mut self, max_steps: usize) -> RunSummary {
        let mut steps_taken = 0;
        while steps_taken < max_steps && !self.is_clean() {
            self.step();
            steps_taken += 1;
        }
        let summary = RunSummary {
            steps_taken,
            clean: self.is_clean(),
        };
        info!(
            steps = summary.steps_taken,
            clean = summary.clean,
            remaining_dirt = self.dirt_count,
            "run finished"
        );
        summary
    }
}
