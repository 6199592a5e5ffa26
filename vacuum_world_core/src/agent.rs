use std::{collections::HashMap, fmt};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Action, CellStatus, Percept, Position,
    explorer::{ExplorationMap, RationalAgent},
};

/// Trait defining the behavior of an agent.
/// Agents decide which action to take based only on the percept they receive.
pub trait Agent {
    /// Short human-readable name of the strategy.
    fn name(&self) -> &'static str;

    /// Determines the action the agent wants to perform.
    /// `&mut self` allows the agent to maintain internal state between steps.
    fn decide(&mut self, percept: &Percept) -> Action;

    /// The agent's explored map, for agents that keep one.
    fn exploration_map(&self) -> Option<&ExplorationMap> {
        None
    }
}

/// Uniformly random movement.
pub(crate) fn random_move(rng: &mut StdRng) -> Action {
    Action::MOVES[rng.random_range(0..Action::MOVES.len())]
}

/// Sucks when the cell is dirty, otherwise moves in a random direction.
#[derive(Debug)]
pub struct ReflexAgent {
    rng: StdRng,
}

impl ReflexAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for ReflexAgent {
    fn name(&self) -> &'static str {
        "Reflex"
    }

    fn decide(&mut self, percept: &Percept) -> Action {
        if percept.is_dirty() {
            return Action::Suck;
        }
        random_move(&mut self.rng)
    }
}

/// Like [`ReflexAgent`], but may also choose to wait a turn.
#[derive(Debug)]
pub struct RandomReflexAgent {
    rng: StdRng,
}

impl RandomReflexAgent {
    const CHOICES: [Action; 5] = [
        Action::LEFT,
        Action::RIGHT,
        Action::UP,
        Action::DOWN,
        Action::NoOp,
    ];

    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomReflexAgent {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn decide(&mut self, percept: &Percept) -> Action {
        if percept.is_dirty() {
            return Action::Suck;
        }
        Self::CHOICES[self.rng.random_range(0..Self::CHOICES.len())]
    }
}

/// Reflex agent that also remembers the last status seen at every location.
///
/// The memory is recorded but not used for decisions; it is only exposed for
/// inspection through [`ModelBasedAgent::model`].
#[derive(Debug)]
pub struct ModelBasedAgent {
    rng: StdRng,
    model: HashMap<Position, CellStatus>,
}

impl ModelBasedAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            model: HashMap::new(),
        }
    }

    pub fn model(&self) -> &HashMap<Position, CellStatus> {
        &self.model
    }
}

impl Agent for ModelBasedAgent {
    fn name(&self) -> &'static str {
        "Model-Based"
    }

    fn decide(&mut self, percept: &Percept) -> Action {
        self.model.insert(percept.location, percept.status);
        if percept.is_dirty() {
            return Action::Suck;
        }
        random_move(&mut self.rng)
    }
}

/// The available agent strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Reflex,
    RandomReflex,
    ModelBased,
    Rational,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Reflex,
        AgentKind::RandomReflex,
        AgentKind::ModelBased,
        AgentKind::Rational,
    ];

    /// Builds a fresh agent of this kind with its own random stream.
    pub fn build(self, seed: u64) -> Box<dyn Agent> {
        match self {
            AgentKind::Reflex => Box::new(ReflexAgent::new(seed)),
            AgentKind::RandomReflex => Box::new(RandomReflexAgent::new(seed)),
            AgentKind::ModelBased => Box::new(ModelBasedAgent::new(seed)),
            AgentKind::Rational => Box::new(RationalAgent::new(seed)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgentKind::Reflex => "Reflex",
            AgentKind::RandomReflex => "Random",
            AgentKind::ModelBased => "Model-Based",
            AgentKind::Rational => "Rational",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percept(x: i32, y: i32, status: CellStatus) -> Percept {
        Percept {
            location: Position::new(x, y),
            status,
        }
    }

    #[test]
    fn reflex_sucks_dirt_and_otherwise_moves() {
        let mut agent = ReflexAgent::new(1);
        assert_eq!(agent.decide(&percept(0, 0, CellStatus::Dirty)), Action::Suck);
        for _ in 0..50 {
            assert!(agent.decide(&percept(0, 0, CellStatus::Clean)).is_move());
        }
    }

    #[test]
    fn reflex_is_reproducible_from_seed() {
        let clean = percept(2, 2, CellStatus::Clean);
        let mut a = ReflexAgent::new(42);
        let mut b = ReflexAgent::new(42);
        for _ in 0..20 {
            assert_eq!(a.decide(&clean), b.decide(&clean));
        }
    }

    #[test]
    fn random_reflex_eventually_waits() {
        let mut agent = RandomReflexAgent::new(7);
        let clean = percept(1, 1, CellStatus::Clean);
        let actions: Vec<Action> = (0..200).map(|_| agent.decide(&clean)).collect();
        assert!(actions.contains(&Action::NoOp));
        assert!(!actions.contains(&Action::Suck));
        assert_eq!(
            agent.decide(&percept(1, 1, CellStatus::Dirty)),
            Action::Suck
        );
    }

    #[test]
    fn model_based_records_last_status() {
        let mut agent = ModelBasedAgent::new(3);
        agent.decide(&percept(1, 1, CellStatus::Dirty));
        agent.decide(&percept(1, 1, CellStatus::Clean));
        agent.decide(&percept(2, 1, CellStatus::Clean));
        assert_eq!(agent.model().len(), 2);
        assert_eq!(agent.model()[&Position::new(1, 1)], CellStatus::Clean);
        assert!(agent.exploration_map().is_none());
    }

    #[test]
    fn every_kind_builds_its_named_agent() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.build(0).name(), kind.label());
        }
    }
}
