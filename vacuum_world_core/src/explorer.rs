//! Frontier-seeking exploration for the rational vacuum agent.
//!
//! The agent never sees walls. It keeps a partial map of everything it has
//! stood on or next to, infers obstacles from moves that did not change its
//! location, and walks towards the nearest unexplored cell with a
//! breadth-first search that is recomputed from scratch every step.

use std::collections::{HashMap, HashSet, VecDeque};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    Action, CellStatus, Direction, Percept, Position,
    agent::{Agent, random_move},
};

/// What the agent believes about a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Adjacent to a visited cell but never entered.
    Unknown,
    /// Visited at least once.
    Explorable,
    /// A move into it failed.
    Obstacle,
}

/// The agent's partial map of the world.
///
/// Entries are only ever added or upgraded; nothing returns to
/// [`Classification::Unknown`] once classified otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorationMap {
    cells: HashMap<Position, Classification>,
    statuses: HashMap<Position, CellStatus>,
}

impl ExplorationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classification(&self, position: Position) -> Option<Classification> {
        self.cells.get(&position).copied()
    }

    /// Last dirt status observed at `position`.
    pub fn status(&self, position: Position) -> Option<CellStatus> {
        self.statuses.get(&position).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, Classification)> + '_ {
        self.cells.iter().map(|(position, class)| (*position, *class))
    }

    fn is(&self, position: Position, class: Classification) -> bool {
        self.classification(position) == Some(class)
    }

    /// Records a cell the agent failed to enter.
    pub(crate) fn mark_obstacle(&mut self, position: Position) {
        self.cells.insert(position, Classification::Obstacle);
    }

    /// Records the agent standing on `location` and seeing `status` there.
    pub(crate) fn observe(&mut self, location: Position, status: CellStatus) {
        self.cells.insert(location, Classification::Explorable);
        self.statuses.insert(location, status);
        for (_, adjacent) in location.neighbors() {
            self.cells.entry(adjacent).or_insert(Classification::Unknown);
        }
    }

    /// First unknown neighbour of `from`, in precedence order.
    pub fn unknown_neighbor(&self, from: Position) -> Option<Direction> {
        from.neighbors()
            .into_iter()
            .find(|(_, adjacent)| self.is(*adjacent, Classification::Unknown))
            .map(|(direction, _)| direction)
    }

    /// Breadth-first search over explorable cells for the closest cell next to
    /// an unknown one. Returns the first step of the shortest path found, or
    /// `None` when every reachable cell is fully explored.
    pub fn path_to_frontier(&self, from: Position) -> Option<Direction> {
        let mut queue: VecDeque<(Position, Option<Direction>)> = VecDeque::new();
        let mut visited: HashSet<Position> = HashSet::new();
        queue.push_back((from, None));
        visited.insert(from);

        while let Some((current, first_step)) = queue.pop_front() {
            for (direction, adjacent) in current.neighbors() {
                if self.is(adjacent, Classification::Unknown) {
                    return Some(first_step.unwrap_or(direction));
                }
                if self.is(adjacent, Classification::Explorable) && visited.insert(adjacent) {
                    queue.push_back((adjacent, first_step.or(Some(direction))));
                }
            }
        }
        None
    }
}

/// Model-based agent that explores systematically and cleans what it finds.
#[derive(Debug)]
pub struct RationalAgent {
    map: ExplorationMap,
    location: Option<Position>,
    last_action: Option<Action>,
    rng: StdRng,
}

impl RationalAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            map: ExplorationMap::new(),
            location: None,
            last_action: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn map(&self) -> &ExplorationMap {
        &self.map
    }

    /// If the previous move left us where we were, its target is blocked.
    fn reconcile(&mut self, location: Position) {
        if let (Some(previous), Some(Action::Move(direction))) = (self.location, self.last_action)
        {
            let expected = previous.step(direction);
            if expected != location {
                debug!(%expected, "inferred obstacle");
                self.map.mark_obstacle(expected);
            }
        }
    }

    fn choose(&mut self, percept: &Percept) -> Action {
        if percept.is_dirty() {
            return Action::Suck;
        }
        if let Some(direction) = self.map.unknown_neighbor(percept.location) {
            return Action::Move(direction);
        }
        if let Some(direction) = self.map.path_to_frontier(percept.location) {
            return Action::Move(direction);
        }
        debug!(location = %percept.location, "no frontier left, moving randomly");
        random_move(&mut self.rng)
    }
}

impl Agent for RationalAgent {
    fn name(&self) -> &'static str {
        "Rational"
    }

    fn decide(&mut self, percept: &Percept) -> Action {
        self.reconcile(percept.location);
        self.location = Some(percept.location);
        self.map.observe(percept.location, percept.status);

        let action = self.choose(percept);
        trace!(location = %percept.location, %action, known = self.map.len(), "rational decision");
        self.last_action = Some(action);
        action
    }

    fn exploration_map(&self) -> Option<&ExplorationMap> {
        Some(&self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_at(x: i32, y: i32) -> Percept {
        Percept {
            location: Position::new(x, y),
            status: CellStatus::Clean,
        }
    }

    fn block_unknowns(map: &mut ExplorationMap, keep: &[Position]) {
        let unknown: Vec<Position> = map
            .iter()
            .filter(|(p, c)| *c == Classification::Unknown && !keep.contains(p))
            .map(|(p, _)| p)
            .collect();
        for position in unknown {
            map.mark_obstacle(position);
        }
    }

    #[test]
    fn first_step_prefers_right() {
        let mut agent = RationalAgent::new(0);
        assert_eq!(agent.decide(&clean_at(1, 1)), Action::RIGHT);
        let map = agent.map();
        assert_eq!(
            map.classification(Position::new(1, 1)),
            Some(Classification::Explorable)
        );
        assert_eq!(
            map.classification(Position::new(1, 0)),
            Some(Classification::Unknown)
        );
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn dirt_overrides_exploration() {
        let mut agent = RationalAgent::new(0);
        let dirty = Percept {
            location: Position::new(0, 0),
            status: CellStatus::Dirty,
        };
        assert_eq!(agent.decide(&dirty), Action::Suck);
        assert_eq!(agent.map().status(Position::new(0, 0)), Some(CellStatus::Dirty));
    }

    #[test]
    fn failed_move_marks_obstacle_and_tries_next_direction() {
        let mut agent = RationalAgent::new(0);
        assert_eq!(agent.decide(&clean_at(0, 0)), Action::RIGHT);
        // Still at the origin: the move bumped.
        assert_eq!(agent.decide(&clean_at(0, 0)), Action::LEFT);
        assert_eq!(
            agent.map().classification(Position::new(1, 0)),
            Some(Classification::Obstacle)
        );
        assert_eq!(agent.decide(&clean_at(0, 0)), Action::DOWN);
        assert_eq!(agent.decide(&clean_at(0, 0)), Action::UP);
    }

    #[test]
    fn suck_is_not_mistaken_for_a_bump() {
        let mut agent = RationalAgent::new(0);
        let dirty = Percept {
            location: Position::new(2, 2),
            status: CellStatus::Dirty,
        };
        assert_eq!(agent.decide(&dirty), Action::Suck);
        agent.decide(&clean_at(2, 2));
        assert!(
            agent
                .map()
                .iter()
                .all(|(_, class)| class != Classification::Obstacle)
        );
    }

    #[test]
    fn enclosed_cell_falls_back_to_random_moves() {
        let mut agent = RationalAgent::new(5);
        for _ in 0..4 {
            agent.decide(&clean_at(0, 0));
        }
        for _ in 0..10 {
            assert!(agent.decide(&clean_at(0, 0)).is_move());
        }
        let map = agent.map();
        assert_eq!(map.unknown_neighbor(Position::new(0, 0)), None);
        assert_eq!(map.path_to_frontier(Position::new(0, 0)), None);
    }

    #[test]
    fn bfs_walks_corridor_to_frontier() {
        let mut map = ExplorationMap::new();
        for x in 0..3 {
            map.observe(Position::new(x, 0), CellStatus::Clean);
        }
        block_unknowns(&mut map, &[Position::new(3, 0)]);

        assert_eq!(map.unknown_neighbor(Position::new(0, 0)), None);
        assert_eq!(
            map.path_to_frontier(Position::new(0, 0)),
            Some(Direction::Right)
        );
        assert_eq!(
            map.path_to_frontier(Position::new(2, 0)),
            Some(Direction::Right)
        );
    }

    #[test]
    fn bfs_breaks_ties_by_direction_precedence() {
        let mut map = ExplorationMap::new();
        for x in -1..=1 {
            map.observe(Position::new(x, 0), CellStatus::Clean);
        }
        // Frontiers at equal distance on both ends.
        block_unknowns(&mut map, &[Position::new(2, 0), Position::new(-2, 0)]);
        assert_eq!(
            map.path_to_frontier(Position::new(0, 0)),
            Some(Direction::Right)
        );

        map.mark_obstacle(Position::new(2, 0));
        assert_eq!(
            map.path_to_frontier(Position::new(0, 0)),
            Some(Direction::Left)
        );
    }

    #[test]
    fn bfs_finds_nothing_when_fully_explored() {
        let mut map = ExplorationMap::new();
        map.observe(Position::new(0, 0), CellStatus::Clean);
        map.observe(Position::new(0, 1), CellStatus::Clean);
        block_unknowns(&mut map, &[]);
        assert_eq!(map.path_to_frontier(Position::new(0, 0)), None);
    }

    #[test]
    fn observing_never_downgrades_known_cells() {
        let mut map = ExplorationMap::new();
        map.mark_obstacle(Position::new(1, 0));
        map.observe(Position::new(0, 0), CellStatus::Clean);
        map.observe(Position::new(-1, 0), CellStatus::Clean);
        assert_eq!(
            map.classification(Position::new(1, 0)),
            Some(Classification::Obstacle)
        );
        assert_eq!(
            map.classification(Position::new(-1, 0)),
            Some(Classification::Explorable)
        );
    }
}
