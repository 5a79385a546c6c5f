use std::collections::VecDeque;
use rand::Rng;
use serde::{Deserialize, Serialize};

const START_LENGTH: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }
}

/// One of the four moves the agent can take. Ordinals are stable and used to
/// index network outputs and table keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up,
    Right,
    Down,
    Left,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Right, Action::Down, Action::Left];

    pub fn index(self) -> usize {
        match self {
            Action::Up => 0,
            Action::Right => 1,
            Action::Down => 2,
            Action::Left => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Up => "UP",
            Action::Right => "RIGHT",
            Action::Down => "DOWN",
            Action::Left => "LEFT",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Action::Up => Direction::Up,
            Action::Right => Direction::Right,
            Action::Down => Direction::Down,
            Action::Left => Direction::Left,
        }
    }

    pub fn random() -> Action {
        Action::ALL[rand::rng().random_range(0..Action::ALL.len())]
    }
}

/// Grid-aligned coordinates of a game object (snake segment or food).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, direction: Direction, distance: i32) -> Position {
        match direction {
            Direction::Up => Position::new(self.x, self.y - distance),
            Direction::Right => Position::new(self.x + distance, self.y),
            Direction::Down => Position::new(self.x, self.y + distance),
            Direction::Left => Position::new(self.x - distance, self.y),
        }
    }
}

/// Square game world. Coordinates run from 0 to `max_coordinate()` in steps
/// of `cell_size`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    cell_size: i32,
    dimensions: i32,
}

impl Grid {
    pub fn new(dimensions: i32, cell_size: i32) -> Self {
        assert!(cell_size > 0, "cell size must be positive");
        assert!(
            dimensions > 0 && dimensions % cell_size == 0,
            "dimensions must be a positive multiple of the cell size"
        );
        Self { cell_size, dimensions }
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    pub fn dimensions(&self) -> i32 {
        self.dimensions
    }

    pub fn cells(&self) -> i32 {
        self.dimensions / self.cell_size
    }

    pub fn max_coordinate(&self) -> i32 {
        self.dimensions - self.cell_size
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && position.x <= self.max_coordinate()
            && position.y <= self.max_coordinate()
    }

    /// Uniformly random cell. Occupancy is not checked, so food can land on
    /// the snake body.
    pub fn random_cell(&self) -> Position {
        let mut rng = rand::rng();
        Position::new(
            rng.random_range(0..self.cells()) * self.cell_size,
            rng.random_range(0..self.cells()) * self.cell_size,
        )
    }
}

impl Default for Grid {
    fn default() -> Self {
        Grid::new(300, 10)
    }
}

/// Read-only copy of the engine state for drawing.
#[derive(Clone, Debug)]
pub struct EngineSnapshot {
    pub grid: Grid,
    pub snake: Vec<Position>,
    pub food: Position,
    pub snake_length: usize,
    pub alive: bool,
}

pub struct GameEngine {
    grid: Grid,
    body: VecDeque<Position>,
    heading: Direction,
    food: Position,
    alive: bool,
}

impl GameEngine {
    pub fn new(grid: Grid) -> Self {
        let mut engine = Self {
            grid,
            body: VecDeque::with_capacity((grid.cells() * grid.cells()) as usize),
            heading: Direction::Right,
            food: Position::new(0, 0),
            alive: true,
        };
        engine.reset();
        engine
    }

    /// Restore the starting snake and spawn fresh food. Safe to call at any
    /// point, any number of times.
    pub fn reset(&mut self) {
        let cell = self.grid.cell_size();
        let head = Position::new(cell * 5, cell * 5);

        self.body.clear();
        for i in 0..START_LENGTH {
            self.body.push_back(Position::new(head.x - i as i32 * cell, head.y));
        }

        self.heading = Direction::Right;
        self.food = self.grid.random_cell();
        self.alive = true;
    }

    /// Advance one tick: adopt the action as the new heading, move the head
    /// one cell, shift the body after it. Eating food grows the snake and
    /// skips both termination checks for this tick. Otherwise the head is
    /// checked against the bounds and against every other body cell; the
    /// just-vacated tail cell still counts on the tick it is vacated.
    pub fn step(&mut self, action: Action) -> bool {
        self.heading = action.direction();

        let head = self.head();
        let new_head = head.offset(self.heading, self.grid.cell_size());
        self.body.push_front(new_head);

        if new_head == self.food {
            self.food = self.grid.random_cell();
        } else {
            self.alive = self.grid.contains(new_head)
                && !self.body.iter().skip(1).any(|&p| p == new_head);
            self.body.pop_back();
        }

        self.alive
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Unconditionally end the current game, e.g. when an episode is stuck.
    pub fn force_end(&mut self) {
        self.alive = false;
    }

    pub fn head(&self) -> Position {
        *self.body.front().expect("snake is never empty")
    }

    pub fn snake(&self) -> &VecDeque<Position> {
        &self.body
    }

    pub fn snake_length(&self) -> usize {
        self.body.len()
    }

    pub fn food(&self) -> Position {
        self.food
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    #[cfg(test)]
    pub(crate) fn place_food(&mut self, food: Position) {
        self.food = food;
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            grid: self.grid,
            snake: self.body.iter().copied().collect(),
            food: self.food,
            snake_length: self.body.len(),
            alive: self.alive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(body: Vec<Position>, heading: Direction, food: Position) -> GameEngine {
        let mut engine = GameEngine::new(Grid::default());
        engine.body = VecDeque::from(body);
        engine.heading = heading;
        engine.food = food;
        engine.alive = true;
        engine
    }

    #[test]
    fn test_reset_places_starting_snake() {
        let engine = GameEngine::new(Grid::default());

        assert!(engine.is_alive());
        assert_eq!(engine.snake_length(), 3);
        assert_eq!(engine.heading(), Direction::Right);
        assert_eq!(
            engine.snake().iter().copied().collect::<Vec<_>>(),
            vec![
                Position::new(50, 50),
                Position::new(40, 50),
                Position::new(30, 50)
            ]
        );
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut engine = GameEngine::new(Grid::default());
        engine.step(Action::Right);
        engine.force_end();

        engine.reset();
        engine.reset();

        assert!(engine.is_alive());
        assert_eq!(engine.head(), Position::new(50, 50));
        assert_eq!(engine.snake_length(), 3);
    }

    #[test]
    fn test_step_moves_head_and_shifts_body() {
        for (action, expected_head) in [
            (Action::Up, Position::new(50, 40)),
            (Action::Right, Position::new(60, 50)),
            (Action::Down, Position::new(50, 60)),
        ] {
            let mut engine = engine_with(
                vec![
                    Position::new(50, 50),
                    Position::new(40, 50),
                    Position::new(30, 50),
                ],
                Direction::Right,
                Position::new(200, 200),
            );

            let alive = engine.step(action);

            assert!(alive);
            assert_eq!(
                engine.snake().iter().copied().collect::<Vec<_>>(),
                vec![expected_head, Position::new(50, 50), Position::new(40, 50)],
                "body must shift into the cells vacated by its predecessors"
            );
        }
    }

    #[test]
    fn test_step_updates_heading() {
        let mut engine = engine_with(
            vec![
                Position::new(50, 50),
                Position::new(40, 50),
                Position::new(30, 50),
            ],
            Direction::Right,
            Position::new(200, 200),
        );

        engine.step(Action::Up);

        assert_eq!(engine.heading(), Direction::Up);
    }

    #[test]
    fn test_eating_food_grows_snake_and_respawns_food() {
        let mut engine = engine_with(
            vec![
                Position::new(50, 50),
                Position::new(40, 50),
                Position::new(30, 50),
            ],
            Direction::Right,
            Position::new(60, 50),
        );

        let alive = engine.step(Action::Right);

        assert!(alive);
        assert_eq!(engine.snake_length(), 4);
        assert_eq!(engine.head(), Position::new(60, 50));
        // the vacated tail cell is kept when growing
        assert_eq!(
            engine.snake().iter().copied().collect::<Vec<_>>(),
            vec![
                Position::new(60, 50),
                Position::new(50, 50),
                Position::new(40, 50),
                Position::new(30, 50)
            ]
        );
    }

    #[test]
    fn test_wall_collision_ends_game() {
        let grid = Grid::default();
        let mut engine = engine_with(
            vec![
                Position::new(grid.max_coordinate(), 50),
                Position::new(grid.max_coordinate() - 10, 50),
                Position::new(grid.max_coordinate() - 20, 50),
            ],
            Direction::Right,
            Position::new(0, 0),
        );

        let alive = engine.step(Action::Right);

        assert!(!alive);
        assert!(!engine.is_alive());
    }

    #[test]
    fn test_negative_coordinates_end_game() {
        let mut engine = engine_with(
            vec![
                Position::new(0, 50),
                Position::new(10, 50),
                Position::new(20, 50),
            ],
            Direction::Left,
            Position::new(200, 200),
        );

        assert!(!engine.step(Action::Left));
    }

    #[test]
    fn test_reversing_into_body_is_self_collision() {
        // The heading flips without restriction, so reversing walks straight
        // into the first body segment.
        let mut engine = engine_with(
            vec![
                Position::new(50, 50),
                Position::new(40, 50),
                Position::new(30, 50),
            ],
            Direction::Right,
            Position::new(200, 200),
        );

        assert!(!engine.step(Action::Left));
    }

    #[test]
    fn test_vacated_tail_cell_still_collides() {
        // Head steps into the cell the tail is leaving this same tick.
        let mut engine = engine_with(
            vec![
                Position::new(50, 50),
                Position::new(40, 50),
                Position::new(40, 60),
                Position::new(50, 60),
            ],
            Direction::Right,
            Position::new(200, 200),
        );

        assert!(!engine.step(Action::Down));
    }

    #[test]
    fn test_food_eaten_short_circuits_collision_checks() {
        // Stepping onto food in the same cell pattern as above survives
        // because growth skips both termination checks.
        let mut engine = engine_with(
            vec![
                Position::new(50, 50),
                Position::new(40, 50),
                Position::new(40, 60),
                Position::new(50, 60),
            ],
            Direction::Right,
            Position::new(50, 60),
        );

        assert!(engine.step(Action::Down));
        assert_eq!(engine.snake_length(), 5);
    }

    #[test]
    fn test_force_end() {
        let mut engine = GameEngine::new(Grid::default());
        engine.force_end();
        assert!(!engine.is_alive());
    }

    #[test]
    fn test_random_cell_is_grid_aligned_and_in_bounds() {
        let grid = Grid::default();
        for _ in 0..200 {
            let cell = grid.random_cell();
            assert!(grid.contains(cell));
            assert_eq!(cell.x % grid.cell_size(), 0);
            assert_eq!(cell.y % grid.cell_size(), 0);
        }
    }

    #[test]
    fn test_snapshot_mirrors_engine_state() {
        let engine = GameEngine::new(Grid::default());
        let snapshot = engine.snapshot();

        assert_eq!(snapshot.snake_length, engine.snake_length());
        assert_eq!(snapshot.food, engine.food());
        assert_eq!(snapshot.alive, engine.is_alive());
        assert_eq!(snapshot.snake[0], engine.head());
    }

    #[test]
    fn test_action_indices_are_stable() {
        assert_eq!(Action::Up.index(), 0);
        assert_eq!(Action::Right.index(), 1);
        assert_eq!(Action::Down.index(), 2);
        assert_eq!(Action::Left.index(), 3);
    }

    #[test]
    fn test_direction_opposites() {
        assert_eq!(Direction::Up.opposite(), Direction::Down);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }
}
