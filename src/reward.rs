use std::collections::VecDeque;

use crate::game::{Action, Grid, Position};
use crate::state::StateEncoder;

const DOOMED_PENALTY: f32 = -100.0;
const STEP_COST: f32 = -1.0;
const ALIGNMENT_BONUS: f32 = 0.5;
const FOOD_EATEN_BONUS: f32 = 100.0;

/// Scores a hypothetical action against the current game state without
/// advancing the engine. The result is the training label for that action
/// and is reproducible bit-for-bit from its inputs.
pub struct RewardModel {
    grid: Grid,
    encoder: StateEncoder,
}

impl RewardModel {
    pub fn new(grid: Grid, view_distance: usize) -> Self {
        Self {
            grid,
            encoder: StateEncoder::new(grid, view_distance),
        }
    }

    /// Base term from the action's ray group (no reverse-heading mask here):
    /// every ray false means certain death within the lookahead, otherwise a
    /// flat living cost. On top of that, half a point per food flag aligned
    /// with the action, and the full food bonus when the move lands exactly
    /// on the food cell.
    pub fn score(&self, action: Action, snake: &VecDeque<Position>, food: Position) -> f32 {
        let head = *snake.front().expect("snake is never empty");

        let rays = self.encoder.ray_group(snake, action.direction());
        let mut score = if rays.iter().all(|&safe| !safe) {
            DOOMED_PENALTY
        } else {
            STEP_COST
        };

        let flags = StateEncoder::food_flags(head, food);
        for index in Self::aligned_flag_indices(action) {
            if flags[index] {
                score += ALIGNMENT_BONUS;
            }
        }

        if head.offset(action.direction(), self.grid.cell_size()) == food {
            score += FOOD_EATEN_BONUS;
        }

        score
    }

    /// The direct flag for the action's direction plus the two diagonal
    /// flags that contain it, as indices into the food-flag array.
    fn aligned_flag_indices(action: Action) -> [usize; 3] {
        match action {
            Action::Up => [0, 4, 5],
            Action::Right => [1, 4, 6],
            Action::Down => [2, 6, 7],
            Action::Left => [3, 5, 7],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snake(cells: &[(i32, i32)]) -> VecDeque<Position> {
        cells.iter().map(|&(x, y)| Position::new(x, y)).collect()
    }

    fn model() -> RewardModel {
        RewardModel::new(Grid::default(), 3)
    }

    #[test]
    fn test_doomed_direction_scores_minus_hundred() {
        // head against the left wall: all three Left ray cells are out of
        // bounds; food far to the right keeps every Left flag false
        let score = model().score(
            Action::Left,
            &snake(&[(0, 50), (10, 50), (20, 50)]),
            Position::new(100, 50),
        );

        assert_eq!(score, -100.0);
    }

    #[test]
    fn test_unaligned_open_direction_costs_one_step() {
        // food is straight down, so moving up earns no alignment bonus
        let score = model().score(
            Action::Up,
            &snake(&[(50, 50), (40, 50), (30, 50)]),
            Position::new(50, 100),
        );

        assert_eq!(score, -1.0);
    }

    #[test]
    fn test_alignment_bonus_per_matching_flag() {
        // food up-right of the head: moving up matches the direct up flag
        // and the up-right diagonal
        let score = model().score(
            Action::Up,
            &snake(&[(50, 50), (40, 50), (30, 50)]),
            Position::new(80, 20),
        );

        assert_eq!(score, -1.0 + 0.5 + 0.5);
    }

    #[test]
    fn test_landing_on_food_earns_the_eaten_bonus() {
        // food one cell to the right: step cost, direct right flag, food bonus
        let score = model().score(
            Action::Right,
            &snake(&[(50, 50), (40, 50), (30, 50)]),
            Position::new(60, 50),
        );

        assert_eq!(score, -1.0 + 0.5 + 100.0);
    }

    #[test]
    fn test_doomed_ignores_unaligned_food() {
        let score = model().score(
            Action::Up,
            &snake(&[(50, 0), (50, 10), (50, 20)]),
            Position::new(50, 30),
        );

        // all Up rays out of bounds, food is below: -100 and nothing else
        assert_eq!(score, -100.0);
    }

    #[test]
    fn test_doomed_and_eaten_bonuses_combine() {
        // a head listed in its own body blanks every ray, but the food
        // bonus and alignment bonus still apply on top of the penalty
        let score = model().score(
            Action::Right,
            &snake(&[(50, 50), (50, 50)]),
            Position::new(60, 50),
        );

        assert_eq!(score, -100.0 + 0.5 + 100.0);
    }

    #[test]
    fn test_score_is_pure_and_reproducible() {
        let body = snake(&[(50, 50), (40, 50), (30, 50)]);
        let food = Position::new(120, 40);
        let model = model();

        let first = model.score(Action::Right, &body, food);
        let second = model.score(Action::Right, &body, food);

        assert_eq!(first, second);
        // the inputs are untouched
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn test_score_does_not_depend_on_heading_mask() {
        // the ray group is evaluated unmasked, so scoring the direction
        // opposite the heading still sees the real geometry
        let score = model().score(
            Action::Left,
            &snake(&[(50, 50), (40, 50), (30, 50)]),
            Position::new(200, 200),
        );

        // Left rays are in bounds and read safe under the head-occupancy test
        assert_eq!(score, -1.0);
    }
}
