use std::collections::VecDeque;

use crate::game::{Direction, Grid, Position};
use crate::nn::tensor::Tensor;

pub const FOOD_FLAG_COUNT: usize = 8;

/// Fixed-length boolean feature vector: one ray-safety group per compass
/// direction followed by eight food-relative flags. Recomputed from scratch
/// every step, never mutated in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedState {
    bits: Vec<bool>,
}

impl EncodedState {
    pub fn new(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// '1'/'0' string in vector order, e.g. [false, true, true, false, true]
    /// becomes "01101". Used as the table key prefix.
    pub fn bitstring(&self) -> String {
        self.bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
    }

    /// 1 x len input row for the approximator.
    pub fn to_tensor(&self) -> Tensor {
        let data: Vec<f32> = self.bits.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect();
        Tensor::from_vec(data, 1, self.bits.len())
    }
}

/// Builds the feature vector for a given snake, heading and food position.
pub struct StateEncoder {
    grid: Grid,
    view_distance: usize,
}

impl StateEncoder {
    /// `view_distance` is how many cells the snake sees along each compass
    /// direction; it is clamped to at least 1.
    pub fn new(grid: Grid, view_distance: usize) -> Self {
        Self {
            grid,
            view_distance: view_distance.max(1),
        }
    }

    pub fn view_distance(&self) -> usize {
        self.view_distance
    }

    pub fn state_len(&self) -> usize {
        4 * self.view_distance + FOOD_FLAG_COUNT
    }

    /// Group order is Up, Right, Down, Left, then the food flags. The group
    /// opposite the current heading is forced all-false: the snake cannot
    /// reverse into itself, so those cells are never an option.
    pub fn encode(
        &self,
        snake: &VecDeque<Position>,
        heading: Direction,
        food: Position,
    ) -> EncodedState {
        let head = *snake.front().expect("snake is never empty");
        let masked = heading.opposite();

        let mut bits = Vec::with_capacity(self.state_len());
        for direction in [Direction::Up, Direction::Right, Direction::Down, Direction::Left] {
            if direction == masked {
                bits.extend(std::iter::repeat(false).take(self.view_distance));
            } else {
                bits.extend(self.ray_group(snake, direction));
            }
        }
        bits.extend(Self::food_flags(head, food));

        EncodedState::new(bits)
    }

    /// Safety bit per ray cell at distance 1..=view_distance. A cell reads
    /// safe iff it is in bounds and the head is absent from the body list.
    /// The occupancy half deliberately tests the head, not the probed cell:
    /// saved networks and every table key are built on exactly this encoding,
    /// so correcting it would invalidate all trained state.
    pub fn ray_group(&self, snake: &VecDeque<Position>, direction: Direction) -> Vec<bool> {
        let head = *snake.front().expect("snake is never empty");
        let head_in_body = snake.iter().skip(1).any(|&p| p == head);

        (1..=self.view_distance)
            .map(|d| {
                let cell = head.offset(direction, self.grid.cell_size() * d as i32);
                self.grid.contains(cell) && !head_in_body
            })
            .collect()
    }

    /// Order: up, right, down, left, up-right, up-left, down-right,
    /// down-left. Strict inequalities, so an equal coordinate on an axis
    /// yields false for both of that axis's signs.
    pub fn food_flags(head: Position, food: Position) -> [bool; FOOD_FLAG_COUNT] {
        let up = food.y < head.y;
        let right = food.x > head.x;
        let down = food.y > head.y;
        let left = food.x < head.x;

        [
            up,
            right,
            down,
            left,
            up && right,
            up && left,
            down && right,
            down && left,
        ]
    }
}
