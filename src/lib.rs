pub mod game;

pub use game::{Action, Direction, EngineSnapshot, GameEngine, Grid, Position};

pub mod state;

pub use state::{EncodedState, StateEncoder};

pub mod reward;

pub use reward::RewardModel;

pub mod nn;

pub use nn::Network;
pub use nn::layer::{Dense, Layer, ReLU};
pub use nn::loss::{Loss, MeanSquaredError};
pub use nn::optimizer::{Optimizer, SGD};
pub use nn::tensor::Tensor;

pub mod agent;

pub use agent::ValueEstimator;
pub use agent::qtable::QTable;

pub mod trainer;

pub use trainer::{
    CancelToken, Mode, RunReport, TrainerConfig, WorkerHandle, evaluate, spawn_worker, train,
};
