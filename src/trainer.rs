use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::ValueEstimator;
use crate::game::GameEngine;
use crate::reward::RewardModel;
use crate::state::{FOOD_FLAG_COUNT, StateEncoder};

/// What a run should do. Anything other than the literal "TRAIN" selects
/// evaluation, without complaint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Train,
    Evaluate,
}

impl Mode {
    pub fn from_arg(arg: &str) -> Mode {
        match arg {
            "TRAIN" => Mode::Train,
            _ => Mode::Evaluate,
        }
    }
}

/// Run parameters with their stock values. Everything the loops tune on
/// lives here rather than in scattered constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Number of training episodes. Default: 5000
    pub episodes: usize,

    /// Exploration rate at the start of the whole run. Default: 0.9
    pub epsilon_start: f32,

    /// Subtracted after every transition, across episode boundaries, with no
    /// floor. Long runs drive epsilon negative and the policy goes fully
    /// greedy for the remainder. Default: 0.001
    pub epsilon_step: f32,

    /// Weight of the best next-state value in the one-step target.
    /// Default: 0.9
    pub discount: f32,

    /// An episode whose accumulated reward falls below this is force-ended
    /// and counts as a normal terminal. Default: -500
    pub stuck_threshold: f32,

    /// Lookahead cells per compass direction in the encoding. Default: 3
    pub view_distance: usize,

    /// Width of the two hidden layers. Default: 150
    pub hidden_width: usize,

    /// SGD step size. Default: 0.001
    pub learning_rate: f32,

    /// Number of evaluation episodes. Default: 100
    pub eval_episodes: usize,

    /// Optional pause between evaluation steps so a viewer can follow along.
    /// Default: None
    pub eval_step_delay: Option<Duration>,

    /// Where the approximator's parameters are saved and loaded.
    pub network_path: PathBuf,

    /// Optional CSV log of per-episode training statistics.
    pub stats_path: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            episodes: 5000,
            epsilon_start: 0.9,
            epsilon_step: 0.001,
            discount: 0.9,
            stuck_threshold: -500.0,
            view_distance: 3,
            hidden_width: 150,
            learning_rate: 0.001,
            eval_episodes: 100,
            eval_step_delay: None,
            network_path: PathBuf::from("trained_network.bin"),
            stats_path: None,
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input width of the encoder and the approximator for this config.
    pub fn state_len(&self) -> usize {
        4 * self.view_distance.max(1) + FOOD_FLAG_COUNT
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.episodes == 0 {
            return Err("episodes must be at least 1".to_string());
        }
        if self.eval_episodes == 0 {
            return Err("eval_episodes must be at least 1".to_string());
        }
        if self.view_distance == 0 {
            return Err("view_distance must be at least 1".to_string());
        }
        if self.hidden_width == 0 {
            return Err("hidden_width must be at least 1".to_string());
        }
        if self.learning_rate <= 0.0 {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(format!("discount must be in [0, 1], got {}", self.discount));
        }
        if self.epsilon_step < 0.0 {
            return Err(format!(
                "epsilon_step must be non-negative, got {}",
                self.epsilon_step
            ));
        }
        if self.stuck_threshold >= 0.0 {
            return Err(format!(
                "stuck_threshold must be negative, got {}",
                self.stuck_threshold
            ));
        }
        Ok(())
    }
}

/// One CSV row per training episode.
#[derive(Clone, Debug, Serialize)]
pub struct EpisodeRecord {
    pub episode: usize,
    pub reward: f32,
    pub snake_length: usize,
    pub epsilon: f32,
}

/// Outcome of a whole run.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub episodes_completed: usize,
    pub max_snake_length: usize,
}

/// Shared flag for stopping a run between steps.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Run the training loop to completion (or cancellation), then persist the
/// approximator. The engine sits behind a lock so a viewer can read
/// consistent snapshots between transitions; this loop is the only writer.
pub fn train(
    engine: &Mutex<GameEngine>,
    estimator: &mut ValueEstimator,
    config: &TrainerConfig,
    cancel: &CancelToken,
) -> RunReport {
    let grid = engine.lock().unwrap().grid();
    let encoder = StateEncoder::new(grid, config.view_distance);
    let rewards = RewardModel::new(grid, config.view_distance);

    let mut stats = open_stats_writer(config);

    // epsilon lives for the whole run and decays through episode boundaries
    let mut epsilon = config.epsilon_start;
    let mut max_snake_length = 0;
    let mut episodes_completed = 0;

    'episodes: for episode in 1..=config.episodes {
        {
            engine.lock().unwrap().reset();
        }
        let mut state = {
            let eng = engine.lock().unwrap();
            encoder.encode(eng.snake(), eng.heading(), eng.food())
        };
        let mut episode_reward = 0.0_f32;

        loop {
            if cancel.is_cancelled() {
                break 'episodes;
            }

            let next_state;
            let action;
            let reward;
            {
                let mut eng = engine.lock().unwrap();
                if !eng.is_alive() {
                    break;
                }
                if episode_reward < config.stuck_threshold {
                    eng.force_end();
                    break;
                }

                action = estimator.epsilon_greedy(&state, epsilon);
                epsilon -= config.epsilon_step;

                // score against the pre-move state, then commit the move
                reward = rewards.score(action, eng.snake(), eng.food());
                eng.step(action);
                next_state = encoder.encode(eng.snake(), eng.heading(), eng.food());
            }

            estimator.update(&state, action, reward, &next_state);
            state = next_state;
            episode_reward += reward;
        }

        let snake_length = engine.lock().unwrap().snake_length();
        if snake_length > max_snake_length {
            max_snake_length = snake_length;
        }
        episodes_completed = episode;

        println!(
            "Episode: {}, Total Reward: {}, Snake Length: {}, Epsilon: {:.4}",
            episode, episode_reward, snake_length, epsilon
        );

        if let Some(writer) = stats.as_mut() {
            let record = EpisodeRecord {
                episode,
                reward: episode_reward,
                snake_length,
                epsilon,
            };
            if let Err(e) = writer.serialize(&record) {
                eprintln!("failed to append stats record: {}", e);
            }
        }
    }

    if let Some(writer) = stats.as_mut() {
        if let Err(e) = writer.flush() {
            eprintln!("failed to flush stats log: {}", e);
        }
    }

    match estimator.save(&config.network_path) {
        Ok(()) => println!("saved trained network to {}", config.network_path.display()),
        Err(e) => eprintln!("failed to save network: {}", e),
    }

    RunReport {
        episodes_completed,
        max_snake_length,
    }
}

/// Run greedy episodes against the current approximator. No table or
/// network updates happen here; the score of an episode is the final snake
/// length.
pub fn evaluate(
    engine: &Mutex<GameEngine>,
    estimator: &mut ValueEstimator,
    config: &TrainerConfig,
    cancel: &CancelToken,
) -> RunReport {
    let grid = engine.lock().unwrap().grid();
    let encoder = StateEncoder::new(grid, config.view_distance);

    let mut max_snake_length = 0;
    let mut episodes_completed = 0;

    'episodes: for episode in 1..=config.eval_episodes {
        {
            engine.lock().unwrap().reset();
        }
        let mut state = {
            let eng = engine.lock().unwrap();
            encoder.encode(eng.snake(), eng.heading(), eng.food())
        };

        loop {
            if cancel.is_cancelled() {
                break 'episodes;
            }

            {
                let mut eng = engine.lock().unwrap();
                if !eng.is_alive() {
                    break;
                }

                let action = estimator.greedy_action(&state);
                eng.step(action);
                state = encoder.encode(eng.snake(), eng.heading(), eng.food());
            }

            if let Some(delay) = config.eval_step_delay {
                thread::sleep(delay);
            }
        }

        let snake_length = engine.lock().unwrap().snake_length();
        if snake_length > max_snake_length {
            max_snake_length = snake_length;
        }
        episodes_completed = episode;

        println!("Session: {}, Snake Length: {}", episode, snake_length);
    }

    println!("Highest snake length reached: {}", max_snake_length);

    RunReport {
        episodes_completed,
        max_snake_length,
    }
}

fn open_stats_writer(config: &TrainerConfig) -> Option<csv::Writer<std::fs::File>> {
    let path = config.stats_path.as_ref()?;
    match csv::Writer::from_path(path) {
        Ok(writer) => Some(writer),
        Err(e) => {
            eprintln!("failed to open stats log {}: {}", path.display(), e);
            None
        }
    }
}

/// A running background worker. Cancellation is checked at step boundaries;
/// the completion channel can be polled from a render loop or awaited with
/// `join`.
pub struct WorkerHandle {
    cancel: CancelToken,
    done: mpsc::Receiver<RunReport>,
    thread: thread::JoinHandle<()>,
    report: Option<RunReport>,
}

impl WorkerHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Non-blocking completion check.
    pub fn try_report(&mut self) -> Option<&RunReport> {
        if self.report.is_none() {
            if let Ok(report) = self.done.try_recv() {
                self.report = Some(report);
            }
        }
        self.report.as_ref()
    }

    /// Wait for the run to finish. Returns None if the worker died without
    /// reporting.
    pub fn join(mut self) -> Option<RunReport> {
        let report = self.report.take().or_else(|| self.done.recv().ok());
        let _ = self.thread.join();
        report
    }
}

/// Spawn the single background worker that owns all engine and estimator
/// mutation for one run. For evaluation the network is restored from the
/// configured path; if that fails the run proceeds on a fresh network.
pub fn spawn_worker(
    mode: Mode,
    engine: Arc<Mutex<GameEngine>>,
    config: TrainerConfig,
) -> WorkerHandle {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let (tx, rx) = mpsc::channel();

    let thread = thread::spawn(move || {
        let mut estimator = ValueEstimator::new(
            config.state_len(),
            config.hidden_width,
            config.learning_rate,
            config.discount,
        );

        let report = match mode {
            Mode::Train => train(&engine, &mut estimator, &config, &token),
            Mode::Evaluate => {
                if let Err(e) = estimator.load_network(&config.network_path) {
                    eprintln!(
                        "could not load network from {}, evaluating a fresh one: {}",
                        config.network_path.display(),
                        e
                    );
                }
                evaluate(&engine, &mut estimator, &config, &token)
            }
        };

        let _ = tx.send(report);
    });

    WorkerHandle {
        cancel,
        done: rx,
        thread,
        report: None,
    }
}
