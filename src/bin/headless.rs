use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use snakeq::game::{GameEngine, Grid};
use snakeq::trainer::{Mode, TrainerConfig, spawn_worker};

fn main() {
    let mode = Mode::from_arg(&std::env::args().nth(1).unwrap_or_default());

    let mut config = TrainerConfig::default();
    if mode == Mode::Train {
        config.stats_path = Some(PathBuf::from("training_stats.csv"));
    }
    if let Err(e) = config.validate() {
        eprintln!("invalid configuration: {}", e);
        std::process::exit(1);
    }

    println!("starting {:?} run", mode);
    let engine = Arc::new(Mutex::new(GameEngine::new(Grid::default())));
    let worker = spawn_worker(mode, engine, config);

    match worker.join() {
        Some(report) => println!(
            "run finished after {} episodes, best snake length {}",
            report.episodes_completed, report.max_snake_length
        ),
        None => eprintln!("worker exited without a report"),
    }
}
