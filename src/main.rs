use std::sync::{Arc, Mutex};
use std::time::Duration;

use macroquad::prelude::*;

use snakeq::game::{EngineSnapshot, GameEngine, Grid};
use snakeq::trainer::{Mode, TrainerConfig, spawn_worker};

const SCALE: f32 = 2.0;
const SCORE_AREA_HEIGHT: f32 = 60.0;
const SCORE_TEXT_SIZE: f32 = 40.0;

fn window_conf() -> Conf {
    let grid = Grid::default();
    let game_side = (grid.dimensions() as f32 * SCALE) as i32;
    Conf {
        window_title: "snakeq".to_owned(),
        window_width: game_side,
        window_height: SCORE_AREA_HEIGHT as i32 + game_side,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let mode = Mode::from_arg(&std::env::args().nth(1).unwrap_or_default());

    let mut config = TrainerConfig::default();
    if mode == Mode::Evaluate {
        // slow evaluation down enough to watch
        config.eval_step_delay = Some(Duration::from_millis(20));
    }

    let engine = Arc::new(Mutex::new(GameEngine::new(Grid::default())));
    let mut worker = spawn_worker(mode, Arc::clone(&engine), config);

    loop {
        let snapshot = engine.lock().unwrap().snapshot();
        draw(&snapshot);

        if worker.try_report().is_some() {
            break;
        }
        if is_key_pressed(KeyCode::Escape) {
            worker.cancel();
        }

        next_frame().await
    }

    match worker.join() {
        Some(report) => println!(
            "run finished after {} episodes, best snake length {}",
            report.episodes_completed, report.max_snake_length
        ),
        None => eprintln!("worker exited without a report"),
    }
}

fn draw(snapshot: &EngineSnapshot) {
    let screen_w = screen_width();
    let screen_h = screen_height();

    // score area

    let score_area = Rect::new(0.0, 0.0, screen_w, SCORE_AREA_HEIGHT);

    draw_rectangle(
        score_area.x,
        score_area.y,
        score_area.w,
        score_area.h,
        Color::new(0.1, 0.1, 0.2, 1.0),
    );
    draw_line(score_area.x, score_area.h, screen_w, score_area.h, 2.0, BLACK);

    let score_text = format!("Length: {}", snapshot.snake_length);
    let text_dims = measure_text(&score_text, None, SCORE_TEXT_SIZE as u16, 1.0);
    draw_text(
        &score_text,
        score_area.w / 2.0 - text_dims.width / 2.0,
        score_area.y + score_area.h / 2.0 + text_dims.height / 2.0,
        SCORE_TEXT_SIZE,
        WHITE,
    );

    // game area

    let game_area = Rect::new(0.0, score_area.h, screen_w, screen_h - score_area.h);

    let cells = snapshot.grid.cells();
    let cell_width = game_area.w / cells as f32;
    let cell_height = game_area.h / cells as f32;
    let pixels_per_unit_x = game_area.w / snapshot.grid.dimensions() as f32;
    let pixels_per_unit_y = game_area.h / snapshot.grid.dimensions() as f32;
    let grid_line_color = Color::new(0.4, 0.4, 0.4, 0.3);

    for i in 1..cells {
        let x = game_area.x + i as f32 * cell_width;
        draw_line(x, game_area.y, x, game_area.y + game_area.h, 1.0, grid_line_color);

        let y = game_area.y + i as f32 * cell_height;
        draw_line(game_area.x, y, game_area.x + game_area.w, y, 1.0, grid_line_color);
    }

    let cell_fill_border: f32 = 2.0;

    // food

    let food_x = game_area.x + snapshot.food.x as f32 * pixels_per_unit_x;
    let food_y = game_area.y + snapshot.food.y as f32 * pixels_per_unit_y;
    draw_rectangle(
        food_x,
        food_y,
        cell_width - 1.0,
        cell_height - 1.0,
        Color::new(0.5, 0.0, 0.0, 1.0),
    );
    draw_rectangle(
        food_x + cell_fill_border,
        food_y + cell_fill_border,
        (cell_width - 1.0) - cell_fill_border * 2.0,
        (cell_height - 1.0) - cell_fill_border * 2.0,
        RED,
    );

    // snake

    for segment in &snapshot.snake {
        let segment_x = game_area.x + segment.x as f32 * pixels_per_unit_x;
        let segment_y = game_area.y + segment.y as f32 * pixels_per_unit_y;
        draw_rectangle(
            segment_x,
            segment_y,
            cell_width - 1.0,
            cell_height - 1.0,
            DARKGREEN,
        );
        draw_rectangle(
            segment_x + cell_fill_border,
            segment_y + cell_fill_border,
            (cell_width - 1.0) - cell_fill_border * 2.0,
            (cell_height - 1.0) - cell_fill_border * 2.0,
            GREEN,
        );
    }
}
