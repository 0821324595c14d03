pub mod app;
pub mod board;
pub mod config;
pub mod daily_logs;
pub mod errors;
pub mod gateway;
pub mod habits;
pub mod handlers;
pub mod history;
pub mod models;
pub mod state;
pub mod ui;

pub use app::router;
pub use board::{Confirmation, HabitBoard};
pub use config::Config;
pub use state::AppState;
