use crate::board::HabitBoard;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub board: Arc<Mutex<HabitBoard>>,
}

impl AppState {
    pub fn new(board: HabitBoard) -> Self {
        Self {
            board: Arc::new(Mutex::new(board)),
        }
    }
}
