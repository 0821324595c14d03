use crate::errors::AppError;
use crate::models::{
    BoardView, DeleteQuery, DisplayHabit, HabitForm, HabitId, HistoryView, ValueRequest,
};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let board = state.board.lock().await;
    Html(render_index(&board.view()))
}

pub async fn get_board(State(state): State<AppState>) -> Json<BoardView> {
    let board = state.board.lock().await;
    Json(board.view())
}

pub async fn reload(State(state): State<AppState>) -> Result<Json<BoardView>, AppError> {
    let mut board = state.board.lock().await;
    board.load().await?;
    Ok(Json(board.view()))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(form): Json<HabitForm>,
) -> Result<(StatusCode, Json<BoardView>), AppError> {
    let mut board = state.board.lock().await;
    board.add_habit(form).await?;
    Ok((StatusCode::CREATED, Json(board.view())))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<BoardView>, AppError> {
    let mut board = state.board.lock().await;
    board.delete_habit(HabitId(id), query.confirmed.into()).await?;
    Ok(Json(board.view()))
}

/// Responds as soon as the row shows the new value; the store write keeps
/// running after the response is sent.
pub async fn record_value(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ValueRequest>,
) -> Result<Json<DisplayHabit>, AppError> {
    let id = HabitId(id);
    let mut board = state.board.lock().await;
    if board.row(id).is_none() {
        return Err(AppError::not_found(format!("no habit with id {id}")));
    }

    let _pending = board.record_value(id, &payload.value);
    board
        .row(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("no habit with id {id}")))
}

pub async fn toggle_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<HistoryView>, AppError> {
    let id = HabitId(id);
    let mut board = state.board.lock().await;
    if board.row(id).is_none() {
        return Err(AppError::not_found(format!("no habit with id {id}")));
    }

    board.toggle_history(id).await;
    Ok(Json(board.history_view()))
}
