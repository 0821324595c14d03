//! The habit board: in-memory view state kept in step with the store.
//!
//! Rows are rebuilt from the store on [`HabitBoard::load`] and otherwise only
//! change through the board's own transitions. Value edits are applied
//! locally first and written through on a spawned task; a failed write is
//! logged and the local value stays until the next load.

use crate::daily_logs::DailyLogRepository;
use crate::errors::{BoardError, StoreError};
use crate::gateway::Gateway;
use crate::habits::HabitRepository;
use crate::history::{daily_points, week_total, window_start, Clock};
use crate::models::{
    value_from_input, BoardView, DailyLog, DisplayHabit, HabitForm, HabitId, HistoryView,
    NewHabit, Notice, Phase,
};
use std::collections::HashMap;
use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Accepted,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Accepted
        } else {
            Confirmation::Declined
        }
    }
}

/// Handle to a value write still on its way to the store.
pub type PendingWrite = JoinHandle<Result<DailyLog, StoreError>>;

/// Counts value writes that have been spawned but not finished.
#[derive(Debug, Clone, Default)]
pub struct WriteTracker {
    inner: Arc<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    pending: AtomicUsize,
    idle: Notify,
}

impl WriteTracker {
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    fn start(&self) -> WriteGuard {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        WriteGuard(Arc::clone(&self.inner))
    }

    /// Resolves once no write is in flight.
    pub async fn drain(&self) {
        loop {
            let mut idle = pin!(self.inner.idle.notified());
            idle.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// Marks one write finished when dropped, panics included.
struct WriteGuard(Arc<TrackerState>);

impl Drop for WriteGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Display rows in creation order, keyed by habit id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    rows: Vec<DisplayHabit>,
}

impl DisplayList {
    pub fn as_slice(&self) -> &[DisplayHabit] {
        &self.rows
    }

    pub fn get(&self, id: HabitId) -> Option<&DisplayHabit> {
        self.rows.iter().find(|row| row.id == id)
    }

    fn replace_all(&mut self, rows: Vec<DisplayHabit>) {
        self.rows = rows;
    }

    fn push(&mut self, row: DisplayHabit) {
        self.rows.push(row);
    }

    fn remove(&mut self, id: HabitId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }

    fn set_value(&mut self, id: HabitId, value: i64) -> Option<&DisplayHabit> {
        let row = self.rows.iter_mut().find(|row| row.id == id)?;
        row.value = value;
        Some(row)
    }
}

pub struct HabitBoard {
    habits: HabitRepository,
    logs: DailyLogRepository,
    clock: Arc<dyn Clock>,
    phase: Phase,
    rows: DisplayList,
    draft: HabitForm,
    expanded: Option<HabitId>,
    history: Vec<DailyLog>,
    notice: Option<Notice>,
    writes: WriteTracker,
}

impl HabitBoard {
    pub fn new(habits: HabitRepository, logs: DailyLogRepository, clock: Arc<dyn Clock>) -> Self {
        Self {
            habits,
            logs,
            clock,
            phase: Phase::Loading,
            rows: DisplayList::default(),
            draft: HabitForm::default(),
            expanded: None,
            history: Vec::new(),
            notice: None,
            writes: WriteTracker::default(),
        }
    }

    pub fn with_gateway(gateway: Arc<dyn Gateway>, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            HabitRepository::new(Arc::clone(&gateway)),
            DailyLogRepository::new(gateway),
            clock,
        )
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rows(&self) -> &[DisplayHabit] {
        self.rows.as_slice()
    }

    pub fn row(&self, id: HabitId) -> Option<&DisplayHabit> {
        self.rows.get(id)
    }

    pub fn draft(&self) -> &HabitForm {
        &self.draft
    }

    pub fn expanded(&self) -> Option<HabitId> {
        self.expanded
    }

    pub fn history(&self) -> &[DailyLog] {
        &self.history
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn week_total(&self) -> i64 {
        week_total(&self.history)
    }

    /// Tracker for the background value writes this board has spawned.
    pub fn writes(&self) -> WriteTracker {
        self.writes.clone()
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            phase: self.phase,
            today: self.clock.today(),
            habits: self.rows.as_slice().to_vec(),
            draft: self.draft.clone(),
            expanded: self.expanded,
            history: self.history.clone(),
            week_total: self.week_total(),
            notice: self.notice.clone(),
        }
    }

    pub fn history_view(&self) -> HistoryView {
        HistoryView {
            expanded: self.expanded,
            history: self.history.clone(),
            week_total: self.week_total(),
            days: match self.expanded {
                Some(_) => daily_points(self.clock.today(), &self.history),
                None => Vec::new(),
            },
        }
    }

    /// Fetches habits and today's logs and rebuilds the rows. Nothing is
    /// joined unless both fetches succeed.
    pub async fn load(&mut self) -> Result<(), BoardError> {
        self.notice = None;
        let today = self.clock.today();

        let fetched = async {
            let habits = self.habits.list().await?;
            let logs = self.logs.list_for_date(today).await?;
            Ok::<_, StoreError>((habits, logs))
        }
        .await;

        let result = match fetched {
            Ok((habits, logs)) => {
                let values: HashMap<HabitId, i64> =
                    logs.into_iter().map(|log| (log.habit_id, log.value)).collect();
                let rows = habits
                    .iter()
                    .map(|habit| DisplayHabit::new(habit, values.get(&habit.id).copied().unwrap_or(0)))
                    .collect();
                self.rows.replace_all(rows);
                info!(habits = self.rows.as_slice().len(), %today, "board loaded");
                Ok(())
            }
            Err(err) => {
                let err = BoardError::from(err);
                self.report("load habits", &err);
                if self.phase == Phase::Loading {
                    self.rows.replace_all(Vec::new());
                }
                Err(err)
            }
        };

        self.phase = Phase::Ready;
        result
    }

    /// Shows the new value at once and writes it through in the background.
    pub fn record_value(&mut self, id: HabitId, input: &serde_json::Value) -> PendingWrite {
        let value = value_from_input(input);
        let today = self.clock.today();
        if self.rows.set_value(id, value).is_none() {
            warn!(habit = %id, "recording value for a habit not on the board");
        }

        let logs = self.logs.clone();
        let guard = self.writes.start();
        tokio::spawn(async move {
            let _guard = guard;
            let result = logs.upsert(id, today, value).await;
            if let Err(err) = &result {
                error!(habit = %id, value, "failed to save value: {err}");
            }
            result
        })
    }

    /// Validates and stores `form`. The form stays as the draft when anything
    /// fails and is cleared once the habit is stored.
    pub async fn add_habit(&mut self, form: HabitForm) -> Result<DisplayHabit, BoardError> {
        self.notice = None;
        self.draft = form;

        let outcome = async {
            let new_habit = NewHabit::try_from(&self.draft)?;
            Ok::<_, BoardError>(self.habits.create(&new_habit).await?)
        }
        .await;

        match outcome {
            Ok(habit) => {
                let row = DisplayHabit::new(&habit, 0);
                self.rows.push(row.clone());
                self.draft.clear();
                Ok(row)
            }
            Err(err) => {
                self.report("add habit", &err);
                Err(err)
            }
        }
    }

    /// Deletes a habit once the user has confirmed. Returns whether a row
    /// was removed.
    pub async fn delete_habit(
        &mut self,
        id: HabitId,
        confirmation: Confirmation,
    ) -> Result<bool, BoardError> {
        if confirmation == Confirmation::Declined {
            return Ok(false);
        }
        self.notice = None;

        if let Err(err) = self.habits.delete(id).await {
            let err = BoardError::from(err);
            self.report("delete habit", &err);
            return Err(err);
        }

        if self.expanded == Some(id) {
            self.collapse();
        }
        Ok(self.rows.remove(id))
    }

    /// Collapses the history panel when it already shows `id`, otherwise
    /// loads the trailing window for `id` and expands it. A failed fetch
    /// leaves the panel as it was.
    pub async fn toggle_history(&mut self, id: HabitId) {
        if self.expanded == Some(id) {
            self.collapse();
            return;
        }

        let start = window_start(self.clock.today());
        match self.logs.list_for_habit_since(id, start).await {
            Ok(history) => {
                self.history = history;
                self.expanded = Some(id);
            }
            Err(err) => error!(habit = %id, "failed to load history: {err}"),
        }
    }

    fn collapse(&mut self) {
        self.expanded = None;
        self.history.clear();
    }

    fn report(&mut self, action: &'static str, err: &BoardError) {
        match err {
            BoardError::Validation(_) => warn!(action, "{err}"),
            BoardError::Store(_) => error!(action, "{err}"),
        }
        let message = match err {
            BoardError::Validation(err) => err.to_string(),
            BoardError::Store(_) => format!("Failed to {action}"),
        };
        self.notice = Some(Notice {
            action: action.to_string(),
            message,
        });
    }
}
