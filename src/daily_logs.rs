use crate::errors::StoreError;
use crate::gateway::{from_row, from_rows, Direction, Gateway, Predicate, Query, Row, Table};
use crate::models::{DailyLog, HabitId, LogId};
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Columns forming the natural key of a log.
const NATURAL_KEY: [&str; 2] = ["habit_id", "log_date"];

#[derive(Clone)]
pub struct DailyLogRepository {
    gateway: Arc<dyn Gateway>,
}

impl DailyLogRepository {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<DailyLog>, StoreError> {
        let query = Query::from(Table::DailyLogs).eq("log_date", date.to_string());
        from_rows(self.gateway.select(&query).await?)
    }

    /// Logs for one habit dated on or after `start`, newest first.
    pub async fn list_for_habit_since(
        &self,
        habit_id: HabitId,
        start: NaiveDate,
    ) -> Result<Vec<DailyLog>, StoreError> {
        let query = Query::from(Table::DailyLogs)
            .eq("habit_id", habit_id.0)
            .gte("log_date", start.to_string())
            .order("log_date", Direction::Desc);
        from_rows(self.gateway.select(&query).await?)
    }

    pub async fn find_one(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<Option<DailyLog>, StoreError> {
        let query = Query::from(Table::DailyLogs)
            .eq("habit_id", habit_id.0)
            .eq("log_date", date.to_string());
        let rows = self.gateway.select(&query).await?;
        rows.into_iter().next().map(from_row).transpose()
    }

    /// Overwrites the value of an existing log. `None` when no log has `id`.
    pub async fn update_value(
        &self,
        id: LogId,
        value: i64,
    ) -> Result<Option<DailyLog>, StoreError> {
        let mut patch = Row::new();
        patch.insert("value".into(), Value::from(value));
        let rows = self
            .gateway
            .update(Table::DailyLogs, &[Predicate::Eq("id", id.0.into())], patch)
            .await?;
        rows.into_iter().next().map(from_row).transpose()
    }

    /// Writes `value` as the log for (habit, date) in a single store call,
    /// creating the row the first time.
    pub async fn upsert(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
        value: i64,
    ) -> Result<DailyLog, StoreError> {
        let mut row = Row::new();
        row.insert("habit_id".into(), Value::from(habit_id.0));
        row.insert("log_date".into(), Value::from(date.to_string()));
        row.insert("value".into(), Value::from(value));

        let stored: DailyLog = from_row(
            self.gateway
                .upsert(Table::DailyLogs, row, &NATURAL_KEY)
                .await?,
        )?;
        debug!(habit = %habit_id, date = %date, value, "saved daily log");
        Ok(stored)
    }
}
