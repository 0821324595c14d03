use super::{compare, Direction, Gateway, Predicate, Query, Row, Table};
use crate::errors::StoreError;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TableData {
    next_id: i64,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreData {
    habits: TableData,
    daily_logs: TableData,
}

impl StoreData {
    fn table(&self, table: Table) -> &TableData {
        match table {
            Table::Habits => &self.habits,
            Table::DailyLogs => &self.daily_logs,
        }
    }

    fn table_mut(&mut self, table: Table) -> &mut TableData {
        match table {
            Table::Habits => &mut self.habits,
            Table::DailyLogs => &mut self.daily_logs,
        }
    }

    /// Fails when `row` names a parent row that does not exist.
    fn check_references(&self, table: Table, row: &Row) -> Result<(), StoreError> {
        for (column, parent) in table.references() {
            let Some(value) = row.get(*column) else {
                continue;
            };
            let key = Predicate::Eq("id", value.clone());
            if !self.table(*parent).rows.iter().any(|candidate| key.matches(candidate)) {
                return Err(StoreError::MissingReference {
                    table: table.name(),
                    column: *column,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    fn insert(&mut self, table: Table, row: Row) -> Result<Row, StoreError> {
        self.check_references(table, &row)?;
        Ok(self.insert_unchecked(table, row))
    }

    fn insert_unchecked(&mut self, table: Table, mut row: Row) -> Row {
        let data = self.table_mut(table);
        data.next_id += 1;
        row.insert("id".into(), Value::from(data.next_id));
        apply_defaults(table, &mut row);
        data.rows.push(row.clone());
        row
    }

    fn delete(&mut self, table: Table, filters: &[Predicate]) -> Vec<Row> {
        let data = self.table_mut(table);
        let (removed, kept): (Vec<Row>, Vec<Row>) = std::mem::take(&mut data.rows)
            .into_iter()
            .partition(|row| matches_all(filters, row));
        data.rows = kept;

        for (dependent, column) in table.dependents() {
            for row in &removed {
                if let Some(id) = row.get("id") {
                    let cascade = [Predicate::Eq(*column, id.clone())];
                    let gone = self.delete(*dependent, &cascade);
                    debug!(table = dependent.name(), count = gone.len(), "cascaded delete");
                }
            }
        }

        removed
    }
}

/// Both tables held in memory and written to a JSON file after every change.
/// A store without a path keeps everything in memory only.
pub struct FileStore {
    path: Option<PathBuf>,
    data: Mutex<StoreData>,
}

impl FileStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(StoreData::default()),
        }
    }

    /// Opens the store at `path`. A missing file starts empty. A file that
    /// cannot be read or parsed is an error and is left untouched.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let data = load_data(&path).await?;
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// Runs `change` against a copy of the tables and commits it only once the
    /// copy has been written out.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut StoreData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let result = change(&mut next)?;
        if let Some(path) = &self.path {
            persist_data(path, &next).await?;
        }
        *data = next;
        Ok(result)
    }
}

#[async_trait]
impl Gateway for FileStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let data = self.data.lock().await;
        let mut rows: Vec<Row> = data
            .table(query.table)
            .rows
            .iter()
            .filter(|row| matches_all(&query.filters, row))
            .cloned()
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let left = a.get(order.column).unwrap_or(&Value::Null);
                let right = b.get(order.column).unwrap_or(&Value::Null);
                let ordering = compare(left, right).unwrap_or(Ordering::Equal);
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(columns) = &query.columns {
            for row in &mut rows {
                row.retain(|column, _| columns.iter().any(|wanted| *wanted == column.as_str()));
            }
        }

        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        self.mutate(|data| data.insert(table, row)).await
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Predicate],
        patch: Row,
    ) -> Result<Vec<Row>, StoreError> {
        self.mutate(|data| {
            let mut updated = Vec::new();
            for row in &mut data.table_mut(table).rows {
                if matches_all(filters, row) {
                    merge(row, &patch);
                    updated.push(row.clone());
                }
            }
            data.check_references(table, &patch)?;
            Ok(updated)
        })
        .await
    }

    async fn delete(&self, table: Table, filters: &[Predicate]) -> Result<Vec<Row>, StoreError> {
        self.mutate(|data| Ok(data.delete(table, filters))).await
    }

    async fn upsert(
        &self,
        table: Table,
        row: Row,
        conflict: &[&'static str],
    ) -> Result<Row, StoreError> {
        let key: Vec<Predicate> = conflict
            .iter()
            .map(|column| Predicate::Eq(*column, row.get(*column).cloned().unwrap_or(Value::Null)))
            .collect();

        self.mutate(|data| {
            data.check_references(table, &row)?;
            let existing = data
                .table_mut(table)
                .rows
                .iter_mut()
                .find(|candidate| matches_all(&key, candidate));
            match existing {
                Some(existing) => {
                    merge(existing, &row);
                    Ok(existing.clone())
                }
                None => Ok(data.insert_unchecked(table, row)),
            }
        })
        .await
    }
}

fn matches_all(filters: &[Predicate], row: &Row) -> bool {
    filters.iter().all(|filter| filter.matches(row))
}

fn merge(row: &mut Row, patch: &Row) {
    for (column, value) in patch {
        if column != "id" {
            row.insert(column.clone(), value.clone());
        }
    }
}

fn apply_defaults(table: Table, row: &mut Row) {
    match table {
        Table::Habits => {
            row.entry("created_at").or_insert_with(|| {
                Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
            });
        }
        Table::DailyLogs => {
            row.entry("value").or_insert_with(|| Value::from(0));
        }
    }
}

async fn load_data(path: &Path) -> Result<StoreData, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
            error!("failed to parse store file {}: {err}", path.display());
            StoreError::Decode(err)
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StoreData::default()),
        Err(err) => {
            error!("failed to read store file {}: {err}", path.display());
            Err(StoreError::Io(err))
        }
    }
}

async fn persist_data(path: &Path, data: &StoreData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    fs::write(path, payload).await?;
    Ok(())
}
