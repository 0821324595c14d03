//! Table-level query interface to the relational store.
//!
//! Repositories talk to the store only through [`Gateway`]: rows travel as
//! JSON objects and are decoded into typed models at the repository edge.

pub mod file;
pub mod rest;

use crate::errors::StoreError;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

pub use file::FileStore;
pub use rest::RestGateway;

pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Habits,
    DailyLogs,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Habits => "habits",
            Table::DailyLogs => "daily_logs",
        }
    }

    /// Tables whose rows reference this one, with the referencing column.
    /// Deleting a row here deletes the referencing rows too.
    pub fn dependents(self) -> &'static [(Table, &'static str)] {
        match self {
            Table::Habits => &[(Table::DailyLogs, "habit_id")],
            Table::DailyLogs => &[],
        }
    }

    /// Columns of this table that must name an existing row of another table.
    pub fn references(self) -> &'static [(&'static str, Table)] {
        match self {
            Table::Habits => &[],
            Table::DailyLogs => &[("habit_id", Table::Habits)],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(&'static str, Value),
    Gte(&'static str, Value),
}

impl Predicate {
    pub fn column(&self) -> &'static str {
        match self {
            Predicate::Eq(column, _) | Predicate::Gte(column, _) => column,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Predicate::Eq(_, expected) => compare(cell, expected) == Some(Ordering::Equal),
            Predicate::Gte(_, bound) => matches!(
                compare(cell, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub columns: Option<Vec<&'static str>>,
    pub filters: Vec<Predicate>,
    pub order: Option<OrderBy>,
}

impl Query {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            columns: None,
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn columns(mut self, columns: &[&'static str]) -> Self {
        self.columns = Some(columns.to_vec());
        self
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push(Predicate::Eq(column, value.into()));
        self
    }

    pub fn gte(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push(Predicate::Gte(column, value.into()));
        self
    }

    pub fn order(mut self, column: &'static str, direction: Direction) -> Self {
        self.order = Some(OrderBy { column, direction });
        self
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Inserts one row and returns it as stored, store-assigned columns included.
    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError>;

    async fn update(
        &self,
        table: Table,
        filters: &[Predicate],
        patch: Row,
    ) -> Result<Vec<Row>, StoreError>;

    async fn delete(&self, table: Table, filters: &[Predicate]) -> Result<Vec<Row>, StoreError>;

    /// Atomically inserts `row`, or merges it into the existing row whose
    /// `conflict` columns carry the same values.
    async fn upsert(
        &self,
        table: Table,
        row: Row,
        conflict: &[&'static str],
    ) -> Result<Row, StoreError>;
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::Decode(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(from_row).collect()
}

/// Orders cells the way a relational store would for the column types used
/// here: numbers numerically, strings lexically. Mixed types don't compare.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
