use crate::errors::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(pub i64);

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub i64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub goal: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub id: LogId,
    pub habit_id: HabitId,
    pub log_date: NaiveDate,
    #[serde(default)]
    pub value: i64,
}

/// Raw habit inputs as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HabitForm {
    pub name: String,
    pub category: String,
    pub goal: String,
}

impl HabitForm {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A validated habit ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewHabit {
    pub name: String,
    pub category: String,
    pub goal: Option<i64>,
}

impl TryFrom<&HabitForm> for NewHabit {
    type Error = ValidationError;

    fn try_from(form: &HabitForm) -> Result<Self, Self::Error> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let category = match form.category.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            other => other.to_string(),
        };

        Ok(Self {
            name: name.to_string(),
            category,
            goal: parse_int_prefix(&form.goal).filter(|goal| *goal > 0),
        })
    }
}

/// A habit joined with today's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayHabit {
    pub id: HabitId,
    pub name: String,
    pub category: String,
    pub goal: Option<i64>,
    pub value: i64,
}

impl DisplayHabit {
    pub fn new(habit: &Habit, value: i64) -> Self {
        Self {
            id: habit.id,
            name: habit.name.clone(),
            category: habit.category.clone(),
            goal: habit.goal,
            value,
        }
    }
}

/// Parses an optional sign followed by leading digits, ignoring whatever
/// trails them. Returns `None` when no digits lead the input.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Coerces user input into a log value; anything unparseable becomes 0.
pub fn value_from_input(raw: &serde_json::Value) -> i64 {
    match raw {
        serde_json::Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
            .unwrap_or(0),
        serde_json::Value::String(text) => parse_int_prefix(text).unwrap_or(0),
        _ => 0,
    }
}

#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Loading,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub action: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPoint {
    pub date: NaiveDate,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryView {
    pub expanded: Option<HabitId>,
    pub history: Vec<DailyLog>,
    pub week_total: i64,
    pub days: Vec<DayPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    pub phase: Phase,
    pub today: NaiveDate,
    pub habits: Vec<DisplayHabit>,
    pub draft: HabitForm,
    pub expanded: Option<HabitId>,
    pub history: Vec<DailyLog>,
    pub week_total: i64,
    pub notice: Option<Notice>,
}
