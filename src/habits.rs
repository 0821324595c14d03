use crate::errors::StoreError;
use crate::gateway::{from_row, from_rows, to_row, Direction, Gateway, Predicate, Query, Table};
use crate::models::{Habit, HabitId, NewHabit};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct HabitRepository {
    gateway: Arc<dyn Gateway>,
}

impl HabitRepository {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// All habits, oldest first.
    pub async fn list(&self) -> Result<Vec<Habit>, StoreError> {
        let query = Query::from(Table::Habits).order("created_at", Direction::Asc);
        from_rows(self.gateway.select(&query).await?)
    }

    pub async fn create(&self, habit: &NewHabit) -> Result<Habit, StoreError> {
        let row = self.gateway.insert(Table::Habits, to_row(habit)?).await?;
        let created: Habit = from_row(row)?;
        info!(id = %created.id, name = %created.name, "created habit");
        Ok(created)
    }

    pub async fn delete(&self, id: HabitId) -> Result<(), StoreError> {
        let removed = self
            .gateway
            .delete(Table::Habits, &[Predicate::Eq("id", id.0.into())])
            .await?;
        info!(id = %id, removed = removed.len(), "deleted habit");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::FileStore;

    fn repo() -> HabitRepository {
        HabitRepository::new(Arc::new(FileStore::in_memory()))
    }

    fn new_habit(name: &str, category: &str, goal: Option<i64>) -> NewHabit {
        NewHabit {
            name: name.to_string(),
            category: category.to_string(),
            goal,
        }
    }

    #[tokio::test]
    async fn created_habit_appears_in_list() {
        let habits = repo();
        let created = habits.create(&new_habit("Water", "Health", Some(8))).await.unwrap();

        let listed = habits.list().await.unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(created.name, "Water");
        assert_eq!(created.category, "Health");
        assert_eq!(created.goal, Some(8));
    }

    #[tokio::test]
    async fn list_is_in_creation_order() {
        let habits = repo();
        for name in ["Water", "Read", "Walk"] {
            habits.create(&new_habit(name, "General", None)).await.unwrap();
        }

        let names: Vec<String> = habits
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|habit| habit.name)
            .collect();
        assert_eq!(names, ["Water", "Read", "Walk"]);
    }

    #[tokio::test]
    async fn deleted_habit_leaves_list() {
        let habits = repo();
        let keep = habits.create(&new_habit("Water", "Health", None)).await.unwrap();
        let gone = habits.create(&new_habit("Read", "Mind", None)).await.unwrap();

        habits.delete(gone.id).await.unwrap();

        let ids: Vec<HabitId> = habits.list().await.unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![keep.id]);
    }
}
