use super::{Direction, Gateway, Predicate, Query, Row, Table};
use crate::errors::StoreError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

/// Talks to a PostgREST-style endpoint (`<base>/<table>?column=op.value`).
pub struct RestGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestGateway {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, table: Table) -> String {
        format!("{}/{}", self.base_url, table.name())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<Row>, StoreError> {
        let response = self.authorize(request).send().await?;
        read_rows(response).await
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        debug!(table = query.table.name(), "select");
        let request = self.client.get(self.url(query.table)).query(&select_params(query));
        self.send(request).await
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        debug!(table = table.name(), "insert");
        let request = self
            .client
            .post(self.url(table))
            .header("Prefer", "return=representation")
            .json(&[row]);
        first_row(self.send(request).await?, table)
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Predicate],
        patch: Row,
    ) -> Result<Vec<Row>, StoreError> {
        debug!(table = table.name(), "update");
        let request = self
            .client
            .patch(self.url(table))
            .query(&filter_params(filters))
            .header("Prefer", "return=representation")
            .json(&patch);
        self.send(request).await
    }

    async fn delete(&self, table: Table, filters: &[Predicate]) -> Result<Vec<Row>, StoreError> {
        debug!(table = table.name(), "delete");
        let request = self
            .client
            .delete(self.url(table))
            .query(&filter_params(filters))
            .header("Prefer", "return=representation");
        self.send(request).await
    }

    async fn upsert(
        &self,
        table: Table,
        row: Row,
        conflict: &[&'static str],
    ) -> Result<Row, StoreError> {
        debug!(table = table.name(), "upsert");
        let request = self
            .client
            .post(self.url(table))
            .query(&[("on_conflict", conflict.join(","))])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[row]);
        first_row(self.send(request).await?, table)
    }
}

async fn read_rows(response: Response) -> Result<Vec<Row>, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn first_row(rows: Vec<Row>, table: Table) -> Result<Row, StoreError> {
    rows.into_iter()
        .next()
        .ok_or(StoreError::MissingRow(table.name()))
}

pub fn select_params(query: &Query) -> Vec<(String, String)> {
    let columns = match &query.columns {
        Some(columns) => columns.join(","),
        None => "*".to_string(),
    };

    let mut params = vec![("select".to_string(), columns)];
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order {
        let direction = match order.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    params
}

pub fn filter_params(filters: &[Predicate]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| {
            let condition = match filter {
                Predicate::Eq(_, Value::Null) => "is.null".to_string(),
                Predicate::Eq(_, value) => format!("eq.{}", literal(value)),
                Predicate::Gte(_, value) => format!("gte.{}", literal(value)),
            };
            (filter.column().to_string(), condition)
        })
        .collect()
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(params: &[(String, String)]) -> Vec<(&str, &str)> {
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn select_params_render_history_query() {
        let query = Query::from(Table::DailyLogs)
            .eq("habit_id", 7)
            .gte("log_date", "2026-01-01")
            .order("log_date", Direction::Desc);

        assert_eq!(
            pairs(&select_params(&query)),
            vec![
                ("select", "*"),
                ("habit_id", "eq.7"),
                ("log_date", "gte.2026-01-01"),
                ("order", "log_date.desc"),
            ]
        );
    }

    #[test]
    fn select_params_project_columns() {
        let query = Query::from(Table::Habits)
            .columns(&["id", "name"])
            .order("created_at", Direction::Asc);
        assert_eq!(
            pairs(&select_params(&query)),
            vec![("select", "id,name"), ("order", "created_at.asc")]
        );
    }

    #[test]
    fn null_equality_uses_is_operator() {
        let params = filter_params(&[Predicate::Eq("goal", Value::Null)]);
        assert_eq!(pairs(&params), vec![("goal", "is.null")]);
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let gateway = RestGateway::new("http://localhost:3000/rest/v1/", None);
        assert_eq!(gateway.url(Table::Habits), "http://localhost:3000/rest/v1/habits");
    }
}
