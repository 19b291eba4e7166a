//! Collections over PostgREST.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use tracing::debug;
use url::Url;

use planner_core::auth::Session;
use planner_core::store::RemoteStore;
use planner_core::store::protocol::{
    Collection, Command, Delete, Filter, Insert, InsertMany, Record, Request, Select, Update,
};
use planner_core::{PlannerError, PlannerResult};

use crate::endpoint::{Endpoint, error_message};
use crate::query::{filter_pairs, order_pair, with_query};

const RETURN_REPRESENTATION: &str = "return=representation";
const RETURN_MINIMAL: &str = "return=minimal";

pub struct RestStore {
    endpoint: Endpoint,
    access_token: Option<String>,
}

impl RestStore {
    /// Requests run as the session's user, or anonymously without one.
    pub fn new(endpoint: Endpoint, session: Option<&Session>) -> Self {
        RestStore {
            endpoint,
            access_token: session.map(|s| s.access_token.clone()),
        }
    }

    fn collection_url(&self, collection: Collection) -> Url {
        self.endpoint.url(&["rest", "v1", collection.name()])
    }

    pub(crate) fn select_url(&self, select: &Select) -> Url {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(filter_pairs(&select.filter));
        if let Some(order) = &select.order {
            pairs.push(order_pair(order));
        }
        with_query(self.collection_url(select.collection), &pairs)
    }

    fn filtered_url(&self, collection: Collection, filter: &Filter) -> Url {
        with_query(self.collection_url(collection), &filter_pairs(filter))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.endpoint.request(method, url, self.access_token.as_deref())
    }

    async fn send(&self, builder: RequestBuilder) -> PlannerResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| self.endpoint.transport_error(e))?;

        if !response.status().is_success() {
            return Err(PlannerError::Store(error_message(response).await));
        }
        Ok(response)
    }

    async fn select(&self, select: Select) -> PlannerResult<Value> {
        let response = self
            .send(self.request(Method::GET, self.select_url(&select)))
            .await?;
        let rows: Vec<Record> = response
            .json()
            .await
            .map_err(|e| self.endpoint.transport_error(e))?;
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }

    async fn insert(&self, insert: Insert) -> PlannerResult<Value> {
        let builder = self
            .request(Method::POST, self.collection_url(insert.collection))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&insert.record);
        let response = self.send(builder).await?;
        let rows: Vec<Record> = response
            .json()
            .await
            .map_err(|e| self.endpoint.transport_error(e))?;
        Ok(first_row(rows))
    }

    async fn insert_many(&self, insert: InsertMany) -> PlannerResult<Value> {
        let builder = self
            .request(Method::POST, self.collection_url(insert.collection))
            .header("Prefer", RETURN_MINIMAL)
            .json(&insert.records);
        self.send(builder).await?;
        Ok(Value::Null)
    }

    async fn update(&self, update: Update) -> PlannerResult<Value> {
        let builder = self
            .request(
                Method::PATCH,
                self.filtered_url(update.collection, &update.filter),
            )
            .header("Prefer", RETURN_MINIMAL)
            .json(&update.patch);
        self.send(builder).await?;
        Ok(Value::Null)
    }

    async fn delete(&self, delete: Delete) -> PlannerResult<Value> {
        let builder = self.request(
            Method::DELETE,
            self.filtered_url(delete.collection, &delete.filter),
        );
        self.send(builder).await?;
        Ok(Value::Null)
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn execute(&self, request: Request) -> PlannerResult<Value> {
        debug!(command = ?request.command, "store request");
        match request.command {
            Command::Select => self.select(request.params()?).await,
            Command::Insert => self.insert(request.params()?).await,
            Command::InsertMany => self.insert_many(request.params()?).await,
            Command::Update => self.update(request.params()?).await,
            Command::Delete => self.delete(request.params()?).await,
        }
    }
}

/// `return=representation` answers with an array; only the first row counts.
fn first_row(rows: Vec<Record>) -> Value {
    rows.into_iter()
        .next()
        .map(Value::Object)
        .unwrap_or(Value::Null)
}
