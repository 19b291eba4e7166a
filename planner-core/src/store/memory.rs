//! In-process reference store.
//!
//! Behaves like the hosted store for the commands the planner issues:
//! generates `id`/`created_at` on insert, defaults `event_date` for events,
//! and honours filters and ordering. Failures can be injected per command
//! and collection so optimistic behaviour can be exercised.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PlannerError, PlannerResult};
use crate::store::RemoteStore;
use crate::store::protocol::{
    Collection, Command, Delete, Insert, InsertMany, Order, Record, Request, Select, Update,
};

#[derive(Default)]
struct Tables {
    rows: HashMap<Collection, Vec<Record>>,
    failing: HashSet<(Command, Collection)>,
    offline: bool,
    omit_inserted_rows: bool,
    executed: Vec<(Command, Collection)>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means a panicking test thread; the rows are still usable
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert rows directly, bypassing id generation.
    pub fn seed<T: Serialize>(&self, collection: Collection, rows: &[T]) -> PlannerResult<()> {
        let mut tables = self.tables();
        let table = tables.rows.entry(collection).or_default();
        for row in rows {
            match serde_json::to_value(row)? {
                Value::Object(record) => table.push(record),
                other => {
                    return Err(PlannerError::Serialization(format!(
                        "Expected an object row, got {}",
                        other
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn rows(&self, collection: Collection) -> Vec<Record> {
        self.tables()
            .rows
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn rows_as<T: DeserializeOwned>(&self, collection: Collection) -> PlannerResult<Vec<T>> {
        self.rows(collection)
            .into_iter()
            .map(|r| serde_json::from_value(Value::Object(r)).map_err(PlannerError::from))
            .collect()
    }

    /// Make every `command` against `collection` fail until cleared.
    pub fn fail(&self, command: Command, collection: Collection) {
        self.tables().failing.insert((command, collection));
    }

    /// Make every command fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.tables().offline = offline;
    }

    /// Acknowledge single inserts without returning the inserted row.
    pub fn omit_inserted_rows(&self, omit: bool) {
        self.tables().omit_inserted_rows = omit;
    }

    /// Commands executed so far, in order, including failed ones.
    pub fn executed(&self) -> Vec<(Command, Collection)> {
        self.tables().executed.clone()
    }

    fn run(&self, request: &Request) -> PlannerResult<Value> {
        let collection: Collection = request
            .params
            .get("collection")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| PlannerError::Store("Request without collection".into()))?;

        let mut tables = self.tables();
        tables.executed.push((request.command, collection));

        if tables.offline || tables.failing.contains(&(request.command, collection)) {
            return Err(PlannerError::Store(format!(
                "{:?} on '{}' rejected",
                request.command, collection
            )));
        }

        match request.command {
            Command::Select => {
                let select: Select = request.params()?;
                let mut rows: Vec<Record> = tables
                    .rows
                    .get(&collection)
                    .map(|rows| {
                        rows.iter()
                            .filter(|r| select.filter.matches(r))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                if let Some(order) = &select.order {
                    rows.sort_by(|a, b| compare_by(order, a, b));
                }
                Ok(serde_json::to_value(rows)?)
            }
            Command::Insert => {
                let insert: Insert = request.params()?;
                let record = complete_record(collection, insert.record);
                tables
                    .rows
                    .entry(collection)
                    .or_default()
                    .push(record.clone());
                if tables.omit_inserted_rows {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Object(record))
                }
            }
            Command::InsertMany => {
                let insert: InsertMany = request.params()?;
                let completed: Vec<Record> = insert
                    .records
                    .into_iter()
                    .map(|r| complete_record(collection, r))
                    .collect();
                tables.rows.entry(collection).or_default().extend(completed);
                Ok(Value::Null)
            }
            Command::Update => {
                let update: Update = request.params()?;
                if let Some(rows) = tables.rows.get_mut(&collection) {
                    for row in rows.iter_mut().filter(|r| update.filter.matches(r)) {
                        for (key, value) in &update.patch {
                            row.insert(key.clone(), value.clone());
                        }
                    }
                }
                Ok(Value::Null)
            }
            Command::Delete => {
                let delete: Delete = request.params()?;
                if let Some(rows) = tables.rows.get_mut(&collection) {
                    rows.retain(|r| !delete.filter.matches(r));
                }
                Ok(Value::Null)
            }
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn execute(&self, request: Request) -> PlannerResult<Value> {
        self.run(&request)
    }
}

/// Fill in the columns the hosted store generates.
fn complete_record(collection: Collection, mut record: Record) -> Record {
    let now = Utc::now();
    record
        .entry("id")
        .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
    if collection != Collection::EventAttendees {
        record.entry("created_at").or_insert_with(|| {
            Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true))
        });
    }
    if collection == Collection::Events {
        record
            .entry("event_date")
            .or_insert_with(|| Value::String(now.date_naive().format("%Y-%m-%d").to_string()));
    }
    record
}

fn compare_by(order: &Order, a: &Record, b: &Record) -> Ordering {
    let ordering = match (a.get(&order.column), b.get(&order.column)) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        // Rows missing the column sort first, like NULLS FIRST
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    };
    if order.ascending {
        ordering
    } else {
        ordering.reverse()
    }
}
