//! Typed commands understood by a remote store.
//!
//! Every command serializes to the `params` of a [`Request`]; its
//! associated `Response` is what the store's JSON answer deserializes into.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;

/// A row as exchanged with the store.
pub type Record = serde_json::Map<String, Value>;

pub trait StoreCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Select,
    Insert,
    InsertMany,
    Update,
    Delete,
}

/// Named collections in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Guests,
    Events,
    EventAttendees,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Guests => "guests",
            Collection::Events => "events",
            Collection::EventAttendees => "event_attendees",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Column equality test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub value: Value,
}

/// Conjunction of column equality tests. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(pub Vec<Condition>);

impl Filter {
    pub fn all() -> Self {
        Filter::default()
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::all().and_eq(column, value)
    }

    pub fn and_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.push(Condition {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.0
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.0
            .iter()
            .all(|c| record.get(&c.column).is_some_and(|v| *v == c.value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: &str) -> Self {
        Order {
            column: column.to_string(),
            ascending: true,
        }
    }
}

/// Raw request handed to a store implementation.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    /// Deserialize the params back into the command they came from.
    pub fn params<C: DeserializeOwned>(&self) -> serde_json::Result<C> {
        serde_json::from_value(self.params.clone())
    }
}

/// Read rows, optionally filtered and ordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Select {
    pub collection: Collection,
    #[serde(default)]
    pub filter: Filter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

impl StoreCommand for Select {
    type Response = Vec<Record>;
    fn command() -> Command {
        Command::Select
    }
}

/// Insert one row and return it with store-generated columns filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insert {
    pub collection: Collection,
    pub record: Record,
}

impl StoreCommand for Insert {
    // A store may acknowledge an insert without returning the row
    type Response = Option<Record>;
    fn command() -> Command {
        Command::Insert
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertMany {
    pub collection: Collection,
    pub records: Vec<Record>,
}

impl StoreCommand for InsertMany {
    type Response = ();
    fn command() -> Command {
        Command::InsertMany
    }
}

/// Apply `patch` to every row matching `filter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub collection: Collection,
    pub patch: Record,
    pub filter: Filter,
}

impl StoreCommand for Update {
    type Response = ();
    fn command() -> Command {
        Command::Update
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delete {
    pub collection: Collection,
    pub filter: Filter,
}

impl StoreCommand for Delete {
    type Response = ();
    fn command() -> Command {
        Command::Delete
    }
}
