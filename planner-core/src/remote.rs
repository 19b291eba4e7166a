//! Typed access to the `guests`, `events` and `event_attendees` collections.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PlannerError, PlannerResult};
use crate::model::{
    Event, EventAttendee, EventFields, EventId, Guest, GuestId, NewAttendee, NewGuest,
};
use crate::store::Store;
use crate::store::protocol::{
    Collection, Delete, Filter, Insert, InsertMany, Order, Record, Select, Update,
};

const CREATED_AT: &str = "created_at";

/// A remote write, described before it is performed.
///
/// Mutations on the local projection produce these; the synchronizer hands
/// them to [`Remote::apply`] without waiting for the outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEffect {
    SetAttendance {
        event_id: EventId,
        guest_id: GuestId,
        is_attending: bool,
    },
    SetEventCost {
        event_id: EventId,
        total_cost: f64,
    },
    InsertAttendees(Vec<NewAttendee>),
    RenameGuest {
        guest_id: GuestId,
        name: String,
    },
    DeleteGuestAttendance(GuestId),
    DeleteGuest(GuestId),
    UpdateEvent {
        event_id: EventId,
        fields: EventFields,
    },
    DeleteEventAttendance(EventId),
    DeleteEvent(EventId),
}

impl RemoteEffect {
    pub fn collection(&self) -> Collection {
        match self {
            RemoteEffect::SetAttendance { .. }
            | RemoteEffect::InsertAttendees(_)
            | RemoteEffect::DeleteGuestAttendance(_)
            | RemoteEffect::DeleteEventAttendance(_) => Collection::EventAttendees,
            RemoteEffect::RenameGuest { .. } | RemoteEffect::DeleteGuest(_) => Collection::Guests,
            RemoteEffect::SetEventCost { .. }
            | RemoteEffect::UpdateEvent { .. }
            | RemoteEffect::DeleteEvent(_) => Collection::Events,
        }
    }

    /// An effect that would send nothing, such as a bulk insert of no rows.
    pub fn is_noop(&self) -> bool {
        matches!(self, RemoteEffect::InsertAttendees(rows) if rows.is_empty())
    }
}

#[derive(Clone)]
pub struct Remote {
    store: Store,
}

impl Remote {
    pub fn new(store: Store) -> Self {
        Remote { store }
    }

    pub async fn guests(&self) -> PlannerResult<Vec<Guest>> {
        self.select(Collection::Guests, Some(Order::asc(CREATED_AT)))
            .await
    }

    pub async fn events(&self) -> PlannerResult<Vec<Event>> {
        self.select(Collection::Events, Some(Order::asc(CREATED_AT)))
            .await
    }

    pub async fn attendees(&self) -> PlannerResult<Vec<EventAttendee>> {
        self.select(Collection::EventAttendees, None).await
    }

    pub async fn create_guest(&self, guest: &NewGuest) -> PlannerResult<Guest> {
        self.insert(Collection::Guests, guest).await
    }

    pub async fn create_event(&self, fields: &EventFields) -> PlannerResult<Event> {
        self.insert(Collection::Events, fields).await
    }

    pub async fn apply(&self, effect: &RemoteEffect) -> PlannerResult<()> {
        let collection = effect.collection();

        match effect {
            RemoteEffect::SetAttendance {
                event_id,
                guest_id,
                is_attending,
            } => {
                self.update(
                    collection,
                    patch("is_attending", *is_attending),
                    Filter::eq("event_id", event_id.as_str()).and_eq("guest_id", guest_id.as_str()),
                )
                .await
            }
            RemoteEffect::SetEventCost {
                event_id,
                total_cost,
            } => {
                self.update(
                    collection,
                    patch("total_cost", *total_cost),
                    Filter::eq("id", event_id.as_str()),
                )
                .await
            }
            RemoteEffect::InsertAttendees(_) if effect.is_noop() => Ok(()),
            RemoteEffect::InsertAttendees(rows) => {
                let records = rows.iter().map(to_record).collect::<PlannerResult<Vec<_>>>()?;
                self.store
                    .call(InsertMany {
                        collection,
                        records,
                    })
                    .await
            }
            RemoteEffect::RenameGuest { guest_id, name } => {
                self.update(
                    collection,
                    patch("name", name.as_str()),
                    Filter::eq("id", guest_id.as_str()),
                )
                .await
            }
            RemoteEffect::DeleteGuestAttendance(guest_id) => {
                self.delete(collection, Filter::eq("guest_id", guest_id.as_str()))
                    .await
            }
            RemoteEffect::DeleteGuest(guest_id) => {
                self.delete(collection, Filter::eq("id", guest_id.as_str()))
                    .await
            }
            RemoteEffect::UpdateEvent { event_id, fields } => {
                self.update(
                    collection,
                    to_record(fields)?,
                    Filter::eq("id", event_id.as_str()),
                )
                .await
            }
            RemoteEffect::DeleteEventAttendance(event_id) => {
                self.delete(collection, Filter::eq("event_id", event_id.as_str()))
                    .await
            }
            RemoteEffect::DeleteEvent(event_id) => {
                self.delete(collection, Filter::eq("id", event_id.as_str()))
                    .await
            }
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        collection: Collection,
        order: Option<Order>,
    ) -> PlannerResult<Vec<T>> {
        let rows = self
            .store
            .call(Select {
                collection,
                filter: Filter::all(),
                order,
            })
            .await?;
        rows.into_iter().map(from_record).collect()
    }

    async fn insert<P: Serialize, T: DeserializeOwned>(
        &self,
        collection: Collection,
        payload: &P,
    ) -> PlannerResult<T> {
        let record = to_record(payload)?;
        let inserted = self
            .store
            .call(Insert { collection, record })
            .await?
            .ok_or_else(|| PlannerError::MissingRow(collection.to_string()))?;
        from_record(inserted)
    }

    async fn update(
        &self,
        collection: Collection,
        patch: Record,
        filter: Filter,
    ) -> PlannerResult<()> {
        self.store
            .call(Update {
                collection,
                patch,
                filter,
            })
            .await
    }

    async fn delete(&self, collection: Collection, filter: Filter) -> PlannerResult<()> {
        self.store.call(Delete { collection, filter }).await
    }
}

fn patch(column: &str, value: impl Into<Value>) -> Record {
    let mut record = Record::new();
    record.insert(column.to_string(), value.into());
    record
}

fn to_record<T: Serialize>(value: &T) -> PlannerResult<Record> {
    match serde_json::to_value(value)? {
        Value::Object(record) => Ok(record),
        other => Err(PlannerError::Serialization(format!(
            "Expected an object, got {}",
            other
        ))),
    }
}

fn from_record<T: DeserializeOwned>(record: Record) -> PlannerResult<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}
