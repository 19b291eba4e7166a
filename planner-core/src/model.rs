//! Planner record types.
//!
//! `Guest`, `Event` and `EventAttendee` mirror the rows of the `guests`,
//! `events` and `event_attendees` collections. `EventWithAttendees` is the
//! view-model built from them and is never persisted.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::AttendanceMap;
use crate::cost;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }
    };
}

record_id!(
    /// Store-assigned guest identifier.
    GuestId
);
record_id!(
    /// Store-assigned event identifier.
    EventId
);
record_id!(AttendeeId);

/// A person on the guest list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub id: GuestId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// An event as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub event_date: NaiveDate,
    pub time: String,
    pub location: String,
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Join row: whether a guest attends an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAttendee {
    pub id: AttendeeId,
    pub event_id: EventId,
    pub guest_id: GuestId,
    pub is_attending: bool,
}

/// Payload for inserting a guest; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NewGuest {
    pub name: String,
}

/// Editable event fields, used both when creating and editing an event.
///
/// A missing `event_date` leaves the date to the store on insert and keeps
/// the current date on edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventFields {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,
    pub time: String,
    pub location: String,
    pub total_cost: f64,
}

/// Payload for inserting a join row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAttendee {
    pub event_id: EventId,
    pub guest_id: GuestId,
    pub is_attending: bool,
}

/// An event together with its per-guest attendance map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventWithAttendees {
    #[serde(flatten)]
    pub event: Event,
    pub attendees: AttendanceMap,
}

impl EventWithAttendees {
    pub fn new(event: Event, attendees: AttendanceMap) -> Self {
        EventWithAttendees { event, attendees }
    }

    pub fn id(&self) -> &EventId {
        &self.event.id
    }

    /// Absent guests read as not attending.
    pub fn is_attending(&self, guest_id: &GuestId) -> bool {
        self.attendees.get(guest_id).copied().unwrap_or(false)
    }

    pub fn confirmed_count(&self) -> usize {
        cost::confirmed_count(&self.attendees)
    }

    pub fn cost_per_person(&self) -> f64 {
        cost::cost_per_person(self.event.total_cost, self.confirmed_count())
    }

    pub(crate) fn apply_fields(&mut self, fields: &EventFields) {
        self.event.title = fields.title.clone();
        self.event.time = fields.time.clone();
        self.event.location = fields.location.clone();
        self.event.total_cost = fields.total_cost;
        if let Some(date) = fields.event_date {
            self.event.event_date = date;
        }
    }
}

/// Trim a typed-in name; blank names are rejected.
pub fn clean_name(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

impl fmt::Display for Guest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({} {})", self.title, self.event_date, self.time)
    }
}
