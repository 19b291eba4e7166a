//! Attendance maps: the full rebuild from join rows and the incremental
//! patches applied after each mutation.
//!
//! Both paths must agree: folding the settled `event_attendees` rows with
//! [`denormalize`] yields the same maps that [`AttendanceMatrix`] maintains
//! incrementally.

use std::collections::HashMap;

use crate::model::{Event, EventAttendee, EventId, EventWithAttendees, Guest, GuestId, NewAttendee};

/// Per-event mapping from guest to attendance flag.
pub type AttendanceMap = HashMap<GuestId, bool>;

/// Fold join rows into one attendance map per event.
///
/// Rows are grouped by `event_id` once. Rows for unknown events are ignored;
/// if a pair appears twice the later row wins.
pub fn denormalize(events: Vec<Event>, attendees: &[EventAttendee]) -> Vec<EventWithAttendees> {
    let mut by_event: HashMap<&EventId, AttendanceMap> = HashMap::new();
    for row in attendees {
        by_event
            .entry(&row.event_id)
            .or_default()
            .insert(row.guest_id.clone(), row.is_attending);
    }

    events
        .into_iter()
        .map(|event| {
            let attendees = by_event.remove(&event.id).unwrap_or_default();
            EventWithAttendees::new(event, attendees)
        })
        .collect()
}

/// Keeps the "one row per event × guest" invariant in one place.
///
/// Every patch that grows the matrix also returns the join rows the remote
/// store needs, so the local maps and the inserted rows cannot drift apart.
pub struct AttendanceMatrix<'a> {
    events: &'a mut Vec<EventWithAttendees>,
}

impl<'a> AttendanceMatrix<'a> {
    pub fn new(events: &'a mut Vec<EventWithAttendees>) -> Self {
        AttendanceMatrix { events }
    }

    /// Add a not-attending entry for `guest_id` to every event.
    pub fn add_guest(&mut self, guest_id: &GuestId) -> Vec<NewAttendee> {
        self.events
            .iter_mut()
            .map(|e| {
                e.attendees.insert(guest_id.clone(), false);
                NewAttendee {
                    event_id: e.event.id.clone(),
                    guest_id: guest_id.clone(),
                    is_attending: false,
                }
            })
            .collect()
    }

    /// Append `event` with every guest marked not attending.
    pub fn add_event(&mut self, event: Event, guests: &[Guest]) -> Vec<NewAttendee> {
        let rows: Vec<NewAttendee> = guests
            .iter()
            .map(|g| NewAttendee {
                event_id: event.id.clone(),
                guest_id: g.id.clone(),
                is_attending: false,
            })
            .collect();
        let attendees = rows.iter().map(|r| (r.guest_id.clone(), false)).collect();

        self.events.push(EventWithAttendees::new(event, attendees));
        rows
    }

    pub fn remove_guest(&mut self, guest_id: &GuestId) {
        for event in self.events.iter_mut() {
            event.attendees.remove(guest_id);
        }
    }

    /// Flip one flag. Returns the new value, or `None` if the event is unknown.
    pub fn toggle(&mut self, event_id: &EventId, guest_id: &GuestId) -> Option<bool> {
        let event = self.events.iter_mut().find(|e| e.event.id == *event_id)?;
        let attending = !event.is_attending(guest_id);
        event.attendees.insert(guest_id.clone(), attending);
        Some(attending)
    }
}
