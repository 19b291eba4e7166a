//! The in-memory projection of guests and events.
//!
//! Every transition here is synchronous and side-effect free: it updates
//! the projection and describes the remote writes that mirror the change.
//! A transition on an id that is not present, or one carrying a cost that
//! is not a finite number, returns `None` and leaves the projection
//! untouched.

use crate::attendance::AttendanceMatrix;
use crate::model::{Event, EventFields, EventId, EventWithAttendees, Guest, GuestId};
use crate::remote::RemoteEffect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Loaded,
}

#[derive(Debug, Clone, Default)]
pub struct PlannerState {
    pub guests: Vec<Guest>,
    pub events: Vec<EventWithAttendees>,
    pub load_state: LoadState,
}

impl PlannerState {
    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    pub fn guest(&self, id: &GuestId) -> Option<&Guest> {
        self.guests.iter().find(|g| g.id == *id)
    }

    pub fn event(&self, id: &EventId) -> Option<&EventWithAttendees> {
        self.events.iter().find(|e| e.event.id == *id)
    }

    fn event_mut(&mut self, id: &EventId) -> Option<&mut EventWithAttendees> {
        self.events.iter_mut().find(|e| e.event.id == *id)
    }

    fn matrix(&mut self) -> AttendanceMatrix<'_> {
        AttendanceMatrix::new(&mut self.events)
    }

    pub fn toggle_attendance(
        &mut self,
        event_id: &EventId,
        guest_id: &GuestId,
    ) -> Option<Vec<RemoteEffect>> {
        let is_attending = self.matrix().toggle(event_id, guest_id)?;

        Some(vec![RemoteEffect::SetAttendance {
            event_id: event_id.clone(),
            guest_id: guest_id.clone(),
            is_attending,
        }])
    }

    pub fn update_event_cost(
        &mut self,
        event_id: &EventId,
        total_cost: f64,
    ) -> Option<Vec<RemoteEffect>> {
        // NaN and infinities would be stored as null
        if !total_cost.is_finite() {
            return None;
        }
        self.event_mut(event_id)?.event.total_cost = total_cost;

        Some(vec![RemoteEffect::SetEventCost {
            event_id: event_id.clone(),
            total_cost,
        }])
    }

    /// Append a guest the store has already created.
    pub fn insert_guest(&mut self, guest: Guest) -> Vec<RemoteEffect> {
        let rows = self.matrix().add_guest(&guest.id);
        self.guests.push(guest);

        vec![RemoteEffect::InsertAttendees(rows)]
    }

    pub fn rename_guest(&mut self, guest_id: &GuestId, name: &str) -> Option<Vec<RemoteEffect>> {
        let guest = self.guests.iter_mut().find(|g| g.id == *guest_id)?;
        guest.name = name.to_string();

        Some(vec![RemoteEffect::RenameGuest {
            guest_id: guest_id.clone(),
            name: name.to_string(),
        }])
    }

    pub fn remove_guest(&mut self, guest_id: &GuestId) -> Option<Vec<RemoteEffect>> {
        let index = self.guests.iter().position(|g| g.id == *guest_id)?;
        self.guests.remove(index);
        self.matrix().remove_guest(guest_id);

        // Join rows go first so no row points at a missing guest
        Some(vec![
            RemoteEffect::DeleteGuestAttendance(guest_id.clone()),
            RemoteEffect::DeleteGuest(guest_id.clone()),
        ])
    }

    /// Append an event the store has already created.
    pub fn insert_event(&mut self, event: Event) -> Vec<RemoteEffect> {
        let rows = AttendanceMatrix::new(&mut self.events).add_event(event, &self.guests);

        vec![RemoteEffect::InsertAttendees(rows)]
    }

    pub fn edit_event(
        &mut self,
        event_id: &EventId,
        fields: &EventFields,
    ) -> Option<Vec<RemoteEffect>> {
        if !fields.total_cost.is_finite() {
            return None;
        }
        self.event_mut(event_id)?.apply_fields(fields);

        Some(vec![RemoteEffect::UpdateEvent {
            event_id: event_id.clone(),
            fields: fields.clone(),
        }])
    }

    pub fn remove_event(&mut self, event_id: &EventId) -> Option<Vec<RemoteEffect>> {
        let index = self.events.iter().position(|e| e.event.id == *event_id)?;
        self.events.remove(index);

        Some(vec![
            RemoteEffect::DeleteEventAttendance(event_id.clone()),
            RemoteEffect::DeleteEvent(event_id.clone()),
        ])
    }
}
