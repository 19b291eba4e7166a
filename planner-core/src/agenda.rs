//! Calendar view of events, grouped by day.

use chrono::{NaiveDate, NaiveTime};

use crate::model::EventWithAttendees;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Past,
    Today,
    Upcoming,
}

impl DayStatus {
    pub fn on(date: NaiveDate, today: NaiveDate) -> Self {
        match date.cmp(&today) {
            std::cmp::Ordering::Less => DayStatus::Past,
            std::cmp::Ordering::Equal => DayStatus::Today,
            std::cmp::Ordering::Greater => DayStatus::Upcoming,
        }
    }
}

/// All events falling on one date.
#[derive(Debug)]
pub struct AgendaDay<'a> {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub events: Vec<&'a EventWithAttendees>,
}

/// Group events by `event_date` in ascending order, each day's events sorted
/// by start time. Events whose time cannot be read go last within their day.
pub fn agenda(events: &[EventWithAttendees], today: NaiveDate) -> Vec<AgendaDay<'_>> {
    let mut sorted: Vec<&EventWithAttendees> = events.iter().collect();
    sorted.sort_by_key(|e| {
        let time = parse_time(&e.event.time);
        (e.event.event_date, time.is_none(), time)
    });

    let mut days: Vec<AgendaDay> = Vec::new();
    for event in sorted {
        let date = event.event.event_date;
        match days.last_mut() {
            Some(day) if day.date == date => day.events.push(event),
            _ => days.push(AgendaDay {
                date,
                status: DayStatus::on(date, today),
                events: vec![event],
            }),
        }
    }
    days
}

/// Accepts `HH:MM` and the `HH:MM:SS` form time columns come back in.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M"))
        .ok()
}
