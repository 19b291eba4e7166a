//! Look up guests and events by id or by name.

use anyhow::Result;

use planner_core::{EventWithAttendees, Guest};

pub fn guest<'a>(guests: &'a [Guest], query: &str) -> Result<&'a Guest> {
    find(guests, query, "guest", |g| g.id.as_str(), |g| g.name.as_str())
}

pub fn event<'a>(events: &'a [EventWithAttendees], query: &str) -> Result<&'a EventWithAttendees> {
    find(events, query, "event", |e| e.id().as_str(), |e| e.event.title.as_str())
}

/// An exact id wins; otherwise the one item whose name matches
/// case-insensitively.
fn find<'a, T>(
    items: &'a [T],
    query: &str,
    kind: &str,
    id: impl Fn(&T) -> &str,
    name: impl Fn(&T) -> &str,
) -> Result<&'a T> {
    let query = query.trim();

    if let Some(item) = items.iter().find(|item| id(*item) == query) {
        return Ok(item);
    }

    let wanted = query.to_lowercase();
    let matches: Vec<&T> = items
        .iter()
        .filter(|item| name(*item).trim().to_lowercase() == wanted)
        .collect();

    match matches.as_slice() {
        [item] => Ok(*item),
        [] => anyhow::bail!("No {} matching '{}'", kind, query),
        many => anyhow::bail!(
            "'{}' matches {} {}s; use the id instead",
            query,
            many.len(),
            kind
        ),
    }
}
