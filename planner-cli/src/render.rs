//! TUI rendering for planner types.
//!
//! Extension traits that add colored terminal rendering to planner-core
//! types using owo_colors.

use owo_colors::OwoColorize;

use planner_core::agenda::{AgendaDay, DayStatus};
use planner_core::{EventWithAttendees, Guest};

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Guest {
    fn render(&self) -> String {
        format!("{} {}", self.name.bold(), self.id.to_string().dimmed())
    }
}

/// An event with its guest list and cost split.
pub struct EventCard<'a> {
    pub event: &'a EventWithAttendees,
    pub guests: &'a [Guest],
}

impl Render for EventCard<'_> {
    fn render(&self) -> String {
        let event = &self.event.event;
        let mut lines = vec![format!(
            "{} {}",
            event.title.bold(),
            event.id.to_string().dimmed()
        )];
        lines.push(format!("   {}", when_and_where(self.event).dimmed()));

        for guest in self.guests {
            let line = if self.event.is_attending(&guest.id) {
                format!("   {} {}", "✓".green(), guest.name.green())
            } else {
                format!("   {} {}", "·".dimmed(), guest.name.dimmed())
            };
            lines.push(line);
        }

        lines.push(format!("   {}", summary(self.event, self.guests)));
        lines.join("\n")
    }
}

impl Render for AgendaDay<'_> {
    fn render(&self) -> String {
        let date = self.date.format("%a %e %b %Y").to_string();
        let header = match self.status {
            DayStatus::Past => date.dimmed().to_string(),
            DayStatus::Today => format!("{} {}", date.yellow().bold(), "(today)".yellow()),
            DayStatus::Upcoming => date.green().bold().to_string(),
        };

        let mut lines = vec![header];
        for event in &self.events {
            let time = if event.event.time.is_empty() {
                "--:--".to_string()
            } else {
                event.event.time.clone()
            };
            let mut line = format!("   {} {}", time.dimmed(), event.event.title);
            if !event.event.location.is_empty() {
                line.push_str(&format!(" @ {}", event.event.location));
            }
            line.push_str(&format!(
                " {}",
                format!("({} attending)", event.confirmed_count()).dimmed()
            ));
            lines.push(line);
        }
        lines.join("\n")
    }
}

fn when_and_where(event: &EventWithAttendees) -> String {
    let event = &event.event;
    let mut parts = vec![event.event_date.to_string()];
    if !event.time.is_empty() {
        parts.push(event.time.clone());
    }
    if !event.location.is_empty() {
        parts.push(event.location.clone());
    }
    parts.join(" · ")
}

/// "2/3 attending · 100.00 total · 50 per person"
/// "confirmed/total attending", where the total is the whole guest list.
pub fn summary(event: &EventWithAttendees, guests: &[Guest]) -> String {
    let confirmed = event.confirmed_count();
    let mut summary = format!("{}/{} attending", confirmed, guests.len());

    if event.event.total_cost > 0.0 {
        summary.push_str(&format!(" · {:.2} total", event.event.total_cost));
        if confirmed > 0 {
            summary.push_str(&format!(" · {} per person", event.cost_per_person()));
        }
    }
    summary
}
