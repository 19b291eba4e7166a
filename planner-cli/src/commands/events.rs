use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use owo_colors::OwoColorize;

use planner_core::cost::parse_cost;
use planner_core::{EventFields, EventWithAttendees, clean_name};

use crate::planner::Planner;
use crate::render::{EventCard, Render, summary};

/// Event fields settable from the command line.
#[derive(Args, Debug, Default)]
pub struct EventArgs {
    /// Date (YYYY-MM-DD); the store picks today when creating without one
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Start time, e.g. 18:00; required when adding
    #[arg(long)]
    pub time: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    /// Total cost to split between attending guests
    #[arg(long)]
    pub cost: Option<String>,
}

impl EventArgs {
    /// Overwrite only the fields that were given.
    fn merge_into(self, fields: &mut EventFields) {
        if let Some(date) = self.date {
            fields.event_date = Some(date);
        }
        if let Some(time) = self.time {
            fields.time = time.trim().to_string();
        }
        if let Some(location) = self.location {
            fields.location = location.trim().to_string();
        }
        if let Some(cost) = self.cost {
            fields.total_cost = parse_cost(&cost);
        }
    }
}

/// Stored when an event is saved without a location.
const DEFAULT_LOCATION: &str = "Por definir";

/// An event must have a time; a missing location gets the placeholder.
fn complete(mut fields: EventFields) -> Result<EventFields> {
    if fields.time.trim().is_empty() {
        anyhow::bail!("Event time is required (--time)");
    }
    if fields.location.trim().is_empty() {
        fields.location = DEFAULT_LOCATION.to_string();
    }
    Ok(fields)
}

fn new_fields(event_title: &str, args: EventArgs) -> Result<EventFields> {
    let mut fields = EventFields {
        title: title(event_title)?,
        event_date: None,
        time: String::new(),
        location: String::new(),
        total_cost: 0.0,
    };
    args.merge_into(&mut fields);
    complete(fields)
}

fn title(title: &str) -> Result<String> {
    clean_name(title).ok_or_else(|| anyhow::anyhow!("Event title can't be empty"))
}

fn current_fields(event: &EventWithAttendees) -> EventFields {
    let event = &event.event;
    EventFields {
        title: event.title.clone(),
        event_date: Some(event.event_date),
        time: event.time.clone(),
        location: event.location.clone(),
        total_cost: event.total_cost,
    }
}

pub async fn list() -> Result<()> {
    let planner = Planner::open().await?;
    let sync = planner.sync();

    if sync.events().is_empty() {
        println!("No events yet. Add one with `planner event add <title>`.");
    }

    for (i, event) in sync.events().iter().enumerate() {
        let card = EventCard {
            event,
            guests: sync.guests(),
        };
        println!("{}", card.render());

        if i < sync.events().len() - 1 {
            println!();
        }
    }

    planner.finish().await
}

pub async fn agenda() -> Result<()> {
    let planner = Planner::open().await?;
    let today = chrono::Local::now().date_naive();

    let days = planner_core::agenda::agenda(planner.sync().events(), today);
    if days.is_empty() {
        println!("Nothing planned.");
    }
    for (i, day) in days.iter().enumerate() {
        println!("{}", day.render());

        if i < days.len() - 1 {
            println!();
        }
    }

    planner.finish().await
}

pub async fn add(event_title: &str, args: EventArgs) -> Result<()> {
    let fields = new_fields(event_title, args)?;

    let mut planner = Planner::open().await?;
    let event_id = planner.sync_mut().add_event(&fields).await?;

    if let Some(event) = planner.sync().state().event(&event_id) {
        let card = EventCard {
            event,
            guests: planner.sync().guests(),
        };
        println!("{} {}", "Created".green(), card.render());
    }

    planner.finish().await
}

pub async fn edit(query: &str, new_title: Option<String>, args: EventArgs) -> Result<()> {
    let mut planner = Planner::open().await?;

    let event = planner.event(query)?;
    let event_id = event.id().clone();
    let mut fields = current_fields(event);
    if let Some(new_title) = new_title {
        fields.title = title(&new_title)?;
    }
    args.merge_into(&mut fields);
    let fields = complete(fields)?;

    planner.sync_mut().edit_event(&event_id, &fields);
    println!("{} {}", "Updated".yellow(), fields.title.bold());

    planner.finish().await
}

pub async fn remove(query: &str) -> Result<()> {
    let mut planner = Planner::open().await?;

    let event = planner.event(query)?;
    let (event_id, event_title) = (event.id().clone(), event.event.title.clone());

    planner.sync_mut().delete_event(&event_id);
    println!("{} {}", "Removed".red(), event_title);

    planner.finish().await
}

pub async fn cost(query: &str, amount: &str) -> Result<()> {
    let mut planner = Planner::open().await?;

    let event_id = planner.event(query)?.id().clone();
    planner.sync_mut().update_event_cost(&event_id, parse_cost(amount));

    if let Some(event) = planner.sync().state().event(&event_id) {
        let guests = planner.sync().guests();
        println!("{}: {}", event.event.title.bold(), summary(event, guests));
    }

    planner.finish().await
}
