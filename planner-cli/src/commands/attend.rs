use anyhow::Result;
use owo_colors::OwoColorize;

use crate::planner::Planner;
use crate::render::summary;

pub async fn run(event_query: &str, guest_query: &str) -> Result<()> {
    let mut planner = Planner::open().await?;

    let event_id = planner.event(event_query)?.id().clone();
    let guest = planner.guest(guest_query)?.clone();

    planner.sync_mut().toggle_attendance(&event_id, &guest.id);

    if let Some(event) = planner.sync().state().event(&event_id) {
        let status = if event.is_attending(&guest.id) {
            "is coming to".green().to_string()
        } else {
            "is not coming to".dimmed().to_string()
        };
        println!("{} {} {}", guest.name.bold(), status, event.event.title.bold());
        println!("   {}", summary(event, planner.sync().guests()));
    }

    planner.finish().await
}
