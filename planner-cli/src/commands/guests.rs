use anyhow::Result;
use owo_colors::OwoColorize;

use planner_core::clean_name;
use planner_core::invite::invite_link;

use crate::planner::Planner;
use crate::render::Render;

fn name(name: &str) -> Result<String> {
    clean_name(name).ok_or_else(|| anyhow::anyhow!("Guest name can't be empty"))
}

pub async fn list() -> Result<()> {
    let planner = Planner::open().await?;

    if planner.sync().guests().is_empty() {
        println!("No guests yet. Add one with `planner guest add <name>`.");
    }
    for guest in planner.sync().guests() {
        println!("{}", guest.render());
    }

    planner.finish().await
}

pub async fn add(guest_name: &str) -> Result<()> {
    let guest_name = name(guest_name)?;

    let mut planner = Planner::open().await?;
    let guest = planner.sync_mut().add_guest(&guest_name).await?;
    println!("{} {}", "Added".green(), guest.render());

    if let Some(base) = &planner.config.invite_base_url {
        println!("   {}", invite_link(base, &guest.id)?.dimmed());
    }

    planner.finish().await
}

pub async fn rename(query: &str, new_name: &str) -> Result<()> {
    let new_name = name(new_name)?;

    let mut planner = Planner::open().await?;
    let guest = planner.guest(query)?;
    let (guest_id, old_name) = (guest.id.clone(), guest.name.clone());

    planner.sync_mut().edit_guest(&guest_id, &new_name);
    println!("{} {} -> {}", "Renamed".yellow(), old_name, new_name.bold());

    planner.finish().await
}

pub async fn remove(query: &str) -> Result<()> {
    let mut planner = Planner::open().await?;
    let guest = planner.guest(query)?;
    let (guest_id, guest_name) = (guest.id.clone(), guest.name.clone());

    planner.sync_mut().delete_guest(&guest_id);
    println!("{} {}", "Removed".red(), guest_name);

    planner.finish().await
}

pub async fn invite(query: &str) -> Result<()> {
    let planner = Planner::open().await?;
    let base = planner.config.invite_base_url()?;
    let guest = planner.guest(query)?;

    println!("{}", invite_link(base, &guest.id)?);

    planner.finish().await
}
