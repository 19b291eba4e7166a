mod commands;
mod planner;
mod render;
mod resolve;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use crate::commands::events::EventArgs;

/// Filter for log output on stderr, e.g. `PLANNER_LOG=planner_core=debug`
const LOG_ENV: &str = "PLANNER_LOG";

#[derive(Parser)]
#[command(name = "planner")]
#[command(about = "Plan events with friends: who's coming, and what everyone owes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Create an account (confirm it from the emailed link)
    Signup {
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Forget the saved session
    Logout,
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Events with attendance and cost per person
    List,
    /// Events by day: past, today and upcoming
    Agenda,
    /// The guest list
    Guests,
    Guest {
        #[command(subcommand)]
        command: GuestCommand,
    },
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },
    /// Toggle whether a guest attends an event
    Attend {
        /// Event id or title
        event: String,
        /// Guest id or name
        guest: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a commented config file
    Init,
}

#[derive(Subcommand)]
enum GuestCommand {
    Add {
        name: String,
    },
    Rename {
        /// Guest id or name
        guest: String,
        name: String,
    },
    Remove {
        /// Guest id or name
        guest: String,
    },
    /// Print the guest's invite link
    Invite {
        /// Guest id or name
        guest: String,
    },
}

#[derive(Subcommand)]
enum EventCommand {
    Add {
        title: String,
        #[command(flatten)]
        args: EventArgs,
    },
    Edit {
        /// Event id or title
        event: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        args: EventArgs,
    },
    Remove {
        /// Event id or title
        event: String,
    },
    /// Set the total cost to split between attending guests
    Cost {
        /// Event id or title
        event: String,
        amount: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Login { email } => commands::auth::login(email).await,
        Commands::Signup { email } => commands::auth::signup(email).await,
        Commands::Logout => commands::auth::logout().await,
        Commands::Config { command } => match command {
            ConfigCommand::Init => commands::config::init(),
        },
        Commands::List => commands::events::list().await,
        Commands::Agenda => commands::events::agenda().await,
        Commands::Guests => commands::guests::list().await,
        Commands::Guest { command } => match command {
            GuestCommand::Add { name } => commands::guests::add(&name).await,
            GuestCommand::Rename { guest, name } => commands::guests::rename(&guest, &name).await,
            GuestCommand::Remove { guest } => commands::guests::remove(&guest).await,
            GuestCommand::Invite { guest } => commands::guests::invite(&guest).await,
        },
        Commands::Event { command } => match command {
            EventCommand::Add { title, args } => commands::events::add(&title, args).await,
            EventCommand::Edit { event, title, args } => {
                commands::events::edit(&event, title, args).await
            }
            EventCommand::Remove { event } => commands::events::remove(&event).await,
            EventCommand::Cost { event, amount } => commands::events::cost(&event, &amount).await,
        },
        Commands::Attend { event, guest } => commands::attend::run(&event, &guest).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Err(e) = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("tracing init failed: {}", e);
    }
}
