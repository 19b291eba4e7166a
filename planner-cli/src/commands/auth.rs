use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use planner_core::auth::{self, IdentityProvider, SignUpForm, SignUpOutcome};

use crate::planner;

fn prompt_email(email: Option<String>) -> Result<String> {
    if let Some(email) = email {
        return Ok(email);
    }

    print!("Email: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read email")?;
    Ok(line.trim().to_string())
}

pub async fn login(email: Option<String>) -> Result<()> {
    let (_, provider) = planner::auth()?;

    let email = prompt_email(email)?;
    let password = rpassword::prompt_password("Password: ")?;

    let session = auth::sign_in(&provider, &email, &password).await?;

    println!("Signed in as {}", session.email.bold());
    Ok(())
}

pub async fn signup(email: Option<String>) -> Result<()> {
    let (config, provider) = planner::auth()?;

    let form = SignUpForm {
        email: prompt_email(email)?,
        password: rpassword::prompt_password("Password: ")?,
        confirm_password: rpassword::prompt_password("Confirm password: ")?,
    };
    let redirect_to = config.redirect_url().map(|url| url.as_str());

    match auth::sign_up(&provider, &form, redirect_to).await? {
        SignUpOutcome::ConfirmationPending { email } => {
            println!(
                "Check {} for a confirmation link, then run `planner login`.",
                email.bold()
            );
        }
        SignUpOutcome::SignedIn(session) => {
            println!("Signed up and signed in as {}", session.email.bold());
        }
    }
    Ok(())
}

pub async fn logout() -> Result<()> {
    let (_, provider) = planner::auth()?;
    provider.sign_out().await?;
    println!("Signed out");
    Ok(())
}
