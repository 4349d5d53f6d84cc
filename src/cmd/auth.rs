//! Account commands: `taskboard auth`.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Password;
use taskboard::auth::AuthSession;
use taskboard::remote::SupabaseClient;
use taskboard::ui::icons::{CHECK, USER};

use super::super::AuthCommands;

fn prompt_password(confirm: bool) -> Result<String> {
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    prompt.interact().context("Failed to read password")
}

pub async fn cmd_auth(client: Arc<SupabaseClient>, command: AuthCommands) -> Result<()> {
    let session = Arc::new(AuthSession::new(client.clone(), client));
    session.listen();

    let result = run(&session, command).await;
    session.teardown();
    result
}

async fn run(session: &AuthSession, command: AuthCommands) -> Result<()> {
    match command {
        AuthCommands::SignIn { email, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password(false)?,
            };
            let user = session
                .sign_in(&email, &password)
                .await
                .context("Sign-in failed")?;
            println!(
                "{}Signed in as {}",
                CHECK,
                style(user.email.as_deref().unwrap_or(&email)).bold()
            );
        }
        AuthCommands::SignUp {
            email,
            full_name,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password(true)?,
            };
            let outcome = session
                .sign_up(&email, &password, &full_name)
                .await
                .context("Sign-up failed")?;
            if outcome.session.is_some() {
                println!("{}Account created, signed in as {}", CHECK, style(&email).bold());
            } else {
                println!("{}Account created for {}", CHECK, style(&email).bold());
                println!("Confirm your email address, then run `taskboard auth sign-in`.");
            }
        }
        AuthCommands::SignOut => {
            session.sign_out().await.context("Sign-out failed")?;
            println!("Signed out.");
        }
        AuthCommands::Status => match session.initialize().await? {
            Some(user) => {
                let name = user.user_metadata.full_name.as_deref().unwrap_or("-");
                println!(
                    "{}{} <{}>",
                    USER,
                    style(name).bold(),
                    user.email.as_deref().unwrap_or("no email")
                );
                println!("   {}", style(user.id).dim());
            }
            None => println!("Not signed in. Run `taskboard auth sign-in --email <EMAIL>`."),
        },
    }

    Ok(())
}
