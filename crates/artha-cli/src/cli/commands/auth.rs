//! Login, logout and session status handlers.

use anyhow::{Context, Result, bail};
use artha_core::credentials::{CredentialSlot, CredentialStore};
use artha_core::session::{self, LoginCredentials, LoginRole};

use crate::cli::open_session;

pub async fn login(role: &str, identifier: String, password: String) -> Result<()> {
    let role = match role {
        "student" => LoginRole::Student,
        "school" => LoginRole::School,
        "parent" => LoginRole::Parent,
        other => bail!("Unknown role '{other}'. Expected student, school or parent."),
    };

    let (client, store) = open_session()?;
    let outcome = session::login(
        &client,
        &store,
        role,
        &LoginCredentials {
            identifier,
            password,
        },
    )
    .await
    .context("login failed")?;

    match outcome.staff_kind {
        Some(kind) => println!("Logged in as {} ({kind})", outcome.role.as_str()),
        None => println!("Logged in as {}", outcome.role.as_str()),
    }
    Ok(())
}

pub fn logout() -> Result<()> {
    let store = CredentialStore::load_default();
    session::logout(&store).context("logout failed")?;
    println!("Logged out");
    Ok(())
}

pub fn status() -> Result<()> {
    let store = CredentialStore::load_default();

    match (store.active_role(), store.staff_kind()) {
        (Some(role), Some(kind)) => println!("Active role: {} ({kind})", role.as_str()),
        (Some(role), None) => println!("Active role: {}", role.as_str()),
        (None, _) => println!("Active role: none"),
    }

    let tokens = store.tokens();
    for slot in CredentialSlot::ALL {
        let state = if tokens.contains_key(&slot) {
            "token stored"
        } else {
            "empty"
        };
        println!("  {:<8} {state}", slot.as_str());
    }
    Ok(())
}
