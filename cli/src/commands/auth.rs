use anyhow::Result;

use moneywise_core::store::AppStore;

use crate::client::BackendClient;

use super::helpers::json_error;

pub(crate) fn cmd_register(
    store: &mut AppStore,
    backend: &BackendClient,
    name: &str,
    email: &str,
    password: &str,
    json: bool,
) -> Result<()> {
    let user = store.register(backend, backend, name, email, password)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("Welcome, {}! You are now logged in as {}.", user.name, user.email);
    }
    Ok(())
}

pub(crate) fn cmd_login(
    store: &mut AppStore,
    backend: &BackendClient,
    email: &str,
    password: &str,
    json: bool,
) -> Result<()> {
    let user = store.login(backend, backend, email, password)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("Logged in as {} ({}).", user.name, user.email);
    }
    Ok(())
}

pub(crate) fn cmd_logout(store: &mut AppStore, json: bool) -> Result<()> {
    if !store.is_authenticated() {
        if json {
            println!("{}", json_error("No active session"));
        } else {
            eprintln!("No active session.");
        }
        return Ok(());
    }
    store.logout();
    if json {
        println!("{}", serde_json::json!({ "success": true }));
    } else {
        println!("Logged out. Your data stays on this device for next time.");
    }
    Ok(())
}

pub(crate) fn cmd_whoami(store: &AppStore, json: bool) -> Result<()> {
    match store.current_user() {
        Some(user) => {
            if json {
                println!("{}", serde_json::to_string_pretty(user)?);
            } else {
                let score = user.financial_health_score;
                println!("{} ({})", user.name, user.email);
                println!("Financial health score: {score}/100");
            }
        }
        None => {
            if json {
                println!("{}", json_error("No active session"));
            } else {
                eprintln!("Not logged in.");
            }
        }
    }
    Ok(())
}
