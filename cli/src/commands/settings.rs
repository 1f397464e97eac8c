use anyhow::{Result, bail};

use moneywise_core::models::parse_personality;
use moneywise_core::store::AppStore;

use super::helpers::parse_amount;

pub(crate) fn cmd_settings_show(store: &AppStore, json: bool) -> Result<()> {
    let Some(user) = store.current_user() else {
        bail!("No active session. Log in first.");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&user.preferences)?);
        return Ok(());
    }

    let prefs = &user.preferences;
    println!("Currency:        {}", prefs.currency);
    println!("Notifications:   {}", if prefs.notifications { "on" } else { "off" });
    println!("Dark mode:       {}", if prefs.dark_mode { "on" } else { "off" });
    println!("AI personality:  {}", prefs.ai_personality.as_str());
    println!("Monthly income:  {} {:.2}", prefs.currency, user.monthly_income);
    Ok(())
}

pub(crate) fn cmd_settings_set(
    store: &mut AppStore,
    key: &str,
    value: &str,
    json: bool,
) -> Result<()> {
    let Some(user) = store.current_user() else {
        bail!("No active session. Log in first.");
    };
    let mut preferences = user.preferences.clone();

    match key {
        "currency" => {
            let code = value.trim().to_uppercase();
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                bail!("Currency must be a 3-letter code (e.g. USD, IDR)");
            }
            preferences.currency = code;
            store.update_preferences(preferences)?;
        }
        "notifications" => {
            preferences.notifications = parse_switch(value)?;
            store.update_preferences(preferences)?;
        }
        "dark-mode" => {
            preferences.dark_mode = parse_switch(value)?;
            store.update_preferences(preferences)?;
        }
        "personality" => {
            preferences.ai_personality = parse_personality(value)?;
            store.update_preferences(preferences)?;
        }
        "income" => {
            let income = parse_amount(value)?;
            store.set_monthly_income(income)?;
        }
        _ => bail!(
            "Unknown setting '{key}'. Must be one of: currency, notifications, dark-mode, \
             personality, income"
        ),
    }

    if json {
        println!("{}", serde_json::json!({ "success": true, "setting": key }));
    } else {
        println!("Setting '{key}' updated.");
    }
    Ok(())
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => bail!("Invalid value '{value}'. Use on or off"),
    }
}
