use anyhow::Result;

use moneywise_core::models::NewChallenge;
use moneywise_core::store::AppStore;

use super::helpers::{format_date, parse_date};

pub(crate) fn cmd_circle_create(
    store: &mut AppStore,
    name: &str,
    members: Vec<String>,
    json: bool,
) -> Result<()> {
    let circle = store.add_social_circle(name, &members)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": circle.id,
                "name": circle.name,
                "members": circle.members,
            })
        );
    } else {
        let count = circle.members.len();
        println!("Circle '{}' created with {count} member(s).", circle.name);
    }
    Ok(())
}

pub(crate) fn cmd_circle_show(store: &AppStore, json: bool) -> Result<()> {
    let circles = store.social_circles();

    if json {
        let items: Vec<serde_json::Value> = circles
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "name": c.name,
                    "members": c.members,
                    "challenges": c.challenges.iter().map(|ch| {
                        serde_json::json!({
                            "id": ch.id,
                            "title": ch.title,
                            "description": ch.description,
                            "start_date": ch.start_date.to_rfc3339(),
                            "end_date": ch.end_date.to_rfc3339(),
                            "participants": ch.participants,
                        })
                    }).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if circles.is_empty() {
        eprintln!("No circles yet. Create one with: moneywise circle create <name>");
        return Ok(());
    }

    for circle in circles {
        println!("=== {} ===", circle.name);
        let names: Vec<&str> = circle.members.iter().map(|m| m.name.as_str()).collect();
        println!("  Members: {}", names.join(", "));
        if circle.challenges.is_empty() {
            println!("  No challenges yet.");
        } else {
            for challenge in &circle.challenges {
                println!(
                    "  [{}] {} ({} to {}) — {} participant(s)",
                    challenge.title,
                    challenge.description,
                    format_date(challenge.start_date),
                    format_date(challenge.end_date),
                    challenge.participants.len()
                );
            }
        }
        println!();
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_circle_challenge(
    store: &mut AppStore,
    circle: &str,
    title: &str,
    description: &str,
    start: Option<String>,
    end: Option<String>,
    json: bool,
) -> Result<()> {
    let circle_id = store
        .social_circles()
        .iter()
        .find(|c| c.id == circle || c.name == circle)
        .map(|c| c.id.clone());

    let Some(circle_id) = circle_id else {
        anyhow::bail!("No circle matches '{circle}'");
    };

    let start_date = parse_date(start)?;
    let end_date = parse_date(end)?;

    let challenge = store.add_challenge(
        &circle_id,
        NewChallenge {
            title: title.to_string(),
            description: description.to_string(),
            start_date,
            end_date,
            participants: Vec::new(),
        },
    )?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": challenge.id,
                "title": challenge.title,
                "start_date": challenge.start_date.to_rfc3339(),
                "end_date": challenge.end_date.to_rfc3339(),
                "participants": challenge.participants,
            })
        );
    } else {
        println!(
            "Challenge '{}' added ({} to {}).",
            challenge.title,
            format_date(challenge.start_date),
            format_date(challenge.end_date)
        );
    }
    Ok(())
}
