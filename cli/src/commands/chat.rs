use anyhow::Result;

use moneywise_core::models::{MessageRole, parse_personality};
use moneywise_core::store::AppStore;

use crate::client::BackendClient;

use super::helpers::sync_marker;

pub(crate) fn cmd_chat(
    store: &mut AppStore,
    backend: &BackendClient,
    message: &str,
    json: bool,
) -> Result<()> {
    let reply = store.send_chat_message(backend, backend, message)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "role": reply.role,
                "content": reply.content,
                "kind": reply.kind,
                "sync": reply.sync,
            })
        );
    } else {
        println!("companion: {}", reply.content);
    }
    Ok(())
}

pub(crate) fn cmd_chat_history(store: &AppStore, json: bool) -> Result<()> {
    let messages = store.messages();

    if json {
        let items: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "id": m.id,
                    "role": m.role,
                    "content": m.content,
                    "timestamp": m.timestamp.to_rfc3339(),
                    "kind": m.kind,
                    "sync": m.sync,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if messages.is_empty() {
        eprintln!("No conversation yet. Say something with: moneywise chat <message>");
        return Ok(());
    }

    for message in messages {
        let speaker = match message.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "companion",
        };
        println!("{speaker}: {}{}", message.content, sync_marker(message.sync));
    }
    Ok(())
}

pub(crate) fn cmd_tip(store: &mut AppStore, json: bool) -> Result<()> {
    let tip = store.add_scripted_tip()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "content": tip.content,
                "kind": tip.kind,
            })
        );
    } else {
        println!("companion: {}", tip.content);
    }
    Ok(())
}

pub(crate) fn cmd_personality(store: &mut AppStore, tag: Option<&str>, json: bool) -> Result<()> {
    match tag {
        Some(tag) => {
            let personality = parse_personality(tag)?;
            store.set_personality(personality)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "personality": personality.as_str() })
                );
            } else {
                println!("Companion personality set to {}.", personality.as_str());
            }
        }
        None => {
            let personality = store.personality();
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "personality": personality.as_str() })
                );
            } else {
                println!("Companion personality: {}.", personality.as_str());
            }
        }
    }
    Ok(())
}
