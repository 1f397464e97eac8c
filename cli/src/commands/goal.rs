use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use moneywise_core::models::{NewGoal, parse_priority};
use moneywise_core::store::AppStore;

use super::helpers::{format_date, format_money, parse_date, truncate};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_goal_add(
    store: &mut AppStore,
    name: &str,
    target: f64,
    deadline: Option<String>,
    category: &str,
    priority: &str,
    initial: f64,
    json: bool,
) -> Result<()> {
    let priority = parse_priority(priority)?;
    let deadline = parse_date(deadline)?;

    let goal = store.add_goal(NewGoal {
        name: name.to_string(),
        target_amount: target,
        current_amount: initial,
        deadline,
        category: category.to_string(),
        priority,
    })?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": goal.id,
                "name": goal.name,
                "target_amount": goal.target_amount,
                "current_amount": goal.current_amount,
                "deadline": goal.deadline.to_rfc3339(),
                "category": goal.category,
                "priority": goal.priority,
            })
        );
    } else {
        println!(
            "Goal added: {} — target {} by {}",
            goal.name,
            format_money(goal.target_amount, &currency(store)),
            format_date(goal.deadline)
        );
    }
    Ok(())
}

pub(crate) fn cmd_goal_show(store: &AppStore, json: bool) -> Result<()> {
    let goals = store.goals();

    if json {
        let items: Vec<serde_json::Value> = goals
            .iter()
            .map(|g| {
                serde_json::json!({
                    "id": g.id,
                    "name": g.name,
                    "target_amount": g.target_amount,
                    "current_amount": g.current_amount,
                    "deadline": g.deadline.to_rfc3339(),
                    "category": g.category,
                    "priority": g.priority,
                    "progress_pct": AppStore::goal_progress_pct(g),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if goals.is_empty() {
        eprintln!("No savings goals yet. Add one with: moneywise goal add <name> <target>");
        return Ok(());
    }

    #[derive(Tabled)]
    struct GoalRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Priority")]
        priority: String,
        #[tabled(rename = "Saved")]
        saved: String,
        #[tabled(rename = "Target")]
        target: String,
        #[tabled(rename = "Progress")]
        progress: String,
        #[tabled(rename = "Deadline")]
        deadline: String,
    }

    let currency = currency(store);
    let rows: Vec<GoalRow> = goals
        .iter()
        .map(|g| GoalRow {
            id: truncate(&g.id, 11),
            name: truncate(&g.name, 25),
            priority: format!("{:?}", g.priority).to_lowercase(),
            saved: format_money(g.current_amount, &currency),
            target: format_money(g.target_amount, &currency),
            progress: format!("{:.0}%", AppStore::goal_progress_pct(g)),
            deadline: format_date(g.deadline),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_goal_fund(store: &mut AppStore, id: &str, amount: f64, json: bool) -> Result<()> {
    let full_id = store
        .goals()
        .iter()
        .find(|g| g.id == id || g.id.starts_with(id.trim_end_matches("...")) || g.name == id)
        .map(|g| g.id.clone());

    let Some(full_id) = full_id else {
        anyhow::bail!("No goal matches '{id}'");
    };

    let goal = store.fund_goal(&full_id, amount)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": goal.id,
                "current_amount": goal.current_amount,
                "progress_pct": AppStore::goal_progress_pct(&goal),
            })
        );
    } else {
        println!(
            "Added {} to '{}' — now at {:.0}%",
            format_money(amount, &currency(store)),
            goal.name,
            AppStore::goal_progress_pct(&goal)
        );
    }
    Ok(())
}

pub(crate) fn cmd_goal_delete(store: &mut AppStore, id: &str, json: bool) -> Result<()> {
    let full_id = store
        .goals()
        .iter()
        .find(|g| g.id == id || g.id.starts_with(id.trim_end_matches("...")) || g.name == id)
        .map(|g| g.id.clone());

    let removed = match full_id {
        Some(full_id) => store.delete_goal(&full_id)?,
        None => false,
    };

    if json {
        println!("{}", serde_json::json!({ "deleted": removed }));
    } else if removed {
        println!("Goal deleted.");
    } else {
        eprintln!("No goal matches '{id}'.");
    }
    Ok(())
}

fn currency(store: &AppStore) -> String {
    store
        .current_user()
        .map_or_else(|| "USD".to_string(), |u| u.preferences.currency.clone())
}
