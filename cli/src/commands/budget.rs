use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use moneywise_core::models::parse_period;
use moneywise_core::store::AppStore;

use super::helpers::{format_money, truncate};

pub(crate) fn cmd_budget_set(
    store: &mut AppStore,
    category: &str,
    limit: f64,
    period: &str,
    json: bool,
) -> Result<()> {
    let period = parse_period(period)?;
    let budget = store.add_budget(category, limit, period)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": budget.id,
                "category": budget.category,
                "limit": budget.limit,
                "period": budget.period,
            })
        );
    } else {
        println!(
            "Budget set: {} — {} per {:?} period",
            budget.category,
            format_money(budget.limit, &currency(store)),
            budget.period
        );
    }
    Ok(())
}

pub(crate) fn cmd_budget_show(store: &AppStore, json: bool) -> Result<()> {
    let budgets = store.budgets();

    if json {
        let items: Vec<serde_json::Value> = budgets
            .iter()
            .map(|b| {
                serde_json::json!({
                    "id": b.id,
                    "category": b.category,
                    "limit": b.limit,
                    "period": b.period,
                    "spent": store.budget_spent(b),
                    "remaining": b.limit - store.budget_spent(b),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if budgets.is_empty() {
        eprintln!("No budgets yet. Set one with: moneywise budget set <category> <limit>");
        return Ok(());
    }

    #[derive(Tabled)]
    struct BudgetRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Period")]
        period: String,
        #[tabled(rename = "Limit")]
        limit: String,
        #[tabled(rename = "Spent")]
        spent: String,
        #[tabled(rename = "Remaining")]
        remaining: String,
        #[tabled(rename = "Status")]
        status: String,
    }

    let currency = currency(store);
    let rows: Vec<BudgetRow> = budgets
        .iter()
        .map(|b| {
            let spent = store.budget_spent(b);
            BudgetRow {
                id: truncate(&b.id, 11),
                category: b.category.clone(),
                period: format!("{:?}", b.period).to_lowercase(),
                limit: format_money(b.limit, &currency),
                spent: format_money(spent, &currency),
                remaining: format_money(b.limit - spent, &currency),
                status: if spent > b.limit {
                    "OVER".to_string()
                } else {
                    "ok".to_string()
                },
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_budget_delete(store: &mut AppStore, id: &str, json: bool) -> Result<()> {
    let full_id = store
        .budgets()
        .iter()
        .find(|b| b.id == id || b.id.starts_with(id.trim_end_matches("...")) || b.category == id)
        .map(|b| b.id.clone());

    let removed = match full_id {
        Some(full_id) => store.delete_budget(&full_id)?,
        None => false,
    };

    if json {
        println!("{}", serde_json::json!({ "deleted": removed }));
    } else if removed {
        println!("Budget deleted.");
    } else {
        eprintln!("No budget matches '{id}'.");
    }
    Ok(())
}

fn currency(store: &AppStore) -> String {
    store
        .current_user()
        .map_or_else(|| "USD".to_string(), |u| u.preferences.currency.clone())
}
