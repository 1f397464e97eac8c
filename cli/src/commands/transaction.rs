use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use moneywise_core::models::{
    NewTransaction, SUGGESTED_CATEGORIES, TransactionKind, UpdateTransaction, parse_emotion,
    parse_kind,
};
use moneywise_core::store::AppStore;

use super::helpers::{format_date, format_money, parse_date, truncate};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_log(
    store: &mut AppStore,
    amount: f64,
    description: &str,
    category: &str,
    income: bool,
    emotion: Option<&str>,
    tags: Vec<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let kind = if income {
        TransactionKind::Income
    } else {
        TransactionKind::Expense
    };
    let emotion = emotion.map(parse_emotion).transpose()?;
    let date = parse_date(date)?;

    let currency = store
        .current_user()
        .map_or_else(|| "USD".to_string(), |u| u.preferences.currency.clone());

    let transaction = store.add_transaction(NewTransaction {
        amount,
        description: description.to_string(),
        category: category.to_string(),
        date,
        kind,
        emotion,
        tags,
    })?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": transaction.id,
                "amount": transaction.amount,
                "description": transaction.description,
                "category": transaction.category,
                "date": transaction.date.to_rfc3339(),
                "type": transaction.kind,
                "emotion": transaction.emotion,
                "tags": transaction.tags,
            })
        );
    } else {
        let label = match transaction.kind {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        };
        println!(
            "Logged {label}: {} — {} [{}]",
            format_money(transaction.amount, &currency),
            transaction.description,
            transaction.category
        );
    }
    Ok(())
}

pub(crate) fn cmd_transactions(store: &AppStore, limit: Option<usize>, json: bool) -> Result<()> {
    let transactions = store.transactions();

    if json {
        let items: Vec<serde_json::Value> = transactions
            .iter()
            .map(|t| {
                serde_json::json!({
                    "id": t.id,
                    "amount": t.amount,
                    "description": t.description,
                    "category": t.category,
                    "date": t.date.to_rfc3339(),
                    "type": t.kind,
                    "emotion": t.emotion,
                    "tags": t.tags,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if transactions.is_empty() {
        eprintln!("No transactions yet. Log one with: moneywise log <amount> <description>");
        return Ok(());
    }

    #[derive(Tabled)]
    struct TransactionRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Amount")]
        amount: String,
    }

    let currency = store
        .current_user()
        .map_or_else(|| "USD".to_string(), |u| u.preferences.currency.clone());

    let mut rows: Vec<&moneywise_core::models::Transaction> = transactions.iter().collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    let rows: Vec<TransactionRow> = rows
        .into_iter()
        .map(|t| TransactionRow {
            id: truncate(&t.id, 11),
            date: format_date(t.date),
            description: truncate(&t.description, 30),
            category: t.category.clone(),
            kind: match t.kind {
                TransactionKind::Income => "income".to_string(),
                TransactionKind::Expense => "expense".to_string(),
            },
            amount: format_money(t.amount, &currency),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(5..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_transaction_edit(
    store: &mut AppStore,
    id: &str,
    amount: Option<f64>,
    description: Option<String>,
    category: Option<String>,
    kind: Option<&str>,
    emotion: Option<&str>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let full_id = store
        .transactions()
        .iter()
        .find(|t| t.id == id || t.id.starts_with(id.trim_end_matches("...")))
        .map(|t| t.id.clone());

    let Some(full_id) = full_id else {
        anyhow::bail!("No transaction matches '{id}'");
    };

    let update = UpdateTransaction {
        amount,
        description,
        category,
        date: date.map(|d| parse_date(Some(d))).transpose()?,
        kind: kind.map(parse_kind).transpose()?,
        emotion: emotion.map(|e| parse_emotion(e).map(Some)).transpose()?,
    };

    let transaction = store.update_transaction(&full_id, update)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": transaction.id,
                "amount": transaction.amount,
                "description": transaction.description,
                "category": transaction.category,
                "date": transaction.date.to_rfc3339(),
                "type": transaction.kind,
                "emotion": transaction.emotion,
            })
        );
    } else {
        println!(
            "Updated: {} — {} [{}]",
            transaction.description, transaction.amount, transaction.category
        );
    }
    Ok(())
}

pub(crate) fn cmd_categories(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(SUGGESTED_CATEGORIES)?);
    } else {
        println!("Suggested categories (free text is accepted too):");
        for category in SUGGESTED_CATEGORIES {
            println!("  {category}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_transaction_delete(store: &mut AppStore, id: &str, json: bool) -> Result<()> {
    // Accept a full id or the truncated prefix shown in the table.
    let full_id = store
        .transactions()
        .iter()
        .find(|t| t.id == id || t.id.starts_with(id.trim_end_matches("...")))
        .map(|t| t.id.clone());

    let removed = match full_id {
        Some(full_id) => store.delete_transaction(&full_id)?,
        None => false,
    };

    if json {
        println!("{}", serde_json::json!({ "deleted": removed }));
    } else if removed {
        println!("Transaction deleted.");
    } else {
        eprintln!("No transaction matches '{id}'.");
    }
    Ok(())
}
