use anyhow::Result;
use chrono::Utc;

use moneywise_core::models::{BudgetPeriod, TransactionKind};
use moneywise_core::store::{AppStore, in_current_period};

use super::helpers::format_money;

pub(crate) fn cmd_summary(store: &AppStore, json: bool) -> Result<()> {
    let now = Utc::now();
    let month_transactions: Vec<_> = store
        .transactions()
        .iter()
        .filter(|t| in_current_period(t.date, now, BudgetPeriod::Monthly))
        .collect();

    let income: f64 = month_transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Income)
        .map(|t| t.amount)
        .sum();
    let expenses: f64 = month_transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Expense)
        .map(|t| t.amount)
        .sum();

    let score = store
        .current_user()
        .map_or(75, |u| u.financial_health_score);

    if json {
        let budgets: Vec<serde_json::Value> = store
            .budgets()
            .iter()
            .map(|b| {
                serde_json::json!({
                    "category": b.category,
                    "period": b.period,
                    "limit": b.limit,
                    "spent": store.budget_spent(b),
                })
            })
            .collect();
        let goals: Vec<serde_json::Value> = store
            .goals()
            .iter()
            .map(|g| {
                serde_json::json!({
                    "name": g.name,
                    "progress_pct": AppStore::goal_progress_pct(g),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "month_income": income,
                "month_expenses": expenses,
                "net": income - expenses,
                "financial_health_score": score,
                "budgets": budgets,
                "goals": goals,
            }))?
        );
        return Ok(());
    }

    let currency = store
        .current_user()
        .map_or_else(|| "USD".to_string(), |u| u.preferences.currency.clone());

    println!("=== This month ===");
    println!("  Income:   {}", format_money(income, &currency));
    println!("  Expenses: {}", format_money(expenses, &currency));
    println!("  Net:      {}", format_money(income - expenses, &currency));
    println!();

    if !store.budgets().is_empty() {
        println!("  Budgets:");
        for budget in store.budgets() {
            let spent = store.budget_spent(budget);
            let marker = if spent > budget.limit { "  OVER" } else { "" };
            println!(
                "    {} — {} / {}{marker}",
                budget.category,
                format_money(spent, &currency),
                format_money(budget.limit, &currency)
            );
        }
        println!();
    }

    if !store.goals().is_empty() {
        println!("  Goals:");
        for goal in store.goals() {
            println!(
                "    {} — {:.0}%",
                goal.name,
                AppStore::goal_progress_pct(goal)
            );
        }
        println!();
    }

    println!("  Financial health score: {score}/100");
    Ok(())
}
