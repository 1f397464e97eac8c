use std::collections::HashMap;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    #[default]
    Supportive,
    Strict,
    Analytical,
}

impl Personality {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Supportive => "supportive",
            Self::Strict => "strict",
            Self::Analytical => "analytical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Suggestion,
    Warning,
    Celebration,
    Reminder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Stressed,
    Bored,
    Sad,
    Excited,
    Anxious,
}

/// Remote-persistence status of a locally appended chat message.
/// `Failed` entries stay visible locally and are candidates for a later
/// reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub currency: String,
    pub notifications: bool,
    pub dark_mode: bool,
    pub ai_personality: Personality,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            notifications: true,
            dark_mode: false,
            ai_personality: Personality::Supportive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub financial_health_score: i64,
    pub monthly_income: f64,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub emotion: Option<Emotion>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub emotion: Option<Emotion>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTransaction {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub kind: Option<TransactionKind>,
    pub emotion: Option<Option<Emotion>>,
}

/// The stored `spent` field is legacy data carried through the storage
/// shape; every user-facing number is recomputed from transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub category: String,
    pub limit: f64,
    #[serde(default)]
    pub spent: f64,
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub deadline: DateTime<Utc>,
    pub category: String,
    pub priority: GoalPriority,
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub deadline: DateTime<Utc>,
    pub category: String,
    pub priority: GoalPriority,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub kind: Option<MessageKind>,
    pub sync: SyncStatus,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AiCompanion {
    pub personality: Personality,
    pub messages: Vec<AiMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleMember {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub participants: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SocialCircle {
    pub id: String,
    pub name: String,
    pub members: Vec<CircleMember>,
    pub challenges: Vec<Challenge>,
}

/// Suggested transaction categories; free-text categories are accepted too.
pub const SUGGESTED_CATEGORIES: &[&str] = &[
    "Food",
    "Groceries",
    "Transportation",
    "Housing",
    "Entertainment",
    "Health",
    "Shopping",
    "Education",
    "Income",
    "Other",
];

pub fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() {
        bail!("Amount must be a finite number");
    }
    if amount < 0.0 {
        bail!("Amount must not be negative");
    }
    Ok(())
}

pub fn validate_budget_limit(limit: f64) -> Result<()> {
    if !limit.is_finite() || limit <= 0.0 {
        bail!("Budget limit must be greater than 0");
    }
    Ok(())
}

pub fn validate_goal_amounts(target: f64, current: f64) -> Result<()> {
    if !target.is_finite() || target <= 0.0 {
        bail!("Goal target amount must be greater than 0");
    }
    if !current.is_finite() || current < 0.0 {
        bail!("Goal current amount must not be negative");
    }
    Ok(())
}

/// Validate registration input the way the auth gateway does: name present,
/// email plausibly shaped, password at least 6 characters.
pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Name must not be empty");
    }
    if email.len() < 5 || !email.contains('@') {
        bail!("Email must be a valid address");
    }
    if password.len() < 6 {
        bail!("Password must be at least 6 characters");
    }
    Ok(())
}

pub fn parse_kind(s: &str) -> Result<TransactionKind> {
    match s.to_lowercase().as_str() {
        "income" => Ok(TransactionKind::Income),
        "expense" => Ok(TransactionKind::Expense),
        _ => bail!("Invalid transaction type '{s}'. Must be income or expense"),
    }
}

pub fn parse_period(s: &str) -> Result<BudgetPeriod> {
    match s.to_lowercase().as_str() {
        "weekly" => Ok(BudgetPeriod::Weekly),
        "monthly" => Ok(BudgetPeriod::Monthly),
        "yearly" => Ok(BudgetPeriod::Yearly),
        _ => bail!("Invalid budget period '{s}'. Must be one of: weekly, monthly, yearly"),
    }
}

pub fn parse_priority(s: &str) -> Result<GoalPriority> {
    match s.to_lowercase().as_str() {
        "low" => Ok(GoalPriority::Low),
        "medium" => Ok(GoalPriority::Medium),
        "high" => Ok(GoalPriority::High),
        _ => bail!("Invalid priority '{s}'. Must be one of: low, medium, high"),
    }
}

pub fn parse_personality(s: &str) -> Result<Personality> {
    match s.to_lowercase().as_str() {
        "supportive" => Ok(Personality::Supportive),
        "strict" => Ok(Personality::Strict),
        "analytical" => Ok(Personality::Analytical),
        _ => bail!("Invalid personality '{s}'. Must be one of: supportive, strict, analytical"),
    }
}

pub fn parse_emotion(s: &str) -> Result<Emotion> {
    match s.to_lowercase().as_str() {
        "happy" => Ok(Emotion::Happy),
        "stressed" => Ok(Emotion::Stressed),
        "bored" => Ok(Emotion::Bored),
        "sad" => Ok(Emotion::Sad),
        "excited" => Ok(Emotion::Excited),
        "anxious" => Ok(Emotion::Anxious),
        _ => bail!(
            "Invalid emotion '{s}'. Must be one of: happy, stressed, bored, sad, excited, anxious"
        ),
    }
}

pub fn parse_role(s: &str) -> Result<MessageRole> {
    match s.to_lowercase().as_str() {
        "user" => Ok(MessageRole::User),
        "assistant" => Ok(MessageRole::Assistant),
        _ => bail!("Invalid role '{s}'. Must be user or assistant"),
    }
}

/// Generate a scripted companion tip from the current domain data.
///
/// Offline fallback for the generative backend: each personality reads the
/// same inputs (recent transactions, recomputed budget overruns, goal
/// progress percentages) but reacts in its own register.
#[must_use]
pub fn scripted_tip(
    personality: Personality,
    transactions: &[Transaction],
    overspent_budgets: usize,
    goal_progress: &[f64],
) -> (String, MessageKind) {
    let expenses: Vec<&Transaction> = transactions
        .iter()
        .rev()
        .take(5)
        .filter(|t| t.kind == TransactionKind::Expense)
        .collect();
    let total_spent: f64 = expenses.iter().map(|t| t.amount).sum();

    match personality {
        Personality::Supportive => {
            if goal_progress.iter().any(|p| *p > 50.0) {
                (
                    "Great progress on your goals! Keep up the consistent effort.".to_string(),
                    MessageKind::Celebration,
                )
            } else if expenses.is_empty() {
                (
                    "Every small step counts! Log your spending to see where your money goes."
                        .to_string(),
                    MessageKind::Reminder,
                )
            } else {
                (
                    "Every small step counts! Consider setting a daily spending limit to reach \
                     your goals faster."
                        .to_string(),
                    MessageKind::Suggestion,
                )
            }
        }
        Personality::Strict => {
            if overspent_budgets > 0 {
                let noun = if overspent_budgets == 1 {
                    "category"
                } else {
                    "categories"
                };
                (
                    format!(
                        "You've overspent on {overspent_budgets} budget {noun}. Time to tighten \
                         up and get back on track."
                    ),
                    MessageKind::Warning,
                )
            } else if goal_progress.iter().any(|p| *p < 20.0) {
                (
                    "Your goals are barely progressing. Increase your savings rate.".to_string(),
                    MessageKind::Warning,
                )
            } else {
                (
                    "Good discipline. Now push harder: you can save more than you think."
                        .to_string(),
                    MessageKind::Suggestion,
                )
            }
        }
        Personality::Analytical => {
            let mut by_category: HashMap<&str, f64> = HashMap::new();
            for t in &expenses {
                *by_category.entry(t.category.as_str()).or_insert(0.0) += t.amount;
            }
            let top = by_category.into_iter().max_by(|a, b| a.1.total_cmp(&b.1));
            match top {
                Some((category, amount)) if total_spent > 0.0 => {
                    let pct = amount / total_spent * 100.0;
                    (
                        format!(
                            "Analysis: {category} accounts for {pct:.1}% of your recent \
                             spending. Consider optimizing this category."
                        ),
                        MessageKind::Suggestion,
                    )
                }
                _ => (
                    "Insufficient data for analysis. Add more transactions to get personalized \
                     insights."
                        .to_string(),
                    MessageKind::Reminder,
                ),
            }
        }
    }
}
