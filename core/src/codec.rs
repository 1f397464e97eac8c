//! Conversion between the in-memory domain shape and the storage shape.
//!
//! The storage format has no native date type, so every date-bearing field
//! is written as an RFC 3339 string (whole seconds). Deserialization is
//! deliberately lenient: a missing or unparsable date becomes the current
//! time and a missing collection becomes empty, so corrupted or partially
//! written storage degrades to defaults instead of erroring.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    AiCompanion, AiMessage, Budget, Challenge, CircleMember, Emotion, Goal, GoalPriority,
    MessageKind, MessageRole, Personality, SocialCircle, SyncStatus, Transaction, TransactionKind,
};

/// The bundle of domain collections persisted per user.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistedState {
    pub transactions: Vec<Transaction>,
    pub budgets: Vec<Budget>,
    pub goals: Vec<Goal>,
    pub social_circles: Vec<SocialCircle>,
    pub ai_companion: AiCompanion,
}

// --- Storage shape ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoredState {
    #[serde(default)]
    pub transactions: Vec<StoredTransaction>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub goals: Vec<StoredGoal>,
    #[serde(default)]
    pub social_circles: Vec<StoredCircle>,
    #[serde(default)]
    pub ai_companion: StoredCompanion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: String,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: String,
    pub kind: TransactionKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub emotion: Option<Emotion>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredGoal {
    pub id: String,
    pub name: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub category: String,
    pub priority: GoalPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<MessageKind>,
    #[serde(default)]
    pub sync: SyncStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoredCompanion {
    #[serde(default)]
    pub personality: Personality,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChallenge {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCircle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<CircleMember>,
    #[serde(default)]
    pub challenges: Vec<StoredChallenge>,
}

// --- Conversion ---

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp; anything absent or unparsable becomes now.
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[must_use]
pub fn serialize(state: &PersistedState) -> StoredState {
    StoredState {
        transactions: state
            .transactions
            .iter()
            .map(|t| StoredTransaction {
                id: t.id.clone(),
                amount: t.amount,
                description: t.description.clone(),
                category: t.category.clone(),
                date: format_timestamp(t.date),
                kind: t.kind,
                emotion: t.emotion,
                tags: t.tags.clone(),
            })
            .collect(),
        budgets: state.budgets.clone(),
        goals: state
            .goals
            .iter()
            .map(|g| StoredGoal {
                id: g.id.clone(),
                name: g.name.clone(),
                target_amount: g.target_amount,
                current_amount: g.current_amount,
                deadline: format_timestamp(g.deadline),
                category: g.category.clone(),
                priority: g.priority,
            })
            .collect(),
        social_circles: state
            .social_circles
            .iter()
            .map(|c| StoredCircle {
                id: c.id.clone(),
                name: c.name.clone(),
                members: c.members.clone(),
                challenges: c
                    .challenges
                    .iter()
                    .map(|ch| StoredChallenge {
                        id: ch.id.clone(),
                        title: ch.title.clone(),
                        description: ch.description.clone(),
                        start_date: format_timestamp(ch.start_date),
                        end_date: format_timestamp(ch.end_date),
                        participants: ch.participants.clone(),
                    })
                    .collect(),
            })
            .collect(),
        ai_companion: StoredCompanion {
            personality: state.ai_companion.personality,
            messages: state
                .ai_companion
                .messages
                .iter()
                .map(|m| StoredMessage {
                    id: m.id.clone(),
                    role: m.role,
                    content: m.content.clone(),
                    timestamp: format_timestamp(m.timestamp),
                    kind: m.kind,
                    sync: m.sync,
                })
                .collect(),
        },
    }
}

#[must_use]
pub fn deserialize(stored: StoredState) -> PersistedState {
    PersistedState {
        transactions: stored
            .transactions
            .into_iter()
            .map(|t| Transaction {
                date: parse_timestamp(&t.date),
                id: t.id,
                amount: t.amount,
                description: t.description,
                category: t.category,
                kind: t.kind,
                emotion: t.emotion,
                tags: t.tags,
            })
            .collect(),
        budgets: stored.budgets,
        goals: stored
            .goals
            .into_iter()
            .map(|g| Goal {
                deadline: parse_timestamp(&g.deadline),
                id: g.id,
                name: g.name,
                target_amount: g.target_amount,
                current_amount: g.current_amount,
                category: g.category,
                priority: g.priority,
            })
            .collect(),
        social_circles: stored
            .social_circles
            .into_iter()
            .map(|c| SocialCircle {
                id: c.id,
                name: c.name,
                members: c.members,
                challenges: c
                    .challenges
                    .into_iter()
                    .map(|ch| Challenge {
                        start_date: parse_timestamp(&ch.start_date),
                        end_date: parse_timestamp(&ch.end_date),
                        id: ch.id,
                        title: ch.title,
                        description: ch.description,
                        participants: ch.participants,
                    })
                    .collect(),
            })
            .collect(),
        ai_companion: AiCompanion {
            personality: stored.ai_companion.personality,
            messages: stored
                .ai_companion
                .messages
                .into_iter()
                .map(|m| AiMessage {
                    timestamp: parse_timestamp(&m.timestamp),
                    id: m.id,
                    role: m.role,
                    content: m.content,
                    kind: m.kind,
                    sync: m.sync,
                })
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BudgetPeriod;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    fn sample_state() -> PersistedState {
        PersistedState {
            transactions: vec![Transaction {
                id: "t1".to_string(),
                amount: 50000.0,
                description: "Lunch".to_string(),
                category: "Food".to_string(),
                date: ts(12, 30, 5),
                kind: TransactionKind::Expense,
                emotion: Some(Emotion::Happy),
                tags: vec!["eating-out".to_string()],
            }],
            budgets: vec![Budget {
                id: "b1".to_string(),
                category: "Food".to_string(),
                limit: 2_000_000.0,
                spent: 1_200_000.0,
                period: BudgetPeriod::Monthly,
            }],
            goals: vec![Goal {
                id: "g1".to_string(),
                name: "Emergency Fund".to_string(),
                target_amount: 10_000_000.0,
                current_amount: 3_500_000.0,
                deadline: ts(0, 0, 0),
                category: "Emergency".to_string(),
                priority: GoalPriority::High,
            }],
            social_circles: vec![SocialCircle {
                id: "c1".to_string(),
                name: "Savings Squad".to_string(),
                members: vec![CircleMember {
                    id: "m1".to_string(),
                    name: "Ana".to_string(),
                }],
                challenges: vec![Challenge {
                    id: "ch1".to_string(),
                    title: "No-Spend Weekend".to_string(),
                    description: "Spend nothing on entertainment".to_string(),
                    start_date: ts(8, 0, 0),
                    end_date: ts(20, 0, 0),
                    participants: vec!["m1".to_string()],
                }],
            }],
            ai_companion: AiCompanion {
                personality: Personality::Analytical,
                messages: vec![AiMessage {
                    id: "msg1".to_string(),
                    role: MessageRole::Assistant,
                    content: "Your top category is Food.".to_string(),
                    timestamp: ts(13, 0, 1),
                    kind: Some(MessageKind::Suggestion),
                    sync: SyncStatus::Confirmed,
                }],
            },
        }
    }

    #[test]
    fn test_round_trip_preserves_state() {
        let state = sample_state();
        let restored = deserialize(serialize(&state));
        assert_eq!(restored, state);
    }

    #[test]
    fn test_round_trip_truncates_subsecond_precision() {
        let mut state = sample_state();
        state.transactions[0].date = Utc
            .with_ymd_and_hms(2026, 3, 14, 12, 30, 5)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(750))
            .unwrap();
        let restored = deserialize(serialize(&state));
        assert_eq!(restored.transactions[0].date, ts(12, 30, 5));
    }

    #[test]
    fn test_dates_stored_as_rfc3339_strings() {
        let stored = serialize(&sample_state());
        assert_eq!(stored.transactions[0].date, "2026-03-14T12:30:05Z");
        assert_eq!(stored.goals[0].deadline, "2026-03-14T00:00:00Z");
        assert_eq!(
            stored.social_circles[0].challenges[0].start_date,
            "2026-03-14T08:00:00Z"
        );
        assert_eq!(
            stored.ai_companion.messages[0].timestamp,
            "2026-03-14T13:00:01Z"
        );
    }

    #[test]
    fn test_unparsable_date_degrades_to_now() {
        let mut stored = serialize(&sample_state());
        stored.transactions[0].date = "not-a-date".to_string();
        stored.goals[0].deadline = String::new();

        let before = Utc::now();
        let restored = deserialize(stored);
        let after = Utc::now();

        assert!(restored.transactions[0].date >= before);
        assert!(restored.transactions[0].date <= after);
        assert!(restored.goals[0].deadline >= before);
        assert!(restored.goals[0].deadline <= after);
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let state = deserialize(serde_json::from_str::<StoredState>("{}").unwrap());
        assert!(state.transactions.is_empty());
        assert!(state.budgets.is_empty());
        assert!(state.goals.is_empty());
        assert!(state.social_circles.is_empty());
        assert!(state.ai_companion.messages.is_empty());
        assert_eq!(state.ai_companion.personality, Personality::Supportive);
    }

    #[test]
    fn test_partial_json_keeps_present_collections() {
        let raw = r#"{
            "budgets": [
                {"id": "b", "category": "Food", "limit": 100.0, "period": "weekly"}
            ]
        }"#;
        let state = deserialize(serde_json::from_str::<StoredState>(raw).unwrap());
        assert_eq!(state.budgets.len(), 1);
        assert_eq!(state.budgets[0].spent, 0.0);
        assert!(state.transactions.is_empty());
    }

    #[test]
    fn test_stored_budget_spent_survives_round_trip() {
        // The stored value is carried verbatim even though display recomputes it.
        let state = sample_state();
        let restored = deserialize(serialize(&state));
        assert_eq!(restored.budgets[0].spent, 1_200_000.0);
    }

    #[test]
    fn test_message_sync_flag_defaults_to_pending() {
        let raw = r#"{
            "ai_companion": {
                "personality": "strict",
                "messages": [
                    {"id": "m", "role": "user", "content": "hi", "timestamp": "2026-01-01T00:00:00Z"}
                ]
            }
        }"#;
        let state = deserialize(serde_json::from_str::<StoredState>(raw).unwrap());
        assert_eq!(state.ai_companion.messages[0].sync, SyncStatus::Pending);
        assert_eq!(state.ai_companion.personality, Personality::Strict);
    }
}
