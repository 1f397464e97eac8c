//! The in-memory application store: single source of truth for the active
//! user's domain data.
//!
//! Every mutation updates memory synchronously, then fires a best-effort
//! write of the full state to the per-user namespace. A storage failure is
//! logged and swallowed, never rolled back: responsiveness wins over
//! durability here. Chat messages are the one networked mutation: they are
//! appended optimistically and pushed to the chat-history backend, and a
//! remote failure only marks the message `failed` locally.

use anyhow::{Result, bail};
use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::codec::PersistedState;
use crate::health::compute_health_score;
use crate::models::{
    AiMessage, Budget, BudgetPeriod, Challenge, CircleMember, Goal, MessageKind, MessageRole,
    NewChallenge, NewGoal, NewTransaction, Personality, Preferences, SocialCircle, SyncStatus,
    Transaction, UpdateTransaction, User, validate_amount, validate_budget_limit,
    validate_goal_amounts,
};
use crate::storage::{
    KeyValueStore, clear_session, load_session, load_user_data, save_session, save_user_data,
};

/// Maximum number of prior turns supplied to the AI provider per call.
pub const MAX_HISTORY_TURNS: usize = 10;

/// Minimal user record returned by the auth gateway.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
}

/// A chat message as the history backend returns it.
#[derive(Debug, Clone)]
pub struct RemoteMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: String,
}

pub trait AuthGateway {
    fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthUser>;
    fn login(&self, email: &str, password: &str) -> Result<AuthUser>;
}

pub trait ChatHistoryGateway {
    fn list_messages(&self, user_id: &str) -> Result<Vec<RemoteMessage>>;
    fn append_message(&self, user_id: &str, role: MessageRole, content: &str) -> Result<()>;
}

pub trait AiProvider {
    fn generate(&self, message: &str, history: &[AiMessage]) -> Result<String>;
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// True when `date` falls in the same budget period window as `now`.
#[must_use]
pub fn in_current_period(date: DateTime<Utc>, now: DateTime<Utc>, period: BudgetPeriod) -> bool {
    match period {
        BudgetPeriod::Weekly => date.iso_week() == now.iso_week(),
        BudgetPeriod::Monthly => date.year() == now.year() && date.month() == now.month(),
        BudgetPeriod::Yearly => date.year() == now.year(),
    }
}

pub struct AppStore {
    user: Option<User>,
    state: PersistedState,
    storage: Box<dyn KeyValueStore>,
}

impl AppStore {
    /// Open a store over the given storage, resuming a persisted session
    /// if one exists.
    pub fn open(storage: Box<dyn KeyValueStore>) -> Result<Self> {
        let mut store = Self {
            user: None,
            state: PersistedState::default(),
            storage,
        };
        if let Some(user) = load_session(store.storage.as_ref()) {
            store.state = load_user_data(store.storage.as_ref(), &user.id)?;
            store.user = Some(user);
        }
        Ok(store)
    }

    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.state.transactions
    }

    #[must_use]
    pub fn budgets(&self) -> &[Budget] {
        &self.state.budgets
    }

    #[must_use]
    pub fn goals(&self) -> &[Goal] {
        &self.state.goals
    }

    #[must_use]
    pub fn social_circles(&self) -> &[SocialCircle] {
        &self.state.social_circles
    }

    #[must_use]
    pub fn personality(&self) -> Personality {
        self.state.ai_companion.personality
    }

    #[must_use]
    pub fn messages(&self) -> &[AiMessage] {
        &self.state.ai_companion.messages
    }

    fn require_user(&self) -> Result<&User> {
        match &self.user {
            Some(user) => Ok(user),
            None => bail!("No active session. Log in first."),
        }
    }

    /// Best-effort write of the full state to the user's namespace.
    fn persist(&self) {
        if let Some(user) = &self.user {
            if let Err(e) = save_user_data(self.storage.as_ref(), &user.id, &self.state) {
                eprintln!("Warning: failed to persist state: {e:#}");
            }
        }
    }

    fn persist_session(&self) {
        if let Some(user) = &self.user {
            if let Err(e) = save_session(self.storage.as_ref(), user) {
                eprintln!("Warning: failed to persist session: {e:#}");
            }
        }
    }

    // --- Session lifecycle ---

    pub fn login(
        &mut self,
        auth: &dyn AuthGateway,
        chat: &dyn ChatHistoryGateway,
        email: &str,
        password: &str,
    ) -> Result<User> {
        let authed = auth.login(email, password)?;
        self.activate(authed, email, chat)
    }

    pub fn register(
        &mut self,
        auth: &dyn AuthGateway,
        chat: &dyn ChatHistoryGateway,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User> {
        crate::models::validate_registration(name, email, password)?;
        let authed = auth.register(name, email, password)?;
        self.activate(authed, email, chat)
    }

    /// Anonymous -> Authenticated transition: persist the session record,
    /// load the user's namespaced data, then fetch the server-side chat
    /// history and replace the in-memory message list. A history fetch
    /// failure is logged and leaves the local list untouched.
    fn activate(
        &mut self,
        authed: AuthUser,
        email: &str,
        chat: &dyn ChatHistoryGateway,
    ) -> Result<User> {
        self.state = load_user_data(self.storage.as_ref(), &authed.id)?;

        let mut user = User {
            id: authed.id,
            name: authed.name,
            email: email.to_string(),
            financial_health_score: 75,
            monthly_income: 0.0,
            preferences: Preferences {
                ai_personality: self.state.ai_companion.personality,
                ..Preferences::default()
            },
        };
        user.financial_health_score = self.compute_score();
        save_session(self.storage.as_ref(), &user)?;
        self.user = Some(user.clone());

        match chat.list_messages(&user.id) {
            Ok(remote) => {
                self.state.ai_companion.messages = remote
                    .into_iter()
                    .map(|m| AiMessage {
                        id: new_id(),
                        role: m.role,
                        content: m.content,
                        timestamp: DateTime::parse_from_rfc3339(&m.timestamp)
                            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
                        kind: None,
                        sync: SyncStatus::Confirmed,
                    })
                    .collect();
                self.persist();
            }
            Err(e) => {
                eprintln!("Warning: could not fetch chat history: {e:#}");
            }
        }

        Ok(user)
    }

    /// Authenticated -> Anonymous: clears the session record and resets
    /// memory. The user's namespaced data stays on disk for the next login.
    pub fn logout(&mut self) {
        if let Err(e) = clear_session(self.storage.as_ref()) {
            eprintln!("Warning: failed to clear session: {e:#}");
        }
        self.user = None;
        self.state = PersistedState::default();
    }

    // --- Transactions ---

    pub fn add_transaction(&mut self, new: NewTransaction) -> Result<Transaction> {
        self.require_user()?;
        validate_amount(new.amount)?;
        if new.category.trim().is_empty() {
            bail!("Category must not be empty");
        }
        let transaction = Transaction {
            id: new_id(),
            amount: new.amount,
            description: new.description,
            category: new.category,
            date: new.date,
            kind: new.kind,
            emotion: new.emotion,
            tags: new.tags,
        };
        self.state.transactions.push(transaction.clone());
        self.refresh_health();
        self.persist();
        Ok(transaction)
    }

    pub fn update_transaction(&mut self, id: &str, update: UpdateTransaction) -> Result<Transaction> {
        self.require_user()?;
        if let Some(amount) = update.amount {
            validate_amount(amount)?;
        }
        let Some(transaction) = self.state.transactions.iter_mut().find(|t| t.id == id) else {
            bail!("Transaction '{id}' not found");
        };
        if let Some(amount) = update.amount {
            transaction.amount = amount;
        }
        if let Some(description) = update.description {
            transaction.description = description;
        }
        if let Some(category) = update.category {
            transaction.category = category;
        }
        if let Some(date) = update.date {
            transaction.date = date;
        }
        if let Some(kind) = update.kind {
            transaction.kind = kind;
        }
        if let Some(emotion) = update.emotion {
            transaction.emotion = emotion;
        }
        let updated = transaction.clone();
        self.refresh_health();
        self.persist();
        Ok(updated)
    }

    pub fn delete_transaction(&mut self, id: &str) -> Result<bool> {
        self.require_user()?;
        let before = self.state.transactions.len();
        self.state.transactions.retain(|t| t.id != id);
        let removed = self.state.transactions.len() < before;
        if removed {
            self.refresh_health();
            self.persist();
        }
        Ok(removed)
    }

    // --- Budgets ---

    pub fn add_budget(&mut self, category: &str, limit: f64, period: BudgetPeriod) -> Result<Budget> {
        self.require_user()?;
        validate_budget_limit(limit)?;
        if category.trim().is_empty() {
            bail!("Category must not be empty");
        }
        if let Some(existing) = self
            .state
            .budgets
            .iter_mut()
            .find(|b| b.category == category && b.period == period)
        {
            existing.limit = limit;
            let updated = existing.clone();
            self.refresh_health();
            self.persist();
            return Ok(updated);
        }
        let budget = Budget {
            id: new_id(),
            category: category.to_string(),
            limit,
            spent: 0.0,
            period,
        };
        self.state.budgets.push(budget.clone());
        self.refresh_health();
        self.persist();
        Ok(budget)
    }

    pub fn delete_budget(&mut self, id: &str) -> Result<bool> {
        self.require_user()?;
        let before = self.state.budgets.len();
        self.state.budgets.retain(|b| b.id != id);
        let removed = self.state.budgets.len() < before;
        if removed {
            self.refresh_health();
            self.persist();
        }
        Ok(removed)
    }

    /// Spend against a budget, always recomputed from same-category expense
    /// transactions in the current period window. The stored `spent` field
    /// is never consulted.
    #[must_use]
    pub fn budget_spent(&self, budget: &Budget) -> f64 {
        self.budget_spent_at(budget, Utc::now())
    }

    #[must_use]
    pub fn budget_spent_at(&self, budget: &Budget, now: DateTime<Utc>) -> f64 {
        self.state
            .transactions
            .iter()
            .filter(|t| {
                t.kind == crate::models::TransactionKind::Expense
                    && t.category == budget.category
                    && in_current_period(t.date, now, budget.period)
            })
            .map(|t| t.amount)
            .sum()
    }

    #[must_use]
    pub fn overspent_budget_count(&self) -> usize {
        self.state
            .budgets
            .iter()
            .filter(|b| self.budget_spent(b) > b.limit)
            .count()
    }

    // --- Goals ---

    pub fn add_goal(&mut self, new: NewGoal) -> Result<Goal> {
        self.require_user()?;
        validate_goal_amounts(new.target_amount, new.current_amount)?;
        if new.name.trim().is_empty() {
            bail!("Goal name must not be empty");
        }
        let goal = Goal {
            id: new_id(),
            name: new.name,
            target_amount: new.target_amount,
            current_amount: new.current_amount,
            deadline: new.deadline,
            category: new.category,
            priority: new.priority,
        };
        self.state.goals.push(goal.clone());
        self.refresh_health();
        self.persist();
        Ok(goal)
    }

    /// Quick-add funds to a goal. The stored amount is left unclamped;
    /// only the displayed progress caps at 100%.
    pub fn fund_goal(&mut self, id: &str, amount: f64) -> Result<Goal> {
        self.require_user()?;
        validate_amount(amount)?;
        let Some(goal) = self.state.goals.iter_mut().find(|g| g.id == id) else {
            bail!("Goal '{id}' not found");
        };
        goal.current_amount += amount;
        let updated = goal.clone();
        self.refresh_health();
        self.persist();
        Ok(updated)
    }

    pub fn delete_goal(&mut self, id: &str) -> Result<bool> {
        self.require_user()?;
        let before = self.state.goals.len();
        self.state.goals.retain(|g| g.id != id);
        let removed = self.state.goals.len() < before;
        if removed {
            self.refresh_health();
            self.persist();
        }
        Ok(removed)
    }

    /// Display progress, clamped to 100%.
    #[must_use]
    pub fn goal_progress_pct(goal: &Goal) -> f64 {
        if goal.target_amount <= 0.0 {
            return 0.0;
        }
        (goal.current_amount / goal.target_amount * 100.0).clamp(0.0, 100.0)
    }

    // --- Social circles ---

    pub fn add_social_circle(&mut self, name: &str, member_names: &[String]) -> Result<SocialCircle> {
        let user = self.require_user()?;
        if name.trim().is_empty() {
            bail!("Circle name must not be empty");
        }
        let mut members = vec![CircleMember {
            id: user.id.clone(),
            name: user.name.clone(),
        }];
        members.extend(member_names.iter().map(|n| CircleMember {
            id: new_id(),
            name: n.clone(),
        }));
        let circle = SocialCircle {
            id: new_id(),
            name: name.to_string(),
            members,
            challenges: Vec::new(),
        };
        self.state.social_circles.push(circle.clone());
        self.persist();
        Ok(circle)
    }

    pub fn add_challenge(&mut self, circle_id: &str, new: NewChallenge) -> Result<Challenge> {
        self.require_user()?;
        if new.title.trim().is_empty() {
            bail!("Challenge title must not be empty");
        }
        if new.end_date < new.start_date {
            bail!("Challenge end date must not be before its start date");
        }
        let Some(circle) = self
            .state
            .social_circles
            .iter_mut()
            .find(|c| c.id == circle_id)
        else {
            bail!("Circle '{circle_id}' not found");
        };
        let participants = if new.participants.is_empty() {
            circle.members.iter().map(|m| m.id.clone()).collect()
        } else {
            new.participants
        };
        let challenge = Challenge {
            id: new_id(),
            title: new.title,
            description: new.description,
            start_date: new.start_date,
            end_date: new.end_date,
            participants,
        };
        circle.challenges.push(challenge.clone());
        self.persist();
        Ok(challenge)
    }

    // --- Settings ---

    pub fn set_personality(&mut self, personality: Personality) -> Result<()> {
        self.require_user()?;
        self.state.ai_companion.personality = personality;
        if let Some(user) = &mut self.user {
            user.preferences.ai_personality = personality;
        }
        self.persist_session();
        self.persist();
        Ok(())
    }

    pub fn update_preferences(&mut self, preferences: Preferences) -> Result<()> {
        self.require_user()?;
        self.state.ai_companion.personality = preferences.ai_personality;
        if let Some(user) = &mut self.user {
            user.preferences = preferences;
        }
        self.persist_session();
        self.persist();
        Ok(())
    }

    pub fn set_monthly_income(&mut self, income: f64) -> Result<()> {
        self.require_user()?;
        validate_amount(income)?;
        if let Some(user) = &mut self.user {
            user.monthly_income = income;
        }
        self.persist_session();
        Ok(())
    }

    // --- AI companion ---

    /// Send a chat message: optimistic local append, best-effort remote
    /// persistence, then an AI round-trip with the most recent prior turns.
    /// A provider failure surfaces as a visible assistant-role message, not
    /// an error; the optimistically appended user message is never
    /// retracted.
    pub fn send_chat_message(
        &mut self,
        ai: &dyn AiProvider,
        chat: &dyn ChatHistoryGateway,
        content: &str,
    ) -> Result<AiMessage> {
        let user_id = self.require_user()?.id.clone();
        if content.trim().is_empty() {
            bail!("Message must not be empty");
        }

        let start = self
            .state
            .ai_companion
            .messages
            .len()
            .saturating_sub(MAX_HISTORY_TURNS);
        let history: Vec<AiMessage> = self.state.ai_companion.messages[start..].to_vec();

        self.append_local(MessageRole::User, content.to_string(), None);
        self.push_remote(chat, &user_id, MessageRole::User, content);
        self.persist();

        let assistant = match ai.generate(content, &history) {
            Ok(reply) => {
                let mut msg = self.append_local(MessageRole::Assistant, reply, None);
                let content = msg.content.clone();
                msg.sync = self.push_remote(chat, &user_id, MessageRole::Assistant, &content);
                msg
            }
            Err(e) => {
                eprintln!("Warning: AI provider failed: {e:#}");
                self.append_local(
                    MessageRole::Assistant,
                    format!("I couldn't reach the AI service ({e}). Your message is saved; please try again later."),
                    Some(MessageKind::Warning),
                )
            }
        };
        self.persist();
        Ok(assistant)
    }

    /// Append a locally generated companion tip (offline fallback).
    pub fn add_scripted_tip(&mut self) -> Result<AiMessage> {
        self.require_user()?;
        let goal_progress: Vec<f64> = self.state.goals.iter().map(Self::goal_progress_pct).collect();
        let (content, kind) = crate::models::scripted_tip(
            self.state.ai_companion.personality,
            &self.state.transactions,
            self.overspent_budget_count(),
            &goal_progress,
        );
        let msg = self.append_local(MessageRole::Assistant, content, Some(kind));
        self.persist();
        Ok(msg)
    }

    fn append_local(
        &mut self,
        role: MessageRole,
        content: String,
        kind: Option<MessageKind>,
    ) -> AiMessage {
        let message = AiMessage {
            id: new_id(),
            role,
            content,
            timestamp: Utc::now(),
            kind,
            sync: SyncStatus::Pending,
        };
        self.state.ai_companion.messages.push(message.clone());
        message
    }

    /// Push the most recent local message to the history backend and flag
    /// it with the outcome. Returns the flag for callers holding a clone.
    fn push_remote(
        &mut self,
        chat: &dyn ChatHistoryGateway,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> SyncStatus {
        let sync = match chat.append_message(user_id, role, content) {
            Ok(()) => SyncStatus::Confirmed,
            Err(e) => {
                eprintln!("Warning: failed to persist chat message remotely: {e:#}");
                SyncStatus::Failed
            }
        };
        if let Some(last) = self.state.ai_companion.messages.last_mut() {
            last.sync = sync;
        }
        sync
    }

    // --- Derived ---

    fn compute_score(&self) -> i64 {
        let budgets: Vec<(f64, f64)> = self
            .state
            .budgets
            .iter()
            .map(|b| (b.limit, self.budget_spent(b)))
            .collect();
        let goals: Vec<(f64, f64)> = self
            .state
            .goals
            .iter()
            .map(|g| (g.current_amount, g.target_amount))
            .collect();
        compute_health_score(&budgets, &goals)
    }

    fn refresh_health(&mut self) {
        let score = self.compute_score();
        if let Some(user) = &mut self.user {
            user.financial_health_score = score;
        }
        self.persist_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use crate::storage::{MemoryStore, user_data_key};
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct MockAuth;

    impl AuthGateway for MockAuth {
        fn register(&self, name: &str, _email: &str, _password: &str) -> Result<AuthUser> {
            Ok(AuthUser {
                id: "user-1".to_string(),
                name: name.to_string(),
            })
        }

        fn login(&self, _email: &str, _password: &str) -> Result<AuthUser> {
            Ok(AuthUser {
                id: "user-1".to_string(),
                name: "Ana".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct MockChat {
        remote: Vec<RemoteMessage>,
        fail_list: bool,
        fail_append: bool,
        appended: Mutex<Vec<(String, String)>>,
    }

    impl ChatHistoryGateway for MockChat {
        fn list_messages(&self, _user_id: &str) -> Result<Vec<RemoteMessage>> {
            if self.fail_list {
                bail!("history backend unreachable");
            }
            Ok(self.remote.clone())
        }

        fn append_message(&self, _user_id: &str, role: MessageRole, content: &str) -> Result<()> {
            if self.fail_append {
                bail!("history backend returned 500");
            }
            self.appended
                .lock()
                .unwrap()
                .push((role.as_str().to_string(), content.to_string()));
            Ok(())
        }
    }

    struct MockAi {
        reply: Option<String>,
        seen_history_len: Mutex<Option<usize>>,
    }

    impl MockAi {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                seen_history_len: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                seen_history_len: Mutex::new(None),
            }
        }
    }

    impl AiProvider for MockAi {
        fn generate(&self, _message: &str, history: &[AiMessage]) -> Result<String> {
            *self.seen_history_len.lock().unwrap() = Some(history.len());
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => bail!("upstream AI failure"),
            }
        }
    }

    fn logged_in_store() -> AppStore {
        let mut store = AppStore::open(Box::new(MemoryStore::new())).unwrap();
        store
            .login(&MockAuth, &MockChat::default(), "ana@example.com", "secret1")
            .unwrap();
        store
    }

    fn expense_on(store: &mut AppStore, category: &str, amount: f64, date: DateTime<Utc>) {
        store
            .add_transaction(NewTransaction {
                amount,
                description: String::new(),
                category: category.to_string(),
                date,
                kind: TransactionKind::Expense,
                emotion: None,
                tags: Vec::new(),
            })
            .unwrap();
    }

    #[test]
    fn test_anonymous_store_rejects_mutations() {
        let mut store = AppStore::open(Box::new(MemoryStore::new())).unwrap();
        assert!(!store.is_authenticated());
        let result = store.add_transaction(NewTransaction {
            amount: 10.0,
            description: String::new(),
            category: "Food".to_string(),
            date: Utc::now(),
            kind: TransactionKind::Expense,
            emotion: None,
            tags: Vec::new(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_login_establishes_session_and_defaults() {
        let store = logged_in_store();
        let user = store.current_user().unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.financial_health_score, 75);
        assert!(store.transactions().is_empty());
    }

    #[test]
    fn test_login_replaces_messages_with_server_history() {
        let mut store = AppStore::open(Box::new(MemoryStore::new())).unwrap();
        let chat = MockChat {
            remote: vec![
                RemoteMessage {
                    role: MessageRole::User,
                    content: "hello".to_string(),
                    timestamp: "2026-01-01T10:00:00Z".to_string(),
                },
                RemoteMessage {
                    role: MessageRole::Assistant,
                    content: "hi!".to_string(),
                    timestamp: "2026-01-01T10:00:05Z".to_string(),
                },
            ],
            ..MockChat::default()
        };
        store
            .login(&MockAuth, &chat, "ana@example.com", "secret1")
            .unwrap();

        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[0].sync, SyncStatus::Confirmed);
        assert_eq!(
            messages[0].timestamp,
            Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_history_fetch_failure_keeps_local_messages() {
        let backing = MemoryStore::new();
        // Seed the user's namespace with one local message.
        let mut state = PersistedState::default();
        state.ai_companion.messages.push(AiMessage {
            id: "local-1".to_string(),
            role: MessageRole::User,
            content: "offline note".to_string(),
            timestamp: Utc::now(),
            kind: None,
            sync: SyncStatus::Failed,
        });
        save_user_data(&backing, "user-1", &state).unwrap();

        let mut store = AppStore::open(Box::new(backing)).unwrap();
        let chat = MockChat {
            fail_list: true,
            ..MockChat::default()
        };
        store
            .login(&MockAuth, &chat, "ana@example.com", "pw")
            .unwrap();

        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].content, "offline note");
    }

    #[test]
    fn test_add_transaction_assigns_unique_ids_and_persists() {
        let mut store = logged_in_store();
        let now = Utc::now();
        expense_on(&mut store, "Food", 10.0, now);
        expense_on(&mut store, "Food", 20.0, now);

        let ids: Vec<&str> = store.transactions().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_update_and_delete_transaction() {
        let mut store = logged_in_store();
        expense_on(&mut store, "Food", 10.0, Utc::now());
        let id = store.transactions()[0].id.clone();

        let updated = store
            .update_transaction(
                &id,
                UpdateTransaction {
                    amount: Some(25.0),
                    category: Some("Groceries".to_string()),
                    ..UpdateTransaction::default()
                },
            )
            .unwrap();
        assert_eq!(updated.amount, 25.0);
        assert_eq!(updated.category, "Groceries");

        assert!(store.delete_transaction(&id).unwrap());
        assert!(!store.delete_transaction(&id).unwrap());
        assert!(store.transactions().is_empty());
    }

    #[test]
    fn test_budget_spent_is_recomputed_not_stored() {
        let mut store = logged_in_store();
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap();

        expense_on(&mut store, "Food", 50_000.0, Utc.with_ymd_and_hms(2026, 6, 10, 9, 0, 0).unwrap());
        expense_on(&mut store, "Food", 150_000.0, Utc.with_ymd_and_hms(2026, 6, 20, 9, 0, 0).unwrap());
        // Outside the current month: excluded.
        expense_on(&mut store, "Food", 999.0, Utc.with_ymd_and_hms(2026, 5, 30, 9, 0, 0).unwrap());
        // Other category: excluded.
        expense_on(&mut store, "Transportation", 777.0, now);

        let budget = store
            .add_budget("Food", 2_000_000.0, BudgetPeriod::Monthly)
            .unwrap();
        assert_eq!(budget.spent, 0.0); // stored value stays untouched
        assert_eq!(store.budget_spent_at(&budget, now), 200_000.0);
    }

    #[test]
    fn test_income_does_not_count_as_spend() {
        let mut store = logged_in_store();
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap();
        store
            .add_transaction(NewTransaction {
                amount: 1000.0,
                description: "Salary".to_string(),
                category: "Food".to_string(),
                date: now,
                kind: TransactionKind::Income,
                emotion: None,
                tags: Vec::new(),
            })
            .unwrap();
        let budget = store.add_budget("Food", 500.0, BudgetPeriod::Monthly).unwrap();
        assert_eq!(store.budget_spent_at(&budget, now), 0.0);
    }

    #[test]
    fn test_period_windows() {
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap(); // a Monday
        let same_week = Utc.with_ymd_and_hms(2026, 6, 17, 0, 0, 0).unwrap();
        let next_month = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let same_year = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let last_year = Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap();

        assert!(in_current_period(same_week, now, BudgetPeriod::Weekly));
        assert!(!in_current_period(next_month, now, BudgetPeriod::Weekly));
        assert!(in_current_period(same_week, now, BudgetPeriod::Monthly));
        assert!(!in_current_period(next_month, now, BudgetPeriod::Monthly));
        assert!(in_current_period(same_year, now, BudgetPeriod::Yearly));
        assert!(!in_current_period(last_year, now, BudgetPeriod::Yearly));
    }

    #[test]
    fn test_goal_fund_and_progress_clamp() {
        let mut store = logged_in_store();
        let goal = store
            .add_goal(NewGoal {
                name: "Emergency Fund".to_string(),
                target_amount: 1000.0,
                current_amount: 900.0,
                deadline: Utc::now(),
                category: "Emergency".to_string(),
                priority: crate::models::GoalPriority::High,
            })
            .unwrap();

        let funded = store.fund_goal(&goal.id, 300.0).unwrap();
        // Stored amount is unclamped; display clamps.
        assert_eq!(funded.current_amount, 1200.0);
        assert_eq!(AppStore::goal_progress_pct(&funded), 100.0);
    }

    #[test]
    fn test_optimistic_append_survives_failed_remote() {
        let mut store = logged_in_store();
        let chat = MockChat {
            fail_append: true,
            ..MockChat::default()
        };
        let ai = MockAi::replying("Here's a tip.");

        store.send_chat_message(&ai, &chat, "hi").unwrap();

        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "hi");
        // Remote append failed but the message stays, flagged.
        assert_eq!(messages[0].sync, SyncStatus::Failed);
        assert_eq!(messages[1].sync, SyncStatus::Failed);
    }

    #[test]
    fn test_chat_round_trip_confirms_both_sides() {
        let mut store = logged_in_store();
        let chat = MockChat::default();
        let ai = MockAi::replying("Track your food spending weekly.");

        let assistant = store.send_chat_message(&ai, &chat, "how do I save?").unwrap();
        assert_eq!(assistant.role, MessageRole::Assistant);
        assert_eq!(assistant.content, "Track your food spending weekly.");

        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.sync == SyncStatus::Confirmed));

        let appended = chat.appended.lock().unwrap();
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[0], ("user".to_string(), "how do I save?".to_string()));
    }

    #[test]
    fn test_ai_failure_appends_visible_assistant_message() {
        let mut store = logged_in_store();
        let chat = MockChat::default();
        let ai = MockAi::failing();

        let assistant = store.send_chat_message(&ai, &chat, "hello?").unwrap();
        assert_eq!(assistant.role, MessageRole::Assistant);
        assert_eq!(assistant.kind, Some(MessageKind::Warning));
        assert!(assistant.content.contains("try again"));

        // User message still visible before the error reply.
        assert_eq!(store.messages().len(), 2);
        assert_eq!(store.messages()[0].content, "hello?");
    }

    #[test]
    fn test_chat_history_trimmed_to_ten_turns() {
        let mut store = logged_in_store();
        let chat = MockChat::default();
        let ai = MockAi::replying("ok");

        for i in 0..8 {
            store
                .send_chat_message(&ai, &chat, &format!("message {i}"))
                .unwrap();
        }
        // 16 messages in memory now; the next call must see only 10.
        store.send_chat_message(&ai, &chat, "final").unwrap();
        assert_eq!(*ai.seen_history_len.lock().unwrap(), Some(10));
    }

    #[test]
    fn test_empty_chat_message_rejected() {
        let mut store = logged_in_store();
        let result = store.send_chat_message(&MockAi::replying("x"), &MockChat::default(), "   ");
        assert!(result.is_err());
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_logout_then_login_restores_saved_data() {
        let backing = Box::new(MemoryStore::new());
        let mut store = AppStore::open(backing).unwrap();
        store
            .login(&MockAuth, &MockChat::default(), "ana@example.com", "pw")
            .unwrap();

        expense_on(&mut store, "Food", 42.0, Utc::now());
        store.add_budget("Food", 500.0, BudgetPeriod::Monthly).unwrap();
        store
            .add_goal(NewGoal {
                name: "Trip".to_string(),
                target_amount: 100.0,
                current_amount: 10.0,
                deadline: Utc::now(),
                category: "Travel".to_string(),
                priority: crate::models::GoalPriority::Low,
            })
            .unwrap();
        store.add_social_circle("Squad", &["Ben".to_string()]).unwrap();
        store.set_personality(Personality::Strict).unwrap();

        store.logout();
        assert!(!store.is_authenticated());
        assert!(store.transactions().is_empty());
        assert_eq!(store.personality(), Personality::Supportive);

        store
            .login(&MockAuth, &MockChat::default(), "ana@example.com", "pw")
            .unwrap();
        assert_eq!(store.transactions().len(), 1);
        assert_eq!(store.budgets().len(), 1);
        assert_eq!(store.goals().len(), 1);
        assert_eq!(store.social_circles().len(), 1);
        assert_eq!(store.personality(), Personality::Strict);
    }

    #[test]
    fn test_login_writes_baseline_for_new_user() {
        let mut store = AppStore::open(Box::new(MemoryStore::new())).unwrap();
        store
            .login(&MockAuth, &MockChat::default(), "ana@example.com", "pw")
            .unwrap();
        // Internals: baseline must be written eagerly on first login.
        let raw = store.storage.get(&user_data_key("user-1")).unwrap();
        assert!(raw.is_some());
    }

    #[test]
    fn test_add_challenge_defaults_participants_to_members() {
        let mut store = logged_in_store();
        let circle = store
            .add_social_circle("Squad", &["Ben".to_string(), "Cleo".to_string()])
            .unwrap();

        let challenge = store
            .add_challenge(
                &circle.id,
                NewChallenge {
                    title: "No-Spend Weekend".to_string(),
                    description: "Spend nothing on entertainment".to_string(),
                    start_date: Utc.with_ymd_and_hms(2026, 6, 13, 0, 0, 0).unwrap(),
                    end_date: Utc.with_ymd_and_hms(2026, 6, 15, 0, 0, 0).unwrap(),
                    participants: Vec::new(),
                },
            )
            .unwrap();
        assert_eq!(challenge.participants.len(), 3);

        let bad_dates = store.add_challenge(
            &circle.id,
            NewChallenge {
                title: "Backwards".to_string(),
                description: String::new(),
                start_date: Utc.with_ymd_and_hms(2026, 6, 15, 0, 0, 0).unwrap(),
                end_date: Utc.with_ymd_and_hms(2026, 6, 13, 0, 0, 0).unwrap(),
                participants: Vec::new(),
            },
        );
        assert!(bad_dates.is_err());
    }

    #[test]
    fn test_health_score_tracks_mutations() {
        let mut store = logged_in_store();
        let now = Utc::now();

        store.add_budget("Food", 100.0, BudgetPeriod::Monthly).unwrap();
        let healthy = store.current_user().unwrap().financial_health_score;

        expense_on(&mut store, "Food", 250.0, now);
        let overspent = store.current_user().unwrap().financial_health_score;
        assert!(overspent < healthy);
    }

    #[test]
    fn test_budget_upsert_by_category_and_period() {
        let mut store = logged_in_store();
        store.add_budget("Food", 100.0, BudgetPeriod::Monthly).unwrap();
        store.add_budget("Food", 300.0, BudgetPeriod::Monthly).unwrap();
        assert_eq!(store.budgets().len(), 1);
        assert_eq!(store.budgets()[0].limit, 300.0);

        // Same category, different period is a separate budget.
        store.add_budget("Food", 80.0, BudgetPeriod::Weekly).unwrap();
        assert_eq!(store.budgets().len(), 2);
    }

    #[test]
    fn test_scripted_tip_appends_assistant_message() {
        let mut store = logged_in_store();
        let tip = store.add_scripted_tip().unwrap();
        assert_eq!(tip.role, MessageRole::Assistant);
        assert!(tip.kind.is_some());
        assert_eq!(store.messages().len(), 1);
    }

    /// Storage failures during mutation are swallowed: memory still updates.
    #[test]
    fn test_storage_failure_does_not_roll_back_memory() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        struct FlakyStore {
            inner: MemoryStore,
            fail_writes: Arc<AtomicBool>,
        }

        impl KeyValueStore for FlakyStore {
            fn get(&self, key: &str) -> Result<Option<String>> {
                self.inner.get(key)
            }
            fn set(&self, key: &str, value: &str) -> Result<()> {
                if self.fail_writes.load(Ordering::SeqCst) {
                    bail!("disk full");
                }
                self.inner.set(key, value)
            }
            fn remove(&self, key: &str) -> Result<()> {
                self.inner.remove(key)
            }
        }

        let fail_writes = Arc::new(AtomicBool::new(false));
        let flaky = Box::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_writes: Arc::clone(&fail_writes),
        });
        let mut store = AppStore::open(flaky).unwrap();
        store
            .login(&MockAuth, &MockChat::default(), "ana@example.com", "pw")
            .unwrap();

        fail_writes.store(true, Ordering::SeqCst);
        expense_on(&mut store, "Food", 10.0, Utc::now());
        assert_eq!(store.transactions().len(), 1);
    }
}
