//! HTTP client for the MoneyWise backend, implementing the store's gateway
//! traits the way the store expects to call them: synchronously, one
//! request per call, errors surfaced as messages.

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use moneywise_core::models::{MessageRole, parse_role};
use moneywise_core::store::{
    AiProvider, AuthGateway, AuthUser, ChatHistoryGateway, RemoteMessage,
};

use crate::gemini::ChatTurn;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    user: Option<WireUser>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
    rt: tokio::runtime::Handle,
}

impl BackendClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "moneywise-cli/{} (finance tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            rt: tokio::runtime::Handle::current(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    async fn auth_request(&self, endpoint: &str, body: serde_json::Value) -> Result<AuthUser> {
        let resp = self
            .client
            .post(self.url(endpoint))
            .json(&body)
            .send()
            .await
            .context("Failed to reach the MoneyWise backend")?;

        let status = resp.status();
        let data: AuthResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse backend response (HTTP {status})"))?;

        if !status.is_success() || !data.success {
            let message = data
                .error
                .unwrap_or_else(|| format!("Request failed (HTTP {status})"));
            bail!("{message}");
        }
        let user = data.user.context("Backend response is missing the user")?;
        Ok(AuthUser {
            id: user.id,
            name: user.name,
        })
    }

    pub async fn register_async(&self, name: &str, email: &str, password: &str) -> Result<AuthUser> {
        self.auth_request(
            "/api/register",
            serde_json::json!({ "name": name, "email": email, "password": password }),
        )
        .await
    }

    pub async fn login_async(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.auth_request(
            "/api/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn list_messages_async(&self, user_id: &str) -> Result<Vec<RemoteMessage>> {
        let resp = self
            .client
            .get(self.url("/api/chat/history"))
            .query(&[("user_id", user_id)])
            .send()
            .await
            .context("Failed to reach the MoneyWise backend")?;

        let status = resp.status();
        if !status.is_success() {
            let body: ErrorBody = resp.json().await.unwrap_or(ErrorBody { error: None });
            bail!(
                "{}",
                body.error
                    .unwrap_or_else(|| format!("History request failed (HTTP {status})"))
            );
        }

        let messages: Vec<WireMessage> = resp
            .json()
            .await
            .context("Failed to parse chat history response")?;
        Ok(messages
            .into_iter()
            .map(|m| RemoteMessage {
                role: parse_role(&m.role).unwrap_or(MessageRole::User),
                content: m.content,
                timestamp: m.timestamp,
            })
            .collect())
    }

    pub async fn append_message_async(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<()> {
        let resp = self
            .client
            .post(self.url("/api/chat/history"))
            .json(&serde_json::json!({
                "user_id": user_id,
                "role": role.as_str(),
                "content": content,
            }))
            .send()
            .await
            .context("Failed to reach the MoneyWise backend")?;

        let status = resp.status();
        if !status.is_success() {
            let body: ErrorBody = resp.json().await.unwrap_or(ErrorBody { error: None });
            bail!(
                "{}",
                body.error
                    .unwrap_or_else(|| format!("Message append failed (HTTP {status})"))
            );
        }
        Ok(())
    }

    pub async fn chat_async(&self, message: &str, history: &[ChatTurn]) -> Result<String> {
        let resp = self
            .client
            .post(self.url("/api/chat"))
            .json(&serde_json::json!({ "message": message, "history": history }))
            .send()
            .await
            .context("Failed to reach the MoneyWise backend")?;

        let status = resp.status();
        let data: ChatResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse chat response (HTTP {status})"))?;

        if !status.is_success() {
            bail!(
                "{}",
                data.error
                    .unwrap_or_else(|| format!("Chat request failed (HTTP {status})"))
            );
        }
        data.response.context("Chat response is missing the reply")
    }
}

impl AuthGateway for BackendClient {
    fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthUser> {
        self.rt.block_on(self.register_async(name, email, password))
    }

    fn login(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.rt.block_on(self.login_async(email, password))
    }
}

impl ChatHistoryGateway for BackendClient {
    fn list_messages(&self, user_id: &str) -> Result<Vec<RemoteMessage>> {
        self.rt.block_on(self.list_messages_async(user_id))
    }

    fn append_message(&self, user_id: &str, role: MessageRole, content: &str) -> Result<()> {
        self.rt
            .block_on(self.append_message_async(user_id, role, content))
    }
}

impl AiProvider for BackendClient {
    fn generate(
        &self,
        message: &str,
        history: &[moneywise_core::models::AiMessage],
    ) -> Result<String> {
        let turns: Vec<ChatTurn> = history
            .iter()
            .map(|m| ChatTurn {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();
        self.rt.block_on(self.chat_async(message, &turns))
    }
}
