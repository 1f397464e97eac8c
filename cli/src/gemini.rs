//! Client for the Generative Language API.
//!
//! Stateless per call: the caller supplies the message plus the relevant
//! conversation history every time. Request shaping lives in pure
//! functions so the trim and role rules are testable without a network.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use moneywise_core::store::AiProvider;

const GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const SYSTEM_INSTRUCTION: &str = "You are a specialized financial assistant for the MoneyWise \
app. Your goal is to help users with budgeting, savings, and personal finance questions. Be \
concise, polite, and helpful. Do not give investment advice. Focus on budgeting, saving money, \
tracking expenses, and financial planning.";

/// Maximum prior turns forwarded upstream per request.
pub const MAX_HISTORY_TURNS: usize = 10;

/// One prior conversation turn as callers hand it to the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct GenerateRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Map a turn to the upstream role name: anything non-user is `model`.
fn to_upstream_role(role: &str) -> &'static str {
    if role == "user" { "user" } else { "model" }
}

/// Shape the upstream `contents`: keep the most recent turns, drop leading
/// non-user turns (the upstream API requires history to start with a user
/// turn), then append the new message.
fn build_contents(message: &str, history: &[ChatTurn]) -> Vec<Content> {
    let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
    let mut turns = &history[start..];
    while let Some((first, rest)) = turns.split_first() {
        if to_upstream_role(&first.role) == "user" {
            break;
        }
        turns = rest;
    }

    let mut contents: Vec<Content> = turns
        .iter()
        .map(|t| Content {
            role: to_upstream_role(&t.role).to_string(),
            parts: vec![Part {
                text: t.content.clone(),
            }],
        })
        .collect();
    contents.push(Content {
        role: "user".to_string(),
        parts: vec![Part {
            text: message.to_string(),
        }],
    });
    contents
}

fn extract_reply(response: GenerateResponse) -> Result<String> {
    if let Some(err) = response.error {
        bail!("Generative Language API error: {}", err.message);
    }
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .context("Generative Language API returned no candidates")?;
    let text: String = candidate
        .content
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() {
        bail!("Generative Language API returned an empty reply");
    }
    Ok(text)
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    rt: tokio::runtime::Handle,
}

impl GeminiClient {
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
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
            client,
            api_key,
            rt: tokio::runtime::Handle::current(),
        }
    }

    pub async fn generate_async(&self, message: &str, history: &[ChatTurn]) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            bail!("AI service is not configured (set GEMINI_API_KEY)");
        };

        let request = GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents: build_contents(message, history),
        };

        let resp = self
            .client
            .post(GENERATE_URL)
            .query(&[("key", api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to reach the Generative Language API")?;

        let status = resp.status();
        let data: GenerateResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse AI response (HTTP {status})"))?;

        extract_reply(data)
    }
}

impl AiProvider for GeminiClient {
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
        self.rt.block_on(self.generate_async(message, &turns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> ChatTurn {
        ChatTurn {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_build_contents_appends_message_last() {
        let contents = build_contents("new question", &[turn("user", "old question")]);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[1].role, "user");
        assert_eq!(contents[1].parts[0].text, "new question");
    }

    #[test]
    fn test_assistant_role_maps_to_model() {
        let contents = build_contents("q", &[turn("user", "a"), turn("assistant", "b")]);
        assert_eq!(contents[0].role, "user");
        assert_eq!(contents[1].role, "model");
    }

    #[test]
    fn test_history_trimmed_to_most_recent_turns() {
        let history: Vec<ChatTurn> = (0..25)
            .map(|i| {
                turn(
                    if i % 2 == 0 { "user" } else { "assistant" },
                    &format!("turn {i}"),
                )
            })
            .collect();
        let contents = build_contents("latest", &history);
        // Last 10 turns start at an assistant turn, which gets dropped:
        // 9 history turns survive, plus the new message.
        assert_eq!(contents.len(), 10);
        assert_eq!(contents[0].parts[0].text, "turn 16");
        assert_eq!(contents[0].role, "user");
    }

    #[test]
    fn test_leading_assistant_turns_dropped() {
        let history = vec![
            turn("assistant", "welcome!"),
            turn("user", "hi"),
            turn("assistant", "hello"),
        ];
        let contents = build_contents("q", &history);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role, "user");
        assert_eq!(contents[0].parts[0].text, "hi");
    }

    #[test]
    fn test_all_assistant_history_collapses_to_message_only() {
        let history = vec![turn("assistant", "a"), turn("assistant", "b")];
        let contents = build_contents("q", &history);
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].parts[0].text, "q");
    }

    #[test]
    fn test_extract_reply_joins_parts() {
        let response = GenerateResponse {
            candidates: vec![Candidate {
                content: Content {
                    role: "model".to_string(),
                    parts: vec![
                        Part {
                            text: "Save 20% ".to_string(),
                        },
                        Part {
                            text: "of your income.".to_string(),
                        },
                    ],
                },
            }],
            error: None,
        };
        assert_eq!(extract_reply(response).unwrap(), "Save 20% of your income.");
    }

    #[test]
    fn test_extract_reply_surfaces_api_error() {
        let response = GenerateResponse {
            candidates: vec![],
            error: Some(ApiErrorBody {
                message: "quota exceeded".to_string(),
            }),
        };
        let err = extract_reply(response).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_extract_reply_rejects_empty() {
        let response = GenerateResponse {
            candidates: vec![],
            error: None,
        };
        assert!(extract_reply(response).is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_client_errors() {
        let client = GeminiClient::new(None);
        let err = client.generate_async("hi", &[]).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    // --- Integration test (hits the live API) ---

    #[tokio::test]
    #[ignore = "hits the Generative Language API"]
    async fn test_generate_live() {
        let key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY not set");
        let client = GeminiClient::new(Some(key));
        let reply = client
            .generate_async("Give me one short budgeting tip.", &[])
            .await
            .unwrap();
        assert!(!reply.is_empty());
    }
}
