//! Mock backend for testing
//!
//! Replies come from a scripted queue first; when the queue is empty each
//! prompt gets a predictable heuristic answer. Useful for unit tests and for
//! running the CLI/server without a model server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::error::{Error, Result};
use crate::prompts::PromptId;

use super::{AIBackend, PromptVars};

/// One scripted reply: model text, or an upstream HTTP status to fail with
pub type MockReply = std::result::Result<String, u16>;

#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true (and calls succeed)
    pub healthy: bool,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    calls: Arc<Mutex<Vec<PromptId>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every call fails with a 503
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Queue replies consumed in order by subsequent calls
    pub fn with_script(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(replies);
        }
        self
    }

    /// Prompts requested so far, in call order
    pub fn calls(&self) -> Vec<PromptId> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn respond(&self, prompt: PromptId, vars: &PromptVars<'_>) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(prompt);
        }

        if !self.healthy {
            return Err(Error::Api {
                status: 503,
                body: "mock backend unavailable".into(),
            });
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match scripted {
            Some(Ok(text)) => Ok(text),
            Some(Err(status)) => Err(Error::Api {
                status,
                body: "scripted failure".into(),
            }),
            None => Ok(default_reply(prompt, vars)),
        }
    }
}

/// Heuristic reply for each prompt when nothing is scripted
fn default_reply(prompt: PromptId, vars: &PromptVars<'_>) -> String {
    let var = |name: &str| vars.get(name).copied().unwrap_or_default();

    match prompt {
        PromptId::GenerateSchema => {
            let names = listed_names(var("variables"));
            let dynamic: Vec<&str> = names
                .iter()
                .copied()
                .filter(|n| n.contains("summary") || n.contains("description"))
                .collect();
            let required: Vec<&str> = names
                .iter()
                .copied()
                .filter(|n| !dynamic.contains(n))
                .collect();
            let tables: Vec<&str> = if var("has_expense_table") == "true" {
                vec!["expenses"]
            } else {
                Vec::new()
            };
            json!({
                "requiredFields": required,
                "dynamicContent": dynamic,
                "dataStructure": {
                    "tables": tables,
                    "dynamicTables": [],
                    "singleValues": required,
                }
            })
            .to_string()
        }
        PromptId::GenerateContent => {
            let content: serde_json::Map<String, serde_json::Value> = listed_names(var("fields"))
                .into_iter()
                .map(|name| (name.to_string(), json!(format!("Generated text for {}.", name))))
                .collect();
            serde_json::Value::Object(content).to_string()
        }
        PromptId::DescribeReceipt => {
            format!(
                "Business expense at {} for {} {}.",
                var("vendor"),
                var("amount"),
                var("currency")
            )
        }
        PromptId::ExtractReceipt => json!({
            "vendor": "Mock Cafe",
            "amount": 12.5,
            "currency": "USD",
            "date": var("today"),
            "items": [{"name": "Coffee", "quantity": 2, "price": 6.25}],
            "location": "Austin, TX",
            "expenseType": "meals",
            "total": 12.5,
            "confidence": 0.9
        })
        .to_string(),
        PromptId::ReadOdometer => json!({
            "reading": 12345.6,
            "date": var("today"),
            "confidence": 0.9
        })
        .to_string(),
    }
}

/// Names from a bulleted list such as `- trip.name (string)`
fn listed_names(list: &str) -> Vec<&str> {
    list.lines()
        .filter_map(|line| line.trim().strip_prefix("- "))
        .filter_map(|rest| rest.split_whitespace().next())
        .collect()
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate_text(&self, prompt: PromptId, vars: &PromptVars<'_>) -> Result<String> {
        self.respond(prompt, vars)
    }

    async fn describe_image(
        &self,
        prompt: PromptId,
        vars: &PromptVars<'_>,
        image: &[u8],
        _mime_type: &str,
    ) -> Result<String> {
        if image.is_empty() {
            return Err(Error::InvalidData("Empty image".into()));
        }
        self.respond(prompt, vars)
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
