//! Structured document extraction service client
//!
//! Sends a base64 image to a Document AI style `:process` endpoint and returns
//! the recognized text plus typed entities. When client credentials are
//! configured, a bearer token is obtained with the OAuth2 client-credentials
//! grant and cached in the [`RequestContext`] until it expires.

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::context::{CachedToken, RequestContext};
use crate::error::{Error, Result};
use crate::extraction::Entity;
use crate::retry::with_timeout;
use crate::settings::ExtractionSettings;

#[derive(Debug, Clone)]
struct Credentials {
    token_url: String,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Clone)]
pub struct DocumentAiClient {
    endpoint: String,
    credentials: Option<Credentials>,
}

/// What the service recognized in one document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProcessedDocument {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    document: ProcessedDocument,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_ttl")]
    expires_in: u64,
}

fn default_token_ttl() -> u64 {
    3600
}

impl DocumentAiClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, token_url: &str, client_id: &str, client_secret: &str) -> Self {
        self.credentials = Some(Credentials {
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        });
        self
    }

    /// None when no endpoint is configured
    pub fn from_settings(settings: &ExtractionSettings) -> Option<Self> {
        let client = Self::new(settings.document_ai_url.as_deref()?);
        match (
            settings.token_url.as_deref(),
            settings.client_id.as_deref(),
            settings.client_secret.as_deref(),
        ) {
            (Some(url), Some(id), Some(secret)) => Some(client.with_credentials(url, id, secret)),
            _ => Some(client),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one image through the extraction service
    ///
    /// The token fetch, request and body read share one `ai_timeout` budget.
    pub async fn process(
        &self,
        ctx: &RequestContext,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ProcessedDocument> {
        if image.is_empty() {
            return Err(Error::InvalidData("Empty image".into()));
        }

        let body = json!({
            "rawDocument": {
                "content": base64::engine::general_purpose::STANDARD.encode(image),
                "mimeType": mime_type,
            }
        });

        with_timeout(ctx.settings().ai_timeout, self.exchange(ctx, &body)).await
    }

    async fn exchange(&self, ctx: &RequestContext, body: &serde_json::Value) -> Result<ProcessedDocument> {
        let mut request = ctx.http().post(&self.endpoint).json(body);
        if let Some(token) = self.bearer_token(ctx).await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 {
                ctx.invalidate_token().await;
            }
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Document extraction request failed");
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ProcessResponse = response.json().await?;
        debug!(
            entities = parsed.document.entities.len(),
            text_len = parsed.document.text.len(),
            "Document extraction succeeded"
        );
        Ok(parsed.document)
    }

    async fn bearer_token(&self, ctx: &RequestContext) -> Result<Option<String>> {
        let Some(creds) = self.credentials.as_ref() else {
            return Ok(None);
        };

        let token = ctx
            .access_token(move || async move {
                let response = ctx
                    .http()
                    .post(&creds.token_url)
                    .form(&TokenRequest {
                        grant_type: "client_credentials",
                        client_id: &creds.client_id,
                        client_secret: &creds.client_secret,
                    })
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::Api { status, body });
                }

                let token: TokenResponse = response.json().await?;
                Ok(CachedToken::new(
                    token.access_token,
                    Duration::from_secs(token.expires_in),
                ))
            })
            .await?;

        Ok(Some(token))
    }
}
