//! Adapter that posts replies to an HTTP callback.

use async_trait::async_trait;
use serde_json::json;

use crate::core::ConversationId;
use crate::error::Result;
use crate::orchestrator::Adapter;

/// Body shape expected by the receiving end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    /// `{"conversation_id": ..., "text": ...}`
    Plain,
    /// Slash-command `response_url` payload.
    Slash,
}

pub struct CallbackAdapter {
    platform: String,
    http: reqwest::Client,
    url: Option<String>,
    format: ReplyFormat,
}

impl CallbackAdapter {
    pub fn new(
        platform: impl Into<String>,
        http: reqwest::Client,
        url: Option<String>,
        format: ReplyFormat,
    ) -> Self {
        Self {
            platform: platform.into(),
            http,
            url,
            format,
        }
    }

    pub fn payload(&self, conversation_id: &ConversationId, text: &str) -> serde_json::Value {
        match self.format {
            ReplyFormat::Plain => json!({
                "conversation_id": conversation_id,
                "text": text,
            }),
            ReplyFormat::Slash => json!({
                "response_type": "in_channel",
                "text": text,
            }),
        }
    }
}

#[async_trait]
impl Adapter for CallbackAdapter {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn send_reply(&self, conversation_id: &ConversationId, text: &str) -> Result<()> {
        let Some(url) = &self.url else {
            tracing::info!(
                conversation = %conversation_id,
                "No callback URL, reply dropped ({} chars)",
                text.len()
            );
            return Ok(());
        };

        self.http
            .post(url)
            .json(&self.payload(conversation_id, text))
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(conversation = %conversation_id, "Reply posted to callback");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_formats() {
        let id = ConversationId::for_chat("slack", "C1");
        let plain = CallbackAdapter::new("x", reqwest::Client::new(), None, ReplyFormat::Plain);
        assert_eq!(plain.payload(&id, "hi")["conversation_id"], "slack:C1");

        let slash = CallbackAdapter::new("x", reqwest::Client::new(), None, ReplyFormat::Slash);
        let body = slash.payload(&id, "hi");
        assert_eq!(body["response_type"], "in_channel");
        assert_eq!(body["text"], "hi");
    }

    #[tokio::test]
    async fn test_no_url_is_not_an_error() {
        let adapter = CallbackAdapter::new("x", reqwest::Client::new(), None, ReplyFormat::Plain);
        adapter
            .send_reply(&ConversationId::new("x:1"), "hi")
            .await
            .unwrap();
    }
}
