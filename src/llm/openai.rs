//! OpenAI-compatible chat model.

use super::LanguageModel;
use crate::agent::{Role, Turn};
use crate::config::ModelSettings;
use crate::error::{Result, ShabdaError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat model served by OpenAI or by a local Ollama server.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    /// Create a chat model from settings.
    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(settings)?,
            model: settings.resolved_model(),
            temperature: settings.temperature,
        })
    }

    /// Create a chat model around an existing client.
    pub fn with_client(
        client: async_openai::Client<async_openai::config::OpenAIConfig>,
        model: &str,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: 0.2,
        }
    }

    fn to_request_message(turn: &Turn) -> Result<ChatCompletionRequestMessage> {
        let message = match turn.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(turn.content.clone())
                .build()
                .map_err(|e| ShabdaError::OpenAI(e.to_string()))?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(turn.content.clone())
                .build()
                .map_err(|e| ShabdaError::OpenAI(e.to_string()))?
                .into(),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(turn.content.clone())
                .build()
                .map_err(|e| ShabdaError::OpenAI(e.to_string()))?
                .into(),
        };
        Ok(message)
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    #[instrument(skip(self, conversation), fields(model = %self.model, turns = conversation.len()))]
    async fn send(&self, conversation: &[Turn]) -> Result<String> {
        let messages = conversation
            .iter()
            .map(Self::to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| ShabdaError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ShabdaError::OpenAI(format!("Chat API error: {}", e)))?;

        if let Some(usage) = &response.usage {
            debug!(
                "Token usage: {} prompt, {} total",
                usage.prompt_tokens, usage.total_tokens
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ShabdaError::ClientProtocol("response has no choices".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::config::OpenAIConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response_body: serde_json::Value) -> (MockServer, OpenAIChatModel) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = OpenAIConfig::new()
            .with_api_key("test-key")
            .with_api_base(format!("{}/v1", mock_server.uri()));
        let client =
            crate::openai::create_client_with_timeout(config, Duration::from_secs(5)).unwrap();

        (mock_server, OpenAIChatModel::with_client(client, "mistral"))
    }

    fn completion(content: Option<&str>) -> serde_json::Value {
        json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1677652288,
            "model": "mistral",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 9,
                "total_tokens": 21
            }
        })
    }

    #[tokio::test]
    async fn test_send_returns_assistant_text() {
        let (_server, model) =
            setup_mock_server(completion(Some("Tool: search_web(query=\"Zingaat lyrics\")"))).await;

        let reply = model
            .send(&[
                Turn::new(Role::System, "instructions"),
                Turn::new(Role::User, "find lyrics for Zingaat"),
            ])
            .await
            .unwrap();

        assert_eq!(reply, "Tool: search_web(query=\"Zingaat lyrics\")");
    }

    #[tokio::test]
    async fn test_missing_content_is_empty_reply() {
        let (_server, model) = setup_mock_server(completion(None)).await;

        let reply = model.send(&[Turn::new(Role::User, "hi")]).await.unwrap();
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn test_no_choices_is_protocol_error() {
        let mut body = completion(Some("unused"));
        body["choices"] = json!([]);
        let (_server, model) = setup_mock_server(body).await;

        let err = model.send(&[Turn::new(Role::User, "hi")]).await.unwrap_err();
        assert!(matches!(err, ShabdaError::ClientProtocol(_)));
    }
}
