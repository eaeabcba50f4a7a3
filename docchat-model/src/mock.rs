//! Scripted [`ChatModel`] for tests and offline demos.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ModelError, Result};
use crate::model::{ChatModel, ChatRequest, ChatResponse, Role};

#[derive(Debug, Clone)]
enum Behavior {
    Reply(String),
    Echo,
    Fail(String),
}

/// A [`ChatModel`] that answers without any network access.
///
/// Every request is recorded and can be inspected with
/// [`requests`](MockChatModel::requests).
///
/// # Example
///
/// ```rust,ignore
/// use docchat_model::MockChatModel;
///
/// let model = MockChatModel::echo();
/// let reply = model.complete(ChatRequest::new(vec![Message::user("ping")])).await?;
/// assert_eq!(reply.content, "ping");
/// ```
#[derive(Debug)]
pub struct MockChatModel {
    behavior: Behavior,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatModel {
    /// Always answer with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Reply(reply.into()))
    }

    /// Answer with the content of the last user message.
    pub fn echo() -> Self {
        Self::with_behavior(Behavior::Echo)
    }

    /// Fail every request with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fail(message.into()))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self { behavior, requests: Mutex::new(Vec::new()) }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        match &self.behavior {
            Behavior::Reply(reply) => Ok(ChatResponse { content: reply.clone(), usage: None }),
            Behavior::Echo => Ok(ChatResponse { content: last_user, usage: None }),
            Behavior::Fail(message) => {
                Err(ModelError::Request { model: "mock".into(), message: message.clone() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Message;

    #[tokio::test]
    async fn echo_returns_last_user_message() {
        let model = MockChatModel::echo();
        let request = ChatRequest::new(vec![
            Message::system("be brief"),
            Message::user("first"),
            Message::assistant("ok"),
            Message::user("second"),
        ]);

        let reply = model.complete(request).await.unwrap();
        assert_eq!(reply.content, "second");
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn failing_model_reports_request_error() {
        let model = MockChatModel::failing("rate limited");
        let err = model.complete(ChatRequest::new(vec![Message::user("hi")])).await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }
}
