// ABOUTME: Model invocation seam — the trait the loop and repair use to reach an LLM.
// ABOUTME: Includes a replay client that answers from a fixed script, for tests and dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::message::Message;

/// Sends an instruction plus conversation to a model and returns its reply.
///
/// Implementations own transport, authentication, and any provider retries.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, instruction: &str, messages: &[Message]) -> anyhow::Result<Message>;
}

/// A request seen by a [`ReplayClient`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub instruction: String,
    pub messages: Vec<Message>,
}

/// Answers each invocation with the next scripted reply, in order.
///
/// Errors once the script runs out. Every request is recorded so callers can
/// inspect exactly what the model would have seen.
#[derive(Debug, Default)]
pub struct ReplayClient {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ReplayClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ModelClient for ReplayClient {
    async fn invoke(&self, instruction: &str, messages: &[Message]) -> anyhow::Result<Message> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                instruction: instruction.to_string(),
                messages: messages.to_vec(),
            });
        }
        let reply = self
            .replies
            .lock()
            .map_err(|_| anyhow::anyhow!("replay script lock poisoned"))?
            .pop_front();
        match reply {
            Some(text) => Ok(Message::assistant(text)),
            None => anyhow::bail!("replay script exhausted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_then_errors() {
        let client = ReplayClient::new(["first", "second"]);
        let a = client.invoke("sys", &[]).await.unwrap();
        let b = client.invoke("sys", &[Message::human("hi")]).await.unwrap();
        assert_eq!(a.text(), "first");
        assert_eq!(b.text(), "second");
        assert_eq!(client.remaining(), 0);

        let err = client.invoke("sys", &[]).await.unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }

    #[tokio::test]
    async fn records_each_request() {
        let client = ReplayClient::new(["ok"]);
        client
            .invoke("be brief", &[Message::human("question")])
            .await
            .unwrap();
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].instruction, "be brief");
        assert_eq!(requests[0].messages, vec![Message::human("question")]);
    }
}
