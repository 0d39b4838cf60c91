//! Deterministic completion client that replays queued responses

use super::{CompletionClient, CompletionRequest};
use crate::error::{LabError, LabResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued results in order and records every request it receives.
/// Running out of scripted results is reported as an upstream failure.
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<LabResult<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for response in responses {
            client.push_ok(response);
        }
        client
    }

    pub fn push_ok(&self, response: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(response.into()));
        }
    }

    pub fn push_err(&self, error: LabError) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(error));
        }
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> LabResult<String> {
        self.requests
            .lock()
            .map_err(|e| LabError::upstream(None, format!("Scripted client poisoned: {}", e)))?
            .push(request);

        self.responses
            .lock()
            .map_err(|e| LabError::upstream(None, format!("Scripted client poisoned: {}", e)))?
            .pop_front()
            .unwrap_or_else(|| Err(LabError::upstream(None, "No scripted response left")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_and_records() {
        let client = ScriptedClient::with_responses(["one", "two"]);
        client.push_err(LabError::upstream(Some(500), "boom"));

        assert_eq!(
            client.complete(CompletionRequest::prompt("a")).await.unwrap(),
            "one"
        );
        assert_eq!(
            client.complete(CompletionRequest::prompt("b")).await.unwrap(),
            "two"
        );
        assert!(client.complete(CompletionRequest::prompt("c")).await.is_err());
        assert!(client.complete(CompletionRequest::prompt("d")).await.is_err());

        assert_eq!(client.call_count(), 4);
        assert_eq!(client.requests()[1].messages[0].content, "b");
        assert_eq!(client.remaining(), 0);
    }
}
