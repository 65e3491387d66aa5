//! Canned [`TextGenerator`] for tests and offline runs.
//!
//! Replies are consumed in order; the last reply repeats once the queue is
//! down to one. Every call is counted and its prompt recorded, so tests can
//! assert that a path never reached the gateway.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{GenerateFuture, OutputSchema, TextGenerator};
use crate::error::GenerationError;

/// One scripted gateway outcome.
#[derive(Debug, Clone)]
pub enum CannedReply {
    /// A JSON value, checked against the schema like a real reply.
    Json(serde_json::Value),
    /// Raw completion text, parsed and checked like a real reply.
    Text(String),
    /// A transport failure with the given message.
    TransportFailure(String),
    /// Behave like a generator without a credential.
    Unconfigured,
}

/// Scripted generator with a call counter.
pub struct CannedGenerator {
    replies: Mutex<VecDeque<CannedReply>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl CannedGenerator {
    /// Reply with the given sequence of outcomes.
    pub fn new(replies: impl IntoIterator<Item = CannedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with a well-formed refinement.
    pub fn returning(refined_content: &str, interpretation: &str) -> Self {
        Self::new([CannedReply::Json(serde_json::json!({
            "refinedContent": refined_content,
            "interpretation": interpretation,
        }))])
    }

    /// Always fail at the transport layer.
    pub fn failing(message: &str) -> Self {
        Self::new([CannedReply::TransportFailure(message.to_string())])
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn next_reply(&self) -> Option<CannedReply> {
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        }
    }
}

impl TextGenerator for CannedGenerator {
    fn generate<'a>(&'a self, prompt: &'a str, schema: &'a OutputSchema) -> GenerateFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        let reply = self.next_reply();
        Box::pin(async move {
            match reply {
                Some(CannedReply::Json(value)) => schema.conform(value),
                Some(CannedReply::Text(text)) => schema.parse(&text),
                Some(CannedReply::TransportFailure(msg)) => Err(GenerationError::Transport(msg)),
                Some(CannedReply::Unconfigured) => Err(GenerationError::NotConfigured),
                None => Err(GenerationError::Provider("no canned reply left".into())),
            }
        })
    }
}
