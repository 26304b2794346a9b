//! Canned-response backend for tests.

use parking_lot::Mutex;
use std::collections::VecDeque;

use async_trait::async_trait;

use crate::errors::BackendError;
use crate::types::{GenerateRequest, GenerateResponse, ReasoningBackend};

/// [`ReasoningBackend`] that serves a fixed script of responses in order
/// and records every request it received.
///
/// Running past the end of the script is an error so tests fail loudly
/// instead of looping.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<GenerateResponse>>,
    requests: Mutex<Vec<GenerateRequest>>,
    served: Mutex<usize>,
}

impl ScriptedBackend {
    /// Build a backend that will answer with `responses`, in order.
    pub fn new(responses: Vec<GenerateResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            served: Mutex::new(0),
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }

    /// How many responses have been served.
    pub fn served(&self) -> usize {
        *self.served.lock()
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedBackend {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendError> {
        self.requests.lock().push(request.clone());
        match self.script.lock().pop_front() {
            Some(response) => {
                *self.served.lock() += 1;
                Ok(response)
            }
            None => Err(BackendError::ScriptExhausted { served: *self.served.lock() }),
        }
    }
}
