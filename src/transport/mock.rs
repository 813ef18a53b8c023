//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::transport::{HttpTransport, TransportError, TransportRequest, TransportResponse};

pub(crate) enum Step {
    Respond(TransportResponse),
    Fail(TransportError),
    Hang(Duration),
}

/// Replays a script of outcomes, then answers with `fallback` forever.
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Box<dyn Fn() -> Step + Send + Sync>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        steps: Vec<Step>,
        fallback: impl Fn() -> Step + Send + Sync + 'static,
    ) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: Box::new(fallback),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `status` and `body`.
    pub(crate) fn always(status: u16, body: &'static str) -> Self {
        Self::new(Vec::new(), move || Step::Respond(TransportResponse::new(status, body)))
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let step = self.steps.lock().unwrap().pop_front().unwrap_or_else(|| (self.fallback)());
        match step {
            Step::Respond(response) => Ok(response),
            Step::Fail(err) => Err(err),
            Step::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Err(TransportError::Other("hung step completed".into()))
            }
        }
    }
}
