//! Request/response interceptor pipeline.
//!
//! A `Pipeline` is an ordered list of stages wrapped around a transport.
//! For every call:
//! 1. each stage's `on_request` runs in order and may edit the request
//! 2. the transport sends it; non-2xx statuses become typed `ApiError`s
//! 3. each stage's `on_outcome` observes the result, last stage first
//! 4. the outcome is handed back to the caller untouched
//!
//! Stages never consume an outcome. A 401 still reaches the caller as an
//! error after the session has been revoked.

pub mod stages;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use stages::{AttachCredential, AuthFailureHook, NavigateTo, RevokeOnUnauthorized};
pub use transport::{HttpTransport, Transport};

use std::sync::Arc;

use reqwest::{Request, Response};
use tracing::debug;

use crate::api::ApiError;

/// Result of one call as seen by the inbound stages and the caller
pub type Outcome = Result<Response, ApiError>;

/// One step of the pipeline.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Edit the outgoing request. An error stops the call before it is sent.
    fn on_request(&self, _request: &mut Request) -> Result<(), ApiError> {
        Ok(())
    }

    /// Observe the finished call.
    fn on_outcome(&self, _outcome: &Outcome) {}
}

pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    pub fn builder(transport: impl Transport + 'static) -> PipelineBuilder {
        PipelineBuilder {
            stages: Vec::new(),
            transport: Arc::new(transport),
        }
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn execute(&self, mut request: Request) -> Outcome {
        debug!(method = %request.method(), url = %request.url(), "Executing request");

        let outcome = match self.prepare(&mut request) {
            Ok(()) => self.dispatch(request).await,
            Err(e) => Err(e),
        };

        for stage in self.stages.iter().rev() {
            stage.on_outcome(&outcome);
        }
        outcome
    }

    fn prepare(&self, request: &mut Request) -> Result<(), ApiError> {
        for stage in &self.stages {
            stage.on_request(request)?;
        }
        Ok(())
    }

    async fn dispatch(&self, request: Request) -> Outcome {
        let response = self.transport.send(request).await?;
        let status = response.status();
        if status.is_success() {
            debug!(%status, "Request succeeded");
            return Ok(response);
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(%status, error = %e, "Failed to read error response body");
                String::new()
            }
        };
        Err(ApiError::from_status(status, &body))
    }
}

pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
    transport: Arc<dyn Transport>,
}

impl PipelineBuilder {
    /// Append a stage; stages run in the order they are added
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
            transport: self.transport,
        }
    }
}
