use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, TryFutureExt};
use reqwest::{Client, Request, Response};

use crate::api::ApiError;

/// Sends a prepared request over the network.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, ApiError>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, ApiError>> {
        (**self).send(request)
    }
}

/// Transport backed by a pooled `reqwest::Client`.
/// Clone is cheap - the client shares its connection pool.
///
/// No timeout is set: once sent, a request runs until it succeeds or fails.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Underlying client, used to build requests for this transport
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, ApiError>> {
        self.client.execute(request).map_err(ApiError::from).boxed()
    }
}
