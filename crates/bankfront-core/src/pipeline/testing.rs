//! Scripted transport for exercising the pipeline without a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, Request, Response, Url};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::Transport;
use crate::api::ApiError;

pub(crate) const BASE_URL: &str = "http://bank.test";

#[derive(Clone, Copy)]
pub(crate) enum Scripted {
    Status(u16, &'static str),
    /// Responds only after `open_gate` is called
    Gated(u16, &'static str),
    NetworkFailure,
}

#[derive(Debug, Clone)]
pub(crate) struct SentRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<String>,
}

pub(crate) struct ScriptedTransport {
    responses: HashMap<String, Scripted>,
    sent: Mutex<Vec<SentRequest>>,
    gate: Notify,
}

impl ScriptedTransport {
    /// Every path answers 200 `{}` unless scripted otherwise
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            sent: Mutex::new(Vec::new()),
            gate: Notify::new(),
        }
    }

    pub fn respond(mut self, path: &str, scripted: Scripted) -> Self {
        self.responses.insert(path.to_string(), scripted);
        self
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn open_gate(&self) {
        self.gate.notify_one();
    }
}

fn response(status: u16, body: &'static str) -> Response {
    Response::from(
        http::Response::builder()
            .status(status)
            .body(body)
            .unwrap(),
    )
}

/// A genuine transport error that never touches the network
fn network_error() -> ApiError {
    reqwest::Client::new().get("not a url").build().unwrap_err().into()
}

impl Transport for ScriptedTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, ApiError>> {
        let path = request.url().path().to_string();
        self.sent.lock().unwrap().push(SentRequest {
            method: request.method().clone(),
            path: path.clone(),
            authorization: request
                .headers()
                .get(AUTHORIZATION)
                .map(|v| v.to_str().unwrap().to_string()),
            body: request
                .body()
                .and_then(|b| b.as_bytes())
                .map(|b| String::from_utf8_lossy(b).into_owned()),
        });
        let scripted = self
            .responses
            .get(&path)
            .copied()
            .unwrap_or(Scripted::Status(200, "{}"));

        Box::pin(async move {
            match scripted {
                Scripted::Status(status, body) => Ok(response(status, body)),
                Scripted::Gated(status, body) => {
                    self.gate.notified().await;
                    Ok(response(status, body))
                }
                Scripted::NetworkFailure => Err(network_error()),
            }
        })
    }
}

pub(crate) fn get(path: &str) -> Request {
    let url = Url::parse(BASE_URL).unwrap().join(path).unwrap();
    Request::new(Method::GET, url)
}

/// Local HTTP server answering one connection with `raw` after `delay`.
/// Returns its base URL.
pub(crate) async fn serve_once(raw: &'static str, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        tokio::time::sleep(delay).await;
        let _ = socket.write_all(raw.as_bytes()).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{}", addr)
}
