//! Core library for bankfront.
//!
//! Provides the session layer shared by every view of the banking front-end:
//! - `auth`: the credential store and its persistence backends
//! - `pipeline`: the request/response interceptor pipeline
//! - `router`: the static route table and navigation
//! - `api`: the banking API client built on top of the pipeline

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod router;

pub use api::{ApiError, BankClient};
pub use auth::{Credential, SessionStore};
pub use config::Config;
pub use pipeline::{AuthFailureHook, Pipeline};
pub use router::{RouteTable, Router, View};
