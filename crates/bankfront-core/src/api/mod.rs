//! REST API client module for the banking service.
//!
//! `BankClient` sends every call through the interceptor pipeline, so each
//! request carries the stored credential and a 401 revokes the session.
//!
//! All responses are wrapped in the service's `{data, message, success, status}`
//! envelope.

pub mod client;
pub mod error;

pub use client::BankClient;
pub use error::ApiError;
