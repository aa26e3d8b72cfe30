//! Data models for the banking API.
//!
//! - `user`: users, user types, signup and profile payloads
//! - `envelope`: the response wrapper every endpoint uses

pub mod envelope;
pub mod user;

pub use envelope::{Envelope, LoginResponse};
pub use user::{NewUser, ProfileUpdate, User, UserType};
