use serde::{Deserialize, Serialize};

/// Wrapper around every payload the service returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub status: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}
