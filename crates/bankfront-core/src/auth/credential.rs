use std::fmt;

/// Opaque access token. The client never looks inside it; the raw value is
/// sent back to the server exactly as it was received.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for Credential {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for Credential {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

// Keep tokens out of logs and panic messages
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}
