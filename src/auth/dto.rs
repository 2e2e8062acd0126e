use serde::{Deserialize, Serialize};

/// Body of POST /api/auth. Fields are optional so a missing one becomes a
/// clean 400 instead of a deserialization fault.
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
}
