//! Auth DTOs shared between the API client and its callers
//!
//! Shapes of the authentication endpoints consumed by crab-client.

use serde::{Deserialize, Serialize};

// =============================================================================
// Auth API DTOs
// =============================================================================

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response data
///
/// Servers in the field answer with either `accessToken` or `token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(alias = "token", alias = "access_token")]
    pub access_token: String,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

/// `POST /auth/refresh` response
///
/// The subject is identified by the ambient session cookie, so the request
/// carries no body and the response only returns the new access credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(alias = "token", alias = "access_token")]
    pub access_token: String,
}

/// User information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_response_accepts_camel_case() {
        let resp: RefreshResponse = serde_json::from_str(r#"{"accessToken":"B"}"#).unwrap();
        assert_eq!(resp.access_token, "B");
    }

    #[test]
    fn test_login_response_accepts_token_alias() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"token":"A","user":{"id":"1","username":"cashier"}}"#)
                .unwrap();
        assert_eq!(resp.access_token, "A");
        assert_eq!(resp.user.unwrap().username, "cashier");
    }
}
