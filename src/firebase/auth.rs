/// Email/password sign-in against the Identity Toolkit REST endpoint
use serde::Deserialize;
use time::{Duration, OffsetDateTime};

use crate::firebase::FirebaseError;

const IDENTITY_TOOLKIT_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";

// Re-authenticate this long before the token would lapse
const EXPIRY_MARGIN_SECS: i64 = 120;

#[derive(Debug, Clone)]
pub struct UserAuth {
    pub api_key: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id_token: String,
    expires_at: OffsetDateTime,
}

impl AuthSession {
    pub fn is_fresh(&self) -> bool {
        OffsetDateTime::now_utc() + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Deserialize)]
struct SignInResponse {
    #[serde(rename = "idToken")]
    id_token: String,
    // The endpoint reports lifetime seconds as a string
    #[serde(rename = "expiresIn")]
    expires_in: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    code: i32,
    message: String,
}

/// Exchange credentials for a session token
///
/// # Returns
/// A session holding the ID token and its expiry, or the backend's
/// error message and code
pub async fn sign_in(
    http: &reqwest::Client,
    auth: &UserAuth,
) -> Result<AuthSession, FirebaseError> {
    let body = serde_json::json!({
        "email": auth.email,
        "password": auth.password,
        "returnSecureToken": true,
    });

    let response = http
        .post(format!("{}?key={}", IDENTITY_TOOLKIT_URL, auth.api_key))
        .json(&body)
        .send()
        .await
        .map_err(|e| FirebaseError {
            message: format!("sign-in request failed: {}", e),
            code: e.status().map(|s| s.as_u16() as i32).unwrap_or(-1),
        })?;

    let status = response.status();
    if !status.is_success() {
        let code = status.as_u16() as i32;
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => status.to_string(),
        };
        return Err(FirebaseError { message, code });
    }

    let body: SignInResponse = response.json().await.map_err(|e| FirebaseError {
        message: format!("malformed sign-in response: {}", e),
        code: -1,
    })?;

    let lifetime = body.expires_in.parse::<i64>().unwrap_or(3600);
    Ok(AuthSession {
        id_token: body.id_token,
        expires_at: OffsetDateTime::now_utc() + Duration::seconds(lifetime),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_freshness_tracks_expiry() {
        let fresh = AuthSession {
            id_token: "tok".to_string(),
            expires_at: OffsetDateTime::now_utc() + Duration::seconds(3600),
        };
        assert!(fresh.is_fresh());

        // Inside the re-auth margin counts as stale
        let nearly_expired = AuthSession {
            id_token: "tok".to_string(),
            expires_at: OffsetDateTime::now_utc() + Duration::seconds(30),
        };
        assert!(!nearly_expired.is_fresh());

        let expired = AuthSession {
            id_token: "tok".to_string(),
            expires_at: OffsetDateTime::now_utc() - Duration::seconds(10),
        };
        assert!(!expired.is_fresh());
    }

    #[test]
    fn error_body_deserializes() {
        let raw = r#"{"error":{"code":400,"message":"INVALID_PASSWORD","errors":[]}}"#;
        let body: ApiErrorBody = serde_json::from_str(raw).unwrap();
        assert_eq!(body.error.code, 400);
        assert_eq!(body.error.message, "INVALID_PASSWORD");
    }
}
