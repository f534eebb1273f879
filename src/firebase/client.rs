/// Realtime Database REST client
///
/// Every field is one independent `PUT <base>/<path>.json?auth=<token>`
/// with a JSON number body; there is no batching and no retry. A failed
/// write records the backend's message and code for the status report
/// and the next scheduled write proceeds regardless.
use async_trait::async_trait;
use log::{info, warn};
use url::Url;

use crate::firebase::auth::{sign_in, AuthSession, UserAuth};
use crate::firebase::{FirebaseError, RemoteStore};

const REQUEST_TIMEOUT_SECS: u64 = 10;

pub struct RtdbClient {
    http: reqwest::Client,
    base_url: Url,
    auth: UserAuth,
    session: Option<AuthSession>,
    last_error: Option<FirebaseError>,
}

impl RtdbClient {
    pub fn new(database_url: &str, auth: UserAuth) -> Result<Self, Box<dyn std::error::Error>> {
        let base_url = Url::parse(database_url)?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(RtdbClient {
            http,
            base_url,
            auth,
            session: None,
            last_error: None,
        })
    }

    async fn put_value(&mut self, path: &str, body: serde_json::Value) -> bool {
        let token = match &self.session {
            Some(session) => session.id_token.clone(),
            None => {
                self.last_error = Some(FirebaseError {
                    message: "no active session".to_string(),
                    code: 401,
                });
                return false;
            }
        };

        let url = endpoint_url(&self.base_url, path, &token);
        match self.http.put(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                self.last_error = None;
                true
            }
            Ok(response) => {
                let code = response.status().as_u16() as i32;
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unreadable error response".to_string());
                self.last_error = Some(FirebaseError { message, code });
                false
            }
            Err(e) => {
                self.last_error = Some(FirebaseError {
                    message: e.to_string(),
                    code: e.status().map(|s| s.as_u16() as i32).unwrap_or(-1),
                });
                false
            }
        }
    }
}

#[async_trait]
impl RemoteStore for RtdbClient {
    async fn maintain(&mut self) {
        if self.session.as_ref().is_some_and(|s| s.is_fresh()) {
            return;
        }

        match sign_in(&self.http, &self.auth).await {
            Ok(session) => {
                info!("Database session established for {}", self.auth.email);
                self.session = Some(session);
            }
            Err(e) => {
                warn!("Authentication failed: {}", e);
                self.session = None;
            }
        }
    }

    fn ready(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_fresh())
    }

    fn last_error(&self) -> Option<&FirebaseError> {
        self.last_error.as_ref()
    }

    async fn set_number(&mut self, path: &str, value: f64, decimals: u8) -> bool {
        self.put_value(path, serde_json::json!(round_to(value, decimals)))
            .await
    }

    async fn set_int(&mut self, path: &str, value: i64) -> bool {
        self.put_value(path, serde_json::json!(value)).await
    }
}

/// Map a database path to its REST endpoint
fn endpoint_url(base: &Url, path: &str, token: &str) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("{}.json", path.trim_matches('/')));
    url.set_query(Some(&format!("auth={}", token)));
    url
}

fn round_to(value: f64, decimals: u8) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
