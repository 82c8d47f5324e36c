use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::auth::dto::{Ack, AuthResponse, PublicUser};
use crate::client::session::{Session, SessionStore, SessionUser};

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with `{"success": false, "message"}`.
    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
    },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Thin wrapper over the auth HTTP surface. Successful verify/login responses
/// are written to the injected session store; `logout` clears it.
pub struct AuthClient {
    http: Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            store,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/auth{}", self.base_url, path)
    }

    /// Current session, if any.
    pub fn session(&self) -> Option<Session> {
        self.store.get()
    }

    /// Drop the stored token and user projection together.
    pub fn logout(&self) {
        self.store.clear();
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Ack, ApiError> {
        let res = self
            .http
            .post(self.url("/register"))
            .json(&serde_json::json!({
                "name": name,
                "email": email,
                "password": password,
            }))
            .send()
            .await?;
        decode(res).await
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<AuthResponse, ApiError> {
        let res = self
            .http
            .post(self.url("/verify-otp"))
            .json(&serde_json::json!({ "email": email, "otp": otp }))
            .send()
            .await?;
        let auth: AuthResponse = decode(res).await?;
        self.remember(&auth);
        Ok(auth)
    }

    pub async fn resend_otp(&self, email: &str) -> Result<Ack, ApiError> {
        let res = self
            .http
            .post(self.url("/resend-otp"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        decode(res).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let res = self
            .http
            .post(self.url("/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = decode(res).await?;
        self.remember(&auth);
        Ok(auth)
    }

    pub async fn me(&self) -> Result<PublicUser, ApiError> {
        let session = self.store.get().ok_or(ApiError::Api {
            status: StatusCode::UNAUTHORIZED,
            message: "Not logged in".into(),
        })?;
        let res = self
            .http
            .get(self.url("/me"))
            .bearer_auth(&session.token)
            .send()
            .await?;
        decode(res).await
    }

    fn remember(&self, auth: &AuthResponse) {
        debug!(email = %auth.email, "session stored");
        self.store.set(&Session {
            token: auth.token.clone(),
            user: SessionUser {
                id: auth.id,
                name: auth.name.clone(),
                email: auth.email.clone(),
            },
        });
    }
}

async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ApiError> {
    let status = res.status();
    let body = res.text().await?;
    if status.is_success() {
        serde_json::from_str(&body).map_err(|e| ApiError::Api {
            status,
            message: format!("invalid response body: {e}"),
        })
    } else {
        Err(ApiError::Api {
            status,
            message: error_message(status, &body),
        })
    }
}

/// Pull the server's `message` out of an error body, falling back to the
/// status line when the body is not the canonical shape.
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrBody {
        message: String,
    }
    serde_json::from_str::<ErrBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| format!("request failed with status {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::MemorySessionStore;
    use uuid::Uuid;

    #[test]
    fn url_joins_without_double_slash() {
        let store = Arc::new(MemorySessionStore::new());
        let client = AuthClient::new("http://localhost:8080/", store);
        assert_eq!(
            client.url("/verify-otp"),
            "http://localhost:8080/api/auth/verify-otp"
        );
    }

    #[test]
    fn remember_writes_token_and_user_together() {
        let store = Arc::new(MemorySessionStore::new());
        let client = AuthClient::new(
            "http://localhost:8080",
            Arc::clone(&store) as Arc<dyn SessionStore>,
        );

        let auth = AuthResponse {
            success: true,
            token: "jwt".into(),
            id: Uuid::new_v4(),
            name: "A".into(),
            email: "a@x.com".into(),
        };
        client.remember(&auth);

        let session = client.session().expect("session stored");
        assert_eq!(session.token, "jwt");
        assert_eq!(session.user.id, auth.id);
        assert_eq!(session.user.email, "a@x.com");

        client.logout();
        assert!(client.session().is_none());
    }

    #[test]
    fn error_message_prefers_server_message() {
        let body = r#"{"success":false,"message":"OTP expired"}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "OTP expired"
        );
    }

    #[test]
    fn error_message_falls_back_on_garbage() {
        let msg = error_message(StatusCode::BAD_GATEWAY, "<html>nope</html>");
        assert!(msg.contains("502"));
    }
}
