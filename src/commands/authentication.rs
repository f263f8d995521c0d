use crate::camera::ReolinkCam;
use crate::constants::LOGIN_VERSION;
use crate::error::{ReolinkError, Result};
use crate::protocol::{ApiCommand, Session};
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

#[async_trait]
pub trait Authentication: Send + Sync {
    /// Exchange credentials for a session token. A single attempt; every
    /// failure is reported as `AuthenticationError`.
    async fn login(&self, username: &str, password: &str) -> Result<Session>;
}

#[async_trait]
impl Authentication for ReolinkCam {
    async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let param = json!({
            "User": {
                "Version": LOGIN_VERSION,
                "userName": username,
                "password": password,
            },
        });

        let value = self
            .send_command(ApiCommand::Login, None, param, None)
            .await
            .and_then(|reply| reply.into_value())
            .map_err(|e| {
                warn!(host = %self.host, error = %e, "login failed");
                ReolinkError::AuthenticationError(e.to_string())
            })?
            .ok_or_else(|| {
                ReolinkError::AuthenticationError("Login reply carries no value".to_string())
            })?;

        let Some(token) = value
            .get("Token")
            .and_then(|t| t.get("name"))
            .and_then(|n| n.as_str())
            .filter(|n| !n.is_empty())
        else {
            return Err(ReolinkError::AuthenticationError(
                "Login reply carries no token".to_string(),
            ));
        };

        info!(host = %self.host, user = username, "authenticated");
        Ok(Session::new(token))
    }
}
