use crate::constants::{COMMAND_PATH, HTTPS_PORT};
use crate::error::{ReolinkError, Result};
use crate::protocol::{ApiCommand, CommandResponse, Session};
use reqwest::StatusCode;
use serde_json::{Value, json};
use strum_macros::AsRefStr;
use tracing::debug;

/// Longest slice of an error body kept in an error message.
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

/// Address and login of one camera, supplied once per run.
#[derive(Clone)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct ReolinkCam {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) scheme: Scheme,
    pub(crate) client: reqwest::Client,
}

impl ReolinkCam {
    /// Cameras ship with self-signed certificates, so verification is off.
    pub fn new(host: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ReolinkError::ConnectionError(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            host: host.into(),
            port: HTTPS_PORT,
            scheme: Scheme::Https,
            client,
        })
    }

    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        Ok(Self::new(credentials.host.clone())?.with_port(credentials.port))
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}://{}:{}{}", self.scheme.as_ref(), self.host, self.port, path)
    }

    /// POSTs a single command to the JSON endpoint and returns the first
    /// element of the reply array.
    pub(crate) async fn send_command(
        &self,
        command: ApiCommand,
        action: Option<u8>,
        param: Value,
        session: Option<&Session>,
    ) -> Result<CommandResponse> {
        let mut entry = json!({
            "cmd": command.as_ref(),
            "param": param,
        });
        if let Some(action) = action {
            entry["action"] = json!(action);
        }

        let mut query = vec![("cmd", command.as_ref())];
        if let Some(session) = session {
            query.push(("token", session.token()));
        }

        debug!(cmd = command.as_ref(), host = %self.host, port = self.port, "sending command");

        let response = self
            .client
            .post(self.url(COMMAND_PATH))
            .query(&query)
            .json(&json!([entry]))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(http_status_error(status, body));
        }

        let body = response.bytes().await?;
        CommandResponse::from_body(&body)
    }
}

pub(crate) fn http_status_error(status: StatusCode, mut body: String) -> ReolinkError {
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    ReolinkError::HttpStatus {
        status: status.as_u16(),
        body,
    }
}
