//! Typed client for the notifier admin endpoint.
//!
//! # Architecture
//!
//! Every operation the console performs remotely goes through one entry
//! point, [`AdminClient::dispatch`]: a JSON `POST` carrying an `action`
//! discriminator, the auth token, and action-specific parameters. The server
//! answers a uniform `{ success, data }` verdict decoded into
//! [`wire::AdminResponse`].
//!
//! | Action | Purpose |
//! |--------|---------|
//! | `save_general_settings` | Persist the global notifier settings |
//! | `save_form_settings` | Persist one form's notification settings |
//! | `auto_adjust_form_settings` | Silent variant used by automatic downgrades |
//! | `test_connection` | Verify the configured relay account |
//! | `test_form_notification` | Send a test message for one form |
//! | `clear_logs` | Drop the server-side notification log |
//! | `toggle_form_status` | Persist a single enable/disable flip |
//! | `get_forms_status` | Batched authoritative enabled-states |
//! | `check_configuration` | Configuration completeness verdict |
//!
//! # Error Handling
//!
//! [`ClientError`] covers transport-level failures only: connection errors,
//! non-2xx statuses, and undecodable bodies. A well-formed verdict with
//! `success: false` is *not* an error here; the engine decides how to surface
//! it (inline field errors, rollback, notice).

pub mod wire;

mod error;
pub use error::ClientError;

use std::sync::OnceLock;
use std::time::Duration;

use url::Url;

use crate::wire::{AdminAction, AdminRequest, AdminResponse};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;

// One admin host per process; a large pool would just hold dead sockets.
const POOL_MAX_IDLE_PER_HOST: usize = 4;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Shared hardened HTTP client.
///
/// Redirects are refused: the admin endpoint answers in place, and a
/// redirect would re-send the auth token to wherever it points.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().build().unwrap_or_else(|e| {
            tracing::error!(
                "Failed to build hardened HTTP client: {e}. Attempting minimal fallback."
            );
            reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("minimal HTTP client must build; cannot reach the admin endpoint without one")
        })
    })
}

fn base_client_builder() -> reqwest::ClientBuilder {
    // No https_only: self-hosted admin endpoints are commonly plain HTTP on
    // development hosts.
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

/// Where the admin endpoint lives and how to authenticate against it.
///
/// The constructor validates the endpoint URL and rejects empty tokens, so a
/// constructed target is always dispatchable.
#[derive(Clone)]
pub struct AdminTarget {
    endpoint: Url,
    token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AdminTargetError {
    #[error("admin endpoint is not a valid http(s) URL: {0}")]
    InvalidEndpoint(String),
    #[error("auth token must not be empty")]
    EmptyToken,
}

impl AdminTarget {
    pub fn new(endpoint: &str, token: impl Into<String>) -> Result<Self, AdminTargetError> {
        let url = Url::parse(endpoint)
            .map_err(|_| AdminTargetError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AdminTargetError::InvalidEndpoint(endpoint.to_string()));
        }
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AdminTargetError::EmptyToken);
        }
        Ok(Self {
            endpoint: url,
            token,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

// Manual Debug impl to keep the token out of logs.
impl std::fmt::Debug for AdminTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminTarget")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Client for the admin endpoint.
#[derive(Debug, Clone)]
pub struct AdminClient {
    target: AdminTarget,
    client: reqwest::Client,
    timeout: Duration,
}

impl AdminClient {
    /// Build on the shared hardened client.
    #[must_use]
    pub fn new(target: AdminTarget) -> Self {
        Self::with_client(target, http_client().clone())
    }

    /// Build on an explicit `reqwest` client (tests, custom TLS setups).
    #[must_use]
    pub fn with_client(target: AdminTarget, client: reqwest::Client) -> Self {
        Self {
            target,
            client,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn target(&self) -> &AdminTarget {
        &self.target
    }

    /// Send one action and decode the verdict.
    ///
    /// `Ok` means the exchange succeeded at the transport level; inspect
    /// [`AdminResponse::success`] for the server's answer.
    pub async fn dispatch(&self, action: &AdminAction) -> Result<AdminResponse, ClientError> {
        tracing::debug!(action = action.name(), "dispatching admin action");

        let request = AdminRequest {
            token: self.target.token(),
            action,
        };
        let response = self
            .client
            .post(self.target.endpoint().clone())
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            tracing::warn!(%status, action = action.name(), "admin endpoint rejected request");
            return Err(ClientError::Status { status, body });
        }

        let verdict: AdminResponse = response.json().await.map_err(ClientError::Decode)?;
        tracing::debug!(
            action = action.name(),
            success = verdict.success,
            "admin action answered"
        );
        Ok(verdict)
    }
}

async fn read_capped_error_body(response: reqwest::Response) -> String {
    let body = response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .unwrap_or_default();
    if body.len() > MAX_ERROR_BODY_BYTES {
        let text = String::from_utf8_lossy(&body[..MAX_ERROR_BODY_BYTES]);
        return format!("{text}...(truncated)");
    }
    String::from_utf8_lossy(&body).into_owned()
}
