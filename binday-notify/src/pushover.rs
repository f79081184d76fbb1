//! Pushover channel: one message per configured user key.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use binday_core::{
    model::DueSet,
    ports::{DispatchError, Notifier},
};

const ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Message priority as defined by the Pushover API.
pub enum Priority {
    /// No notification, only shown in the app.
    NoNotification,
    /// Quiet notification.
    Silent,
    /// Regular notification.
    #[default]
    Normal,
    /// Bypasses quiet hours.
    High,
    /// Repeats until acknowledged.
    RequireConfirmation,
}

impl Priority {
    fn code(self) -> i8 {
        match self {
            Priority::NoNotification => -2,
            Priority::Silent => -1,
            Priority::Normal => 0,
            Priority::High => 1,
            Priority::RequireConfirmation => 2,
        }
    }
}

/// Body returned by the messages endpoint.
#[derive(Debug, Deserialize)]
struct MessageResponse {
    status: i64,
    #[serde(default)]
    request: String,
    #[serde(default)]
    errors: Vec<String>,
}

/// Sends the summary through Pushover.
pub struct PushoverNotifier {
    client: Client,
    api_token: String,
    users: Vec<String>,
    priority: Priority,
}

impl PushoverNotifier {
    /// Create a notifier for the given application token and user keys.
    #[must_use]
    pub fn new(client: Client, api_token: &str, users: Vec<String>) -> Self {
        Self {
            client,
            api_token: api_token.to_owned(),
            users,
            priority: Priority::default(),
        }
    }

    /// Override the message priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    async fn send(&self, user: &str, message: &str) -> Result<(), DispatchError> {
        let priority = self.priority.code().to_string();
        let timestamp = Utc::now().timestamp().to_string();
        let resp = self
            .client
            .post(ENDPOINT)
            .form(&[
                ("token", self.api_token.as_str()),
                ("user", user),
                ("priority", priority.as_str()),
                ("timestamp", timestamp.as_str()),
                ("message", message),
            ])
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        check_response(status, &body)
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    fn name(&self) -> &str {
        "pushover"
    }

    async fn notify(&self, _due: &DueSet, summary: &str) -> Result<(), DispatchError> {
        if self.users.is_empty() {
            return Err(DispatchError::Unconfirmed(
                "no pushover users configured".to_owned(),
            ));
        }

        for user in &self.users {
            self.send(user, summary).await?;
            tracing::info!(user = %redact(user), "pushover notification sent");
        }
        Ok(())
    }
}

/// Interpret the API's answer to a single message.
fn check_response(status: StatusCode, body: &str) -> Result<(), DispatchError> {
    if status.is_server_error() {
        return Err(DispatchError::Unavailable(status.as_u16()));
    }
    if status != StatusCode::OK {
        return Err(DispatchError::Rejected {
            status: status.as_u16(),
            body: body.to_owned(),
        });
    }

    let parsed = serde_json::from_str::<MessageResponse>(body).map_err(|err| {
        tracing::error!(%body, "failed to decode pushover response");
        DispatchError::Unconfirmed(format!("undecodable response: {err}"))
    })?;

    if parsed.status == 1 {
        tracing::debug!(request = %parsed.request, "pushover accepted message");
        Ok(())
    } else {
        Err(DispatchError::Unconfirmed(format!(
            "status {} ({})",
            parsed.status,
            parsed.errors.join("; ")
        )))
    }
}

/// Keep user keys out of logs.
fn redact(user: &str) -> String {
    let visible = user.chars().take(8).collect::<String>();
    format!("{visible}...")
}
