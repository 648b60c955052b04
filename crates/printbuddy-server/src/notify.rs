//! Best-effort operator notification for new orders.
//!
//! A notifier is called at most once per persisted order. Its failure is
//! logged by the caller and never reaches the customer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use printbuddy_core::OrderSummary;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification rejected with status {0}: {1}")]
    Rejected(u16, String),

    #[error("notification transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &OrderSummary) -> Result<(), NotifyError>;
}

/// Twilio messaging settings. All of sid, token, sender and recipient are
/// required for notifications to be enabled.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    pub to: String,
    pub api_base: String,
}

impl NotifierConfig {
    /// Read `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`,
    /// `PRINTBUDDY_NOTIFY_FROM`, `PRINTBUDDY_NOTIFY_TO` and optionally
    /// `TWILIO_API_BASE`. Returns `None` when any required value is missing.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Some(Self {
            account_sid: var("TWILIO_ACCOUNT_SID")?,
            auth_token: var("TWILIO_AUTH_TOKEN")?,
            from: var("PRINTBUDDY_NOTIFY_FROM")?,
            to: var("PRINTBUDDY_NOTIFY_TO")?,
            api_base: var("TWILIO_API_BASE").unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.into()),
        })
    }
}

pub struct TwilioNotifier {
    client: reqwest::Client,
    config: NotifierConfig,
}

impl TwilioNotifier {
    pub fn new(config: NotifierConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn notify(&self, summary: &OrderSummary) -> Result<(), NotifyError> {
        let body = summary.message();
        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("From", self.config.from.as_str()),
                ("To", self.config.to.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(status.as_u16(), text));
        }
        debug!(order_id = %summary.order_id, "operator notified");
        Ok(())
    }
}

/// Used when messaging is not configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, summary: &OrderSummary) -> Result<(), NotifyError> {
        debug!(order_id = %summary.order_id, "notifications disabled; skipping");
        Ok(())
    }
}

/// Twilio when fully configured, otherwise the disabled notifier.
pub fn create_notifier(config: Option<NotifierConfig>) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config {
        Some(config) => Ok(Arc::new(TwilioNotifier::new(config)?)),
        None => Ok(Arc::new(DisabledNotifier)),
    }
}
