//! Transient user-facing notifications ("toasts").
//!
//! Producers only see the `Notifier` trait. The CLI renders notifications
//! through tracing; tests and embedding UIs receive them over a channel.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub summary: &'static str,
    pub detail: String,
}

impl Notification {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            summary: "Success",
            detail: detail.into(),
        }
    }

    pub fn info(detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            summary: "Info",
            detail: detail.into(),
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: "Error",
            detail: detail.into(),
        }
    }
}

/// Sink for notifications. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Renders notifications as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Success | Severity::Info => info!("{}: {}", n.summary, n.detail),
            Severity::Error => error!("{}: {}", n.summary, n.detail),
        }
    }
}

/// Forwards notifications to a receiver owned by the display layer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // receiver gone means nobody is displaying toasts anymore
        let _ = self.tx.send(notification);
    }
}
