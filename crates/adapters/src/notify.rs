// SPDX-License-Identifier: MIT

//! Notification channel: the
//! orchestrator core only ever calls `notify`; how a notification actually
//! reaches a human is someone else's concern.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

#[async_trait]
pub trait NotificationAdapter: Send + Sync + 'static {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Notification adapter that drops everything. Default for headless
/// daemon runs where no desktop session is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotificationAdapter;

#[async_trait]
impl NotificationAdapter for NoopNotificationAdapter {
    async fn notify(&self, _title: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Desktop notification adapter using notify-rust.
///
/// On macOS, `notify-rust` uses `mac-notification-sys` (Cocoa bindings) to
/// send notifications via the Notification Center. The first notification
/// triggers an AppleScript bundle-identifier lookup that blocks forever in
/// a daemon process without Automation permissions, so the identifier is
/// pre-set at construction time to bypass the lookup entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotificationAdapter;

impl DesktopNotificationAdapter {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        {
            let _ = mac_notification_sys::set_application("com.apple.Terminal");
        }
        Self
    }
}

#[async_trait]
impl NotificationAdapter for DesktopNotificationAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let title = title.to_string();
        let message = message.to_string();
        tokio::task::spawn_blocking(move || {
            tracing::info!(%title, %message, "sending desktop notification");
            match notify_rust::Notification::new().summary(&title).body(&message).show() {
                Ok(_) => tracing::info!(%title, "desktop notification sent"),
                Err(e) => tracing::warn!(%title, error = %e, "desktop notification failed"),
            }
        });
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod mock {
    use super::{NotificationAdapter, NotifyError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub struct NotifyCall {
        pub title: String,
        pub message: String,
    }

    #[derive(Default)]
    struct MockState {
        calls: Vec<NotifyCall>,
    }

    /// Notification double that records every call instead of sending
    /// anything.
    #[derive(Clone, Default)]
    pub struct MockNotificationAdapter {
        inner: Arc<Mutex<MockState>>,
    }

    impl MockNotificationAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<NotifyCall> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl NotificationAdapter for MockNotificationAdapter {
        async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
            self.inner
                .lock()
                .calls
                .push(NotifyCall { title: title.to_string(), message: message.to_string() });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use mock::{MockNotificationAdapter, NotifyCall};

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
