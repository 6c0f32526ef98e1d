// ── Notification service ──
//
// The push service is constructed explicitly and handed to the engine.
// Its `{enabled, token}` settings live behind an `ArcSwap` so they can
// be replaced at runtime while in-flight sends keep the snapshot they
// started with.

use std::sync::Arc;

use aquaguard_api::PushClient;
use arc_swap::ArcSwap;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

/// Outbound notification channel.
pub trait NotificationSink: Send + Sync {
    /// Dispatch a message. Returns whether it was accepted for delivery;
    /// delivery itself may complete later.
    fn send(&self, title: &str, body: &str) -> bool;
}

/// Push settings swapped as one unit.
#[derive(Debug, Clone, Default)]
pub struct PushSettings {
    pub enabled: bool,
    pub token: Option<SecretString>,
}

impl PushSettings {
    fn usable_token(&self) -> Option<&SecretString> {
        if !self.enabled {
            return None;
        }
        self.token.as_ref().filter(|t| !t.expose_secret().is_empty())
    }
}

/// Fire-and-forget push notifier.
pub struct PushNotifier {
    client: PushClient,
    settings: ArcSwap<PushSettings>,
}

impl PushNotifier {
    pub fn new(client: PushClient, settings: PushSettings) -> Self {
        Self {
            client,
            settings: ArcSwap::from_pointee(settings),
        }
    }

    /// Replace the active settings.
    pub fn configure(&self, settings: PushSettings) {
        self.settings.store(Arc::new(settings));
    }

    pub fn settings(&self) -> Arc<PushSettings> {
        self.settings.load_full()
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.load().usable_token().is_some()
    }

    /// Send and wait for the service's verdict.
    pub async fn send_now(&self, title: &str, body: &str) -> bool {
        let settings = self.settings.load_full();
        let Some(token) = settings.usable_token() else {
            return false;
        };
        match self.client.send(token, title, body).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "push notification failed");
                false
            }
        }
    }
}

impl NotificationSink for PushNotifier {
    fn send(&self, title: &str, body: &str) -> bool {
        let settings = self.settings.load_full();
        let Some(token) = settings.usable_token().cloned() else {
            debug!(title, "push disabled, dropping notification");
            return false;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available for push notification");
            return false;
        };

        let client = self.client.clone();
        let title = title.to_owned();
        let body = body.to_owned();
        handle.spawn(async move {
            match client.send(&token, &title, &body).await {
                Ok(true) => debug!(title, "push delivered"),
                Ok(false) => warn!(title, "push rejected by service"),
                Err(e) => warn!(title, error = %e, "push notification failed"),
            }
        });
        true
    }
}
