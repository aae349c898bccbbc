use notify_rust::{Notification, Timeout, Urgency};

pub const APP_NAME: &str = "Battery Monitor";

/// Destination for user-facing alerts (toast, tray balloon, ...)
///
/// `post_alert` must return promptly and never fail the caller.
pub trait NotificationSink: Send + Sync {
    fn post_alert(&self, title: &str, body: &str);
}

/// Desktop notifications via the freedesktop notification service
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl NotificationSink for DesktopNotifier {
    fn post_alert(&self, title: &str, body: &str) {
        tracing::info!("{}: {}", title, body);

        let mut notification = Notification::new();
        notification
            .appname(APP_NAME)
            .summary(title)
            .body(body)
            .urgency(Urgency::Critical)
            .timeout(Timeout::Milliseconds(5000));

        // Detached: a stalled notification service must not hold up a tick or shutdown
        let spawned = std::thread::Builder::new()
            .name("notification".to_string())
            .spawn(move || {
                if let Err(e) = notification.show() {
                    tracing::warn!("Failed to show notification: {}", e);
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn notification thread: {}", e);
        }
    }
}
