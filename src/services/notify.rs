use tracing::warn;
use uuid::Uuid;

use crate::database::models::Notification;
use crate::database::Store;

/// Record a notification unless the recipient caused it.
///
/// Failures are logged; the triggering request has already succeeded.
pub async fn notify(store: &dyn Store, actor_id: Uuid, notification: Notification) {
    if notification.account_id == actor_id {
        return;
    }
    record(store, notification).await;
}

/// System confirmations addressed to the account that triggered them
pub async fn record(store: &dyn Store, notification: Notification) {
    if let Err(e) = store.insert_notification(&notification).await {
        warn!(account_id = %notification.account_id, error = %e, "Failed to record notification");
    }
}
