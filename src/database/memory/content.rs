use async_trait::async_trait;
use uuid::Uuid;

use super::MemoryStore;
use crate::database::models::{Media, Notification, Report};
use crate::database::store::{MediaStore, NotificationStore, ReportStore};
use crate::database::{Page, StoreError, StoreResult};
use crate::types::ReportStatus;

#[async_trait]
impl MediaStore for MemoryStore {
    async fn insert_media(&self, media: &Media) -> StoreResult<()> {
        self.state.write().await.media.insert(media.id, media.clone());
        Ok(())
    }

    async fn find_media(&self, id: Uuid) -> StoreResult<Option<Media>> {
        Ok(self.state.read().await.media.get(&id).cloned())
    }

    async fn list_media(&self, owner_id: Uuid, page: Page) -> StoreResult<Vec<Media>> {
        let state = self.state.read().await;
        let mut media: Vec<Media> = state.media.values().filter(|m| m.owner_id == owner_id).cloned().collect();
        media.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(media))
    }

    async fn delete_media(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().await.media.remove(&id).is_some())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.state
            .write()
            .await
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn find_notification(&self, id: Uuid) -> StoreResult<Option<Notification>> {
        Ok(self.state.read().await.notifications.get(&id).cloned())
    }

    async fn list_notifications(&self, account_id: Uuid, unread_only: bool, page: Page) -> StoreResult<Vec<Notification>> {
        let state = self.state.read().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .values()
            .filter(|n| n.account_id == account_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(notifications))
    }

    async fn mark_read(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let notification = state
            .notifications
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("Notification".into()))?;
        notification.is_read = true;
        Ok(())
    }

    async fn mark_all_read(&self, account_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for notification in state.notifications.values_mut() {
            if notification.account_id == account_id && !notification.is_read {
                notification.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: &Report) -> StoreResult<()> {
        self.state.write().await.reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn find_report(&self, id: Uuid) -> StoreResult<Option<Report>> {
        Ok(self.state.read().await.reports.get(&id).cloned())
    }

    async fn list_reports(&self, status: Option<ReportStatus>, page: Page) -> StoreResult<Vec<Report>> {
        let state = self.state.read().await;
        let mut reports: Vec<Report> = state
            .reports
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(reports))
    }

    async fn save_report(&self, report: &Report) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let existing = state
            .reports
            .get_mut(&report.id)
            .ok_or_else(|| StoreError::NotFound("Report".into()))?;
        *existing = report.clone();
        Ok(())
    }
}
