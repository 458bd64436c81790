use async_trait::async_trait;
use uuid::Uuid;

use super::{affected, PgStore};
use crate::database::models::{Media, Notification, Report};
use crate::database::store::{MediaStore, NotificationStore, ReportStore};
use crate::database::{Page, StoreResult};
use crate::types::ReportStatus;

const MEDIA_COLUMNS: &str = "id, owner_id, public_id, url, content_type, kind, size_bytes, created_at";
const NOTIFICATION_COLUMNS: &str = "id, account_id, kind, title, body, link, is_read, created_at";
const REPORT_COLUMNS: &str =
    "id, reporter_id, target, target_id, reason, details, status, reviewed_by, created_at, updated_at";

#[async_trait]
impl MediaStore for PgStore {
    async fn insert_media(&self, media: &Media) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO media (id, owner_id, public_id, url, content_type, kind, size_bytes, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(media.id)
        .bind(media.owner_id)
        .bind(&media.public_id)
        .bind(&media.url)
        .bind(&media.content_type)
        .bind(media.kind)
        .bind(media.size_bytes)
        .bind(media.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_media(&self, id: Uuid) -> StoreResult<Option<Media>> {
        let media = sqlx::query_as::<_, Media>(&format!("SELECT {} FROM media WHERE id = $1", MEDIA_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(media)
    }

    async fn list_media(&self, owner_id: Uuid, page: Page) -> StoreResult<Vec<Media>> {
        let media = sqlx::query_as::<_, Media>(&format!(
            "SELECT {} FROM media WHERE owner_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            MEDIA_COLUMNS
        ))
        .bind(owner_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(media)
    }

    async fn delete_media(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, account_id, kind, title, body, link, is_read, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notification.id)
        .bind(notification.account_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_notification(&self, id: Uuid) -> StoreResult<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(notification)
    }

    async fn list_notifications(&self, account_id: Uuid, unread_only: bool, page: Page) -> StoreResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications
             WHERE account_id = $1 AND ($2 = FALSE OR NOT is_read)
             ORDER BY created_at DESC LIMIT $3 OFFSET $4",
            NOTIFICATION_COLUMNS
        ))
        .bind(account_id)
        .bind(unread_only)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn mark_read(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "Notification")
    }

    async fn mark_all_read(&self, account_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE account_id = $1 AND NOT is_read")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn insert_report(&self, report: &Report) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO reports (id, reporter_id, target, target_id, reason, details, status, reviewed_by,
                                  created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(report.id)
        .bind(report.reporter_id)
        .bind(report.target)
        .bind(report.target_id)
        .bind(&report.reason)
        .bind(&report.details)
        .bind(report.status)
        .bind(report.reviewed_by)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_report(&self, id: Uuid) -> StoreResult<Option<Report>> {
        let report = sqlx::query_as::<_, Report>(&format!("SELECT {} FROM reports WHERE id = $1", REPORT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    async fn list_reports(&self, status: Option<ReportStatus>, page: Page) -> StoreResult<Vec<Report>> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            "SELECT {} FROM reports WHERE ($1::report_status IS NULL OR status = $1)
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            REPORT_COLUMNS
        ))
        .bind(status)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(reports)
    }

    async fn save_report(&self, report: &Report) -> StoreResult<()> {
        let result = sqlx::query("UPDATE reports SET status = $2, reviewed_by = $3, updated_at = $4 WHERE id = $1")
            .bind(report.id)
            .bind(report.status)
            .bind(report.reviewed_by)
            .bind(report.updated_at)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "Report")
    }
}
