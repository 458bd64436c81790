use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{affected, conflict_on_unique, PgStore};
use crate::database::models::event::admission;
use crate::database::models::{Class, Enrollment, Event, RatingSummary, Registration, Review, Video};
use crate::database::store::{CatalogFilter, ClassStore, EventStore};
use crate::database::{Page, StoreError, StoreResult};
use crate::types::RegistrationStatus;

const CLASS_COLUMNS: &str = "id, collaborator_id, title, description, category, thumbnail_url, is_published, \
                             average_rating, review_count, created_at, updated_at";

const VIDEO_COLUMNS: &str = "id, class_id, title, video_url, duration_seconds, position, created_at";

const ENROLLMENT_COLUMNS: &str = "class_id, account_id, progress, completed_at, enrolled_at, updated_at";

const REGISTRATION_COLUMNS: &str = "event_id, account_id, status, registered_at, updated_at";

const EVENT_SELECT: &str = "SELECT e.id, e.organizer_id, e.title, e.description, e.location, e.is_online,
        e.starts_at, e.ends_at, e.capacity, e.waitlist_enabled, e.is_published,
        (SELECT COUNT(*) FROM registrations r WHERE r.event_id = e.id AND r.status = 'registered') AS registered_count,
        e.created_at, e.updated_at
    FROM events e";

#[async_trait]
impl ClassStore for PgStore {
    async fn insert_class(&self, class: &Class) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO classes (id, collaborator_id, title, description, category, thumbnail_url, is_published,
                                  average_rating, review_count, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(class.id)
        .bind(class.collaborator_id)
        .bind(&class.title)
        .bind(&class.description)
        .bind(&class.category)
        .bind(&class.thumbnail_url)
        .bind(class.is_published)
        .bind(class.average_rating)
        .bind(class.review_count)
        .bind(class.created_at)
        .bind(class.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_class(&self, id: Uuid) -> StoreResult<Option<Class>> {
        let class = sqlx::query_as::<_, Class>(&format!("SELECT {} FROM classes WHERE id = $1", CLASS_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(class)
    }

    async fn list_classes(&self, filter: CatalogFilter, page: Page) -> StoreResult<Vec<Class>> {
        let classes = sqlx::query_as::<_, Class>(&format!(
            "SELECT {} FROM classes
             WHERE ($1 = FALSE OR is_published) AND ($2::uuid IS NULL OR collaborator_id = $2)
             ORDER BY created_at DESC LIMIT $3 OFFSET $4",
            CLASS_COLUMNS
        ))
        .bind(filter.published_only)
        .bind(filter.owner_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(classes)
    }

    async fn save_class(&self, class: &Class) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE classes SET title = $2, description = $3, category = $4, thumbnail_url = $5, updated_at = $6
             WHERE id = $1",
        )
        .bind(class.id)
        .bind(&class.title)
        .bind(&class.description)
        .bind(&class.category)
        .bind(&class.thumbnail_url)
        .bind(class.updated_at)
        .execute(&self.pool)
        .await?;
        affected(result.rows_affected(), "Class")
    }

    async fn set_class_published(&self, id: Uuid, published: bool) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE classes SET is_published = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(published)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_class(&self, id: Uuid) -> StoreResult<bool> {
        // videos, enrollments and reviews go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_video(&self, video: &Video) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO class_videos (id, class_id, title, video_url, duration_seconds, position, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(video.id)
        .bind(video.class_id)
        .bind(&video.title)
        .bind(&video.video_url)
        .bind(video.duration_seconds)
        .bind(video.position)
        .bind(video.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_video(&self, class_id: Uuid, video_id: Uuid) -> StoreResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "SELECT {} FROM class_videos WHERE id = $1 AND class_id = $2",
            VIDEO_COLUMNS
        ))
        .bind(video_id)
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(video)
    }

    async fn list_videos(&self, class_id: Uuid) -> StoreResult<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(&format!(
            "SELECT {} FROM class_videos WHERE class_id = $1 ORDER BY position, created_at",
            VIDEO_COLUMNS
        ))
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(videos)
    }

    async fn save_video(&self, video: &Video) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE class_videos SET title = $3, video_url = $4, duration_seconds = $5, position = $6
             WHERE id = $1 AND class_id = $2",
        )
        .bind(video.id)
        .bind(video.class_id)
        .bind(&video.title)
        .bind(&video.video_url)
        .bind(video.duration_seconds)
        .bind(video.position)
        .execute(&self.pool)
        .await?;
        affected(result.rows_affected(), "Video")
    }

    async fn delete_video(&self, class_id: Uuid, video_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM class_videos WHERE id = $1 AND class_id = $2")
            .bind(video_id)
            .bind(class_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn enroll(&self, enrollment: &Enrollment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO enrollments (class_id, account_id, progress, completed_at, enrolled_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(enrollment.class_id)
        .bind(enrollment.account_id)
        .bind(enrollment.progress)
        .bind(enrollment.completed_at)
        .bind(enrollment.enrolled_at)
        .bind(enrollment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conflict_on_unique("You are already enrolled in this class"))?;
        Ok(())
    }

    async fn find_enrollment(&self, class_id: Uuid, account_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM enrollments WHERE class_id = $1 AND account_id = $2",
            ENROLLMENT_COLUMNS
        ))
        .bind(class_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }

    async fn save_enrollment(&self, enrollment: &Enrollment) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE enrollments SET progress = $3, completed_at = $4, updated_at = $5
             WHERE class_id = $1 AND account_id = $2",
        )
        .bind(enrollment.class_id)
        .bind(enrollment.account_id)
        .bind(enrollment.progress)
        .bind(enrollment.completed_at)
        .bind(enrollment.updated_at)
        .execute(&self.pool)
        .await?;
        affected(result.rows_affected(), "Enrollment")
    }

    async fn list_enrollments(&self, account_id: Uuid, page: Page) -> StoreResult<Vec<Enrollment>> {
        let enrollments = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM enrollments WHERE account_id = $1 ORDER BY enrolled_at DESC LIMIT $2 OFFSET $3",
            ENROLLMENT_COLUMNS
        ))
        .bind(account_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(enrollments)
    }

    async fn upsert_review(&self, review: &Review) -> StoreResult<RatingSummary> {
        let mut tx = self.pool.begin().await?;

        // Serialize reviewers of the same class so the aggregate matches the rows
        let class: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM classes WHERE id = $1 FOR UPDATE")
            .bind(review.class_id)
            .fetch_optional(&mut *tx)
            .await?;
        if class.is_none() {
            return Err(StoreError::NotFound("Class".into()));
        }

        sqlx::query(
            "INSERT INTO reviews (class_id, account_id, rating, comment, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (class_id, account_id) DO UPDATE SET
                rating = EXCLUDED.rating, comment = EXCLUDED.comment, updated_at = EXCLUDED.updated_at",
        )
        .bind(review.class_id)
        .bind(review.account_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&mut *tx)
        .await?;

        let (average, count): (f64, i64) = sqlx::query_as(
            "SELECT COALESCE(AVG(rating), 0)::float8, COUNT(*) FROM reviews WHERE class_id = $1",
        )
        .bind(review.class_id)
        .fetch_one(&mut *tx)
        .await?;
        let summary = RatingSummary::from_aggregate(average, count);

        sqlx::query("UPDATE classes SET average_rating = $2, review_count = $3 WHERE id = $1")
            .bind(review.class_id)
            .bind(summary.average_rating)
            .bind(summary.review_count)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(summary)
    }

    async fn list_reviews(&self, class_id: Uuid, page: Page) -> StoreResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT class_id, account_id, rating, comment, created_at, updated_at FROM reviews
             WHERE class_id = $1 ORDER BY updated_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(class_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, location, is_online, starts_at, ends_at,
                                 capacity, waitlist_enabled, is_published, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.is_online)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.capacity)
        .bind(event.waitlist_enabled)
        .bind(event.is_published)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!("{} WHERE e.id = $1", EVENT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn list_events(&self, filter: CatalogFilter, page: Page) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "{} WHERE ($1 = FALSE OR e.is_published)
                 AND ($2::uuid IS NULL OR e.organizer_id = $2)
                 AND ($3 = FALSE OR e.starts_at >= now())
             ORDER BY e.starts_at ASC LIMIT $4 OFFSET $5",
            EVENT_SELECT
        ))
        .bind(filter.published_only)
        .bind(filter.owner_id)
        .bind(filter.upcoming_only)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn save_event(&self, event: &Event) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE events SET title = $2, description = $3, location = $4, is_online = $5, starts_at = $6,
                               ends_at = $7, capacity = $8, waitlist_enabled = $9, updated_at = $10
             WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.is_online)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.capacity)
        .bind(event.waitlist_enabled)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        affected(result.rows_affected(), "Event")
    }

    async fn set_event_published(&self, id: Uuid, published: bool) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE events SET is_published = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(published)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn register_attendee(&self, event_id: Uuid, account_id: Uuid) -> StoreResult<Registration> {
        let mut tx = self.pool.begin().await?;

        // The event row lock is held until commit, so the seat count below cannot go stale
        let event: Option<(i32, bool)> =
            sqlx::query_as("SELECT capacity, waitlist_enabled FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (capacity, waitlist_enabled) = event.ok_or_else(|| StoreError::NotFound("Event".into()))?;

        let existing: Option<(RegistrationStatus,)> =
            sqlx::query_as("SELECT status FROM registrations WHERE event_id = $1 AND account_id = $2")
                .bind(event_id)
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
        if matches!(existing, Some((status,)) if status != RegistrationStatus::Cancelled) {
            return Err(StoreError::Conflict("You are already registered for this event".into()));
        }

        let (registered,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = 'registered'")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;

        let status = admission(registered, capacity, waitlist_enabled)
            .ok_or_else(|| StoreError::Rejected("Event is full".into()))?;

        let registration = sqlx::query_as::<_, Registration>(&format!(
            "INSERT INTO registrations (event_id, account_id, status, registered_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)
             ON CONFLICT (event_id, account_id) DO UPDATE SET
                status = EXCLUDED.status, registered_at = EXCLUDED.registered_at, updated_at = EXCLUDED.updated_at
             RETURNING {}",
            REGISTRATION_COLUMNS
        ))
        .bind(event_id)
        .bind(account_id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(registration)
    }

    async fn cancel_registration(&self, event_id: Uuid, account_id: Uuid) -> StoreResult<Registration> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "UPDATE registrations SET status = 'cancelled', updated_at = now()
             WHERE event_id = $1 AND account_id = $2 AND status <> 'cancelled'
             RETURNING {}",
            REGISTRATION_COLUMNS
        ))
        .bind(event_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        registration.ok_or_else(|| StoreError::NotFound("Registration".into()))
    }

    async fn list_registrations(&self, event_id: Uuid) -> StoreResult<Vec<Registration>> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {} FROM registrations WHERE event_id = $1 ORDER BY registered_at",
            REGISTRATION_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(registrations)
    }

    async fn list_account_registrations(&self, account_id: Uuid, page: Page) -> StoreResult<Vec<Registration>> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {} FROM registrations WHERE account_id = $1 AND status <> 'cancelled'
             ORDER BY registered_at DESC LIMIT $2 OFFSET $3",
            REGISTRATION_COLUMNS
        ))
        .bind(account_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(registrations)
    }
}
