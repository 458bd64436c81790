use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{MemoryState, MemoryStore};
use crate::database::models::event::admission;
use crate::database::models::{Class, Enrollment, Event, RatingSummary, Registration, Review, Video};
use crate::database::store::{CatalogFilter, ClassStore, EventStore};
use crate::database::{Page, StoreError, StoreResult};
use crate::types::RegistrationStatus;

impl MemoryState {
    fn event_view(&self, event: &Event) -> Event {
        let mut event = event.clone();
        event.registered_count = self.registered_count(event.id);
        event
    }
}

#[async_trait]
impl ClassStore for MemoryStore {
    async fn insert_class(&self, class: &Class) -> StoreResult<()> {
        self.state.write().await.classes.insert(class.id, class.clone());
        Ok(())
    }

    async fn find_class(&self, id: Uuid) -> StoreResult<Option<Class>> {
        Ok(self.state.read().await.classes.get(&id).cloned())
    }

    async fn list_classes(&self, filter: CatalogFilter, page: Page) -> StoreResult<Vec<Class>> {
        let state = self.state.read().await;
        let mut classes: Vec<Class> = state
            .classes
            .values()
            .filter(|c| !filter.published_only || c.is_published)
            .filter(|c| filter.owner_id.map_or(true, |owner| c.collaborator_id == owner))
            .cloned()
            .collect();
        classes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(classes))
    }

    async fn save_class(&self, class: &Class) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let existing = state
            .classes
            .get_mut(&class.id)
            .ok_or_else(|| StoreError::NotFound("Class".into()))?;
        existing.title = class.title.clone();
        existing.description = class.description.clone();
        existing.category = class.category.clone();
        existing.thumbnail_url = class.thumbnail_url.clone();
        existing.updated_at = class.updated_at;
        Ok(())
    }

    async fn set_class_published(&self, id: Uuid, published: bool) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.classes.get_mut(&id) {
            Some(class) => {
                class.is_published = published;
                class.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete_class(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.classes.remove(&id).is_none() {
            return Ok(false);
        }
        state.videos.retain(|_, v| v.class_id != id);
        state.enrollments.retain(|(class_id, _), _| *class_id != id);
        state.reviews.retain(|(class_id, _), _| *class_id != id);
        Ok(true)
    }

    async fn insert_video(&self, video: &Video) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.classes.contains_key(&video.class_id) {
            return Err(StoreError::NotFound("Class".into()));
        }
        state.videos.insert(video.id, video.clone());
        Ok(())
    }

    async fn find_video(&self, class_id: Uuid, video_id: Uuid) -> StoreResult<Option<Video>> {
        let state = self.state.read().await;
        Ok(state.videos.get(&video_id).filter(|v| v.class_id == class_id).cloned())
    }

    async fn list_videos(&self, class_id: Uuid) -> StoreResult<Vec<Video>> {
        let state = self.state.read().await;
        let mut videos: Vec<Video> = state.videos.values().filter(|v| v.class_id == class_id).cloned().collect();
        videos.sort_by(|a, b| a.position.cmp(&b.position).then(a.created_at.cmp(&b.created_at)));
        Ok(videos)
    }

    async fn save_video(&self, video: &Video) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.videos.get_mut(&video.id) {
            Some(existing) if existing.class_id == video.class_id => {
                *existing = video.clone();
                Ok(())
            }
            _ => Err(StoreError::NotFound("Video".into())),
        }
    }

    async fn delete_video(&self, class_id: Uuid, video_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let matches = state.videos.get(&video_id).is_some_and(|v| v.class_id == class_id);
        if matches {
            state.videos.remove(&video_id);
        }
        Ok(matches)
    }

    async fn enroll(&self, enrollment: &Enrollment) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let key = (enrollment.class_id, enrollment.account_id);
        if state.enrollments.contains_key(&key) {
            return Err(StoreError::Conflict("You are already enrolled in this class".into()));
        }
        state.enrollments.insert(key, enrollment.clone());
        Ok(())
    }

    async fn find_enrollment(&self, class_id: Uuid, account_id: Uuid) -> StoreResult<Option<Enrollment>> {
        Ok(self.state.read().await.enrollments.get(&(class_id, account_id)).cloned())
    }

    async fn save_enrollment(&self, enrollment: &Enrollment) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let existing = state
            .enrollments
            .get_mut(&(enrollment.class_id, enrollment.account_id))
            .ok_or_else(|| StoreError::NotFound("Enrollment".into()))?;
        *existing = enrollment.clone();
        Ok(())
    }

    async fn list_enrollments(&self, account_id: Uuid, page: Page) -> StoreResult<Vec<Enrollment>> {
        let state = self.state.read().await;
        let mut enrollments: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(page.apply(enrollments))
    }

    async fn upsert_review(&self, review: &Review) -> StoreResult<RatingSummary> {
        let mut state = self.state.write().await;
        if !state.classes.contains_key(&review.class_id) {
            return Err(StoreError::NotFound("Class".into()));
        }

        let key = (review.class_id, review.account_id);
        let mut stored = review.clone();
        if let Some(previous) = state.reviews.get(&key) {
            stored.created_at = previous.created_at;
        }
        state.reviews.insert(key, stored);

        let ratings: Vec<i32> = state
            .reviews
            .values()
            .filter(|r| r.class_id == review.class_id)
            .map(|r| r.rating)
            .collect();
        let summary = RatingSummary::from_ratings(&ratings);

        if let Some(class) = state.classes.get_mut(&review.class_id) {
            class.average_rating = summary.average_rating;
            class.review_count = summary.review_count;
        }
        Ok(summary)
    }

    async fn list_reviews(&self, class_id: Uuid, page: Page) -> StoreResult<Vec<Review>> {
        let state = self.state.read().await;
        let mut reviews: Vec<Review> = state.reviews.values().filter(|r| r.class_id == class_id).cloned().collect();
        reviews.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(page.apply(reviews))
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        self.state.write().await.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let state = self.state.read().await;
        Ok(state.events.get(&id).map(|e| state.event_view(e)))
    }

    async fn list_events(&self, filter: CatalogFilter, page: Page) -> StoreResult<Vec<Event>> {
        let state = self.state.read().await;
        let now = Utc::now();
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| !filter.published_only || e.is_published)
            .filter(|e| filter.owner_id.map_or(true, |owner| e.organizer_id == owner))
            .filter(|e| !filter.upcoming_only || e.starts_at >= now)
            .map(|e| state.event_view(e))
            .collect();
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        Ok(page.apply(events))
    }

    async fn save_event(&self, event: &Event) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let existing = state
            .events
            .get_mut(&event.id)
            .ok_or_else(|| StoreError::NotFound("Event".into()))?;
        existing.title = event.title.clone();
        existing.description = event.description.clone();
        existing.location = event.location.clone();
        existing.is_online = event.is_online;
        existing.starts_at = event.starts_at;
        existing.ends_at = event.ends_at;
        existing.capacity = event.capacity;
        existing.waitlist_enabled = event.waitlist_enabled;
        existing.updated_at = event.updated_at;
        Ok(())
    }

    async fn set_event_published(&self, id: Uuid, published: bool) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.events.get_mut(&id) {
            Some(event) => {
                event.is_published = published;
                event.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.events.remove(&id).is_none() {
            return Ok(false);
        }
        state.registrations.retain(|(event_id, _), _| *event_id != id);
        Ok(true)
    }

    async fn register_attendee(&self, event_id: Uuid, account_id: Uuid) -> StoreResult<Registration> {
        // The write guard spans the seat count and the insert
        let mut state = self.state.write().await;
        let (capacity, waitlist_enabled) = state
            .events
            .get(&event_id)
            .map(|e| (e.capacity, e.waitlist_enabled))
            .ok_or_else(|| StoreError::NotFound("Event".into()))?;

        let key = (event_id, account_id);
        if state.registrations.get(&key).is_some_and(|r| r.is_active()) {
            return Err(StoreError::Conflict("You are already registered for this event".into()));
        }

        let status = admission(state.registered_count(event_id), capacity, waitlist_enabled)
            .ok_or_else(|| StoreError::Rejected("Event is full".into()))?;

        let now = Utc::now();
        let registration = Registration {
            event_id,
            account_id,
            status,
            registered_at: now,
            updated_at: now,
        };
        state.registrations.insert(key, registration.clone());
        Ok(registration)
    }

    async fn cancel_registration(&self, event_id: Uuid, account_id: Uuid) -> StoreResult<Registration> {
        let mut state = self.state.write().await;
        match state.registrations.get_mut(&(event_id, account_id)) {
            Some(registration) if registration.is_active() => {
                registration.status = RegistrationStatus::Cancelled;
                registration.updated_at = Utc::now();
                Ok(registration.clone())
            }
            _ => Err(StoreError::NotFound("Registration".into())),
        }
    }

    async fn list_registrations(&self, event_id: Uuid) -> StoreResult<Vec<Registration>> {
        let state = self.state.read().await;
        let mut registrations: Vec<Registration> = state
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        registrations.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        Ok(registrations)
    }

    async fn list_account_registrations(&self, account_id: Uuid, page: Page) -> StoreResult<Vec<Registration>> {
        let state = self.state.read().await;
        let mut registrations: Vec<Registration> = state
            .registrations
            .values()
            .filter(|r| r.account_id == account_id && r.is_active())
            .cloned()
            .collect();
        registrations.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(page.apply(registrations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn full_event_waitlists_or_rejects() {
        let store = MemoryStore::new();
        let mut event = Event::new(Uuid::new_v4(), "Birth prep".into(), Utc::now() + Duration::days(1), 1);
        store.insert_event(&event).await.unwrap();

        let first = Uuid::new_v4();
        let registered = store.register_attendee(event.id, first).await.unwrap();
        assert_eq!(registered.status, RegistrationStatus::Registered);
        assert!(matches!(
            store.register_attendee(event.id, first).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.register_attendee(event.id, Uuid::new_v4()).await,
            Err(StoreError::Rejected(_))
        ));

        event.waitlist_enabled = true;
        store.save_event(&event).await.unwrap();
        let waiting = Uuid::new_v4();
        let waitlisted = store.register_attendee(event.id, waiting).await.unwrap();
        assert_eq!(waitlisted.status, RegistrationStatus::Waitlisted);

        // cancelling frees the seat without promoting the waitlist
        store.cancel_registration(event.id, first).await.unwrap();
        let registrations = store.list_registrations(event.id).await.unwrap();
        let still_waiting = registrations.iter().find(|r| r.account_id == waiting).unwrap();
        assert_eq!(still_waiting.status, RegistrationStatus::Waitlisted);
        assert_eq!(store.find_event(event.id).await.unwrap().unwrap().registered_count, 0);

        let rejoined = store.register_attendee(event.id, first).await.unwrap();
        assert_eq!(rejoined.status, RegistrationStatus::Registered);
    }

    #[tokio::test]
    async fn review_upsert_recomputes_rating() {
        let store = MemoryStore::new();
        let class = Class::new(Uuid::new_v4(), "Breathing basics".into());
        store.insert_class(&class).await.unwrap();

        let reviewer = Uuid::new_v4();
        let now = Utc::now();
        let mut review = Review {
            class_id: class.id,
            account_id: reviewer,
            rating: 5,
            comment: None,
            created_at: now,
            updated_at: now,
        };
        store.upsert_review(&review).await.unwrap();
        review.account_id = Uuid::new_v4();
        review.rating = 2;
        let summary = store.upsert_review(&review).await.unwrap();
        assert_eq!(summary.review_count, 2);
        assert_eq!(summary.average_rating, 3.5);

        // same reviewer replaces rather than adds
        review.rating = 4;
        let summary = store.upsert_review(&review).await.unwrap();
        assert_eq!(summary.review_count, 2);
        assert_eq!(summary.average_rating, 4.5);
        assert_eq!(store.find_class(class.id).await.unwrap().unwrap().average_rating, 4.5);
    }

    #[tokio::test]
    async fn saving_stale_copies_keeps_publish_state() {
        let store = MemoryStore::new();
        let class = Class::new(Uuid::new_v4(), "Labour positions".into());
        store.insert_class(&class).await.unwrap();
        let event = Event::new(Uuid::new_v4(), "Meetup".into(), Utc::now() + Duration::days(2), 10);
        store.insert_event(&event).await.unwrap();

        let mut stale_class = store.find_class(class.id).await.unwrap().unwrap();
        let mut stale_event = store.find_event(event.id).await.unwrap().unwrap();
        assert!(store.set_class_published(class.id, true).await.unwrap());
        assert!(store.set_event_published(event.id, true).await.unwrap());

        stale_class.title = "Labour positions 101".into();
        store.save_class(&stale_class).await.unwrap();
        stale_event.capacity = 12;
        store.save_event(&stale_event).await.unwrap();

        let stored_class = store.find_class(class.id).await.unwrap().unwrap();
        assert!(stored_class.is_published);
        assert_eq!(stored_class.title, "Labour positions 101");
        let stored_event = store.find_event(event.id).await.unwrap().unwrap();
        assert!(stored_event.is_published);
        assert_eq!(stored_event.capacity, 12);

        assert!(!store.set_class_published(Uuid::new_v4(), true).await.unwrap());
    }
}
