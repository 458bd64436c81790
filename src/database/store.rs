//! Persistence gateway.
//!
//! Handlers only ever talk to storage through these traits. Each area of the
//! API gets its own trait; `Store` bundles them so the application state can
//! hold a single `Arc<dyn Store>`.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::database::models::{
    Account, AccountWithProfile, Class, Comment, DashboardStats, Enrollment, Event, Group, Media, Membership,
    Notification, Post, Pregnancy, Profile, RatingSummary, ReactionCount, ReactionToggle, Registration, Report,
    Review, SymptomLog, Video, WeekGuide,
};
use crate::database::{Page, StoreResult};
use crate::types::{ReactionKind, ReportStatus, Role};

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Creates the account and its profile together; duplicate email is a conflict
    async fn create_account(&self, account: &Account, profile: &Profile) -> StoreResult<()>;
    async fn find_account(&self, id: Uuid) -> StoreResult<Option<AccountWithProfile>>;
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<AccountWithProfile>>;
    /// Writes the self-editable name and phone fields only
    async fn save_account(&self, account: &Account) -> StoreResult<()>;
    /// Writes the editable profile fields; a collaborator's `verified_at` is left alone
    async fn save_profile(&self, account_id: Uuid, profile: &Profile) -> StoreResult<()>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;
    /// Marks a collaborator verified; false when missing, not a collaborator, or already verified
    async fn verify_collaborator(&self, id: Uuid) -> StoreResult<bool>;
    /// Saves names and profile, flags onboarding done and starts the pregnancy, all or nothing
    async fn complete_onboarding(
        &self,
        account: &Account,
        profile: &Profile,
        pregnancy: Option<&Pregnancy>,
    ) -> StoreResult<()>;
    async fn list_accounts(&self, role: Option<Role>, page: Page) -> StoreResult<Vec<Account>>;
}

#[async_trait]
pub trait PregnancyStore: Send + Sync {
    /// Conflict when the mother already has an active pregnancy
    async fn insert_pregnancy(&self, pregnancy: &Pregnancy) -> StoreResult<()>;
    async fn find_pregnancy(&self, id: Uuid) -> StoreResult<Option<Pregnancy>>;
    async fn active_pregnancy(&self, mother_id: Uuid) -> StoreResult<Option<Pregnancy>>;
    /// Conflict when saving would leave two active pregnancies for one mother
    async fn save_pregnancy(&self, pregnancy: &Pregnancy) -> StoreResult<()>;
    /// Caches the gestational week computed from `due_date`; skipped if the due date has since moved
    async fn update_pregnancy_week(&self, id: Uuid, due_date: NaiveDate, week: i32) -> StoreResult<()>;
    async fn insert_symptom(&self, symptom: &SymptomLog) -> StoreResult<()>;
    async fn list_symptoms(&self, pregnancy_id: Uuid, week: Option<i32>, page: Page) -> StoreResult<Vec<SymptomLog>>;
    async fn find_week_guide(&self, week: i32) -> StoreResult<Option<WeekGuide>>;
    async fn save_week_guide(&self, guide: &WeekGuide) -> StoreResult<()>;
}

#[async_trait]
pub trait CommunityStore: Send + Sync {
    /// Inserts the group and the creator's owner membership
    async fn create_group(&self, group: &Group) -> StoreResult<()>;
    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>>;
    async fn list_groups(&self, page: Page) -> StoreResult<Vec<Group>>;
    /// Writes name, description and category of a live group; NotFound once deleted
    async fn save_group(&self, group: &Group) -> StoreResult<()>;
    /// Stamps `deleted_at`; false when the group is missing or already deleted
    async fn soft_delete_group(&self, id: Uuid) -> StoreResult<bool>;
    /// Conflict when the account is already a member
    async fn join_group(&self, membership: &Membership) -> StoreResult<()>;
    async fn find_membership(&self, group_id: Uuid, account_id: Uuid) -> StoreResult<Option<Membership>>;
    async fn leave_group(&self, group_id: Uuid, account_id: Uuid) -> StoreResult<bool>;

    async fn insert_post(&self, post: &Post) -> StoreResult<()>;
    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>>;
    async fn list_posts(&self, group_id: Option<Uuid>, page: Page) -> StoreResult<Vec<Post>>;
    /// Writes content and image of a live post; NotFound once deleted
    async fn save_post(&self, post: &Post) -> StoreResult<()>;
    async fn soft_delete_post(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()>;
    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn list_comments(&self, post_id: Uuid, page: Page) -> StoreResult<Vec<Comment>>;
    async fn soft_delete_comment(&self, id: Uuid) -> StoreResult<bool>;

    /// Add, switch or remove the account's reaction on a post in one step
    async fn toggle_reaction(&self, post_id: Uuid, account_id: Uuid, kind: ReactionKind) -> StoreResult<ReactionToggle>;
    async fn reaction_counts(&self, post_id: Uuid) -> StoreResult<Vec<ReactionCount>>;
}

/// Listing filter shared by classes and events
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogFilter {
    pub published_only: bool,
    pub owner_id: Option<Uuid>,
    pub upcoming_only: bool,
}

#[async_trait]
pub trait ClassStore: Send + Sync {
    async fn insert_class(&self, class: &Class) -> StoreResult<()>;
    async fn find_class(&self, id: Uuid) -> StoreResult<Option<Class>>;
    async fn list_classes(&self, filter: CatalogFilter, page: Page) -> StoreResult<Vec<Class>>;
    /// Writes the author-editable fields; publish state and rating are left alone
    async fn save_class(&self, class: &Class) -> StoreResult<()>;
    /// False when the class does not exist
    async fn set_class_published(&self, id: Uuid, published: bool) -> StoreResult<bool>;
    /// Removes the class with its videos, enrollments and reviews
    async fn delete_class(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_video(&self, video: &Video) -> StoreResult<()>;
    async fn find_video(&self, class_id: Uuid, video_id: Uuid) -> StoreResult<Option<Video>>;
    /// Ordered by position
    async fn list_videos(&self, class_id: Uuid) -> StoreResult<Vec<Video>>;
    async fn save_video(&self, video: &Video) -> StoreResult<()>;
    async fn delete_video(&self, class_id: Uuid, video_id: Uuid) -> StoreResult<bool>;

    /// Conflict when already enrolled
    async fn enroll(&self, enrollment: &Enrollment) -> StoreResult<()>;
    async fn find_enrollment(&self, class_id: Uuid, account_id: Uuid) -> StoreResult<Option<Enrollment>>;
    async fn save_enrollment(&self, enrollment: &Enrollment) -> StoreResult<()>;
    async fn list_enrollments(&self, account_id: Uuid, page: Page) -> StoreResult<Vec<Enrollment>>;

    /// Insert or replace the account's review, then recompute and store the class rating
    async fn upsert_review(&self, review: &Review) -> StoreResult<RatingSummary>;
    async fn list_reviews(&self, class_id: Uuid, page: Page) -> StoreResult<Vec<Review>>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: &Event) -> StoreResult<()>;
    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>>;
    async fn list_events(&self, filter: CatalogFilter, page: Page) -> StoreResult<Vec<Event>>;
    /// Writes the organizer-editable fields; publish state is left alone
    async fn save_event(&self, event: &Event) -> StoreResult<()>;
    async fn set_event_published(&self, id: Uuid, published: bool) -> StoreResult<bool>;
    async fn delete_event(&self, id: Uuid) -> StoreResult<bool>;

    /// Capacity check and insert as one atomic step.
    ///
    /// NotFound for a missing event, Conflict for an existing active registration,
    /// Rejected when the event is full and has no waitlist.
    async fn register_attendee(&self, event_id: Uuid, account_id: Uuid) -> StoreResult<Registration>;
    /// NotFound when there is no active registration to cancel
    async fn cancel_registration(&self, event_id: Uuid, account_id: Uuid) -> StoreResult<Registration>;
    async fn list_registrations(&self, event_id: Uuid) -> StoreResult<Vec<Registration>>;
    async fn list_account_registrations(&self, account_id: Uuid, page: Page) -> StoreResult<Vec<Registration>>;
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn insert_media(&self, media: &Media) -> StoreResult<()>;
    async fn find_media(&self, id: Uuid) -> StoreResult<Option<Media>>;
    async fn list_media(&self, owner_id: Uuid, page: Page) -> StoreResult<Vec<Media>>;
    async fn delete_media(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;
    async fn find_notification(&self, id: Uuid) -> StoreResult<Option<Notification>>;
    async fn list_notifications(&self, account_id: Uuid, unread_only: bool, page: Page) -> StoreResult<Vec<Notification>>;
    async fn mark_read(&self, id: Uuid) -> StoreResult<()>;
    async fn mark_all_read(&self, account_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, report: &Report) -> StoreResult<()>;
    async fn find_report(&self, id: Uuid) -> StoreResult<Option<Report>>;
    async fn list_reports(&self, status: Option<ReportStatus>, page: Page) -> StoreResult<Vec<Report>>;
    async fn save_report(&self, report: &Report) -> StoreResult<()>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn dashboard_stats(&self) -> StoreResult<DashboardStats>;
    /// Cheap connectivity probe for the health endpoint
    async fn ping(&self) -> StoreResult<()>;
}

pub trait Store:
    AccountStore
    + PregnancyStore
    + CommunityStore
    + ClassStore
    + EventStore
    + MediaStore
    + NotificationStore
    + ReportStore
    + AdminStore
{
}

impl<T> Store for T where
    T: AccountStore
        + PregnancyStore
        + CommunityStore
        + ClassStore
        + EventStore
        + MediaStore
        + NotificationStore
        + ReportStore
        + AdminStore
{
}
