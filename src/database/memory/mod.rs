//! In-memory `Store` for development and tests.
//!
//! All state sits behind one async `RwLock`, so every trait method is atomic
//! with respect to the others. Derived counters (members, reactions, seats)
//! are computed on read, the same way the Postgres queries aggregate them.

mod catalog;
mod community;
mod content;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{
    Account, AccountWithProfile, Class, Comment, DashboardStats, Enrollment, Event, Group, Media, Membership,
    Notification, Post, Pregnancy, Profile, Reaction, Registration, Report, Review, SymptomLog, Video, WeekGuide,
};
use crate::database::store::{AccountStore, AdminStore, PregnancyStore};
use crate::database::{Page, StoreError, StoreResult};
use crate::types::{PregnancyStatus, RegistrationStatus, ReportStatus, Role};

type Pair = (Uuid, Uuid);

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    profiles: HashMap<Uuid, Profile>,
    pregnancies: HashMap<Uuid, Pregnancy>,
    symptoms: Vec<SymptomLog>,
    week_guides: BTreeMap<i32, WeekGuide>,
    groups: HashMap<Uuid, Group>,
    memberships: HashMap<Pair, Membership>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    reactions: HashMap<Pair, Reaction>,
    classes: HashMap<Uuid, Class>,
    videos: HashMap<Uuid, Video>,
    enrollments: HashMap<Pair, Enrollment>,
    reviews: HashMap<Pair, Review>,
    events: HashMap<Uuid, Event>,
    registrations: HashMap<Pair, Registration>,
    media: HashMap<Uuid, Media>,
    notifications: HashMap<Uuid, Notification>,
    reports: HashMap<Uuid, Report>,
}

/// Thread-safe in-memory store; clones share the same state
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    fn with_profile(&self, account: &Account) -> AccountWithProfile {
        let profile = self
            .profiles
            .get(&account.id)
            .cloned()
            .unwrap_or_else(|| Profile::empty_for(account.role));
        AccountWithProfile {
            account: account.clone(),
            profile,
        }
    }

    fn update_names(&mut self, account: &Account) -> StoreResult<()> {
        let existing = self
            .accounts
            .get_mut(&account.id)
            .ok_or_else(|| StoreError::NotFound("Account".into()))?;
        existing.first_name = account.first_name.clone();
        existing.last_name = account.last_name.clone();
        existing.phone = account.phone.clone();
        existing.updated_at = account.updated_at;
        Ok(())
    }

    fn update_profile(&mut self, account_id: Uuid, profile: &Profile) -> StoreResult<()> {
        if !self.accounts.contains_key(&account_id) {
            return Err(StoreError::NotFound("Account".into()));
        }
        let mut profile = profile.clone();
        if let (Profile::Collaborator(incoming), Some(Profile::Collaborator(stored))) =
            (&mut profile, self.profiles.get(&account_id))
        {
            incoming.verified_at = stored.verified_at;
        }
        self.profiles.insert(account_id, profile);
        Ok(())
    }

    fn other_active_pregnancy(&self, pregnancy: &Pregnancy) -> bool {
        self.pregnancies
            .values()
            .any(|p| p.mother_id == pregnancy.mother_id && p.id != pregnancy.id && p.is_active())
    }

    fn registered_count(&self, event_id: Uuid) -> i64 {
        self.registrations
            .values()
            .filter(|r| r.event_id == event_id && r.status == RegistrationStatus::Registered)
            .count() as i64
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, account: &Account, profile: &Profile) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict("An account with this email already exists".into()));
        }
        state.accounts.insert(account.id, account.clone());
        state.profiles.insert(account.id, profile.clone());
        Ok(())
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<AccountWithProfile>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).map(|a| state.with_profile(a)))
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<AccountWithProfile>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.email == email)
            .map(|a| state.with_profile(a)))
    }

    async fn save_account(&self, account: &Account) -> StoreResult<()> {
        self.state.write().await.update_names(account)
    }

    async fn save_profile(&self, account_id: Uuid, profile: &Profile) -> StoreResult<()> {
        self.state.write().await.update_profile(account_id, profile)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("Account".into()))?;
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn verify_collaborator(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let Some(account) = state
            .accounts
            .get_mut(&id)
            .filter(|a| a.role == Role::Collaborator && !a.is_verified)
        else {
            return Ok(false);
        };
        let now = Utc::now();
        account.is_verified = true;
        account.updated_at = now;

        let profile = state
            .profiles
            .entry(id)
            .or_insert_with(|| Profile::empty_for(Role::Collaborator));
        if let Profile::Collaborator(collaborator) = profile {
            collaborator.verified_at = Some(now);
        }
        Ok(true)
    }

    async fn complete_onboarding(
        &self,
        account: &Account,
        profile: &Profile,
        pregnancy: Option<&Pregnancy>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(&account.id) {
            return Err(StoreError::NotFound("Account".into()));
        }
        if let Some(pregnancy) = pregnancy {
            if pregnancy.is_active() && state.other_active_pregnancy(pregnancy) {
                return Err(StoreError::Conflict("You already have an active pregnancy".into()));
            }
        }

        state.update_names(account)?;
        state.update_profile(account.id, profile)?;
        if let Some(stored) = state.accounts.get_mut(&account.id) {
            stored.onboarding_completed = true;
        }
        if let Some(pregnancy) = pregnancy {
            state.pregnancies.insert(pregnancy.id, pregnancy.clone());
        }
        Ok(())
    }

    async fn list_accounts(&self, role: Option<Role>, page: Page) -> StoreResult<Vec<Account>> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| role.map_or(true, |r| a.role == r))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(accounts))
    }
}

#[async_trait]
impl PregnancyStore for MemoryStore {
    async fn insert_pregnancy(&self, pregnancy: &Pregnancy) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if pregnancy.is_active() && state.other_active_pregnancy(pregnancy) {
            return Err(StoreError::Conflict("You already have an active pregnancy".into()));
        }
        state.pregnancies.insert(pregnancy.id, pregnancy.clone());
        Ok(())
    }

    async fn find_pregnancy(&self, id: Uuid) -> StoreResult<Option<Pregnancy>> {
        Ok(self.state.read().await.pregnancies.get(&id).cloned())
    }

    async fn active_pregnancy(&self, mother_id: Uuid) -> StoreResult<Option<Pregnancy>> {
        let state = self.state.read().await;
        Ok(state
            .pregnancies
            .values()
            .find(|p| p.mother_id == mother_id && p.is_active())
            .cloned())
    }

    async fn save_pregnancy(&self, pregnancy: &Pregnancy) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.pregnancies.contains_key(&pregnancy.id) {
            return Err(StoreError::NotFound("Pregnancy".into()));
        }
        if pregnancy.is_active() && state.other_active_pregnancy(pregnancy) {
            return Err(StoreError::Conflict("You already have an active pregnancy".into()));
        }
        state.pregnancies.insert(pregnancy.id, pregnancy.clone());
        Ok(())
    }

    async fn update_pregnancy_week(&self, id: Uuid, due_date: NaiveDate, week: i32) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(pregnancy) = state.pregnancies.get_mut(&id) {
            if pregnancy.due_date == due_date && pregnancy.current_week != week {
                pregnancy.current_week = week;
                pregnancy.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn insert_symptom(&self, symptom: &SymptomLog) -> StoreResult<()> {
        self.state.write().await.symptoms.push(symptom.clone());
        Ok(())
    }

    async fn list_symptoms(&self, pregnancy_id: Uuid, week: Option<i32>, page: Page) -> StoreResult<Vec<SymptomLog>> {
        let state = self.state.read().await;
        let mut logs: Vec<SymptomLog> = state
            .symptoms
            .iter()
            .filter(|s| s.pregnancy_id == pregnancy_id && week.map_or(true, |w| s.week == w))
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        Ok(page.apply(logs))
    }

    async fn find_week_guide(&self, week: i32) -> StoreResult<Option<WeekGuide>> {
        Ok(self.state.read().await.week_guides.get(&week).cloned())
    }

    async fn save_week_guide(&self, guide: &WeekGuide) -> StoreResult<()> {
        self.state.write().await.week_guides.insert(guide.week, guide.clone());
        Ok(())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        let state = self.state.read().await;
        let count_role = |role: Role| state.accounts.values().filter(|a| a.role == role).count() as i64;

        Ok(DashboardStats {
            mothers: count_role(Role::Mother),
            collaborators: count_role(Role::Collaborator),
            admins: count_role(Role::Admin),
            active_pregnancies: state
                .pregnancies
                .values()
                .filter(|p| p.status == PregnancyStatus::Active)
                .count() as i64,
            groups: state.groups.values().filter(|g| g.lifecycle.is_live()).count() as i64,
            posts: state.posts.values().filter(|p| p.lifecycle.is_live()).count() as i64,
            classes: state.classes.len() as i64,
            published_classes: state.classes.values().filter(|c| c.is_published).count() as i64,
            events: state.events.len() as i64,
            published_events: state.events.values().filter(|e| e.is_published).count() as i64,
            active_registrations: state.registrations.values().filter(|r| r.is_active()).count() as i64,
            pending_reports: state
                .reports
                .values()
                .filter(|r| r.status == ReportStatus::Pending)
                .count() as i64,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::EventStore;
    use chrono::Duration;

    fn account(email: &str, role: Role) -> Account {
        Account::new(email, "hash".into(), "Test".into(), "User".into(), None, role)
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let first = account("a@example.com", Role::Mother);
        store.create_account(&first, &Profile::empty_for(Role::Mother)).await.unwrap();

        let second = account("a@example.com", Role::Collaborator);
        let err = store
            .create_account(&second, &Profile::empty_for(Role::Collaborator))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let found = store.find_account_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(found.account.id, first.id);
        assert_eq!(found.profile.role(), Role::Mother);
    }

    #[tokio::test]
    async fn one_active_pregnancy_per_mother() {
        let store = MemoryStore::new();
        let mother = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let first = Pregnancy::new(mother, today + Duration::weeks(10), today);
        store.insert_pregnancy(&first).await.unwrap();

        let second = Pregnancy::new(mother, today + Duration::weeks(20), today);
        assert!(matches!(
            store.insert_pregnancy(&second).await,
            Err(StoreError::Conflict(_))
        ));

        let mut done = first.clone();
        done.status = PregnancyStatus::Completed;
        store.save_pregnancy(&done).await.unwrap();
        store.insert_pregnancy(&second).await.unwrap();

        // reactivating the first would leave two active
        let mut reactivated = done.clone();
        reactivated.status = PregnancyStatus::Active;
        assert!(matches!(
            store.save_pregnancy(&reactivated).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_registrations_never_exceed_capacity() {
        let store = MemoryStore::new();
        let event = Event::new(Uuid::new_v4(), "Prenatal yoga".into(), Utc::now() + Duration::days(3), 3);
        store.insert_event(&event).await.unwrap();

        let attempts = (0..20).map(|_| {
            let store = store.clone();
            let event_id = event.id;
            tokio::spawn(async move { store.register_attendee(event_id, Uuid::new_v4()).await })
        });
        let results = futures::future::join_all(attempts).await;
        let admitted = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();

        assert_eq!(admitted, 3);
        let stored = store.find_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.registered_count, 3);
    }

    #[tokio::test]
    async fn week_refresh_ignores_moved_due_date() {
        let store = MemoryStore::new();
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let pregnancy = Pregnancy::new(Uuid::new_v4(), today + Duration::weeks(10), today);
        store.insert_pregnancy(&pregnancy).await.unwrap();

        let mut stale = pregnancy.clone();
        assert!(stale.refresh_week(today + Duration::weeks(1)));

        let mut edited = pregnancy.clone();
        edited.due_date = today + Duration::weeks(12);
        edited.current_week = 28;
        edited.baby_name = Some("Ada".into());
        store.save_pregnancy(&edited).await.unwrap();

        store
            .update_pregnancy_week(stale.id, stale.due_date, stale.current_week)
            .await
            .unwrap();
        let stored = store.find_pregnancy(pregnancy.id).await.unwrap().unwrap();
        assert_eq!(stored.due_date, edited.due_date);
        assert_eq!(stored.current_week, 28);
        assert_eq!(stored.baby_name.as_deref(), Some("Ada"));

        store
            .update_pregnancy_week(pregnancy.id, edited.due_date, 29)
            .await
            .unwrap();
        let stored = store.find_pregnancy(pregnancy.id).await.unwrap().unwrap();
        assert_eq!(stored.current_week, 29);
        assert_eq!(stored.baby_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn stale_profile_save_keeps_verification() {
        let store = MemoryStore::new();
        let collaborator = account("doula@example.com", Role::Collaborator);
        store
            .create_account(&collaborator, &Profile::empty_for(Role::Collaborator))
            .await
            .unwrap();
        let stale = store.find_account(collaborator.id).await.unwrap().unwrap();

        assert!(store.verify_collaborator(collaborator.id).await.unwrap());
        assert!(!store.verify_collaborator(collaborator.id).await.unwrap());

        let mut account = stale.account;
        account.first_name = "Maria".into();
        store.save_account(&account).await.unwrap();
        store.save_profile(account.id, &stale.profile).await.unwrap();

        let stored = store.find_account(collaborator.id).await.unwrap().unwrap();
        assert!(stored.account.is_verified);
        assert_eq!(stored.account.first_name, "Maria");
        match stored.profile {
            Profile::Collaborator(profile) => assert!(profile.verified_at.is_some()),
            other => panic!("unexpected profile {:?}", other),
        }
    }

    #[tokio::test]
    async fn only_unverified_collaborators_are_verified() {
        let store = MemoryStore::new();
        let mother = account("mum@example.com", Role::Mother);
        store.create_account(&mother, &Profile::empty_for(Role::Mother)).await.unwrap();

        assert!(!store.verify_collaborator(mother.id).await.unwrap());
        assert!(!store.verify_collaborator(Uuid::new_v4()).await.unwrap());
        let stored = store.find_account(mother.id).await.unwrap().unwrap();
        assert!(!stored.account.is_verified);
    }

    #[tokio::test]
    async fn onboarding_is_all_or_nothing() {
        let store = MemoryStore::new();
        let mother = account("mum@example.com", Role::Mother);
        store.create_account(&mother, &Profile::empty_for(Role::Mother)).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        store
            .insert_pregnancy(&Pregnancy::new(mother.id, today + Duration::weeks(10), today))
            .await
            .unwrap();

        let mut named = mother.clone();
        named.first_name = "Ana".into();
        let second = Pregnancy::new(mother.id, today + Duration::weeks(20), today);
        let err = store
            .complete_onboarding(&named, &Profile::empty_for(Role::Mother), Some(&second))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let stored = store.find_account(mother.id).await.unwrap().unwrap();
        assert!(!stored.account.onboarding_completed);
        assert_eq!(stored.account.first_name, "Test");
        assert!(store.find_pregnancy(second.id).await.unwrap().is_none());

        store
            .complete_onboarding(&named, &Profile::empty_for(Role::Mother), None)
            .await
            .unwrap();
        let stored = store.find_account(mother.id).await.unwrap().unwrap();
        assert!(stored.account.onboarding_completed);
        assert_eq!(stored.account.first_name, "Ana");
    }

    #[tokio::test]
    async fn password_change_touches_only_the_hash() {
        let store = MemoryStore::new();
        let mother = account("mum@example.com", Role::Mother);
        store.create_account(&mother, &Profile::empty_for(Role::Mother)).await.unwrap();

        let mut stale = mother.clone();
        stale.password_hash = "stale".into();
        store.set_password(mother.id, "fresh").await.unwrap();
        store.save_account(&stale).await.unwrap();

        let stored = store.find_account(mother.id).await.unwrap().unwrap();
        assert_eq!(stored.account.password_hash, "fresh");
        assert!(matches!(
            store.set_password(Uuid::new_v4(), "x").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
