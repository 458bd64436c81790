//! Postgres `Store` backed by a sqlx pool.
//!
//! Queries are plain runtime strings mapped with `FromRow`; the schema lives in
//! sql/schema.sql. Soft-deletable rows carry `deleted_at`, which is converted to
//! `Lifecycle` here and nowhere else.

mod catalog;
mod community;
mod content;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::try_join_all;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::models::{
    Account, AccountWithProfile, AdminProfile, CollaboratorProfile, DashboardStats, MotherProfile, Pregnancy, Profile,
    SymptomLog, WeekGuide,
};
use crate::database::store::{AccountStore, AdminStore, PregnancyStore};
use crate::database::{Page, StoreError, StoreResult};
use crate::types::Role;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_profile(&self, account: &Account) -> StoreResult<Profile> {
        let profile = match account.role {
            Role::Mother => sqlx::query_as::<_, MotherProfile>(
                "SELECT date_of_birth, location, bio, avatar_url, first_pregnancy
                 FROM mother_profiles WHERE account_id = $1",
            )
            .bind(account.id)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::Mother),
            Role::Collaborator => sqlx::query_as::<_, CollaboratorProfile>(
                "SELECT profession, credentials, bio, avatar_url, verified_at
                 FROM collaborator_profiles WHERE account_id = $1",
            )
            .bind(account.id)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::Collaborator),
            Role::Admin => sqlx::query_as::<_, AdminProfile>("SELECT department FROM admin_profiles WHERE account_id = $1")
                .bind(account.id)
                .fetch_optional(&self.pool)
                .await?
                .map(Profile::Admin),
        };
        Ok(profile.unwrap_or_else(|| Profile::empty_for(account.role)))
    }

    async fn with_profile(&self, account: Option<Account>) -> StoreResult<Option<AccountWithProfile>> {
        match account {
            Some(account) => {
                let profile = self.load_profile(&account).await?;
                Ok(Some(AccountWithProfile { account, profile }))
            }
            None => Ok(None),
        }
    }
}

/// Map a unique-constraint violation to a conflict with the given message
pub(crate) fn conflict_on_unique(message: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => StoreError::Conflict(message.to_string()),
        _ => StoreError::Database(err),
    }
}

/// Fail with NotFound when an UPDATE/DELETE touched nothing
pub(crate) fn affected(rows: u64, entity: &str) -> StoreResult<()> {
    if rows == 0 {
        Err(StoreError::NotFound(entity.to_string()))
    } else {
        Ok(())
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, is_verified, \
                               onboarding_completed, created_at, updated_at";

const PREGNANCY_COLUMNS: &str = "id, mother_id, due_date, current_week, status, baby_name, notes, created_at, updated_at";

async fn update_names(conn: &mut PgConnection, account: &Account) -> StoreResult<()> {
    let result = sqlx::query(
        "UPDATE accounts SET first_name = $2, last_name = $3, phone = $4, updated_at = $5 WHERE id = $1",
    )
    .bind(account.id)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&account.phone)
    .bind(account.updated_at)
    .execute(&mut *conn)
    .await?;
    affected(result.rows_affected(), "Account")
}

/// Writes the role-specific columns; `verified_at` is only set on first insert
async fn upsert_profile(conn: &mut PgConnection, account_id: Uuid, profile: &Profile) -> StoreResult<()> {
    match profile {
        Profile::Mother(p) => {
            sqlx::query(
                "INSERT INTO mother_profiles (account_id, date_of_birth, location, bio, avatar_url, first_pregnancy)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (account_id) DO UPDATE SET
                    date_of_birth = EXCLUDED.date_of_birth, location = EXCLUDED.location, bio = EXCLUDED.bio,
                    avatar_url = EXCLUDED.avatar_url, first_pregnancy = EXCLUDED.first_pregnancy",
            )
            .bind(account_id)
            .bind(p.date_of_birth)
            .bind(&p.location)
            .bind(&p.bio)
            .bind(&p.avatar_url)
            .bind(p.first_pregnancy)
            .execute(&mut *conn)
            .await?;
        }
        Profile::Collaborator(p) => {
            sqlx::query(
                "INSERT INTO collaborator_profiles (account_id, profession, credentials, bio, avatar_url, verified_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (account_id) DO UPDATE SET
                    profession = EXCLUDED.profession, credentials = EXCLUDED.credentials, bio = EXCLUDED.bio,
                    avatar_url = EXCLUDED.avatar_url",
            )
            .bind(account_id)
            .bind(&p.profession)
            .bind(&p.credentials)
            .bind(&p.bio)
            .bind(&p.avatar_url)
            .bind(p.verified_at)
            .execute(&mut *conn)
            .await?;
        }
        Profile::Admin(p) => {
            sqlx::query(
                "INSERT INTO admin_profiles (account_id, department) VALUES ($1, $2)
                 ON CONFLICT (account_id) DO UPDATE SET department = EXCLUDED.department",
            )
            .bind(account_id)
            .bind(&p.department)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

async fn insert_pregnancy(conn: &mut PgConnection, pregnancy: &Pregnancy) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO pregnancies (id, mother_id, due_date, current_week, status, baby_name, notes, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(pregnancy.id)
    .bind(pregnancy.mother_id)
    .bind(pregnancy.due_date)
    .bind(pregnancy.current_week)
    .bind(pregnancy.status)
    .bind(&pregnancy.baby_name)
    .bind(&pregnancy.notes)
    .bind(pregnancy.created_at)
    .bind(pregnancy.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(conflict_on_unique("You already have an active pregnancy"))?;
    Ok(())
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_account(&self, account: &Account, profile: &Profile) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO accounts (id, email, password_hash, first_name, last_name, phone, role, is_verified,
                                   onboarding_completed, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.phone)
        .bind(account.role)
        .bind(account.is_verified)
        .bind(account.onboarding_completed)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(conflict_on_unique("An account with this email already exists"))?;

        upsert_profile(&mut *tx, account.id, profile).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<AccountWithProfile>> {
        let account = sqlx::query_as::<_, Account>(&format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.with_profile(account).await
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<AccountWithProfile>> {
        let account =
            sqlx::query_as::<_, Account>(&format!("SELECT {} FROM accounts WHERE email = $1", ACCOUNT_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        self.with_profile(account).await
    }

    async fn save_account(&self, account: &Account) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        update_names(&mut *conn, account).await
    }

    async fn save_profile(&self, account_id: Uuid, profile: &Profile) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_profile(&mut *conn, account_id, profile).await
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE accounts SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "Account")
    }

    async fn verify_collaborator(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE accounts SET is_verified = true, updated_at = now()
             WHERE id = $1 AND role = $2 AND NOT is_verified",
        )
        .bind(id)
        .bind(Role::Collaborator)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO collaborator_profiles (account_id, verified_at) VALUES ($1, now())
             ON CONFLICT (account_id) DO UPDATE SET verified_at = EXCLUDED.verified_at",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn complete_onboarding(
        &self,
        account: &Account,
        profile: &Profile,
        pregnancy: Option<&Pregnancy>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        if let Some(pregnancy) = pregnancy {
            insert_pregnancy(&mut *tx, pregnancy).await?;
        }
        update_names(&mut *tx, account).await?;
        let result = sqlx::query("UPDATE accounts SET onboarding_completed = true WHERE id = $1")
            .bind(account.id)
            .execute(&mut *tx)
            .await?;
        affected(result.rows_affected(), "Account")?;
        upsert_profile(&mut *tx, account.id, profile).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_accounts(&self, role: Option<Role>, page: Page) -> StoreResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts
             WHERE ($1::account_role IS NULL OR role = $1)
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            ACCOUNT_COLUMNS
        ))
        .bind(role)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }
}

#[async_trait]
impl PregnancyStore for PgStore {
    async fn insert_pregnancy(&self, pregnancy: &Pregnancy) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_pregnancy(&mut *conn, pregnancy).await
    }

    async fn find_pregnancy(&self, id: Uuid) -> StoreResult<Option<Pregnancy>> {
        let pregnancy =
            sqlx::query_as::<_, Pregnancy>(&format!("SELECT {} FROM pregnancies WHERE id = $1", PREGNANCY_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(pregnancy)
    }

    async fn active_pregnancy(&self, mother_id: Uuid) -> StoreResult<Option<Pregnancy>> {
        let pregnancy = sqlx::query_as::<_, Pregnancy>(&format!(
            "SELECT {} FROM pregnancies WHERE mother_id = $1 AND status = 'active'",
            PREGNANCY_COLUMNS
        ))
        .bind(mother_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(pregnancy)
    }

    async fn save_pregnancy(&self, pregnancy: &Pregnancy) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE pregnancies SET due_date = $2, current_week = $3, status = $4, baby_name = $5, notes = $6,
                                    updated_at = $7
             WHERE id = $1",
        )
        .bind(pregnancy.id)
        .bind(pregnancy.due_date)
        .bind(pregnancy.current_week)
        .bind(pregnancy.status)
        .bind(&pregnancy.baby_name)
        .bind(&pregnancy.notes)
        .bind(pregnancy.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conflict_on_unique("You already have an active pregnancy"))?;
        affected(result.rows_affected(), "Pregnancy")
    }

    async fn update_pregnancy_week(&self, id: Uuid, due_date: NaiveDate, week: i32) -> StoreResult<()> {
        sqlx::query(
            "UPDATE pregnancies SET current_week = $3, updated_at = now()
             WHERE id = $1 AND due_date = $2 AND current_week <> $3",
        )
        .bind(id)
        .bind(due_date)
        .bind(week)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_symptom(&self, symptom: &SymptomLog) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO symptom_logs (id, pregnancy_id, account_id, symptom, severity, notes, week, logged_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(symptom.id)
        .bind(symptom.pregnancy_id)
        .bind(symptom.account_id)
        .bind(&symptom.symptom)
        .bind(symptom.severity)
        .bind(&symptom.notes)
        .bind(symptom.week)
        .bind(symptom.logged_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_symptoms(&self, pregnancy_id: Uuid, week: Option<i32>, page: Page) -> StoreResult<Vec<SymptomLog>> {
        let logs = sqlx::query_as::<_, SymptomLog>(
            "SELECT id, pregnancy_id, account_id, symptom, severity, notes, week, logged_at
             FROM symptom_logs
             WHERE pregnancy_id = $1 AND ($2::integer IS NULL OR week = $2)
             ORDER BY logged_at DESC LIMIT $3 OFFSET $4",
        )
        .bind(pregnancy_id)
        .bind(week)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn find_week_guide(&self, week: i32) -> StoreResult<Option<WeekGuide>> {
        let guide = sqlx::query_as::<_, WeekGuide>(
            "SELECT week, title, baby_size, baby_development, mother_changes, tips, updated_at
             FROM week_guides WHERE week = $1",
        )
        .bind(week)
        .fetch_optional(&self.pool)
        .await?;
        Ok(guide)
    }

    async fn save_week_guide(&self, guide: &WeekGuide) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO week_guides (week, title, baby_size, baby_development, mother_changes, tips, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (week) DO UPDATE SET
                title = EXCLUDED.title, baby_size = EXCLUDED.baby_size, baby_development = EXCLUDED.baby_development,
                mother_changes = EXCLUDED.mother_changes, tips = EXCLUDED.tips, updated_at = EXCLUDED.updated_at",
        )
        .bind(guide.week)
        .bind(&guide.title)
        .bind(&guide.baby_size)
        .bind(&guide.baby_development)
        .bind(&guide.mother_changes)
        .bind(&guide.tips)
        .bind(guide.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// One COUNT per dashboard figure, in `DashboardStats` field order
const STAT_QUERIES: [&str; 12] = [
    "SELECT COUNT(*) FROM accounts WHERE role = 'mother'",
    "SELECT COUNT(*) FROM accounts WHERE role = 'collaborator'",
    "SELECT COUNT(*) FROM accounts WHERE role = 'admin'",
    "SELECT COUNT(*) FROM pregnancies WHERE status = 'active'",
    "SELECT COUNT(*) FROM community_groups WHERE deleted_at IS NULL",
    "SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL",
    "SELECT COUNT(*) FROM classes",
    "SELECT COUNT(*) FROM classes WHERE is_published",
    "SELECT COUNT(*) FROM events",
    "SELECT COUNT(*) FROM events WHERE is_published",
    "SELECT COUNT(*) FROM registrations WHERE status <> 'cancelled'",
    "SELECT COUNT(*) FROM reports WHERE status = 'pending'",
];

#[async_trait]
impl AdminStore for PgStore {
    async fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        let counts = try_join_all(STAT_QUERIES.iter().copied().map(|sql| async move {
            let (count,): (i64,) = sqlx::query_as(sql).fetch_one(&self.pool).await?;
            Ok::<_, StoreError>(count)
        }))
        .await?;

        Ok(DashboardStats {
            mothers: counts[0],
            collaborators: counts[1],
            admins: counts[2],
            active_pregnancies: counts[3],
            groups: counts[4],
            posts: counts[5],
            classes: counts[6],
            published_classes: counts[7],
            events: counts[8],
            published_events: counts[9],
            active_registrations: counts[10],
            pending_reports: counts[11],
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
