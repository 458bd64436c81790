use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::services::week;
use crate::types::PregnancyStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pregnancy {
    pub id: Uuid,
    pub mother_id: Uuid,
    pub due_date: NaiveDate,
    pub current_week: i32,
    pub status: PregnancyStatus,
    pub baby_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pregnancy {
    pub fn new(mother_id: Uuid, due_date: NaiveDate, today: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            mother_id,
            due_date,
            current_week: week::current_week(due_date, today),
            status: PregnancyStatus::Active,
            baby_name: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PregnancyStatus::Active
    }

    /// Recompute the stored week; returns true when it changed and needs persisting
    pub fn refresh_week(&mut self, today: NaiveDate) -> bool {
        let week = week::current_week(self.due_date, today);
        if week == self.current_week {
            return false;
        }
        self.current_week = week;
        self.updated_at = Utc::now();
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SymptomLog {
    pub id: Uuid,
    pub pregnancy_id: Uuid,
    pub account_id: Uuid,
    pub symptom: String,
    pub severity: i32,
    pub notes: Option<String>,
    pub week: i32,
    pub logged_at: DateTime<Utc>,
}

impl SymptomLog {
    /// Week is snapshotted from the pregnancy at creation and never follows later changes
    pub fn new(pregnancy: &Pregnancy, symptom: String, severity: i32, notes: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pregnancy_id: pregnancy.id,
            account_id: pregnancy.mother_id,
            symptom,
            severity,
            notes,
            week: pregnancy.current_week,
            logged_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeekGuide {
    pub week: i32,
    pub title: String,
    pub baby_size: Option<String>,
    pub baby_development: String,
    pub mother_changes: Option<String>,
    pub tips: Vec<String>,
    pub updated_at: DateTime<Utc>,
}
