use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{ReportStatus, ReportTarget};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub target: ReportTarget,
    pub target_id: Uuid,
    pub reason: String,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(reporter_id: Uuid, target: ReportTarget, target_id: Uuid, reason: String, details: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reporter_id,
            target,
            target_id,
            reason,
            details,
            status: ReportStatus::Pending,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Read-only dashboard aggregates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub mothers: i64,
    pub collaborators: i64,
    pub admins: i64,
    pub active_pregnancies: i64,
    pub groups: i64,
    pub posts: i64,
    pub classes: i64,
    pub published_classes: i64,
    pub events: i64,
    pub published_events: i64,
    pub active_registrations: i64,
    pub pending_reports: i64,
}
