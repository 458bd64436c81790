use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::RegistrationStatus;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub is_online: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: i32,
    pub waitlist_enabled: bool,
    pub is_published: bool,
    pub registered_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn new(organizer_id: Uuid, title: String, starts_at: DateTime<Utc>, capacity: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organizer_id,
            title,
            description: None,
            location: None,
            is_online: false,
            starts_at,
            ends_at: None,
            capacity,
            waitlist_enabled: false,
            is_published: false,
            registered_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Registration {
    pub event_id: Uuid,
    pub account_id: Uuid,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn is_active(&self) -> bool {
        self.status != RegistrationStatus::Cancelled
    }
}

/// Status a new registrant receives given the seats already taken.
///
/// `None` means the event is full and has no waitlist.
pub fn admission(registered: i64, capacity: i32, waitlist_enabled: bool) -> Option<RegistrationStatus> {
    if registered < capacity as i64 {
        Some(RegistrationStatus::Registered)
    } else if waitlist_enabled {
        Some(RegistrationStatus::Waitlisted)
    } else {
        None
    }
}
