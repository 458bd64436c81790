use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Class {
    pub id: Uuid,
    pub collaborator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_published: bool,
    pub average_rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Class {
    pub fn new(collaborator_id: Uuid, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            collaborator_id,
            title,
            description: None,
            category: None,
            thumbnail_url: None,
            is_published: false,
            average_rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Video {
    pub id: Uuid,
    pub class_id: Uuid,
    pub title: String,
    pub video_url: String,
    pub duration_seconds: i32,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Enrollment {
    pub class_id: Uuid,
    pub account_id: Uuid,
    pub progress: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(class_id: Uuid, account_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            class_id,
            account_id,
            progress: 0,
            completed_at: None,
            enrolled_at: now,
            updated_at: now,
        }
    }

    /// Progress is clamped by the caller to 0..=100; reaching 100 stamps completion once
    pub fn set_progress(&mut self, progress: i32) {
        let now = Utc::now();
        self.progress = progress;
        if progress >= 100 && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub class_id: Uuid,
    pub account_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub review_count: i64,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return Self { average_rating: 0.0, review_count: 0 };
        }
        let total: i64 = ratings.iter().map(|r| *r as i64).sum();
        Self::from_aggregate(total as f64 / ratings.len() as f64, ratings.len() as i64)
    }

    /// Averages are kept to two decimals
    pub fn from_aggregate(average: f64, count: i64) -> Self {
        Self {
            average_rating: (average * 100.0).round() / 100.0,
            review_count: count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_summary_rounds_average() {
        let summary = RatingSummary::from_ratings(&[5, 4, 4]);
        assert_eq!(summary.review_count, 3);
        assert_eq!(summary.average_rating, 4.33);
        assert_eq!(RatingSummary::from_ratings(&[]).average_rating, 0.0);
    }

    #[test]
    fn completion_is_stamped_once() {
        let mut enrollment = Enrollment::new(Uuid::new_v4(), Uuid::new_v4());
        enrollment.set_progress(40);
        assert!(enrollment.completed_at.is_none());
        enrollment.set_progress(100);
        let first = enrollment.completed_at;
        assert!(first.is_some());
        enrollment.set_progress(100);
        assert_eq!(enrollment.completed_at, first);
    }
}
