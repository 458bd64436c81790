pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

use thiserror::Error;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    AccountStore, AdminStore, CatalogFilter, ClassStore, CommunityStore, EventStore, MediaStore, NotificationStore,
    PregnancyStore, ReportStore, Store,
};

/// Errors surfaced by any `Store` implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The operation was understood but refused by a domain rule
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Offset pagination, already clamped by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 20;

    /// 1-based page number; limit is clamped to `1..=max_limit`
    pub fn new(page: Option<i64>, limit: Option<i64>, max_limit: i64) -> Self {
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, max_limit.max(1));
        let page = page.unwrap_or(1).max(1);
        Self {
            offset: (page - 1).saturating_mul(limit),
            limit,
        }
    }

    /// Everything, for internal listings that are not client-paged
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: i64::MAX,
        }
    }

    /// Slice an in-memory listing the way OFFSET/LIMIT would
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(usize::try_from(self.offset).unwrap_or(0))
            .take(usize::try_from(self.limit).unwrap_or(0))
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None, Self::DEFAULT_LIMIT)
    }
}
