use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{Lifecycle, MembershipRole, ReactionKind};

/// Records that are soft-deleted rather than removed
pub trait SoftDelete {
    fn lifecycle(&self) -> Lifecycle;

    fn is_live(&self) -> bool {
        self.lifecycle().is_live()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub creator_id: Uuid,
    #[serde(skip_serializing)]
    pub lifecycle: Lifecycle,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn new(creator_id: Uuid, name: String, description: Option<String>, category: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            category,
            creator_id,
            lifecycle: Lifecycle::Live,
            member_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Membership {
    pub group_id: Uuid,
    pub account_id: Uuid,
    pub role: MembershipRole,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(group_id: Uuid, account_id: Uuid, role: MembershipRole) -> Self {
        Self {
            group_id,
            account_id,
            role,
            joined_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub content: String,
    pub image_url: Option<String>,
    #[serde(skip_serializing)]
    pub lifecycle: Lifecycle,
    pub reaction_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(author_id: Uuid, group_id: Option<Uuid>, content: String, image_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            group_id,
            content,
            image_url,
            lifecycle: Lifecycle::Live,
            reaction_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    #[serde(skip_serializing)]
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: Uuid, author_id: Uuid, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content,
            lifecycle: Lifecycle::Live,
            created_at: now,
            updated_at: now,
        }
    }
}

impl SoftDelete for Group {
    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

impl SoftDelete for Post {
    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

impl SoftDelete for Comment {
    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reaction {
    pub post_id: Uuid,
    pub account_id: Uuid,
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ReactionCount {
    pub kind: ReactionKind,
    pub count: i64,
}

/// What a reaction toggle did to the (post, account) row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReactionToggle {
    Added { kind: ReactionKind },
    Changed { from: ReactionKind, to: ReactionKind },
    Removed { kind: ReactionKind },
}

impl ReactionToggle {
    /// Decide the toggle outcome from the existing reaction, if any
    pub fn resolve(existing: Option<ReactionKind>, requested: ReactionKind) -> Self {
        match existing {
            None => ReactionToggle::Added { kind: requested },
            Some(kind) if kind == requested => ReactionToggle::Removed { kind },
            Some(from) => ReactionToggle::Changed { from, to: requested },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_resolution() {
        assert_eq!(
            ReactionToggle::resolve(None, ReactionKind::Like),
            ReactionToggle::Added { kind: ReactionKind::Like }
        );
        assert_eq!(
            ReactionToggle::resolve(Some(ReactionKind::Like), ReactionKind::Like),
            ReactionToggle::Removed { kind: ReactionKind::Like }
        );
        assert_eq!(
            ReactionToggle::resolve(Some(ReactionKind::Like), ReactionKind::Hug),
            ReactionToggle::Changed { from: ReactionKind::Like, to: ReactionKind::Hug }
        );
    }

    #[test]
    fn lifecycle_is_hidden_from_clients() {
        let post = Post::new(Uuid::new_v4(), None, "hello".into(), None);
        assert!(post.is_live());
        let value = serde_json::to_value(&post).unwrap();
        assert!(value.get("lifecycle").is_none());
        assert_eq!(value["reaction_count"], 0);
    }
}
