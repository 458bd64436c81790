use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::{affected, conflict_on_unique, PgStore};
use crate::database::models::{Comment, Group, Membership, Post, ReactionCount, ReactionToggle};
use crate::database::store::CommunityStore;
use crate::database::{Page, StoreError, StoreResult};
use crate::types::{MembershipRole, ReactionKind};

#[derive(FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    category: Option<String>,
    creator_id: Uuid,
    deleted_at: Option<DateTime<Utc>>,
    member_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            creator_id: row.creator_id,
            lifecycle: row.deleted_at.into(),
            member_count: row.member_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    group_id: Option<Uuid>,
    content: String,
    image_url: Option<String>,
    deleted_at: Option<DateTime<Utc>>,
    reaction_count: i64,
    comment_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            author_id: row.author_id,
            group_id: row.group_id,
            content: row.content,
            image_url: row.image_url,
            lifecycle: row.deleted_at.into(),
            reaction_count: row.reaction_count,
            comment_count: row.comment_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    content: String,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            content: row.content,
            lifecycle: row.deleted_at.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const GROUP_SELECT: &str = "SELECT g.id, g.name, g.description, g.category, g.creator_id, g.deleted_at,
        (SELECT COUNT(*) FROM group_memberships m WHERE m.group_id = g.id) AS member_count,
        g.created_at, g.updated_at
    FROM community_groups g";

const POST_SELECT: &str = "SELECT p.id, p.author_id, p.group_id, p.content, p.image_url, p.deleted_at,
        (SELECT COUNT(*) FROM reactions r WHERE r.post_id = p.id) AS reaction_count,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id AND c.deleted_at IS NULL) AS comment_count,
        p.created_at, p.updated_at
    FROM posts p";

const COMMENT_COLUMNS: &str = "id, post_id, author_id, content, deleted_at, created_at, updated_at";

#[async_trait]
impl CommunityStore for PgStore {
    async fn create_group(&self, group: &Group) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO community_groups (id, name, description, category, creator_id, deleted_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.category)
        .bind(group.creator_id)
        .bind(group.lifecycle.deleted_at())
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&mut *tx)
        .await?;

        let owner = Membership::new(group.id, group.creator_id, MembershipRole::Owner);
        sqlx::query("INSERT INTO group_memberships (group_id, account_id, role, joined_at) VALUES ($1, $2, $3, $4)")
            .bind(owner.group_id)
            .bind(owner.account_id)
            .bind(owner.role)
            .bind(owner.joined_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(&format!("{} WHERE g.id = $1", GROUP_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Group::from))
    }

    async fn list_groups(&self, page: Page) -> StoreResult<Vec<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>(&format!(
            "{} WHERE g.deleted_at IS NULL ORDER BY g.created_at DESC LIMIT $1 OFFSET $2",
            GROUP_SELECT
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Group::from).collect())
    }

    async fn save_group(&self, group: &Group) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE community_groups SET name = $2, description = $3, category = $4, updated_at = $5
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.category)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await?;
        affected(result.rows_affected(), "Group")
    }

    async fn soft_delete_group(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE community_groups SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn join_group(&self, membership: &Membership) -> StoreResult<()> {
        sqlx::query("INSERT INTO group_memberships (group_id, account_id, role, joined_at) VALUES ($1, $2, $3, $4)")
            .bind(membership.group_id)
            .bind(membership.account_id)
            .bind(membership.role)
            .bind(membership.joined_at)
            .execute(&self.pool)
            .await
            .map_err(conflict_on_unique("You are already a member of this group"))?;
        Ok(())
    }

    async fn find_membership(&self, group_id: Uuid, account_id: Uuid) -> StoreResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT group_id, account_id, role, joined_at FROM group_memberships WHERE group_id = $1 AND account_id = $2",
        )
        .bind(group_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    async fn leave_group(&self, group_id: Uuid, account_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM group_memberships WHERE group_id = $1 AND account_id = $2")
            .bind(group_id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO posts (id, author_id, group_id, content, image_url, deleted_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(post.lifecycle.deleted_at())
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{} WHERE p.id = $1", POST_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Post::from))
    }

    async fn list_posts(&self, group_id: Option<Uuid>, page: Page) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{} WHERE p.deleted_at IS NULL AND ($1::uuid IS NULL OR p.group_id = $1)
             ORDER BY p.created_at DESC LIMIT $2 OFFSET $3",
            POST_SELECT
        ))
        .bind(group_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn save_post(&self, post: &Post) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE posts SET content = $2, image_url = $3, updated_at = $4 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(post.id)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;
        affected(result.rows_affected(), "Post")
    }

    async fn soft_delete_post(&self, id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE posts SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, content, deleted_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.lifecycle.deleted_at())
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!("SELECT {} FROM comments WHERE id = $1", COMMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Comment::from))
    }

    async fn list_comments(&self, post_id: Uuid, page: Page) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {} FROM comments WHERE post_id = $1 AND deleted_at IS NULL
             ORDER BY created_at ASC LIMIT $2 OFFSET $3",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn soft_delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE comments SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_reaction(&self, post_id: Uuid, account_id: Uuid, kind: ReactionKind) -> StoreResult<ReactionToggle> {
        let mut tx = self.pool.begin().await?;

        // Lock the post row so concurrent toggles by the same account serialize
        let post: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;
        if post.is_none() {
            return Err(StoreError::NotFound("Post".into()));
        }

        let existing: Option<(ReactionKind,)> =
            sqlx::query_as("SELECT kind FROM reactions WHERE post_id = $1 AND account_id = $2")
                .bind(post_id)
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;

        let outcome = ReactionToggle::resolve(existing.map(|(kind,)| kind), kind);
        match outcome {
            ReactionToggle::Removed { .. } => {
                sqlx::query("DELETE FROM reactions WHERE post_id = $1 AND account_id = $2")
                    .bind(post_id)
                    .bind(account_id)
                    .execute(&mut *tx)
                    .await?;
            }
            ReactionToggle::Added { .. } | ReactionToggle::Changed { .. } => {
                sqlx::query(
                    "INSERT INTO reactions (post_id, account_id, kind, created_at) VALUES ($1, $2, $3, now())
                     ON CONFLICT (post_id, account_id) DO UPDATE SET kind = EXCLUDED.kind, created_at = EXCLUDED.created_at",
                )
                .bind(post_id)
                .bind(account_id)
                .bind(kind)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn reaction_counts(&self, post_id: Uuid) -> StoreResult<Vec<ReactionCount>> {
        let counts = sqlx::query_as::<_, ReactionCount>(
            "SELECT kind, COUNT(*) AS count FROM reactions WHERE post_id = $1 GROUP BY kind ORDER BY kind",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }
}
