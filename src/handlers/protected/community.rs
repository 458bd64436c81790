// handlers/protected/community.rs - Groups, posts, comments and reactions
//
// Groups, posts and comments are soft-deleted. A deleted record reads as
// missing, so every lookup below goes through `live`.

use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{
    Comment, Group, Membership, Notification, Post, ReactionCount, ReactionToggle, SoftDelete,
};
use crate::error::ApiError;
use crate::handlers::extract::{Json, Path, Query};
use crate::handlers::validate::{filled, optional_text, require_fields, text, Pagination};
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::services::notify;
use crate::types::{MembershipRole, NotificationKind, ReactionKind};

fn live<T: SoftDelete>(record: Option<T>, entity: &str) -> Result<T, ApiError> {
    record
        .filter(|r| r.is_live())
        .ok_or_else(|| ApiError::not_found(format!("{} not found", entity)))
}

async fn live_group(state: &AppState, id: Uuid) -> Result<Group, ApiError> {
    live(state.store.find_group(id).await?, "Group")
}

async fn live_post(state: &AppState, id: Uuid) -> Result<Post, ApiError> {
    live(state.store.find_post(id).await?, "Post")
}

// Groups

#[derive(Debug, Deserialize)]
pub struct GroupInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// GET /community/groups
pub async fn groups_get(State(state): State<AppState>, Query(paging): Query<Pagination>) -> ApiResult<Vec<Group>> {
    Ok(ApiResponse::success(state.store.list_groups(state.page(&paging)).await?))
}

/// POST /community/groups - the creator becomes the owning member
pub async fn group_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<GroupInput>,
) -> ApiResult<Group> {
    require_fields(&[("name", filled(&body.name))])?;

    let mut group = Group::new(
        auth.id,
        text(body.name),
        optional_text(body.description),
        optional_text(body.category),
    );
    state.store.create_group(&group).await?;
    group.member_count = 1;

    info!(group_id = %group.id, creator_id = %auth.id, "Group created");
    Ok(ApiResponse::created(group).with_message("Group created successfully"))
}

/// GET /community/groups/:id
pub async fn group_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Group> {
    Ok(ApiResponse::success(live_group(&state, id).await?))
}

/// PUT /community/groups/:id
pub async fn group_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<GroupInput>,
) -> ApiResult<Group> {
    let mut group = live_group(&state, id).await?;
    auth.require_owner_or_admin(group.creator_id)?;

    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("name cannot be empty"));
        }
        group.name = name.trim().to_string();
    }
    if let Some(description) = body.description {
        group.description = optional_text(Some(description));
    }
    if let Some(category) = body.category {
        group.category = optional_text(Some(category));
    }
    group.updated_at = Utc::now();
    state.store.save_group(&group).await?;

    Ok(ApiResponse::success(group).with_message("Group updated successfully"))
}

/// DELETE /community/groups/:id
pub async fn group_delete(State(state): State<AppState>, auth: AuthContext, Path(id): Path<Uuid>) -> ApiResult<()> {
    let group = live_group(&state, id).await?;
    auth.require_owner_or_admin(group.creator_id)?;

    if !state.store.soft_delete_group(group.id).await? {
        return Err(ApiError::not_found("Group not found"));
    }

    info!(group_id = %id, actor_id = %auth.id, "Group deleted");
    Ok(ApiResponse::message("Group deleted successfully"))
}

/// POST /community/groups/:id/join
pub async fn group_join_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Membership> {
    let group = live_group(&state, id).await?;
    let membership = Membership::new(group.id, auth.id, MembershipRole::Member);
    state.store.join_group(&membership).await?;
    Ok(ApiResponse::created(membership).with_message("Joined group successfully"))
}

/// POST /community/groups/:id/leave
pub async fn group_leave_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let group = live_group(&state, id).await?;
    let membership = state
        .store
        .find_membership(group.id, auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("You are not a member of this group"))?;
    if membership.role == MembershipRole::Owner {
        return Err(ApiError::bad_request("Group owners cannot leave their own group"));
    }

    state.store.leave_group(group.id, auth.id).await?;
    Ok(ApiResponse::message("Left group successfully"))
}

// Posts

#[derive(Debug, Deserialize)]
pub struct PostQuery {
    pub group_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PostInput {
    pub content: Option<String>,
    pub group_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub reactions: Vec<ReactionCount>,
}

/// GET /community/posts?group_id=
pub async fn posts_get(State(state): State<AppState>, Query(query): Query<PostQuery>) -> ApiResult<Vec<Post>> {
    let page = state.page(&Pagination {
        page: query.page,
        limit: query.limit,
    });
    if let Some(group_id) = query.group_id {
        live_group(&state, group_id).await?;
    }
    Ok(ApiResponse::success(state.store.list_posts(query.group_id, page).await?))
}

/// POST /community/posts - posting into a group requires membership
pub async fn post_post(State(state): State<AppState>, auth: AuthContext, Json(body): Json<PostInput>) -> ApiResult<Post> {
    require_fields(&[("content", filled(&body.content))])?;

    if let Some(group_id) = body.group_id {
        let group = live_group(&state, group_id).await?;
        if state.store.find_membership(group.id, auth.id).await?.is_none() {
            return Err(ApiError::forbidden("You must be a member of this group to post"));
        }
    }

    let post = Post::new(auth.id, body.group_id, text(body.content), optional_text(body.image_url));
    state.store.insert_post(&post).await?;
    Ok(ApiResponse::created(post).with_message("Post created successfully"))
}

/// GET /community/posts/:id
pub async fn post_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<PostDetail> {
    let post = live_post(&state, id).await?;
    let reactions = state.store.reaction_counts(post.id).await?;
    Ok(ApiResponse::success(PostDetail { post, reactions }))
}

/// PUT /community/posts/:id - author only
pub async fn post_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<PostInput>,
) -> ApiResult<Post> {
    let mut post = live_post(&state, id).await?;
    auth.require_owner(post.author_id)?;

    if let Some(content) = body.content {
        if content.trim().is_empty() {
            return Err(ApiError::bad_request("content cannot be empty"));
        }
        post.content = content.trim().to_string();
    }
    if let Some(image_url) = body.image_url {
        post.image_url = optional_text(Some(image_url));
    }
    post.updated_at = Utc::now();
    state.store.save_post(&post).await?;

    Ok(ApiResponse::success(post).with_message("Post updated successfully"))
}

/// DELETE /community/posts/:id - author or admin
pub async fn post_delete(State(state): State<AppState>, auth: AuthContext, Path(id): Path<Uuid>) -> ApiResult<()> {
    let post = live_post(&state, id).await?;
    auth.require_owner_or_admin(post.author_id)?;

    if !state.store.soft_delete_post(post.id).await? {
        return Err(ApiError::not_found("Post not found"));
    }

    info!(post_id = %id, actor_id = %auth.id, "Post deleted");
    Ok(ApiResponse::message("Post deleted successfully"))
}

// Comments

#[derive(Debug, Deserialize)]
pub struct CommentInput {
    pub content: Option<String>,
}

/// GET /community/posts/:id/comments - oldest first
pub async fn comments_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(paging): Query<Pagination>,
) -> ApiResult<Vec<Comment>> {
    let post = live_post(&state, id).await?;
    Ok(ApiResponse::success(
        state.store.list_comments(post.id, state.page(&paging)).await?,
    ))
}

/// POST /community/posts/:id/comments - notifies the post author
pub async fn comment_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<CommentInput>,
) -> ApiResult<Comment> {
    require_fields(&[("content", filled(&body.content))])?;
    let post = live_post(&state, id).await?;

    let comment = Comment::new(post.id, auth.id, text(body.content));
    state.store.insert_comment(&comment).await?;

    notify(
        state.store.as_ref(),
        auth.id,
        Notification::new(
            post.author_id,
            NotificationKind::Comment,
            "New comment on your post",
            format!("{} commented on your post", auth.account.full_name()),
            Some(format!("/community/posts/{}", post.id)),
        ),
    )
    .await;

    Ok(ApiResponse::created(comment).with_message("Comment added successfully"))
}

/// DELETE /community/comments/:id - author or admin
pub async fn comment_delete(State(state): State<AppState>, auth: AuthContext, Path(id): Path<Uuid>) -> ApiResult<()> {
    let comment = live(state.store.find_comment(id).await?, "Comment")?;
    auth.require_owner_or_admin(comment.author_id)?;

    if !state.store.soft_delete_comment(comment.id).await? {
        return Err(ApiError::not_found("Comment not found"));
    }
    Ok(ApiResponse::message("Comment deleted successfully"))
}

// Reactions

#[derive(Debug, Deserialize)]
pub struct ReactionInput {
    pub kind: Option<ReactionKind>,
}

#[derive(Debug, Serialize)]
pub struct ReactionResult {
    #[serde(flatten)]
    pub toggle: ReactionToggle,
    pub reactions: Vec<ReactionCount>,
}

/// POST /community/posts/:id/reactions - same kind removes, another kind switches
pub async fn reaction_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<ReactionInput>,
) -> ApiResult<ReactionResult> {
    let kind = body
        .kind
        .ok_or_else(|| ApiError::bad_request("Please provide all required fields: kind"))?;
    let post = live_post(&state, id).await?;

    let toggle = state.store.toggle_reaction(post.id, auth.id, kind).await?;
    if let ReactionToggle::Added { .. } = toggle {
        notify(
            state.store.as_ref(),
            auth.id,
            Notification::new(
                post.author_id,
                NotificationKind::Reaction,
                "New reaction on your post",
                format!("{} reacted to your post", auth.account.full_name()),
                Some(format!("/community/posts/{}", post.id)),
            ),
        )
        .await;
    }

    let reactions = state.store.reaction_counts(post.id).await?;
    Ok(ApiResponse::success(ReactionResult { toggle, reactions }))
}
